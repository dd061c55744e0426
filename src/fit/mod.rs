//! The deterministic fit driver.
//!
//! Responsibilities:
//!
//! - method selection and solver options (`options`)
//! - weighted residuals and solver adapters, including the annealing
//!   proposals (`residuals`)
//! - request validation, dispatch, error estimates (`driver`)
//! - optional evaluation tracing (`trace`)

pub mod driver;
pub mod options;
pub mod residuals;
pub mod trace;

pub use driver::*;
pub use options::*;
pub use residuals::numeric_jacobian;
pub use trace::*;
