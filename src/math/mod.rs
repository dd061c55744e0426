//! Mathematical utilities: least squares, straight-line regression, sample statistics.

pub mod linear;
pub mod ols;
pub mod stats;

pub use linear::*;
pub use ols::*;
pub use stats::*;
