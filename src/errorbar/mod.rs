//! Values with uncertainties.
//!
//! - arithmetic with uncorrelated error propagation (`value`)
//! - compact `1.234(56)` notation: formatting and parsing (`notation`)

pub mod notation;
pub mod value;

pub use notation::*;
pub use value::*;
