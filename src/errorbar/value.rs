//! `ErrorbarValue`: a mean paired with a non-negative uncertainty.
//!
//! Propagation rules (errors assumed uncorrelated):
//! - `a ± b` between two values: errors add in quadrature
//! - `a ± c` with a plain scalar: error unchanged
//! - `a * c`, `a / c` with a plain scalar: error scaled by `|c|`
//!
//! The type is `Copy` with private fields, so a value never changes behind
//! its holder's back. `*=` and `/=` are shorthand for `v = v * c` on the
//! caller's own binding.

use std::ops::{Add, Div, DivAssign, Mul, MulAssign, Neg, Sub};

use serde::{Deserialize, Serialize};

/// A (mean, error) pair. The error is always stored as a magnitude.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ErrorbarValue {
    mean: f64,
    error: f64,
}

impl ErrorbarValue {
    pub fn new(mean: f64, error: f64) -> Self {
        Self {
            mean,
            error: error.abs(),
        }
    }

    /// A value without uncertainty.
    pub fn exact(mean: f64) -> Self {
        Self::new(mean, 0.0)
    }

    pub fn mean(&self) -> f64 {
        self.mean
    }

    pub fn error(&self) -> f64 {
        self.error
    }

    /// `error / |mean|`; infinite for a zero mean with nonzero error.
    pub fn relative_error(&self) -> f64 {
        self.error / self.mean.abs()
    }
}

impl From<ErrorbarValue> for f64 {
    fn from(value: ErrorbarValue) -> Self {
        value.mean
    }
}

impl Add for ErrorbarValue {
    type Output = ErrorbarValue;

    fn add(self, rhs: ErrorbarValue) -> ErrorbarValue {
        ErrorbarValue::new(self.mean + rhs.mean, self.error.hypot(rhs.error))
    }
}

impl Sub for ErrorbarValue {
    type Output = ErrorbarValue;

    fn sub(self, rhs: ErrorbarValue) -> ErrorbarValue {
        ErrorbarValue::new(self.mean - rhs.mean, self.error.hypot(rhs.error))
    }
}

impl Add<f64> for ErrorbarValue {
    type Output = ErrorbarValue;

    fn add(self, rhs: f64) -> ErrorbarValue {
        ErrorbarValue::new(self.mean + rhs, self.error)
    }
}

impl Sub<f64> for ErrorbarValue {
    type Output = ErrorbarValue;

    fn sub(self, rhs: f64) -> ErrorbarValue {
        ErrorbarValue::new(self.mean - rhs, self.error)
    }
}

impl Add<ErrorbarValue> for f64 {
    type Output = ErrorbarValue;

    fn add(self, rhs: ErrorbarValue) -> ErrorbarValue {
        rhs + self
    }
}

impl Sub<ErrorbarValue> for f64 {
    type Output = ErrorbarValue;

    fn sub(self, rhs: ErrorbarValue) -> ErrorbarValue {
        ErrorbarValue::new(self - rhs.mean, rhs.error)
    }
}

impl Mul<f64> for ErrorbarValue {
    type Output = ErrorbarValue;

    fn mul(self, rhs: f64) -> ErrorbarValue {
        ErrorbarValue::new(self.mean * rhs, self.error * rhs.abs())
    }
}

impl Mul<ErrorbarValue> for f64 {
    type Output = ErrorbarValue;

    fn mul(self, rhs: ErrorbarValue) -> ErrorbarValue {
        rhs * self
    }
}

impl Div<f64> for ErrorbarValue {
    type Output = ErrorbarValue;

    fn div(self, rhs: f64) -> ErrorbarValue {
        ErrorbarValue::new(self.mean / rhs, self.error / rhs.abs())
    }
}

impl MulAssign<f64> for ErrorbarValue {
    fn mul_assign(&mut self, rhs: f64) {
        *self = *self * rhs;
    }
}

impl DivAssign<f64> for ErrorbarValue {
    fn div_assign(&mut self, rhs: f64) {
        *self = *self / rhs;
    }
}

impl Neg for ErrorbarValue {
    type Output = ErrorbarValue;

    fn neg(self) -> ErrorbarValue {
        ErrorbarValue::new(-self.mean, self.error)
    }
}
