//! The (x, y, dy) sample being fitted.

use nalgebra::{DMatrix, DVector};

use crate::error::FitError;

/// Domain, response and per-point uncertainty for `N` observations.
///
/// `x` is D×N: each column is one sample's coordinates, so a one-dimensional
/// domain is a single row.
#[derive(Debug, Clone, PartialEq)]
pub struct FitSample {
    x: DMatrix<f64>,
    y: DVector<f64>,
    dy: DVector<f64>,
}

impl FitSample {
    /// Validate and bind a sample.
    ///
    /// Requires N ≥ 1, matching lengths along the sample axis, finite values,
    /// and strictly positive uncertainties (they become `1/dy²` weights).
    pub fn new(x: DMatrix<f64>, y: DVector<f64>, dy: DVector<f64>) -> Result<Self, FitError> {
        let n = y.len();
        if n == 0 {
            return Err(FitError::invalid("sample must contain at least one point"));
        }
        if x.nrows() == 0 {
            return Err(FitError::invalid("domain must have at least one dimension"));
        }
        if x.ncols() != n {
            return Err(FitError::invalid(format!(
                "domain has {} samples but response has {n}",
                x.ncols()
            )));
        }
        if dy.len() != n {
            return Err(FitError::invalid(format!(
                "uncertainty has {} entries but response has {n}",
                dy.len()
            )));
        }
        if x.iter().chain(y.iter()).any(|v| !v.is_finite()) {
            return Err(FitError::invalid("domain and response must be finite"));
        }
        if let Some(i) = dy.iter().position(|v| !(v.is_finite() && *v > 0.0)) {
            return Err(FitError::invalid(format!(
                "uncertainty at point {i} is {}; must be finite and > 0",
                dy[i]
            )));
        }
        Ok(Self { x, y, dy })
    }

    /// Convenience constructor for a one-dimensional domain.
    pub fn from_columns(x: &[f64], y: &[f64], dy: &[f64]) -> Result<Self, FitError> {
        Self::new(
            DMatrix::from_row_slice(1, x.len(), x),
            DVector::from_column_slice(y),
            DVector::from_column_slice(dy),
        )
    }

    pub fn len(&self) -> usize {
        self.y.len()
    }

    pub fn is_empty(&self) -> bool {
        self.y.is_empty()
    }

    /// Domain dimension D.
    pub fn dim(&self) -> usize {
        self.x.nrows()
    }

    pub fn x(&self) -> &DMatrix<f64> {
        &self.x
    }

    pub fn y(&self) -> &DVector<f64> {
        &self.y
    }

    pub fn dy(&self) -> &DVector<f64> {
        &self.dy
    }

    /// `(min, max)` of each domain axis.
    pub fn domain_bounds(&self) -> Vec<(f64, f64)> {
        self.x
            .row_iter()
            .map(|row| {
                row.iter()
                    .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_dimensional_sample_from_columns() {
        let s = FitSample::from_columns(&[1.0, 2.0, 3.0], &[0.1, 0.2, 0.3], &[0.01, 0.01, 0.02]).unwrap();
        assert_eq!(s.len(), 3);
        assert_eq!(s.dim(), 1);
        assert_eq!(s.x()[(0, 2)], 3.0);
        assert_eq!(s.domain_bounds(), vec![(1.0, 3.0)]);
    }

    #[test]
    fn rejects_mismatched_lengths() {
        let err = FitSample::from_columns(&[1.0, 2.0], &[0.1, 0.2, 0.3], &[0.01, 0.01, 0.02]).unwrap_err();
        assert!(matches!(err, FitError::InvalidArguments(_)));
        let err = FitSample::from_columns(&[1.0, 2.0], &[0.1, 0.2], &[0.01]).unwrap_err();
        assert!(matches!(err, FitError::InvalidArguments(_)));
    }

    #[test]
    fn rejects_empty_and_nonpositive_uncertainty() {
        assert!(FitSample::from_columns(&[], &[], &[]).is_err());
        let err = FitSample::from_columns(&[1.0, 2.0], &[0.1, 0.2], &[0.01, 0.0]).unwrap_err();
        assert!(err.to_string().contains("point 1"));
        assert!(FitSample::from_columns(&[1.0], &[0.1], &[-0.5]).is_err());
    }
}
