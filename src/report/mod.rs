//! Reporting utilities: per-point residuals and formatted terminal output.

pub mod format;

pub use format::*;

use nalgebra::DVector;

use crate::domain::FitSample;
use crate::error::AppError;
use crate::models::Ansatz;

/// One data point against a fitted curve.
#[derive(Debug, Clone, PartialEq)]
pub struct PointResidual {
    pub x: Vec<f64>,
    pub y_obs: f64,
    pub dy: f64,
    pub y_fit: f64,
    /// `y_obs - y_fit`.
    pub residual: f64,
    /// Residual in units of `dy`.
    pub pull: f64,
}

/// Compare every sample point with the model at `params`.
pub fn compute_residuals<A: Ansatz + ?Sized>(
    sample: &FitSample,
    ansatz: &A,
    params: &DVector<f64>,
) -> Result<Vec<PointResidual>, AppError> {
    let fitted = ansatz.evaluate(params, sample.x());
    if fitted.len() != sample.len() {
        return Err(AppError::new(4, "Model returned the wrong number of values."));
    }
    let mut out = Vec::with_capacity(sample.len());
    for (i, y_fit) in fitted.iter().copied().enumerate() {
        if !y_fit.is_finite() {
            return Err(AppError::new(4, "Non-finite model prediction during residual computation."));
        }
        let y_obs = sample.y()[i];
        let dy = sample.dy()[i];
        let residual = y_obs - y_fit;
        out.push(PointResidual {
            x: sample.x().column(i).iter().copied().collect(),
            y_obs,
            dy,
            y_fit,
            residual,
            pull: residual / dy,
        });
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Linear;

    #[test]
    fn compute_residuals_basic() {
        let sample = FitSample::from_columns(&[0.0, 1.0], &[1.0, 3.5], &[0.5, 0.25]).unwrap();
        let params = DVector::from_row_slice(&[1.0, 2.0]);
        let residuals = compute_residuals(&sample, &Linear, &params).unwrap();
        assert_eq!(residuals.len(), 2);
        assert!(residuals[0].residual.abs() < 1e-12);
        assert!((residuals[1].residual - 0.5).abs() < 1e-12);
        assert!((residuals[1].pull - 2.0).abs() < 1e-12);
        assert_eq!(residuals[1].x, vec![1.0]);
    }

    #[test]
    fn non_finite_prediction_is_a_numerical_error() {
        let sample = FitSample::from_columns(&[0.0], &[1.0], &[0.5]).unwrap();
        let params = DVector::from_row_slice(&[f64::NAN, 2.0]);
        let err = compute_residuals(&sample, &Linear, &params).unwrap_err();
        assert_eq!(err.exit_code(), 4);
    }
}
