//! The `Ansatz` trait: a parametrized model function.
//!
//! An ansatz maps a parameter vector and a D×N domain to N predicted values.
//! Implementations are stateless, so one instance is shared by every fit of
//! a stochastic run, including fits running on other threads.

use nalgebra::{DMatrix, DVector};

/// A parametrized model `f(params, x)`.
pub trait Ansatz: Send + Sync {
    /// Short identifier used in reports and exported files.
    fn name(&self) -> &str;

    /// Parameter names, in the order of the parameter vector.
    fn parameter_names(&self) -> Vec<String>;

    fn num_params(&self) -> usize {
        self.parameter_names().len()
    }

    /// Number of rows the domain matrix must have.
    fn domain_dim(&self) -> usize {
        1
    }

    /// Evaluate the model at every domain column.
    ///
    /// `params` has `num_params()` entries; the result has `domain.ncols()`.
    fn evaluate(&self, params: &DVector<f64>, domain: &DMatrix<f64>) -> DVector<f64>;

    /// Analytic Jacobian `∂f_i/∂p_j` (N×P), if the ansatz provides one.
    ///
    /// When `None`, the fit driver falls back to finite differences.
    fn jacobian(&self, _params: &DVector<f64>, _domain: &DMatrix<f64>) -> Option<DMatrix<f64>> {
        None
    }

    /// Heuristic initial guess from the data, if the ansatz has one.
    fn guess(&self, _domain: &DMatrix<f64>, _response: &DVector<f64>) -> Option<DVector<f64>> {
        None
    }
}

pub(crate) fn owned_names(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}

/// Apply a scalar function of the first domain axis to every sample.
pub(crate) fn map_first_axis(domain: &DMatrix<f64>, f: impl Fn(f64) -> f64) -> DVector<f64> {
    DVector::from_iterator(domain.ncols(), domain.row(0).iter().map(|&x| f(x)))
}

/// Build an N×P Jacobian from a per-sample gradient on the first domain axis.
pub(crate) fn first_axis_jacobian<const P: usize>(
    domain: &DMatrix<f64>,
    gradient: impl Fn(f64) -> [f64; P],
) -> DMatrix<f64> {
    let mut jac = DMatrix::zeros(domain.ncols(), P);
    for (i, &x) in domain.row(0).iter().enumerate() {
        for (j, g) in gradient(x).into_iter().enumerate() {
            jac[(i, j)] = g;
        }
    }
    jac
}

/// Index of the smallest response value (first one on ties).
pub(crate) fn argmin(values: &DVector<f64>) -> Option<usize> {
    values
        .iter()
        .enumerate()
        .filter(|(_, v)| v.is_finite())
        .min_by(|a, b| a.1.total_cmp(b.1))
        .map(|(i, _)| i)
}
