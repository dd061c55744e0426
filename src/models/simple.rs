//! Elementary one-dimensional models.
//!
//! `Exponential` and `FermiDirac` have no reliable closed-form guess, so
//! fitting them requires a caller-supplied initial guess.

use nalgebra::{DMatrix, DVector};

use crate::math::{linear_regression, mean};
use crate::models::ansatz::{first_axis_jacobian, map_first_axis, owned_names};
use crate::models::Ansatz;

/// `c`
#[derive(Debug, Clone, Copy, Default)]
pub struct Constant;

impl Ansatz for Constant {
    fn name(&self) -> &str {
        "constant"
    }

    fn parameter_names(&self) -> Vec<String> {
        owned_names(&["c"])
    }

    fn evaluate(&self, p: &DVector<f64>, domain: &DMatrix<f64>) -> DVector<f64> {
        DVector::from_element(domain.ncols(), p[0])
    }

    fn jacobian(&self, _p: &DVector<f64>, domain: &DMatrix<f64>) -> Option<DMatrix<f64>> {
        Some(DMatrix::from_element(domain.ncols(), 1, 1.0))
    }

    fn guess(&self, _domain: &DMatrix<f64>, response: &DVector<f64>) -> Option<DVector<f64>> {
        mean(response.iter().copied()).map(|m| DVector::from_element(1, m))
    }
}

/// `a + b x`
#[derive(Debug, Clone, Copy, Default)]
pub struct Linear;

impl Ansatz for Linear {
    fn name(&self) -> &str {
        "linear"
    }

    fn parameter_names(&self) -> Vec<String> {
        owned_names(&["a", "b"])
    }

    fn evaluate(&self, p: &DVector<f64>, domain: &DMatrix<f64>) -> DVector<f64> {
        let (a, b) = (p[0], p[1]);
        map_first_axis(domain, |x| a + b * x)
    }

    fn jacobian(&self, _p: &DVector<f64>, domain: &DMatrix<f64>) -> Option<DMatrix<f64>> {
        Some(first_axis_jacobian(domain, |x| [1.0, x]))
    }

    fn guess(&self, domain: &DMatrix<f64>, response: &DVector<f64>) -> Option<DVector<f64>> {
        let x: Vec<f64> = domain.row(0).iter().copied().collect();
        let fit = linear_regression(&x, response.as_slice(), None)?;
        Some(DVector::from_row_slice(&[fit.a, fit.b]))
    }
}

/// `A exp(B (x - x0))`
#[derive(Debug, Clone, Copy, Default)]
pub struct Exponential;

impl Ansatz for Exponential {
    fn name(&self) -> &str {
        "exponential"
    }

    fn parameter_names(&self) -> Vec<String> {
        owned_names(&["A", "B", "x0"])
    }

    fn evaluate(&self, p: &DVector<f64>, domain: &DMatrix<f64>) -> DVector<f64> {
        let (a, b, x0) = (p[0], p[1], p[2]);
        map_first_axis(domain, |x| a * (b * (x - x0)).exp())
    }

    fn jacobian(&self, p: &DVector<f64>, domain: &DMatrix<f64>) -> Option<DMatrix<f64>> {
        let (a, b, x0) = (p[0], p[1], p[2]);
        Some(first_axis_jacobian(domain, |x| {
            let e = (b * (x - x0)).exp();
            [e, a * (x - x0) * e, -a * b * e]
        }))
    }
}

/// `A / (exp((x - F) / T) + 1)`
#[derive(Debug, Clone, Copy, Default)]
pub struct FermiDirac;

impl Ansatz for FermiDirac {
    fn name(&self) -> &str {
        "fermi-dirac"
    }

    fn parameter_names(&self) -> Vec<String> {
        owned_names(&["A", "F", "T"])
    }

    fn evaluate(&self, p: &DVector<f64>, domain: &DMatrix<f64>) -> DVector<f64> {
        let (a, f, t) = (p[0], p[1], p[2]);
        map_first_axis(domain, |x| a / (((x - f) / t).exp() + 1.0))
    }

    fn jacobian(&self, p: &DVector<f64>, domain: &DMatrix<f64>) -> Option<DMatrix<f64>> {
        let (a, f, t) = (p[0], p[1], p[2]);
        Some(first_axis_jacobian(domain, |x| {
            let g = ((x - f) / t).exp();
            let s = 1.0 / (g + 1.0);
            let common = a * g * s * s / t;
            [s, common, common * (x - f) / t]
        }))
    }
}
