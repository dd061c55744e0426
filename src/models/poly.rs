//! Multi-dimensional polynomial without cross terms.
//!
//! `c0 + Σ_i Σ_{p=1..order} c{p}_x{i} · x_i^p`
//!
//! Linear in its parameters, so the guess is the exact (unweighted) least
//! squares solution and the Jacobian is the design matrix.

use nalgebra::{DMatrix, DVector};

use crate::math::{polynomial_design, solve_least_squares};
use crate::models::Ansatz;

#[derive(Debug, Clone)]
pub struct Polynomial {
    order: usize,
    dim: usize,
    name: String,
}

impl Polynomial {
    /// `order` and `dim` are clamped to at least 1.
    pub fn new(order: usize, dim: usize) -> Self {
        let order = order.max(1);
        let dim = dim.max(1);
        Self {
            order,
            dim,
            name: format!("poly{order}"),
        }
    }

    pub fn order(&self) -> usize {
        self.order
    }
}

impl Ansatz for Polynomial {
    fn name(&self) -> &str {
        &self.name
    }

    fn parameter_names(&self) -> Vec<String> {
        let mut names = Vec::with_capacity(1 + self.dim * self.order);
        names.push("c0".to_string());
        for axis in 0..self.dim {
            for power in 1..=self.order {
                names.push(format!("c{power}_x{axis}"));
            }
        }
        names
    }

    fn domain_dim(&self) -> usize {
        self.dim
    }

    fn evaluate(&self, p: &DVector<f64>, domain: &DMatrix<f64>) -> DVector<f64> {
        polynomial_design(domain, self.order) * p
    }

    fn jacobian(&self, _p: &DVector<f64>, domain: &DMatrix<f64>) -> Option<DMatrix<f64>> {
        Some(polynomial_design(domain, self.order))
    }

    fn guess(&self, domain: &DMatrix<f64>, response: &DVector<f64>) -> Option<DVector<f64>> {
        solve_least_squares(&polynomial_design(domain, self.order), response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_follow_axis_then_power() {
        let p = Polynomial::new(2, 2);
        assert_eq!(p.parameter_names(), vec!["c0", "c1_x0", "c2_x0", "c1_x1", "c2_x1"]);
        assert_eq!(p.num_params(), 5);
        assert_eq!(p.domain_dim(), 2);
        assert_eq!(p.name(), "poly2");
    }

    #[test]
    fn guess_recovers_two_dimensional_quadratic() {
        let p = Polynomial::new(2, 2);
        let truth = DVector::from_row_slice(&[1.0, 0.5, -0.25, 2.0, 0.1]);
        let domain = DMatrix::from_row_slice(
            2,
            7,
            &[
                0.0, 1.0, 2.0, -1.0, 0.5, 3.0, 1.5, //
                1.0, 0.0, -2.0, 2.0, 1.5, -1.0, 0.3,
            ],
        );
        let y = p.evaluate(&truth, &domain);
        assert!((y[0] - (1.0 + 2.0 + 0.1)).abs() < 1e-12);

        let guess = p.guess(&domain, &y).unwrap();
        for (g, t) in guess.iter().zip(truth.iter()) {
            assert!((g - t).abs() < 1e-9);
        }
    }
}
