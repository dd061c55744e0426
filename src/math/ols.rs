//! Linear least squares via SVD.
//!
//! Several ansätze are linear in (a transform of) their parameters, so their
//! initial guesses come from an ordinary least squares solve:
//!
//! ```text
//! minimize Σ (y_i - x_i^T β)^2
//! ```
//!
//! Implementation choices:
//! - SVD instead of QR: the design matrices are tall (more samples than
//!   coefficients) and nalgebra's `QR::solve` only handles square systems.
//! - Polynomial design matrices become ill-conditioned quickly when the
//!   domain is far from the origin, so we retry with looser singular-value
//!   cutoffs before giving up.

use nalgebra::{DMatrix, DVector};

/// Solve a least squares problem using SVD.
///
/// Returns `None` if the system is too ill-conditioned to solve robustly.
pub fn solve_least_squares(x: &DMatrix<f64>, y: &DVector<f64>) -> Option<DVector<f64>> {
    if x.nrows() != y.len() || x.ncols() == 0 {
        return None;
    }

    let svd = x.clone().svd(true, true);

    // Try progressively looser tolerances if strict solve fails.
    for &tol in &[1e-10, 1e-8, 1e-6] {
        if let Ok(beta) = svd.solve(y, tol) {
            if beta.iter().all(|v| v.is_finite()) {
                return Some(beta);
            }
        }
    }

    None
}

/// Design matrix for `c0 + Σ_i Σ_{p=1..order} c_{i,p} x_i^p` (no cross terms).
///
/// `domain` is D×N (one column per sample); the result is N×(1 + D·order)
/// with columns ordered `1, x_0, x_0^2, .., x_1, x_1^2, ..`.
pub fn polynomial_design(domain: &DMatrix<f64>, order: usize) -> DMatrix<f64> {
    let dim = domain.nrows();
    let n = domain.ncols();
    DMatrix::from_fn(n, 1 + dim * order, |row, col| {
        if col == 0 {
            return 1.0;
        }
        let axis = (col - 1) / order;
        let power = (col - 1) % order + 1;
        domain[(axis, row)].powi(power as i32)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn least_squares_solves_simple_system() {
        // Fit y = 2 + 3x on x = [0,1,2]
        let x = DMatrix::from_row_slice(3, 2, &[1.0, 0.0, 1.0, 1.0, 1.0, 2.0]);
        let y = DVector::from_row_slice(&[2.0, 5.0, 8.0]);

        let beta = solve_least_squares(&x, &y).unwrap();
        assert!((beta[0] - 2.0).abs() < 1e-10);
        assert!((beta[1] - 3.0).abs() < 1e-10);
    }

    #[test]
    fn least_squares_rejects_mismatched_shapes() {
        let x = DMatrix::from_row_slice(2, 1, &[1.0, 2.0]);
        let y = DVector::from_row_slice(&[1.0, 2.0, 3.0]);
        assert!(solve_least_squares(&x, &y).is_none());
    }

    #[test]
    fn quadratic_design_recovers_exact_coefficients() {
        let domain = DMatrix::from_row_slice(1, 4, &[-1.0, 0.5, 2.0, 3.0]);
        let design = polynomial_design(&domain, 2);
        assert_eq!(design.shape(), (4, 3));
        assert_eq!(design[(2, 2)], 4.0);

        let y = DVector::from_iterator(4, domain.row(0).iter().map(|&x| 1.0 - 2.0 * x + 0.5 * x * x));
        let beta = solve_least_squares(&design, &y).unwrap();
        assert!((beta[0] - 1.0).abs() < 1e-10);
        assert!((beta[1] + 2.0).abs() < 1e-10);
        assert!((beta[2] - 0.5).abs() < 1e-10);
    }

    #[test]
    fn multi_axis_design_orders_columns_by_axis() {
        let domain = DMatrix::from_row_slice(2, 1, &[2.0, 3.0]);
        let design = polynomial_design(&domain, 2);
        assert_eq!(design.row(0).iter().copied().collect::<Vec<_>>(), vec![1.0, 2.0, 4.0, 3.0, 9.0]);
    }
}
