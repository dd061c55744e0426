//! Potential energy curves of a diatomic molecule.
//!
//! All models are functions of the bond length `x` with minimum energy `E0`
//! at the equilibrium distance `r0` and curvature (spring constant) `k`:
//!
//! - harmonic: `E0 + k/2 (x - r0)^2`
//! - harmonic + cubic: adds `c3 (x - r0)^3`
//! - Morse, second form: `E0 + k/(2a^2) (1 - exp(-a (x - r0)))^2`
//! - extended Morse: adds `c3 (1 - exp(-a (x - r0)))^3`
//!
//! Initial guesses start from a quadratic least-squares pre-fit
//! ([`harmonic_guess`]); the Morse curves take `E0` and `r0` from the lowest
//! data point instead, since the quadratic is a poor fit far from `r0`.

use nalgebra::{DMatrix, DVector};

use crate::math::{polynomial_design, solve_least_squares};
use crate::models::ansatz::{argmin, first_axis_jacobian, map_first_axis, owned_names};
use crate::models::Ansatz;

/// `(E0, k, r0)` from an unweighted quadratic fit `y ≈ a x^2 + b x + c`.
///
/// `k = 2a`, `r0 = -b / k`, `E0 = c - k r0^2 / 2`. Needs a 1-D domain with at
/// least three points and a nonzero curvature.
pub fn harmonic_guess(domain: &DMatrix<f64>, response: &DVector<f64>) -> Option<DVector<f64>> {
    if domain.nrows() != 1 || domain.ncols() < 3 {
        return None;
    }
    let beta = solve_least_squares(&polynomial_design(domain, 2), response)?;
    let (c, b, a) = (beta[0], beta[1], beta[2]);
    let k = 2.0 * a;
    if k == 0.0 {
        return None;
    }
    let r0 = -b / k;
    let e0 = c - 0.5 * k * r0 * r0;
    [e0, k, r0]
        .iter()
        .all(|v| v.is_finite())
        .then(|| DVector::from_row_slice(&[e0, k, r0]))
}

/// `(E0, k, r0, a)` for the Morse curves: lowest point plus harmonic `k`.
fn morse_guess(domain: &DMatrix<f64>, response: &DVector<f64>) -> Option<DVector<f64>> {
    let harm = harmonic_guess(domain, response)?;
    let imin = argmin(response)?;
    let k = harm[1];
    Some(DVector::from_row_slice(&[response[imin], k, domain[(0, imin)], 0.01 * k]))
}

fn extend_guess(guess: DVector<f64>) -> DVector<f64> {
    let n = guess.len();
    guess.insert_row(n, 0.0)
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Harmonic;

impl Ansatz for Harmonic {
    fn name(&self) -> &str {
        "harmonic"
    }

    fn parameter_names(&self) -> Vec<String> {
        owned_names(&["E0", "k", "r0"])
    }

    fn evaluate(&self, p: &DVector<f64>, domain: &DMatrix<f64>) -> DVector<f64> {
        let (e0, k, r0) = (p[0], p[1], p[2]);
        map_first_axis(domain, |x| e0 + 0.5 * k * (x - r0).powi(2))
    }

    fn jacobian(&self, p: &DVector<f64>, domain: &DMatrix<f64>) -> Option<DMatrix<f64>> {
        let (k, r0) = (p[1], p[2]);
        Some(first_axis_jacobian(domain, |x| {
            let d = x - r0;
            [1.0, 0.5 * d * d, -k * d]
        }))
    }

    fn guess(&self, domain: &DMatrix<f64>, response: &DVector<f64>) -> Option<DVector<f64>> {
        harmonic_guess(domain, response)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct HarmonicCubic;

impl Ansatz for HarmonicCubic {
    fn name(&self) -> &str {
        "harmonic-cubic"
    }

    fn parameter_names(&self) -> Vec<String> {
        owned_names(&["E0", "k", "r0", "c3"])
    }

    fn evaluate(&self, p: &DVector<f64>, domain: &DMatrix<f64>) -> DVector<f64> {
        let (e0, k, r0, c3) = (p[0], p[1], p[2], p[3]);
        map_first_axis(domain, |x| {
            let d = x - r0;
            e0 + 0.5 * k * d * d + c3 * d * d * d
        })
    }

    fn jacobian(&self, p: &DVector<f64>, domain: &DMatrix<f64>) -> Option<DMatrix<f64>> {
        let (k, r0, c3) = (p[1], p[2], p[3]);
        Some(first_axis_jacobian(domain, |x| {
            let d = x - r0;
            [1.0, 0.5 * d * d, -k * d - 3.0 * c3 * d * d, d * d * d]
        }))
    }

    fn guess(&self, domain: &DMatrix<f64>, response: &DVector<f64>) -> Option<DVector<f64>> {
        harmonic_guess(domain, response).map(extend_guess)
    }
}

/// Morse potential parametrized by its curvature at the minimum.
#[derive(Debug, Clone, Copy, Default)]
pub struct Morse2;

impl Ansatz for Morse2 {
    fn name(&self) -> &str {
        "morse2"
    }

    fn parameter_names(&self) -> Vec<String> {
        owned_names(&["E0", "k", "r0", "a"])
    }

    fn evaluate(&self, p: &DVector<f64>, domain: &DMatrix<f64>) -> DVector<f64> {
        let (e0, k, r0, a) = (p[0], p[1], p[2], p[3]);
        map_first_axis(domain, |x| {
            let e = 1.0 - (-a * (x - r0)).exp();
            e0 + 0.5 * k / (a * a) * e * e
        })
    }

    fn jacobian(&self, p: &DVector<f64>, domain: &DMatrix<f64>) -> Option<DMatrix<f64>> {
        let (k, r0, a) = (p[1], p[2], p[3]);
        Some(first_axis_jacobian(domain, |x| {
            let d = x - r0;
            let u = (-a * d).exp();
            let e = 1.0 - u;
            // ∂f/∂e = k e / a^2; ∂e/∂r0 = -a u; ∂e/∂a = d u
            let df_de = k * e / (a * a);
            [
                1.0,
                0.5 * e * e / (a * a),
                -df_de * a * u,
                -k * e * e / (a * a * a) + df_de * d * u,
            ]
        }))
    }

    fn guess(&self, domain: &DMatrix<f64>, response: &DVector<f64>) -> Option<DVector<f64>> {
        morse_guess(domain, response)
    }
}

/// Morse potential with a cubic anharmonic correction.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExtMorse2;

impl Ansatz for ExtMorse2 {
    fn name(&self) -> &str {
        "ext-morse2"
    }

    fn parameter_names(&self) -> Vec<String> {
        owned_names(&["E0", "k", "r0", "a", "c3"])
    }

    fn evaluate(&self, p: &DVector<f64>, domain: &DMatrix<f64>) -> DVector<f64> {
        let (e0, k, r0, a, c3) = (p[0], p[1], p[2], p[3], p[4]);
        map_first_axis(domain, |x| {
            let e = 1.0 - (-a * (x - r0)).exp();
            e0 + 0.5 * k / (a * a) * e * e + c3 * e * e * e
        })
    }

    fn jacobian(&self, p: &DVector<f64>, domain: &DMatrix<f64>) -> Option<DMatrix<f64>> {
        let (k, r0, a, c3) = (p[1], p[2], p[3], p[4]);
        Some(first_axis_jacobian(domain, |x| {
            let d = x - r0;
            let u = (-a * d).exp();
            let e = 1.0 - u;
            let df_de = k * e / (a * a) + 3.0 * c3 * e * e;
            [
                1.0,
                0.5 * e * e / (a * a),
                -df_de * a * u,
                -k * e * e / (a * a * a) + df_de * d * u,
                e * e * e,
            ]
        }))
    }

    fn guess(&self, domain: &DMatrix<f64>, response: &DVector<f64>) -> Option<DVector<f64>> {
        morse_guess(domain, response).map(extend_guess)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datasets::{CR2_X, CR2_Y};
    use crate::models::ansatz::testing::assert_jacobian_matches;

    fn cr2_domain() -> (DMatrix<f64>, DVector<f64>) {
        (
            DMatrix::from_row_slice(1, CR2_X.len(), &CR2_X),
            DVector::from_column_slice(&CR2_Y),
        )
    }

    #[test]
    fn harmonic_guess_is_exact_for_quadratic_data() {
        let xs = [1.5, 1.7, 1.9, 2.1, 2.4];
        let truth = DVector::from_row_slice(&[-2.0, 1.6, 1.85]);
        let domain = DMatrix::from_row_slice(1, xs.len(), &xs);
        let y = Harmonic.evaluate(&truth, &domain);

        let guess = Harmonic.guess(&domain, &y).unwrap();
        for (g, t) in guess.iter().zip(truth.iter()) {
            assert!((g - t).abs() < 1e-8, "{g} vs {t}");
        }
    }

    #[test]
    fn harmonic_guess_on_cr2() {
        let (domain, y) = cr2_domain();
        let g = harmonic_guess(&domain, &y).unwrap();
        assert!((g[0] + 2.04140).abs() < 1e-4);
        assert!((g[1] - 1.87403).abs() < 1e-4);
        assert!((g[2] - 1.93050).abs() < 1e-4);
    }

    #[test]
    fn harmonic_guess_needs_three_points() {
        let domain = DMatrix::from_row_slice(1, 2, &[1.0, 2.0]);
        let y = DVector::from_row_slice(&[1.0, 2.0]);
        assert!(harmonic_guess(&domain, &y).is_none());
    }

    #[test]
    fn morse_guess_uses_lowest_point() {
        let (domain, y) = cr2_domain();
        let g = Morse2.guess(&domain, &y).unwrap();
        assert_eq!(g.len(), 4);
        assert_eq!(g[0], -2.190);
        assert_eq!(g[2], 1.800);
        assert!((g[1] - 1.87403).abs() < 1e-4);
        assert!((g[3] - 0.01 * g[1]).abs() < 1e-15);

        let ext = ExtMorse2.guess(&domain, &y).unwrap();
        assert_eq!(ext.len(), 5);
        assert_eq!(ext[4], 0.0);
        assert_eq!(ext.rows(0, 4), g.rows(0, 4));
    }

    #[test]
    fn morse_reduces_to_harmonic_near_minimum() {
        let p = DVector::from_row_slice(&[-2.0, 1.5, 1.8, 1e-4]);
        let h = DVector::from_row_slice(&[-2.0, 1.5, 1.8]);
        let domain = DMatrix::from_row_slice(1, 3, &[1.6, 1.8, 2.2]);
        let morse = Morse2.evaluate(&p, &domain);
        let harm = Harmonic.evaluate(&h, &domain);
        for (m, h) in morse.iter().zip(harm.iter()) {
            assert!((m - h).abs() < 1e-4);
        }
        assert_eq!(morse[1], -2.0);
    }

    #[test]
    fn analytic_jacobians_match_finite_differences() {
        let xs = [1.55, 1.7, 1.8, 2.0, 2.4, 3.0];
        assert_jacobian_matches(&Harmonic, &[-2.0, 1.5, 1.8], &xs);
        assert_jacobian_matches(&HarmonicCubic, &[-2.0, 1.5, 1.8, -0.4], &xs);
        assert_jacobian_matches(&Morse2, &[-2.19, 9.8, 1.80, 1.86], &xs);
        assert_jacobian_matches(&ExtMorse2, &[-2.19, 9.8, 1.80, 1.86, 0.3], &xs);
    }
}
