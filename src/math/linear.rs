//! Closed-form weighted straight-line regression.
//!
//! Fits `y = a + b x` minimizing `Σ w_i (y_i - a - b x_i)^2` with
//! `w_i = 1 / σ_i^2` (or unit weights). The standard errors are the
//! unscaled ones, `sqrt` of the diagonal of the inverse normal matrix, which
//! is what a χ² fit with known σ reports.

/// Result of a straight-line regression.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineFit {
    /// Intercept.
    pub a: f64,
    /// Slope.
    pub b: f64,
    pub sigma_a: f64,
    pub sigma_b: f64,
}

/// Weighted linear regression of `y` on `x`.
///
/// `sigma` gives per-point uncertainties; `None` means unit weights.
/// Returns `None` for mismatched lengths, fewer than two points, a
/// non-positive σ, or a degenerate (all-equal) `x`.
pub fn linear_regression(x: &[f64], y: &[f64], sigma: Option<&[f64]>) -> Option<LineFit> {
    if x.len() != y.len() || x.len() < 2 {
        return None;
    }
    if let Some(s) = sigma {
        if s.len() != x.len() || s.iter().any(|v| !(v.is_finite() && *v > 0.0)) {
            return None;
        }
    }

    let weight = |i: usize| sigma.map_or(1.0, |s| s[i].powi(-2));

    let (mut sw, mut swx, mut swxx, mut swy, mut swxy) = (0.0, 0.0, 0.0, 0.0, 0.0);
    for i in 0..x.len() {
        let w = weight(i);
        sw += w;
        swx += w * x[i];
        swxx += w * x[i] * x[i];
        swy += w * y[i];
        swxy += w * x[i] * y[i];
    }

    let det = sw * swxx - swx * swx;
    if !(det.is_finite() && det.abs() > f64::EPSILON * sw * swxx) {
        return None;
    }

    Some(LineFit {
        a: (swy * swxx - swx * swxy) / det,
        b: (sw * swxy - swx * swy) / det,
        sigma_a: (swxx / det).sqrt(),
        sigma_b: (sw / det).sqrt(),
    })
}
