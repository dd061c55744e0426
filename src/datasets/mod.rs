//! Bundled reference data.

use crate::domain::FitSample;
use crate::error::FitError;

/// Cr2 binding-energy curve: bond length (Å), energy (eV), and its
/// statistical uncertainty from a quantum Monte Carlo calculation.
pub const CR2_X: [f64; 9] = [1.550, 1.600, 1.6788, 1.720, 1.800, 1.900, 2.000, 2.400, 3.000];
pub const CR2_Y: [f64; 9] = [-1.613, -1.897, -2.141, -2.143, -2.190, -2.064, -2.038, -1.611, -1.037];
pub const CR2_DY: [f64; 9] = [0.025, 0.036, 0.016, 0.025, 0.022, 0.020, 0.023, 0.019, 0.018];

/// The Cr2 curve as a fit sample.
pub fn cr2() -> Result<FitSample, FitError> {
    FitSample::from_columns(&CR2_X, &CR2_Y, &CR2_DY)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cr2_sample_is_valid() {
        let s = cr2().unwrap();
        assert_eq!(s.len(), 9);
        let (lo, hi) = s.domain_bounds()[0];
        assert_eq!((lo, hi), (1.55, 3.0));
    }
}
