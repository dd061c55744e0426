//! Read/write run summary JSON files.
//!
//! A summary is the portable record of one stochastic run:
//! - ansatz, method, seed, iteration count and spread convention
//! - the baseline fit with its asymptotic errors
//! - the Monte Carlo estimates
//! - for one-dimensional domains, the mean curve and its band on a grid

use std::fs::File;
use std::path::Path;

use chrono::{DateTime, Utc};
use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

use crate::domain::FitSample;
use crate::error::{AppError, FitError};
use crate::fit::FitMethod;
use crate::math::Spread;
use crate::models::Ansatz;
use crate::stochastic::{ParameterEstimates, StochasticRun};

/// Points of the curve grid stored in a summary.
pub const CURVE_GRID_POINTS: usize = 101;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub tool: String,
    pub generated: DateTime<Utc>,
    pub ansatz: String,
    pub method: FitMethod,
    pub seed: Option<u64>,
    pub points: usize,
    pub iterations: usize,
    pub spread: Spread,
    pub baseline: Option<BaselineSummary>,
    pub estimates: ParameterEstimates,
    pub curve: Option<CurveGrid>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BaselineSummary {
    pub params: Vec<f64>,
    pub xerr: Option<Vec<f64>>,
    pub chi_square: f64,
    pub funcalls: usize,
}

/// Mean curve and its spread on an even grid over the sampled range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurveGrid {
    pub x: Vec<f64>,
    pub mean: Vec<f64>,
    pub error: Vec<f64>,
}

impl RunSummary {
    pub fn from_run<A: Ansatz + ?Sized>(
        run: &StochasticRun<'_, A>,
        method: FitMethod,
        sample: &FitSample,
    ) -> Result<Self, FitError> {
        let baseline = run.baseline().map(|b| BaselineSummary {
            params: b.result.xopt.iter().copied().collect(),
            xerr: b.result.xerr.as_ref().map(|e| e.iter().copied().collect()),
            chi_square: b.result.chi_square,
            funcalls: b.result.funcalls,
        });

        let curve = match sample.domain_bounds().as_slice() {
            [(lo, hi)] => {
                let x = grid(*lo, *hi, CURVE_GRID_POINTS);
                let values = run.evaluate_curve(&DMatrix::from_row_slice(1, x.len(), &x))?;
                Some(CurveGrid {
                    mean: values.iter().map(|v| v.mean()).collect(),
                    error: values.iter().map(|v| v.error()).collect(),
                    x,
                })
            }
            _ => None,
        };

        Ok(Self {
            tool: "mcfit".to_string(),
            generated: Utc::now(),
            ansatz: run.ansatz().name().to_string(),
            method,
            seed: run.seed(),
            points: sample.len(),
            iterations: run.num_iterations(),
            spread: run.spread(),
            baseline,
            estimates: run.estimates().clone(),
            curve,
        })
    }
}

/// Write a run summary JSON file.
pub fn write_summary_json(path: &Path, summary: &RunSummary) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::new(2, format!("Failed to create summary JSON '{}': {e}", path.display())))?;
    serde_json::to_writer_pretty(file, summary)
        .map_err(|e| AppError::new(2, format!("Failed to write summary JSON: {e}")))?;
    Ok(())
}

/// Read a run summary JSON file.
pub fn read_summary_json(path: &Path) -> Result<RunSummary, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::new(2, format!("Failed to open summary JSON '{}': {e}", path.display())))?;
    let summary: RunSummary =
        serde_json::from_reader(file).map_err(|e| AppError::new(2, format!("Invalid summary JSON: {e}")))?;
    Ok(summary)
}

fn grid(lo: f64, hi: f64, n: usize) -> Vec<f64> {
    let n = n.max(2);
    if !(hi > lo) {
        return vec![lo];
    }
    (0..n)
        .map(|i| lo + (hi - lo) * i as f64 / (n as f64 - 1.0))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Linear;
    use crate::stochastic::{StochasticConfig, StochasticFitter};

    fn line_sample() -> FitSample {
        FitSample::from_columns(&[0.0, 1.0, 2.0, 3.0], &[1.0, 3.1, 4.9, 7.0], &[0.1, 0.1, 0.1, 0.1]).unwrap()
    }

    #[test]
    fn summary_round_trips_through_json() {
        let sample = line_sample();
        let config = StochasticConfig {
            num_iterations: 10,
            seed: Some(3),
            ..StochasticConfig::default()
        };
        let run = StochasticFitter::new(&Linear, &sample, config).run().unwrap();
        let summary = RunSummary::from_run(&run, FitMethod::LevenbergMarquardt, &sample).unwrap();

        assert_eq!(summary.ansatz, "linear");
        assert_eq!(summary.seed, Some(3));
        assert_eq!(summary.iterations, 10);
        assert_eq!(summary.points, 4);
        let curve = summary.curve.as_ref().unwrap();
        assert_eq!(curve.x.len(), CURVE_GRID_POINTS);
        assert_eq!(curve.x[0], 0.0);
        assert_eq!(curve.x[CURVE_GRID_POINTS - 1], 3.0);
        assert!(summary.baseline.as_ref().unwrap().xerr.is_some());

        let json = serde_json::to_string(&summary).unwrap();
        let back: RunSummary = serde_json::from_str(&json).unwrap();
        assert_eq!(back.estimates, summary.estimates);
        assert_eq!(back.method, summary.method);
        assert_eq!(back.curve, summary.curve);
    }

    #[test]
    fn summary_file_preserves_floats_exactly() {
        let sample = line_sample();
        let config = StochasticConfig {
            num_iterations: 5,
            seed: Some(17),
            ..StochasticConfig::default()
        };
        let run = StochasticFitter::new(&Linear, &sample, config).run().unwrap();
        let mut summary = RunSummary::from_run(&run, FitMethod::LevenbergMarquardt, &sample).unwrap();
        // Shortest repr that a fast-path parser reads back one ulp low.
        summary.curve.as_mut().unwrap().mean[4] = 1.2988358955967165;

        let path = std::env::temp_dir().join(format!("mcfit-summary-{}.json", std::process::id()));
        write_summary_json(&path, &summary).unwrap();
        let back = read_summary_json(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(back, summary);
        assert_eq!(back.curve.unwrap().mean[4].to_bits(), 1.2988358955967165f64.to_bits());
    }

    #[test]
    fn degenerate_grid_is_a_single_point() {
        assert_eq!(grid(1.0, 1.0, 5), vec![1.0]);
        assert_eq!(grid(0.0, 1.0, 3), vec![0.0, 0.5, 1.0]);
    }
}
