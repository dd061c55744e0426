//! Sample statistics used to aggregate Monte Carlo results.
//!
//! The spread convention is explicit: [`Spread::Population`] divides by `n`
//! (ddof = 0), [`Spread::Sample`] divides by `n - 1` (ddof = 1).

use clap::ValueEnum;
use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

use crate::errorbar::ErrorbarValue;

/// Standard deviation convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum Spread {
    /// Divide by `n`.
    #[default]
    Population,
    /// Divide by `n - 1`.
    Sample,
}

impl Spread {
    /// Delta degrees of freedom.
    pub fn ddof(self) -> usize {
        match self {
            Spread::Population => 0,
            Spread::Sample => 1,
        }
    }

    /// Smallest number of observations this convention is defined for.
    pub fn min_count(self) -> usize {
        self.ddof() + 1
    }
}

pub fn mean<I>(values: I) -> Option<f64>
where
    I: IntoIterator<Item = f64>,
{
    let (sum, n) = values
        .into_iter()
        .fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    (n > 0).then(|| sum / n as f64)
}

/// Two-pass standard deviation. `None` when `n <= ddof`.
pub fn std_dev(values: &[f64], spread: Spread) -> Option<f64> {
    let n = values.len();
    if n < spread.min_count() {
        return None;
    }
    let m = mean(values.iter().copied())?;
    let ss: f64 = values.iter().map(|v| (v - m) * (v - m)).sum();
    Some((ss / (n - spread.ddof()) as f64).sqrt())
}

/// Mean and standard deviation packaged as an errorbar value.
pub fn summarize(values: &[f64], spread: Spread) -> Option<ErrorbarValue> {
    let m = mean(values.iter().copied())?;
    let s = std_dev(values, spread)?;
    Some(ErrorbarValue::new(m, s))
}

/// Column-wise summary of a set of equally long vectors.
///
/// Entry `j` aggregates `rows[k][j]` over all `k`.
pub fn summarize_columns(rows: &[DVector<f64>], spread: Spread) -> Option<Vec<ErrorbarValue>> {
    let width = rows.first()?.len();
    if rows.iter().any(|r| r.len() != width) {
        return None;
    }
    (0..width)
        .map(|j| {
            let column: Vec<f64> = rows.iter().map(|r| r[j]).collect();
            summarize(&column, spread)
        })
        .collect()
}

/// Column-wise summary of a matrix whose rows are observations.
pub fn summarize_matrix_columns(samples: &DMatrix<f64>, spread: Spread) -> Option<Vec<ErrorbarValue>> {
    samples
        .column_iter()
        .map(|c| {
            let column: Vec<f64> = c.iter().copied().collect();
            summarize(&column, spread)
        })
        .collect()
}
