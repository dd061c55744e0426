//! Results of a stochastic run.

use std::collections::BTreeMap;

use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

use crate::error::FitError;
use crate::errorbar::ErrorbarValue;
use crate::fit::FitResult;
use crate::math::{Spread, summarize_matrix_columns};
use crate::models::Ansatz;

/// Residual norms of one refit, against the perturbed and the original response.
///
/// "Weighted" means divided by `dy` before squaring.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResidualStats {
    pub perturbed_ssr: f64,
    pub perturbed_wssr: f64,
    pub original_ssr: f64,
    pub original_wssr: f64,
}

/// The deterministic fit that seeded the resampling loop.
#[derive(Debug, Clone, PartialEq)]
pub struct BaselineFit {
    pub result: FitResult,
    /// Unweighted sum of squares against the original response.
    pub ssr: f64,
    /// Weighted sum of squares against the original response.
    pub wssr: f64,
}

/// Aggregated parameter estimates, in parameter order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterEstimates {
    names: Vec<String>,
    values: Vec<ErrorbarValue>,
}

impl ParameterEstimates {
    pub fn new(names: Vec<String>, values: Vec<ErrorbarValue>) -> Result<Self, FitError> {
        if names.len() != values.len() {
            return Err(FitError::invalid(format!(
                "{} parameter names for {} estimates",
                names.len(),
                values.len()
            )));
        }
        Ok(Self { names, values })
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn values(&self) -> &[ErrorbarValue] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<ErrorbarValue> {
        self.names
            .iter()
            .position(|n| n == name)
            .map(|i| self.values[i])
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, ErrorbarValue)> + '_ {
        self.names.iter().map(String::as_str).zip(self.values.iter().copied())
    }

    pub fn to_map(&self) -> BTreeMap<String, ErrorbarValue> {
        self.iter().map(|(n, v)| (n.to_string(), v)).collect()
    }
}

/// A completed run: the baseline, every refit, and the aggregate.
///
/// Nothing here changes after aggregation; curve evaluation only reads the
/// stored parameter vectors.
pub struct StochasticRun<'a, A: ?Sized> {
    pub(crate) ansatz: &'a A,
    pub(crate) seed: Option<u64>,
    pub(crate) spread: Spread,
    pub(crate) nlf_guess: DVector<f64>,
    pub(crate) baseline: Option<BaselineFit>,
    pub(crate) mc_params: Vec<DVector<f64>>,
    pub(crate) mc_stats: Vec<ResidualStats>,
    pub(crate) mc_funcalls: Vec<usize>,
    pub(crate) estimates: ParameterEstimates,
}

impl<'a, A: Ansatz + ?Sized> StochasticRun<'a, A> {
    pub fn ansatz(&self) -> &'a A {
        self.ansatz
    }

    /// Seed the normal draws came from (`None` for an external source
    /// without a declared seed).
    pub fn seed(&self) -> Option<u64> {
        self.seed
    }

    pub fn spread(&self) -> Spread {
        self.spread
    }

    /// Starting point of every refit.
    pub fn nlf_guess(&self) -> &DVector<f64> {
        &self.nlf_guess
    }

    /// `None` when the caller supplied the starting point instead.
    pub fn baseline(&self) -> Option<&BaselineFit> {
        self.baseline.as_ref()
    }

    pub fn num_iterations(&self) -> usize {
        self.mc_params.len()
    }

    pub fn mc_params(&self) -> &[DVector<f64>] {
        &self.mc_params
    }

    pub fn mc_stats(&self) -> &[ResidualStats] {
        &self.mc_stats
    }

    /// Residual evaluations spent by each refit.
    pub fn mc_funcalls(&self) -> &[usize] {
        &self.mc_funcalls
    }

    pub fn estimates(&self) -> &ParameterEstimates {
        &self.estimates
    }

    pub fn parameter_names(&self) -> &[String] {
        self.estimates.names()
    }

    /// Model values of every stored parameter vector at `x` (iterations × points).
    pub fn evaluate_curve_raw(&self, x: &DMatrix<f64>) -> Result<DMatrix<f64>, FitError> {
        if x.nrows() != self.ansatz.domain_dim() {
            return Err(FitError::invalid(format!(
                "ansatz '{}' expects a {}-dimensional domain, got {}",
                self.ansatz.name(),
                self.ansatz.domain_dim(),
                x.nrows()
            )));
        }
        let mut out = DMatrix::zeros(self.mc_params.len(), x.ncols());
        for (i, params) in self.mc_params.iter().enumerate() {
            let values = self.ansatz.evaluate(params, x);
            if values.len() != x.ncols() {
                return Err(FitError::invalid(format!(
                    "ansatz '{}' returned {} values for {} query points",
                    self.ansatz.name(),
                    values.len(),
                    x.ncols()
                )));
            }
            out.row_mut(i).copy_from(&values.transpose());
        }
        Ok(out)
    }

    /// Per-point mean and spread of the fitted curves at `x`, aggregated
    /// like the parameters.
    pub fn evaluate_curve(&self, x: &DMatrix<f64>) -> Result<Vec<ErrorbarValue>, FitError> {
        self.evaluate_curve_with(x, self.spread)
    }

    pub fn evaluate_curve_with(&self, x: &DMatrix<f64>, spread: Spread) -> Result<Vec<ErrorbarValue>, FitError> {
        let raw = self.evaluate_curve_raw(x)?;
        summarize_matrix_columns(&raw, spread).ok_or_else(|| {
            FitError::invalid(format!(
                "{spread:?} spread needs at least {} iterations, run has {}",
                spread.min_count(),
                raw.nrows()
            ))
        })
    }
}
