//! Configuration of a stochastic run.

use clap::ValueEnum;
use nalgebra::DVector;
use serde::{Deserialize, Serialize};

use crate::error::FitError;
use crate::fit::FitConfig;
use crate::math::Spread;

/// Where the starting point of every perturbed refit comes from.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum BaselineSeed {
    /// Fit the unperturbed sample first and start every refit from its optimum.
    #[default]
    Fit,
    /// Skip the baseline fit and start every refit from this vector.
    Guess(DVector<f64>),
}

/// How the resampling iterations are scheduled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum Execution {
    /// One normal stream consumed in iteration order.
    #[default]
    Sequential,
    /// Iterations on the rayon pool, one derived stream per iteration.
    Parallel,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StochasticConfig {
    /// Number of perturbed refits (>= 1).
    pub num_iterations: usize,
    /// Run seed. `None` draws one from OS entropy.
    pub seed: Option<u64>,
    pub baseline: BaselineSeed,
    /// Weight perturbed refits by `dy`. The baseline is always weighted.
    pub use_dy_weights: bool,
    /// Standard deviation convention for parameters and curves.
    pub spread: Spread,
    pub execution: Execution,
    /// Driver method and solver options shared by every fit of the run.
    pub fit: FitConfig,
}

impl Default for StochasticConfig {
    fn default() -> Self {
        Self {
            num_iterations: 100,
            seed: None,
            baseline: BaselineSeed::Fit,
            use_dy_weights: true,
            spread: Spread::Population,
            execution: Execution::Sequential,
            fit: FitConfig::default(),
        }
    }
}

impl StochasticConfig {
    pub fn validate(&self) -> Result<(), FitError> {
        if self.num_iterations == 0 {
            return Err(FitError::invalid("num_iterations must be >= 1"));
        }
        if self.num_iterations < self.spread.min_count() {
            return Err(FitError::invalid(format!(
                "{:?} spread needs at least {} iterations",
                self.spread,
                self.spread.min_count()
            )));
        }
        if let BaselineSeed::Guess(g) = &self.baseline {
            if g.iter().any(|v| !v.is_finite()) {
                return Err(FitError::invalid("baseline guess must be finite"));
            }
        }
        self.fit.solver.validate(self.fit.method)
    }
}
