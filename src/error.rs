//! Error types.
//!
//! Two layers:
//!
//! - [`FitError`]: what the library returns (fit driver, stochastic engine)
//! - [`AppError`]: what the binary prints, carrying a stable process exit code
//!
//! Exit codes used by the CLI:
//! - 2: invalid input/configuration (bad arguments, unknown method, unreadable files)
//! - 3: no usable data rows
//! - 4: numerical failure (a fit did not converge)
//! - 5: run cancelled

use std::fmt;

/// Which part of a run a fit failure belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FitStage {
    /// A standalone call to the fit driver.
    Fit,
    /// The deterministic fit on the unperturbed sample.
    Baseline,
    /// One perturbed refit of the resampling loop (0-based).
    Iteration(usize),
}

impl fmt::Display for FitStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FitStage::Fit => write!(f, "fit"),
            FitStage::Baseline => write!(f, "baseline fit"),
            FitStage::Iteration(i) => write!(f, "iteration {i}"),
        }
    }
}

/// Errors surfaced by the fit driver and the stochastic engine.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FitError {
    /// Malformed shapes, contradictory weighting, unresolvable guess, bad options.
    #[error("invalid arguments: {0}")]
    InvalidArguments(String),

    /// Solver name that does not map to a [`crate::fit::FitMethod`].
    #[error("unsupported fit method '{0}'")]
    UnsupportedMethod(String),

    /// The solver terminated without convergence or raised an internal error.
    #[error("{stage} failed: {reason}")]
    FitFailed { stage: FitStage, reason: String },

    /// A cooperative cancellation flag was raised between iterations.
    #[error("run cancelled after {completed} of {requested} iterations")]
    Cancelled { completed: usize, requested: usize },
}

impl FitError {
    pub fn invalid(message: impl Into<String>) -> Self {
        FitError::InvalidArguments(message.into())
    }

    pub fn failed(reason: impl Into<String>) -> Self {
        FitError::FitFailed {
            stage: FitStage::Fit,
            reason: reason.into(),
        }
    }

    /// Re-tag a driver failure with the run phase it happened in.
    ///
    /// Only `FitFailed` carries a stage; other variants pass through.
    pub fn at_stage(self, stage: FitStage) -> Self {
        match self {
            FitError::FitFailed { reason, .. } => FitError::FitFailed { stage, reason },
            other => other,
        }
    }
}

#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }
}

impl From<FitError> for AppError {
    fn from(err: FitError) -> Self {
        let code = match err {
            FitError::InvalidArguments(_) | FitError::UnsupportedMethod(_) => 2,
            FitError::FitFailed { .. } => 4,
            FitError::Cancelled { .. } => 5,
        };
        AppError::new(code, err.to_string())
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl fmt::Debug for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fit_errors_map_to_exit_codes() {
        assert_eq!(AppError::from(FitError::invalid("x")).exit_code(), 2);
        assert_eq!(AppError::from(FitError::UnsupportedMethod("powell".into())).exit_code(), 2);
        assert_eq!(AppError::from(FitError::failed("diverged")).exit_code(), 4);
        assert_eq!(
            AppError::from(FitError::Cancelled { completed: 3, requested: 10 }).exit_code(),
            5
        );
    }

    #[test]
    fn failure_message_names_iteration() {
        let err = FitError::failed("max iterations reached").at_stage(FitStage::Iteration(7));
        assert_eq!(err.to_string(), "iteration 7 failed: max iterations reached");
    }
}
