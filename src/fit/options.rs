//! Fit method selection and solver tuning options.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::FitError;

/// Supported minimization methods.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FitMethod {
    /// MINPACK Levenberg-Marquardt on the residual vector. Reports `xerr`.
    #[default]
    LevenbergMarquardt,
    /// Downhill simplex on the sum of squares.
    NelderMead,
    /// Limited-memory BFGS on the sum of squares.
    Bfgs,
    /// Simulated annealing on the sum of squares.
    Anneal,
}

impl FitMethod {
    pub const ALL: [FitMethod; 4] = [
        FitMethod::LevenbergMarquardt,
        FitMethod::NelderMead,
        FitMethod::Bfgs,
        FitMethod::Anneal,
    ];

    pub fn name(self) -> &'static str {
        match self {
            FitMethod::LevenbergMarquardt => "levenberg-marquardt",
            FitMethod::NelderMead => "nelder-mead",
            FitMethod::Bfgs => "bfgs",
            FitMethod::Anneal => "anneal",
        }
    }
}

impl fmt::Display for FitMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for FitMethod {
    type Err = FitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "levenberg-marquardt" | "lm" | "leastsq" => Ok(FitMethod::LevenbergMarquardt),
            "nelder-mead" | "simplex" | "fmin" => Ok(FitMethod::NelderMead),
            "bfgs" | "lbfgs" | "l-bfgs" | "fmin_bfgs" => Ok(FitMethod::Bfgs),
            "anneal" | "simulated-annealing" => Ok(FitMethod::Anneal),
            _ => Err(FitError::UnsupportedMethod(s.to_string())),
        }
    }
}

/// Levenberg-Marquardt tolerances (MINPACK semantics).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LmOptions {
    /// Relative reduction of the sum of squares.
    pub ftol: f64,
    /// Relative change of the parameters.
    pub xtol: f64,
    /// Orthogonality between residuals and Jacobian columns.
    pub gtol: f64,
    /// Initial step bound factor.
    pub stepbound: f64,
    /// Evaluation budget is `patience * (num_params + 1)`.
    pub patience: usize,
}

impl Default for LmOptions {
    fn default() -> Self {
        Self {
            ftol: 1.49012e-8,
            xtol: 1.49012e-8,
            gtol: 0.0,
            stepbound: 100.0,
            patience: 100,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NelderMeadOptions {
    /// Stop when the standard deviation of the simplex costs drops below this.
    pub sd_tolerance: f64,
    pub max_iters: u64,
}

impl Default for NelderMeadOptions {
    fn default() -> Self {
        Self {
            sd_tolerance: 1e-12,
            max_iters: 5000,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BfgsOptions {
    /// Number of correction pairs kept.
    pub memory: usize,
    pub tolerance_grad: f64,
    pub tolerance_cost: f64,
    pub max_iters: u64,
}

impl Default for BfgsOptions {
    fn default() -> Self {
        Self {
            memory: 10,
            tolerance_grad: 1e-8,
            tolerance_cost: 1e-12,
            max_iters: 1000,
        }
    }
}

/// Simulated annealing followed by a Nelder-Mead polish of the best point.
///
/// Temperatures are in units of the cost at the starting point, so the same
/// options work for any data scale. The polish uses the `nelder_mead`
/// section of [`SolverOptions`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnnealOptions {
    pub initial_temperature: f64,
    /// Temperature reached after `max_iters` steps of geometric cooling.
    pub final_temperature: f64,
    pub max_iters: u64,
    /// Stop once the best point has not improved for this many steps.
    pub stall_best: u64,
    /// Proposal width at the initial temperature, relative to each
    /// parameter's magnitude in the starting guess.
    pub step_scale: f64,
    /// Seed for proposals and acceptance draws, so a fit is reproducible.
    pub seed: u64,
}

impl Default for AnnealOptions {
    fn default() -> Self {
        Self {
            initial_temperature: 1.0,
            final_temperature: 1e-6,
            max_iters: 20_000,
            stall_best: 2_000,
            step_scale: 0.1,
            seed: 0x5eed,
        }
    }
}

/// Per-method tuning. Only the section of the selected method is used.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SolverOptions {
    pub lm: LmOptions,
    pub nelder_mead: NelderMeadOptions,
    pub bfgs: BfgsOptions,
    pub anneal: AnnealOptions,
}

impl SolverOptions {
    /// Check the section used by `method`.
    pub fn validate(&self, method: FitMethod) -> Result<(), FitError> {
        match method {
            FitMethod::LevenbergMarquardt => {
                let o = &self.lm;
                non_negative("lm.ftol", o.ftol)?;
                non_negative("lm.xtol", o.xtol)?;
                non_negative("lm.gtol", o.gtol)?;
                positive("lm.stepbound", o.stepbound)?;
                nonzero("lm.patience", o.patience as u64)
            }
            FitMethod::NelderMead => self.validate_nelder_mead(),
            FitMethod::Bfgs => {
                let o = &self.bfgs;
                nonzero("bfgs.memory", o.memory as u64)?;
                non_negative("bfgs.tolerance_grad", o.tolerance_grad)?;
                non_negative("bfgs.tolerance_cost", o.tolerance_cost)?;
                nonzero("bfgs.max_iters", o.max_iters)
            }
            FitMethod::Anneal => {
                let o = &self.anneal;
                positive("anneal.final_temperature", o.final_temperature)?;
                positive("anneal.step_scale", o.step_scale)?;
                nonzero("anneal.max_iters", o.max_iters)?;
                nonzero("anneal.stall_best", o.stall_best)?;
                if !(o.initial_temperature.is_finite() && o.initial_temperature > o.final_temperature) {
                    return Err(FitError::invalid(
                        "anneal.initial_temperature must be finite and above final_temperature",
                    ));
                }
                self.validate_nelder_mead()
            }
        }
    }

    fn validate_nelder_mead(&self) -> Result<(), FitError> {
        non_negative("nelder_mead.sd_tolerance", self.nelder_mead.sd_tolerance)?;
        nonzero("nelder_mead.max_iters", self.nelder_mead.max_iters)
    }
}

/// Everything the driver needs besides the data.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FitConfig {
    pub method: FitMethod,
    pub solver: SolverOptions,
}

impl FitConfig {
    pub fn with_method(method: FitMethod) -> Self {
        Self {
            method,
            ..Self::default()
        }
    }
}

fn non_negative(name: &str, v: f64) -> Result<(), FitError> {
    if v.is_finite() && v >= 0.0 {
        Ok(())
    } else {
        Err(FitError::invalid(format!("{name} must be finite and >= 0 (got {v})")))
    }
}

fn positive(name: &str, v: f64) -> Result<(), FitError> {
    if v.is_finite() && v > 0.0 {
        Ok(())
    } else {
        Err(FitError::invalid(format!("{name} must be finite and > 0 (got {v})")))
    }
}

fn nonzero(name: &str, v: u64) -> Result<(), FitError> {
    if v > 0 {
        Ok(())
    } else {
        Err(FitError::invalid(format!("{name} must be > 0")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn legacy_method_names_are_accepted() {
        assert_eq!("leastsq".parse::<FitMethod>().unwrap(), FitMethod::LevenbergMarquardt);
        assert_eq!("fmin".parse::<FitMethod>().unwrap(), FitMethod::NelderMead);
        assert_eq!("fmin_bfgs".parse::<FitMethod>().unwrap(), FitMethod::Bfgs);
        assert_eq!("Anneal".parse::<FitMethod>().unwrap(), FitMethod::Anneal);
        for m in FitMethod::ALL {
            assert_eq!(m.name().parse::<FitMethod>().unwrap(), m);
        }
    }

    #[test]
    fn unknown_method_is_unsupported() {
        let err = "powell".parse::<FitMethod>().unwrap_err();
        assert_eq!(err, FitError::UnsupportedMethod("powell".to_string()));
    }

    #[test]
    fn defaults_validate_for_every_method() {
        let opts = SolverOptions::default();
        for m in FitMethod::ALL {
            opts.validate(m).unwrap();
        }
    }

    #[test]
    fn bad_tolerances_are_rejected() {
        let mut opts = SolverOptions::default();
        opts.lm.ftol = -1.0;
        assert!(matches!(
            opts.validate(FitMethod::LevenbergMarquardt),
            Err(FitError::InvalidArguments(_))
        ));
        // Other sections are not consulted.
        opts.validate(FitMethod::NelderMead).unwrap();

        opts.anneal.initial_temperature = 1e-9;
        assert!(opts.validate(FitMethod::Anneal).is_err());
    }

    #[test]
    fn anneal_also_checks_its_polish_section() {
        let mut opts = SolverOptions::default();
        opts.nelder_mead.max_iters = 0;
        assert!(opts.validate(FitMethod::Anneal).is_err());

        let mut opts = SolverOptions::default();
        opts.anneal.stall_best = 0;
        assert!(opts.validate(FitMethod::Anneal).is_err());
    }
}
