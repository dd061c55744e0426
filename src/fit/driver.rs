//! The deterministic fit driver.
//!
//! One call = one minimization of `Σ r²` with
//! `r(p) = (f(p, x) - y) * sqrt(w)`, where `sqrt(w)` is `1/dy` when
//! uncertainties are given, `sqrt(weight)` when weights are given, and 1
//! otherwise.
//!
//! The driver:
//! - validates shapes and weighting before any numerical work
//! - resolves the initial guess (caller first, then the ansatz heuristic)
//! - dispatches to the selected solver
//! - recomputes `chi_square` at the optimum
//! - for Levenberg-Marquardt, derives `xerr` from `(JᵀJ)⁻¹` scaled by the
//!   reduced χ²
//!
//! It holds no state between calls.

use argmin::core::{Executor, State, TerminationReason};
use argmin::solver::linesearch::MoreThuenteLineSearch;
use argmin::solver::neldermead::NelderMead;
use argmin::solver::quasinewton::LBFGS;
use argmin::solver::simulatedannealing::{SATempFunc, SimulatedAnnealing};
use levenberg_marquardt::LevenbergMarquardt;
use nalgebra::{DMatrix, DVector};
use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::domain::FitSample;
use crate::error::FitError;
use crate::fit::residuals::{AnnealSteps, LmProblem, SumOfSquares, WeightedResiduals};
use crate::fit::{BfgsOptions, EvalObserver, FitConfig, FitMethod, LmOptions, NelderMeadOptions, SolverOptions};
use crate::models::Ansatz;

/// Inputs of a single fit. Borrowed, so building one is free.
#[derive(Clone, Copy)]
pub struct FitRequest<'a> {
    domain: &'a DMatrix<f64>,
    response: &'a DVector<f64>,
    weight: Option<&'a DVector<f64>>,
    uncertainty: Option<&'a DVector<f64>>,
    initial_guess: Option<&'a DVector<f64>>,
    observer: Option<&'a dyn EvalObserver>,
}

impl<'a> FitRequest<'a> {
    /// Unweighted fit of `response` over `domain` (D×N).
    pub fn new(domain: &'a DMatrix<f64>, response: &'a DVector<f64>) -> Self {
        Self {
            domain,
            response,
            weight: None,
            uncertainty: None,
            initial_guess: None,
            observer: None,
        }
    }

    /// Fit a sample weighted by its uncertainties.
    pub fn from_sample(sample: &'a FitSample) -> Self {
        Self::new(sample.x(), sample.y()).uncertainty(sample.dy())
    }

    /// Per-point weights `w` (residuals scale by `sqrt(w)`).
    pub fn weight(mut self, weight: &'a DVector<f64>) -> Self {
        self.weight = Some(weight);
        self
    }

    /// Per-point uncertainties `dy` (residuals scale by `1/dy`).
    pub fn uncertainty(mut self, uncertainty: &'a DVector<f64>) -> Self {
        self.uncertainty = Some(uncertainty);
        self
    }

    pub fn initial_guess(mut self, guess: &'a DVector<f64>) -> Self {
        self.initial_guess = Some(guess);
        self
    }

    pub fn observer(mut self, observer: &'a dyn EvalObserver) -> Self {
        self.observer = Some(observer);
        self
    }
}

/// Outcome of one successful fit.
#[derive(Debug, Clone, PartialEq)]
pub struct FitResult {
    /// Optimized parameters.
    pub xopt: DVector<f64>,
    /// `Σ r(xopt)²` (weighted).
    pub chi_square: f64,
    /// Residual evaluations made by the solver.
    pub funcalls: usize,
    /// One-sigma parameter errors (Levenberg-Marquardt with N > P only).
    pub xerr: Option<DVector<f64>>,
    /// Unscaled covariance `(JᵀJ)⁻¹` (Levenberg-Marquardt only).
    pub covariance: Option<DMatrix<f64>>,
    pub method: FitMethod,
    /// Solver's own description of why it stopped.
    pub termination: String,
}

struct SolverOutcome {
    xopt: DVector<f64>,
    termination: String,
}

/// Fit `ansatz` to the request's data.
pub fn fit<A: Ansatz + ?Sized>(
    ansatz: &A,
    request: &FitRequest<'_>,
    config: &FitConfig,
) -> Result<FitResult, FitError> {
    config.solver.validate(config.method)?;

    let n = request.response.len();
    validate_domain(ansatz, request, n)?;
    let sqrt_w = resolve_sqrt_weights(request, n)?;
    let guess = resolve_guess(ansatz, request)?;

    let first_eval = ansatz.evaluate(&guess, request.domain);
    if first_eval.len() != n {
        return Err(FitError::invalid(format!(
            "ansatz '{}' returned {} values for {n} samples",
            ansatz.name(),
            first_eval.len()
        )));
    }
    if config.method == FitMethod::LevenbergMarquardt && n < guess.len() {
        return Err(FitError::invalid(format!(
            "Levenberg-Marquardt needs at least as many samples ({n}) as parameters ({})",
            guess.len()
        )));
    }

    let residuals = WeightedResiduals::new(ansatz, request.domain, request.response, sqrt_w, request.observer);
    let outcome = match config.method {
        FitMethod::LevenbergMarquardt => solve_lm(&residuals, guess, &config.solver.lm)?,
        FitMethod::NelderMead => solve_nelder_mead(&residuals, &guess, &config.solver.nelder_mead)?,
        FitMethod::Bfgs => solve_bfgs(&residuals, &guess, &config.solver.bfgs)?,
        FitMethod::Anneal => solve_anneal(&residuals, &guess, &config.solver)?,
    };
    let funcalls = residuals.evaluations();

    let chi_square = residuals
        .residuals_at(&outcome.xopt)
        .map(|r| r.norm_squared())
        .ok_or_else(|| FitError::failed("model is not finite at the solution"))?;

    let (covariance, xerr) = if config.method == FitMethod::LevenbergMarquardt {
        covariance_estimate(&residuals, &outcome.xopt, chi_square)
    } else {
        (None, None)
    };

    log::debug!(
        "{} fit ({}): chi2={chi_square:.6e} funcalls={funcalls} [{}]",
        ansatz.name(),
        config.method,
        outcome.termination
    );

    Ok(FitResult {
        xopt: outcome.xopt,
        chi_square,
        funcalls,
        xerr,
        covariance,
        method: config.method,
        termination: outcome.termination,
    })
}

fn validate_domain<A: Ansatz + ?Sized>(ansatz: &A, request: &FitRequest<'_>, n: usize) -> Result<(), FitError> {
    if n == 0 {
        return Err(FitError::invalid("response must contain at least one point"));
    }
    if request.domain.ncols() != n {
        return Err(FitError::invalid(format!(
            "domain has {} samples but response has {n}",
            request.domain.ncols()
        )));
    }
    if request.domain.nrows() != ansatz.domain_dim() {
        return Err(FitError::invalid(format!(
            "ansatz '{}' expects a {}-dimensional domain, got {}",
            ansatz.name(),
            ansatz.domain_dim(),
            request.domain.nrows()
        )));
    }
    Ok(())
}

fn resolve_sqrt_weights(request: &FitRequest<'_>, n: usize) -> Result<DVector<f64>, FitError> {
    match (request.weight, request.uncertainty) {
        (Some(_), Some(_)) => Err(FitError::invalid(
            "supply either weight or uncertainty, not both",
        )),
        (Some(w), None) => {
            check_len("weight", w, n)?;
            if w.iter().any(|v| !(v.is_finite() && *v >= 0.0)) {
                return Err(FitError::invalid("weights must be finite and >= 0"));
            }
            Ok(w.map(f64::sqrt))
        }
        (None, Some(dy)) => {
            check_len("uncertainty", dy, n)?;
            if dy.iter().any(|v| !(v.is_finite() && *v > 0.0)) {
                return Err(FitError::invalid("uncertainties must be finite and > 0"));
            }
            Ok(dy.map(|d| 1.0 / d))
        }
        (None, None) => Ok(DVector::from_element(n, 1.0)),
    }
}

fn check_len(what: &str, v: &DVector<f64>, n: usize) -> Result<(), FitError> {
    if v.len() == n {
        Ok(())
    } else {
        Err(FitError::invalid(format!("{what} has {} entries but response has {n}", v.len())))
    }
}

fn resolve_guess<A: Ansatz + ?Sized>(ansatz: &A, request: &FitRequest<'_>) -> Result<DVector<f64>, FitError> {
    let guess = match request.initial_guess {
        Some(g) => g.clone(),
        None => ansatz.guess(request.domain, request.response).ok_or_else(|| {
            FitError::invalid(format!(
                "no initial guess supplied and ansatz '{}' could not derive one",
                ansatz.name()
            ))
        })?,
    };
    let p = ansatz.num_params();
    if guess.len() != p {
        return Err(FitError::invalid(format!(
            "initial guess has {} entries but ansatz '{}' has {p} parameters",
            guess.len(),
            ansatz.name()
        )));
    }
    if guess.iter().any(|v| !v.is_finite()) {
        return Err(FitError::invalid("initial guess must be finite"));
    }
    Ok(guess)
}

/// `(JᵀJ)⁻¹` at the optimum and the χ²-scaled errors derived from it.
fn covariance_estimate<A: Ansatz + ?Sized>(
    residuals: &WeightedResiduals<'_, A>,
    xopt: &DVector<f64>,
    chi_square: f64,
) -> (Option<DMatrix<f64>>, Option<DVector<f64>>) {
    let Some(jac) = residuals.jacobian_at(xopt) else {
        log::warn!("Jacobian not finite at the optimum; parameter errors unavailable");
        return (None, None);
    };
    let Some(cov) = jac.tr_mul(&jac).try_inverse() else {
        log::warn!("JᵀJ is singular at the optimum; parameter errors unavailable");
        return (None, None);
    };

    let n = residuals.num_residuals();
    let p = xopt.len();
    let xerr = (n > p).then(|| {
        let scale = chi_square / (n - p) as f64;
        cov.diagonal().map(|c| (c * scale).sqrt())
    });
    (Some(cov), xerr)
}

fn solve_lm<A: Ansatz + ?Sized>(
    residuals: &WeightedResiduals<'_, A>,
    guess: DVector<f64>,
    options: &LmOptions,
) -> Result<SolverOutcome, FitError> {
    let (problem, report) = LevenbergMarquardt::new()
        .with_ftol(options.ftol)
        .with_xtol(options.xtol)
        .with_gtol(options.gtol)
        .with_stepbound(options.stepbound)
        .with_patience(options.patience)
        .minimize(LmProblem::new(residuals, guess));

    if !report.termination.was_successful() {
        return Err(FitError::failed(format!(
            "Levenberg-Marquardt did not converge after {} evaluations: {:?}",
            report.number_of_evaluations, report.termination
        )));
    }
    Ok(SolverOutcome {
        xopt: problem.into_params(),
        termination: format!("{:?}", report.termination),
    })
}

/// Starting simplex: the guess plus one vertex per coordinate, perturbed by
/// 5% (or by 0.00025 for a zero coordinate).
fn initial_simplex(guess: &[f64]) -> Vec<Vec<f64>> {
    let mut simplex = Vec::with_capacity(guess.len() + 1);
    simplex.push(guess.to_vec());
    for i in 0..guess.len() {
        let mut vertex = guess.to_vec();
        vertex[i] = if vertex[i] != 0.0 {
            vertex[i] * 1.05
        } else {
            0.00025
        };
        simplex.push(vertex);
    }
    simplex
}

fn solve_nelder_mead<A: Ansatz + ?Sized>(
    residuals: &WeightedResiduals<'_, A>,
    guess: &DVector<f64>,
    options: &NelderMeadOptions,
) -> Result<SolverOutcome, FitError> {
    let init: Vec<f64> = guess.iter().copied().collect();
    let solver = NelderMead::new(initial_simplex(&init))
        .with_sd_tolerance(options.sd_tolerance)
        .map_err(argmin_failure)?;
    let result = Executor::new(SumOfSquares::new(residuals), solver)
        .configure(|state| state.max_iters(options.max_iters))
        .run()
        .map_err(argmin_failure)?;
    argmin_outcome("Nelder-Mead", result.state())
}

fn solve_bfgs<A: Ansatz + ?Sized>(
    residuals: &WeightedResiduals<'_, A>,
    guess: &DVector<f64>,
    options: &BfgsOptions,
) -> Result<SolverOutcome, FitError> {
    let init: Vec<f64> = guess.iter().copied().collect();
    let linesearch = MoreThuenteLineSearch::new();
    let solver = LBFGS::new(linesearch, options.memory)
        .with_tolerance_grad(options.tolerance_grad)
        .map_err(argmin_failure)?
        .with_tolerance_cost(options.tolerance_cost)
        .map_err(argmin_failure)?;
    let result = Executor::new(SumOfSquares::new(residuals), solver)
        .configure(|state| state.param(init).max_iters(options.max_iters))
        .run()
        .map_err(argmin_failure)?;
    argmin_outcome("L-BFGS", result.state())
}

/// Anneal from the guess, then polish the best point with Nelder-Mead.
///
/// The cooling schedule has no convergence test of its own; the fit counts
/// as converged only when the polish does.
fn solve_anneal<A: Ansatz + ?Sized>(
    residuals: &WeightedResiduals<'_, A>,
    guess: &DVector<f64>,
    solver: &SolverOptions,
) -> Result<SolverOutcome, FitError> {
    let options = &solver.anneal;
    let start_cost = residuals.sum_of_squares(guess);
    if !start_cost.is_finite() {
        return Err(FitError::failed("cost is not finite at the starting point"));
    }
    let cost_scale = if start_cost > 0.0 { start_cost } else { 1.0 };
    let t0 = options.initial_temperature * cost_scale;
    let cooling = (options.final_temperature / options.initial_temperature).powf(1.0 / options.max_iters as f64);

    let init: Vec<f64> = guess.iter().copied().collect();
    let problem = AnnealSteps::new(residuals, &init, options.step_scale, t0, options.seed);
    let annealer = SimulatedAnnealing::new_with_rng(t0, StdRng::seed_from_u64(!options.seed))
        .map_err(argmin_failure)?
        .with_temp_func(SATempFunc::Exponential(cooling))
        .with_stall_best(options.stall_best);
    let result = Executor::new(problem, annealer)
        .configure(|state| state.param(init).max_iters(options.max_iters))
        .run()
        .map_err(argmin_failure)?;

    let state = result.state();
    let schedule = match state.get_termination_reason() {
        Some(reason) if matches!(reason, TerminationReason::MaxItersReached | TerminationReason::SolverExit(_)) => {
            format!("{reason:?}")
        }
        other => {
            return Err(FitError::failed(format!(
                "simulated annealing stopped after {} steps: {other:?}",
                state.get_iter()
            )));
        }
    };
    let best = state
        .get_best_param()
        .ok_or_else(|| FitError::failed("simulated annealing returned no parameters"))?;
    let steps = state.get_iter();

    let polished = solve_nelder_mead(residuals, &DVector::from_column_slice(best), &solver.nelder_mead)?;
    Ok(SolverOutcome {
        xopt: polished.xopt,
        termination: format!("annealed {steps} steps ({schedule}), polished: {}", polished.termination),
    })
}

fn argmin_failure(err: argmin::core::Error) -> FitError {
    FitError::failed(err.to_string())
}

fn argmin_outcome<S>(label: &str, state: &S) -> Result<SolverOutcome, FitError>
where
    S: State<Param = Vec<f64>, Float = f64>,
{
    let reason = state.get_termination_reason();
    let converged = matches!(
        reason,
        Some(TerminationReason::SolverConverged) | Some(TerminationReason::TargetCostReached)
    );
    let describe = || reason.map_or_else(|| "not terminated".to_string(), |r| format!("{r:?}"));
    if !converged {
        return Err(FitError::failed(format!(
            "{label} stopped after {} iterations: {}",
            state.get_iter(),
            describe()
        )));
    }
    let best = state
        .get_best_param()
        .ok_or_else(|| FitError::failed(format!("{label} returned no parameters")))?;
    Ok(SolverOutcome {
        xopt: DVector::from_column_slice(best),
        termination: describe(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datasets::cr2;
    use crate::fit::TraceCollector;
    use crate::math::linear_regression;
    use crate::models::{Exponential, FermiDirac, Harmonic, Linear, Morse2, Polynomial};

    fn row(xs: &[f64]) -> DMatrix<f64> {
        DMatrix::from_row_slice(1, xs.len(), xs)
    }

    /// Noisy straight line with uneven uncertainties.
    fn noisy_line() -> (DMatrix<f64>, DVector<f64>, DVector<f64>) {
        let x = row(&[0.0, 0.5, 1.0, 1.5, 2.0, 2.5, 3.0]);
        let y = DVector::from_row_slice(&[1.02, 1.93, 3.05, 3.96, 5.10, 5.94, 7.03]);
        let dy = DVector::from_row_slice(&[0.05, 0.08, 0.05, 0.1, 0.07, 0.05, 0.09]);
        (x, y, dy)
    }

    #[test]
    fn recovers_parameters_of_noiseless_data() {
        let truth = DVector::from_row_slice(&[-2.0, 1.6, 1.85]);
        let x = row(&[1.5, 1.6, 1.7, 1.8, 1.9, 2.0, 2.2, 2.5]);
        let y = Harmonic.evaluate(&truth, &x);
        let guess = DVector::from_row_slice(&[-1.9, 1.2, 1.95]);

        let req = FitRequest::new(&x, &y).initial_guess(&guess);
        let res = fit(&Harmonic, &req, &FitConfig::default()).unwrap();
        for (p, t) in res.xopt.iter().zip(truth.iter()) {
            assert!((p - t).abs() < 1e-6, "{p} vs {t}");
        }
        assert!(res.chi_square < 1e-12);
        assert!(res.funcalls > 0);
        assert_eq!(res.method, FitMethod::LevenbergMarquardt);
    }

    #[test]
    fn weight_and_uncertainty_are_mutually_exclusive() {
        let (x, y, dy) = noisy_line();
        let w = dy.map(|d| d.powi(-2));
        let req = FitRequest::new(&x, &y).weight(&w).uncertainty(&dy);
        let err = fit(&Linear, &req, &FitConfig::default()).unwrap_err();
        assert!(matches!(err, FitError::InvalidArguments(_)));
    }

    #[test]
    fn weight_is_equivalent_to_inverse_squared_uncertainty() {
        let (x, y, dy) = noisy_line();
        let w = dy.map(|d| d.powi(-2));
        let by_dy = fit(&Linear, &FitRequest::new(&x, &y).uncertainty(&dy), &FitConfig::default()).unwrap();
        let by_w = fit(&Linear, &FitRequest::new(&x, &y).weight(&w), &FitConfig::default()).unwrap();
        assert!((by_dy.xopt - by_w.xopt).amax() < 1e-9);
        assert!((by_dy.chi_square - by_w.chi_square).abs() < 1e-9);
    }

    #[test]
    fn missing_guess_without_heuristic_is_invalid() {
        let x = row(&[0.0, 1.0, 2.0, 3.0]);
        let y = DVector::from_row_slice(&[1.0, 2.7, 7.4, 20.1]);
        let err = fit(&Exponential, &FitRequest::new(&x, &y), &FitConfig::default()).unwrap_err();
        assert!(matches!(err, FitError::InvalidArguments(ref m) if m.contains("initial guess")));

        // With a guess, an ansatz without a heuristic fits normally.
        let x = row(&[0.0, 0.5, 1.0, 1.5, 2.0]);
        let y = DVector::from_row_slice(&[1.9311, 1.68225, 1.0, 0.31774, 0.06889]);
        let guess = DVector::from_row_slice(&[1.8, 0.9, 0.4]);
        let res = fit(&FermiDirac, &FitRequest::new(&x, &y).initial_guess(&guess), &FitConfig::default()).unwrap();
        assert!((res.xopt[2] - 0.3).abs() < 1e-2, "{}", res.xopt);
    }

    #[test]
    fn shape_errors_are_invalid_arguments() {
        let (x, y, _) = noisy_line();
        let short = DVector::from_row_slice(&[1.0, 2.0]);
        assert!(matches!(
            fit(&Linear, &FitRequest::new(&x, &short), &FitConfig::default()),
            Err(FitError::InvalidArguments(_))
        ));

        let bad_guess = DVector::from_row_slice(&[1.0, 2.0, 3.0]);
        assert!(matches!(
            fit(&Linear, &FitRequest::new(&x, &y).initial_guess(&bad_guess), &FitConfig::default()),
            Err(FitError::InvalidArguments(_))
        ));

        // Two-dimensional polynomial on a one-dimensional domain.
        assert!(matches!(
            fit(&Polynomial::new(2, 2), &FitRequest::new(&x, &y), &FitConfig::default()),
            Err(FitError::InvalidArguments(_))
        ));

        let bad_dy = DVector::from_element(y.len(), 0.0);
        assert!(matches!(
            fit(&Linear, &FitRequest::new(&x, &y).uncertainty(&bad_dy), &FitConfig::default()),
            Err(FitError::InvalidArguments(_))
        ));
    }

    #[test]
    fn levenberg_marquardt_needs_enough_samples() {
        let x = row(&[1.0, 2.0]);
        let y = DVector::from_row_slice(&[1.0, 2.0]);
        let guess = DVector::from_row_slice(&[0.0, 1.0, 1.5]);
        let err = fit(&Harmonic, &FitRequest::new(&x, &y).initial_guess(&guess), &FitConfig::default())
            .unwrap_err();
        assert!(matches!(err, FitError::InvalidArguments(_)));
    }

    #[test]
    fn linear_fit_matches_closed_form_regression() {
        let (x, y, dy) = noisy_line();
        let res = fit(&Linear, &FitRequest::new(&x, &y).uncertainty(&dy), &FitConfig::default()).unwrap();

        let xs: Vec<f64> = x.row(0).iter().copied().collect();
        let line = linear_regression(&xs, y.as_slice(), Some(dy.as_slice())).unwrap();
        assert!((res.xopt[0] - line.a).abs() < 1e-8);
        assert!((res.xopt[1] - line.b).abs() < 1e-8);

        let cov = res.covariance.as_ref().unwrap();
        assert!((cov[(0, 0)].sqrt() - line.sigma_a).abs() < 1e-9 * (1.0 + line.sigma_a));
        assert!((cov[(1, 1)].sqrt() - line.sigma_b).abs() < 1e-9 * (1.0 + line.sigma_b));

        let xerr = res.xerr.as_ref().unwrap();
        let scale = res.chi_square / (y.len() - 2) as f64;
        assert!((xerr[0] - (cov[(0, 0)] * scale).sqrt()).abs() < 1e-14);
    }

    #[test]
    fn morse_fit_of_cr2_matches_reference() {
        let sample = cr2().unwrap();
        let res = fit(&Morse2, &FitRequest::from_sample(&sample), &FitConfig::default()).unwrap();

        let expected = [-2.186253, 9.82458, 1.804554, 1.86187];
        let tol = [2e-4, 1e-2, 2e-4, 2e-3];
        for i in 0..4 {
            assert!((res.xopt[i] - expected[i]).abs() < tol[i], "param {i}: {}", res.xopt[i]);
        }
        assert!((res.chi_square - 45.874).abs() < 1e-2);

        // Asymptotic standard errors as reported by common curve-fitting tools.
        let xerr = res.xerr.unwrap();
        for (e, r) in xerr.iter().zip([0.03194, 1.5909, 0.01772, 0.2170]) {
            assert!((e - r).abs() < 0.02 * r, "{e} vs {r}");
        }
    }

    #[test]
    fn harmonic_fit_of_cr2_matches_reference() {
        let sample = cr2().unwrap();
        let res = fit(&Harmonic, &FitRequest::from_sample(&sample), &FitConfig::default()).unwrap();
        assert!((res.xopt[0] + 2.04183).abs() < 2e-4);
        assert!((res.xopt[1] - 1.48531).abs() < 2e-3);
        assert!((res.xopt[2] - 1.81057).abs() < 2e-4);
        assert!((res.chi_square - 443.81).abs() < 0.05);
    }

    #[test]
    fn minimizers_agree_on_a_convex_problem() {
        let (x, y, dy) = noisy_line();
        let req = FitRequest::new(&x, &y).uncertainty(&dy);
        let lm = fit(&Linear, &req, &FitConfig::default()).unwrap();

        for method in [FitMethod::NelderMead, FitMethod::Bfgs] {
            let res = fit(&Linear, &req, &FitConfig::with_method(method)).unwrap();
            assert!((res.xopt.clone() - lm.xopt.clone()).amax() < 1e-4, "{method}: {}", res.xopt);
            assert!(res.xerr.is_none());
            assert!(res.chi_square >= lm.chi_square - 1e-9);
        }

        let start = DVector::from_row_slice(&[0.5, 1.5]);
        let annealed = fit(
            &Linear,
            &req.initial_guess(&start),
            &FitConfig::with_method(FitMethod::Anneal),
        )
        .unwrap();
        assert!((annealed.xopt.clone() - lm.xopt.clone()).amax() < 1e-4, "{}", annealed.xopt);
        assert!(annealed.chi_square <= lm.chi_square * (1.0 + 1e-8), "{}", annealed.chi_square);
    }

    #[test]
    fn annealing_reaches_the_minimum_of_a_curved_model() {
        let sample = cr2().unwrap();
        let lm = fit(&Harmonic, &FitRequest::from_sample(&sample), &FitConfig::default()).unwrap();

        let start = DVector::from_row_slice(&[-1.9, 1.0, 1.9]);
        let req = FitRequest::from_sample(&sample).initial_guess(&start);
        let config = FitConfig::with_method(FitMethod::Anneal);
        let annealed = fit(&Harmonic, &req, &config).unwrap();
        assert!(
            (annealed.chi_square - lm.chi_square).abs() < 1e-6 * lm.chi_square,
            "{} vs {}",
            annealed.chi_square,
            lm.chi_square
        );
        assert!(annealed.termination.starts_with("annealed"), "{}", annealed.termination);

        // Seeded: the same options give the same path.
        let again = fit(&Harmonic, &req, &config).unwrap();
        assert_eq!(again.xopt, annealed.xopt);
        assert_eq!(again.funcalls, annealed.funcalls);
    }

    #[test]
    fn annealing_without_a_converged_polish_fails() {
        let (x, y, dy) = noisy_line();
        let start = DVector::from_row_slice(&[0.5, 1.5]);
        let mut config = FitConfig::with_method(FitMethod::Anneal);
        config.solver.anneal.max_iters = 50;
        config.solver.nelder_mead.max_iters = 1;
        let err = fit(&Linear, &FitRequest::new(&x, &y).uncertainty(&dy).initial_guess(&start), &config).unwrap_err();
        assert!(matches!(err, FitError::FitFailed { .. }), "{err}");
    }

    #[test]
    fn exhausted_iteration_budget_is_a_fit_failure() {
        let sample = cr2().unwrap();
        let mut config = FitConfig::with_method(FitMethod::NelderMead);
        config.solver.nelder_mead.max_iters = 2;
        let err = fit(&Morse2, &FitRequest::from_sample(&sample), &config).unwrap_err();
        assert!(matches!(err, FitError::FitFailed { stage: crate::error::FitStage::Fit, .. }));
    }

    #[test]
    fn observer_sees_every_evaluation() {
        let (x, y, dy) = noisy_line();
        let trace = TraceCollector::new();
        let req = FitRequest::new(&x, &y).uncertainty(&dy).observer(&trace);
        let res = fit(&Linear, &req, &FitConfig::default()).unwrap();
        // Solver evaluations plus the final chi-square evaluation.
        assert_eq!(trace.len(), res.funcalls + 1);
        let last = trace.records().pop().unwrap();
        assert!((last.chi_square - res.chi_square).abs() < 1e-12);
    }
}
