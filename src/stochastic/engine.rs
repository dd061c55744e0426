//! The Monte Carlo fitting engine.
//!
//! A run moves through four phases, each a separate type so that no phase
//! can be skipped or repeated:
//!
//! ```text
//! StochasticFitter --baseline()--> Baselined --resample()--> Resampled --aggregate()--> StochasticRun
//! ```
//!
//! Every refit starts from the baseline optimum (`nlf_guess`), never from
//! the previous iteration's result. The first failing refit aborts the run.

use std::sync::atomic::{AtomicBool, Ordering};

use nalgebra::DVector;
use rayon::prelude::*;

use crate::domain::FitSample;
use crate::error::{FitError, FitStage};
use crate::fit::{EvalObserver, FitConfig, FitRequest, fit};
use crate::math::summarize_columns;
use crate::models::Ansatz;
use crate::stochastic::rng::{NormalSource, NormalStream, entropy_seed};
use crate::stochastic::{
    BaselineFit, BaselineSeed, Execution, ParameterEstimates, ResidualStats, StochasticConfig, StochasticRun,
};

/// Setup phase: an ansatz bound to a sample, plus run options.
pub struct StochasticFitter<'a, A: ?Sized> {
    ansatz: &'a A,
    sample: &'a FitSample,
    config: StochasticConfig,
    baseline_guess: Option<&'a DVector<f64>>,
    source: Option<Box<dyn NormalSource + 'a>>,
    cancel: Option<&'a AtomicBool>,
    observer: Option<&'a dyn EvalObserver>,
}

/// Baseline done; `nlf_guess` is fixed for the rest of the run.
pub struct Baselined<'a, A: ?Sized> {
    ctx: RunContext<'a, A>,
    config: StochasticConfig,
    seed: Option<u64>,
    source: Box<dyn NormalSource + 'a>,
    nlf_guess: DVector<f64>,
    baseline: Option<BaselineFit>,
}

/// All refits done; nothing aggregated yet.
pub struct Resampled<'a, A: ?Sized> {
    ansatz: &'a A,
    config: StochasticConfig,
    seed: Option<u64>,
    nlf_guess: DVector<f64>,
    baseline: Option<BaselineFit>,
    mc_params: Vec<DVector<f64>>,
    mc_stats: Vec<ResidualStats>,
    mc_funcalls: Vec<usize>,
}

/// Read-only inputs shared by every refit, including across threads.
struct RunContext<'a, A: ?Sized> {
    ansatz: &'a A,
    sample: &'a FitSample,
    cancel: Option<&'a AtomicBool>,
    observer: Option<&'a dyn EvalObserver>,
}

struct Refit {
    params: DVector<f64>,
    stats: ResidualStats,
    funcalls: usize,
}

impl<'a, A: Ansatz + ?Sized> StochasticFitter<'a, A> {
    pub fn new(ansatz: &'a A, sample: &'a FitSample, config: StochasticConfig) -> Self {
        Self {
            ansatz,
            sample,
            config,
            baseline_guess: None,
            source: None,
            cancel: None,
            observer: None,
        }
    }

    /// Starting point of the baseline fit, for ansätze without a guess heuristic.
    pub fn with_baseline_guess(mut self, guess: &'a DVector<f64>) -> Self {
        self.baseline_guess = Some(guess);
        self
    }

    /// Draw perturbations from `source` instead of a stream seeded from
    /// `config.seed`. Sequential execution only.
    pub fn with_source(mut self, source: impl NormalSource + 'a) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Checked before each iteration; once set, the run ends with `Cancelled`.
    pub fn with_cancel_flag(mut self, flag: &'a AtomicBool) -> Self {
        self.cancel = Some(flag);
        self
    }

    /// Observe every residual evaluation of every fit in the run.
    pub fn with_observer(mut self, observer: &'a dyn EvalObserver) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Run every phase.
    pub fn run(self) -> Result<StochasticRun<'a, A>, FitError> {
        self.baseline()?.resample()?.aggregate()
    }

    /// Validate the setup, seed the generator and fit the unperturbed sample.
    pub fn baseline(self) -> Result<Baselined<'a, A>, FitError> {
        let Self {
            ansatz,
            sample,
            config,
            baseline_guess,
            source,
            cancel,
            observer,
        } = self;
        config.validate()?;

        if sample.dim() != ansatz.domain_dim() {
            return Err(FitError::invalid(format!(
                "ansatz '{}' expects a {}-dimensional domain, sample has {}",
                ansatz.name(),
                ansatz.domain_dim(),
                sample.dim()
            )));
        }

        let (seed, source): (Option<u64>, Box<dyn NormalSource + 'a>) = match source {
            Some(_) if config.execution == Execution::Parallel => {
                return Err(FitError::invalid(
                    "parallel execution derives per-iteration streams from the run seed; \
                     an external normal source is only supported sequentially",
                ));
            }
            Some(source) => (config.seed, source),
            None => {
                let seed = config.seed.unwrap_or_else(|| {
                    let seed = entropy_seed();
                    log::info!("no seed given; drew run seed {seed} from entropy");
                    seed
                });
                (Some(seed), Box::new(NormalStream::from_seed(seed)))
            }
        };

        let ctx = RunContext {
            ansatz,
            sample,
            cancel,
            observer,
        };

        let (nlf_guess, baseline) = match &config.baseline {
            BaselineSeed::Fit => {
                let baseline = ctx.baseline_fit(&config.fit, baseline_guess)?;
                log::info!(
                    "baseline {} fit: params={:?} chi2={:.6e}",
                    ansatz.name(),
                    baseline.result.xopt.as_slice(),
                    baseline.result.chi_square
                );
                (baseline.result.xopt.clone(), Some(baseline))
            }
            BaselineSeed::Guess(guess) => {
                if guess.len() != ansatz.num_params() {
                    return Err(FitError::invalid(format!(
                        "baseline guess has {} entries but ansatz '{}' has {} parameters",
                        guess.len(),
                        ansatz.name(),
                        ansatz.num_params()
                    )));
                }
                log::info!("skipping baseline fit; refits start from {:?}", guess.as_slice());
                (guess.clone(), None)
            }
        };

        Ok(Baselined {
            ctx,
            config,
            seed,
            source,
            nlf_guess,
            baseline,
        })
    }
}

impl<'a, A: Ansatz + ?Sized> Baselined<'a, A> {
    pub fn nlf_guess(&self) -> &DVector<f64> {
        &self.nlf_guess
    }

    pub fn baseline_fit(&self) -> Option<&BaselineFit> {
        self.baseline.as_ref()
    }

    pub fn seed(&self) -> Option<u64> {
        self.seed
    }

    /// Perturb the response and refit `num_iterations` times.
    pub fn resample(self) -> Result<Resampled<'a, A>, FitError> {
        let Self {
            ctx,
            config,
            seed,
            mut source,
            nlf_guess,
            baseline,
        } = self;
        let requested = config.num_iterations;
        let n = ctx.sample.len();

        let refits = match config.execution {
            Execution::Sequential => {
                let mut refits = Vec::with_capacity(requested);
                for index in 0..requested {
                    if ctx.cancelled() {
                        return Err(FitError::Cancelled {
                            completed: index,
                            requested,
                        });
                    }
                    let z = source.standard_normals(n);
                    refits.push(ctx.refit(index, &z, &nlf_guess, &config)?);
                }
                refits
            }
            Execution::Parallel => {
                let seed = seed.ok_or_else(|| FitError::invalid("parallel execution requires a run seed"))?;
                let slots: Vec<Option<Result<Refit, FitError>>> = (0..requested)
                    .into_par_iter()
                    .map(|index| {
                        if ctx.cancelled() {
                            return None;
                        }
                        let z = NormalStream::for_iteration(seed, index).standard_normals(n);
                        Some(ctx.refit(index, &z, &nlf_guess, &config))
                    })
                    .collect();

                let mut refits = Vec::with_capacity(requested);
                let mut cancelled = false;
                for slot in slots {
                    match slot {
                        Some(Ok(refit)) => refits.push(refit),
                        // Slots are in index order, so this is the lowest failing iteration.
                        Some(Err(err)) => return Err(err),
                        None => cancelled = true,
                    }
                }
                if cancelled {
                    return Err(FitError::Cancelled {
                        completed: refits.len(),
                        requested,
                    });
                }
                refits
            }
        };

        let mut mc_params = Vec::with_capacity(requested);
        let mut mc_stats = Vec::with_capacity(requested);
        let mut mc_funcalls = Vec::with_capacity(requested);
        for refit in refits {
            mc_params.push(refit.params);
            mc_stats.push(refit.stats);
            mc_funcalls.push(refit.funcalls);
        }
        log::debug!(
            "{} refits done, {} residual evaluations",
            mc_params.len(),
            mc_funcalls.iter().sum::<usize>()
        );

        Ok(Resampled {
            ansatz: ctx.ansatz,
            config,
            seed,
            nlf_guess,
            baseline,
            mc_params,
            mc_stats,
            mc_funcalls,
        })
    }
}

impl<'a, A: Ansatz + ?Sized> Resampled<'a, A> {
    pub fn mc_params(&self) -> &[DVector<f64>] {
        &self.mc_params
    }

    pub fn mc_stats(&self) -> &[ResidualStats] {
        &self.mc_stats
    }

    /// Column-wise mean and spread of the refit parameters.
    pub fn aggregate(self) -> Result<StochasticRun<'a, A>, FitError> {
        let spread = self.config.spread;
        let values = summarize_columns(&self.mc_params, spread).ok_or_else(|| {
            FitError::invalid(format!(
                "cannot aggregate {} parameter vectors with {spread:?} spread",
                self.mc_params.len()
            ))
        })?;
        let estimates = ParameterEstimates::new(self.ansatz.parameter_names(), values)?;

        for (name, value) in estimates.iter() {
            log::debug!("{name} = {value}");
        }

        Ok(StochasticRun {
            ansatz: self.ansatz,
            seed: self.seed,
            spread,
            nlf_guess: self.nlf_guess,
            baseline: self.baseline,
            mc_params: self.mc_params,
            mc_stats: self.mc_stats,
            mc_funcalls: self.mc_funcalls,
            estimates,
        })
    }
}

impl<A: Ansatz + ?Sized> RunContext<'_, A> {
    fn cancelled(&self) -> bool {
        self.cancel.is_some_and(|flag| flag.load(Ordering::Relaxed))
    }

    fn baseline_fit(&self, fit_config: &FitConfig, guess: Option<&DVector<f64>>) -> Result<BaselineFit, FitError> {
        let mut request = FitRequest::from_sample(self.sample);
        if let Some(guess) = guess {
            request = request.initial_guess(guess);
        }
        if let Some(observer) = self.observer {
            request = request.observer(observer);
        }
        let result = fit(self.ansatz, &request, fit_config).map_err(|e| e.at_stage(FitStage::Baseline))?;
        let model = self.ansatz.evaluate(&result.xopt, self.sample.x());
        let (ssr, wssr) = sums_of_squares(&model, self.sample.y(), self.sample.dy());
        Ok(BaselineFit { result, ssr, wssr })
    }

    fn refit(
        &self,
        index: usize,
        z: &DVector<f64>,
        nlf_guess: &DVector<f64>,
        config: &StochasticConfig,
    ) -> Result<Refit, FitError> {
        let sample = self.sample;
        let perturbed = sample.y() + sample.dy().component_mul(z);

        let mut request = FitRequest::new(sample.x(), &perturbed).initial_guess(nlf_guess);
        if config.use_dy_weights {
            request = request.uncertainty(sample.dy());
        }
        if let Some(observer) = self.observer {
            request = request.observer(observer);
        }
        let result = fit(self.ansatz, &request, &config.fit).map_err(|e| e.at_stage(FitStage::Iteration(index)))?;

        let model = self.ansatz.evaluate(&result.xopt, sample.x());
        let (perturbed_ssr, perturbed_wssr) = sums_of_squares(&model, &perturbed, sample.dy());
        let (original_ssr, original_wssr) = sums_of_squares(&model, sample.y(), sample.dy());
        log::trace!("iteration {index}: {:?}", result.xopt.as_slice());

        Ok(Refit {
            params: result.xopt,
            stats: ResidualStats {
                perturbed_ssr,
                perturbed_wssr,
                original_ssr,
                original_wssr,
            },
            funcalls: result.funcalls,
        })
    }
}

/// Unweighted and `dy`-weighted sums of squares of `model - y`.
fn sums_of_squares(model: &DVector<f64>, y: &DVector<f64>, dy: &DVector<f64>) -> (f64, f64) {
    let diff = model - y;
    let weighted = diff.component_div(dy);
    (diff.norm_squared(), weighted.norm_squared())
}
