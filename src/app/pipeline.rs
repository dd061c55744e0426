//! Shared pipeline steps used by the `fit` and `baseline` commands.
//!
//! sample + ansatz + method -> baseline fit, or -> stochastic run
//!
//! The command handlers then only deal with presentation and exports.

use nalgebra::DVector;

use crate::cli::{FitArgs, SampleArgs};
use crate::datasets;
use crate::domain::FitSample;
use crate::error::AppError;
use crate::fit::{FitConfig, FitMethod, FitRequest, FitResult, fit};
use crate::io::{RowError, load_sample};
use crate::models::Ansatz;
use crate::stochastic::{BaselineSeed, Execution, StochasticConfig, StochasticFitter, StochasticRun};

/// Inputs resolved from the command line.
pub struct Prepared {
    pub ansatz: Box<dyn Ansatz>,
    pub sample: FitSample,
    /// Human-readable origin of the sample.
    pub source: String,
    pub row_errors: Vec<RowError>,
    pub fit: FitConfig,
    pub guess: Option<DVector<f64>>,
}

/// Resolve method, ansatz and sample.
pub fn prepare(args: &SampleArgs) -> Result<Prepared, AppError> {
    // Unknown names fail here, before any data is read.
    let method: FitMethod = args.method.parse()?;
    let ansatz = args.ansatz.build(args.order, args.dim);

    let (sample, source, row_errors) = match (&args.input, args.cr2) {
        (_, true) => (datasets::cr2()?, "bundled Cr2 sample".to_string(), Vec::new()),
        (Some(path), false) => {
            let ingested = load_sample(path, args.format, ansatz.domain_dim())?;
            (ingested.sample, path.display().to_string(), ingested.row_errors)
        }
        (None, false) => return Err(AppError::new(2, "No sample given: pass a file or --cr2.")),
    };
    for e in &row_errors {
        log::warn!("{source}:{}: skipped row: {}", e.line, e.message);
    }

    Ok(Prepared {
        ansatz,
        sample,
        source,
        row_errors,
        fit: FitConfig::with_method(method),
        guess: args.guess.as_ref().map(|g| DVector::from_column_slice(g)),
    })
}

/// Deterministic fit of the unperturbed sample.
pub fn run_baseline(prepared: &Prepared) -> Result<FitResult, AppError> {
    let mut request = FitRequest::from_sample(&prepared.sample);
    if let Some(guess) = &prepared.guess {
        request = request.initial_guess(guess);
    }
    Ok(fit(prepared.ansatz.as_ref(), &request, &prepared.fit)?)
}

/// Engine configuration for `mcfit fit`.
pub fn stochastic_config(args: &FitArgs, prepared: &Prepared) -> Result<StochasticConfig, AppError> {
    let baseline = if args.no_baseline {
        let guess = prepared
            .guess
            .clone()
            .ok_or_else(|| AppError::new(2, "--no-baseline needs --guess."))?;
        BaselineSeed::Guess(guess)
    } else {
        BaselineSeed::Fit
    };
    Ok(StochasticConfig {
        num_iterations: args.iterations,
        seed: args.seed,
        baseline,
        use_dy_weights: !args.unweighted,
        spread: args.spread,
        execution: if args.threads.is_some() {
            Execution::Parallel
        } else {
            Execution::Sequential
        },
        fit: prepared.fit,
    })
}

/// Run the engine, on a dedicated pool of `threads` workers when given.
pub fn run_stochastic<'p>(
    prepared: &'p Prepared,
    config: StochasticConfig,
    threads: Option<usize>,
) -> Result<StochasticRun<'p, dyn Ansatz>, AppError> {
    let mut fitter = StochasticFitter::new(prepared.ansatz.as_ref(), &prepared.sample, config);
    // A caller guess without --no-baseline seeds the baseline fit itself.
    if let Some(guess) = &prepared.guess {
        fitter = fitter.with_baseline_guess(guess);
    }
    let run = match threads {
        Some(n) => {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(n)
                .build()
                .map_err(|e| AppError::new(2, format!("Failed to build thread pool: {e}")))?;
            pool.install(|| fitter.run())?
        }
        None => fitter.run()?,
    };
    Ok(run)
}
