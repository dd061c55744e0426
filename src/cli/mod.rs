//! Command-line parsing for the Monte Carlo curve fitter.
//!
//! Argument parsing and command dispatch stay separate from the fitting
//! code: this module only describes the arguments, `app` acts on them.

use std::path::PathBuf;

use clap::{ArgGroup, Args, Parser, Subcommand};

use crate::io::InputFormat;
use crate::math::Spread;
use crate::models::AnsatzKind;
use crate::report::ReportStyle;

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "mcfit", version, about = "Curve fitting with Monte Carlo error bars")]
pub struct Cli {
    /// Log verbosity level (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "warn")]
    pub log_level: tracing::Level,

    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fit the baseline, resample the data and report Monte Carlo error bars.
    Fit(FitArgs),
    /// Run only the deterministic fit and report its asymptotic errors.
    Baseline(BaselineArgs),
    /// Print a previously written run summary JSON.
    Show(ShowArgs),
}

/// Data source, model and fit method shared by `fit` and `baseline`.
#[derive(Debug, Args, Clone)]
#[command(group(ArgGroup::new("source").required(true).args(["input", "cr2"])))]
pub struct SampleArgs {
    /// Sample file with columns x.., y, dy (CSV or whitespace separated).
    pub input: Option<PathBuf>,

    /// Use the bundled Cr2 binding-energy sample instead of a file.
    #[arg(long)]
    pub cr2: bool,

    /// Field separator of the sample file.
    #[arg(long, value_enum, default_value_t = InputFormat::Auto)]
    pub format: InputFormat,

    /// Model function to fit.
    #[arg(short = 'a', long, value_enum, default_value_t = AnsatzKind::Harmonic)]
    pub ansatz: AnsatzKind,

    /// Polynomial order (polynomial ansatz only).
    #[arg(long, default_value_t = 2)]
    pub order: usize,

    /// Domain dimension (polynomial ansatz only).
    #[arg(long, default_value_t = 1)]
    pub dim: usize,

    /// Minimization method (levenberg-marquardt, nelder-mead, bfgs, anneal, or a legacy alias).
    #[arg(short = 'm', long, env = "MCFIT_METHOD", default_value = "levenberg-marquardt")]
    pub method: String,

    /// Comma-separated initial guess (required for ansätze without a heuristic).
    #[arg(long, value_delimiter = ',', allow_hyphen_values = true)]
    pub guess: Option<Vec<f64>>,

    /// Print the data points against the fitted curve.
    #[arg(long)]
    pub show_data: bool,
}

#[derive(Debug, Args, Clone)]
pub struct FitArgs {
    #[command(flatten)]
    pub sample: SampleArgs,

    /// Number of perturbed refits.
    #[arg(short = 'n', long, env = "MCFIT_ITERATIONS", default_value_t = 100)]
    pub iterations: usize,

    /// Run seed (drawn from OS entropy and logged when omitted).
    #[arg(long, env = "MCFIT_SEED")]
    pub seed: Option<u64>,

    /// Skip the baseline fit and start every refit from `--guess`.
    #[arg(long, requires = "guess")]
    pub no_baseline: bool,

    /// Do not weight the perturbed refits by dy.
    #[arg(long)]
    pub unweighted: bool,

    /// Standard deviation convention for estimates and curves.
    #[arg(long, value_enum, default_value_t = Spread::Population)]
    pub spread: Spread,

    /// Run refits in parallel on this many threads.
    #[arg(long)]
    pub threads: Option<usize>,

    /// How final estimates are printed.
    #[arg(long, value_enum, default_value_t = ReportStyle::Listing)]
    pub style: ReportStyle,

    /// Write every refit's parameters and residual norms to this file.
    #[arg(long)]
    pub dump: Option<PathBuf>,

    /// Write a JSON run summary to this file.
    #[arg(long)]
    pub summary: Option<PathBuf>,
}

#[derive(Debug, Args, Clone)]
pub struct BaselineArgs {
    #[command(flatten)]
    pub sample: SampleArgs,
}

#[derive(Debug, Args, Clone)]
pub struct ShowArgs {
    /// Run summary JSON written by `mcfit fit --summary`.
    pub path: PathBuf,

    /// Print only the estimates, in this style.
    #[arg(long, value_enum)]
    pub style: Option<ReportStyle>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_full_fit_command() {
        let cli = Cli::try_parse_from([
            "mcfit", "fit", "--cr2", "-a", "morse2", "-n", "200", "--seed", "378711", "--threads", "4",
            "--log-level", "info",
        ])
        .unwrap();
        assert_eq!(cli.log_level, tracing::Level::INFO);
        let Command::Fit(args) = cli.command else {
            panic!("expected fit");
        };
        assert!(args.sample.cr2);
        assert_eq!(args.sample.ansatz, AnsatzKind::Morse2);
        assert_eq!(args.iterations, 200);
        assert_eq!(args.seed, Some(378711));
        assert_eq!(args.threads, Some(4));
    }

    #[test]
    fn negative_guesses_parse() {
        let cli = Cli::try_parse_from(["mcfit", "baseline", "data.txt", "--guess", "-2.0,1.5,1.8"]).unwrap();
        let Command::Baseline(args) = cli.command else {
            panic!("expected baseline");
        };
        assert_eq!(args.sample.guess, Some(vec![-2.0, 1.5, 1.8]));
        assert_eq!(args.sample.input, Some(PathBuf::from("data.txt")));
    }

    #[test]
    fn a_data_source_is_required() {
        assert!(Cli::try_parse_from(["mcfit", "fit"]).is_err());
        assert!(Cli::try_parse_from(["mcfit", "fit", "data.txt", "--cr2"]).is_err());
    }

    #[test]
    fn no_baseline_requires_a_guess() {
        assert!(Cli::try_parse_from(["mcfit", "fit", "--cr2", "--no-baseline"]).is_err());
    }
}
