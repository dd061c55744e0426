//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - loads `.env` defaults and parses CLI arguments
//! - installs the log subscriber
//! - runs the baseline fit or the full stochastic run
//! - prints reports
//! - writes optional exports

use clap::Parser;
use nalgebra::DVector;

use crate::cli::{BaselineArgs, Command, FitArgs, ShowArgs};
use crate::error::AppError;
use crate::io::{RunSummary, export_parameter_samples, read_summary_json, write_summary_json};
use crate::report::{
    ReportStyle, compute_residuals, format_data_table, format_fit_result, format_parameters, format_run_summary,
};

pub mod pipeline;

/// Entry point for the `mcfit` binary.
pub fn run() -> Result<(), AppError> {
    // A missing .env file is the normal case.
    dotenvy::dotenv().ok();
    let cli = crate::cli::Cli::parse();

    tracing_subscriber::fmt()
        .with_max_level(cli.log_level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Command::Fit(args) => handle_fit(args),
        Command::Baseline(args) => handle_baseline(args),
        Command::Show(args) => handle_show(args),
    }
}

fn handle_fit(args: FitArgs) -> Result<(), AppError> {
    let prepared = pipeline::prepare(&args.sample)?;
    let config = pipeline::stochastic_config(&args, &prepared)?;
    log::info!(
        "fitting {} to {} ({} points, {} iterations)",
        prepared.ansatz.name(),
        prepared.source,
        prepared.sample.len(),
        config.num_iterations
    );

    let run = pipeline::run_stochastic(&prepared, config, args.threads)?;
    let summary = RunSummary::from_run(&run, prepared.fit.method, &prepared.sample)?;

    match args.style {
        ReportStyle::Listing => print!("{}", format_run_summary(&summary)),
        style => print!("{}", format_parameters(run.estimates(), style)),
    }

    if args.sample.show_data {
        let means = DVector::from_iterator(
            run.estimates().len(),
            run.estimates().values().iter().map(|v| v.mean()),
        );
        let rows = compute_residuals(&prepared.sample, prepared.ansatz.as_ref(), &means)?;
        println!("\n{}", format_data_table(&rows));
    }

    // Optional exports.
    if let Some(path) = &args.dump {
        export_parameter_samples(path, &run)?;
    }
    if let Some(path) = &args.summary {
        write_summary_json(path, &summary)?;
    }

    Ok(())
}

fn handle_baseline(args: BaselineArgs) -> Result<(), AppError> {
    let prepared = pipeline::prepare(&args.sample)?;
    let result = pipeline::run_baseline(&prepared)?;

    print!(
        "{}",
        format_fit_result(prepared.ansatz.name(), &prepared.ansatz.parameter_names(), &result)
    );
    if args.sample.show_data {
        let rows = compute_residuals(&prepared.sample, prepared.ansatz.as_ref(), &result.xopt)?;
        println!("\n{}", format_data_table(&rows));
    }
    Ok(())
}

fn handle_show(args: ShowArgs) -> Result<(), AppError> {
    let summary = read_summary_json(&args.path)?;
    match args.style {
        None | Some(ReportStyle::Listing) => print!("{}", format_run_summary(&summary)),
        Some(style) => print!("{}", format_parameters(&summary.estimates, style)),
    }
    Ok(())
}
