//! Formatted terminal output.
//!
//! Formatting lives here so the fitting code stays free of presentation
//! concerns and output changes stay localized.

use clap::ValueEnum;

use crate::errorbar::ErrorbarValue;
use crate::fit::FitResult;
use crate::io::RunSummary;
use crate::report::PointResidual;
use crate::stochastic::ParameterEstimates;

/// How final parameter estimates are printed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum ReportStyle {
    /// One line, compact notation: `E0 = -2.187(10)  k = 9.85(61)`.
    #[default]
    Compact,
    /// One `name = value` line per parameter.
    Listing,
    /// `name mean error` with plain numbers, for scripts.
    Raw,
    /// Nothing.
    Quiet,
}

/// Format final estimates in the requested style.
pub fn format_parameters(estimates: &ParameterEstimates, style: ReportStyle) -> String {
    match style {
        ReportStyle::Compact => {
            let parts: Vec<String> = estimates.iter().map(|(name, v)| format!("{name} = {v}")).collect();
            format!("{}\n", parts.join("  "))
        }
        ReportStyle::Listing => {
            let width = estimates.names().iter().map(|n| n.len()).max().unwrap_or(0);
            estimates
                .iter()
                .map(|(name, v)| format!("{name:<width$} = {v}\n"))
                .collect()
        }
        ReportStyle::Raw => estimates
            .iter()
            .map(|(name, v)| format!("{name} {} {}\n", v.mean(), v.error()))
            .collect(),
        ReportStyle::Quiet => String::new(),
    }
}

/// Format the run header (setup, baseline) of a stochastic run.
pub fn format_run_summary(summary: &RunSummary) -> String {
    let mut out = String::new();

    out.push_str("=== mcfit - Monte Carlo curve fit ===\n");
    out.push_str(&format!(
        "Ansatz: {} ({})\n",
        summary.ansatz,
        summary.estimates.names().join(", ")
    ));
    out.push_str(&format!(
        "Method: {} | points={} | iterations={} | seed={} | spread={:?}\n",
        summary.method,
        summary.points,
        summary.iterations,
        summary.seed.map_or_else(|| "external".to_string(), |s| s.to_string()),
        summary.spread
    ));

    match &summary.baseline {
        Some(b) => {
            out.push_str(&format!(
                "\nBaseline fit: chi2={:.6} funcalls={}\n",
                b.chi_square, b.funcalls
            ));
            for (i, name) in summary.estimates.names().iter().enumerate() {
                let value = b.params.get(i).copied().unwrap_or(f64::NAN);
                let err = b.xerr.as_ref().and_then(|e| e.get(i).copied());
                out.push_str(&format!("- {name}: {}\n", fmt_with_error(value, err)));
            }
        }
        None => out.push_str("\nBaseline fit: skipped (caller-supplied guess)\n"),
    }

    out.push_str("\nMonte Carlo estimates:\n");
    out.push_str(&format_parameters(&summary.estimates, ReportStyle::Listing));
    out
}

/// Format a single deterministic fit.
pub fn format_fit_result(ansatz: &str, names: &[String], result: &FitResult) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "{ansatz} ({}): chi2={:.6} funcalls={} [{}]\n",
        result.method, result.chi_square, result.funcalls, result.termination
    ));
    for (i, name) in names.iter().enumerate() {
        let err = result.xerr.as_ref().map(|e| e[i]);
        out.push_str(&format!("- {name}: {}\n", fmt_with_error(result.xopt[i], err)));
    }
    out
}

/// Format the data points against the fitted curve.
pub fn format_data_table(rows: &[PointResidual]) -> String {
    let mut out = String::new();
    out.push_str(format!("{:>12} {:>14} {:>12} {:>14} {:>12} {:>8}", "x", "y_obs", "dy", "y_fit", "residual", "pull").trim_end());
    out.push('\n');
    out.push_str(format!("{:-<12} {:-<14} {:-<12} {:-<14} {:-<12} {:-<8}", "", "", "", "", "", "").trim_end());
    out.push('\n');

    for r in rows {
        let x: Vec<String> = r.x.iter().map(|v| format!("{v:.4}")).collect();
        out.push_str(
            format!(
                "{:>12} {:>14.6} {:>12.6} {:>14.6} {:>12.6} {:>8.2}",
                x.join(","),
                r.y_obs,
                r.dy,
                r.y_fit,
                r.residual,
                r.pull
            )
            .trim_end(),
        );
        out.push('\n');
    }
    out
}

fn fmt_with_error(value: f64, error: Option<f64>) -> String {
    match error {
        Some(e) => format!("{} ({value:.6} +- {e:.6})", ErrorbarValue::new(value, e)),
        None => format!("{value:.6}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errorbar::ErrorbarValue;

    fn morse_estimates() -> ParameterEstimates {
        ParameterEstimates::new(
            vec!["E0".into(), "k".into(), "r0".into(), "a".into()],
            vec![
                ErrorbarValue::new(-2.187, 0.010),
                ErrorbarValue::new(9.85, 0.61),
                ErrorbarValue::new(1.8044, 0.0066),
                ErrorbarValue::new(1.864, 0.083),
            ],
        )
        .unwrap()
    }

    #[test]
    fn compact_style_is_one_line() {
        let s = format_parameters(&morse_estimates(), ReportStyle::Compact);
        assert_eq!(s, "E0 = -2.187(10)  k = 9.85(61)  r0 = 1.8044(66)  a = 1.864(83)\n");
    }

    #[test]
    fn listing_aligns_names() {
        let s = format_parameters(&morse_estimates(), ReportStyle::Listing);
        let lines: Vec<&str> = s.lines().collect();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0], "E0 = -2.187(10)");
        assert_eq!(lines[1], "k  = 9.85(61)");
    }

    #[test]
    fn raw_and_quiet_styles() {
        let s = format_parameters(&morse_estimates(), ReportStyle::Raw);
        assert_eq!(s.lines().next(), Some("E0 -2.187 0.01"));
        assert!(format_parameters(&morse_estimates(), ReportStyle::Quiet).is_empty());
    }

    #[test]
    fn data_table_has_one_row_per_point() {
        let rows = vec![PointResidual {
            x: vec![1.55],
            y_obs: -1.8,
            dy: 0.05,
            y_fit: -1.81,
            residual: 0.01,
            pull: 0.2,
        }];
        let s = format_data_table(&rows);
        assert_eq!(s.lines().count(), 3);
        assert!(s.lines().nth(2).unwrap().contains("1.5500"));
    }
}
