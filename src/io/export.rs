//! Parameter-sample dump.
//!
//! One row per refit: the parameters, the four residual norms and the number
//! of evaluations the refit took. Plain text so it loads into any plotting
//! or analysis tool:
//!
//! ```text
//! # mcfit parameter samples: ansatz=morse2 iterations=200 seed=378711 generated=2026-01-01T00:00:00Z
//! # E0 k r0 a ; perturbed_ssr perturbed_wssr original_ssr original_wssr ; nfev
//!  -2.1862530000e+00  9.8245800000e+00 ...
//! ```

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use chrono::{SecondsFormat, Utc};

use crate::error::AppError;
use crate::models::Ansatz;
use crate::stochastic::StochasticRun;

/// Write the dump of `run` to `path`.
pub fn export_parameter_samples<A: Ansatz + ?Sized>(path: &Path, run: &StochasticRun<'_, A>) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::new(2, format!("Failed to create sample dump '{}': {e}", path.display())))?;
    let mut out = BufWriter::new(file);
    write_parameter_samples(&mut out, run)
        .and_then(|()| out.flush())
        .map_err(|e| AppError::new(2, format!("Failed to write sample dump: {e}")))
}

pub fn write_parameter_samples<W: Write, A: Ansatz + ?Sized>(out: &mut W, run: &StochasticRun<'_, A>) -> io::Result<()> {
    let seed = run.seed().map_or_else(|| "external".to_string(), |s| s.to_string());
    writeln!(
        out,
        "# mcfit parameter samples: ansatz={} iterations={} seed={seed} generated={}",
        run.ansatz().name(),
        run.num_iterations(),
        Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
    )?;
    writeln!(
        out,
        "# {} ; perturbed_ssr perturbed_wssr original_ssr original_wssr ; nfev",
        run.parameter_names().join(" ")
    )?;

    for ((params, stats), nfev) in run.mc_params().iter().zip(run.mc_stats()).zip(run.mc_funcalls()) {
        let mut line = String::new();
        let stat_values = [
            stats.perturbed_ssr,
            stats.perturbed_wssr,
            stats.original_ssr,
            stats.original_wssr,
        ];
        for v in params.iter().chain(stat_values.iter()) {
            line.push(' ');
            line.push_str(&scientific(*v));
        }
        writeln!(out, "{line} {nfev}")?;
    }
    Ok(())
}

/// C-style `%17.10e`: signed two-digit exponent, right-aligned in 17 columns.
pub fn scientific(v: f64) -> String {
    if !v.is_finite() {
        return format!("{v:>17}");
    }
    let s = format!("{v:.10e}");
    let (mantissa, exponent) = s.split_once('e').unwrap_or((s.as_str(), "0"));
    let exp: i32 = exponent.parse().unwrap_or(0);
    let sign = if exp < 0 { '-' } else { '+' };
    format!("{:>17}", format!("{mantissa}e{sign}{:02}", exp.abs()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::FitSample;
    use crate::models::Constant;
    use crate::stochastic::{StochasticConfig, StochasticFitter};

    #[test]
    fn scientific_matches_printf() {
        assert_eq!(scientific(-2.186253), "-2.1862530000e+00");
        assert_eq!(scientific(0.0123), " 1.2300000000e-02");
        assert_eq!(scientific(1.5e120), "1.5000000000e+120");
        assert_eq!(scientific(0.0), " 0.0000000000e+00");
    }

    #[test]
    fn dump_has_header_and_one_row_per_iteration() {
        let sample = FitSample::from_columns(&[0.0, 1.0, 2.0], &[1.0, 1.2, 0.9], &[0.1, 0.1, 0.1]).unwrap();
        let config = StochasticConfig {
            num_iterations: 3,
            seed: Some(5),
            ..StochasticConfig::default()
        };
        let run = StochasticFitter::new(&Constant, &sample, config).run().unwrap();

        let mut buf = Vec::new();
        write_parameter_samples(&mut buf, &run).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines.len(), 5);
        assert!(lines[0].starts_with("# mcfit parameter samples: ansatz=constant iterations=3 seed=5"));
        assert_eq!(
            lines[1],
            "# c ; perturbed_ssr perturbed_wssr original_ssr original_wssr ; nfev"
        );
        let fields: Vec<&str> = lines[2].split_whitespace().collect();
        assert_eq!(fields.len(), 6);
        let c: f64 = fields[0].parse().unwrap();
        assert!((c - run.mc_params()[0][0]).abs() < 1e-9);
        assert_eq!(fields[5].parse::<usize>().unwrap(), run.mc_funcalls()[0]);
    }
}
