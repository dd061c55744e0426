//! Sample ingest.
//!
//! Turns a CSV or whitespace-separated text file into a validated
//! [`FitSample`]. Each data row holds `x_1 .. x_D, y, dy`.
//!
//! - `#` starts a comment line
//! - there is no required header; a first row that is not numeric is taken as one
//! - bad rows are skipped and reported, not fatal
//! - no usable rows at all is exit code 3

use std::fs::File;
use std::io::Read;
use std::path::Path;

use clap::ValueEnum;
use csv::StringRecord;
use nalgebra::{DMatrix, DVector};

use crate::domain::FitSample;
use crate::error::AppError;

/// Field separator of a sample file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum InputFormat {
    /// `.csv` files are comma separated, anything else whitespace separated.
    #[default]
    Auto,
    Csv,
    Whitespace,
}

impl InputFormat {
    fn resolve(self, path: &Path) -> InputFormat {
        match self {
            InputFormat::Auto => {
                let is_csv = path
                    .extension()
                    .and_then(|e| e.to_str())
                    .is_some_and(|e| e.eq_ignore_ascii_case("csv"));
                if is_csv {
                    InputFormat::Csv
                } else {
                    InputFormat::Whitespace
                }
            }
            other => other,
        }
    }
}

/// A row-level error encountered during ingest.
#[derive(Debug, Clone, PartialEq)]
pub struct RowError {
    pub line: usize,
    pub message: String,
}

/// Ingest output: the sample plus what was skipped on the way.
#[derive(Debug, Clone)]
pub struct IngestedSample {
    pub sample: FitSample,
    /// Column names, when the file starts with a header row.
    pub header: Option<Vec<String>>,
    pub row_errors: Vec<RowError>,
    pub rows_read: usize,
    pub rows_used: usize,
}

/// Load a sample for a `dim`-dimensional domain from `path`.
pub fn load_sample(path: &Path, format: InputFormat, dim: usize) -> Result<IngestedSample, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::new(2, format!("Failed to open sample file '{}': {e}", path.display())))?;
    read_sample(file, format.resolve(path), dim)
}

/// Parse a sample from any reader. `Auto` is treated as whitespace.
pub fn read_sample<R: Read>(input: R, format: InputFormat, dim: usize) -> Result<IngestedSample, AppError> {
    if dim == 0 {
        return Err(AppError::new(2, "Domain dimension must be at least 1."));
    }
    let delimiter = match format {
        InputFormat::Csv => b',',
        InputFormat::Auto | InputFormat::Whitespace => b' ',
    };
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .comment(Some(b'#'))
        .delimiter(delimiter)
        .from_reader(input);

    let width = dim + 2;
    let mut xs: Vec<f64> = Vec::new();
    let mut ys = Vec::new();
    let mut dys = Vec::new();
    let mut header = None;
    let mut row_errors = Vec::new();
    let mut rows_read = 0usize;

    for (idx, result) in reader.records().enumerate() {
        let record = match result {
            Ok(r) => r,
            Err(e) => {
                row_errors.push(RowError {
                    line: idx + 1,
                    message: format!("parse error: {e}"),
                });
                continue;
            }
        };
        let line = record
            .position()
            .map_or(idx + 1, |p| p.line() as usize);
        let fields = split_fields(&record, format);
        if fields.is_empty() {
            continue;
        }

        let parsed: Result<Vec<f64>, _> = fields.iter().map(|f| f.parse::<f64>()).collect();
        let values = match parsed {
            Ok(v) => v,
            Err(_) if rows_read == 0 && header.is_none() => {
                header = Some(fields.iter().map(|f| f.to_string()).collect());
                continue;
            }
            Err(e) => {
                rows_read += 1;
                row_errors.push(RowError {
                    line,
                    message: format!("non-numeric field: {e}"),
                });
                continue;
            }
        };
        rows_read += 1;

        match validate_row(&values, width) {
            Ok(()) => {
                xs.extend_from_slice(&values[..dim]);
                ys.push(values[dim]);
                dys.push(values[dim + 1]);
            }
            Err(message) => row_errors.push(RowError { line, message }),
        }
    }

    let rows_used = ys.len();
    if rows_used == 0 {
        return Err(AppError::new(3, "No valid sample rows found."));
    }

    // Rows were appended point by point, i.e. column-major for a D×N matrix.
    let x = DMatrix::from_column_slice(dim, rows_used, &xs);
    let sample = FitSample::new(x, DVector::from_vec(ys), DVector::from_vec(dys))?;

    Ok(IngestedSample {
        sample,
        header,
        row_errors,
        rows_read,
        rows_used,
    })
}

fn split_fields(record: &StringRecord, format: InputFormat) -> Vec<&str> {
    match format {
        InputFormat::Csv => record.iter().filter(|f| !f.is_empty()).collect(),
        // Runs of blanks produce empty fields; tabs are not csv delimiters.
        InputFormat::Auto | InputFormat::Whitespace => record.iter().flat_map(str::split_whitespace).collect(),
    }
}

fn validate_row(values: &[f64], width: usize) -> Result<(), String> {
    if values.len() != width {
        return Err(format!("expected {width} columns (x.., y, dy), found {}", values.len()));
    }
    if values.iter().any(|v| !v.is_finite()) {
        return Err("values must be finite".to_string());
    }
    let dy = values[width - 1];
    if dy <= 0.0 {
        return Err(format!("uncertainty must be > 0 (got {dy})"));
    }
    Ok(())
}
