//! Compact uncertainty notation.
//!
//! `-2.187(10)` means `-2.187 ± 0.010`: the digits in parentheses are the
//! error expressed in units of the last shown decimal of the mean. This is
//! the notation used in the final-parameter reports.
//!
//! Parsing also accepts an exponent suffix (`1.23(4)e-3`), the explicit
//! `mean +- error` / `mean ± error` forms, and bare numbers (zero error).

use std::fmt;
use std::str::FromStr;

use crate::errorbar::ErrorbarValue;

/// Number of significant error digits used by `Display`.
pub const DEFAULT_ERROR_DIGITS: usize = 2;

impl ErrorbarValue {
    /// Format as `mean(error)` with `digits` significant digits of error.
    ///
    /// Falls back to `mean +- error` when the error is zero, when either part
    /// is not finite, or when the error digits do not fit in an integer
    /// (subnormal or huge errors), since the compact form cannot express those.
    pub fn compact(&self, digits: usize) -> String {
        let digits = digits.max(1) as i32;
        let (mean, error) = (self.mean(), self.error());
        let plus_minus = || format!("{mean} +- {error}");
        if !(mean.is_finite() && error.is_finite() && error > 0.0) {
            return plus_minus();
        }

        let exponent = error.log10().floor() as i32;
        let mut decimals = digits - 1 - exponent;
        let mut units = (error * 10f64.powi(decimals)).round();
        // Rounding may carry into an extra digit (0.0996 -> 100 units).
        if units >= 10f64.powi(digits) {
            decimals -= 1;
            units = (error * 10f64.powi(decimals)).round();
        }

        let scale = 10f64.powi(decimals.min(0).abs());
        let shown = units * scale;
        if !(units.is_finite() && shown.is_finite() && shown < u64::MAX as f64) {
            return plus_minus();
        }

        if decimals >= 0 {
            format!("{:.*}({})", decimals as usize, mean, units as u64)
        } else {
            let mean = (mean / scale).round() * scale;
            format!("{:.0}({})", mean, shown as u64)
        }
    }
}

impl fmt::Display for ErrorbarValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.compact(DEFAULT_ERROR_DIGITS))
    }
}

/// Failure to read an [`ErrorbarValue`] from text.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("cannot parse '{input}' as a value with uncertainty: {reason}")]
pub struct ParseErrorbarError {
    input: String,
    reason: &'static str,
}

impl ParseErrorbarError {
    fn new(input: &str, reason: &'static str) -> Self {
        Self {
            input: input.to_string(),
            reason,
        }
    }
}

impl FromStr for ErrorbarValue {
    type Err = ParseErrorbarError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let text = s.trim();
        if text.is_empty() {
            return Err(ParseErrorbarError::new(s, "empty input"));
        }

        if let Some(open) = text.find('(') {
            return parse_compact(s, text, open);
        }

        for separator in ["+-", "±"] {
            if let Some((mean, error)) = text.split_once(separator) {
                let mean = parse_number(s, mean, "invalid mean")?;
                let error = parse_number(s, error, "invalid error")?;
                return Ok(ErrorbarValue::new(mean, error));
            }
        }

        let mean = parse_number(s, text, "not a number")?;
        Ok(ErrorbarValue::exact(mean))
    }
}

fn parse_compact(input: &str, text: &str, open: usize) -> Result<ErrorbarValue, ParseErrorbarError> {
    let close = text[open..]
        .find(')')
        .map(|i| open + i)
        .ok_or_else(|| ParseErrorbarError::new(input, "missing ')'"))?;

    let mantissa = text[..open].trim();
    let mean = parse_number(input, mantissa, "invalid mean")?;
    let error = parse_number(input, &text[open + 1..close], "invalid error digits")?;

    let suffix = text[close + 1..].trim();
    let exponent: i32 = if suffix.is_empty() {
        0
    } else {
        suffix
            .strip_prefix(['e', 'E'])
            .and_then(|e| e.parse().ok())
            .ok_or_else(|| ParseErrorbarError::new(input, "invalid exponent"))?
    };

    let decimals = mantissa
        .split_once('.')
        .map(|(_, frac)| frac.len())
        .unwrap_or(0) as i32;

    let scale = 10f64.powi(exponent);
    Ok(ErrorbarValue::new(
        mean * scale,
        error * 10f64.powi(-decimals) * scale,
    ))
}

fn parse_number(input: &str, text: &str, reason: &'static str) -> Result<f64, ParseErrorbarError> {
    text.trim()
        .parse::<f64>()
        .map_err(|_| ParseErrorbarError::new(input, reason))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_with_two_error_digits() {
        assert_eq!(ErrorbarValue::new(-2.18725, 0.0104).to_string(), "-2.187(10)");
        assert_eq!(ErrorbarValue::new(9.8497, 0.6083).to_string(), "9.85(61)");
        assert_eq!(ErrorbarValue::new(1.80441, 0.00662).to_string(), "1.8044(66)");
        assert_eq!(ErrorbarValue::new(1.8642, 0.0831).to_string(), "1.864(83)");
    }

    #[test]
    fn rounding_carry_drops_a_decimal() {
        assert_eq!(ErrorbarValue::new(1.2345, 0.0996).to_string(), "1.23(10)");
    }

    #[test]
    fn large_errors_use_integer_units() {
        assert_eq!(ErrorbarValue::new(12345.0, 123.0).to_string(), "12350(120)");
        assert_eq!(ErrorbarValue::new(3.0, 0.25).compact(1), "3.0(3)");
    }

    #[test]
    fn zero_error_falls_back_to_plus_minus() {
        assert_eq!(ErrorbarValue::exact(1.5).to_string(), "1.5 +- 0");
    }

    #[test]
    fn unrepresentable_errors_fall_back_to_plus_minus() {
        let tiny = ErrorbarValue::new(1.0, 5e-324);
        assert_eq!(tiny.to_string(), format!("1 +- {}", 5e-324));
        let huge = ErrorbarValue::new(2.0, 1e300);
        assert_eq!(huge.to_string(), format!("2 +- {}", 1e300));
        // Still compact just below the integer limit.
        assert_eq!(ErrorbarValue::new(0.0, 1.2e18).to_string(), "0(1200000000000000000)");
    }

    #[test]
    fn parses_compact_notation() {
        let v: ErrorbarValue = "-2.187(10)".parse().unwrap();
        assert!((v.mean() + 2.187).abs() < 1e-12);
        assert!((v.error() - 0.010).abs() < 1e-12);

        let w: ErrorbarValue = "1.23(4)e-3".parse().unwrap();
        assert!((w.mean() - 1.23e-3).abs() < 1e-15);
        assert!((w.error() - 4e-5).abs() < 1e-15);

        let z: ErrorbarValue = "12350(120)".parse().unwrap();
        assert!((z.error() - 120.0).abs() < 1e-9);
    }

    #[test]
    fn parses_explicit_and_bare_forms() {
        let v: ErrorbarValue = "-1.5 +- 0.25".parse().unwrap();
        assert_eq!(v, ErrorbarValue::new(-1.5, 0.25));
        let w: ErrorbarValue = "2.0 ± 0.5".parse().unwrap();
        assert_eq!(w, ErrorbarValue::new(2.0, 0.5));
        let x: ErrorbarValue = "42".parse().unwrap();
        assert_eq!(x, ErrorbarValue::exact(42.0));
    }

    #[test]
    fn rejects_malformed_text() {
        assert!("".parse::<ErrorbarValue>().is_err());
        assert!("1.0(5".parse::<ErrorbarValue>().is_err());
        assert!("abc".parse::<ErrorbarValue>().is_err());
        assert!("1.0(5)x3".parse::<ErrorbarValue>().is_err());
    }
}
