//! Head/tail summarization of oversized tool output.

use serde_json::Value;

use crate::{AppError, Result};

/// Keep the first `head` and last `tail` characters of `text`.
///
/// When only one bound is given the other takes the same value; when neither
/// is given the text is returned unchanged. Lengths are counted in `char`s so
/// the cut never splits a code point.
#[must_use]
pub fn truncate_output(text: &str, head: Option<usize>, tail: Option<usize>) -> String {
    let (h, t) = match (head, tail) {
        (None, None) => return text.to_owned(),
        (Some(h), None) => (h, h),
        (None, Some(t)) => (t, t),
        (Some(h), Some(t)) => (h, t),
    };

    let len = text.chars().count();
    let keep = h.saturating_add(t);
    if len <= keep {
        return text.to_owned();
    }

    let omitted = len - keep;
    let head_part: String = text.chars().take(h).collect();
    let tail_part: String = text.chars().skip(len - t).collect();
    format!("{head_part}\n...({omitted} characters omitted)...\n{tail_part}")
}

/// Convert a `head_chars` / `tail_chars` argument into a character count.
///
/// Accepts JSON integers, integral floats, and numeric strings. `null` and
/// absence both mean "not given".
///
/// # Errors
///
/// Returns `AppError::Validation` for negatives, fractions, booleans, and
/// anything else that is not a non-negative integer.
pub fn normalize_trim_value(value: Option<&Value>, name: &str) -> Result<Option<usize>> {
    let invalid = |shown: &dyn std::fmt::Display| {
        AppError::Validation(format!(
            "{name} must be a non-negative integer (got {shown})"
        ))
    };

    let parsed = match value {
        None | Some(Value::Null) => return Ok(None),
        Some(Value::Number(number)) => {
            if let Some(n) = number.as_u64() {
                Some(n)
            } else if let Some(f) = number.as_f64() {
                integral_float(f)
            } else {
                None
            }
        }
        Some(Value::String(raw)) => raw.trim().parse::<u64>().ok(),
        Some(_) => None,
    };

    match parsed {
        Some(n) => usize::try_from(n).map(Some).map_err(|_| invalid(&n)),
        None => Err(invalid(&value.map_or_else(String::new, Value::to_string))),
    }
}

#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_precision_loss,
    clippy::cast_sign_loss,
    clippy::float_cmp
)]
fn integral_float(f: f64) -> Option<u64> {
    // u64::MAX as f64 rounds up, so compare strictly below it.
    if f.is_finite() && f >= 0.0 && f.fract() == 0.0 && f < u64::MAX as f64 {
        Some(f as u64)
    } else {
        None
    }
}
