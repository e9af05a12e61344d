//! Classification of edit text into typed values
//!
//! Every edit surface that only has a string runs it through [`classify`]
//! before building an edit, so a bare `50` means the number 50 everywhere.

use serde_json::{Number, Value};

/// Classify edit text into a canonical value
///
/// In order, on the trimmed input:
/// - `"true"` / `"false"` → boolean
/// - `"null"` → null
/// - a finite number → number
/// - valid JSON (object/array literals, quoted strings) → parsed value
/// - anything else → the original, untrimmed string
#[must_use]
pub fn classify(input: &str) -> Value {
    typed_literal(input.trim())
        .or_else(|| serde_json::from_str(input.trim()).ok())
        .unwrap_or_else(|| Value::String(input.to_string()))
}

/// Parse edit text that is declared to be a typed literal or JSON
///
/// Same rules as [`classify`] without the string fallback.
///
/// # Errors
/// Returns [`ValueParseError`] if the text is neither a typed literal nor
/// valid JSON
pub fn parse_strict(input: &str) -> Result<Value, ValueParseError> {
    let trimmed = input.trim();
    if let Some(value) = typed_literal(trimmed) {
        return Ok(value);
    }
    serde_json::from_str(trimmed).map_err(|e| ValueParseError {
        input: input.to_string(),
        message: e.to_string(),
    })
}

fn typed_literal(trimmed: &str) -> Option<Value> {
    match trimmed {
        "true" => Some(Value::Bool(true)),
        "false" => Some(Value::Bool(false)),
        "null" => Some(Value::Null),
        _ => parse_number(trimmed).map(Value::Number),
    }
}

fn parse_number(trimmed: &str) -> Option<Number> {
    if trimmed.is_empty() {
        return None;
    }
    if let Ok(int) = trimmed.parse::<i64>() {
        return Some(int.into());
    }
    if let Ok(uint) = trimmed.parse::<u64>() {
        return Some(uint.into());
    }
    // Rejects "inf" and "NaN", which f64 parsing accepts
    trimmed
        .parse::<f64>()
        .ok()
        .filter(|f| f.is_finite())
        .and_then(Number::from_f64)
}

/// Edit text is neither a typed literal nor valid JSON
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("cannot parse '{input}' as a value: {message}")]
pub struct ValueParseError {
    /// Rejected input
    pub input: String,
    /// Parser message
    pub message: String,
}
