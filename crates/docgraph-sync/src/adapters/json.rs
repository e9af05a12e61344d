//! JSON adapter
//!
//! Uses serde_json; objects keep their key order through parse and render.

use super::{Format, FormatAdapter};
use crate::error::FormatParseError;
use async_trait::async_trait;
use serde_json::Value;

/// JSON adapter (pretty-printed output, 2-space indent)
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonAdapter;

impl JsonAdapter {
    /// Create new JSON adapter
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl FormatAdapter for JsonAdapter {
    fn format(&self) -> Format {
        Format::Json
    }

    async fn to_canonical(&self, text: &str) -> Result<Value, FormatParseError> {
        serde_json::from_str(text).map_err(|e| FormatParseError::Syntax {
            format: Format::Json,
            message: e.to_string(),
            line: Some(e.line()),
            column: Some(e.column()),
        })
    }

    fn from_canonical(&self, value: &Value) -> Result<String, FormatParseError> {
        serde_json::to_string_pretty(value)
            .map_err(|e| FormatParseError::render(Format::Json, e.to_string()))
    }
}
