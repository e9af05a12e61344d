//! YAML adapter
//!
//! Uses serde_yaml, deserializing straight into the canonical value. Mapping
//! keys must be strings; anchors and aliases are resolved on parse.

use super::{Format, FormatAdapter};
use crate::error::FormatParseError;
use async_trait::async_trait;
use serde_json::Value;

/// YAML adapter
#[derive(Debug, Clone, Copy, Default)]
pub struct YamlAdapter;

impl YamlAdapter {
    /// Create new YAML adapter
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl FormatAdapter for YamlAdapter {
    fn format(&self) -> Format {
        Format::Yaml
    }

    async fn to_canonical(&self, text: &str) -> Result<Value, FormatParseError> {
        serde_yaml::from_str(text).map_err(|e| {
            let location = e.location();
            FormatParseError::Syntax {
                format: Format::Yaml,
                message: e.to_string(),
                line: location.as_ref().map(serde_yaml::Location::line),
                column: location.as_ref().map(serde_yaml::Location::column),
            }
        })
    }

    fn from_canonical(&self, value: &Value) -> Result<String, FormatParseError> {
        serde_yaml::to_string(value).map_err(|e| FormatParseError::render(Format::Yaml, e.to_string()))
    }
}
