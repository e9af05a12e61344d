//! Format adapters
//!
//! Convert between raw document text and the canonical value:
//! - JSON via serde_json
//! - YAML via serde_yaml
//!
//! XML, CSV and spreadsheet formats are registered by the host application
//! through [`AdapterRegistry::register`].

use crate::error::FormatParseError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt::{self, Display, Formatter};
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

mod json;
mod yaml;

pub use json::JsonAdapter;
pub use yaml::YamlAdapter;

/// Document text format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    #[default]
    Json,
    Yaml,
    Xml,
    Csv,
    Xlsx,
}

impl Format {
    /// All formats, in menu order
    pub const ALL: [Self; 5] = [Self::Json, Self::Yaml, Self::Xml, Self::Csv, Self::Xlsx];

    /// Lowercase name
    #[inline]
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Yaml => "yaml",
            Self::Xml => "xml",
            Self::Csv => "csv",
            Self::Xlsx => "xlsx",
        }
    }

    /// Format for a file extension (without dot)
    #[must_use]
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "json" => Some(Self::Json),
            "yaml" | "yml" => Some(Self::Yaml),
            "xml" => Some(Self::Xml),
            "csv" => Some(Self::Csv),
            "xlsx" => Some(Self::Xlsx),
            _ => None,
        }
    }

    /// Format for a file path, by extension
    #[must_use]
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
    }
}

impl Display for Format {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Format {
    type Err = UnknownFormat;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_extension(s).ok_or_else(|| UnknownFormat(s.to_string()))
    }
}

/// Format name not recognised
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown format '{0}' (expected json, yaml, xml, csv or xlsx)")]
pub struct UnknownFormat(pub String);

/// Adapter trait for converting document text to and from the canonical value
///
/// Implement this trait to add support for new formats.
#[async_trait]
pub trait FormatAdapter: Send + Sync + 'static {
    /// Format this adapter handles
    fn format(&self) -> Format;

    /// Parse text into the canonical value
    async fn to_canonical(&self, text: &str) -> Result<Value, FormatParseError>;

    /// Render the canonical value as text
    fn from_canonical(&self, value: &Value) -> Result<String, FormatParseError>;
}

/// Adapter registration keyed by format
#[derive(Clone, Default)]
pub struct AdapterRegistry {
    adapters: HashMap<Format, Arc<dyn FormatAdapter>>,
}

impl fmt::Debug for AdapterRegistry {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdapterRegistry")
            .field("formats", &self.formats())
            .finish()
    }
}

impl AdapterRegistry {
    /// Create empty registry
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in JSON and YAML adapters
    #[must_use]
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(JsonAdapter::new());
        registry.register(YamlAdapter::new());
        registry
    }

    /// Register an adapter, replacing any previous one for its format
    pub fn register<A: FormatAdapter>(&mut self, adapter: A) {
        self.adapters.insert(adapter.format(), Arc::new(adapter));
    }

    /// Adapter for `format`
    ///
    /// # Errors
    /// Returns [`FormatParseError::Unsupported`] if none is registered
    pub fn get(&self, format: Format) -> Result<Arc<dyn FormatAdapter>, FormatParseError> {
        self.adapters
            .get(&format)
            .cloned()
            .ok_or(FormatParseError::Unsupported(format))
    }

    /// Check if `format` has an adapter
    #[inline]
    #[must_use]
    pub fn supports(&self, format: Format) -> bool {
        self.adapters.contains_key(&format)
    }

    /// Registered formats, in [`Format::ALL`] order
    #[must_use]
    pub fn formats(&self) -> Vec<Format> {
        Format::ALL
            .into_iter()
            .filter(|f| self.adapters.contains_key(f))
            .collect()
    }
}
