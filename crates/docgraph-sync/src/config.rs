//! Engine configuration

use crate::adapters::Format;
use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Engine configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Initial document format
    pub format: Format,
    /// Ceiling on nodes that count against the size limit
    pub node_limit: usize,
    /// Rebuild debounce for text-driven changes, in milliseconds
    pub debounce_ms: u64,
    /// Run `collapse_all` when a document is loaded (not while typing)
    pub collapse_on_load: bool,
}

impl EngineConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With initial format
    #[inline]
    #[must_use]
    pub fn with_format(mut self, format: Format) -> Self {
        self.format = format;
        self
    }

    /// With node ceiling
    #[inline]
    #[must_use]
    pub fn with_node_limit(mut self, limit: usize) -> Self {
        self.node_limit = limit;
        self
    }

    /// With rebuild debounce
    #[inline]
    #[must_use]
    pub fn with_debounce_ms(mut self, ms: u64) -> Self {
        self.debounce_ms = ms;
        self
    }

    /// With collapse-on-load
    #[inline]
    #[must_use]
    pub fn with_collapse_on_load(mut self, enabled: bool) -> Self {
        self.collapse_on_load = enabled;
        self
    }

    /// Debounce as a duration
    #[inline]
    #[must_use]
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    /// Load from TOML; missing fields take their defaults
    ///
    /// # Errors
    /// Returns [`ConfigError`] if the TOML does not parse or a value is out
    /// of range
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Check value ranges
    ///
    /// # Errors
    /// Returns [`ConfigError::Invalid`] for a zero node limit
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.node_limit == 0 {
            return Err(ConfigError::Invalid {
                field: "node_limit",
                message: "must be at least 1".into(),
            });
        }
        Ok(())
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            format: Format::Json,
            node_limit: 1500,
            debounce_ms: 400,
            collapse_on_load: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_defaults() {
        let config = EngineConfig::new();
        assert_eq!(config.format, Format::Json);
        assert_eq!(config.node_limit, 1500);
        assert_eq!(config.debounce(), Duration::from_millis(400));
        assert!(!config.collapse_on_load);
    }

    #[test]
    fn config_builders() {
        let config = EngineConfig::new()
            .with_format(Format::Yaml)
            .with_node_limit(10)
            .with_debounce_ms(0)
            .with_collapse_on_load(true);
        assert_eq!(config.format, Format::Yaml);
        assert_eq!(config.node_limit, 10);
        assert_eq!(config.debounce(), Duration::ZERO);
        assert!(config.collapse_on_load);
    }

    #[test]
    fn config_from_partial_toml() {
        let config = EngineConfig::from_toml_str("format = \"yaml\"\nnode_limit = 50\n").unwrap();
        assert_eq!(config.format, Format::Yaml);
        assert_eq!(config.node_limit, 50);
        assert_eq!(config.debounce_ms, 400);
    }

    #[test]
    fn config_rejects_bad_toml() {
        assert!(matches!(
            EngineConfig::from_toml_str("format = \"docx\""),
            Err(ConfigError::Toml(_))
        ));
        assert!(matches!(
            EngineConfig::from_toml_str("node_limit = 0"),
            Err(ConfigError::Invalid { field: "node_limit", .. })
        ));
    }
}
