//! Error types for the synchronization layer
//!
//! Provides error handling for:
//! - Format adaptation (text ↔ canonical value)
//! - Edits (path, value, base hash, text regeneration)
//! - Configuration loading
//! - The session actor boundary
//!
//! Nothing here is fatal: every failure leaves the last known-good text,
//! document and graph in place.

use crate::adapters::Format;
use docgraph_document::{ContentHash, DocPath, MutationError, PathSyntaxError, ValueParseError};

/// Errors crossing the format adapter boundary
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FormatParseError {
    /// Text does not parse in the current format
    #[error("{format} syntax error{}: {message}", location(.line, .column))]
    Syntax {
        format: Format,
        message: String,
        line: Option<usize>,
        column: Option<usize>,
    },

    /// Canonical value cannot be written in the format
    #[error("cannot render document as {format}: {message}")]
    Render { format: Format, message: String },

    /// No adapter registered for the format
    #[error("no adapter registered for format: {0}")]
    Unsupported(Format),
}

impl FormatParseError {
    /// Create syntax error without a location
    pub fn syntax(format: Format, message: impl Into<String>) -> Self {
        Self::Syntax {
            format,
            message: message.into(),
            line: None,
            column: None,
        }
    }

    /// Create render error
    pub fn render(format: Format, message: impl Into<String>) -> Self {
        Self::Render {
            format,
            message: message.into(),
        }
    }

    /// Format the error refers to
    #[must_use]
    pub fn format(&self) -> Format {
        match self {
            Self::Syntax { format, .. } | Self::Render { format, .. } => *format,
            Self::Unsupported(format) => *format,
        }
    }
}

fn location(line: &Option<usize>, column: &Option<usize>) -> String {
    match (*line, *column) {
        (Some(line), Some(column)) => format!(" at line {line}, column {column}"),
        (Some(line), None) => format!(" at line {line}"),
        _ => String::new(),
    }
}

/// Errors rejecting an edit
///
/// On any of these the document, text and graph are unchanged.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EditError {
    /// Target path is malformed
    #[error("invalid path: {0}")]
    Path(#[from] PathSyntaxError),

    /// Target path does not address a writable slot
    #[error("path not found: {path}")]
    PathNotFound { path: DocPath, depth: usize },

    /// Edit text declared as JSON does not parse
    #[error("invalid value: {0}")]
    Value(#[from] ValueParseError),

    /// Document changed since the edit was prepared
    #[error("stale edit: expected base {expected}, document is at {actual}")]
    StaleBase {
        expected: ContentHash,
        actual: ContentHash,
    },

    /// Regenerating text for the edited document failed
    #[error("edit rolled back: {0}")]
    Format(#[from] FormatParseError),
}

impl From<MutationError> for EditError {
    fn from(err: MutationError) -> Self {
        match err {
            MutationError::Syntax(e) => Self::Path(e),
            MutationError::PathNotFound { path, depth } => Self::PathNotFound { path, depth },
            MutationError::Value(e) => Self::Value(e),
            MutationError::BaseMismatch { expected, actual } => Self::StaleBase { expected, actual },
        }
    }
}

/// Errors loading [`crate::EngineConfig`]
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// TOML does not parse or does not match the schema
    #[error("invalid config: {0}")]
    Toml(#[from] toml::de::Error),

    /// Value out of range
    #[error("invalid config value for {field}: {message}")]
    Invalid { field: &'static str, message: String },
}

/// Main synchronization error type
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// Text or rendering failed in the adapter
    #[error("format error: {0}")]
    Format(#[from] FormatParseError),

    /// Edit rejected
    #[error("edit rejected: {0}")]
    Edit(#[from] EditError),

    /// Configuration rejected
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Session actor has stopped
    #[error("session closed")]
    Closed,
}

impl SyncError {
    /// Check if the caller can retry after refreshing its view
    #[inline]
    #[must_use]
    pub fn is_stale(&self) -> bool {
        matches!(self, Self::Edit(EditError::StaleBase { .. }))
    }
}
