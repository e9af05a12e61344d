//! docgraph Sync
//!
//! Keeps raw document text, the canonical document and its graph projection
//! consistent while any of them is being edited.
//!
//! # Core Concepts
//!
//! - [`FormatAdapter`]: Text ↔ canonical value, one per [`Format`]
//! - [`SyncEngine`]: Single-writer owner of the three stores
//! - [`Session`]: Ordered actor around an engine, driven via [`SessionHandle`]
//! - [`EngineConfig`]: Format, node ceiling and rebuild debounce
//!
//! # Example
//!
//! ```rust,no_run
//! use docgraph_sync::{EngineConfig, Session, SyncEngine};
//! use serde_json::json;
//!
//! # async fn demo() -> Result<(), docgraph_sync::SyncError> {
//! let engine = SyncEngine::new(EngineConfig::new())?;
//! let session = Session::spawn(engine);
//!
//! session.set_text(r#"{"fruit": {"name": "Apple"}}"#).await?;
//! session.apply_edit("{Root}.fruit.name", json!("Orange")).await?;
//!
//! let snapshot = session.flush().await?;
//! assert_eq!(snapshot.version.get(), 2);
//! # Ok(())
//! # }
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

// Core modules
mod adapters;
mod config;
mod engine;
mod error;
mod session;

// Re-exports
pub use adapters::{AdapterRegistry, Format, FormatAdapter, JsonAdapter, UnknownFormat, YamlAdapter};
pub use config::EngineConfig;
pub use engine::{
    EditReceipt, GraphSnapshot, GraphView, ParsedText, ReparseOutcome, ReparseTicket, SyncEngine, TextState,
};
pub use error::{ConfigError, EditError, FormatParseError, SyncError};
pub use session::{Session, SessionHandle};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod integration_tests {
    use super::*;
    use docgraph_document::{Edit, EditValue};
    use serde_json::json;

    #[tokio::test]
    async fn stale_edit_is_rejected_through_session() {
        let engine = SyncEngine::new(EngineConfig::new()).unwrap();
        let base = *engine.document().hash();
        let session = Session::spawn(engine);

        session.set_text(r#"{"a": 1}"#).await.unwrap();
        let edit = Edit::parse("{Root}.a", EditValue::Typed(json!(5)))
            .unwrap()
            .with_base(base);
        let err = session.apply(edit).await.unwrap_err();
        assert!(err.is_stale());

        let snapshot = session.flush().await.unwrap();
        assert_eq!(snapshot.version.get(), 1);
    }

    #[tokio::test]
    async fn session_survives_dropped_clone() {
        let session = Session::spawn(SyncEngine::new(EngineConfig::new()).unwrap());
        let other = session.clone();
        drop(session);
        assert!(other.snapshot().await.is_ok());
    }
}
