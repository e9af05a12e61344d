//! docgraph Document
//!
//! Canonical document values and the path-addressed write protocol.
//!
//! # Core Concepts
//!
//! - [`Document`]: Versioned canonical value (the single writable store)
//! - [`DocPath`]: Display-path codec (`{Root}.a.b[0]`)
//! - [`mutate`]: Copy-on-write replacement of the value at a path
//! - [`Edit`]: One replacement, with optional base-hash guard
//! - [`classify`]: Shared typing rule for text-sourced edits
//!
//! # Example
//!
//! ```rust
//! use docgraph_document::{mutate_at, classify};
//! use serde_json::json;
//!
//! let doc = json!({"fruit": {"name": "Apple"}});
//! let updated = mutate_at(&doc, "{Root}.fruit.name", classify("Orange")).unwrap();
//! assert_eq!(updated, json!({"fruit": {"name": "Orange"}}));
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

// Core modules
mod coerce;
mod document;
mod hash;
mod mutation;
mod path;

// Re-exports
pub use coerce::{classify, parse_strict, ValueParseError};
pub use document::{Document, Version};
pub use hash::{ContentHash, HashError};
pub use mutation::{lookup, mutate, mutate_at, Edit, EditValue, MutationError};
pub use path::{decode, encode, DocPath, PathSyntaxError, RootToken, Segment, ARRAY_ROOT, OBJECT_ROOT};

/// Canonical value type shared by every crate in the workspace
pub use serde_json::Value;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
