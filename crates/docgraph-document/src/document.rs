//! Versioned canonical document
//!
//! [`Document`] is the canonical-value store: the single writable source of
//! document content. Every accepted write bumps its [`Version`], which the
//! graph projection uses to tell fresh state from stale.

use crate::hash::ContentHash;
use crate::mutation::{lookup, Edit, MutationError};
use crate::path::{DocPath, RootToken};
use serde_json::Value;
use std::fmt::{self, Display, Formatter};

/// Monotonic write stamp of a [`Document`]
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, serde::Serialize, serde::Deserialize,
)]
#[serde(transparent)]
pub struct Version(u64);

impl Version {
    /// Version of a freshly created document
    pub const INITIAL: Self = Self(0);

    /// Raw counter
    #[inline]
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }

    /// Following version
    #[inline]
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl Display for Version {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

/// Canonical document value with hash and version
///
/// # Invariants
/// - `hash` is always `ContentHash::of_value(&value)`
/// - `version` increases by one on every accepted write
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    value: Value,
    hash: ContentHash,
    version: Version,
}

impl Document {
    /// Create document at [`Version::INITIAL`]
    #[must_use]
    pub fn new(value: Value) -> Self {
        let hash = ContentHash::of_value(&value);
        Self {
            value,
            hash,
            version: Version::INITIAL,
        }
    }

    /// Current value
    #[inline]
    #[must_use]
    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Hash of current value
    #[inline]
    #[must_use]
    pub fn hash(&self) -> &ContentHash {
        &self.hash
    }

    /// Current version
    #[inline]
    #[must_use]
    pub fn version(&self) -> Version {
        self.version
    }

    /// Root token for display paths into this document
    #[inline]
    #[must_use]
    pub fn root_token(&self) -> RootToken {
        RootToken::for_value(&self.value)
    }

    /// Value at `path`
    #[inline]
    #[must_use]
    pub fn get(&self, path: &DocPath) -> Option<&Value> {
        lookup(&self.value, path)
    }

    /// Replace the whole value, returning the new version
    pub fn replace(&mut self, value: Value) -> Version {
        self.hash = ContentHash::of_value(&value);
        self.value = value;
        self.version = self.version.next();
        self.version
    }

    /// Apply an edit, returning the new version
    ///
    /// On error the document is left unchanged.
    ///
    /// # Errors
    /// Returns error if the edit's base hash doesn't match, its value does
    /// not resolve, or its path does not address a writable slot
    pub fn apply(&mut self, edit: Edit) -> Result<Version, MutationError> {
        edit.validate_base(&self.hash)?;
        let updated = edit.apply(&self.value)?;
        Ok(self.replace(updated))
    }

    /// Verify the cached hash
    #[inline]
    #[must_use]
    pub fn verify(&self) -> bool {
        self.hash == ContentHash::of_value(&self.value)
    }

    /// Consume into the value
    #[inline]
    #[must_use]
    pub fn into_value(self) -> Value {
        self.value
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new(Value::Object(serde_json::Map::new()))
    }
}

impl From<Value> for Document {
    fn from(value: Value) -> Self {
        Self::new(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mutation::EditValue;
    use serde_json::json;

    #[test]
    fn document_new_is_initial() {
        let doc = Document::new(json!({"a": 1}));
        assert_eq!(doc.version(), Version::INITIAL);
        assert!(doc.verify());
        assert_eq!(doc.root_token(), RootToken::Object);
    }

    #[test]
    fn document_replace_bumps_version() {
        let mut doc = Document::default();
        let before = *doc.hash();
        let v1 = doc.replace(json!([1]));
        assert_eq!(v1.get(), 1);
        assert_ne!(*doc.hash(), before);
        assert_eq!(doc.root_token(), RootToken::Array);
        assert!(doc.verify());
    }

    #[test]
    fn document_apply_success() {
        let mut doc = Document::new(json!({"fruit": {"name": "Apple"}}));
        let edit = Edit::parse("{Root}.fruit.name", EditValue::Text("Orange".into())).unwrap();
        let version = doc.apply(edit).unwrap();
        assert_eq!(version, Version::INITIAL.next());
        assert_eq!(doc.value(), &json!({"fruit": {"name": "Orange"}}));
    }

    #[test]
    fn document_apply_failure_leaves_state() {
        let mut doc = Document::new(json!({"a": 1}));
        let snapshot = doc.clone();
        let edit = Edit::parse("{Root}.b.c", json!(5)).unwrap();
        assert!(doc.apply(edit).is_err());
        assert_eq!(doc, snapshot);
    }

    #[test]
    fn document_apply_stale_base_rejected() {
        let mut doc = Document::new(json!({"a": 1}));
        let stale = *doc.hash();
        doc.replace(json!({"a": 2}));

        let edit = Edit::parse("{Root}.a", json!(3)).unwrap().with_base(stale);
        assert!(matches!(doc.apply(edit), Err(MutationError::BaseMismatch { .. })));
        assert_eq!(doc.value(), &json!({"a": 2}));
    }

    #[test]
    fn version_display() {
        assert_eq!(Version::INITIAL.next().to_string(), "v1");
    }
}
