//! Path-addressed value replacement
//!
//! Provides [`mutate`], the single write primitive every edit surface goes
//! through, and [`Edit`], the message form of one replacement.

use crate::coerce::{self, ValueParseError};
use crate::hash::ContentHash;
use crate::path::{DocPath, PathSyntaxError, Segment};
use serde_json::Value;

/// Replace the value at `path`, returning a new document
///
/// The caller's document is never modified. An empty path replaces the whole
/// document. Intermediate segments must resolve to existing containers;
/// the final slot may be a new object key or `index == len` (append).
///
/// # Errors
/// Returns [`MutationError::PathNotFound`] if an intermediate segment is
/// missing or does not address a container, or if the final slot cannot be
/// written (key on an array, index on an object, index past the end).
pub fn mutate(document: &Value, path: &DocPath, new_value: Value) -> Result<Value, MutationError> {
    let Some((last, init)) = path.segments().split_last() else {
        return Ok(new_value);
    };

    // Validate against the borrowed document first; only copy on success
    let parent = walk(document, init, path)?;
    check_slot(parent, last, path)?;

    let mut updated = document.clone();
    let parent = walk_mut(&mut updated, init, path)?;
    write_slot(parent, last, new_value, path)?;
    Ok(updated)
}

/// Decode `path` and [`mutate`]
///
/// # Errors
/// Returns [`MutationError::Syntax`] for a malformed path, otherwise as
/// [`mutate`]
pub fn mutate_at(document: &Value, path: &str, new_value: Value) -> Result<Value, MutationError> {
    let path: DocPath = path.parse()?;
    mutate(document, &path, new_value)
}

/// Value at `path`, if present
#[must_use]
pub fn lookup<'a>(document: &'a Value, path: &DocPath) -> Option<&'a Value> {
    path.iter().try_fold(document, |current, segment| child(current, segment))
}

fn child<'a>(value: &'a Value, segment: &Segment) -> Option<&'a Value> {
    match (value, segment) {
        (Value::Object(map), Segment::Key(key)) => map.get(key),
        (Value::Array(items), Segment::Index(index)) => items.get(*index),
        _ => None,
    }
}

fn walk<'a>(
    document: &'a Value,
    segments: &[Segment],
    path: &DocPath,
) -> Result<&'a Value, MutationError> {
    let mut current = document;
    for (depth, segment) in segments.iter().enumerate() {
        current = child(current, segment)
            .filter(|next| next.is_object() || next.is_array())
            .ok_or_else(|| MutationError::not_found(path, depth))?;
    }
    Ok(current)
}

fn walk_mut<'a>(
    document: &'a mut Value,
    segments: &[Segment],
    path: &DocPath,
) -> Result<&'a mut Value, MutationError> {
    let mut current = document;
    for (depth, segment) in segments.iter().enumerate() {
        let next = match (current, segment) {
            (Value::Object(map), Segment::Key(key)) => map.get_mut(key),
            (Value::Array(items), Segment::Index(index)) => items.get_mut(*index),
            _ => None,
        };
        current = next.ok_or_else(|| MutationError::not_found(path, depth))?;
    }
    Ok(current)
}

fn check_slot(parent: &Value, last: &Segment, path: &DocPath) -> Result<(), MutationError> {
    let writable = match (parent, last) {
        (Value::Object(_), Segment::Key(_)) => true,
        (Value::Array(items), Segment::Index(index)) => *index <= items.len(),
        _ => false,
    };
    if writable {
        Ok(())
    } else {
        Err(MutationError::not_found(path, path.len() - 1))
    }
}

fn write_slot(
    parent: &mut Value,
    last: &Segment,
    new_value: Value,
    path: &DocPath,
) -> Result<(), MutationError> {
    match (parent, last) {
        (Value::Object(map), Segment::Key(key)) => {
            map.insert(key.clone(), new_value);
            Ok(())
        }
        (Value::Array(items), Segment::Index(index)) if *index < items.len() => {
            items[*index] = new_value;
            Ok(())
        }
        (Value::Array(items), Segment::Index(index)) if *index == items.len() => {
            items.push(new_value);
            Ok(())
        }
        _ => Err(MutationError::not_found(path, path.len() - 1)),
    }
}

/// Value supplied by an edit surface
#[derive(Debug, Clone, PartialEq)]
pub enum EditValue {
    /// Already typed (graph and tree surfaces)
    Typed(Value),

    /// Free text, classified with [`coerce::classify`]
    Text(String),

    /// Text declared to be JSON, parsed with [`coerce::parse_strict`]
    Json(String),
}

impl EditValue {
    /// Resolve to a canonical value
    ///
    /// # Errors
    /// Returns [`ValueParseError`] if a `Json` value does not parse
    pub fn resolve(self) -> Result<Value, ValueParseError> {
        match self {
            Self::Typed(value) => Ok(value),
            Self::Text(text) => Ok(coerce::classify(&text)),
            Self::Json(text) => coerce::parse_strict(&text),
        }
    }
}

impl From<Value> for EditValue {
    fn from(value: Value) -> Self {
        Self::Typed(value)
    }
}

/// One value replacement at a path
///
/// # Invariants
/// - `base`, when set, must match the hash of the document the edit is
///   applied to
#[derive(Debug, Clone, PartialEq)]
pub struct Edit {
    /// Target display path
    target: DocPath,

    /// New value
    value: EditValue,

    /// Expected document hash (optimistic concurrency)
    base: Option<ContentHash>,
}

impl Edit {
    /// Create new edit
    #[inline]
    #[must_use]
    pub fn new(target: DocPath, value: impl Into<EditValue>) -> Self {
        Self {
            target,
            value: value.into(),
            base: None,
        }
    }

    /// Parse `target` and create edit
    ///
    /// # Errors
    /// Returns [`PathSyntaxError`] for a malformed path
    pub fn parse(target: &str, value: impl Into<EditValue>) -> Result<Self, PathSyntaxError> {
        Ok(Self::new(target.parse()?, value))
    }

    /// Require the document to hash to `base`
    #[inline]
    #[must_use]
    pub fn with_base(mut self, base: ContentHash) -> Self {
        self.base = Some(base);
        self
    }

    /// Target path
    #[inline]
    #[must_use]
    pub fn target(&self) -> &DocPath {
        &self.target
    }

    /// Edit value
    #[inline]
    #[must_use]
    pub fn value(&self) -> &EditValue {
        &self.value
    }

    /// Expected base hash
    #[inline]
    #[must_use]
    pub fn base(&self) -> Option<&ContentHash> {
        self.base.as_ref()
    }

    /// Verify edit can apply to a document with hash `actual`
    ///
    /// # Errors
    /// Returns error if the base hash doesn't match
    pub fn validate_base(&self, actual: &ContentHash) -> Result<(), MutationError> {
        match self.base {
            Some(expected) if expected != *actual => Err(MutationError::BaseMismatch {
                expected,
                actual: *actual,
            }),
            _ => Ok(()),
        }
    }

    /// Apply to `document`, returning the new document
    ///
    /// # Errors
    /// Returns error if the value does not resolve or the path does not
    /// address a writable slot
    pub fn apply(self, document: &Value) -> Result<Value, MutationError> {
        let value = self.value.resolve()?;
        mutate(document, &self.target, value)
    }
}

/// Errors specific to mutation
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MutationError {
    /// Path does not parse
    #[error("invalid path: {0}")]
    Syntax(#[from] PathSyntaxError),

    /// Segment at `depth` does not resolve
    #[error("path not found: {path} (segment {depth})")]
    PathNotFound { path: DocPath, depth: usize },

    /// Edit value does not parse
    #[error("invalid value: {0}")]
    Value(#[from] ValueParseError),

    /// Base hash mismatch (optimistic concurrency failure)
    #[error("base hash mismatch: expected {expected}, got {actual}")]
    BaseMismatch {
        expected: ContentHash,
        actual: ContentHash,
    },
}

impl MutationError {
    fn not_found(path: &DocPath, depth: usize) -> Self {
        Self::PathNotFound {
            path: path.clone(),
            depth,
        }
    }
}
