//! Display paths for addressing values inside a document
//!
//! Provides [`DocPath`], the codec between a segment list and the
//! human-readable display form used for node identity and edit addressing:
//!
//! - `{Root}` addresses an object (or scalar) document, `Root` an array one
//! - `.key` appends an object key
//! - `[3]` appends an array index, directly after a key, index or root token

use serde_json::Value;
use std::fmt::{self, Display, Formatter, Write as _};
use std::str::FromStr;

/// Root token for object and scalar documents
pub const OBJECT_ROOT: &str = "{Root}";

/// Root token for array documents
pub const ARRAY_ROOT: &str = "Root";

/// Which root token a path is written with
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum RootToken {
    /// `{Root}` - object or scalar document
    #[default]
    Object,
    /// `Root` - array document
    Array,
}

impl RootToken {
    /// Pick the token for a document value
    #[inline]
    #[must_use]
    pub fn for_value(value: &Value) -> Self {
        if value.is_array() {
            Self::Array
        } else {
            Self::Object
        }
    }

    /// Token text
    #[inline]
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Object => OBJECT_ROOT,
            Self::Array => ARRAY_ROOT,
        }
    }
}

/// One step from a container to a child
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Segment {
    /// Object key (any string, including numeric-looking ones)
    Key(String),
    /// Array index
    Index(usize),
}

impl Segment {
    /// Key segment
    #[inline]
    #[must_use]
    pub fn key(key: impl Into<String>) -> Self {
        Self::Key(key.into())
    }

    /// Key text, if this is a key segment
    #[inline]
    #[must_use]
    pub fn as_key(&self) -> Option<&str> {
        match self {
            Self::Key(key) => Some(key),
            Self::Index(_) => None,
        }
    }

    /// Index, if this is an index segment
    #[inline]
    #[must_use]
    pub fn as_index(&self) -> Option<usize> {
        match self {
            Self::Key(_) => None,
            Self::Index(index) => Some(*index),
        }
    }

    fn write_display(&self, out: &mut String) {
        match self {
            Self::Key(key) => {
                out.push('.');
                for ch in key.chars() {
                    if matches!(ch, '\\' | '.' | '[' | ']') {
                        out.push('\\');
                    }
                    out.push(ch);
                }
            }
            Self::Index(index) => {
                // Writing into a String cannot fail
                let _ = write!(out, "[{index}]");
            }
        }
    }
}

impl Display for Segment {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Key(key) => f.write_str(key),
            Self::Index(index) => write!(f, "{index}"),
        }
    }
}

impl From<&str> for Segment {
    fn from(key: &str) -> Self {
        Self::Key(key.to_string())
    }
}

impl From<String> for Segment {
    fn from(key: String) -> Self {
        Self::Key(key)
    }
}

impl From<usize> for Segment {
    fn from(index: usize) -> Self {
        Self::Index(index)
    }
}

/// Path from the document root to a value
///
/// Carries the root token it is displayed with, so that
/// `decode(encode(path)) == path` holds for every path.
///
/// # Examples
/// - `[]` with an object root → `{Root}`
/// - `["fruit", "name"]` → `{Root}.fruit.name`
/// - `[0, "id"]` with an array root → `Root[0].id`
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct DocPath {
    root: RootToken,
    segments: Vec<Segment>,
}

impl DocPath {
    /// Create path from root token and segments
    #[inline]
    #[must_use]
    pub fn new(root: RootToken, segments: Vec<Segment>) -> Self {
        Self { root, segments }
    }

    /// Empty path (whole document) with the given root token
    #[inline]
    #[must_use]
    pub fn root(root: RootToken) -> Self {
        Self::new(root, Vec::new())
    }

    /// Empty path with the token matching `value`
    #[inline]
    #[must_use]
    pub fn root_of(value: &Value) -> Self {
        Self::root(RootToken::for_value(value))
    }

    /// Root token
    #[inline]
    #[must_use]
    pub fn root_token(&self) -> RootToken {
        self.root
    }

    /// Same segments, different root token
    #[inline]
    #[must_use]
    pub fn with_root(mut self, root: RootToken) -> Self {
        self.root = root;
        self
    }

    /// Path segments
    #[inline]
    #[must_use]
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Number of segments
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Check if path addresses the whole document
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Parent path (if not root)
    #[inline]
    #[must_use]
    pub fn parent(&self) -> Option<Self> {
        let (_, init) = self.segments.split_last()?;
        Some(Self::new(self.root, init.to_vec()))
    }

    /// Last segment (if not root)
    #[inline]
    #[must_use]
    pub fn last(&self) -> Option<&Segment> {
        self.segments.last()
    }

    /// Append a segment, returning new path
    #[inline]
    #[must_use]
    pub fn child(&self, segment: impl Into<Segment>) -> Self {
        let mut new = self.clone();
        new.segments.push(segment.into());
        new
    }

    /// Append an index segment, returning new path
    #[inline]
    #[must_use]
    pub fn index(&self, index: usize) -> Self {
        self.child(Segment::Index(index))
    }

    /// Check if this path is a prefix of (or equal to) another
    ///
    /// Root tokens are ignored; only segments are compared.
    #[inline]
    #[must_use]
    pub fn is_prefix_of(&self, other: &Self) -> bool {
        other.segments.starts_with(&self.segments)
    }

    /// Check if this path is a strict ancestor of another
    #[inline]
    #[must_use]
    pub fn is_ancestor_of(&self, other: &Self) -> bool {
        self.segments.len() < other.segments.len() && self.is_prefix_of(other)
    }

    /// Iterator over segments from root to leaf
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &Segment> {
        self.segments.iter()
    }

    /// Display form (`{Root}.a.b[0]`)
    #[must_use]
    pub fn encode(&self) -> String {
        encode(self.root, &self.segments)
    }
}

impl Display for DocPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

impl FromStr for DocPath {
    type Err = PathSyntaxError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        decode(s)
    }
}

impl serde::Serialize for DocPath {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.encode())
    }
}

impl<'de> serde::Deserialize<'de> for DocPath {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        decode(&s).map_err(serde::de::Error::custom)
    }
}

/// Encode segments into display form
///
/// Key characters `\`, `.`, `[` and `]` are backslash-escaped.
#[must_use]
pub fn encode(root: RootToken, segments: &[Segment]) -> String {
    let mut out = String::from(root.as_str());
    for segment in segments {
        segment.write_display(&mut out);
    }
    out
}

/// Decode a display path
///
/// Digits are an index only inside brackets: `{Root}.0` is the key `"0"`.
///
/// # Errors
/// Returns [`PathSyntaxError`] for a missing root token, unbalanced
/// brackets, a non-numeric index, a stray character or a dangling escape.
pub fn decode(input: &str) -> Result<DocPath, PathSyntaxError> {
    let (root, rest) = if let Some(rest) = input.strip_prefix(OBJECT_ROOT) {
        (RootToken::Object, rest)
    } else if let Some(rest) = input.strip_prefix(ARRAY_ROOT) {
        (RootToken::Array, rest)
    } else {
        return Err(PathSyntaxError::MissingRoot {
            path: input.to_string(),
        });
    };

    let offset = input.len() - rest.len();
    let mut segments = Vec::new();
    let mut chars = rest.char_indices().peekable();

    while let Some((pos, ch)) = chars.next() {
        match ch {
            '.' => {
                let mut key = String::new();
                while let Some(&(at, c)) = chars.peek() {
                    match c {
                        '.' | '[' => break,
                        ']' => {
                            return Err(PathSyntaxError::UnexpectedChar {
                                path: input.to_string(),
                                position: offset + at,
                                found: c,
                            })
                        }
                        '\\' => {
                            chars.next();
                            let Some((_, escaped)) = chars.next() else {
                                return Err(PathSyntaxError::DanglingEscape {
                                    path: input.to_string(),
                                });
                            };
                            key.push(escaped);
                        }
                        _ => {
                            key.push(c);
                            chars.next();
                        }
                    }
                }
                segments.push(Segment::Key(key));
            }
            '[' => {
                let mut digits = String::new();
                let mut closed = false;
                for (_, c) in chars.by_ref() {
                    if c == ']' {
                        closed = true;
                        break;
                    }
                    digits.push(c);
                }
                if !closed {
                    return Err(PathSyntaxError::UnbalancedBracket {
                        path: input.to_string(),
                        position: offset + pos,
                    });
                }
                let index = parse_index(&digits).ok_or_else(|| PathSyntaxError::InvalidIndex {
                    path: input.to_string(),
                    index: digits.clone(),
                })?;
                segments.push(Segment::Index(index));
            }
            other => {
                return Err(PathSyntaxError::UnexpectedChar {
                    path: input.to_string(),
                    position: offset + pos,
                    found: other,
                })
            }
        }
    }

    Ok(DocPath::new(root, segments))
}

fn parse_index(digits: &str) -> Option<usize> {
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

/// Malformed display path
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PathSyntaxError {
    /// Path does not start with a root token
    #[error("path '{path}' does not start with '{{Root}}' or 'Root'")]
    MissingRoot { path: String },

    /// `[` without a matching `]`
    #[error("unbalanced bracket at byte {position} in path '{path}'")]
    UnbalancedBracket { path: String, position: usize },

    /// Bracket contents are not a non-negative integer
    #[error("invalid array index '{index}' in path '{path}'")]
    InvalidIndex { path: String, index: String },

    /// Character that cannot start or continue a segment
    #[error("unexpected '{found}' at byte {position} in path '{path}'")]
    UnexpectedChar {
        path: String,
        position: usize,
        found: char,
    },

    /// Trailing backslash
    #[error("path '{path}' ends with a dangling escape")]
    DanglingEscape { path: String },
}
