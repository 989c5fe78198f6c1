//! Type definitions for JSON Pointer paths.

use std::fmt;

/// A step in a JSON Pointer path.
///
/// Either an object key or a list index. The distinction is advisory: an
/// `Index` step addressing an object is looked up as the key with the same
/// text, which is how a pointer such as `/tags/0` reaches `{"tags": {"0": …}}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PathSegment {
    Key(String),
    Index(usize),
}

impl PathSegment {
    /// Returns the textual form of the step, unescaped.
    pub fn as_key(&self) -> String {
        match self {
            PathSegment::Key(k) => k.clone(),
            PathSegment::Index(i) => i.to_string(),
        }
    }

    /// Returns the list index this step addresses, if it can address one.
    pub fn as_index(&self) -> Option<usize> {
        match self {
            PathSegment::Index(i) => Some(*i),
            PathSegment::Key(k) if crate::is_valid_index(k) => k.parse().ok(),
            PathSegment::Key(_) => None,
        }
    }
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathSegment::Key(k) => f.write_str(&crate::escape_component(k)),
            PathSegment::Index(i) => write!(f, "{i}"),
        }
    }
}

impl From<&str> for PathSegment {
    fn from(key: &str) -> Self {
        PathSegment::Key(key.to_string())
    }
}

impl From<String> for PathSegment {
    fn from(key: String) -> Self {
        PathSegment::Key(key)
    }
}

impl From<usize> for PathSegment {
    fn from(index: usize) -> Self {
        PathSegment::Index(index)
    }
}

/// A JSON Pointer path. The empty path is the document root.
pub type Path = Vec<PathSegment>;
