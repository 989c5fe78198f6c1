//! JSON Pointer (RFC 6901) utilities.
//!
//! Paths are sequences of [`PathSegment`]s, each either an object key or a
//! list index. Pointers are their `/`-delimited string form with `~` escaped
//! as `~0` and `/` as `~1`. The root path is the empty pointer `""`.
//!
//! # Example
//!
//! ```
//! use opslib_json_pointer::{format_json_pointer, get, parse_json_pointer, PathSegment};
//!
//! let path = parse_json_pointer("/foo/0").unwrap();
//! assert_eq!(path, vec![PathSegment::from("foo"), PathSegment::Index(0)]);
//! assert_eq!(format_json_pointer(&path), "/foo/0");
//!
//! let doc = serde_json::json!({"foo": [42]});
//! assert_eq!(get(&doc, &path), Some(&serde_json::json!(42)));
//! ```

use serde_json::Value;
use thiserror::Error;

pub mod types;
pub use types::{Path, PathSegment};

pub mod validate;
pub use validate::validate_json_pointer;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum JsonPointerError {
    #[error("pointer must be empty or start with '/': {0:?}")]
    PointerInvalid(String),
    #[error("'~' must be followed by '0' or '1' in {0:?}")]
    BadEscape(String),
    #[error("root path has no parent")]
    NoParent,
}

/// Unescapes a JSON Pointer path component.
///
/// `~1` is replaced with `/` and `~0` with `~`.
///
/// ```
/// use opslib_json_pointer::unescape_component;
///
/// assert_eq!(unescape_component("a~0b"), "a~b");
/// assert_eq!(unescape_component("c~1d"), "c/d");
/// assert_eq!(unescape_component("~01"), "~1");
/// ```
pub fn unescape_component(component: &str) -> String {
    if !component.contains('~') {
        return component.to_string();
    }
    // ~1 first, otherwise "~01" would decode to "/".
    component.replace("~1", "/").replace("~0", "~")
}

/// Escapes a JSON Pointer path component.
///
/// ```
/// use opslib_json_pointer::escape_component;
///
/// assert_eq!(escape_component("a~b"), "a~0b");
/// assert_eq!(escape_component("c/d"), "c~1d");
/// ```
pub fn escape_component(component: &str) -> String {
    if !component.contains('/') && !component.contains('~') {
        return component.to_string();
    }
    component.replace('~', "~0").replace('/', "~1")
}

/// Check if a string is a canonical non-negative list index (`0`, `12`, not `012`).
///
/// ```
/// use opslib_json_pointer::is_valid_index;
///
/// assert!(is_valid_index("0"));
/// assert!(is_valid_index("123"));
/// assert!(!is_valid_index("01"));
/// assert!(!is_valid_index("-1"));
/// assert!(!is_valid_index(""));
/// ```
pub fn is_valid_index(index: &str) -> bool {
    let bytes = index.as_bytes();
    if bytes.is_empty() || (bytes.len() > 1 && bytes[0] == b'0') {
        return false;
    }
    bytes.iter().all(|b| b.is_ascii_digit())
}

fn parse_segment(component: &str) -> PathSegment {
    if is_valid_index(component) {
        if let Ok(i) = component.parse::<usize>() {
            return PathSegment::Index(i);
        }
    }
    PathSegment::Key(unescape_component(component))
}

/// Parse a JSON Pointer string into a path.
///
/// Canonical decimal components become [`PathSegment::Index`]; everything
/// else becomes an unescaped [`PathSegment::Key`].
///
/// # Errors
///
/// Fails when the pointer is not empty and lacks a leading `/`, or holds a
/// `~` not followed by `0` or `1`.
pub fn parse_json_pointer(pointer: &str) -> Result<Path, JsonPointerError> {
    validate_json_pointer(pointer)?;
    if pointer.is_empty() {
        return Ok(Vec::new());
    }
    Ok(pointer[1..].split('/').map(parse_segment).collect())
}

/// Format a path as a JSON Pointer string. The root path formats as `""`.
pub fn format_json_pointer(path: &[PathSegment]) -> String {
    let mut out = String::new();
    for segment in path {
        out.push('/');
        out.push_str(&segment.to_string());
    }
    out
}

/// Check if `parent` is a strict prefix of `child`.
pub fn is_child(parent: &[PathSegment], child: &[PathSegment]) -> bool {
    parent.len() < child.len() && segments_match(parent, &child[..parent.len()])
}

/// Compare two paths step by step, treating `Index(3)` and `Key("3")` as equal.
pub fn segments_match(a: &[PathSegment], b: &[PathSegment]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x == y || x.as_key() == y.as_key())
}

/// Get the parent path of a given path.
///
/// # Errors
///
/// Returns [`JsonPointerError::NoParent`] for the root path.
pub fn parent(path: &[PathSegment]) -> Result<Path, JsonPointerError> {
    if path.is_empty() {
        return Err(JsonPointerError::NoParent);
    }
    Ok(path[..path.len() - 1].to_vec())
}

/// Look up one step below `val`.
pub fn step<'a>(val: &'a Value, segment: &PathSegment) -> Option<&'a Value> {
    match val {
        Value::Array(arr) => arr.get(segment.as_index()?),
        Value::Object(map) => map.get(&segment.as_key()),
        _ => None,
    }
}

/// Get a value from a JSON document by path.
///
/// Returns `None` if the path doesn't exist.
pub fn get<'a>(val: &'a Value, path: &[PathSegment]) -> Option<&'a Value> {
    path.iter().try_fold(val, step)
}

/// Get a mutable reference to a value in a JSON document by path.
pub fn get_mut<'a>(val: &'a mut Value, path: &[PathSegment]) -> Option<&'a mut Value> {
    let mut current = val;
    for segment in path {
        current = match current {
            Value::Array(arr) => arr.get_mut(segment.as_index()?)?,
            Value::Object(map) => map.get_mut(&segment.as_key())?,
            _ => return None,
        };
    }
    Some(current)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn key(k: &str) -> PathSegment {
        PathSegment::from(k)
    }

    #[test]
    fn test_unescape_component() {
        assert_eq!(unescape_component("foo"), "foo");
        assert_eq!(unescape_component("a~0b~1c"), "a~b/c");
        assert_eq!(unescape_component("~0~0"), "~~");
        assert_eq!(unescape_component("~1~1"), "//");
    }

    #[test]
    fn test_parse_root_and_empty_key() {
        assert_eq!(parse_json_pointer("").unwrap(), Vec::<PathSegment>::new());
        assert_eq!(parse_json_pointer("/").unwrap(), vec![key("")]);
    }

    #[test]
    fn test_parse_index_and_keys() {
        assert_eq!(
            parse_json_pointer("/a~1b/10/01/-").unwrap(),
            vec![key("a/b"), PathSegment::Index(10), key("01"), key("-")]
        );
    }

    #[test]
    fn test_format_roundtrip() {
        for pointer in ["", "/", "/a", "/a~0b/c~1d", "/x/0/y", "//"] {
            let path = parse_json_pointer(pointer).unwrap();
            assert_eq!(format_json_pointer(&path), pointer);
        }
    }

    #[test]
    fn test_parse_rejects_relative() {
        assert!(parse_json_pointer("a/b").is_err());
    }

    #[test]
    fn test_is_child() {
        let parent_path = vec![key("foo")];
        let child = vec![key("foo"), key("bar")];
        assert!(is_child(&parent_path, &child));
        assert!(!is_child(&child, &parent_path));
        assert!(!is_child(&child, &child));
        assert!(is_child(&[key("0")], &[PathSegment::Index(0), key("x")]));
    }

    #[test]
    fn test_parent() {
        assert_eq!(parent(&[key("a"), key("b")]).unwrap(), vec![key("a")]);
        assert_eq!(parent(&[]), Err(JsonPointerError::NoParent));
    }

    #[test]
    fn test_get_nested() {
        let doc = json!({"a": {"b": [10, {"c": true}]}});
        let path = parse_json_pointer("/a/b/1/c").unwrap();
        assert_eq!(get(&doc, &path), Some(&json!(true)));
        assert_eq!(get(&doc, &[]), Some(&doc));
    }

    #[test]
    fn test_get_numeric_object_key() {
        let doc = json!({"ports": {"80": "http"}});
        let path = parse_json_pointer("/ports/80").unwrap();
        assert_eq!(get(&doc, &path), Some(&json!("http")));
    }

    #[test]
    fn test_get_missing() {
        let doc = json!({"a": [1]});
        assert_eq!(get(&doc, &[key("z")]), None);
        assert_eq!(get(&doc, &[key("a"), PathSegment::Index(5)]), None);
        assert_eq!(get(&doc, &[key("a"), key("-")]), None);
        assert_eq!(get(&doc, &[key("a"), PathSegment::Index(0), key("x")]), None);
    }

    #[test]
    fn test_get_null_is_present() {
        let doc = json!({"a": null});
        assert_eq!(get(&doc, &[key("a")]), Some(&Value::Null));
    }

    #[test]
    fn test_get_mut() {
        let mut doc = json!({"a": [1, 2]});
        *get_mut(&mut doc, &[key("a"), PathSegment::Index(1)]).unwrap() = json!(5);
        assert_eq!(doc, json!({"a": [1, 5]}));
    }
}
