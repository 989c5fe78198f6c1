//! Pointer syntax checks.
//!
//! Patch documents arrive from files and other processes, so pointers are
//! checked before they are split: absolute form and well-formed `~` escapes.
//! There is no length or depth bound. Any path [`crate::format_json_pointer`]
//! produces must parse back.

use crate::JsonPointerError;

/// Check a pointer string without parsing it.
///
/// ```
/// use opslib_json_pointer::validate_json_pointer;
///
/// assert!(validate_json_pointer("").is_ok());
/// assert!(validate_json_pointer("/listeners/0/port").is_ok());
/// assert!(validate_json_pointer("listeners").is_err());
/// assert!(validate_json_pointer("/a~2b").is_err());
/// ```
pub fn validate_json_pointer(pointer: &str) -> Result<(), JsonPointerError> {
    if pointer.is_empty() {
        return Ok(());
    }
    if !pointer.starts_with('/') {
        return Err(JsonPointerError::PointerInvalid(pointer.to_string()));
    }
    let mut chars = pointer.chars();
    while let Some(c) = chars.next() {
        if c == '~' && !matches!(chars.next(), Some('0' | '1')) {
            return Err(JsonPointerError::BadEscape(pointer.to_string()));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{format_json_pointer, parse_json_pointer, PathSegment};

    #[test]
    fn escapes_must_be_complete() {
        assert!(validate_json_pointer("/a~0b/c~1d").is_ok());
        assert_eq!(
            validate_json_pointer("/tags/~"),
            Err(JsonPointerError::BadEscape("/tags/~".to_string()))
        );
        assert!(validate_json_pointer("/~x").is_err());
    }

    #[test]
    fn relative_pointers_are_rejected() {
        assert_eq!(
            validate_json_pointer("spec/replicas"),
            Err(JsonPointerError::PointerInvalid("spec/replicas".to_string()))
        );
    }

    #[test]
    fn long_and_deep_paths_parse_back() {
        let long = vec![PathSegment::Key("k~/".repeat(2000))];
        assert_eq!(parse_json_pointer(&format_json_pointer(&long)).unwrap(), long);

        let deep: Vec<PathSegment> = (0..1000).map(PathSegment::Index).collect();
        assert_eq!(parse_json_pointer(&format_json_pointer(&deep)).unwrap(), deep);
    }
}
