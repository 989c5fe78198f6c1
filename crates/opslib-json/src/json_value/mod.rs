//! The JSON value model: parsing with configurable strictness and
//! canonical serialization.
//!
//! Values are `serde_json::Value` built with `preserve_order`, so objects keep
//! first-insertion key order and integers stay distinct from floats.

mod strict;

use serde::Deserialize;
use serde_json::Value;

use crate::error::OpsError;

/// Options for [`parse_with`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParseOptions {
    /// Reject objects that repeat a key. When false the last occurrence wins.
    pub strict_duplicate_keys: bool,
    /// Drop whole lines whose first non-blank character is `#`.
    pub allow_comments: bool,
}

/// Parse JSON text with default options (duplicate keys: last wins).
pub fn parse(text: &str) -> Result<Value, OpsError> {
    parse_with(text, &ParseOptions::default())
}

/// Parse JSON text.
///
/// # Errors
///
/// [`OpsError::Parse`] with line and column for malformed input, or for a
/// repeated key under `strict_duplicate_keys`.
pub fn parse_with(text: &str, options: &ParseOptions) -> Result<Value, OpsError> {
    let stripped;
    let text = if options.allow_comments {
        stripped = strip_comments(text);
        stripped.as_str()
    } else {
        text
    };
    if options.strict_duplicate_keys {
        let mut de = serde_json::Deserializer::from_str(text);
        let value = strict::StrictValue::deserialize(&mut de)?;
        de.end()?;
        Ok(value.0)
    } else {
        Ok(serde_json::from_str(text)?)
    }
}

/// Blank out `#` comment lines, keeping line numbering intact.
pub fn strip_comments(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for (i, line) in text.split('\n').enumerate() {
        if i > 0 {
            out.push('\n');
        }
        if !line.trim_start().starts_with('#') {
            out.push_str(line);
        }
    }
    out
}

/// Serialize a value. Compact output has no insignificant whitespace;
/// pretty output indents with two spaces. Key order is insertion order.
pub fn serialize(value: &Value, pretty: bool) -> String {
    if pretty {
        format!("{value:#}")
    } else {
        value.to_string()
    }
}

/// Name of the value's variant in the value model.
pub fn kind_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "object",
    }
}

/// True for null, bool, number and string.
pub fn is_scalar(value: &Value) -> bool {
    !matches!(value, Value::Array(_) | Value::Object(_))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parse_preserves_key_order() {
        let v = parse(r#"{"z":1,"a":2,"m":3}"#).unwrap();
        let keys: Vec<&str> = v.as_object().unwrap().keys().map(|k| k.as_str()).collect();
        assert_eq!(keys, ["z", "a", "m"]);
        assert_eq!(serialize(&v, false), r#"{"z":1,"a":2,"m":3}"#);
    }

    #[test]
    fn parse_keeps_int_and_float_distinct() {
        let v = parse("[1, 1.0, -7, 18446744073709551615]").unwrap();
        assert_ne!(v[0], v[1]);
        assert!(v[0].is_i64());
        assert!(v[1].is_f64());
        assert!(v[3].is_u64());
        assert_eq!(serialize(&v, false), "[1,1.0,-7,18446744073709551615]");
    }

    #[test]
    fn duplicate_keys_last_wins_by_default() {
        let v = parse(r#"{"a":1,"b":2,"a":3}"#).unwrap();
        assert_eq!(v, json!({"a": 3, "b": 2}));
        assert_eq!(serialize(&v, false), r#"{"a":3,"b":2}"#);
    }

    #[test]
    fn duplicate_keys_rejected_in_strict_mode() {
        let opts = ParseOptions { strict_duplicate_keys: true, ..Default::default() };
        let err = parse_with("{\"a\":1,\n\"a\":2}", &opts).unwrap_err();
        match err {
            OpsError::Parse { message, line, .. } => {
                assert!(message.contains("duplicate key \"a\""), "{message}");
                assert_eq!(line, 2);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn strict_mode_checks_nested_objects() {
        let opts = ParseOptions { strict_duplicate_keys: true, ..Default::default() };
        assert!(parse_with(r#"[{"x":{"k":1,"k":1}}]"#, &opts).is_err());
        assert_eq!(
            parse_with(r#"[{"x":{"k":1,"j":[true,null,"s",2.5]}}]"#, &opts).unwrap(),
            json!([{"x": {"k": 1, "j": [true, null, "s", 2.5]}}])
        );
    }

    #[test]
    fn malformed_input_fails() {
        for text in [r#"{"a": "unterminated}"#, "[1,2,]", r#"{"a":1,}"#, "", "[1] 2"] {
            assert!(matches!(parse(text), Err(OpsError::Parse { .. })), "{text:?}");
        }
        let strict = ParseOptions { strict_duplicate_keys: true, ..Default::default() };
        assert!(parse_with("[1] 2", &strict).is_err());
    }

    #[test]
    fn comments_are_stripped_when_allowed() {
        let text = "# header\n{\n  # inline\n  \"a\": 1\n}\n";
        assert!(parse(text).is_err());
        let opts = ParseOptions { allow_comments: true, ..Default::default() };
        assert_eq!(parse_with(text, &opts).unwrap(), json!({"a": 1}));
    }

    #[test]
    fn comment_stripping_keeps_line_numbers() {
        let opts = ParseOptions { allow_comments: true, ..Default::default() };
        match parse_with("# c\n# c\n{\"a\" 1}", &opts).unwrap_err() {
            OpsError::Parse { line, .. } => assert_eq!(line, 3),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn pretty_serialization() {
        let v = json!({"a": [1, {"b": null}]});
        assert_eq!(
            serialize(&v, true),
            "{\n  \"a\": [\n    1,\n    {\n      \"b\": null\n    }\n  ]\n}"
        );
    }

    #[test]
    fn kind_names() {
        assert_eq!(kind_name(&json!(null)), "null");
        assert_eq!(kind_name(&json!([1])), "list");
        assert_eq!(kind_name(&json!({})), "object");
        assert!(is_scalar(&json!("s")));
        assert!(!is_scalar(&json!([])));
    }
}
