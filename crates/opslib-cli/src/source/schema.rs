//! Descriptors from JSON Schema objects.
//!
//! Only the top-level `properties` are mapped; each becomes one parameter.
//! An empty `name` falls back to the `title`, lowercased with every run of
//! other characters turned into `-` ("Create Bucket" is `create-bucket`).
//! `enum` becomes the parameter's choices.

use opslib_json::OpsError;
use serde_json::Value;

use crate::descriptor::{Descriptor, ParamType, Parameter};

pub fn from_json_schema(name: &str, schema: &Value) -> Result<Descriptor, OpsError> {
    let obj = schema.as_object().ok_or_else(|| OpsError::Descriptor {
        name: name.to_string(),
        message: "schema must be an object".into(),
    })?;
    let name = match (name, obj.get("title").and_then(Value::as_str)) {
        ("", Some(title)) => command_name(title),
        _ => name.to_string(),
    };
    let invalid = |message: String| OpsError::Descriptor { name: name.clone(), message };

    let help = obj
        .get("description")
        .or_else(|| obj.get("title"))
        .and_then(Value::as_str)
        .unwrap_or_default();
    let required: Vec<&str> = obj
        .get("required")
        .and_then(Value::as_array)
        .map(|r| r.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default();

    let mut parameters = Vec::new();
    if let Some(properties) = obj.get("properties") {
        let properties = properties
            .as_object()
            .ok_or_else(|| invalid("properties must be an object".into()))?;
        for (prop, spec) in properties {
            let ty = schema_type(spec).map_err(|e| invalid(format!("property '{prop}': {e}")))?;
            let mut p = Parameter::new(prop.clone(), ty);
            if let Some(help) = spec.get("description").and_then(Value::as_str) {
                p.help = help.to_string();
            }
            p.default = spec.get("default").cloned();
            if let Some(choices) = spec.get("enum").and_then(Value::as_array) {
                p.choices = choices.clone();
            }
            p.required =
                required.contains(&prop.as_str()) && p.default.is_none() && ty != ParamType::Bool;
            if ty == ParamType::List {
                if let Some(items) = spec.get("items") {
                    let items = schema_type(items)
                        .map_err(|e| invalid(format!("property '{prop}' items: {e}")))?;
                    p.items = Some(items);
                }
            }
            parameters.push(p);
        }
    }
    Descriptor::new(name.as_str(), help, parameters)
}

fn command_name(title: &str) -> String {
    let mut out = String::new();
    for word in title.split(|c: char| !(c.is_ascii_alphanumeric() || c == '_')) {
        if !word.is_empty() {
            if !out.is_empty() {
                out.push('-');
            }
            out.push_str(&word.to_ascii_lowercase());
        }
    }
    out
}

/// First non-null entry of `type`; a missing `type` is a string.
fn schema_type(spec: &Value) -> Result<ParamType, String> {
    let ty = match spec.get("type") {
        None => return Ok(ParamType::String),
        Some(Value::String(t)) => t.as_str(),
        Some(Value::Array(types)) => types
            .iter()
            .filter_map(Value::as_str)
            .find(|t| *t != "null")
            .unwrap_or("string"),
        Some(other) => return Err(format!("unsupported type {other}")),
    };
    match ty {
        "string" => Ok(ParamType::String),
        "integer" => Ok(ParamType::Int),
        "number" => Ok(ParamType::Float),
        "boolean" => Ok(ParamType::Bool),
        "array" => Ok(ParamType::List),
        "object" => Ok(ParamType::Object),
        other => Err(format!("unsupported type {other:?}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn maps_properties_in_order() {
        let schema = json!({
            "title": "Create bucket",
            "description": "Create a storage bucket",
            "type": "object",
            "properties": {
                "bucket": {"type": "string", "description": "bucket name"},
                "versioned": {"type": "boolean"},
                "replicas": {"type": "integer", "default": 2},
                "tags": {"type": "array", "items": {"type": "string"}},
                "owner": {"type": ["null", "object"]}
            },
            "required": ["bucket", "replicas"]
        });
        let d = from_json_schema("create-bucket", &schema).unwrap();
        assert_eq!(d.help(), "Create a storage bucket");
        let names: Vec<_> = d.parameters().iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, ["bucket", "versioned", "replicas", "tags", "owner"]);

        let bucket = d.parameter("bucket").unwrap();
        assert!(bucket.required);
        assert_eq!(bucket.help, "bucket name");
        assert!(!d.parameter("replicas").unwrap().required);
        assert_eq!(d.parameter("tags").unwrap().items, Some(ParamType::String));
        assert_eq!(d.parameter("owner").unwrap().ty, ParamType::Object);
    }

    #[test]
    fn title_names_an_unnamed_operation() {
        let schema = json!({
            "title": "Create Bucket (v2)",
            "properties": {"acl": {"enum": ["private", "public-read"], "default": "private"}}
        });
        let d = from_json_schema("", &schema).unwrap();
        assert_eq!(d.name(), "create-bucket-v2");
        assert_eq!(d.help(), "Create Bucket (v2)");
        assert_eq!(d.parameter("acl").unwrap().choices, [json!("private"), json!("public-read")]);

        assert_eq!(from_json_schema("mk", &schema).unwrap().name(), "mk");
        assert!(from_json_schema("", &json!({"properties": {}})).is_err());
    }

    #[test]
    fn rejects_unsupported_shapes() {
        assert!(from_json_schema("x", &json!([])).is_err());
        let e =
            from_json_schema("x", &json!({"properties": {"a": {"type": "tuple"}}})).unwrap_err();
        assert!(e.to_string().contains("property 'a'"), "{e}");
        let bad_default = json!({"properties": {"n": {"type": "integer", "default": "one"}}});
        assert!(from_json_schema("x", &bad_default).is_err());
    }
}
