//! Operation descriptors: the declarative input contract of a command.
//!
//! A [`Descriptor`] names an operation and lists its [`Parameter`]s. It is
//! validated once at construction, so the generator and the dispatcher can
//! rely on unique names and well-typed defaults.

use std::fmt;
use std::str::FromStr;

use opslib_json::json_value::kind_name;
use opslib_json::{parse, OpsError};
use serde::{Deserialize, Serialize};
use serde_json::Value;

// ── Parameter types ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamType {
    #[default]
    #[serde(alias = "str")]
    String,
    #[serde(alias = "integer", alias = "long")]
    Int,
    #[serde(alias = "double")]
    Float,
    #[serde(alias = "boolean")]
    Bool,
    #[serde(alias = "array")]
    List,
    #[serde(alias = "dict", alias = "map")]
    Object,
}

impl ParamType {
    pub fn as_str(self) -> &'static str {
        match self {
            ParamType::String => "string",
            ParamType::Int => "int",
            ParamType::Float => "float",
            ParamType::Bool => "bool",
            ParamType::List => "list",
            ParamType::Object => "object",
        }
    }

    /// Whether `value` already has this type. Integers count as floats.
    pub fn accepts(self, value: &Value) -> bool {
        match self {
            ParamType::String => value.is_string(),
            ParamType::Int => value.is_i64() || value.is_u64(),
            ParamType::Float => value.is_number(),
            ParamType::Bool => value.is_boolean(),
            ParamType::List => value.is_array(),
            ParamType::Object => value.is_object(),
        }
    }

    /// Convert a raw flag value. Lists and objects are inline JSON text.
    pub fn coerce(self, raw: &str) -> Result<Value, String> {
        match self {
            ParamType::String => Ok(Value::String(raw.to_string())),
            ParamType::Int => raw
                .trim()
                .parse::<i64>()
                .map(Value::from)
                .map_err(|_| format!("expected an integer, got {raw:?}")),
            ParamType::Float => raw
                .trim()
                .parse::<f64>()
                .ok()
                .and_then(serde_json::Number::from_f64)
                .map(Value::Number)
                .ok_or_else(|| format!("expected a number, got {raw:?}")),
            ParamType::Bool => match raw {
                "true" => Ok(Value::Bool(true)),
                "false" => Ok(Value::Bool(false)),
                _ => Err(format!("expected true or false, got {raw:?}")),
            },
            ParamType::List | ParamType::Object => {
                let value = parse(raw).map_err(|e| e.to_string())?;
                if self.accepts(&value) {
                    Ok(value)
                } else {
                    Err(format!("expected a JSON {}, got {}", self.as_str(), kind_name(&value)))
                }
            }
        }
    }
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ParamType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "str" | "string" => Ok(ParamType::String),
            "int" | "integer" | "long" => Ok(ParamType::Int),
            "float" | "double" | "number" => Ok(ParamType::Float),
            "bool" | "boolean" => Ok(ParamType::Bool),
            "list" | "array" => Ok(ParamType::List),
            "dict" | "object" | "map" => Ok(ParamType::Object),
            other => Err(format!("unknown parameter type {other:?}")),
        }
    }
}

// ── Parameter ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Parameter {
    pub name: String,
    #[serde(rename = "type", default)]
    pub ty: ParamType,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    #[serde(default)]
    pub help: String,
    /// Element type of a list parameter.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<ParamType>,
    /// Allowed values of a scalar parameter. Empty means any.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub choices: Vec<Value>,
}

impl Parameter {
    pub fn new(name: impl Into<String>, ty: ParamType) -> Self {
        Parameter {
            name: name.into(),
            ty,
            required: false,
            default: None,
            help: String::new(),
            items: None,
            choices: Vec::new(),
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn with_default(mut self, default: Value) -> Self {
        self.default = Some(default);
        self
    }

    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = help.into();
        self
    }

    pub fn with_items(mut self, items: ParamType) -> Self {
        self.items = Some(items);
        self
    }

    pub fn with_choices<I, V>(mut self, choices: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.choices = choices.into_iter().map(Into::into).collect();
        self
    }

    /// `a, b or c`, for help and error text.
    pub fn choices_text(&self) -> String {
        let names: Vec<String> = self
            .choices
            .iter()
            .map(|c| c.as_str().map_or_else(|| c.to_string(), String::from))
            .collect();
        match names.split_last() {
            Some((last, rest)) if !rest.is_empty() => format!("{} or {last}", rest.join(", ")),
            _ => names.concat(),
        }
    }

    /// Full type check, including list elements.
    pub fn check(&self, value: &Value) -> Result<(), String> {
        if !self.ty.accepts(value) {
            return Err(format!("expected {}, got {}", self.ty, kind_name(value)));
        }
        if let (Some(items), Value::Array(elements)) = (self.items, value) {
            if let Some((i, bad)) = elements.iter().enumerate().find(|(_, v)| !items.accepts(v)) {
                return Err(format!("element {i}: expected {items}, got {}", kind_name(bad)));
            }
        }
        if !self.choices.is_empty() && !self.choices.contains(value) {
            return Err(format!("expected {}, got {value}", self.choices_text()));
        }
        Ok(())
    }
}

// ── Descriptor ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Descriptor {
    name: String,
    help: String,
    parameters: Vec<Parameter>,
}

impl Descriptor {
    pub fn new(
        name: impl Into<String>,
        help: impl Into<String>,
        parameters: Vec<Parameter>,
    ) -> Result<Self, OpsError> {
        let d = Descriptor { name: name.into(), help: help.into(), parameters };
        d.validate()?;
        Ok(d)
    }

    pub fn builder(name: impl Into<String>) -> DescriptorBuilder {
        DescriptorBuilder { name: name.into(), help: String::new(), parameters: Vec::new() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn help(&self) -> &str {
        &self.help
    }

    pub fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }

    pub fn parameter(&self, name: &str) -> Option<&Parameter> {
        self.parameters.iter().find(|p| p.name == name)
    }

    fn invalid(&self, message: impl Into<String>) -> OpsError {
        OpsError::Descriptor { name: self.name.clone(), message: message.into() }
    }

    fn validate(&self) -> Result<(), OpsError> {
        if !is_valid_name(&self.name) {
            return Err(self.invalid("operation name must be non-empty and use [A-Za-z0-9_-]"));
        }
        let mut seen = std::collections::HashSet::new();
        for p in &self.parameters {
            if !is_valid_name(&p.name) {
                return Err(self.invalid(format!("invalid parameter name {:?}", p.name)));
            }
            if p.name == "help" {
                return Err(self.invalid("parameter name 'help' is reserved"));
            }
            if !seen.insert(p.name.as_str()) {
                return Err(self.invalid(format!("duplicate parameter '{}'", p.name)));
            }
            let fail = |message: String| self.invalid(format!("parameter '{}': {message}", p.name));
            if p.items.is_some() && p.ty != ParamType::List {
                return Err(fail("items is only valid on a list".into()));
            }
            if !p.choices.is_empty() {
                if matches!(p.ty, ParamType::Bool | ParamType::List | ParamType::Object) {
                    return Err(fail("choices need a scalar type".into()));
                }
                if let Some(bad) = p.choices.iter().find(|c| !p.ty.accepts(c)) {
                    return Err(fail(format!("choice {bad} is not {}", p.ty)));
                }
            }
            if p.required && p.ty == ParamType::Bool {
                return Err(fail("a bool flag cannot be required".into()));
            }
            if let Some(default) = &p.default {
                if p.required {
                    return Err(fail("required with a default".into()));
                }
                p.check(default).map_err(|e| fail(format!("default {e}")))?;
            }
        }
        Ok(())
    }
}

fn is_valid_name(name: &str) -> bool {
    !name.is_empty()
        && !name.starts_with('-')
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

/// Direct declaration of a [`Descriptor`].
#[derive(Debug, Clone)]
pub struct DescriptorBuilder {
    name: String,
    help: String,
    parameters: Vec<Parameter>,
}

impl DescriptorBuilder {
    pub fn help(mut self, help: impl Into<String>) -> Self {
        self.help = help.into();
        self
    }

    pub fn param(mut self, parameter: Parameter) -> Self {
        self.parameters.push(parameter);
        self
    }

    pub fn build(self) -> Result<Descriptor, OpsError> {
        Descriptor::new(self.name, self.help, self.parameters)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn message(e: OpsError) -> String {
        match e {
            OpsError::Descriptor { message, .. } => message,
            other => panic!("unexpected {other:?}"),
        }
    }

    fn rejected(parameters: Vec<Parameter>) -> String {
        message(Descriptor::new("op", "", parameters).unwrap_err())
    }

    #[test]
    fn builder_keeps_parameter_order() {
        let d = Descriptor::builder("create-lb")
            .help("Create a load balancer")
            .param(Parameter::new("name", ParamType::String).required())
            .param(Parameter::new("port", ParamType::Int).with_default(json!(80)))
            .build()
            .unwrap();
        assert_eq!(d.name(), "create-lb");
        let names: Vec<_> = d.parameters().iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, ["name", "port"]);
        assert_eq!(d.parameter("port").unwrap().ty, ParamType::Int);
    }

    #[test]
    fn rejects_invalid_declarations() {
        let p = |n: &str| Parameter::new(n, ParamType::String);
        assert!(message(Descriptor::new("", "", vec![]).unwrap_err()).contains("operation name"));
        assert!(rejected(vec![p("a"), p("a")]).contains("duplicate"));
        assert!(rejected(vec![p("help")]).contains("reserved"));
        assert!(rejected(vec![p("a b")]).contains("invalid parameter name"));

        let bad_default = Parameter::new("n", ParamType::Int).with_default(json!("x"));
        assert!(rejected(vec![bad_default]).contains("default expected int"));

        let both = Parameter::new("n", ParamType::Int).required().with_default(json!(1));
        assert!(Descriptor::new("op", "", vec![both]).is_err());

        let flag = Parameter::new("force", ParamType::Bool).required();
        assert!(Descriptor::new("op", "", vec![flag]).is_err());

        let items = Parameter::new("n", ParamType::String).with_items(ParamType::Int);
        assert!(Descriptor::new("op", "", vec![items]).is_err());
    }

    #[test]
    fn coerce_raw_values() {
        assert_eq!(ParamType::Int.coerce("42").unwrap(), json!(42));
        assert_eq!(ParamType::Int.coerce("-3").unwrap(), json!(-3));
        assert!(ParamType::Int.coerce("4.5").is_err());
        assert_eq!(ParamType::Float.coerce("2.5").unwrap(), json!(2.5));
        assert!(ParamType::Float.coerce("nan").is_err());
        assert_eq!(ParamType::Bool.coerce("true").unwrap(), json!(true));
        assert_eq!(ParamType::List.coerce("[1, \"a\"]").unwrap(), json!([1, "a"]));
        assert!(ParamType::List.coerce("{\"a\": 1}").unwrap_err().contains("expected a JSON list"));
        assert_eq!(ParamType::Object.coerce("{\"a\": 1}").unwrap(), json!({"a": 1}));
        assert!(ParamType::Object.coerce("{").is_err());
        assert_eq!(ParamType::String.coerce("{").unwrap(), json!("{"));
    }

    #[test]
    fn list_items_are_checked() {
        let p = Parameter::new("ports", ParamType::List).with_items(ParamType::Int);
        assert!(p.check(&json!([80, 443])).is_ok());
        assert_eq!(p.check(&json!([80, "x"])).unwrap_err(), "element 1: expected int, got string");
        assert!(Parameter::new("r", ParamType::Float).check(&json!(3)).is_ok());
    }

    #[test]
    fn choices_restrict_values() {
        let p = Parameter::new("policy", ParamType::String)
            .with_choices(["strict", "keep", "blank"]);
        assert!(p.check(&json!("keep")).is_ok());
        assert_eq!(
            p.check(&json!("loose")).unwrap_err(),
            "expected strict, keep or blank, got \"loose\""
        );
        assert!(Descriptor::new("op", "", vec![p.clone().with_default(json!("keep"))]).is_ok());
        assert!(rejected(vec![p.with_default(json!("x"))]).contains("default"));

        let mixed = Parameter::new("n", ParamType::Int).with_choices([json!(1), json!("two")]);
        assert!(rejected(vec![mixed]).contains("choice \"two\""));
        let flag = Parameter::new("f", ParamType::Bool).with_choices([true]);
        assert!(Descriptor::new("op", "", vec![flag]).is_err());

        let doc = json!({"name": "size", "type": "int", "choices": [1, 2]});
        let p: Parameter = serde_json::from_value(doc).unwrap();
        assert_eq!(p.choices_text(), "1 or 2");
        assert!(p.check(&json!(3)).is_err());
    }

    #[test]
    fn type_names_and_aliases() {
        let aliases = [
            ("str", ParamType::String),
            ("long", ParamType::Int),
            ("double", ParamType::Float),
            ("boolean", ParamType::Bool),
            ("array", ParamType::List),
            ("map", ParamType::Object),
        ];
        for (s, t) in aliases {
            assert_eq!(s.parse::<ParamType>().unwrap(), t);
        }
        assert!("tuple".parse::<ParamType>().is_err());
        let p: Parameter = serde_json::from_value(json!({"name": "n", "type": "integer"})).unwrap();
        assert_eq!(p.ty, ParamType::Int);
        assert!(!p.required);
    }
}
