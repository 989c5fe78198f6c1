//! Descriptors from documentation comments written with Sphinx-style fields.
//!
//! ```text
//! Create a load balancer in front of a group.
//!
//! :command create-lb:
//! :param group: target group name
//! :param port: listener port
//! :type port: int, optional, default=80
//! :param tags: resource tags
//! :type tags: list[str], optional
//! ```
//!
//! The first paragraph is the help text. Parameters without a `:type` field
//! are strings, and a parameter is required unless it is `optional` or has a
//! default. Other fields (`:returns:`, `:raises X:`) are ignored.

use std::sync::OnceLock;

use indexmap::IndexMap;
use opslib_json::{parse, OpsError};
use regex::Regex;

use crate::descriptor::{Descriptor, ParamType, Parameter};

fn field_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^:([A-Za-z]+)(?:\s+([^:]*?))?\s*:\s*(.*)$").unwrap())
}

fn list_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(?:list|array)\s*(?:\[\s*(\w+)\s*\]|\s+of\s+(\w+))$").unwrap())
}

#[derive(Debug, Default)]
struct TypeSpec {
    ty: ParamType,
    items: Option<ParamType>,
    optional: bool,
    default: Option<String>,
}

pub fn from_doc_comment(text: &str) -> Result<Descriptor, OpsError> {
    let mut name: Option<String> = None;
    let mut help_lines: Vec<&str> = Vec::new();
    let mut help_done = false;
    let mut params: IndexMap<String, String> = IndexMap::new();
    let mut types: Vec<(String, String)> = Vec::new();

    for line in text.lines().map(str::trim) {
        match field_re().captures(line) {
            Some(caps) => {
                help_done = true;
                let arg = caps.get(2).map_or("", |m| m.as_str()).trim().to_string();
                let rest = caps[3].trim().to_string();
                match &caps[1] {
                    "command" => name = Some(arg),
                    "param" => {
                        params.insert(arg, rest);
                    }
                    "type" => types.push((arg, rest)),
                    _ => {}
                }
            }
            None if line.is_empty() => help_done |= !help_lines.is_empty(),
            None if !help_done => help_lines.push(line),
            None => {}
        }
    }

    let name = name.ok_or_else(|| OpsError::Descriptor {
        name: String::new(),
        message: "missing :command <name>: field".into(),
    })?;
    let invalid = |message: String| OpsError::Descriptor { name: name.clone(), message };

    let mut specs: IndexMap<String, TypeSpec> = IndexMap::new();
    for (param, spec) in types {
        if !params.contains_key(&param) {
            return Err(invalid(format!(":type for undeclared parameter '{param}'")));
        }
        let spec =
            parse_type_spec(&spec).map_err(|e| invalid(format!("parameter '{param}': {e}")))?;
        specs.insert(param, spec);
    }

    let mut parameters = Vec::with_capacity(params.len());
    for (param, help) in params {
        let spec = specs.shift_remove(&param).unwrap_or_default();
        let default = match spec.default {
            Some(text) => Some(parse(&text).map_err(|e| {
                invalid(format!("parameter '{param}': default is not JSON: {e}"))
            })?),
            None => None,
        };
        let required = !spec.optional && default.is_none() && spec.ty != ParamType::Bool;
        parameters.push(Parameter {
            name: param,
            ty: spec.ty,
            required,
            default,
            help,
            items: spec.items,
            choices: Vec::new(),
        });
    }

    Descriptor::new(name, help_lines.join(" "), parameters)
}

/// `T[, optional][, default=<json>]`. The default runs to the end of the
/// line, so it may contain commas.
fn parse_type_spec(spec: &str) -> Result<TypeSpec, String> {
    let (head, default) = match spec.find("default=") {
        Some(at) => (&spec[..at], Some(spec[at + "default=".len()..].trim().to_string())),
        None => (spec, None),
    };
    let mut out = TypeSpec { default, ..Default::default() };
    let mut tokens = head.split(',').map(str::trim).filter(|t| !t.is_empty());
    if let Some(ty) = tokens.next() {
        if let Some(caps) = list_re().captures(ty) {
            out.ty = ParamType::List;
            let items = caps.get(1).or_else(|| caps.get(2)).map_or("", |m| m.as_str());
            out.items = Some(items.parse()?);
        } else if ty == "optional" {
            out.optional = true;
        } else {
            out.ty = ty.parse()?;
        }
    }
    for token in tokens {
        match token {
            "optional" => out.optional = true,
            other => return Err(format!("unexpected {other:?} in type field")),
        }
    }
    Ok(out)
}
