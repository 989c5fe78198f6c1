//! Template substitution over value trees.
//!
//! String leaves may hold `${path}` placeholders, resolved against an ordered
//! list of context values (first context with a value at the path wins).
//!
//! - A leaf that is exactly one placeholder is replaced by the resolved value
//!   itself, keeping its type.
//! - A placeholder embedded in surrounding text is replaced by the resolved
//!   value's text: strings verbatim, anything else as compact JSON.
//! - `$${` renders a literal `${`.
//!
//! Substitution is a single pass: text produced by a substitution is never
//! scanned again.
//!
//! ```
//! use opslib_json::json_template::render;
//! use serde_json::json;
//!
//! let out = render(&json!({"msg": "Hello ${name}"}), &[json!({"name": "Ops"})]).unwrap();
//! assert_eq!(out, json!({"msg": "Hello Ops"}));
//! ```

pub mod expr;
pub mod functions;

use std::sync::OnceLock;

use opslib_json_pointer::{format_json_pointer, PathSegment};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::trace;

use crate::error::OpsError;
pub use expr::{parse_expression, resolve};
pub use functions::{FunctionError, FunctionRegistry, TemplateFn};

/// What to do with a placeholder no context can resolve.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaceholderPolicy {
    /// Fail with [`OpsError::UnresolvedPlaceholder`].
    #[default]
    Strict,
    /// Leave the placeholder text in place.
    Keep,
    /// Substitute the empty string.
    Blank,
}

impl std::str::FromStr for PlaceholderPolicy {
    type Err = OpsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "strict" => Ok(PlaceholderPolicy::Strict),
            "keep" => Ok(PlaceholderPolicy::Keep),
            "blank" => Ok(PlaceholderPolicy::Blank),
            other => Err(OpsError::argument(
                "policy",
                format!("expected strict, keep or blank, got {other:?}"),
            )),
        }
    }
}

fn placeholder_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\$\$\{|\$\{([^{}]*)\}").unwrap())
}

fn function_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\$<([A-Za-z_][A-Za-z0-9_]*)>$").unwrap())
}

// ── Renderer ──────────────────────────────────────────────────────────────

/// A configured render pass over one set of contexts.
#[derive(Debug, Clone, Copy)]
pub struct Renderer<'a> {
    contexts: &'a [Value],
    policy: PlaceholderPolicy,
    functions: Option<&'a FunctionRegistry>,
}

impl<'a> Renderer<'a> {
    pub fn new(contexts: &'a [Value]) -> Self {
        Self { contexts, policy: PlaceholderPolicy::Strict, functions: None }
    }

    pub fn with_policy(mut self, policy: PlaceholderPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Evaluate `{"$<Name>": args}` objects with these functions.
    pub fn with_functions(mut self, functions: &'a FunctionRegistry) -> Self {
        self.functions = Some(functions);
        self
    }

    /// Render `doc`. The input is not modified.
    pub fn render(&self, doc: &Value) -> Result<Value, OpsError> {
        self.walk(doc, &[])
    }

    fn walk(&self, value: &Value, path: &[PathSegment]) -> Result<Value, OpsError> {
        match value {
            Value::String(s) => self.render_str(s, path),
            Value::Array(items) => items
                .iter()
                .enumerate()
                .map(|(i, item)| self.walk(item, &child(path, PathSegment::Index(i))))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array),
            Value::Object(map) => {
                if let Some((name, args)) = self.function_call(map) {
                    return self.call(name, args, path);
                }
                let mut out = Map::new();
                for (key, item) in map {
                    let at = child(path, PathSegment::Key(key.clone()));
                    out.insert(key.clone(), self.walk(item, &at)?);
                }
                Ok(Value::Object(out))
            }
            other => Ok(other.clone()),
        }
    }

    fn function_call<'m>(&self, map: &'m Map<String, Value>) -> Option<(&'m str, &'m Value)> {
        self.functions?;
        if map.len() != 1 {
            return None;
        }
        let (key, args) = map.iter().next()?;
        let name = function_re().captures(key)?.get(1)?.as_str();
        Some((name, args))
    }

    fn call(&self, name: &str, args: &Value, path: &[PathSegment]) -> Result<Value, OpsError> {
        let Some(functions) = self.functions else {
            return Err(OpsError::Internal("function call without a registry".into()));
        };
        let key = format!("$<{name}>");
        let args = match self.walk(args, &child(path, PathSegment::Key(key)))? {
            Value::Array(items) => items,
            single => vec![single],
        };
        trace!(function = name, "calling template function");
        functions.call(name, &args, self.contexts).map_err(|e| OpsError::InvalidTemplate {
            location: format_json_pointer(path),
            message: e.to_string(),
        })
    }

    /// Replacement text for a placeholder no context resolves.
    fn unresolved(
        &self,
        placeholder: &str,
        raw: &str,
        path: &[PathSegment],
    ) -> Result<String, OpsError> {
        match self.policy {
            PlaceholderPolicy::Strict => Err(OpsError::UnresolvedPlaceholder {
                placeholder: placeholder.to_string(),
                location: format_json_pointer(path),
            }),
            PlaceholderPolicy::Keep => Ok(raw.to_string()),
            PlaceholderPolicy::Blank => Ok(String::new()),
        }
    }

    fn lookup(&self, expr: &str) -> Option<&'a Value> {
        resolve(self.contexts, &parse_expression(expr)?)
    }

    fn render_str(&self, s: &str, path: &[PathSegment]) -> Result<Value, OpsError> {
        let re = placeholder_re();

        // Whole-leaf placeholder: typed substitution.
        if let Some(caps) = re.captures(s) {
            if let (Some(whole), Some(expr)) = (caps.get(0), caps.get(1)) {
                if whole.start() == 0 && whole.end() == s.len() {
                    return match self.lookup(expr.as_str()) {
                        Some(v) => Ok(v.clone()),
                        None => self.unresolved(expr.as_str(), s, path).map(Value::String),
                    };
                }
            }
        }

        let mut out = String::with_capacity(s.len());
        let mut last = 0;
        for caps in re.captures_iter(s) {
            let Some(whole) = caps.get(0) else { continue };
            out.push_str(&s[last..whole.start()]);
            last = whole.end();
            match caps.get(1) {
                None => out.push_str("${"),
                Some(expr) => match self.lookup(expr.as_str()) {
                    Some(Value::String(text)) => out.push_str(text),
                    Some(v) => out.push_str(&v.to_string()),
                    None => out.push_str(&self.unresolved(expr.as_str(), whole.as_str(), path)?),
                },
            }
        }
        out.push_str(&s[last..]);
        Ok(Value::String(out))
    }
}

fn child(path: &[PathSegment], segment: PathSegment) -> Vec<PathSegment> {
    let mut p = path.to_vec();
    p.push(segment);
    p
}

// ── Public API ────────────────────────────────────────────────────────────

/// Render with the strict policy and no functions.
pub fn render(doc: &Value, contexts: &[Value]) -> Result<Value, OpsError> {
    Renderer::new(contexts).render(doc)
}

pub fn render_with(
    doc: &Value,
    contexts: &[Value],
    policy: PlaceholderPolicy,
) -> Result<Value, OpsError> {
    Renderer::new(contexts).with_policy(policy).render(doc)
}

/// Placeholder expressions reachable in `doc`, in document order.
pub fn placeholders(doc: &Value) -> Vec<String> {
    fn collect(value: &Value, out: &mut Vec<String>) {
        match value {
            Value::String(s) => out.extend(
                placeholder_re()
                    .captures_iter(s)
                    .filter_map(|c| c.get(1))
                    .map(|m| m.as_str().to_string()),
            ),
            Value::Array(items) => items.iter().for_each(|v| collect(v, out)),
            Value::Object(map) => map.values().for_each(|v| collect(v, out)),
            _ => {}
        }
    }
    let mut out = Vec::new();
    collect(doc, &mut out);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn embedded_placeholder_is_stringified() {
        let out = render(&json!({"msg": "Hello ${name}"}), &[json!({"name": "Ops"})]).unwrap();
        assert_eq!(out, json!({"msg": "Hello Ops"}));
    }

    #[test]
    fn whole_leaf_keeps_type() {
        let out = render(&json!({"v": "${x}"}), &[json!({"x": {"n": 1}})]).unwrap();
        assert_eq!(out, json!({"v": {"n": 1}}));
        let ctx = [json!({"n": 12, "b": false, "z": null})];
        let out = render(&json!(["${n}", "${b}", "${z}"]), &ctx).unwrap();
        assert_eq!(out, json!([12, false, null]));
    }

    #[test]
    fn embedded_non_strings_use_compact_json() {
        let ctx = [json!({"n": 12, "o": {"a": 1}, "l": [1, "x"], "z": null, "t": true})];
        let out = render(&json!("${n}|${o}|${l}|${z}|${t}"), &ctx).unwrap();
        assert_eq!(out, json!(r#"12|{"a":1}|[1,"x"]|null|true"#));
    }

    #[test]
    fn contexts_are_searched_in_order() {
        let ctx = [json!({"env": "prod"}), json!({"env": "dev", "region": "us-east-1"})];
        let out = render(&json!("${env}/${region}"), &ctx).unwrap();
        assert_eq!(out, json!("prod/us-east-1"));
    }

    #[test]
    fn nested_paths_and_indices() {
        let ctx = [json!({"servers": [{"host": "a"}, {"host": "b"}]})];
        let doc = json!({"h": "${servers[1].host}", "n": "${ servers[0].host }"});
        let out = render(&doc, &ctx).unwrap();
        assert_eq!(out, json!({"h": "b", "n": "a"}));
    }

    #[test]
    fn strict_reports_placeholder_and_location() {
        let doc = json!({"spec": {"items": ["ok", "x-${missing.key}"]}});
        let err = render(&doc, &[json!({})]).unwrap_err();
        assert_eq!(
            err,
            OpsError::UnresolvedPlaceholder {
                placeholder: "missing.key".into(),
                location: "/spec/items/1".into()
            }
        );
    }

    #[test]
    fn keep_and_blank_policies() {
        let doc = json!({"a": "${x}", "b": "pre-${x}-post", "c": "${y}"});
        let ctx = [json!({"y": 2})];
        assert_eq!(
            render_with(&doc, &ctx, PlaceholderPolicy::Keep).unwrap(),
            json!({"a": "${x}", "b": "pre-${x}-post", "c": 2})
        );
        assert_eq!(
            render_with(&doc, &ctx, PlaceholderPolicy::Blank).unwrap(),
            json!({"a": "", "b": "pre--post", "c": 2})
        );
    }

    #[test]
    fn malformed_expression_counts_as_unresolved() {
        let doc = json!("${a..b} ${}");
        assert!(matches!(
            render(&doc, &[json!({"a": 1})]),
            Err(OpsError::UnresolvedPlaceholder { .. })
        ));
        assert_eq!(render_with(&doc, &[], PlaceholderPolicy::Keep).unwrap(), doc);
    }

    #[test]
    fn escape_renders_literal_marker() {
        let out = render(&json!("cost: $${amount} for ${who}"), &[json!({"who": "me"})]).unwrap();
        assert_eq!(out, json!("cost: ${amount} for me"));
        assert_eq!(render(&json!("$${x}"), &[]).unwrap(), json!("${x}"));
    }

    #[test]
    fn substitution_is_single_pass() {
        let ctx = [json!({"a": "${b}", "b": "boom"})];
        assert_eq!(render(&json!("${a}"), &ctx).unwrap(), json!("${b}"));
        assert_eq!(render(&json!("x ${a}"), &ctx).unwrap(), json!("x ${b}"));
    }

    #[test]
    fn keys_and_non_string_leaves_are_untouched() {
        let doc = json!({"${k}": 1, "n": 2.5, "b": true, "z": null});
        assert_eq!(render(&doc, &[]).unwrap(), doc);
    }

    #[test]
    fn function_objects_need_a_registry() {
        let doc = json!({"id": {"$<Join>": ["-", ["i", "${suffix}"]]}});
        let ctx = [json!({"suffix": "0ab"})];
        assert_eq!(render(&doc, &ctx).unwrap(), json!({"id": {"$<Join>": ["-", ["i", "0ab"]]}}));

        let reg = FunctionRegistry::with_builtins();
        let out = Renderer::new(&ctx).with_functions(&reg).render(&doc).unwrap();
        assert_eq!(out, json!({"id": "i-0ab"}));
    }

    #[test]
    fn function_single_argument_and_errors() {
        let reg = FunctionRegistry::with_builtins();
        let r = Renderer::new(&[]).with_functions(&reg);
        assert_eq!(r.render(&json!({"$<Base64>": "hi"})).unwrap(), json!("aGk="));
        let err = r.render(&json!({"x": [{"$<Nope>": 1}]})).unwrap_err();
        assert_eq!(
            err,
            OpsError::InvalidTemplate {
                location: "/x/0".into(),
                message: "Nope: unknown function".into()
            }
        );
    }

    #[test]
    fn lists_placeholders() {
        let doc = json!({"a": "${x} $${y}", "b": ["${z.w}"]});
        assert_eq!(placeholders(&doc), ["x", "z.w"]);
    }

    #[test]
    fn policy_from_str() {
        assert_eq!("keep".parse::<PlaceholderPolicy>().unwrap(), PlaceholderPolicy::Keep);
        assert!("loose".parse::<PlaceholderPolicy>().is_err());
    }
}
