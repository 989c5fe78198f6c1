//! Template functions: `{"$<Name>": args}` objects evaluated during render.

use std::fmt;
use std::sync::Arc;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use indexmap::IndexMap;
use opslib_json_pointer::{step, PathSegment};
use serde_json::Value;
use thiserror::Error;

/// A function call failed. The renderer reports it as an invalid template.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{name}: {message}")]
pub struct FunctionError {
    pub name: String,
    pub message: String,
}

impl FunctionError {
    pub fn new(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self { name: name.into(), message: message.into() }
    }

    fn invalid(name: &str, args: &[Value]) -> Self {
        Self::new(name, format!("invalid parameters {}", Value::Array(args.to_vec())))
    }
}

/// Arguments, then the render contexts in lookup order.
pub type TemplateFn = dyn Fn(&[Value], &[Value]) -> Result<Value, FunctionError> + Send + Sync;

/// Named template functions. Rendering only evaluates function objects when
/// a registry is supplied.
#[derive(Clone, Default)]
pub struct FunctionRegistry {
    functions: IndexMap<String, Arc<TemplateFn>>,
}

impl FunctionRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding `Join`, `Base64`, `Select`, `CSelect` and `Mapping`.
    pub fn with_builtins() -> Self {
        let mut reg = Self::new();
        reg.register("Join", join);
        reg.register("Base64", base64);
        reg.register("Select", |args, _| select(args, false));
        reg.register("CSelect", |args, _| select(args, true));
        reg.register("Mapping", mapping);
        reg
    }

    /// Add or replace a function.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        f: impl Fn(&[Value], &[Value]) -> Result<Value, FunctionError> + Send + Sync + 'static,
    ) -> &mut Self {
        self.functions.insert(name.into(), Arc::new(f));
        self
    }

    pub fn contains(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.functions.keys().map(String::as_str)
    }

    pub fn call(
        &self,
        name: &str,
        args: &[Value],
        contexts: &[Value],
    ) -> Result<Value, FunctionError> {
        let f = self
            .functions
            .get(name)
            .ok_or_else(|| FunctionError::new(name, "unknown function"))?;
        f(args, contexts)
    }
}

impl fmt::Debug for FunctionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.functions.keys()).finish()
    }
}

// ── Built-ins ─────────────────────────────────────────────────────────────

fn join(args: &[Value], _: &[Value]) -> Result<Value, FunctionError> {
    let [Value::String(delimiter), Value::Array(items)] = args else {
        return Err(FunctionError::invalid("Join", args));
    };
    let parts: Option<Vec<&str>> = items.iter().map(Value::as_str).collect();
    match parts {
        Some(parts) => Ok(Value::String(parts.join(delimiter.as_str()))),
        None => Err(FunctionError::invalid("Join", args)),
    }
}

fn base64(args: &[Value], _: &[Value]) -> Result<Value, FunctionError> {
    match args {
        [Value::String(s)] => Ok(Value::String(STANDARD.encode(s.as_bytes()))),
        _ => Err(FunctionError::invalid("Base64", args)),
    }
}

/// 1-based position from an integer or a numeric string.
fn position(v: &Value) -> Option<i64> {
    match v {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn select(args: &[Value], wrap: bool) -> Result<Value, FunctionError> {
    let name = if wrap { "CSelect" } else { "Select" };
    let (n, items) = match args {
        [n, Value::Array(items)] => match position(n) {
            Some(n) => (n, items),
            None => return Err(FunctionError::invalid(name, args)),
        },
        _ => return Err(FunctionError::invalid(name, args)),
    };
    if items.is_empty() {
        return Err(FunctionError::new(name, "empty list"));
    }
    let idx = if wrap {
        Some(n.saturating_sub(1).rem_euclid(items.len() as i64) as usize)
    } else {
        usize::try_from(n.saturating_sub(1)).ok().filter(|&i| i < items.len())
    };
    idx.map(|i| items[i].clone()).ok_or_else(|| {
        FunctionError::new(name, format!("position {n} out of range 1..={}", items.len()))
    })
}

fn mapping(args: &[Value], contexts: &[Value]) -> Result<Value, FunctionError> {
    let Some((Value::String(map_name), keys)) = args.split_first() else {
        return Err(FunctionError::invalid("Mapping", args));
    };
    let Some(map) = contexts.iter().find_map(|ctx| ctx.get(map_name.as_str())) else {
        return Ok(Value::Null);
    };
    keys.iter().try_fold(map, |cur, key| {
        let seg = match key {
            Value::String(s) => PathSegment::from(s.as_str()),
            Value::Number(n) => match n.as_u64() {
                Some(i) => PathSegment::Index(i as usize),
                None => return Err(FunctionError::invalid("Mapping", args)),
            },
            _ => return Err(FunctionError::invalid("Mapping", args)),
        };
        step(cur, &seg)
            .ok_or_else(|| FunctionError::new("Mapping", format!("{map_name}: no entry {key}")))
    })
    .cloned()
}
