//! JSON Patch diff: generate a minimal edit script between two value trees.
//!
//! `apply_patch(a, &diff(a, b)) == b` holds for every pair of values under
//! default options. Objects are compared key by key; lists are aligned (see
//! [`array`]) so that an unchanged element keeps its identity even when its
//! neighbours move.

mod array;

use std::fmt;
use std::sync::Arc;

use indexmap::IndexSet;
use serde_json::{Map, Value};
use tracing::debug;

use crate::json_patch::types::{Op, PathSegment};

// ── Options ───────────────────────────────────────────────────────────────

type MatchFn = dyn Fn(&Value, &Value) -> bool + Send + Sync;

/// Equality predicate used to align list elements.
#[derive(Clone, Default)]
pub enum ListAlign {
    /// Deep structural equality.
    #[default]
    Structural,
    /// Two objects match when both carry this key with equal values;
    /// anything else falls back to structural equality.
    ByKey(String),
    Custom(Arc<MatchFn>),
}

impl ListAlign {
    pub fn custom(f: impl Fn(&Value, &Value) -> bool + Send + Sync + 'static) -> Self {
        ListAlign::Custom(Arc::new(f))
    }

    pub fn matches(&self, a: &Value, b: &Value) -> bool {
        match self {
            ListAlign::Structural => a == b,
            ListAlign::ByKey(key) => match (a.get(key.as_str()), b.get(key.as_str())) {
                (Some(ka), Some(kb)) => ka == kb,
                _ => a == b,
            },
            ListAlign::Custom(f) => f(a, b),
        }
    }
}

impl fmt::Debug for ListAlign {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ListAlign::Structural => f.write_str("Structural"),
            ListAlign::ByKey(key) => f.debug_tuple("ByKey").field(key).finish(),
            ListAlign::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct DiffOptions {
    pub list_align: ListAlign,
    /// Object keys ignored at any depth.
    pub exclude: Vec<String>,
    /// Drop `add` ops on object keys.
    pub ignore_additions: bool,
}

impl DiffOptions {
    fn excludes(&self, key: &str) -> bool {
        self.exclude.iter().any(|k| k == key)
    }
}

// ── Public API ────────────────────────────────────────────────────────────

/// Generate the ops that transform `src` into `dst`.
pub fn diff(src: &Value, dst: &Value) -> Vec<Op> {
    diff_with(src, dst, &DiffOptions::default())
}

pub fn diff_with(src: &Value, dst: &Value, options: &DiffOptions) -> Vec<Op> {
    let mut ops = Vec::new();
    diff_at_path(&mut ops, &[], src, dst, options);
    debug!(ops = ops.len(), "computed diff");
    ops
}

// ── Core recursive differ ─────────────────────────────────────────────────

pub(crate) fn diff_at_path(
    ops: &mut Vec<Op>,
    path: &[PathSegment],
    src: &Value,
    dst: &Value,
    options: &DiffOptions,
) {
    if src == dst {
        return;
    }
    match (src, dst) {
        (Value::Object(s), Value::Object(d)) => diff_obj(ops, path, s, d, options),
        (Value::Array(s), Value::Array(d)) => array::diff_arr(ops, path, s, d, options),
        _ => ops.push(Op::Replace {
            path: path.to_vec(),
            value: dst.clone(),
            old_value: Some(src.clone()),
        }),
    }
}

fn diff_obj(
    ops: &mut Vec<Op>,
    path: &[PathSegment],
    src: &Map<String, Value>,
    dst: &Map<String, Value>,
    options: &DiffOptions,
) {
    let keys: IndexSet<&String> = src.keys().chain(dst.keys()).collect();
    for key in keys {
        if options.excludes(key) {
            continue;
        }
        let mut p = path.to_vec();
        p.push(PathSegment::Key(key.clone()));
        match (src.get(key), dst.get(key)) {
            (Some(s), Some(d)) => diff_at_path(ops, &p, s, d, options),
            (Some(s), None) => ops.push(Op::Remove { path: p, old_value: Some(s.clone()) }),
            (None, Some(d)) if !options.ignore_additions => {
                ops.push(Op::Add { path: p, value: d.clone() })
            }
            _ => {}
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────
