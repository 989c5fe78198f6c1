//! Human-readable change report.
//!
//! The report mirrors the shape of the compared trees. A changed leaf becomes
//! `{"---": old, "+++": new}`, a removed key `{"---": old}` and an added key
//! `{"+++": new}`. Lists are compared index by index, with indices as keys.
//! Unchanged subtrees are left out, so equal inputs give `{}`.

use serde_json::{json, Map, Value};

use crate::json_patch_diff::DiffOptions;

pub const OLD: &str = "---";
pub const NEW: &str = "+++";

/// Build the change report from `old` to `new`.
///
/// Honors `exclude` and `ignore_additions`; list alignment does not apply.
pub fn change_report(old: &Value, new: &Value, options: &DiffOptions) -> Value {
    compare(old, new, options).unwrap_or_else(|| Value::Object(Map::new()))
}

fn compare(old: &Value, new: &Value, options: &DiffOptions) -> Option<Value> {
    match (old, new) {
        (Value::Object(o), Value::Object(n)) => non_empty(compare_objects(o, n, options)),
        (Value::Array(o), Value::Array(n)) => non_empty(compare_lists(o, n, options)),
        _ if old == new => None,
        _ => Some(json!({ OLD: old, NEW: new })),
    }
}

fn non_empty(map: Map<String, Value>) -> Option<Value> {
    (!map.is_empty()).then_some(Value::Object(map))
}

fn compare_objects(
    old: &Map<String, Value>,
    new: &Map<String, Value>,
    options: &DiffOptions,
) -> Map<String, Value> {
    let mut out = Map::new();
    for (key, o) in old {
        if options.exclude.contains(key) {
            continue;
        }
        let entry = match new.get(key) {
            Some(n) => compare(o, n, options),
            None => Some(json!({ OLD: o })),
        };
        if let Some(entry) = entry {
            out.insert(key.clone(), entry);
        }
    }
    if !options.ignore_additions {
        for (key, n) in new {
            if !old.contains_key(key) && !options.exclude.contains(key) {
                out.insert(key.clone(), json!({ NEW: n }));
            }
        }
    }
    out
}

fn compare_lists(old: &[Value], new: &[Value], options: &DiffOptions) -> Map<String, Value> {
    let mut out = Map::new();
    for i in 0..old.len().max(new.len()) {
        let entry = match (old.get(i), new.get(i)) {
            (Some(o), Some(n)) => compare(o, n, options),
            (Some(o), None) => Some(json!({ OLD: o })),
            (None, Some(n)) if !options.ignore_additions => Some(json!({ NEW: n })),
            _ => None,
        };
        if let Some(entry) = entry {
            out.insert(i.to_string(), entry);
        }
    }
    out
}
