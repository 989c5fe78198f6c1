//! JSON codec for patch operations.
//!
//! A patch document is a list of objects
//! `{"op": "add"|"remove"|"replace"|"move", "path": …, "value"?: …, "from"?: …}`
//! with an optional `oldValue` on `remove`/`replace`.

use opslib_json_pointer::{format_json_pointer, parse_json_pointer};
use serde_json::{json, Map, Value};

use crate::error::OpsError;
use crate::json_patch::types::{EncodeOptions, Op, Path};

// ── Path helpers ──────────────────────────────────────────────────────────

fn encode_path(path: &[opslib_json_pointer::PathSegment]) -> Value {
    Value::String(format_json_pointer(path))
}

fn decode_path(op: &Map<String, Value>, field: &str, index: usize) -> Result<Path, OpsError> {
    let raw = op
        .get(field)
        .ok_or_else(|| OpsError::parse(format!("patch op {index}: missing \"{field}\"")))?;
    let s = raw
        .as_str()
        .ok_or_else(|| OpsError::parse(format!("patch op {index}: \"{field}\" must be a string")))?;
    parse_json_pointer(s).map_err(|e| OpsError::parse(format!("patch op {index}: {e}")))
}

fn decode_value(op: &Map<String, Value>, index: usize) -> Result<Value, OpsError> {
    op.get("value")
        .cloned()
        .ok_or_else(|| OpsError::parse(format!("patch op {index}: missing \"value\"")))
}

// ── Serialization ─────────────────────────────────────────────────────────

/// Serialize an `Op` in the patch document format.
pub fn to_json(op: &Op, options: &EncodeOptions) -> Value {
    match op {
        Op::Add { path, value } => json!({
            "op": "add",
            "path": encode_path(path),
            "value": value
        }),
        Op::Remove { path, old_value } => {
            let mut m = Map::new();
            m.insert("op".into(), json!("remove"));
            m.insert("path".into(), encode_path(path));
            if let (true, Some(ov)) = (options.include_old_values, old_value) {
                m.insert("oldValue".into(), ov.clone());
            }
            Value::Object(m)
        }
        Op::Replace { path, value, old_value } => {
            let mut m = Map::new();
            m.insert("op".into(), json!("replace"));
            m.insert("path".into(), encode_path(path));
            m.insert("value".into(), value.clone());
            if let (true, Some(ov)) = (options.include_old_values, old_value) {
                m.insert("oldValue".into(), ov.clone());
            }
            Value::Object(m)
        }
        Op::Move { from, path } => json!({
            "op": "move",
            "path": encode_path(path),
            "from": encode_path(from)
        }),
    }
}

/// Serialize a sequence of ops without prior values.
pub fn to_patch_document(ops: &[Op]) -> Value {
    to_patch_document_with(ops, &EncodeOptions::default())
}

pub fn to_patch_document_with(ops: &[Op], options: &EncodeOptions) -> Value {
    Value::Array(ops.iter().map(|op| to_json(op, options)).collect())
}

// ── Deserialization ───────────────────────────────────────────────────────

fn decode_op(v: &Value, index: usize) -> Result<Op, OpsError> {
    let m = v
        .as_object()
        .ok_or_else(|| OpsError::parse(format!("patch op {index}: must be an object")))?;
    let name = m
        .get("op")
        .and_then(Value::as_str)
        .ok_or_else(|| OpsError::parse(format!("patch op {index}: \"op\" must be a string")))?;
    let path = decode_path(m, "path", index)?;
    match name {
        "add" => Ok(Op::Add { path, value: decode_value(m, index)? }),
        "remove" => Ok(Op::Remove { path, old_value: m.get("oldValue").cloned() }),
        "replace" => Ok(Op::Replace {
            path,
            value: decode_value(m, index)?,
            old_value: m.get("oldValue").cloned(),
        }),
        "move" => Ok(Op::Move { from: decode_path(m, "from", index)?, path }),
        other => Err(OpsError::parse(format!("patch op {index}: unknown op {other:?}"))),
    }
}

/// Deserialize a single op.
pub fn from_json(v: &Value) -> Result<Op, OpsError> {
    decode_op(v, 0)
}

/// Deserialize a patch document.
///
/// # Errors
///
/// [`OpsError::Parse`] naming the offending op index when the document is not
/// a list of well-formed ops.
pub fn from_patch_document(doc: &Value) -> Result<Vec<Op>, OpsError> {
    let arr = doc
        .as_array()
        .ok_or_else(|| OpsError::parse("patch document must be a list"))?;
    arr.iter().enumerate().map(|(i, v)| decode_op(v, i)).collect()
}

// ── Tests ─────────────────────────────────────────────────────────────────
