//! JSON Patch apply logic.
//!
//! `apply_patch` never mutates its input: the document is cloned once and the
//! ops are applied to the clone in order.

use opslib_json_pointer::{get_mut, is_child, PathSegment};
use serde_json::Value;
use tracing::trace;

use super::types::{ConflictReason, Op, PatchError};

// ── Path navigation ───────────────────────────────────────────────────────

/// Mutable navigation to the container holding the last step of `path`.
fn parent_mut<'a>(
    doc: &'a mut Value,
    op: &'static str,
    path: &[PathSegment],
) -> Result<&'a mut Value, PatchError> {
    if path.is_empty() {
        return Err(PatchError::new(op, path, ConflictReason::InvalidTarget));
    }
    get_mut(doc, &path[..path.len() - 1])
        .ok_or_else(|| PatchError::new(op, path, ConflictReason::NotFound))
}

fn check_expected(
    op: &'static str,
    path: &[PathSegment],
    actual: &Value,
    expected: Option<&Value>,
) -> Result<(), PatchError> {
    match expected {
        Some(expected) if expected != actual => Err(PatchError::new(
            op,
            path,
            ConflictReason::ValueMismatch { expected: expected.clone(), actual: actual.clone() },
        )),
        _ => Ok(()),
    }
}

// ── Individual operation applicators ─────────────────────────────────────

fn apply_add(doc: &mut Value, path: &[PathSegment], value: Value) -> Result<(), PatchError> {
    const OP: &str = "add";
    if path.is_empty() {
        *doc = value;
        return Ok(());
    }
    let last = &path[path.len() - 1];
    match parent_mut(doc, OP, path)? {
        Value::Object(map) => {
            map.insert(last.as_key(), value);
            Ok(())
        }
        Value::Array(arr) => {
            if matches!(last, PathSegment::Key(k) if k == "-") {
                arr.push(value);
                return Ok(());
            }
            let idx = last
                .as_index()
                .ok_or_else(|| PatchError::new(OP, path, ConflictReason::InvalidIndex))?;
            if idx > arr.len() {
                return Err(PatchError::new(OP, path, ConflictReason::InvalidIndex));
            }
            arr.insert(idx, value);
            Ok(())
        }
        _ => Err(PatchError::new(OP, path, ConflictReason::InvalidTarget)),
    }
}

fn apply_remove(
    doc: &mut Value,
    op: &'static str,
    path: &[PathSegment],
    expected: Option<&Value>,
) -> Result<Value, PatchError> {
    let parent = parent_mut(doc, op, path)?;
    let last = &path[path.len() - 1];
    match parent {
        Value::Object(map) => {
            let key = last.as_key();
            let actual = map
                .get(&key)
                .ok_or_else(|| PatchError::new(op, path, ConflictReason::NotFound))?;
            check_expected(op, path, actual, expected)?;
            map.shift_remove(&key)
                .ok_or_else(|| PatchError::new(op, path, ConflictReason::NotFound))
        }
        Value::Array(arr) => {
            let idx = last
                .as_index()
                .ok_or_else(|| PatchError::new(op, path, ConflictReason::InvalidIndex))?;
            let actual = arr
                .get(idx)
                .ok_or_else(|| PatchError::new(op, path, ConflictReason::NotFound))?;
            check_expected(op, path, actual, expected)?;
            Ok(arr.remove(idx))
        }
        _ => Err(PatchError::new(op, path, ConflictReason::InvalidTarget)),
    }
}

fn apply_replace(
    doc: &mut Value,
    path: &[PathSegment],
    value: Value,
    expected: Option<&Value>,
) -> Result<(), PatchError> {
    const OP: &str = "replace";
    let target =
        get_mut(doc, path).ok_or_else(|| PatchError::new(OP, path, ConflictReason::NotFound))?;
    check_expected(OP, path, target, expected)?;
    *target = value;
    Ok(())
}

fn apply_move(
    doc: &mut Value,
    from: &[PathSegment],
    path: &[PathSegment],
) -> Result<(), PatchError> {
    const OP: &str = "move";
    if is_child(from, path) {
        return Err(PatchError::new(OP, path, ConflictReason::MoveIntoSelf));
    }
    let value = apply_remove(doc, OP, from, None)?;
    apply_add(doc, path, value).map_err(|e| PatchError { op: OP, ..e })
}

// ── Public API ────────────────────────────────────────────────────────────

/// Apply a single operation in place.
pub fn apply_op(doc: &mut Value, op: &Op) -> Result<(), PatchError> {
    match op {
        Op::Add { path, value } => apply_add(doc, path, value.clone()),
        Op::Remove { path, old_value } => {
            apply_remove(doc, "remove", path, old_value.as_ref()).map(|_| ())
        }
        Op::Replace { path, value, old_value } => {
            apply_replace(doc, path, value.clone(), old_value.as_ref())
        }
        Op::Move { from, path } => apply_move(doc, from, path),
    }
}

/// Apply `ops` in order to a copy of `doc`.
///
/// # Errors
///
/// Returns the first [`PatchError`]; the input document is left untouched.
pub fn apply_patch(doc: &Value, ops: &[Op]) -> Result<Value, PatchError> {
    let mut out = doc.clone();
    for (i, op) in ops.iter().enumerate() {
        trace!(index = i, op = op.op_name(), "applying patch op");
        apply_op(&mut out, op)?;
    }
    Ok(out)
}

/// Check whether every op would apply cleanly, without producing the result.
pub fn can_apply(doc: &Value, ops: &[Op]) -> bool {
    apply_patch(doc, ops).is_ok()
}

// ── Tests ─────────────────────────────────────────────────────────────────
