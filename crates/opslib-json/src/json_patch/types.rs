//! Core types for the JSON Patch module.

use opslib_json_pointer::format_json_pointer;
use serde_json::Value;
use thiserror::Error;

pub use opslib_json_pointer::{Path, PathSegment};

// ── Error ─────────────────────────────────────────────────────────────────

/// Why an operation could not be applied to the current tree.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConflictReason {
    #[error("NOT_FOUND")]
    NotFound,
    #[error("INVALID_INDEX")]
    InvalidIndex,
    #[error("INVALID_TARGET")]
    InvalidTarget,
    #[error("VALUE_MISMATCH: expected {expected}, found {actual}")]
    ValueMismatch { expected: Value, actual: Value },
    #[error("MOVE_INTO_SELF")]
    MoveIntoSelf,
}

/// An operation did not match the base tree it was applied to.
#[derive(Debug, Error, Clone, PartialEq)]
#[error("patch conflict: {op} at {:?}: {reason}", format_json_pointer(.path))]
pub struct PatchError {
    pub op: &'static str,
    pub path: Path,
    pub reason: ConflictReason,
}

impl PatchError {
    pub fn new(op: &'static str, path: &[PathSegment], reason: ConflictReason) -> Self {
        Self { op, path: path.to_vec(), reason }
    }
}

// ── Op enum ───────────────────────────────────────────────────────────────

/// One structural edit between two value trees.
///
/// `old_value` is the value expected at `path` before the edit. When present,
/// applying the op checks it and fails with [`ConflictReason::ValueMismatch`]
/// on a different base tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Op {
    Add {
        path: Path,
        value: Value,
    },
    Remove {
        path: Path,
        old_value: Option<Value>,
    },
    Replace {
        path: Path,
        value: Value,
        old_value: Option<Value>,
    },
    Move {
        from: Path,
        path: Path,
    },
}

impl Op {
    /// Returns the operation name used in patch documents.
    pub fn op_name(&self) -> &'static str {
        match self {
            Op::Add { .. } => "add",
            Op::Remove { .. } => "remove",
            Op::Replace { .. } => "replace",
            Op::Move { .. } => "move",
        }
    }

    /// Returns the target path of the operation.
    pub fn path(&self) -> &Path {
        match self {
            Op::Add { path, .. } => path,
            Op::Remove { path, .. } => path,
            Op::Replace { path, .. } => path,
            Op::Move { path, .. } => path,
        }
    }

    /// Drop the recorded prior values, leaving an op that applies unconditionally.
    pub fn without_old_value(self) -> Op {
        match self {
            Op::Remove { path, .. } => Op::Remove { path, old_value: None },
            Op::Replace { path, value, .. } => Op::Replace { path, value, old_value: None },
            other => other,
        }
    }
}

/// Options for [`to_patch_document_with`](crate::json_patch::to_patch_document_with).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EncodeOptions {
    /// Emit `oldValue` on `remove` and `replace` so the patch checks its base.
    pub include_old_values: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn op_names_and_paths() {
        let ops = [
            Op::Add { path: vec!["a".into()], value: json!(1) },
            Op::Remove { path: vec!["b".into()], old_value: None },
            Op::Replace { path: vec!["c".into()], value: json!(2), old_value: None },
            Op::Move { from: vec!["x".into()], path: vec!["d".into()] },
        ];
        let names: Vec<_> = ops.iter().map(Op::op_name).collect();
        assert_eq!(names, ["add", "remove", "replace", "move"]);
        assert_eq!(ops[3].path(), &vec![PathSegment::from("d")]);
    }

    #[test]
    fn patch_error_display() {
        let err = PatchError::new(
            "replace",
            &["a".into(), PathSegment::Index(0)],
            ConflictReason::ValueMismatch { expected: json!(1), actual: json!(2) },
        );
        assert_eq!(
            err.to_string(),
            "patch conflict: replace at \"/a/0\": VALUE_MISMATCH: expected 1, found 2"
        );
    }
}
