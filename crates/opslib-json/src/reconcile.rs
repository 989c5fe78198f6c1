//! Desired-versus-observed planning for managed resources.

use serde_json::Value;
use tracing::debug;

use crate::json_patch::Op;
use crate::json_patch_diff::{diff_with, DiffOptions};

/// Outcome of comparing a resource's desired state with what is deployed.
#[derive(Debug, Clone, PartialEq)]
pub struct Reconciliation {
    pub in_sync: bool,
    /// Ops that bring `observed` to `desired`.
    pub patch: Vec<Op>,
}

/// Diff `observed` against `desired`.
///
/// List the fields the service fills in on its own in `options.exclude`.
pub fn plan(desired: &Value, observed: &Value, options: &DiffOptions) -> Reconciliation {
    let patch = diff_with(observed, desired, options);
    debug!(ops = patch.len(), "reconciliation planned");
    Reconciliation { in_sync: patch.is_empty(), patch }
}
