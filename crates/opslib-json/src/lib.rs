//! opslib-json: structural diff, patch and template substitution over JSON
//! value trees, for configuration-driven infrastructure tooling.
//!
//! All operations are pure functions over immutable inputs; every failure is
//! an [`OpsError`] returned to the caller.

pub mod error;
pub mod json_value;
pub mod json_patch;
pub mod json_patch_diff;
pub mod json_template;
pub mod json_report;
pub mod reconcile;
pub mod config;

pub use config::{EngineConfig, ListAlignConfig, OutputFormat};
pub use error::{ErrorKind, OpsError};
pub use json_patch::{
    apply_patch, from_patch_document, to_patch_document, to_patch_document_with, EncodeOptions, Op,
};
pub use json_patch_diff::{diff, diff_with, DiffOptions, ListAlign};
pub use json_report::change_report;
pub use json_template::{render, render_with, FunctionRegistry, PlaceholderPolicy, Renderer};
pub use json_value::{parse, parse_with, serialize, ParseOptions};
pub use reconcile::{plan, Reconciliation};

pub use serde_json::Value;
