//! JSON Patch: the edit-script model produced by the diff engine.
//!
//! # Operations
//!
//! `add`, `remove`, `replace` and `move`, with RFC 6901 paths. `remove` and
//! `replace` may carry the value they expect to find, which turns a patch
//! applied to the wrong base tree into a [`PatchError`] instead of silent
//! corruption.

pub mod types;
pub mod apply;
pub mod codec;

pub use types::{ConflictReason, EncodeOptions, Op, Path, PathSegment, PatchError};
pub use apply::{apply_op, apply_patch, can_apply};
pub use codec::json::{
    from_json, from_patch_document, to_json, to_patch_document, to_patch_document_with,
};
