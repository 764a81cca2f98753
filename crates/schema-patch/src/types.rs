//! Core types for schema patches.

use serde_json::Value;
use thiserror::Error;

use crate::pointer::{format_json_pointer, Path};

// ── Error ─────────────────────────────────────────────────────────────────

#[derive(Debug, Error, PartialEq)]
pub enum PatchError {
    #[error("NOT_FOUND: {0}")]
    NotFound(String),
    #[error("INVALID_INDEX: {0}")]
    InvalidIndex(String),
    #[error("INVALID_TARGET: {0}")]
    InvalidTarget(String),
    #[error("INVALID_OP: {0}")]
    InvalidOp(String),
}

// ── Op enum ───────────────────────────────────────────────────────────────

/// A schema patch operation.
///
/// The editor only ever emits the four structural RFC 6902 operations; the
/// `path`/`from` pointers are stored parsed.
#[derive(Debug, Clone, PartialEq)]
pub enum Op {
    Add { path: Path, value: Value },
    Remove { path: Path },
    Replace { path: Path, value: Value },
    Move { from: Path, path: Path },
}

impl Op {
    /// Returns the RFC 6902 operation name.
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
            Op::Add { path, .. }
            | Op::Remove { path }
            | Op::Replace { path, .. }
            | Op::Move { path, .. } => path,
        }
    }

    /// Returns the source path of a `move`.
    pub fn from(&self) -> Option<&Path> {
        match self {
            Op::Move { from, .. } => Some(from),
            _ => None,
        }
    }

    /// Returns the value carried by `add` and `replace`.
    pub fn value(&self) -> Option<&Value> {
        match self {
            Op::Add { value, .. } | Op::Replace { value, .. } => Some(value),
            _ => None,
        }
    }

    /// The target path formatted as a JSON Pointer string.
    pub fn pointer(&self) -> String {
        format_json_pointer(self.path())
    }
}

impl std::fmt::Display for Op {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Op::Move { from, path } => write!(
                f,
                "move {} -> {}",
                format_json_pointer(from),
                format_json_pointer(path)
            ),
            op => write!(f, "{} {}", op.op_name(), op.pointer()),
        }
    }
}

// ── Apply options ─────────────────────────────────────────────────────────

/// Options for [`crate::apply_patch`].
#[derive(Debug, Clone, Default)]
pub struct ApplyPatchOptions {
    /// Keep each object schema's `required` list equal to its property keys
    /// after every operation that touches `.../properties/<name>`.
    pub sync_required: bool,
}
