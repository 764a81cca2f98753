//! Core logic behind the `schema-patch` binary.

use serde_json::Value;
use thiserror::Error;

use crate::apply::{apply_patch, apply_schema_patch};
use crate::codec::from_json_patch;
use crate::types::{ApplyPatchOptions, PatchError};

#[derive(Debug, Error)]
pub enum CliError {
    #[error("{0}")]
    Json(#[from] serde_json::Error),
    #[error("{0}")]
    Patch(#[from] PatchError),
}

/// Apply a patch (JSON array string) to a document (JSON string).
///
/// With `schema_aware`, `required` lists are kept in step with `properties`.
/// Returns the patched document pretty-printed.
pub fn apply_json_patch(doc_json: &str, patch_json: &str, schema_aware: bool) -> Result<String, CliError> {
    let doc: Value = serde_json::from_str(doc_json)?;
    let ops = from_json_patch(&serde_json::from_str(patch_json)?)?;
    let out = if schema_aware {
        apply_schema_patch(doc, &ops)?
    } else {
        apply_patch(doc, &ops, &ApplyPatchOptions::default())?
    };
    Ok(serde_json::to_string_pretty(&out)?)
}
