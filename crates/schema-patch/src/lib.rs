//! Schema patches: the JSON Patch dialect a schema editor emits on commit.
//!
//! # Operations
//!
//! Only the structural RFC 6902 operations are modelled: `add`, `remove`,
//! `replace` and `move`. Paths are JSON Pointers built from the literal
//! segments `properties` / `items` and property names.
//!
//! ```
//! use schema_patch::{apply_schema_patch, from_json_patch};
//! use serde_json::json;
//!
//! let schema = json!({
//!     "type": "object",
//!     "properties": {"field": {"type": "string", "default": ""}},
//!     "additionalProperties": false,
//!     "required": ["field"]
//! });
//! let ops = from_json_patch(&json!([
//!     {"op": "move", "from": "/properties/field", "path": "/properties/field2"}
//! ])).unwrap();
//! let out = apply_schema_patch(schema, &ops).unwrap();
//! assert_eq!(out["required"], json!(["field2"]));
//! ```

pub mod apply;
pub mod cli;
pub mod codec;
pub mod pointer;
pub mod types;

pub use apply::{apply_op, apply_patch, apply_schema_patch, normalize_required};
pub use codec::{from_json, from_json_patch, to_json, to_json_patch};
pub use pointer::{format_json_pointer, parse_json_pointer, Path, PathStep};
pub use types::{ApplyPatchOptions, Op, PatchError};
