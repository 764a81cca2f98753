//! Schema tree editor.
//!
//! Edits a table's JSON schema as a tree of typed nodes, each holding a
//! committed and a draft copy of its attributes, and reports the draft as a
//! JSON-Patch list against the committed schema.
//!
//! ```
//! use schema_editor::SchemaEditor;
//! use serde_json::json;
//!
//! let mut editor = SchemaEditor::from_schema("posts", &json!({
//!     "type": "object",
//!     "properties": {"field": {"type": "string", "default": ""}},
//!     "additionalProperties": false,
//!     "required": ["field"]
//! })).unwrap();
//!
//! let field = editor.tree().find_property(editor.root(), "field").unwrap();
//! editor.set_id(field, "field2").unwrap();
//!
//! let patch = schema_patch::to_json_patch(&editor.patches());
//! assert_eq!(patch, json!([
//!     {"op": "move", "from": "/properties/field", "path": "/properties/field2"}
//! ]));
//! ```

pub mod editor;
pub mod error;
pub mod factory;
pub mod history;
pub mod node;
pub mod path;
pub mod system_schema;
pub mod tree;
pub mod value;

pub use editor::SchemaEditor;
pub use error::{EditorError, SchemaError};
pub use factory::{create_default_node, create_schema_node, get_committed_schema, get_schema, GetSchemaOptions};
pub use history::{Entry, PatchHistory, Replaced};
pub use node::{BooleanLeaf, Fields, Formula, Kind, NodeId, NodeKind, NumberLeaf, Overlay, Reference, SchemaNode, StringLeaf};
pub use path::{Ancestry, PathOptions, SequenceOptions, Step, StepKey, TreeView};
pub use system_schema::SystemSchemaId;
pub use tree::SchemaTree;
pub use value::{create_value_node, ValueNode};
