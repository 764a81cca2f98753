use serde_json::Value;
use thiserror::Error;

use crate::node::{NodeId, NodeKind};

/// Errors raised while reading schemas or building value trees from them.
#[derive(Debug, Error, PartialEq)]
pub enum SchemaError {
    #[error("unknown schema type: {0}")]
    UnknownSchemaType(Value),
    #[error("array schema without items")]
    MissingItems,
    #[error("invalid schema: {0}")]
    InvalidSchema(String),
    #[error("property not found: {0}")]
    PropertyNotFound(String),
    #[error("expected {expected} value, got {value}")]
    TypeMismatch { expected: &'static str, value: Value },
}

/// Contract violations of editor commands. The tree is left untouched when
/// a command returns one of these.
#[derive(Debug, Error, PartialEq)]
pub enum EditorError {
    #[error("unknown node {0}")]
    UnknownNode(NodeId),
    #[error("node {0} is not an object")]
    NotAnObject(NodeId),
    #[error("node {0} is not an array")]
    NotAnArray(NodeId),
    #[error("node {0} is not a string")]
    NotAString(NodeId),
    #[error("node {0} is not a primitive field")]
    NotALeaf(NodeId),
    #[error("node {0} is already attached")]
    AlreadyAttached(NodeId),
    #[error("node {0} is not attached")]
    NotAttached(NodeId),
    #[error("the root node cannot be removed or moved")]
    RootNotDetachable,
    #[error("array items of {0} can only be replaced")]
    ItemsNotDetachable(NodeId),
    #[error("property {name:?} already exists on {parent}")]
    DuplicateProperty { parent: NodeId, name: String },
    #[error("cannot move {0} into its own subtree")]
    Cycle(NodeId),
    #[error("invalid default for {kind} node: {value}")]
    InvalidDefault { kind: NodeKind, value: Value },
    #[error(transparent)]
    Schema(#[from] SchemaError),
}
