//! Schema ⇄ node conversion.
//!
//! [`create_schema_node`] reads a JSON schema into the arena; [`get_schema`]
//! and [`get_committed_schema`] write a subtree back out. For any schema the
//! editor produces, reading then writing gives an equal value.

use serde_json::{json, Map, Number, Value};

use crate::error::SchemaError;
use crate::node::{BooleanLeaf, Formula, Kind, NodeId, NodeKind, NumberLeaf, Reference, StringLeaf};
use crate::system_schema::SystemSchemaId;
use crate::tree::SchemaTree;

const REF: &str = "$ref";
const FORMULA: &str = "x-formula";
const FOREIGN_KEY: &str = "foreignKey";

// ── Reading ───────────────────────────────────────────────────────────────

/// Builds a node (and its subtree) from `schema`. The result is submitted,
/// so it starts clean, and is not attached to any parent.
pub fn create_schema_node(tree: &mut SchemaTree, schema: &Value) -> Result<NodeId, SchemaError> {
    let node = build(tree, schema)?;
    tree.submit_changes(node);
    Ok(node)
}

fn build(tree: &mut SchemaTree, schema: &Value) -> Result<NodeId, SchemaError> {
    let obj = schema
        .as_object()
        .ok_or_else(|| SchemaError::UnknownSchemaType(schema.clone()))?;

    if let Some(reference) = obj.get(REF) {
        let schema_id = reference
            .as_str()
            .ok_or_else(|| SchemaError::InvalidSchema(format!("$ref must be a string, got {reference}")))?;
        return Ok(tree.alloc(Kind::Ref { schema_id: schema_id.to_string() }));
    }

    let ty = obj
        .get("type")
        .and_then(Value::as_str)
        .ok_or_else(|| SchemaError::UnknownSchemaType(schema.clone()))?;

    match ty {
        "object" => {
            let node = tree.alloc(Kind::Object { properties: Vec::new() });
            match obj.get("properties") {
                None => {}
                Some(Value::Object(props)) => {
                    for (name, child_schema) in props {
                        let child = build(tree, child_schema)?;
                        tree.node_mut(child).set_id(name.as_str());
                        tree.attach_property(node, child);
                    }
                }
                Some(other) => {
                    return Err(SchemaError::InvalidSchema(format!("properties must be an object, got {other}")))
                }
            }
            Ok(node)
        }
        "array" => {
            let items_schema = obj.get("items").ok_or(SchemaError::MissingItems)?;
            let items = build(tree, items_schema)?;
            let node = tree.alloc(Kind::Array { items: None });
            tree.set_items(node, items);
            Ok(node)
        }
        "string" => {
            let leaf = StringLeaf {
                default: match obj.get("default") {
                    None => String::new(),
                    Some(Value::String(s)) => s.clone(),
                    Some(other) => return Err(mismatch("string", other)),
                },
                format: read_string(obj, "format"),
                content_media_type: read_string(obj, "contentMediaType"),
                read_only: read_bool(obj, "readOnly"),
                formula: read_formula(obj)?,
                reference: read_string(obj, FOREIGN_KEY).map(|table_id| Reference { table_id }),
            };
            Ok(tree.alloc(Kind::String(leaf)))
        }
        "number" => {
            let leaf = NumberLeaf {
                default: match obj.get("default") {
                    None => Number::from(0),
                    Some(Value::Number(n)) => n.clone(),
                    Some(other) => return Err(mismatch("number", other)),
                },
                read_only: read_bool(obj, "readOnly"),
                formula: read_formula(obj)?,
            };
            Ok(tree.alloc(Kind::Number(leaf)))
        }
        "boolean" => {
            let leaf = BooleanLeaf {
                default: match obj.get("default") {
                    None => false,
                    Some(Value::Bool(b)) => *b,
                    Some(other) => return Err(mismatch("boolean", other)),
                },
                read_only: read_bool(obj, "readOnly"),
                formula: read_formula(obj)?,
            };
            Ok(tree.alloc(Kind::Boolean(leaf)))
        }
        _ => Err(SchemaError::UnknownSchemaType(schema.clone())),
    }
}

fn mismatch(expected: &'static str, value: &Value) -> SchemaError {
    SchemaError::TypeMismatch { expected, value: value.clone() }
}

fn read_string(obj: &Map<String, Value>, key: &str) -> Option<String> {
    obj.get(key).and_then(Value::as_str).map(str::to_string)
}

fn read_bool(obj: &Map<String, Value>, key: &str) -> bool {
    obj.get(key).and_then(Value::as_bool).unwrap_or(false)
}

fn read_formula(obj: &Map<String, Value>) -> Result<Option<Formula>, SchemaError> {
    match obj.get(FORMULA) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Object(f)) => {
            let expression = f
                .get("expression")
                .and_then(Value::as_str)
                .ok_or_else(|| SchemaError::InvalidSchema("x-formula requires an expression".into()))?;
            let version = f.get("version").and_then(Value::as_u64).unwrap_or(Formula::VERSION);
            Ok(Some(Formula { version, expression: expression.to_string() }))
        }
        Some(other) => Err(SchemaError::InvalidSchema(format!("x-formula must be an object, got {other}"))),
    }
}

/// Builds the default node offered by the "add field" menu.
pub fn create_default_node(tree: &mut SchemaTree, kind: NodeKind) -> NodeId {
    let node = match kind {
        NodeKind::Array => {
            let items = tree.alloc(Kind::empty(NodeKind::String));
            let node = tree.alloc(Kind::Array { items: None });
            tree.set_items(node, items);
            node
        }
        NodeKind::Ref => tree.alloc(Kind::Ref { schema_id: SystemSchemaId::File.urn().to_string() }),
        other => tree.alloc(Kind::empty(other)),
    };
    tree.submit_changes(node);
    node
}

// ── Writing ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default)]
pub struct GetSchemaOptions {
    /// Emit Objects with no properties.
    pub skip_object_properties: bool,
    /// Leave out properties that were moved in from another parent during
    /// the current session.
    pub skip_moved_between_parents_nodes: bool,
}

#[derive(Clone, Copy, PartialEq)]
enum Side {
    Draft,
    Committed,
}

struct Writer<'a, F> {
    tree: &'a SchemaTree,
    side: Side,
    skip_object_properties: bool,
    skip: F,
}

impl<F: Fn(NodeId) -> bool> Writer<'_, F> {
    fn kind(&self, node: NodeId) -> &Kind {
        match self.side {
            Side::Draft => self.tree[node].draft_kind(),
            Side::Committed => self.tree[node].kind(),
        }
    }

    fn name(&self, node: NodeId) -> &str {
        match self.side {
            Side::Draft => self.tree[node].draft_id(),
            Side::Committed => self.tree[node].id(),
        }
    }

    fn write(&self, node: NodeId) -> Value {
        match self.kind(node) {
            Kind::Object { properties } => {
                let mut props = Map::new();
                if !self.skip_object_properties {
                    for &child in properties.iter().filter(|&&c| !(self.skip)(c)) {
                        props.insert(self.name(child).to_string(), self.write(child));
                    }
                }
                let required: Vec<Value> = props.keys().cloned().map(Value::String).collect();
                json!({
                    "type": "object",
                    "properties": props,
                    "additionalProperties": false,
                    "required": required
                })
            }
            Kind::Array { items } => {
                let mut out = Map::new();
                out.insert("type".into(), json!("array"));
                if let Some(items) = items {
                    out.insert("items".into(), self.write(*items));
                }
                Value::Object(out)
            }
            Kind::String(leaf) => {
                let mut out = Map::new();
                out.insert("type".into(), json!("string"));
                out.insert("default".into(), json!(leaf.default));
                if let Some(reference) = &leaf.reference {
                    out.insert(FOREIGN_KEY.into(), json!(reference.table_id));
                }
                if let Some(format) = &leaf.format {
                    out.insert("format".into(), json!(format));
                }
                if let Some(media) = &leaf.content_media_type {
                    out.insert("contentMediaType".into(), json!(media));
                }
                write_common(&mut out, leaf.read_only, leaf.formula.as_ref());
                Value::Object(out)
            }
            Kind::Number(leaf) => {
                let mut out = Map::new();
                out.insert("type".into(), json!("number"));
                out.insert("default".into(), Value::Number(leaf.default.clone()));
                write_common(&mut out, leaf.read_only, leaf.formula.as_ref());
                Value::Object(out)
            }
            Kind::Boolean(leaf) => {
                let mut out = Map::new();
                out.insert("type".into(), json!("boolean"));
                out.insert("default".into(), json!(leaf.default));
                write_common(&mut out, leaf.read_only, leaf.formula.as_ref());
                Value::Object(out)
            }
            Kind::Ref { schema_id } => json!({ "$ref": schema_id }),
        }
    }
}

fn write_common(out: &mut Map<String, Value>, read_only: bool, formula: Option<&Formula>) {
    if read_only {
        out.insert("readOnly".into(), json!(true));
    }
    if let Some(formula) = formula {
        out.insert(FORMULA.into(), json!({"version": formula.version, "expression": formula.expression}));
    }
}

/// The draft schema of `node`'s subtree.
pub fn get_schema(tree: &SchemaTree, node: NodeId, options: &GetSchemaOptions) -> Value {
    let skip_moved = options.skip_moved_between_parents_nodes;
    Writer {
        tree,
        side: Side::Draft,
        skip_object_properties: options.skip_object_properties,
        skip: |child: NodeId| skip_moved && !tree.is_new(child) && tree[child].parent() != tree[child].draft_parent(),
    }
    .write(node)
}

/// The committed schema of `node`'s subtree.
pub fn get_committed_schema(tree: &SchemaTree, node: NodeId) -> Value {
    Writer { tree, side: Side::Committed, skip_object_properties: false, skip: |_: NodeId| false }.write(node)
}

/// The draft schema of `node`'s subtree without the children `skip` selects.
pub(crate) fn draft_schema_without(tree: &SchemaTree, node: NodeId, skip: impl Fn(NodeId) -> bool) -> Value {
    Writer { tree, side: Side::Draft, skip_object_properties: false, skip }.write(node)
}
