//! The root coordinator.
//!
//! [`SchemaEditor`] is the only place that mutates the tree. Every command
//! validates its arguments first, applies the edit to the draft state and
//! then reports it to the [`PatchHistory`]. A command that returns an error
//! leaves both untouched.

use schema_patch::pointer::format_json_pointer;
use schema_patch::Op;
use serde_json::Value;
use tracing::{debug, trace};

use crate::error::{EditorError, SchemaError};
use crate::factory::{self, GetSchemaOptions};
use crate::history::{PatchHistory, Replaced};
use crate::node::{Formula, Kind, NodeId, NodeKind, Reference, SchemaNode};
use crate::path::PathOptions;
use crate::tree::SchemaTree;
use crate::value::{create_value_node, ValueNode};

#[derive(Debug, Clone)]
pub struct SchemaEditor {
    tree: SchemaTree,
    history: PatchHistory,
}

impl SchemaEditor {
    /// An editor for a table with an empty object schema.
    pub fn new(table_id: &str) -> Self {
        let mut tree = SchemaTree::empty();
        let root = factory::create_default_node(&mut tree, NodeKind::Object);
        Self::with_root(tree, root, table_id)
    }

    /// An editor for a table with the given schema.
    pub fn from_schema(table_id: &str, schema: &Value) -> Result<Self, EditorError> {
        let mut tree = SchemaTree::empty();
        let root = factory::create_schema_node(&mut tree, schema)?;
        Ok(Self::with_root(tree, root, table_id))
    }

    fn with_root(mut tree: SchemaTree, root: NodeId, table_id: &str) -> Self {
        tree.node_mut(root).set_id(table_id);
        tree.set_root(root);
        tree.submit_changes(root);
        debug!(table_id, nodes = tree.len(), "editor: loaded");
        Self { tree, history: PatchHistory::new() }
    }

    // ── Queries ───────────────────────────────────────────────────────────

    pub fn tree(&self) -> &SchemaTree {
        &self.tree
    }

    pub fn root(&self) -> NodeId {
        self.tree.root()
    }

    pub fn history(&self) -> &PatchHistory {
        &self.history
    }

    pub fn node(&self, node: NodeId) -> Result<&SchemaNode, EditorError> {
        self.tree.get(node).ok_or(EditorError::UnknownNode(node))
    }

    /// Draft schema of the whole table.
    pub fn schema(&self) -> Value {
        factory::get_schema(&self.tree, self.root(), &GetSchemaOptions::default())
    }

    pub fn committed_schema(&self) -> Value {
        factory::get_committed_schema(&self.tree, self.root())
    }

    /// Draft schema of one subtree.
    pub fn schema_of(&self, node: NodeId, options: &GetSchemaOptions) -> Result<Value, EditorError> {
        self.node(node)?;
        Ok(factory::get_schema(&self.tree, node, options))
    }

    pub fn is_valid(&self) -> bool {
        self.tree.is_valid(self.root())
    }

    pub fn is_dirty(&self) -> bool {
        self.tree.is_dirty(self.root())
    }

    /// JSON Pointer of `node` in the draft schema.
    pub fn json_path(&self, node: NodeId) -> Result<String, EditorError> {
        self.node(node)?;
        Ok(format_json_pointer(&self.tree.json_path_by_node(node, PathOptions::draft())))
    }

    /// Row value shaped by the draft schema, with defaults for missing data.
    pub fn create_value(&self, raw: Option<&Value>) -> Result<ValueNode, SchemaError> {
        create_value_node(&self.schema(), raw)
    }

    // ── Session ───────────────────────────────────────────────────────────

    /// Patches that turn the committed schema into the draft schema.
    pub fn patches(&self) -> Vec<Op> {
        self.history.patches(&self.tree)
    }

    /// Makes the draft the new committed state and returns the patches that
    /// describe the step.
    pub fn submit_changes(&mut self) -> Vec<Op> {
        let ops = self.patches();
        let root = self.root();
        self.tree.submit_changes(root);
        self.history.reset();
        debug!(ops = ops.len(), "editor: submitted");
        ops
    }

    /// Discards every draft change.
    pub fn reset_changes(&mut self) {
        let root = self.root();
        self.tree.reset_changes(root);
        self.history.reset();
        debug!("editor: reset");
    }

    // ── Node creation ─────────────────────────────────────────────────────

    /// A detached node built from `schema`, ready for `add_property` or
    /// `replace`.
    pub fn create_node(&mut self, schema: &Value) -> Result<NodeId, EditorError> {
        Ok(factory::create_schema_node(&mut self.tree, schema)?)
    }

    pub fn create_default_node(&mut self, kind: NodeKind) -> NodeId {
        factory::create_default_node(&mut self.tree, kind)
    }

    // ── Validation ────────────────────────────────────────────────────────

    fn attached(&self, node: NodeId) -> Result<&SchemaNode, EditorError> {
        let n = self.node(node)?;
        if !self.tree.is_attached(node) {
            return Err(EditorError::NotAttached(node));
        }
        Ok(n)
    }

    fn detached(&self, node: NodeId) -> Result<&SchemaNode, EditorError> {
        let n = self.node(node)?;
        if node == self.root() || self.tree.is_linked(node) {
            return Err(EditorError::AlreadyAttached(node));
        }
        Ok(n)
    }

    fn attached_object(&self, node: NodeId) -> Result<(), EditorError> {
        if !self.attached(node)?.draft_kind().is_object() {
            return Err(EditorError::NotAnObject(node));
        }
        Ok(())
    }

    /// The Object parent of an attached, non-root property.
    fn property_parent(&self, node: NodeId) -> Result<NodeId, EditorError> {
        if node == self.root() {
            return Err(EditorError::RootNotDetachable);
        }
        let parent = self.attached(node)?.draft_parent().ok_or(EditorError::NotAttached(node))?;
        if self.tree[parent].draft_kind().is_array() {
            return Err(EditorError::ItemsNotDetachable(parent));
        }
        Ok(parent)
    }

    fn name_free(&self, parent: NodeId, name: &str, except: Option<NodeId>) -> Result<(), EditorError> {
        match self.tree.find_property(parent, name) {
            Some(existing) if Some(existing) != except => {
                Err(EditorError::DuplicateProperty { parent, name: name.to_string() })
            }
            _ => Ok(()),
        }
    }

    // ── Structural commands ───────────────────────────────────────────────

    /// Attaches a detached `node` to the Object `parent` under its draft id.
    pub fn add_property(&mut self, parent: NodeId, node: NodeId) -> Result<(), EditorError> {
        self.attached_object(parent)?;
        let name = self.detached(node)?.draft_id().to_string();
        self.name_free(parent, &name, None)?;

        self.tree.attach_property(parent, node);
        self.history.add(&self.tree, node);
        trace!(%parent, %node, name = %name, "editor: add property");
        Ok(())
    }

    /// Detaches a property from its Object parent.
    pub fn remove(&mut self, node: NodeId) -> Result<(), EditorError> {
        self.property_parent(node)?;
        self.tree.detach(node);
        self.history.remove(&self.tree, node);
        trace!(%node, "editor: remove");
        Ok(())
    }

    /// Replaces the attached `previous` with the detached `next`. The result
    /// keeps `previous`'s identity, name and position and takes `next`'s
    /// payload; `next` is spent. Returns the surviving node.
    pub fn replace(&mut self, previous: NodeId, next: NodeId) -> Result<NodeId, EditorError> {
        self.attached(previous)?;
        self.detached(next)?;

        let replaced = Replaced {
            node: previous,
            previous: self.tree[previous].draft_node_kind(),
            previous_descendants: self.tree.draft_descendants(previous),
        };
        self.tree.transplant(previous, next);
        self.history.replace(&self.tree, replaced);
        trace!(%previous, %next, "editor: replace");
        Ok(previous)
    }

    /// Replaces the property `name` of the Object `parent`.
    pub fn replace_property(&mut self, parent: NodeId, name: &str, next: NodeId) -> Result<NodeId, EditorError> {
        self.attached_object(parent)?;
        let previous = self
            .tree
            .find_property(parent, name)
            .ok_or_else(|| SchemaError::PropertyNotFound(name.to_string()))?;
        self.replace(previous, next)
    }

    /// Replaces the items node of `array`.
    pub fn replace_items(&mut self, array: NodeId, next: NodeId) -> Result<NodeId, EditorError> {
        let items = match self.attached(array)?.draft_kind() {
            Kind::Array { items: Some(items) } => *items,
            _ => return Err(EditorError::NotAnArray(array)),
        };
        self.replace(items, next)
    }

    /// Replaces `node` with a default node of another kind.
    pub fn change_type(&mut self, node: NodeId, kind: NodeKind) -> Result<NodeId, EditorError> {
        self.attached(node)?;
        let next = self.create_default_node(kind);
        self.replace(node, next)
    }

    /// Moves a property under another Object, keeping its name.
    pub fn move_node(&mut self, node: NodeId, new_parent: NodeId) -> Result<(), EditorError> {
        let parent = self.property_parent(node)?;
        self.attached_object(new_parent)?;
        if new_parent == node || self.tree.is_draft_ancestor(node, new_parent) {
            return Err(EditorError::Cycle(node));
        }
        if parent == new_parent {
            return Ok(());
        }
        self.name_free(new_parent, self.tree[node].draft_id(), None)?;

        self.tree.relocate(node, new_parent);
        self.history.move_node(&self.tree, node);
        trace!(%node, %new_parent, "editor: move");
        Ok(())
    }

    /// Renames a node. Renaming the root renames the table.
    pub fn set_id(&mut self, node: NodeId, id: &str) -> Result<(), EditorError> {
        if self.node(node)?.draft_id() == id {
            return Ok(());
        }
        let attached_property = node != self.root() && self.tree.is_attached(node);
        if attached_property {
            if let Some(parent) = self.tree[node].draft_parent() {
                self.name_free(parent, id, Some(node))?;
            }
        }

        self.tree.node_mut(node).set_id(id);
        if attached_property {
            self.history.rename(node);
        }
        Ok(())
    }

    // ── Leaf commands ─────────────────────────────────────────────────────

    /// Applies an in-place payload edit and reports it as a replacement of
    /// the node by itself.
    fn edit_kind(
        &mut self,
        node: NodeId,
        edit: impl FnOnce(&mut Kind) -> Result<(), EditorError>,
    ) -> Result<(), EditorError> {
        let before = self.node(node)?.draft_kind().clone();
        let mut after = before.clone();
        edit(&mut after)?;
        if after == before {
            return Ok(());
        }
        self.tree.node_mut(node).set_kind(after);
        if self.tree.is_attached(node) {
            let replaced = Replaced { node, previous: before.node_kind(), previous_descendants: Vec::new() };
            self.history.replace(&self.tree, replaced);
        }
        Ok(())
    }

    /// Gives a String field an empty foreign-key reference. The tree stays
    /// invalid until [`Self::set_reference`] names a table.
    pub fn add_reference(&mut self, node: NodeId) -> Result<(), EditorError> {
        self.edit_kind(node, |kind| match kind {
            Kind::String(leaf) => {
                leaf.reference.get_or_insert_with(Reference::default);
                Ok(())
            }
            _ => Err(EditorError::NotAString(node)),
        })
    }

    pub fn set_reference(&mut self, node: NodeId, table_id: &str) -> Result<(), EditorError> {
        self.edit_kind(node, |kind| match kind {
            Kind::String(leaf) => {
                leaf.reference = Some(Reference { table_id: table_id.to_string() });
                Ok(())
            }
            _ => Err(EditorError::NotAString(node)),
        })
    }

    pub fn remove_reference(&mut self, node: NodeId) -> Result<(), EditorError> {
        self.edit_kind(node, |kind| match kind {
            Kind::String(leaf) => {
                leaf.reference = None;
                Ok(())
            }
            _ => Err(EditorError::NotAString(node)),
        })
    }

    /// Sets the default of a primitive field; the value must match its type.
    pub fn set_default(&mut self, node: NodeId, value: Value) -> Result<(), EditorError> {
        self.edit_kind(node, |kind| match (kind, value) {
            (Kind::String(leaf), Value::String(s)) => {
                leaf.default = s;
                Ok(())
            }
            (Kind::Number(leaf), Value::Number(n)) => {
                leaf.default = n;
                Ok(())
            }
            (Kind::Boolean(leaf), Value::Bool(b)) => {
                leaf.default = b;
                Ok(())
            }
            (kind, value) if kind.node_kind().is_leaf() => {
                Err(EditorError::InvalidDefault { kind: kind.node_kind(), value })
            }
            _ => Err(EditorError::NotALeaf(node)),
        })
    }

    /// Sets or clears the formula of a primitive field. Formula fields are
    /// read-only.
    pub fn set_formula(&mut self, node: NodeId, expression: Option<&str>) -> Result<(), EditorError> {
        let formula = expression.map(Formula::new);
        self.edit_kind(node, |kind| {
            let (read_only, slot) = match kind {
                Kind::String(leaf) => (&mut leaf.read_only, &mut leaf.formula),
                Kind::Number(leaf) => (&mut leaf.read_only, &mut leaf.formula),
                Kind::Boolean(leaf) => (&mut leaf.read_only, &mut leaf.formula),
                _ => return Err(EditorError::NotALeaf(node)),
            };
            *read_only = formula.is_some();
            *slot = formula;
            Ok(())
        })
    }

    pub fn set_content_media_type(&mut self, node: NodeId, media_type: Option<&str>) -> Result<(), EditorError> {
        self.edit_kind(node, |kind| match kind {
            Kind::String(leaf) => {
                leaf.content_media_type = media_type.map(str::to_string);
                Ok(())
            }
            _ => Err(EditorError::NotAString(node)),
        })
    }

    pub fn set_format(&mut self, node: NodeId, format: Option<&str>) -> Result<(), EditorError> {
        self.edit_kind(node, |kind| match kind {
            Kind::String(leaf) => {
                leaf.format = format.map(str::to_string);
                Ok(())
            }
            _ => Err(EditorError::NotAString(node)),
        })
    }
}
