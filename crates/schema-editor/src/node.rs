//! Schema node variants and the draft overlay.
//!
//! # Overview
//!
//! Every node carries two copies of its mutable attributes: the `committed`
//! copy (what the server has) and the `draft` copy (what the user is editing).
//! User code only writes the draft; [`Overlay::submit`] folds draft into
//! committed and [`Overlay::reset`] discards the draft.
//!
//! The variant itself ([`Kind`]) lives inside the overlay, so a type change
//! is just a draft edit: the node keeps its [`NodeId`] while its draft kind
//! differs from the committed one.

use std::fmt;

use serde_json::Number;

/// Arena handle of a node. Stable for the lifetime of the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(pub(crate) u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

// ── Overlay ───────────────────────────────────────────────────────────────

/// A committed/draft pair of the same value.
#[derive(Debug, Clone, PartialEq)]
pub struct Overlay<T> {
    committed: T,
    draft: T,
}

impl<T: Clone + PartialEq> Overlay<T> {
    pub fn new(committed: T, draft: T) -> Self {
        Self { committed, draft }
    }

    pub fn committed(&self) -> &T {
        &self.committed
    }

    pub fn draft(&self) -> &T {
        &self.draft
    }

    pub fn draft_mut(&mut self) -> &mut T {
        &mut self.draft
    }

    /// Copies the draft into the committed slot.
    pub fn submit(&mut self) {
        if self.committed != self.draft {
            self.committed = self.draft.clone();
        }
    }

    /// Copies the committed value back into the draft slot.
    pub fn reset(&mut self) {
        if self.committed != self.draft {
            self.draft = self.committed.clone();
        }
    }

    pub fn is_dirty(&self) -> bool {
        self.committed != self.draft
    }
}

// ── Kinds ─────────────────────────────────────────────────────────────────

/// Fieldless tag of [`Kind`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Object,
    Array,
    String,
    Number,
    Boolean,
    Ref,
}

impl NodeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::Object => "object",
            NodeKind::Array => "array",
            NodeKind::String => "string",
            NodeKind::Number => "number",
            NodeKind::Boolean => "boolean",
            NodeKind::Ref => "$ref",
        }
    }

    /// Kinds whose identity is carried by a reference rather than by
    /// structure: plain strings (foreign keys) and `$ref` nodes.
    pub fn is_reference_like(&self) -> bool {
        matches!(self, NodeKind::String | NodeKind::Ref)
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self, NodeKind::String | NodeKind::Number | NodeKind::Boolean)
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A computed field (`x-formula`). Formula fields are read-only.
#[derive(Debug, Clone, PartialEq)]
pub struct Formula {
    pub version: u64,
    pub expression: String,
}

impl Formula {
    pub const VERSION: u64 = 1;

    pub fn new(expression: impl Into<String>) -> Self {
        Self { version: Self::VERSION, expression: expression.into() }
    }
}

/// The foreign-key sub-node of a string field. An empty `table_id` makes
/// the tree invalid until the user picks a table.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Reference {
    pub table_id: String,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct StringLeaf {
    pub default: String,
    pub format: Option<String>,
    pub content_media_type: Option<String>,
    pub read_only: bool,
    pub formula: Option<Formula>,
    pub reference: Option<Reference>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NumberLeaf {
    pub default: Number,
    pub read_only: bool,
    pub formula: Option<Formula>,
}

impl Default for NumberLeaf {
    fn default() -> Self {
        Self { default: Number::from(0), read_only: false, formula: None }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct BooleanLeaf {
    pub default: bool,
    pub read_only: bool,
    pub formula: Option<Formula>,
}

/// Variant payload of a node.
#[derive(Debug, Clone, PartialEq)]
pub enum Kind {
    /// Ordered properties; order is schema property order.
    Object { properties: Vec<NodeId> },
    /// The single items schema. `None` only in a fresh node's committed state.
    Array { items: Option<NodeId> },
    String(StringLeaf),
    Number(NumberLeaf),
    Boolean(BooleanLeaf),
    /// A `$ref` to a system schema.
    Ref { schema_id: String },
}

impl Kind {
    /// The zero value of a variant.
    pub fn empty(kind: NodeKind) -> Self {
        match kind {
            NodeKind::Object => Kind::Object { properties: Vec::new() },
            NodeKind::Array => Kind::Array { items: None },
            NodeKind::String => Kind::String(StringLeaf::default()),
            NodeKind::Number => Kind::Number(NumberLeaf::default()),
            NodeKind::Boolean => Kind::Boolean(BooleanLeaf::default()),
            NodeKind::Ref => Kind::Ref { schema_id: String::new() },
        }
    }

    pub fn node_kind(&self) -> NodeKind {
        match self {
            Kind::Object { .. } => NodeKind::Object,
            Kind::Array { .. } => NodeKind::Array,
            Kind::String(_) => NodeKind::String,
            Kind::Number(_) => NodeKind::Number,
            Kind::Boolean(_) => NodeKind::Boolean,
            Kind::Ref { .. } => NodeKind::Ref,
        }
    }

    /// Child handles: Object properties in order, or the Array items node.
    pub fn children(&self) -> Vec<NodeId> {
        match self {
            Kind::Object { properties } => properties.clone(),
            Kind::Array { items } => items.iter().copied().collect(),
            _ => Vec::new(),
        }
    }

    pub fn properties(&self) -> Option<&[NodeId]> {
        match self {
            Kind::Object { properties } => Some(properties),
            _ => None,
        }
    }

    pub fn items(&self) -> Option<NodeId> {
        match self {
            Kind::Array { items } => *items,
            _ => None,
        }
    }

    pub fn reference(&self) -> Option<&Reference> {
        match self {
            Kind::String(leaf) => leaf.reference.as_ref(),
            _ => None,
        }
    }

    pub fn is_object(&self) -> bool {
        matches!(self, Kind::Object { .. })
    }

    pub fn is_array(&self) -> bool {
        matches!(self, Kind::Array { .. })
    }
}

// ── Fields ────────────────────────────────────────────────────────────────

/// The mutable attributes of a node; one copy per overlay side.
#[derive(Debug, Clone, PartialEq)]
pub struct Fields {
    /// Property name under the parent (the table id for the root).
    pub id: String,
    pub parent: Option<NodeId>,
    /// False once the node was detached from `parent`.
    pub connected_to_parent: bool,
    pub kind: Kind,
}

impl Fields {
    /// The committed state of a node that has never been submitted.
    pub fn blank(kind: NodeKind) -> Self {
        Self { id: String::new(), parent: None, connected_to_parent: false, kind: Kind::empty(kind) }
    }
}

// ── SchemaNode ────────────────────────────────────────────────────────────

/// A node of the schema tree.
#[derive(Debug, Clone)]
pub struct SchemaNode {
    node_id: NodeId,
    fields: Overlay<Fields>,
}

impl SchemaNode {
    pub(crate) fn new(node_id: NodeId, kind: Kind) -> Self {
        let committed = Fields::blank(kind.node_kind());
        let draft = Fields { kind, ..Fields::blank(committed.kind.node_kind()) };
        Self { node_id, fields: Overlay::new(committed, draft) }
    }

    pub fn node_id(&self) -> NodeId {
        self.node_id
    }

    pub fn id(&self) -> &str {
        &self.fields.committed().id
    }

    pub fn draft_id(&self) -> &str {
        &self.fields.draft().id
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.fields.committed().parent
    }

    pub fn draft_parent(&self) -> Option<NodeId> {
        self.fields.draft().parent
    }

    pub fn connected_to_parent(&self) -> bool {
        self.fields.committed().connected_to_parent
    }

    pub fn draft_connected_to_parent(&self) -> bool {
        self.fields.draft().connected_to_parent
    }

    pub fn kind(&self) -> &Kind {
        &self.fields.committed().kind
    }

    pub fn draft_kind(&self) -> &Kind {
        &self.fields.draft().kind
    }

    pub fn node_kind(&self) -> NodeKind {
        self.kind().node_kind()
    }

    pub fn draft_node_kind(&self) -> NodeKind {
        self.draft_kind().node_kind()
    }

    pub fn reference(&self) -> Option<&Reference> {
        self.kind().reference()
    }

    pub fn draft_reference(&self) -> Option<&Reference> {
        self.draft_kind().reference()
    }

    pub fn committed_fields(&self) -> &Fields {
        self.fields.committed()
    }

    pub fn draft_fields(&self) -> &Fields {
        self.fields.draft()
    }

    /// True iff any of the node's own draft fields differ from committed.
    pub fn is_dirty_itself(&self) -> bool {
        self.fields.is_dirty()
    }

    pub(crate) fn set_id(&mut self, id: impl Into<String>) {
        self.fields.draft_mut().id = id.into();
    }

    pub(crate) fn set_parent(&mut self, parent: Option<NodeId>) {
        self.fields.draft_mut().parent = parent;
    }

    pub(crate) fn set_connected_to_parent(&mut self, connected: bool) {
        self.fields.draft_mut().connected_to_parent = connected;
    }

    pub(crate) fn set_kind(&mut self, kind: Kind) {
        self.fields.draft_mut().kind = kind;
    }

    pub(crate) fn draft_kind_mut(&mut self) -> &mut Kind {
        &mut self.fields.draft_mut().kind
    }

    pub(crate) fn submit(&mut self) {
        self.fields.submit();
    }

    pub(crate) fn reset(&mut self) {
        self.fields.reset();
    }
}
