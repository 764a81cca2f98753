//! Path resolver.
//!
//! A node's location is the chain of [`Step`]s from the node up to the root.
//! Where a step comes from (draft or committed pointers, or the patch
//! reducer's replay state) is abstracted by [`Ancestry`].

use schema_patch::pointer::{format_json_pointer, ITEMS, PROPERTIES};
use schema_patch::Path;

use crate::node::{Kind, NodeId};
use crate::tree::SchemaTree;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepKey {
    /// A named property of an Object.
    Property(String),
    /// The items node of an Array.
    Items,
}

/// One parent-ward step: `node` sits under `parent` at `key`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    pub parent: NodeId,
    pub key: StepKey,
}

/// Source of parent links.
pub trait Ancestry {
    /// The step from `node` to its parent, `None` at the root or for a node
    /// with no known parent.
    fn step(&self, node: NodeId) -> Option<Step>;
}

/// Steps from `node` up to the topmost reachable ancestor.
pub fn sequence_by_node<A: Ancestry + ?Sized>(ancestry: &A, node: NodeId) -> Vec<Step> {
    let mut out = Vec::new();
    let mut cur = node;
    while let Some(step) = ancestry.step(cur) {
        cur = step.parent;
        out.push(step);
    }
    out
}

/// Root-to-node path segments.
pub fn json_path<A: Ancestry + ?Sized>(ancestry: &A, node: NodeId) -> Path {
    let steps = sequence_by_node(ancestry, node);
    let mut path = Vec::with_capacity(steps.len() * 2);
    for step in steps.into_iter().rev() {
        match step.key {
            StepKey::Property(name) => {
                path.push(PROPERTIES.to_string());
                path.push(name);
            }
            StepKey::Items => path.push(ITEMS.to_string()),
        }
    }
    path
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SequenceOptions {
    pub prefer_draft_parent: bool,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PathOptions {
    /// Follow draft parents instead of committed parents.
    pub prefer_draft_parent: bool,
    /// Name every segment by its draft id instead of its committed id.
    pub prefer_draft_id: bool,
    /// Name the first segment (the node itself) by its committed id even
    /// when `prefer_draft_id` is set.
    pub prefer_start_with_not_draft_id: bool,
}

impl PathOptions {
    /// Where the node is now, under its current names.
    pub fn draft() -> Self {
        Self { prefer_draft_parent: true, prefer_draft_id: true, prefer_start_with_not_draft_id: false }
    }

    /// Where the node was at the last submit.
    pub fn committed() -> Self {
        Self::default()
    }
}

/// [`Ancestry`] over the tree's own draft or committed pointers.
pub struct TreeView<'a> {
    tree: &'a SchemaTree,
    draft_parent: bool,
    draft_id: bool,
    /// Node whose own segment is always named by its committed id.
    committed_name_of: Option<NodeId>,
}

impl<'a> TreeView<'a> {
    pub fn new(tree: &'a SchemaTree, node: NodeId, options: PathOptions) -> Self {
        Self {
            tree,
            draft_parent: options.prefer_draft_parent,
            draft_id: options.prefer_draft_id,
            committed_name_of: options.prefer_start_with_not_draft_id.then_some(node),
        }
    }
}

impl Ancestry for TreeView<'_> {
    fn step(&self, node: NodeId) -> Option<Step> {
        if node == self.tree.root() {
            return None;
        }
        let n = &self.tree[node];
        let parent = if self.draft_parent { n.draft_parent() } else { n.parent() }?;
        let p = &self.tree[parent];
        let parent_kind = if self.draft_parent { p.draft_kind() } else { p.kind() };
        let key = match parent_kind {
            Kind::Array { .. } => StepKey::Items,
            _ if self.draft_id && self.committed_name_of != Some(node) => {
                StepKey::Property(n.draft_id().to_string())
            }
            _ => StepKey::Property(n.id().to_string()),
        };
        Some(Step { parent, key })
    }
}

impl SchemaTree {
    pub fn sequence_by_node(&self, node: NodeId, options: SequenceOptions) -> Vec<Step> {
        let view = TreeView {
            tree: self,
            draft_parent: options.prefer_draft_parent,
            draft_id: options.prefer_draft_parent,
            committed_name_of: None,
        };
        sequence_by_node(&view, node)
    }

    pub fn json_path_by_node(&self, node: NodeId, options: PathOptions) -> Path {
        json_path(&TreeView::new(self, node, options), node)
    }

    pub fn json_pointer_by_node(&self, node: NodeId, options: PathOptions) -> String {
        format_json_pointer(&self.json_path_by_node(node, options))
    }
}
