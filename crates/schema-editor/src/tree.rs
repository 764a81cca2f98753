//! Node arena with a draft overlay.
//!
//! Nodes live in a `Vec` and refer to each other by [`NodeId`]. Every
//! structural edit only touches draft fields; committed fields change in
//! [`SchemaTree::submit_changes`] alone.

use std::ops::Index;

use crate::node::{Kind, NodeId, SchemaNode};

#[derive(Debug, Clone)]
pub struct SchemaTree {
    nodes: Vec<SchemaNode>,
    root: NodeId,
}

impl SchemaTree {
    /// An arena with no nodes. The caller must allocate and install a root.
    pub(crate) fn empty() -> Self {
        Self { nodes: Vec::new(), root: NodeId(0) }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub(crate) fn set_root(&mut self, root: NodeId) {
        self.root = root;
    }

    pub fn get(&self, node: NodeId) -> Option<&SchemaNode> {
        self.nodes.get(node.index())
    }

    /// Number of arena slots, including detached and inert nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub(crate) fn alloc(&mut self, kind: Kind) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(SchemaNode::new(id, kind));
        id
    }

    pub(crate) fn node_mut(&mut self, node: NodeId) -> &mut SchemaNode {
        &mut self.nodes[node.index()]
    }

    // ── Traversal ─────────────────────────────────────────────────────────

    pub fn draft_children(&self, node: NodeId) -> Vec<NodeId> {
        self[node].draft_kind().children()
    }

    pub fn committed_children(&self, node: NodeId) -> Vec<NodeId> {
        self[node].kind().children()
    }

    /// Strict draft descendants of `node` in pre-order.
    pub fn draft_descendants(&self, node: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.draft_children(node).into_iter().rev().collect();
        while let Some(n) = stack.pop() {
            out.push(n);
            stack.extend(self.draft_children(n).into_iter().rev());
        }
        out
    }

    /// The draft subtree rooted at `node` (inclusive) in pre-order.
    pub fn draft_subtree(&self, node: NodeId) -> Vec<NodeId> {
        let mut out = vec![node];
        out.extend(self.draft_descendants(node));
        out
    }

    /// Named draft child of an Object.
    pub fn find_property(&self, object: NodeId, name: &str) -> Option<NodeId> {
        self[object]
            .draft_kind()
            .properties()?
            .iter()
            .copied()
            .find(|&child| self[child].draft_id() == name)
    }

    /// True when `node` is a draft child of its draft parent, whether or not
    /// that parent is itself attached.
    pub fn is_linked(&self, node: NodeId) -> bool {
        match self[node].draft_parent() {
            Some(parent) => self[node].draft_connected_to_parent() && self.draft_children(parent).contains(&node),
            None => false,
        }
    }

    /// True when the root reaches `node` through draft children.
    pub fn is_attached(&self, node: NodeId) -> bool {
        let mut cur = node;
        for _ in 0..=self.nodes.len() {
            if cur == self.root {
                return true;
            }
            if !self.is_linked(cur) {
                return false;
            }
            match self[cur].draft_parent() {
                Some(parent) => cur = parent,
                None => return false,
            }
        }
        false
    }

    /// True when the root does not reach `node` through committed children,
    /// i.e. the node was created during the current session.
    pub fn is_new(&self, node: NodeId) -> bool {
        let mut cur = node;
        for _ in 0..=self.nodes.len() {
            if cur == self.root {
                return false;
            }
            let Some(parent) = self[cur].parent() else {
                return true;
            };
            if !self.committed_children(parent).contains(&cur) {
                return true;
            }
            cur = parent;
        }
        true
    }

    /// True when `ancestor` lies on the draft parent chain of `node`.
    pub fn is_draft_ancestor(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut cur = self[node].draft_parent();
        while let Some(p) = cur {
            if p == ancestor {
                return true;
            }
            cur = self[p].draft_parent();
        }
        false
    }

    // ── Predicates ────────────────────────────────────────────────────────

    pub fn is_dirty_itself(&self, node: NodeId) -> bool {
        self[node].is_dirty_itself()
    }

    pub fn is_dirty(&self, node: NodeId) -> bool {
        self.draft_subtree(node).into_iter().any(|n| self[n].is_dirty_itself())
    }

    /// False iff some String in the draft subtree has an unset reference.
    pub fn is_valid(&self, node: NodeId) -> bool {
        self.draft_subtree(node)
            .into_iter()
            .all(|n| self[n].draft_reference().map_or(true, |r| !r.table_id.is_empty()))
    }

    // ── Session ───────────────────────────────────────────────────────────

    /// Folds draft into committed for `node` and its draft subtree.
    pub fn submit_changes(&mut self, node: NodeId) {
        let mut stack = vec![node];
        while let Some(n) = stack.pop() {
            self.node_mut(n).submit();
            stack.extend(self.draft_children(n));
        }
    }

    /// Restores draft from committed for `node` and its committed subtree.
    pub fn reset_changes(&mut self, node: NodeId) {
        let mut stack = vec![node];
        while let Some(n) = stack.pop() {
            self.node_mut(n).reset();
            stack.extend(self.committed_children(n));
        }
    }

    // ── Structural mutations (draft only) ─────────────────────────────────

    pub(crate) fn attach_property(&mut self, parent: NodeId, child: NodeId) {
        if let Kind::Object { properties } = self.node_mut(parent).draft_kind_mut() {
            properties.push(child);
        }
        let c = self.node_mut(child);
        c.set_parent(Some(parent));
        c.set_connected_to_parent(true);
    }

    pub(crate) fn set_items(&mut self, array: NodeId, child: NodeId) {
        let previous = match self.node_mut(array).draft_kind_mut() {
            Kind::Array { items } => items.replace(child),
            _ => return,
        };
        if let Some(prev) = previous {
            self.node_mut(prev).set_connected_to_parent(false);
        }
        let c = self.node_mut(child);
        c.set_parent(Some(array));
        c.set_connected_to_parent(true);
    }

    /// Unlinks `child` from its draft Object parent. The draft parent pointer
    /// is kept so the node still knows where it was removed from.
    pub(crate) fn detach(&mut self, child: NodeId) {
        if let Some(parent) = self[child].draft_parent() {
            if let Kind::Object { properties } = self.node_mut(parent).draft_kind_mut() {
                properties.retain(|&p| p != child);
            }
        }
        self.node_mut(child).set_connected_to_parent(false);
    }

    /// Moves an attached property under another Object.
    pub(crate) fn relocate(&mut self, child: NodeId, new_parent: NodeId) {
        self.detach(child);
        self.attach_property(new_parent, child);
    }

    /// Moves `donor`'s draft payload into `target`, keeping `target`'s
    /// identity and position. `target`'s previous children end up detached;
    /// `donor` is left as an inert blank.
    pub(crate) fn transplant(&mut self, target: NodeId, donor: NodeId) {
        let kind = self[donor].draft_kind().clone();
        for prev in self.draft_children(target) {
            self.node_mut(prev).set_connected_to_parent(false);
        }
        for child in kind.children() {
            self.node_mut(child).set_parent(Some(target));
        }
        self.node_mut(target).set_kind(kind);

        let blank = Kind::empty(self[donor].draft_node_kind());
        let d = self.node_mut(donor);
        d.set_kind(blank);
        d.set_parent(None);
        d.set_connected_to_parent(false);
    }
}

impl Index<NodeId> for SchemaTree {
    type Output = SchemaNode;

    fn index(&self, node: NodeId) -> &SchemaNode {
        &self.nodes[node.index()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::factory::create_schema_node;
    use crate::node::{NodeKind, Reference};
    use serde_json::json;

    fn tree(schema: serde_json::Value) -> SchemaTree {
        let mut tree = SchemaTree::empty();
        let root = create_schema_node(&mut tree, &schema).unwrap();
        tree.set_root(root);
        tree
    }

    fn sample() -> SchemaTree {
        tree(json!({
            "type": "object",
            "properties": {
                "name": {"type": "string", "default": ""},
                "list": {"type": "array", "items": {"type": "number", "default": 0}}
            },
            "additionalProperties": false,
            "required": ["name", "list"]
        }))
    }

    #[test]
    fn built_tree_is_clean_and_attached() {
        let t = sample();
        let root = t.root();
        assert!(!t.is_dirty(root));
        assert!(t.is_valid(root));
        let name = t.find_property(root, "name").unwrap();
        let list = t.find_property(root, "list").unwrap();
        let items = t[list].draft_kind().items().unwrap();
        for n in [root, name, list, items] {
            assert!(t.is_attached(n));
            assert!(!t.is_new(n));
        }
        assert_eq!(t.draft_descendants(root), vec![name, list, items]);
    }

    #[test]
    fn detach_marks_parent_dirty_and_reset_restores() {
        let mut t = sample();
        let root = t.root();
        let name = t.find_property(root, "name").unwrap();
        t.detach(name);
        assert!(!t.is_attached(name));
        assert!(t.is_dirty(root));
        assert!(t.is_dirty_itself(root));
        assert!(!t.is_new(name));

        t.reset_changes(root);
        assert!(t.is_attached(name));
        assert!(!t.is_dirty(root));
    }

    #[test]
    fn submit_then_reset_is_noop() {
        let mut t = sample();
        let root = t.root();
        let fresh = t.alloc(Kind::empty(NodeKind::Boolean));
        t.node_mut(fresh).set_id("flag");
        t.attach_property(root, fresh);
        assert!(t.is_new(fresh));
        t.submit_changes(root);
        assert!(!t.is_new(fresh));
        let before: Vec<_> = t.draft_subtree(root);
        t.reset_changes(root);
        assert_eq!(t.draft_subtree(root), before);
        assert!(!t.is_dirty(root));
    }

    #[test]
    fn transplant_keeps_identity_and_detaches_old_children() {
        let mut t = sample();
        let root = t.root();
        let list = t.find_property(root, "list").unwrap();
        let old_items = t[list].draft_kind().items().unwrap();
        let donor = t.alloc(Kind::empty(NodeKind::String));

        t.transplant(list, donor);
        assert_eq!(t[list].draft_node_kind(), NodeKind::String);
        assert_eq!(t[list].node_kind(), NodeKind::Array);
        assert!(t.is_attached(list));
        assert!(!t.is_attached(old_items));
        assert!(!t.is_attached(donor));
    }

    #[test]
    fn empty_reference_is_invalid() {
        let mut t = sample();
        let root = t.root();
        let name = t.find_property(root, "name").unwrap();
        if let Kind::String(leaf) = t.node_mut(name).draft_kind_mut() {
            leaf.reference = Some(Reference::default());
        }
        assert!(!t.is_valid(root));
        if let Kind::String(leaf) = t.node_mut(name).draft_kind_mut() {
            leaf.reference = Some(Reference { table_id: "users".into() });
        }
        assert!(t.is_valid(root));
    }

    #[test]
    fn relocate_changes_draft_parent_only() {
        let mut t = tree(json!({
            "type": "object",
            "properties": {
                "a": {"type": "string", "default": ""},
                "o": {"type": "object", "properties": {}, "additionalProperties": false, "required": []}
            },
            "additionalProperties": false,
            "required": ["a", "o"]
        }));
        let root = t.root();
        let a = t.find_property(root, "a").unwrap();
        let o = t.find_property(root, "o").unwrap();
        t.relocate(a, o);
        assert_eq!(t[a].draft_parent(), Some(o));
        assert_eq!(t[a].parent(), Some(root));
        assert!(t.is_attached(a));
        assert!(t.is_draft_ancestor(o, a));
        assert_eq!(t.find_property(o, "a"), Some(a));
        assert_eq!(t.find_property(root, "a"), None);
    }
}
