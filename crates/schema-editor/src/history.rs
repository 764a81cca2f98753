//! Patch history reducer.
//!
//! The coordinator reports every structural edit here right after applying
//! it to the tree. The history keeps a compact per-node log and, on demand,
//! reduces it to a JSON-Patch list that turns the committed schema into the
//! draft schema.
//!
//! # Coalescing
//!
//! - an `add` followed by a `remove` of the same node cancels out;
//! - a node whose value is already carried by an ancestor's `add`/`replace`
//!   logs nothing of its own;
//! - back-to-back moves of a node collapse into one, and a move back to the
//!   committed parent logs nothing;
//! - renames are not logged at all: a final pass compares names.
//!
//! # Reduction
//!
//! Paths are not captured when an edit is logged. Instead the log is
//! replayed against a [`ReplayView`] seeded from the committed tree, so every
//! op is addressed relative to the document as the earlier ops left it.
//! When an op needs a name that the replay still gives to another property
//! (a rename not yet swept, a swap), that property is moved out of the way
//! first: to its own draft name if free, else to a temporary one.

use std::collections::BTreeSet;

use schema_patch::{Op, Path};
use tracing::{debug, trace};

use crate::factory::{draft_schema_without, get_schema, GetSchemaOptions};
use crate::node::{Kind, NodeId, NodeKind};
use crate::path::{json_path, Ancestry, Step, StepKey};
use crate::tree::SchemaTree;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Entry {
    /// `node` was attached under `parent` and is carried by value.
    Add { node: NodeId, parent: NodeId },
    /// A pre-existing `node` was detached.
    Remove { node: NodeId },
    /// The payload of a pre-existing `node` changed in place.
    Replace { node: NodeId },
    /// A pre-existing `node` now lives under `parent`.
    Move { node: NodeId, parent: NodeId },
}

impl Entry {
    pub fn node(&self) -> NodeId {
        match *self {
            Entry::Add { node, .. } | Entry::Remove { node } | Entry::Replace { node } | Entry::Move { node, .. } => {
                node
            }
        }
    }

    fn carries_value(&self) -> bool {
        matches!(self, Entry::Add { .. } | Entry::Replace { .. })
    }

    fn is_move(&self) -> bool {
        matches!(self, Entry::Move { .. })
    }

    fn places(&self) -> bool {
        matches!(self, Entry::Add { .. } | Entry::Move { .. })
    }
}

/// Describes a replacement that the tree has already performed.
#[derive(Debug, Clone)]
pub struct Replaced {
    /// The node that kept its identity.
    pub node: NodeId,
    /// Its kind before the replacement.
    pub previous: NodeKind,
    /// Its draft descendants before the replacement.
    pub previous_descendants: Vec<NodeId>,
}

#[derive(Debug, Clone, Default)]
pub struct PatchHistory {
    entries: Vec<Entry>,
    renamed: BTreeSet<NodeId>,
    root_replaced: bool,
}

impl PatchHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty() && self.renamed.is_empty() && !self.root_replaced
    }

    pub fn reset(&mut self) {
        self.entries.clear();
        self.renamed.clear();
        self.root_replaced = false;
    }

    // ── Log helpers ───────────────────────────────────────────────────────

    fn has_add(&self, node: NodeId) -> bool {
        self.entries.iter().any(|e| matches!(*e, Entry::Add { node: n, .. } if n == node))
    }

    fn has_remove(&self, node: NodeId) -> bool {
        self.entries.iter().any(|e| *e == Entry::Remove { node })
    }

    fn has_value(&self, node: NodeId) -> bool {
        self.entries.iter().any(|e| e.carries_value() && e.node() == node)
    }

    /// Drops the node's `Add` entries, returning whether there were any.
    fn take_add(&mut self, node: NodeId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| !matches!(*e, Entry::Add { node: n, .. } if n == node));
        self.entries.len() != before
    }

    fn drop_replace(&mut self, node: NodeId) {
        self.entries.retain(|e| *e != Entry::Replace { node });
    }

    fn last_index(&self, node: NodeId, pred: fn(&Entry) -> bool) -> Option<usize> {
        self.entries.iter().rposition(|e| e.node() == node && pred(e))
    }

    /// True when some draft ancestor's `add`/`replace` value already
    /// includes `node`. A value leaves out everything on the chain that a
    /// later entry places on its own.
    fn is_covered(&self, tree: &SchemaTree, node: NodeId) -> bool {
        let mut placed = self.last_index(node, Entry::places);
        let mut cur = tree[node].draft_parent();
        while let Some(p) = cur {
            if let Some(value) = self.last_index(p, Entry::carries_value) {
                if placed.map_or(true, |i| i < value) {
                    return true;
                }
            }
            placed = placed.max(self.last_index(p, Entry::places));
            cur = tree[p].draft_parent();
        }
        false
    }

    /// Rewrites entries of `nodes` that a containing value now accounts
    /// for: adds and replaces go away, moves of pre-existing nodes turn
    /// into removes at their old position.
    fn purge(&mut self, nodes: &[NodeId]) {
        if nodes.is_empty() {
            return;
        }
        let set: BTreeSet<NodeId> = nodes.iter().copied().collect();
        let entries = std::mem::take(&mut self.entries);
        self.entries = entries
            .into_iter()
            .filter_map(|e| match e {
                Entry::Add { node, .. } | Entry::Replace { node } if set.contains(&node) => None,
                Entry::Move { node, .. } if set.contains(&node) => Some(Entry::Remove { node }),
                other => Some(other),
            })
            .collect();
    }

    fn push(&mut self, entry: Entry) {
        trace!(?entry, "history: record");
        self.entries.push(entry);
    }

    // ── Events ────────────────────────────────────────────────────────────

    /// `node` was attached under its draft parent.
    pub fn add(&mut self, tree: &SchemaTree, node: NodeId) {
        self.purge(&tree.draft_descendants(node));
        if self.is_covered(tree, node) {
            trace!(%node, "history: add covered by ancestor");
            return;
        }
        if let Some(parent) = tree[node].draft_parent() {
            self.push(Entry::Add { node, parent });
        }
    }

    /// `node` was detached from its draft parent.
    pub fn remove(&mut self, tree: &SchemaTree, node: NodeId) {
        self.purge(&tree.draft_descendants(node));
        if self.take_add(node) {
            trace!(%node, "history: add cancelled by remove");
            return;
        }
        self.drop_replace(node);
        if tree.is_new(node) || self.has_remove(node) {
            return;
        }
        self.push(Entry::Remove { node });
    }

    /// `replaced.node` received a new payload in place.
    pub fn replace(&mut self, tree: &SchemaTree, replaced: Replaced) {
        let node = replaced.node;
        if node == tree.root() {
            trace!("history: root replaced");
            self.root_replaced = true;
            return;
        }
        let next = tree[node].draft_node_kind();
        if replaced.previous.is_reference_like() && next.is_reference_like() && self.has_value(node) {
            trace!(%node, "history: replace already pending");
            return;
        }

        self.purge(&replaced.previous_descendants);
        let was_pending = self.take_add(node);
        self.drop_replace(node);
        if self.is_covered(tree, node) {
            trace!(%node, "history: replace covered by ancestor");
            return;
        }
        let Some(parent) = tree[node].draft_parent() else {
            return;
        };
        if was_pending || tree.is_new(node) {
            self.push(Entry::Add { node, parent });
        } else {
            self.push(Entry::Replace { node });
        }
    }

    /// `node` was moved to a new draft parent.
    pub fn move_node(&mut self, tree: &SchemaTree, node: NodeId) {
        let Some(parent) = tree[node].draft_parent() else {
            return;
        };
        // A pre-existing node with a pending remove is carried by some
        // ancestor's value; once it leaves, it needs a value of its own.
        if self.has_add(node) || self.has_remove(node) || tree.is_new(node) {
            self.purge(&tree.draft_descendants(node));
            self.take_add(node);
            if self.is_covered(tree, node) {
                trace!(%node, "history: moved into a pending value");
            } else {
                self.push(Entry::Add { node, parent });
            }
            return;
        }
        // The previous move only folds into this one while no other move
        // has been logged since; later moves may depend on where it left
        // the node.
        let collapsed = match self.last_index(node, Entry::is_move) {
            Some(i) if !self.entries[i + 1..].iter().any(Entry::is_move) => {
                self.entries.remove(i);
                true
            }
            Some(_) => false,
            None => true,
        };
        if collapsed && tree[node].parent() == Some(parent) {
            trace!(%node, "history: moved back to committed parent");
            return;
        }
        self.push(Entry::Move { node, parent });
    }

    /// `node`'s draft id changed.
    pub fn rename(&mut self, node: NodeId) {
        trace!(%node, "history: rename");
        self.renamed.insert(node);
    }

    // ── Reduction ─────────────────────────────────────────────────────────

    /// Reduces the log to the patch list for the current draft.
    pub fn patches(&self, tree: &SchemaTree) -> Vec<Op> {
        let root = tree.root();
        if self.root_replaced {
            debug!("history: root replaced, emitting whole schema");
            return vec![Op::Replace { path: Vec::new(), value: get_schema(tree, root, &GetSchemaOptions::default()) }];
        }

        let mut view = ReplayView::committed(tree);
        let mut ops = Vec::with_capacity(self.entries.len());
        let mut aside = BTreeSet::new();

        for (i, entry) in self.entries.iter().enumerate() {
            let later = &self.entries[i + 1..];
            let placed_later = |n: NodeId| later.iter().any(|e| e.places() && e.node() == n);

            match *entry {
                Entry::Add { node, parent } => {
                    if !view.is_placed(parent) {
                        trace!(%node, "reduce: add target vanished");
                        continue;
                    }
                    let key = draft_key(tree, parent, node);
                    make_room(tree, &mut view, parent, &key, node, &mut aside, &mut ops);
                    ops.push(view.add(tree, node, parent, key, &placed_later));
                }
                Entry::Remove { node } => {
                    if !view.is_placed(node) {
                        continue;
                    }
                    let path = json_path(&view, node);
                    view.unplace_subtree(node);
                    ops.push(Op::Remove { path });
                }
                Entry::Replace { node } => {
                    if !view.is_placed(node) {
                        continue;
                    }
                    let path = json_path(&view, node);
                    let value = draft_schema_without(tree, node, placed_later);
                    view.unplace_descendants(node);
                    view.place_draft_children(tree, node, &placed_later);
                    ops.push(Op::Replace { path, value });
                }
                Entry::Move { node, parent } => match (view.is_placed(node), view.is_placed(parent)) {
                    (false, false) => {}
                    (false, true) => {
                        // The source went away with an ancestor; carry the value.
                        trace!(%node, "reduce: move source vanished, adding");
                        let key = draft_key(tree, parent, node);
                        make_room(tree, &mut view, parent, &key, node, &mut aside, &mut ops);
                        ops.push(view.add(tree, node, parent, key, &placed_later));
                    }
                    (true, false) => {
                        trace!(%node, "reduce: move target vanished, removing");
                        let path = json_path(&view, node);
                        view.unplace_subtree(node);
                        ops.push(Op::Remove { path });
                    }
                    (true, true) => {
                        let key = draft_key(tree, parent, node);
                        make_room(tree, &mut view, parent, &key, node, &mut aside, &mut ops);
                        let from = json_path(&view, node);
                        let path = view.child_path(parent, &key);
                        view.place(node, Step { parent, key });
                        ops.push(Op::Move { from, path });
                    }
                },
            }
        }

        self.emit_renames(tree, &mut view, aside, &mut ops);
        debug!(entries = self.entries.len(), renamed = self.renamed.len(), ops = ops.len(), "history: reduced");
        ops
    }

    /// Emits a `move` for every renamed or set-aside property whose replayed
    /// name differs from its draft id. A property still holding the target
    /// name is moved out of the way first, so swapped names settle over
    /// repeated passes.
    fn emit_renames(&self, tree: &SchemaTree, view: &mut ReplayView, aside: BTreeSet<NodeId>, ops: &mut Vec<Op>) {
        let mut pending: BTreeSet<NodeId> = self.renamed.union(&aside).copied().collect();
        if pending.is_empty() {
            return;
        }
        let root = tree.root();
        for _ in 0..=tree.len() {
            let mut moved = false;
            for node in tree.draft_descendants(root) {
                if !pending.contains(&node) {
                    continue;
                }
                let Some(Step { parent, key: StepKey::Property(name) }) = view.step(node) else {
                    continue;
                };
                let draft_id = tree[node].draft_id();
                if name == draft_id || !tree[parent].draft_kind().is_object() {
                    continue;
                }
                let key = StepKey::Property(draft_id.to_string());
                let mut evicted = BTreeSet::new();
                make_room(tree, view, parent, &key, node, &mut evicted, ops);
                pending.extend(evicted);

                let from = json_path(&*view, node);
                view.place(node, Step { parent, key });
                let path = json_path(&*view, node);
                ops.push(Op::Move { from, path });
                moved = true;
            }
            if !moved {
                break;
            }
        }
    }
}

fn draft_key(tree: &SchemaTree, parent: NodeId, child: NodeId) -> StepKey {
    match tree[parent].draft_kind() {
        Kind::Array { .. } => StepKey::Items,
        _ => StepKey::Property(tree[child].draft_id().to_string()),
    }
}

/// Frees `key` under `parent` for `node`. A different node still holding it
/// in the replay goes to its own draft name when that is free there, else to
/// a temporary name; the latter is recorded in `aside` for the rename sweep.
fn make_room(
    tree: &SchemaTree,
    view: &mut ReplayView,
    parent: NodeId,
    key: &StepKey,
    node: NodeId,
    aside: &mut BTreeSet<NodeId>,
    ops: &mut Vec<Op>,
) {
    let StepKey::Property(name) = key else {
        return;
    };
    let Some(occupant) = view.occupant(parent, key).filter(|&o| o != node) else {
        return;
    };
    let own = StepKey::Property(tree[occupant].draft_id().to_string());
    let target = if tree[occupant].draft_parent() == Some(parent) && view.occupant(parent, &own).is_none() {
        own
    } else {
        aside.insert(occupant);
        (0..)
            .map(|n| StepKey::Property(format!("{name}.{n}")))
            .find(|k| view.occupant(parent, k).is_none())
            .unwrap_or(own)
    };
    trace!(%occupant, %node, "reduce: making room");
    let from = json_path(&*view, occupant);
    view.place(occupant, Step { parent, key: target });
    let path = json_path(&*view, occupant);
    ops.push(Op::Move { from, path });
}

// ── Replay view ───────────────────────────────────────────────────────────

/// Where each node sits in the document as the ops emitted so far left it.
struct ReplayView {
    root: NodeId,
    slots: Vec<Option<Step>>,
    children: Vec<Vec<NodeId>>,
}

impl ReplayView {
    /// Every committed node at its committed position and name.
    fn committed(tree: &SchemaTree) -> Self {
        let mut view =
            Self { root: tree.root(), slots: vec![None; tree.len()], children: vec![Vec::new(); tree.len()] };
        let mut stack = vec![tree.root()];
        while let Some(parent) = stack.pop() {
            for child in tree.committed_children(parent) {
                let key = match tree[parent].kind() {
                    Kind::Array { .. } => StepKey::Items,
                    _ => StepKey::Property(tree[child].id().to_string()),
                };
                view.place(child, Step { parent, key });
                stack.push(child);
            }
        }
        view
    }

    fn place(&mut self, node: NodeId, step: Step) {
        self.take_slot(node);
        self.children[step.parent.index()].push(node);
        self.slots[node.index()] = Some(step);
    }

    fn take_slot(&mut self, node: NodeId) {
        if let Some(step) = self.slots[node.index()].take() {
            self.children[step.parent.index()].retain(|&c| c != node);
        }
    }

    fn is_placed(&self, node: NodeId) -> bool {
        let mut cur = node;
        for _ in 0..=self.slots.len() {
            if cur == self.root {
                return true;
            }
            match &self.slots[cur.index()] {
                Some(step) => cur = step.parent,
                None => return false,
            }
        }
        false
    }

    /// The child currently holding `key` under `parent`.
    fn occupant(&self, parent: NodeId, key: &StepKey) -> Option<NodeId> {
        self.children[parent.index()]
            .iter()
            .copied()
            .find(|c| self.slots[c.index()].as_ref().is_some_and(|s| &s.key == key))
    }

    fn child_path(&self, parent: NodeId, key: &StepKey) -> Path {
        let mut path = json_path(self, parent);
        match key {
            StepKey::Property(name) => {
                path.push(schema_patch::pointer::PROPERTIES.to_string());
                path.push(name.clone());
            }
            StepKey::Items => path.push(schema_patch::pointer::ITEMS.to_string()),
        }
        path
    }

    /// Places `node` under `parent` at `key` carrying its draft value, and
    /// returns the `add` that does the same to the document.
    fn add(
        &mut self,
        tree: &SchemaTree,
        node: NodeId,
        parent: NodeId,
        key: StepKey,
        skip: &impl Fn(NodeId) -> bool,
    ) -> Op {
        let path = self.child_path(parent, &key);
        let value = draft_schema_without(tree, node, skip);
        self.unplace_subtree(node);
        self.place(node, Step { parent, key });
        self.place_draft_children(tree, node, skip);
        Op::Add { path, value }
    }

    fn unplace_descendants(&mut self, node: NodeId) {
        let mut stack = std::mem::take(&mut self.children[node.index()]);
        while let Some(child) = stack.pop() {
            self.slots[child.index()] = None;
            stack.append(&mut self.children[child.index()]);
        }
    }

    fn unplace_subtree(&mut self, node: NodeId) {
        self.unplace_descendants(node);
        self.take_slot(node);
    }

    /// Places the draft children of a node whose value was just written,
    /// leaving out the ones `skip` selects.
    fn place_draft_children(&mut self, tree: &SchemaTree, node: NodeId, skip: &impl Fn(NodeId) -> bool) {
        let mut stack = vec![node];
        while let Some(parent) = stack.pop() {
            for child in tree.draft_children(parent) {
                if skip(child) {
                    continue;
                }
                self.place(child, Step { parent, key: draft_key(tree, parent, child) });
                stack.push(child);
            }
        }
    }
}

impl Ancestry for ReplayView {
    fn step(&self, node: NodeId) -> Option<Step> {
        if node == self.root {
            return None;
        }
        self.slots.get(node.index()).cloned().flatten()
    }
}
