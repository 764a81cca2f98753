use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256StarStar;
use schema_editor::{NodeId, NodeKind, SchemaEditor};
use schema_patch::{apply_schema_patch, normalize_required, to_json_patch, Op};
use serde_json::{json, Value};

const KINDS: [NodeKind; 6] =
    [NodeKind::Object, NodeKind::Array, NodeKind::String, NodeKind::Number, NodeKind::Boolean, NodeKind::Ref];

const STEPS: usize = 48;

#[test]
fn seeded_edit_sessions_round_trip_through_patches() {
    for seed in seeds() {
        let mut session = Session::new(seed);
        for step in 0..STEPS {
            session.random_edit();
            assert_patch_rebuilds_draft(&session.editor, &session.editor.patches(), seed, step);

            match session.rng.gen_range(0..16) {
                0 => session.submit(step),
                1 => session.reset(step),
                _ => {}
            }
        }
        session.submit(STEPS);
    }
}

#[test]
fn seeded_sessions_never_leave_an_attached_node_behind() {
    for seed in seeds() {
        let mut session = Session::new(seed);
        for _ in 0..STEPS {
            session.random_edit();
        }
        let editor = &session.editor;
        for node in editor.tree().draft_descendants(editor.root()) {
            assert!(editor.tree().is_attached(node), "seed={seed} {node} reachable but not attached");
            let path = editor.json_path(node).expect("attached node must have a path");
            let pointer = path.split('/').skip(1).map(str::to_string).collect::<Vec<_>>();
            let mut cur = &editor.schema();
            for segment in &pointer {
                cur = cur.get(segment).unwrap_or_else(|| panic!("seed={seed} {path} missing in draft schema"));
            }
        }
    }
}

struct Session {
    seed: u64,
    rng: Xoshiro256StarStar,
    editor: SchemaEditor,
    fresh: usize,
    retired: Vec<String>,
}

impl Session {
    fn new(seed: u64) -> Self {
        let editor = SchemaEditor::from_schema("table", &table()).expect("table schema must load");
        Self { seed, rng: Xoshiro256StarStar::seed_from_u64(seed), editor, fresh: 0, retired: Vec::new() }
    }

    fn fresh_name(&mut self) -> String {
        self.fresh += 1;
        format!("f{}", self.fresh)
    }

    /// A name free under `parent`: often one given up earlier in the
    /// session, otherwise a fresh one.
    fn name_under(&mut self, parent: NodeId) -> String {
        if self.rng.gen_bool(0.5) {
            let free: Vec<String> = self
                .retired
                .iter()
                .filter(|n| self.editor.tree().find_property(parent, n).is_none())
                .cloned()
                .collect();
            if !free.is_empty() {
                return free[self.rng.gen_range(0..free.len())].clone();
            }
        }
        self.fresh_name()
    }

    fn retire(&mut self, node: NodeId) {
        let id = self.editor.tree()[node].draft_id().to_string();
        self.retired.push(id);
    }

    fn random_kind(&mut self) -> NodeKind {
        KINDS[self.rng.gen_range(0..KINDS.len())]
    }

    fn pick(&mut self, nodes: &[NodeId]) -> Option<NodeId> {
        if nodes.is_empty() {
            return None;
        }
        Some(nodes[self.rng.gen_range(0..nodes.len())])
    }

    fn attached(&self) -> Vec<NodeId> {
        self.editor.tree().draft_descendants(self.editor.root())
    }

    fn objects(&self) -> Vec<NodeId> {
        let tree = self.editor.tree();
        let mut out = vec![self.editor.root()];
        out.extend(self.attached().into_iter().filter(|&n| tree[n].draft_kind().is_object()));
        out
    }

    fn properties(&self) -> Vec<NodeId> {
        let tree = self.editor.tree();
        self.attached()
            .into_iter()
            .filter(|&n| tree[n].draft_parent().is_some_and(|p| tree[p].draft_kind().is_object()))
            .collect()
    }

    fn of_kind(&self, kind: NodeKind) -> Vec<NodeId> {
        let tree = self.editor.tree();
        self.attached().into_iter().filter(|&n| tree[n].draft_node_kind() == kind).collect()
    }

    fn random_edit(&mut self) {
        let seed = self.seed;
        match self.rng.gen_range(0..8) {
            0 | 1 => {
                let Some(parent) = self.pick(&self.objects()) else { return };
                let kind = self.random_kind();
                let name = self.name_under(parent);
                let node = self.editor.create_default_node(kind);
                self.editor.set_id(node, &name).expect("detached rename must succeed");
                self.editor.add_property(parent, node).unwrap_or_else(|e| panic!("seed={seed} add: {e}"));
            }
            2 => {
                let Some(node) = self.pick(&self.properties()) else { return };
                self.retire(node);
                self.editor.remove(node).unwrap_or_else(|e| panic!("seed={seed} remove: {e}"));
            }
            3 => {
                let Some(node) = self.pick(&self.properties()) else { return };
                let tree = self.editor.tree();
                let parent = tree[node].draft_parent();
                let name = tree[node].draft_id();
                let targets: Vec<NodeId> = self
                    .objects()
                    .into_iter()
                    .filter(|&t| t != node && Some(t) != parent && !tree.is_draft_ancestor(node, t))
                    .filter(|&t| tree.find_property(t, name).is_none())
                    .collect();
                let Some(target) = self.pick(&targets) else { return };
                self.editor.move_node(node, target).unwrap_or_else(|e| panic!("seed={seed} move: {e}"));
            }
            4 => {
                let Some(node) = self.pick(&self.properties()) else { return };
                let Some(parent) = self.editor.tree()[node].draft_parent() else { return };
                let name = self.name_under(parent);
                self.retire(node);
                self.editor.set_id(node, &name).unwrap_or_else(|e| panic!("seed={seed} rename: {e}"));
            }
            5 => {
                let Some(node) = self.pick(&self.attached()) else { return };
                let kind = self.random_kind();
                self.editor.change_type(node, kind).unwrap_or_else(|e| panic!("seed={seed} change_type: {e}"));
            }
            6 => self.random_leaf_edit(),
            _ => {
                let Some(array) = self.pick(&self.of_kind(NodeKind::Array)) else { return };
                let kind = self.random_kind();
                let next = self.editor.create_default_node(kind);
                self.editor.replace_items(array, next).unwrap_or_else(|e| panic!("seed={seed} replace_items: {e}"));
            }
        }
    }

    fn random_leaf_edit(&mut self) {
        let seed = self.seed;
        let n = self.rng.gen_range(0..1000);
        let result = match self.rng.gen_range(0..3) {
            0 => {
                let Some(node) = self.pick(&self.of_kind(NodeKind::String)) else { return };
                match self.rng.gen_range(0..4) {
                    0 => self.editor.set_default(node, json!(format!("s{n}"))),
                    1 => self
                        .editor
                        .add_reference(node)
                        .and_then(|_| self.editor.set_reference(node, &format!("t{n}"))),
                    2 => self.editor.set_format(node, Some("date-time")),
                    _ => self.editor.set_formula(node, Some("concat(a, b)")),
                }
            }
            1 => {
                let Some(node) = self.pick(&self.of_kind(NodeKind::Number)) else { return };
                self.editor.set_default(node, json!(n))
            }
            _ => {
                let Some(node) = self.pick(&self.of_kind(NodeKind::Boolean)) else { return };
                self.editor.set_default(node, json!(n % 2 == 0))
            }
        };
        result.unwrap_or_else(|e| panic!("seed={seed} leaf edit: {e}"));
    }

    fn submit(&mut self, step: usize) {
        let draft = self.editor.schema();
        let committed = self.editor.committed_schema();
        let ops = self.editor.submit_changes();
        let applied = apply_schema_patch(committed, &ops)
            .unwrap_or_else(|e| panic!("seed={} step={step} submit patch must apply: {e}", self.seed));
        assert_eq!(normalize_required(&applied), normalize_required(&draft), "seed={} step={step}", self.seed);
        assert_eq!(
            normalize_required(&self.editor.committed_schema()),
            normalize_required(&draft),
            "seed={} step={step} submit must commit the draft",
            self.seed
        );
        assert!(self.editor.patches().is_empty(), "seed={} step={step} patches after submit", self.seed);
        assert!(!self.editor.is_dirty(), "seed={} step={step} dirty after submit", self.seed);
    }

    fn reset(&mut self, step: usize) {
        let committed = self.editor.committed_schema();
        self.editor.reset_changes();
        assert!(self.editor.patches().is_empty(), "seed={} step={step} patches after reset", self.seed);
        assert_eq!(
            normalize_required(&self.editor.schema()),
            normalize_required(&committed),
            "seed={} step={step} reset must restore the committed schema",
            self.seed
        );
        assert!(!self.editor.is_dirty(), "seed={} step={step} dirty after reset", self.seed);
    }
}

fn assert_patch_rebuilds_draft(editor: &SchemaEditor, ops: &[Op], seed: u64, step: usize) {
    let applied = apply_schema_patch(editor.committed_schema(), ops)
        .unwrap_or_else(|e| panic!("seed={seed} step={step} patch must apply: {e}\n{}", to_json_patch(ops)));
    assert_eq!(
        normalize_required(&applied),
        normalize_required(&editor.schema()),
        "seed={seed} step={step} round trip mismatch for patch {}",
        to_json_patch(ops)
    );
}

fn table() -> Value {
    json!({
        "type": "object",
        "properties": {
            "name": {"type": "string", "default": ""},
            "score": {"type": "number", "default": 0},
            "active": {"type": "boolean", "default": false},
            "avatar": {"$ref": "urn:jsonschema:system:file:1.0.0"},
            "meta": {
                "type": "object",
                "properties": {
                    "note": {"type": "string", "default": ""},
                    "inner": {
                        "type": "object",
                        "properties": {"deep": {"type": "number", "default": 1}},
                        "additionalProperties": false,
                        "required": ["deep"]
                    }
                },
                "additionalProperties": false,
                "required": ["note", "inner"]
            },
            "list": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {"label": {"type": "string", "default": ""}},
                    "additionalProperties": false,
                    "required": ["label"]
                }
            }
        },
        "additionalProperties": false,
        "required": ["name", "score", "active", "avatar", "meta", "list"]
    })
}

fn seeds() -> [u64; 24] {
    [
        0x5eed_c0de_u64,
        0x0000_0000_0000_0001_u64,
        0x0000_0000_0000_00ff_u64,
        0x0000_0000_00c0_ffee_u64,
        0x0123_4567_89ab_cdef_u64,
        0x0000_0000_0000_1001_u64,
        0x0000_0000_0000_2002_u64,
        0x0000_0000_0000_3003_u64,
        0x0000_0000_0000_4004_u64,
        0x1111_2222_3333_4444_u64,
        0x2222_3333_4444_5555_u64,
        0x3333_4444_5555_6666_u64,
        0x4444_5555_6666_7777_u64,
        0x89ab_cdef_0123_4567_u64,
        0xfedc_ba98_7654_3210_u64,
        0x1357_9bdf_2468_ace0_u64,
        0x0f0f_f0f0_55aa_aa55_u64,
        0xa5a5_5a5a_dead_beef_u64,
        0x0101_0101_0101_0101_u64,
        0x0202_0202_0202_0202_u64,
        0x0303_0303_0303_0303_u64,
        0x7777_8888_9999_aaaa_u64,
        0xcafe_babe_0000_0001_u64,
        0xdead_0000_beef_0001_u64,
    ]
}
