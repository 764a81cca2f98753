use schema_patch::{apply_schema_patch, from_json_patch, normalize_required, to_json_patch, Op, PatchError};
use serde_json::{json, Value};

fn table() -> Value {
    json!({
        "type": "object",
        "properties": {
            "name": {"type": "string", "default": ""},
            "tags": {
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
        "required": ["name", "tags"]
    })
}

#[test]
fn nested_items_patch_matrix() {
    let ops = from_json_patch(&json!([
        {"op": "add", "path": "/properties/tags/items/properties/color",
         "value": {"type": "string", "default": "red"}},
        {"op": "move", "from": "/properties/name", "path": "/properties/tags/items/properties/name"},
        {"op": "replace", "path": "/properties/tags/items/properties/label",
         "value": {"type": "number", "default": 0}}
    ]))
    .expect("patch must decode");

    let out = apply_schema_patch(table(), &ops).expect("patch must apply");
    let expected = json!({
        "type": "object",
        "properties": {
            "tags": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "label": {"type": "number", "default": 0},
                        "color": {"type": "string", "default": "red"},
                        "name": {"type": "string", "default": ""}
                    },
                    "additionalProperties": false,
                    "required": ["label", "color", "name"]
                }
            }
        },
        "additionalProperties": false,
        "required": ["tags"]
    });
    assert_eq!(normalize_required(&out), normalize_required(&expected));
}

#[test]
fn failing_op_reports_its_pointer() {
    let ops = vec![Op::Remove { path: vec!["properties".into(), "missing".into()] }];
    assert_eq!(
        apply_schema_patch(table(), &ops),
        Err(PatchError::NotFound("/properties/missing".into()))
    );
}

#[test]
fn encoded_patch_is_wire_format() {
    let ops = vec![
        Op::Remove { path: vec!["properties".into(), "name".into()] },
        Op::Replace { path: vec![], value: json!({"type": "boolean", "default": false}) },
    ];
    assert_eq!(
        to_json_patch(&ops),
        json!([
            {"op": "remove", "path": "/properties/name"},
            {"op": "replace", "path": "", "value": {"type": "boolean", "default": false}}
        ])
    );
}
