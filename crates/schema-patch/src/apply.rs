//! Patch application.
//!
//! Plain RFC 6902 semantics for `add`/`remove`/`replace`/`move`, plus an
//! optional schema-aware mode that keeps every object schema's `required`
//! list in step with its `properties` (the editor never emits patches for
//! `required`; the receiving side derives it).

use serde_json::{Map, Value};

use crate::pointer::{format_json_pointer, is_child, split_property_path, PROPERTIES};
use crate::types::{ApplyPatchOptions, Op, PatchError};

// ── Path navigation ───────────────────────────────────────────────────────

fn get_mut_at<'a>(doc: &'a mut Value, path: &[String]) -> Result<&'a mut Value, PatchError> {
    doc.pointer_mut(&format_json_pointer(path))
        .ok_or_else(|| PatchError::NotFound(format_json_pointer(path)))
}

fn parse_index(key: &str, path: &[String]) -> Result<usize, PatchError> {
    key.parse()
        .map_err(|_| PatchError::InvalidIndex(format_json_pointer(path)))
}

// ── Individual operation applicators ─────────────────────────────────────

fn apply_add(doc: &mut Value, path: &[String], value: Value) -> Result<Option<Value>, PatchError> {
    let Some((key, parent_path)) = path.split_last() else {
        return Ok(Some(std::mem::replace(doc, value)));
    };
    match get_mut_at(doc, parent_path)? {
        Value::Object(map) => Ok(map.insert(key.clone(), value)),
        Value::Array(arr) => {
            if key == "-" {
                arr.push(value);
                return Ok(None);
            }
            let idx = parse_index(key, path)?;
            if idx > arr.len() {
                return Err(PatchError::InvalidIndex(format_json_pointer(path)));
            }
            arr.insert(idx, value);
            Ok(None)
        }
        _ => Err(PatchError::InvalidTarget(format_json_pointer(path))),
    }
}

fn apply_remove(doc: &mut Value, path: &[String]) -> Result<Value, PatchError> {
    let Some((key, parent_path)) = path.split_last() else {
        return Err(PatchError::InvalidTarget(String::new()));
    };
    match get_mut_at(doc, parent_path)? {
        Value::Object(map) => map
            .shift_remove(key)
            .ok_or_else(|| PatchError::NotFound(format_json_pointer(path))),
        Value::Array(arr) => {
            let idx = parse_index(key, path)?;
            if idx >= arr.len() {
                return Err(PatchError::NotFound(format_json_pointer(path)));
            }
            Ok(arr.remove(idx))
        }
        _ => Err(PatchError::InvalidTarget(format_json_pointer(path))),
    }
}

fn apply_replace(doc: &mut Value, path: &[String], value: Value) -> Result<Value, PatchError> {
    if path.is_empty() {
        return Ok(std::mem::replace(doc, value));
    }
    let target = get_mut_at(doc, path)?;
    Ok(std::mem::replace(target, value))
}

fn apply_move(doc: &mut Value, from: &[String], path: &[String]) -> Result<Option<Value>, PatchError> {
    if is_child(from, path) {
        return Err(PatchError::InvalidTarget(format_json_pointer(path)));
    }
    if from == path {
        return Ok(None);
    }
    let value = apply_remove(doc, from)?;
    apply_add(doc, path, value)
}

// ── Schema awareness ──────────────────────────────────────────────────────

/// Rewrites `required` of the object schema at `owner` to list its property
/// keys in order. Silently does nothing when `owner` is not an object schema.
fn sync_required_at(doc: &mut Value, owner: &[String]) {
    let Some(Value::Object(schema)) = doc.pointer_mut(&format_json_pointer(owner)) else {
        return;
    };
    let keys: Vec<Value> = match schema.get(PROPERTIES) {
        Some(Value::Object(props)) => props.keys().cloned().map(Value::String).collect(),
        _ => return,
    };
    schema.insert("required".to_string(), Value::Array(keys));
}

fn touched_owners(op: &Op) -> Vec<&[String]> {
    let mut owners = Vec::with_capacity(2);
    if let Some(from) = op.from() {
        if let Some((owner, _)) = split_property_path(from) {
            owners.push(owner);
        }
    }
    if let Some((owner, _)) = split_property_path(op.path()) {
        owners.push(owner);
    }
    owners
}

// ── Main apply functions ──────────────────────────────────────────────────

/// Apply a single operation to the document in place.
///
/// Returns the value previously stored at the target path, if any.
pub fn apply_op(doc: &mut Value, op: &Op) -> Result<Option<Value>, PatchError> {
    match op {
        Op::Add { path, value } => apply_add(doc, path, value.clone()),
        Op::Remove { path } => apply_remove(doc, path).map(Some),
        Op::Replace { path, value } => apply_replace(doc, path, value.clone()).map(Some),
        Op::Move { from, path } => apply_move(doc, from, path),
    }
}

/// Apply a sequence of operations, consuming and returning the document.
pub fn apply_patch(mut doc: Value, ops: &[Op], options: &ApplyPatchOptions) -> Result<Value, PatchError> {
    for op in ops {
        apply_op(&mut doc, op)?;
        if options.sync_required {
            for owner in touched_owners(op) {
                sync_required_at(&mut doc, owner);
            }
        }
    }
    Ok(doc)
}

/// Apply a sequence of operations to a table schema, keeping `required`
/// lists consistent with `properties`.
pub fn apply_schema_patch(doc: Value, ops: &[Op]) -> Result<Value, PatchError> {
    apply_patch(doc, ops, &ApplyPatchOptions { sync_required: true })
}

/// Returns a copy of `schema` with every `required` list sorted, so that two
/// schemas differing only in property order compare equal.
pub fn normalize_required(schema: &Value) -> Value {
    match schema {
        Value::Object(map) => {
            let mut out = Map::with_capacity(map.len());
            for (k, v) in map {
                let v = match (k.as_str(), v) {
                    ("required", Value::Array(keys)) => {
                        let mut keys = keys.clone();
                        keys.sort_by(|a, b| a.as_str().cmp(&b.as_str()));
                        Value::Array(keys)
                    }
                    _ => normalize_required(v),
                };
                out.insert(k.clone(), v);
            }
            Value::Object(out)
        }
        Value::Array(items) => Value::Array(items.iter().map(normalize_required).collect()),
        other => other.clone(),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pointer::parse_json_pointer;
    use serde_json::json;

    fn path(s: &str) -> Vec<String> {
        parse_json_pointer(s)
    }

    #[test]
    fn add_to_object() {
        let mut doc = json!({"a": 1});
        apply_op(&mut doc, &Op::Add { path: path("/b"), value: json!(2) }).unwrap();
        assert_eq!(doc, json!({"a": 1, "b": 2}));
    }

    #[test]
    fn add_to_array() {
        let mut doc = json!([1, 3]);
        apply_op(&mut doc, &Op::Add { path: path("/1"), value: json!(2) }).unwrap();
        apply_op(&mut doc, &Op::Add { path: path("/-"), value: json!(4) }).unwrap();
        assert_eq!(doc, json!([1, 2, 3, 4]));
    }

    #[test]
    fn remove_missing_key_is_not_found() {
        let mut doc = json!({"a": 1});
        let err = apply_op(&mut doc, &Op::Remove { path: path("/b") }).unwrap_err();
        assert_eq!(err, PatchError::NotFound("/b".into()));
    }

    #[test]
    fn replace_root() {
        let mut doc = json!({"a": 1});
        let old = apply_op(&mut doc, &Op::Replace { path: vec![], value: json!(5) }).unwrap();
        assert_eq!(old, Some(json!({"a": 1})));
        assert_eq!(doc, json!(5));
    }

    #[test]
    fn replace_requires_existing_target() {
        let mut doc = json!({"a": 1});
        assert!(apply_op(&mut doc, &Op::Replace { path: path("/b"), value: json!(1) }).is_err());
    }

    #[test]
    fn move_op() {
        let mut doc = json!({"a": {"x": 1}, "b": {}});
        apply_op(&mut doc, &Op::Move { from: path("/a/x"), path: path("/b/y") }).unwrap();
        assert_eq!(doc, json!({"a": {}, "b": {"y": 1}}));
    }

    #[test]
    fn move_into_own_child_fails() {
        let mut doc = json!({"a": {"b": {}}});
        let op = Op::Move { from: path("/a"), path: path("/a/b/c") };
        assert!(matches!(apply_op(&mut doc, &op), Err(PatchError::InvalidTarget(_))));
    }

    #[test]
    fn move_onto_itself_is_noop() {
        let mut doc = json!({"a": 1, "b": 2});
        apply_op(&mut doc, &Op::Move { from: path("/a"), path: path("/a") }).unwrap();
        assert_eq!(doc, json!({"a": 1, "b": 2}));
    }

    #[test]
    fn schema_patch_keeps_required_in_step() {
        let schema = json!({
            "type": "object",
            "properties": {"a": {"type": "string", "default": ""}},
            "additionalProperties": false,
            "required": ["a"]
        });
        let ops = vec![
            Op::Add {
                path: path("/properties/b"),
                value: json!({"type": "number", "default": 0}),
            },
            Op::Move { from: path("/properties/a"), path: path("/properties/c") },
        ];
        let out = apply_schema_patch(schema, &ops).unwrap();
        assert_eq!(out["required"], json!(["b", "c"]));
    }

    #[test]
    fn plain_patch_leaves_required_alone() {
        let schema = json!({"properties": {"a": {}}, "required": ["a"]});
        let ops = vec![Op::Remove { path: path("/properties/a") }];
        let out = apply_patch(schema, &ops, &ApplyPatchOptions::default()).unwrap();
        assert_eq!(out["required"], json!(["a"]));
    }

    #[test]
    fn normalize_sorts_nested_required() {
        let schema = json!({
            "required": ["b", "a"],
            "properties": {"o": {"required": ["z", "y"]}}
        });
        let out = normalize_required(&schema);
        assert_eq!(out["required"], json!(["a", "b"]));
        assert_eq!(out["properties"]["o"]["required"], json!(["y", "z"]));
    }
}
