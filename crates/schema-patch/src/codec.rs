//! JSON codec for schema patches.
//!
//! Converts operations to and from their RFC 6902 `serde_json::Value` form,
//! which is what the commit-changes call sends over the wire.

use serde_json::{json, Map, Value};

use crate::pointer::{format_json_pointer, parse_json_pointer, Path};
use crate::types::{Op, PatchError};

// ── Path helpers ──────────────────────────────────────────────────────────

fn encode_path(path: &[String]) -> Value {
    Value::String(format_json_pointer(path))
}

fn decode_path(obj: &Map<String, Value>, key: &str, op: &str) -> Result<Path, PatchError> {
    let raw = obj
        .get(key)
        .ok_or_else(|| PatchError::InvalidOp(format!("{op} requires '{key}'")))?;
    let pointer = raw
        .as_str()
        .ok_or_else(|| PatchError::InvalidOp(format!("'{key}' must be a string")))?;
    Ok(parse_json_pointer(pointer))
}

fn decode_value(obj: &Map<String, Value>, op: &str) -> Result<Value, PatchError> {
    obj.get("value")
        .cloned()
        .ok_or_else(|| PatchError::InvalidOp(format!("{op} requires 'value'")))
}

// ── Serialization ─────────────────────────────────────────────────────────

/// Serialize an `Op` to its JSON Patch object.
pub fn to_json(op: &Op) -> Value {
    match op {
        Op::Add { path, value } => json!({
            "op": "add",
            "path": encode_path(path),
            "value": value
        }),
        Op::Remove { path } => json!({
            "op": "remove",
            "path": encode_path(path)
        }),
        Op::Replace { path, value } => json!({
            "op": "replace",
            "path": encode_path(path),
            "value": value
        }),
        Op::Move { from, path } => json!({
            "op": "move",
            "from": encode_path(from),
            "path": encode_path(path)
        }),
    }
}

/// Serialize a list of operations into a JSON array.
pub fn to_json_patch(ops: &[Op]) -> Value {
    Value::Array(ops.iter().map(to_json).collect())
}

// ── Deserialization ───────────────────────────────────────────────────────

/// Deserialize a JSON Patch object into an `Op`.
pub fn from_json(v: &Value) -> Result<Op, PatchError> {
    let obj = v
        .as_object()
        .ok_or_else(|| PatchError::InvalidOp("operation must be an object".into()))?;
    let op = obj
        .get("op")
        .and_then(Value::as_str)
        .ok_or_else(|| PatchError::InvalidOp("missing 'op' field".into()))?;

    match op {
        "add" => Ok(Op::Add {
            path: decode_path(obj, "path", op)?,
            value: decode_value(obj, op)?,
        }),
        "remove" => Ok(Op::Remove {
            path: decode_path(obj, "path", op)?,
        }),
        "replace" => Ok(Op::Replace {
            path: decode_path(obj, "path", op)?,
            value: decode_value(obj, op)?,
        }),
        "move" => Ok(Op::Move {
            from: decode_path(obj, "from", op)?,
            path: decode_path(obj, "path", op)?,
        }),
        other => Err(PatchError::InvalidOp(format!("unsupported op: {other}"))),
    }
}

/// Deserialize a JSON array into a list of operations.
pub fn from_json_patch(v: &Value) -> Result<Vec<Op>, PatchError> {
    let arr = v
        .as_array()
        .ok_or_else(|| PatchError::InvalidOp("patch must be an array".into()))?;
    arr.iter().map(from_json).collect()
}
