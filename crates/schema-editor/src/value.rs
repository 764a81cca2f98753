//! Row values shaped by a table schema.

use indexmap::IndexMap;
use serde_json::{Map, Number, Value};

use crate::error::SchemaError;
use crate::system_schema::SystemSchemaId;

/// A typed row value. Object keys keep schema property order.
#[derive(Debug, Clone, PartialEq)]
pub enum ValueNode {
    Object(IndexMap<String, ValueNode>),
    Array(Vec<ValueNode>),
    String(String),
    Number(Number),
    Boolean(bool),
}

impl ValueNode {
    /// Property of an Object value.
    pub fn get(&self, key: &str) -> Result<&ValueNode, SchemaError> {
        match self {
            ValueNode::Object(map) => map.get(key).ok_or_else(|| SchemaError::PropertyNotFound(key.to_string())),
            _ => Err(SchemaError::PropertyNotFound(key.to_string())),
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            ValueNode::Object(map) => {
                Value::Object(map.iter().map(|(k, v)| (k.clone(), v.to_json())).collect::<Map<_, _>>())
            }
            ValueNode::Array(items) => Value::Array(items.iter().map(ValueNode::to_json).collect()),
            ValueNode::String(s) => Value::String(s.clone()),
            ValueNode::Number(n) => Value::Number(n.clone()),
            ValueNode::Boolean(b) => Value::Bool(*b),
        }
    }
}

/// Builds the value for `raw` under `schema`. Missing data falls back to the
/// schema's defaults; `$ref`s resolve through [`SystemSchemaId`].
pub fn create_value_node(schema: &Value, raw: Option<&Value>) -> Result<ValueNode, SchemaError> {
    let raw = raw.filter(|v| !v.is_null());
    if let Some(reference) = schema.get("$ref") {
        let resolved = reference
            .as_str()
            .and_then(SystemSchemaId::from_urn)
            .ok_or_else(|| SchemaError::UnknownSchemaType(schema.clone()))?;
        return create_value_node(&resolved.schema(), raw);
    }

    match schema.get("type").and_then(Value::as_str) {
        Some("object") => {
            let data = match raw {
                None => None,
                Some(Value::Object(map)) => Some(map),
                Some(other) => return Err(mismatch("object", other)),
            };
            let mut out = IndexMap::new();
            if let Some(Value::Object(props)) = schema.get("properties") {
                for (key, child) in props {
                    let value = create_value_node(child, data.and_then(|d| d.get(key)))?;
                    out.insert(key.clone(), value);
                }
            }
            Ok(ValueNode::Object(out))
        }
        Some("array") => {
            let items = schema.get("items").ok_or(SchemaError::MissingItems)?;
            match raw {
                None => Ok(ValueNode::Array(Vec::new())),
                Some(Value::Array(elements)) => elements
                    .iter()
                    .map(|el| create_value_node(items, Some(el)))
                    .collect::<Result<_, _>>()
                    .map(ValueNode::Array),
                Some(other) => Err(mismatch("array", other)),
            }
        }
        Some("string") => match raw.or_else(|| schema.get("default")) {
            None => Ok(ValueNode::String(String::new())),
            Some(Value::String(s)) => Ok(ValueNode::String(s.clone())),
            Some(other) => Err(mismatch("string", other)),
        },
        Some("number") => match raw.or_else(|| schema.get("default")) {
            None => Ok(ValueNode::Number(Number::from(0))),
            Some(Value::Number(n)) => Ok(ValueNode::Number(n.clone())),
            Some(other) => Err(mismatch("number", other)),
        },
        Some("boolean") => match raw.or_else(|| schema.get("default")) {
            None => Ok(ValueNode::Boolean(false)),
            Some(Value::Bool(b)) => Ok(ValueNode::Boolean(*b)),
            Some(other) => Err(mismatch("boolean", other)),
        },
        _ => Err(SchemaError::UnknownSchemaType(schema.clone())),
    }
}

fn mismatch(expected: &'static str, value: &Value) -> SchemaError {
    SchemaError::TypeMismatch { expected, value: value.clone() }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn schema() -> Value {
        json!({
            "type": "object",
            "properties": {
                "name": {"type": "string", "default": "anon"},
                "age": {"type": "number", "default": 18},
                "tags": {"type": "array", "items": {"type": "string", "default": ""}},
                "avatar": {"$ref": SystemSchemaId::File.urn()}
            },
            "additionalProperties": false,
            "required": ["name", "age", "tags", "avatar"]
        })
    }

    #[test]
    fn missing_data_uses_defaults() {
        let value = create_value_node(&schema(), None).unwrap();
        assert_eq!(value.get("name").unwrap(), &ValueNode::String("anon".into()));
        assert_eq!(value.get("age").unwrap().to_json(), json!(18));
        assert_eq!(value.get("tags").unwrap(), &ValueNode::Array(Vec::new()));
        assert_eq!(value.get("avatar").unwrap().get("fileName").unwrap(), &ValueNode::String(String::new()));
    }

    #[test]
    fn data_overrides_defaults_and_roundtrips() {
        let raw = json!({"name": "ada", "age": 36, "tags": ["math"]});
        let value = create_value_node(&schema(), Some(&raw)).unwrap();
        let json = value.to_json();
        assert_eq!(json["name"], "ada");
        assert_eq!(json["tags"], json!(["math"]));
        assert_eq!(json["avatar"]["size"], json!(0));
    }

    #[test]
    fn unknown_property_and_type() {
        let value = create_value_node(&schema(), None).unwrap();
        assert_eq!(value.get("nope"), Err(SchemaError::PropertyNotFound("nope".into())));
        assert!(matches!(
            create_value_node(&json!({"type": "date"}), None),
            Err(SchemaError::UnknownSchemaType(_))
        ));
        assert!(matches!(
            create_value_node(&schema(), Some(&json!({"age": "old"}))),
            Err(SchemaError::TypeMismatch { expected: "number", .. })
        ));
    }
}
