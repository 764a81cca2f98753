//! Built-in `$ref` targets.

use serde_json::{json, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SystemSchemaId {
    RowId,
    RowVersionId,
    RowCreatedId,
    RowCreatedAt,
    RowPublishedAt,
    RowUpdatedAt,
    RowHash,
    RowSchemaHash,
    File,
}

impl SystemSchemaId {
    pub const ALL: [SystemSchemaId; 9] = [
        SystemSchemaId::RowId,
        SystemSchemaId::RowVersionId,
        SystemSchemaId::RowCreatedId,
        SystemSchemaId::RowCreatedAt,
        SystemSchemaId::RowPublishedAt,
        SystemSchemaId::RowUpdatedAt,
        SystemSchemaId::RowHash,
        SystemSchemaId::RowSchemaHash,
        SystemSchemaId::File,
    ];

    pub fn urn(self) -> &'static str {
        match self {
            SystemSchemaId::RowId => "urn:jsonschema:system:row-id:1.0.0",
            SystemSchemaId::RowVersionId => "urn:jsonschema:system:row-version-id:1.0.0",
            SystemSchemaId::RowCreatedId => "urn:jsonschema:system:row-created-id:1.0.0",
            SystemSchemaId::RowCreatedAt => "urn:jsonschema:system:row-created-at:1.0.0",
            SystemSchemaId::RowPublishedAt => "urn:jsonschema:system:row-published-at:1.0.0",
            SystemSchemaId::RowUpdatedAt => "urn:jsonschema:system:row-updated-at:1.0.0",
            SystemSchemaId::RowHash => "urn:jsonschema:system:row-hash:1.0.0",
            SystemSchemaId::RowSchemaHash => "urn:jsonschema:system:row-schema-hash:1.0.0",
            SystemSchemaId::File => "urn:jsonschema:system:file:1.0.0",
        }
    }

    pub fn from_urn(urn: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|id| id.urn() == urn)
    }

    /// The schema a `$ref` to this id stands for.
    pub fn schema(self) -> Value {
        match self {
            SystemSchemaId::RowCreatedAt | SystemSchemaId::RowPublishedAt | SystemSchemaId::RowUpdatedAt => {
                json!({"type": "string", "default": "", "format": "date-time", "readOnly": true})
            }
            SystemSchemaId::File => file_schema(),
            _ => json!({"type": "string", "default": "", "readOnly": true}),
        }
    }
}

fn file_schema() -> Value {
    let ro_string = json!({"type": "string", "default": "", "readOnly": true});
    let ro_number = json!({"type": "number", "default": 0, "readOnly": true});
    json!({
        "type": "object",
        "properties": {
            "status": ro_string,
            "fileId": ro_string,
            "url": ro_string,
            "fileName": {"type": "string", "default": ""},
            "hash": ro_string,
            "extension": ro_string,
            "mimeType": ro_string,
            "size": ro_number,
            "width": ro_number,
            "height": ro_number
        },
        "additionalProperties": false,
        "required": [
            "status", "fileId", "url", "fileName", "hash",
            "extension", "mimeType", "size", "width", "height"
        ]
    })
}
