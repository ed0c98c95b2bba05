//! Legacy object-type blueprint format
//!
//! ```json
//! {
//!   "object_types": [{"name": "Person", "table_name": "Individual",
//!                     "metadata": {"fields": [{"name": "first_name", "type": "string"}]}}],
//!   "relationship_types": [{"name": "member_of", "table_name": "memberships"}]
//! }
//! ```
//!
//! The API exposes object types under their table name, so `table_name`
//! becomes the canonical entity name and `name` the display name.

use serde::Deserialize;
use serde_json::Value;

use super::entities::RawRelationship;
use super::{Entity, Field, Schema, SchemaAdapter};
use crate::error::SchemaError;

pub struct LegacyAdapter;

#[derive(Debug, Deserialize)]
struct LegacyDocument {
    object_types: Vec<ObjectType>,
    #[serde(default, alias = "relationships")]
    relationship_types: Vec<RawRelationship>,
}

#[derive(Debug, Deserialize)]
struct ObjectType {
    name: String,
    table_name: Option<String>,
    description: Option<String>,
    #[serde(default)]
    metadata: ObjectMetadata,
}

#[derive(Debug, Default, Deserialize)]
struct ObjectMetadata {
    #[serde(default)]
    fields: Vec<Field>,
}

impl SchemaAdapter for LegacyAdapter {
    fn id(&self) -> &str {
        "legacy"
    }

    fn description(&self) -> &str {
        "object_types/table_name/metadata.fields blueprint"
    }

    fn detects(&self, document: &Value) -> bool {
        document
            .get("object_types")
            .map(Value::is_array)
            .unwrap_or(false)
    }

    fn normalize(&self, document: Value) -> Result<Schema, SchemaError> {
        let doc: LegacyDocument =
            serde_json::from_value(document).map_err(|e| SchemaError::Parse(e.to_string()))?;

        let entities = doc
            .object_types
            .into_iter()
            .map(|object| {
                let name = object
                    .table_name
                    .filter(|t| !t.is_empty())
                    .unwrap_or_else(|| object.name.clone());
                Entity {
                    name,
                    display_name: object.name,
                    description: object.description.unwrap_or_default(),
                    fields: object.metadata.fields,
                }
            })
            .collect();

        Schema::new(
            entities,
            doc.relationship_types
                .into_iter()
                .map(RawRelationship::into_relationship)
                .collect(),
        )
    }
}
