//! Entities blueprint format
//!
//! ```json
//! {
//!   "entities": [{"name": "Individual", "display_name": "Person",
//!                 "fields": [{"name": "first_name", "type": "string"}]}],
//!   "relationships": [{"name": "member_of", "source": "Individual", "target": "Group"}]
//! }
//! ```

use serde::Deserialize;
use serde_json::Value;

use super::{Entity, Field, Relationship, Schema, SchemaAdapter};
use crate::error::SchemaError;

pub struct EntitiesAdapter;

#[derive(Debug, Deserialize)]
struct EntitiesDocument {
    entities: Vec<RawEntity>,
    #[serde(default)]
    relationships: Vec<RawRelationship>,
}

#[derive(Debug, Deserialize)]
struct RawEntity {
    name: String,
    #[serde(alias = "displayName")]
    display_name: Option<String>,
    description: Option<String>,
    #[serde(default)]
    fields: Vec<Field>,
}

#[derive(Debug, Deserialize)]
pub(super) struct RawRelationship {
    pub name: String,
    #[serde(alias = "displayName")]
    pub display_name: Option<String>,
    pub description: Option<String>,
    #[serde(alias = "source_entity")]
    pub source: Option<String>,
    #[serde(alias = "target_entity")]
    pub target: Option<String>,
    #[serde(alias = "table_name")]
    pub table: Option<String>,
}

impl RawRelationship {
    pub(super) fn into_relationship(self) -> Relationship {
        Relationship {
            display_name: self.display_name.unwrap_or_else(|| self.name.clone()),
            name: self.name,
            description: self.description.unwrap_or_default(),
            source: self.source,
            target: self.target,
            table: self.table,
        }
    }
}

impl SchemaAdapter for EntitiesAdapter {
    fn id(&self) -> &str {
        "entities"
    }

    fn description(&self) -> &str {
        "entities/fields/relationships blueprint"
    }

    fn detects(&self, document: &Value) -> bool {
        document.get("entities").map(Value::is_array).unwrap_or(false)
    }

    fn normalize(&self, document: Value) -> Result<Schema, SchemaError> {
        let doc: EntitiesDocument =
            serde_json::from_value(document).map_err(|e| SchemaError::Parse(e.to_string()))?;

        let entities = doc
            .entities
            .into_iter()
            .map(|raw| Entity {
                display_name: raw.display_name.unwrap_or_else(|| raw.name.clone()),
                name: raw.name,
                description: raw.description.unwrap_or_default(),
                fields: raw.fields,
            })
            .collect();

        Schema::new(
            entities,
            doc.relationships
                .into_iter()
                .map(RawRelationship::into_relationship)
                .collect(),
        )
    }
}
