//! Blueprint model and input format adapters
//!
//! Blueprint documents arrive in two shapes:
//! - entities: `{entities: [...], relationships: [...]}`
//! - legacy: `{object_types: [{table_name, metadata: {fields}}], ...}`
//!
//! Both are normalized into one canonical [`Schema`] at load time.

mod entities;
mod legacy;

pub use entities::EntitiesAdapter;
pub use legacy::LegacyAdapter;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use std::fmt;
use std::path::Path;

use crate::error::SchemaError;

/// Semantic type of a field.
///
/// The vocabulary is open: anything not recognised is kept as `Other`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum FieldType {
    String,
    Float,
    Text,
    Number,
    Boolean,
    Date,
    DateTime,
    Time,
    Array,
    Object,
    Enum,
    Relationship,
    Entity,
    Url,
    Other(String),
}

impl FieldType {
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "string" => FieldType::String,
            "float" => FieldType::Float,
            "text" => FieldType::Text,
            "number" => FieldType::Number,
            "boolean" => FieldType::Boolean,
            "date" => FieldType::Date,
            "datetime" => FieldType::DateTime,
            "time" => FieldType::Time,
            "array" => FieldType::Array,
            "object" => FieldType::Object,
            "enum" => FieldType::Enum,
            "relationship" => FieldType::Relationship,
            "entity" => FieldType::Entity,
            "url" => FieldType::Url,
            other => FieldType::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            FieldType::String => "string",
            FieldType::Float => "float",
            FieldType::Text => "text",
            FieldType::Number => "number",
            FieldType::Boolean => "boolean",
            FieldType::Date => "date",
            FieldType::DateTime => "datetime",
            FieldType::Time => "time",
            FieldType::Array => "array",
            FieldType::Object => "object",
            FieldType::Enum => "enum",
            FieldType::Relationship => "relationship",
            FieldType::Entity => "entity",
            FieldType::Url => "url",
            FieldType::Other(raw) => raw,
        }
    }
}

impl From<String> for FieldType {
    fn from(raw: String) -> Self {
        FieldType::parse(&raw)
    }
}

impl From<FieldType> for String {
    fn from(field_type: FieldType) -> Self {
        field_type.as_str().to_string()
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// A typed field of an entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    #[serde(default)]
    pub description: String,
    /// Related entity for relationship fields; defaults to the field name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
}

impl Field {
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            description: String::new(),
            target: None,
        }
    }

    pub fn relationship(name: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            target: Some(target.into()),
            ..Self::new(name, FieldType::Relationship)
        }
    }

    pub fn is_relationship(&self) -> bool {
        self.field_type == FieldType::Relationship
    }

    pub fn related_entity_name(&self) -> &str {
        self.target.as_deref().unwrap_or(&self.name)
    }
}

/// A schema-declared object type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub name: String,
    pub display_name: String,
    pub description: String,
    pub fields: Vec<Field>,
}

impl Entity {
    pub fn new(name: impl Into<String>, fields: Vec<Field>) -> Self {
        let name = name.into();
        Self {
            display_name: name.clone(),
            name,
            description: String::new(),
            fields,
        }
    }

    /// Non-relationship fields in declaration order
    pub fn scalar_fields(&self) -> impl Iterator<Item = &Field> {
        self.fields.iter().filter(|f| !f.is_relationship())
    }

    pub fn relationship_fields(&self) -> impl Iterator<Item = &Field> {
        self.fields.iter().filter(|f| f.is_relationship())
    }

    /// First field whose name is one of `candidates`
    pub fn display_field<S: AsRef<str>>(&self, candidates: &[S]) -> Option<&Field> {
        self.fields
            .iter()
            .find(|f| candidates.iter().any(|c| c.as_ref() == f.name))
    }
}

/// A named, schema-level link between two entities
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relationship {
    pub name: String,
    pub display_name: String,
    pub description: String,
    pub source: Option<String>,
    pub target: Option<String>,
    pub table: Option<String>,
}

/// Canonical blueprint: entities plus relationships
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Schema {
    entities: Vec<Entity>,
    relationships: Vec<Relationship>,
}

impl Schema {
    /// Build a schema, rejecting duplicate entity names
    pub fn new(
        entities: Vec<Entity>,
        relationships: Vec<Relationship>,
    ) -> Result<Self, SchemaError> {
        let mut seen = HashSet::new();
        for entity in &entities {
            if !seen.insert(entity.name.as_str()) {
                return Err(SchemaError::DuplicateEntity(entity.name.clone()));
            }
        }
        Ok(Self {
            entities,
            relationships,
        })
    }

    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    pub fn relationships(&self) -> &[Relationship] {
        &self.relationships
    }

    pub fn entity(&self, name: &str) -> Option<&Entity> {
        self.entities.iter().find(|e| e.name == name)
    }

    /// Relationship fields whose related entity is not in this schema
    pub fn dangling_relationships(&self) -> Vec<(&Entity, &Field)> {
        self.entities
            .iter()
            .flat_map(|e| e.relationship_fields().map(move |f| (e, f)))
            .filter(|(_, f)| self.entity(f.related_entity_name()).is_none())
            .collect()
    }

    /// Schema-level relationships touching the given entity
    pub fn relationships_for(&self, entity: &str) -> Vec<&Relationship> {
        self.relationships
            .iter()
            .filter(|r| {
                r.source.as_deref() == Some(entity) || r.target.as_deref() == Some(entity)
            })
            .collect()
    }
}

/// A blueprint input format
pub trait SchemaAdapter: Send + Sync {
    /// Format identifier used in configuration
    fn id(&self) -> &str;

    fn description(&self) -> &str;

    /// Whether a parsed document looks like this format
    fn detects(&self, document: &Value) -> bool;

    /// Convert the document into the canonical schema
    fn normalize(&self, document: Value) -> Result<Schema, SchemaError>;
}

/// Registry of known blueprint formats
pub struct AdapterRegistry {
    adapters: Vec<Box<dyn SchemaAdapter>>,
}

impl Default for AdapterRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl AdapterRegistry {
    pub fn new() -> Self {
        let mut registry = Self { adapters: vec![] };
        registry.register(Box::new(EntitiesAdapter));
        registry.register(Box::new(LegacyAdapter));
        registry
    }

    pub fn register(&mut self, adapter: Box<dyn SchemaAdapter>) {
        self.adapters.push(adapter);
    }

    pub fn get_adapter(&self, id: &str) -> Option<&dyn SchemaAdapter> {
        self.adapters
            .iter()
            .find(|a| a.id() == id)
            .map(|a| a.as_ref())
    }

    pub fn detect(&self, document: &Value) -> Option<&dyn SchemaAdapter> {
        self.adapters
            .iter()
            .find(|a| a.detects(document))
            .map(|a| a.as_ref())
    }

    /// Normalize a document with a forced adapter, or whichever detects it
    pub fn normalize(
        &self,
        document: Value,
        format: Option<&str>,
    ) -> Result<(Schema, &dyn SchemaAdapter), SchemaError> {
        let adapter = match format {
            Some(id) => self
                .get_adapter(id)
                .ok_or_else(|| SchemaError::UnknownAdapter(id.to_string()))?,
            None => self.detect(&document).ok_or_else(|| SchemaError::UnknownFormat {
                expected: self
                    .adapters
                    .iter()
                    .map(|a| a.id())
                    .collect::<Vec<_>>()
                    .join(", "),
            })?,
        };
        tracing::debug!(adapter = adapter.id(), "normalizing blueprint");
        let schema = adapter.normalize(document)?;
        Ok((schema, adapter))
    }
}

/// Read a blueprint file (JSON for `.json`, YAML otherwise) and normalize it
pub fn load_schema<'r>(
    registry: &'r AdapterRegistry,
    path: &Path,
    format: Option<&str>,
) -> Result<(Schema, &'r dyn SchemaAdapter), SchemaError> {
    let content = std::fs::read_to_string(path).map_err(|source| SchemaError::Io {
        path: path.display().to_string(),
        source,
    })?;

    let is_json = path.extension().map(|e| e == "json").unwrap_or(false);
    let document: Value = if is_json {
        serde_json::from_str(&content).map_err(|e| SchemaError::Parse(e.to_string()))?
    } else {
        serde_yaml::from_str(&content).map_err(|e| SchemaError::Parse(e.to_string()))?
    };

    registry.normalize(document, format)
}
