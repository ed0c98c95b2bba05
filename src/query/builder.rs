//! Query synthesis from blueprint metadata
//!
//! All builders are pure functions of the schema. A missing entity is a
//! normal "nothing to render" outcome and comes back as `None`.

use super::filter::{comparison_for, DATE_TERM, NUMBER_TERM, SEARCH_TERM};
use super::{
    collection_name, graphql_name, FieldSelection, InputValue, QueryDocument, Selection,
    VariableDefinition, VariableType,
};
use crate::config::SearchConfig;
use crate::schema::{Entity, Schema};

const NODE_ID: &str = "nodeId";

/// Options for metadata search synthesis
#[derive(Debug, Clone)]
pub struct SearchOptions {
    /// Field names that make an entity searchable
    pub display_fields: Vec<String>,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            display_fields: vec!["name".to_string(), "first_name".to_string()],
        }
    }
}

impl From<&SearchConfig> for SearchOptions {
    fn from(config: &SearchConfig) -> Self {
        Self {
            display_fields: config.display_fields.clone(),
        }
    }
}

/// `nodeId` followed by the entity's non-relationship fields
fn scalar_selections(entity: &Entity) -> Vec<Selection> {
    std::iter::once(Selection::from(NODE_ID))
        .chain(entity.scalar_fields().map(|f| Selection::from(f.name.as_str())))
        .collect()
}

/// `edges { node { ... } }` wrapper around a node selection set
fn edges(node_selections: Vec<Selection>) -> FieldSelection {
    let node = FieldSelection {
        selections: node_selections,
        ..FieldSelection::new("node")
    };
    FieldSelection::new("edges").select(node)
}

/// Flat fetch of every non-relationship field of one entity
pub fn build_entity_query(schema: &Schema, entity_name: &str) -> Option<QueryDocument> {
    let entity = schema.entity(entity_name)?;

    let collection =
        FieldSelection::new(collection_name(&entity.name)).select(edges(scalar_selections(entity)));

    Some(QueryDocument::new(format!("{}Query", graphql_name(&entity.name))).select(collection))
}

/// Metadata search across all entities with the default display fields
pub fn build_metadata_search_query(schema: &Schema) -> QueryDocument {
    build_metadata_search_query_with(schema, &SearchOptions::default())
}

/// Metadata search across every entity that has a display field.
///
/// Each searchable entity contributes one aliased collection whose filter
/// OR-combines a comparison per non-relationship field. Entities without a
/// display field are left out. When none qualifies the document has no
/// root selections ([`QueryDocument::is_empty`]) and must not be sent.
///
/// `float` fields are compared against `$numberTerm`, declared `Int`, so
/// only whole-number search terms can match them.
pub fn build_metadata_search_query_with(schema: &Schema, options: &SearchOptions) -> QueryDocument {
    let mut doc = QueryDocument::new("MetadataSearch")
        .variable(VariableDefinition::required(SEARCH_TERM, VariableType::String))
        .variable(VariableDefinition::optional(NUMBER_TERM, VariableType::Int))
        .variable(VariableDefinition::optional(DATE_TERM, VariableType::Date));

    for entity in schema.entities() {
        if entity.display_field(&options.display_fields).is_none() {
            tracing::debug!(entity = %entity.name, "no display field, skipping in search");
            continue;
        }

        let conditions: Vec<InputValue> = entity
            .scalar_fields()
            .map(|field| {
                let (op, term) = comparison_for(&field.field_type);
                InputValue::Object(vec![(
                    field.name.clone(),
                    InputValue::object(vec![(op.as_str(), InputValue::variable(term.variable_name()))]),
                )])
            })
            .collect();

        if conditions.is_empty() {
            tracing::debug!(entity = %entity.name, "no filterable fields, skipping in search");
            continue;
        }

        let filter = InputValue::object(vec![("or", InputValue::List(conditions))]);
        let collection = FieldSelection::new(collection_name(&entity.name))
            .alias(graphql_name(&entity.name))
            .argument("filter", filter)
            .select(edges(scalar_selections(entity)));

        doc = doc.select(collection);
    }

    doc
}

/// Traversal from one node of `entity_name` to its related entities.
///
/// Relationship fields whose related entity is not in the schema are logged
/// and left out; the rest of the query is still produced.
pub fn build_connections_query(schema: &Schema, entity_name: &str) -> Option<QueryDocument> {
    let entity = schema.entity(entity_name)?;

    let mut fragment = entity
        .scalar_fields()
        .map(|f| Selection::from(f.name.as_str()))
        .collect::<Vec<_>>();

    for field in entity.relationship_fields() {
        let related_name = field.related_entity_name();
        let Some(related) = schema.entity(related_name) else {
            tracing::warn!(
                entity = %entity.name,
                field = %field.name,
                related = %related_name,
                "related entity not in schema, omitting from connections query"
            );
            continue;
        };

        fragment.push(Selection::Field(FieldSelection {
            selections: scalar_selections(related),
            ..FieldSelection::new(field.name.as_str())
        }));
    }

    let node = FieldSelection::new("node")
        .argument(NODE_ID, InputValue::variable(NODE_ID))
        .select(NODE_ID)
        .select(Selection::InlineFragment {
            type_condition: graphql_name(&entity.name),
            selections: fragment,
        });

    Some(
        QueryDocument::new(format!("{}Connections", graphql_name(&entity.name)))
            .variable(VariableDefinition::required(NODE_ID, VariableType::Id))
            .select(node),
    )
}
