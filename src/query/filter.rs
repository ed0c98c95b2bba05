//! Field type to filter comparison mapping for metadata search

use crate::schema::FieldType;

pub const SEARCH_TERM: &str = "searchTerm";
pub const NUMBER_TERM: &str = "numberTerm";
pub const DATE_TERM: &str = "dateTerm";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOperator {
    /// Exact equality
    Eq,
    /// Case-insensitive pattern match
    ILike,
}

impl FilterOperator {
    pub fn as_str(&self) -> &'static str {
        match self {
            FilterOperator::Eq => "eq",
            FilterOperator::ILike => "ilike",
        }
    }
}

/// Which shared search variable a comparison binds to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchTerm {
    Text,
    Number,
    Date,
}

impl SearchTerm {
    pub fn variable_name(&self) -> &'static str {
        match self {
            SearchTerm::Text => SEARCH_TERM,
            SearchTerm::Number => NUMBER_TERM,
            SearchTerm::Date => DATE_TERM,
        }
    }
}

/// Comparison used for a field of the given type.
///
/// Unrecognised types fall back to a substring match.
pub fn comparison_for(field_type: &FieldType) -> (FilterOperator, SearchTerm) {
    match field_type {
        FieldType::Number | FieldType::Float => (FilterOperator::Eq, SearchTerm::Number),
        FieldType::Date | FieldType::DateTime => (FilterOperator::Eq, SearchTerm::Date),
        FieldType::String
        | FieldType::Text
        | FieldType::Boolean
        | FieldType::Time
        | FieldType::Array
        | FieldType::Object
        | FieldType::Enum
        | FieldType::Relationship
        | FieldType::Entity
        | FieldType::Url
        | FieldType::Other(_) => (FilterOperator::ILike, SearchTerm::Text),
    }
}
