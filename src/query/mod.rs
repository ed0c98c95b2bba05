//! GraphQL query documents synthesized from a blueprint
//!
//! The builders in [`builder`] produce a [`QueryDocument`], a small query AST
//! that renders to GraphQL text through `Display` and to a request body
//! through [`QueryDocument::to_request`]. Documents follow the pg_graphql
//! conventions of the backing API:
//! - entity `Foo` is exposed as `fooCollection { edges { node { ... } } }`
//! - filters are `filter: {or: [{field: {op: $var}}]}`
//! - single nodes are addressed with `node(nodeId: $nodeId)`

mod builder;
mod filter;

pub use builder::{
    build_connections_query, build_entity_query, build_metadata_search_query,
    build_metadata_search_query_with, SearchOptions,
};
pub use filter::{comparison_for, FilterOperator, SearchTerm};

use serde_json::{json, Value};
use std::fmt::{self, Write};

/// Scalar type of a declared variable
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariableType {
    String,
    Int,
    Date,
    Id,
}

impl VariableType {
    pub fn as_str(&self) -> &'static str {
        match self {
            VariableType::String => "String",
            VariableType::Int => "Int",
            VariableType::Date => "Date",
            VariableType::Id => "ID",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariableDefinition {
    pub name: String,
    pub var_type: VariableType,
    pub required: bool,
}

impl VariableDefinition {
    pub fn required(name: &str, var_type: VariableType) -> Self {
        Self {
            name: name.to_string(),
            var_type,
            required: true,
        }
    }

    pub fn optional(name: &str, var_type: VariableType) -> Self {
        Self {
            required: false,
            ..Self::required(name, var_type)
        }
    }
}

/// Argument value inside a selection
#[derive(Debug, Clone, PartialEq)]
pub enum InputValue {
    Variable(String),
    String(String),
    Int(i64),
    List(Vec<InputValue>),
    Object(Vec<(String, InputValue)>),
}

impl InputValue {
    pub fn variable(name: &str) -> Self {
        InputValue::Variable(name.to_string())
    }

    pub fn object(entries: Vec<(&str, InputValue)>) -> Self {
        InputValue::Object(
            entries
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect(),
        )
    }
}

impl fmt::Display for InputValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InputValue::Variable(name) => write!(f, "${}", name),
            InputValue::String(s) => {
                // JSON string escaping is valid GraphQL string escaping
                write!(f, "{}", Value::String(s.clone()))
            }
            InputValue::Int(n) => write!(f, "{}", n),
            InputValue::List(items) => {
                f.write_char('[')?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                f.write_char(']')
            }
            InputValue::Object(entries) => {
                f.write_char('{')?;
                for (i, (key, value)) in entries.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}: {}", key, value)?;
                }
                f.write_char('}')
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Argument {
    pub name: String,
    pub value: InputValue,
}

/// A field in a selection set, optionally aliased and with arguments
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSelection {
    pub name: String,
    pub alias: Option<String>,
    pub arguments: Vec<Argument>,
    pub selections: Vec<Selection>,
}

impl FieldSelection {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            alias: None,
            arguments: vec![],
            selections: vec![],
        }
    }

    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    pub fn argument(mut self, name: &str, value: InputValue) -> Self {
        self.arguments.push(Argument {
            name: name.to_string(),
            value,
        });
        self
    }

    pub fn select(mut self, selection: impl Into<Selection>) -> Self {
        self.selections.push(selection.into());
        self
    }

    /// Key under which the field appears in a response
    pub fn response_key(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.name)
    }

    pub fn is_leaf(&self) -> bool {
        self.selections.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Selection {
    Field(FieldSelection),
    InlineFragment {
        type_condition: String,
        selections: Vec<Selection>,
    },
}

impl From<FieldSelection> for Selection {
    fn from(field: FieldSelection) -> Self {
        Selection::Field(field)
    }
}

impl From<&str> for Selection {
    fn from(name: &str) -> Self {
        Selection::Field(FieldSelection::new(name))
    }
}

impl Selection {
    pub fn as_field(&self) -> Option<&FieldSelection> {
        match self {
            Selection::Field(field) => Some(field),
            Selection::InlineFragment { .. } => None,
        }
    }

    fn render(&self, out: &mut String, depth: usize) -> fmt::Result {
        let indent = "  ".repeat(depth);
        match self {
            Selection::Field(field) => {
                out.push_str(&indent);
                if let Some(alias) = &field.alias {
                    write!(out, "{}: ", alias)?;
                }
                out.push_str(&field.name);
                if !field.arguments.is_empty() {
                    out.push('(');
                    for (i, arg) in field.arguments.iter().enumerate() {
                        if i > 0 {
                            out.push_str(", ");
                        }
                        write!(out, "{}: {}", arg.name, arg.value)?;
                    }
                    out.push(')');
                }
                if field.selections.is_empty() {
                    out.push('\n');
                } else {
                    out.push_str(" {\n");
                    render_selections(&field.selections, out, depth + 1)?;
                    writeln!(out, "{}}}", indent)?;
                }
            }
            Selection::InlineFragment {
                type_condition,
                selections,
            } => {
                writeln!(out, "{}... on {} {{", indent, type_condition)?;
                render_selections(selections, out, depth + 1)?;
                writeln!(out, "{}}}", indent)?;
            }
        }
        Ok(())
    }
}

fn render_selections(selections: &[Selection], out: &mut String, depth: usize) -> fmt::Result {
    for selection in selections {
        selection.render(out, depth)?;
    }
    Ok(())
}

/// A named query operation: variables plus a selection tree
#[derive(Debug, Clone, PartialEq)]
pub struct QueryDocument {
    pub name: String,
    pub variables: Vec<VariableDefinition>,
    pub selections: Vec<Selection>,
}

impl QueryDocument {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            variables: vec![],
            selections: vec![],
        }
    }

    pub fn variable(mut self, definition: VariableDefinition) -> Self {
        self.variables.push(definition);
        self
    }

    pub fn select(mut self, selection: impl Into<Selection>) -> Self {
        self.selections.push(selection.into());
        self
    }

    pub fn find_variable(&self, name: &str) -> Option<&VariableDefinition> {
        self.variables.iter().find(|v| v.name == name)
    }

    /// No root selections; the rendered text is not a valid operation
    pub fn is_empty(&self) -> bool {
        self.selections.is_empty()
    }

    /// Top-level fields of the operation
    pub fn root_fields(&self) -> impl Iterator<Item = &FieldSelection> {
        self.selections.iter().filter_map(Selection::as_field)
    }

    /// Request body for a GraphQL transport
    pub fn to_request(&self, variables: Value) -> Value {
        json!({
            "query": self.to_string(),
            "variables": variables,
            "operationName": self.name,
        })
    }
}

impl fmt::Display for QueryDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = String::new();
        write!(out, "query {}", self.name)?;
        if !self.variables.is_empty() {
            out.push('(');
            for (i, var) in self.variables.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                write!(
                    out,
                    "${}: {}{}",
                    var.name,
                    var.var_type.as_str(),
                    if var.required { "!" } else { "" }
                )?;
            }
            out.push(')');
        }
        out.push_str(" {\n");
        render_selections(&self.selections, &mut out, 1)?;
        out.push('}');
        f.write_str(&out)
    }
}

/// Collection field exposing an entity: `Individual` -> `individualCollection`
pub fn collection_name(entity: &str) -> String {
    let name = graphql_name(entity);
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => format!("{}{}Collection", first.to_ascii_lowercase(), chars.as_str()),
        None => "Collection".to_string(),
    }
}

/// Replace characters that are not valid in a GraphQL name
pub fn graphql_name(raw: &str) -> String {
    let mut name: String = raw
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect();
    if name.starts_with(|c: char| c.is_ascii_digit()) {
        name.insert(0, '_');
    }
    name
}
