//! Query command implementation

use anyhow::Result;
use serde_json::{json, Value};

use crate::query::{
    build_connections_query, build_entity_query, build_metadata_search_query_with,
    QueryDocument, SearchOptions,
};
use crate::schema::Schema;

pub fn entity(schema: &Schema, name: &str, as_json: bool) -> Result<()> {
    match build_entity_query(schema, name) {
        Some(doc) => print_document(&doc, json!({}), as_json),
        None => println!("Entity '{}' not found.", name),
    }
    Ok(())
}

pub fn search(schema: &Schema, options: &SearchOptions, term: &str, as_json: bool) -> Result<()> {
    let doc = build_metadata_search_query_with(schema, options);
    if doc.is_empty() {
        println!("No searchable entities (none has a display field).");
        return Ok(());
    }
    print_document(&doc, search_variables(term), as_json);
    Ok(())
}

pub fn connections(schema: &Schema, name: &str, node_id: &str, as_json: bool) -> Result<()> {
    match build_connections_query(schema, name) {
        Some(doc) => print_document(&doc, json!({ "nodeId": node_id }), as_json),
        None => println!("Entity '{}' not found.", name),
    }
    Ok(())
}

/// Bind a user search string to the three shared search variables
fn search_variables(term: &str) -> Value {
    let term = term.trim();
    // `numberTerm` is an Int: whole-valued decimals like "3.0" still bind
    let number = term.parse::<i64>().ok().or_else(|| {
        term.parse::<f64>()
            .ok()
            .filter(|n| n.fract() == 0.0 && n.abs() < i64::MAX as f64)
            .map(|n| n as i64)
    });
    let date = chrono::NaiveDate::parse_from_str(term, "%Y-%m-%d")
        .ok()
        .map(|d| d.to_string());
    json!({
        "searchTerm": format!("%{}%", term),
        "numberTerm": number,
        "dateTerm": date,
    })
}

fn print_document(doc: &QueryDocument, variables: Value, as_json: bool) {
    if as_json {
        let request = doc.to_request(variables);
        println!(
            "{}",
            serde_json::to_string_pretty(&request).unwrap_or_else(|_| request.to_string())
        );
    } else {
        println!("{}", doc);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_variables() {
        let vars = search_variables(" 42 ");
        assert_eq!(vars["searchTerm"], "%42%");
        assert_eq!(vars["numberTerm"], 42);
        assert!(vars["dateTerm"].is_null());

        assert_eq!(search_variables("3.0")["numberTerm"], 3);
        assert!(search_variables("3.5")["numberTerm"].is_null());

        let vars = search_variables("2024-02-29");
        assert_eq!(vars["dateTerm"], "2024-02-29");
        assert!(vars["numberTerm"].is_null());
    }
}
