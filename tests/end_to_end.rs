use std::fs;

use blueprint_chat::chat::{MessageAssembler, Role, ToolStatus};
use blueprint_chat::query::{
    build_connections_query, build_entity_query, build_metadata_search_query,
};
use blueprint_chat::schema::{load_schema, AdapterRegistry};
use blueprint_chat::store::TranscriptStore;
use tempfile::TempDir;

const LEGACY_BLUEPRINT: &str = r#"
object_types:
  - name: Person
    table_name: Individual
    metadata:
      fields:
        - { name: first_name, type: string }
        - { name: age, type: Number }
        - { name: born, type: date }
        - { name: group, type: relationship, target: Group }
  - name: Group
    table_name: Group
    metadata:
      fields:
        - { name: name, type: string }
        - { name: members, type: relationship, target: Individual }
  - name: Tag
    table_name: Tag
    metadata:
      fields:
        - { name: label, type: string }
relationship_types:
  - name: membership
    source: Individual
    target: Group
"#;

#[test]
fn test_blueprint_file_to_queries() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("blueprint.yaml");
    fs::write(&path, LEGACY_BLUEPRINT).unwrap();

    let registry = AdapterRegistry::new();
    let (schema, adapter) = load_schema(&registry, &path, None).unwrap();
    assert_eq!(adapter.id(), "legacy");
    assert_eq!(schema.entities().len(), 3);

    let entity = build_entity_query(&schema, "Individual").unwrap().to_string();
    assert!(entity.contains("individualCollection"));
    assert!(entity.contains("first_name"));
    assert!(!entity.contains("group"));
    assert!(build_entity_query(&schema, "Person").is_none());

    let search = build_metadata_search_query(&schema).to_string();
    assert!(search.starts_with(
        "query MetadataSearch($searchTerm: String!, $numberTerm: Int, $dateTerm: Date)"
    ));
    assert!(search.contains("first_name: {ilike: $searchTerm}"));
    assert!(search.contains("age: {eq: $numberTerm}"));
    assert!(search.contains("born: {eq: $dateTerm}"));
    assert!(search.contains("groupCollection"));
    assert!(!search.contains("tagCollection"));

    let connections = build_connections_query(&schema, "Group").unwrap().to_string();
    assert!(connections.contains("$nodeId: ID!"));
    assert!(connections.contains("... on Group"));
    assert!(connections.contains("members {"));
}

#[test]
fn test_streamed_turn_to_store_and_back() {
    let frames = [
        r#"{"type":"tool-execution","data":{"tool":"lookup","args":{"id":7}}}"#,
        r#"{"type":"tool-progress","data":{"tool":"lookup"}}"#,
        r#"{"type":"tool-result","data":{"tool":"lookup","error":"not found"}}"#,
        r#"{"type":"llm-stream","data":{"content":"I could not find "}}"#,
        r#"{"type":"llm-stream","data":{"content":"that record."}}"#,
        r#"{"type":"complete"}"#,
    ];

    let mut assembler = MessageAssembler::new();
    assembler.push_user("Find record 7");
    for frame in frames {
        assert!(assembler.ingest(frame).is_some());
    }
    assert!(!assembler.is_streaming());

    let dir = TempDir::new().unwrap();
    let store = TranscriptStore::open(&dir.path().join("history.db")).unwrap();
    let id = store.create_conversation(Some("lookup")).unwrap();
    store.append_messages(&id, assembler.transcript()).unwrap();

    let found = store.find_conversation(&id[..8]).unwrap().unwrap();
    assert_eq!(found.message_count, 2);

    let loaded = store.load_messages(&id).unwrap();
    assert_eq!(loaded.len(), 2);
    assert_eq!(loaded[0].role, Role::User);
    assert_eq!(loaded[0].text(), "Find record 7");

    let answer = &loaded[1];
    assert_eq!(answer.role, Role::Assistant);
    assert_eq!(answer.text(), "I could not find that record.");
    let tool = answer.tool_executions().next().unwrap();
    assert_eq!(tool.tool, "lookup");
    assert_eq!(tool.status, ToolStatus::Error);
    assert_eq!(tool.error.as_deref(), Some("not found"));
    assert_eq!(tool.arguments["id"], 7);
}
