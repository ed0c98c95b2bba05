//! Transcript storage with SQLite
//!
//! Committed messages are stored segment by segment so that a transcript
//! reloads with the same text/tool ordering it was assembled with.

mod schema;

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::Value;
use std::path::Path;
use uuid::Uuid;

use crate::chat::{Message, Role, Segment, ToolExecution, ToolStatus};

pub use schema::SCHEMA;

pub struct TranscriptStore {
    conn: Connection,
}

impl TranscriptStore {
    pub fn open(path: &Path) -> Result<Self> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database {}", path.display()))?;
        let store = Self { conn };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> Result<()> {
        self.conn.execute_batch(SCHEMA)?;
        Ok(())
    }

    // ============================================
    // CONVERSATIONS
    // ============================================

    pub fn create_conversation(&self, title: Option<&str>) -> Result<String> {
        let id = Uuid::new_v4().to_string();
        self.conn.execute(
            "INSERT INTO conversations (id, title, created_at, updated_at)
             VALUES (?, ?, datetime('now'), datetime('now'))",
            params![id, title],
        )?;
        Ok(id)
    }

    pub fn list_conversations(&self) -> Result<Vec<ConversationRow>> {
        let mut stmt = self.conn.prepare(
            r#"SELECT c.id, c.title, c.created_at, c.updated_at,
                      (SELECT COUNT(*) FROM messages m WHERE m.conversation_id = c.id) as message_count
               FROM conversations c
               ORDER BY c.updated_at DESC"#,
        )?;

        let rows = stmt.query_map([], map_conversation)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// Find a conversation by full id or id prefix
    pub fn find_conversation(&self, query: &str) -> Result<Option<ConversationRow>> {
        self.conn
            .query_row(
                r#"SELECT c.id, c.title, c.created_at, c.updated_at,
                          (SELECT COUNT(*) FROM messages m WHERE m.conversation_id = c.id)
                   FROM conversations c
                   WHERE c.id = ?1 OR c.id LIKE ?2
                   ORDER BY CASE WHEN c.id = ?1 THEN 0 ELSE 1 END, c.updated_at DESC
                   LIMIT 1"#,
                params![query, format!("{}%", query)],
                map_conversation,
            )
            .optional()
            .map_err(Into::into)
    }

    // ============================================
    // MESSAGES
    // ============================================

    /// Append committed messages after any already stored
    pub fn append_messages(&self, conversation_id: &str, messages: &[Message]) -> Result<()> {
        let tx = self.conn.unchecked_transaction()?;

        let mut position: i64 = tx.query_row(
            "SELECT COALESCE(MAX(position) + 1, 0) FROM messages WHERE conversation_id = ?",
            params![conversation_id],
            |row| row.get(0),
        )?;

        for msg in messages {
            tx.execute(
                "INSERT INTO messages (id, conversation_id, position, role, created_at)
                 VALUES (?, ?, ?, ?, ?)",
                params![
                    msg.id.to_string(),
                    conversation_id,
                    position,
                    msg.role.as_str(),
                    msg.created_at.to_rfc3339(),
                ],
            )?;
            position += 1;

            for (seg_position, segment) in msg.segments.iter().enumerate() {
                match segment {
                    Segment::Text { content } => {
                        tx.execute(
                            "INSERT INTO segments (message_id, position, kind, content)
                             VALUES (?, ?, 'text', ?)",
                            params![msg.id.to_string(), seg_position as i64, content],
                        )?;
                    }
                    Segment::Tool { execution } => {
                        let segment_id: i64 = tx.query_row(
                            "INSERT INTO segments (message_id, position, kind)
                             VALUES (?, ?, 'tool')
                             RETURNING id",
                            params![msg.id.to_string(), seg_position as i64],
                            |row| row.get(0),
                        )?;
                        tx.execute(
                            "INSERT INTO tool_executions
                             (segment_id, tool_name, arguments, result, error, status, timestamp, expanded)
                             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
                            params![
                                segment_id,
                                execution.tool,
                                execution.arguments.to_string(),
                                execution.result.as_ref().map(Value::to_string),
                                execution.error,
                                execution.status.as_str(),
                                execution.timestamp.to_rfc3339(),
                                execution.expanded,
                            ],
                        )?;
                    }
                }
            }
        }

        tx.execute(
            "UPDATE conversations SET updated_at = datetime('now') WHERE id = ?",
            params![conversation_id],
        )?;
        tx.commit()?;
        Ok(())
    }

    /// Rebuild the transcript of a conversation in order
    pub fn load_messages(&self, conversation_id: &str) -> Result<Vec<Message>> {
        let mut stmt = self.conn.prepare(
            r#"SELECT m.id, m.role, m.created_at, s.kind, s.content,
                      t.tool_name, t.arguments, t.result, t.error, t.status, t.timestamp, t.expanded
               FROM messages m
               LEFT JOIN segments s ON s.message_id = m.id
               LEFT JOIN tool_executions t ON t.segment_id = s.id
               WHERE m.conversation_id = ?
               ORDER BY m.position, s.position"#,
        )?;

        let rows = stmt
            .query_map(params![conversation_id], |row| {
                Ok(SegmentRow {
                    message_id: row.get(0)?,
                    role: row.get(1)?,
                    created_at: row.get(2)?,
                    kind: row.get(3)?,
                    content: row.get(4)?,
                    tool_name: row.get(5)?,
                    arguments: row.get(6)?,
                    result: row.get(7)?,
                    error: row.get(8)?,
                    status: row.get(9)?,
                    timestamp: row.get(10)?,
                    expanded: row.get(11)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut messages: Vec<Message> = vec![];
        for row in rows {
            let id = Uuid::parse_str(&row.message_id)
                .with_context(|| format!("Invalid message id {}", row.message_id))?;

            if messages.last().map(|m| m.id) != Some(id) {
                let role = Role::parse(&row.role)
                    .ok_or_else(|| anyhow!("Unknown role '{}' for message {}", row.role, id))?;
                messages.push(Message {
                    id,
                    role,
                    segments: vec![],
                    created_at: parse_timestamp(row.created_at.as_deref()),
                });
            }

            let kind = row.kind.clone();
            let segment = match kind.as_deref() {
                None => continue,
                Some("text") => Segment::Text {
                    content: row.content.unwrap_or_default(),
                },
                Some("tool") => Segment::Tool {
                    execution: row.into_execution()?,
                },
                Some(other) => return Err(anyhow!("Unknown segment kind '{}'", other)),
            };
            if let Some(message) = messages.last_mut() {
                message.segments.push(segment);
            }
        }

        Ok(messages)
    }
}

fn map_conversation(row: &rusqlite::Row) -> rusqlite::Result<ConversationRow> {
    Ok(ConversationRow {
        id: row.get(0)?,
        title: row.get(1)?,
        created_at: row.get(2)?,
        updated_at: row.get(3)?,
        message_count: row.get(4)?,
    })
}

fn parse_timestamp(raw: Option<&str>) -> DateTime<Utc> {
    raw.and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_default()
}

fn parse_json(raw: Option<String>) -> Result<Option<Value>> {
    raw.map(|s| serde_json::from_str(&s).context("Invalid JSON in tool execution"))
        .transpose()
}

// ============================================
// ROW TYPES
// ============================================

#[derive(Debug)]
pub struct ConversationRow {
    pub id: String,
    pub title: Option<String>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
    pub message_count: i64,
}

struct SegmentRow {
    message_id: String,
    role: String,
    created_at: Option<String>,
    kind: Option<String>,
    content: Option<String>,
    tool_name: Option<String>,
    arguments: Option<String>,
    result: Option<String>,
    error: Option<String>,
    status: Option<String>,
    timestamp: Option<String>,
    expanded: Option<bool>,
}

impl SegmentRow {
    fn into_execution(self) -> Result<ToolExecution> {
        let status_raw = self.status.unwrap_or_default();
        let status = ToolStatus::parse(&status_raw)
            .ok_or_else(|| anyhow!("Unknown tool status '{}'", status_raw))?;
        Ok(ToolExecution {
            tool: self
                .tool_name
                .ok_or_else(|| anyhow!("Tool segment without execution row"))?,
            arguments: parse_json(self.arguments)?.unwrap_or(Value::Null),
            result: parse_json(self.result)?,
            error: self.error,
            status,
            timestamp: parse_timestamp(self.timestamp.as_deref()),
            expanded: self.expanded.unwrap_or(false),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::MessageAssembler;
    use serde_json::json;

    fn temp_store() -> (tempfile::TempDir, TranscriptStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = TranscriptStore::open(&dir.path().join("nested/blueprint.db")).unwrap();
        (dir, store)
    }

    fn sample_transcript() -> Vec<Message> {
        let mut asm = MessageAssembler::new();
        asm.push_user("Who runs Acme?");
        for frame in [
            r#"{"type":"llm-stream","data":{"content":"Checking. "}}"#,
            r#"{"type":"tool-execution","data":{"tool":"search","args":{"q":"Acme"}}}"#,
            r#"{"type":"tool-result","data":{"tool":"search","result":{"ceo":"Ada"}}}"#,
            r#"{"type":"tool-execution","data":{"tool":"lookup"}}"#,
            r#"{"type":"tool-result","data":{"tool":"lookup","error":"not found"}}"#,
            r#"{"type":"llm-stream","data":{"content":"Ada runs it."}}"#,
            r#"{"type":"complete"}"#,
        ] {
            asm.ingest(frame);
        }
        asm.into_transcript()
    }

    #[test]
    fn test_round_trip_transcript() {
        let (_dir, store) = temp_store();
        let id = store.create_conversation(Some("Acme")).unwrap();
        let transcript = sample_transcript();
        store.append_messages(&id, &transcript).unwrap();

        let loaded = store.load_messages(&id).unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0].id, transcript[0].id);
        assert_eq!(loaded[0].text(), "Who runs Acme?");

        let assistant = &loaded[1];
        assert_eq!(assistant.role, Role::Assistant);
        assert_eq!(assistant.segments.len(), 4);
        assert_eq!(assistant.text(), "Checking. Ada runs it.");

        let tools: Vec<&ToolExecution> = assistant.tool_executions().collect();
        assert_eq!(tools[0].arguments, json!({"q": "Acme"}));
        assert_eq!(tools[0].result, Some(json!({"ceo": "Ada"})));
        assert_eq!(tools[0].status, ToolStatus::Completed);
        assert_eq!(tools[1].arguments, Value::Null);
        assert_eq!(tools[1].status, ToolStatus::Error);
        assert_eq!(tools[1].error.as_deref(), Some("not found"));
    }

    #[test]
    fn test_append_continues_positions() {
        let (_dir, store) = temp_store();
        let id = store.create_conversation(None).unwrap();
        store
            .append_messages(&id, &[Message::with_text(Role::User, "one")])
            .unwrap();
        store
            .append_messages(&id, &[Message::with_text(Role::Assistant, "two")])
            .unwrap();

        let texts: Vec<String> = store
            .load_messages(&id)
            .unwrap()
            .iter()
            .map(Message::text)
            .collect();
        assert_eq!(texts, vec!["one", "two"]);
    }

    #[test]
    fn test_find_and_list_conversations() {
        let (_dir, store) = temp_store();
        let id = store.create_conversation(Some("Acme")).unwrap();
        store.append_messages(&id, &sample_transcript()).unwrap();

        let found = store.find_conversation(&id[..8]).unwrap().unwrap();
        assert_eq!(found.id, id);
        assert_eq!(found.title.as_deref(), Some("Acme"));
        assert_eq!(found.message_count, 2);
        assert!(store.find_conversation("zzzz").unwrap().is_none());

        let all = store.list_conversations().unwrap();
        assert_eq!(all.len(), 1);
    }
}
