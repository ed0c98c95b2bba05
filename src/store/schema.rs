//! SQLite schema definition for committed transcripts

pub const SCHEMA: &str = r#"
-- ============================================
-- CONVERSATIONS
-- ============================================

CREATE TABLE IF NOT EXISTS conversations (
    id TEXT PRIMARY KEY,                   -- UUID
    title TEXT,
    created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
    updated_at DATETIME
);

-- ============================================
-- MESSAGES
-- ============================================

CREATE TABLE IF NOT EXISTS messages (
    id TEXT PRIMARY KEY,                   -- Message UUID
    conversation_id TEXT NOT NULL,
    position INTEGER NOT NULL,             -- Order within the conversation
    role TEXT NOT NULL,                    -- 'user', 'assistant'
    created_at DATETIME,
    FOREIGN KEY(conversation_id) REFERENCES conversations(id) ON DELETE CASCADE
);

-- ============================================
-- SEGMENTS
-- ============================================

CREATE TABLE IF NOT EXISTS segments (
    id INTEGER PRIMARY KEY,
    message_id TEXT NOT NULL,
    position INTEGER NOT NULL,             -- Order within the message
    kind TEXT NOT NULL,                    -- 'text', 'tool'
    content TEXT,                          -- Text segments only
    FOREIGN KEY(message_id) REFERENCES messages(id) ON DELETE CASCADE
);

-- ============================================
-- TOOL EXECUTIONS
-- ============================================

CREATE TABLE IF NOT EXISTS tool_executions (
    segment_id INTEGER PRIMARY KEY,
    tool_name TEXT NOT NULL,
    arguments TEXT,                        -- JSON
    result TEXT,                           -- JSON
    error TEXT,
    status TEXT NOT NULL,                  -- 'starting', 'running', 'completed', 'error'
    timestamp DATETIME,
    expanded BOOLEAN DEFAULT FALSE,
    FOREIGN KEY(segment_id) REFERENCES segments(id) ON DELETE CASCADE
);

-- ============================================
-- INDEXES
-- ============================================

CREATE INDEX IF NOT EXISTS idx_conversations_updated ON conversations(updated_at DESC);
CREATE INDEX IF NOT EXISTS idx_messages_conversation ON messages(conversation_id, position);
CREATE INDEX IF NOT EXISTS idx_segments_message ON segments(message_id, position);
CREATE INDEX IF NOT EXISTS idx_tool_executions_name ON tool_executions(tool_name);
"#;
