//! Conversation transcript model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "user" => Some(Role::User),
            "assistant" => Some(Role::Assistant),
            _ => None,
        }
    }
}

/// Lifecycle of a tool execution: starting -> running -> completed | error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ToolStatus {
    #[serde(rename = "starting")]
    Starting,
    #[serde(rename = "running", alias = "in-progress")]
    Running,
    #[serde(rename = "completed", alias = "complete")]
    Completed,
    #[serde(rename = "error")]
    Error,
}

impl ToolStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ToolStatus::Starting => "starting",
            ToolStatus::Running => "running",
            ToolStatus::Completed => "completed",
            ToolStatus::Error => "error",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "starting" => Some(ToolStatus::Starting),
            "running" | "in-progress" => Some(ToolStatus::Running),
            "completed" | "complete" => Some(ToolStatus::Completed),
            "error" => Some(ToolStatus::Error),
            _ => None,
        }
    }

    fn rank(&self) -> u8 {
        match self {
            ToolStatus::Starting => 0,
            ToolStatus::Running => 1,
            ToolStatus::Completed | ToolStatus::Error => 2,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.rank() == 2
    }
}

/// One invocation of a tool inside an assistant message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolExecution {
    pub tool: String,
    pub arguments: Value,
    pub result: Option<Value>,
    pub error: Option<String>,
    pub status: ToolStatus,
    pub timestamp: DateTime<Utc>,
    /// Display state only; not part of the protocol
    #[serde(default)]
    pub expanded: bool,
}

impl ToolExecution {
    pub fn start(tool: impl Into<String>, arguments: Value) -> Self {
        Self {
            tool: tool.into(),
            arguments,
            result: None,
            error: None,
            status: ToolStatus::Starting,
            timestamp: Utc::now(),
            expanded: false,
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.status.is_terminal()
    }

    /// Move to `next` if that is forward progress. Returns whether it moved.
    pub fn advance(&mut self, next: ToolStatus) -> bool {
        if self.status.is_terminal() || next.rank() <= self.status.rank() {
            return false;
        }
        self.status = next;
        true
    }

    /// Attach a result or error and finish the execution
    pub fn resolve(&mut self, result: Option<Value>, error: Option<String>) -> bool {
        let next = if error.is_some() {
            ToolStatus::Error
        } else {
            ToolStatus::Completed
        };
        if !self.advance(next) {
            return false;
        }
        self.result = result;
        self.error = error;
        true
    }
}

/// A contiguous unit of message content
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Segment {
    Text { content: String },
    Tool { execution: ToolExecution },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub role: Role,
    pub segments: Vec<Segment>,
    pub created_at: DateTime<Utc>,
}

impl Message {
    pub fn new(role: Role) -> Self {
        Self {
            id: Uuid::new_v4(),
            role,
            segments: vec![],
            created_at: Utc::now(),
        }
    }

    pub fn with_text(role: Role, text: impl Into<String>) -> Self {
        let mut message = Self::new(role);
        message.segments.push(Segment::Text {
            content: text.into(),
        });
        message
    }

    /// No tool segments and no non-empty text
    pub fn is_empty(&self) -> bool {
        self.segments.iter().all(|s| match s {
            Segment::Text { content } => content.is_empty(),
            Segment::Tool { .. } => false,
        })
    }

    /// Concatenation of all text segments
    pub fn text(&self) -> String {
        self.segments
            .iter()
            .filter_map(|s| match s {
                Segment::Text { content } => Some(content.as_str()),
                Segment::Tool { .. } => None,
            })
            .collect()
    }

    pub fn tool_executions(&self) -> impl Iterator<Item = &ToolExecution> {
        self.segments.iter().filter_map(|s| match s {
            Segment::Tool { execution } => Some(execution),
            Segment::Text { .. } => None,
        })
    }

    /// Extend the trailing text segment, or start a new one after a tool
    pub fn push_text_delta(&mut self, delta: &str) {
        if delta.is_empty() {
            return;
        }
        if let Some(Segment::Text { content }) = self.segments.last_mut() {
            content.push_str(delta);
        } else {
            self.segments.push(Segment::Text {
                content: delta.to_string(),
            });
        }
    }

    pub fn push_tool(&mut self, execution: ToolExecution) {
        self.segments.push(Segment::Tool { execution });
    }

    /// Most recent unresolved execution of `tool`
    pub fn latest_unresolved_tool_mut(&mut self, tool: &str) -> Option<&mut ToolExecution> {
        self.segments.iter_mut().rev().find_map(|s| match s {
            Segment::Tool { execution } if execution.tool == tool && !execution.is_resolved() => {
                Some(execution)
            }
            _ => None,
        })
    }
}
