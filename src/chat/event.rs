//! Streaming protocol frames
//!
//! Server -> client (JSON):
//! ```json
//! {"type": "auth_response", "success": true}
//! {"type": "tool-execution", "data": {"tool": "search", "args": {"q": "acme"}}}
//! {"type": "tool-progress", "data": {"tool": "search"}}
//! {"type": "tool-result", "data": {"tool": "search", "result": [...]}}
//! {"type": "llm-stream", "data": {"content": "partial..."}}
//! {"type": "complete"}
//! {"type": "error", "error": "rate limited", "details": "retry in 30s"}
//! ```
//!
//! Client -> server (JSON):
//! ```json
//! {"type": "message", "content": "Who founded Acme?"}
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::EventError;

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ToolExecutionData {
    pub tool: String,
    #[serde(default, alias = "arguments", alias = "input")]
    pub args: Value,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ToolProgressData {
    pub tool: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ToolResultData {
    pub tool: String,
    #[serde(default)]
    pub result: Option<Value>,
    #[serde(default)]
    pub error: Option<Value>,
}

impl ToolResultData {
    /// Error payload as display text
    pub fn error_text(&self) -> Option<String> {
        self.error.as_ref().map(|e| match e {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StreamDelta {
    #[serde(alias = "delta", alias = "text")]
    pub content: String,
}

/// An incoming protocol event
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type")]
pub enum ChatEvent {
    #[serde(rename = "auth_response")]
    AuthResponse {
        success: bool,
        #[serde(default)]
        error: Option<String>,
    },
    #[serde(rename = "tool-execution")]
    ToolExecution { data: ToolExecutionData },
    #[serde(rename = "tool-progress")]
    ToolProgress { data: ToolProgressData },
    #[serde(rename = "tool-result")]
    ToolResult { data: ToolResultData },
    #[serde(rename = "llm-stream")]
    LlmStream { data: StreamDelta },
    #[serde(rename = "complete")]
    Complete,
    #[serde(rename = "error")]
    Error {
        error: String,
        #[serde(default)]
        details: Option<String>,
    },
}

impl ChatEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            ChatEvent::AuthResponse { .. } => "auth_response",
            ChatEvent::ToolExecution { .. } => "tool-execution",
            ChatEvent::ToolProgress { .. } => "tool-progress",
            ChatEvent::ToolResult { .. } => "tool-result",
            ChatEvent::LlmStream { .. } => "llm-stream",
            ChatEvent::Complete => "complete",
            ChatEvent::Error { .. } => "error",
        }
    }

    fn validate(self) -> Result<Self, EventError> {
        let tool = match &self {
            ChatEvent::ToolExecution { data } => Some(&data.tool),
            ChatEvent::ToolProgress { data } => Some(&data.tool),
            ChatEvent::ToolResult { data } => Some(&data.tool),
            _ => None,
        };
        if tool.is_some_and(|t| t.trim().is_empty()) {
            return Err(EventError::Invalid {
                event: self.kind(),
                reason: "empty tool name".to_string(),
            });
        }
        Ok(self)
    }
}

/// Decode and validate one frame
pub fn decode_event(raw: &str) -> Result<ChatEvent, EventError> {
    let event: ChatEvent = serde_json::from_str(raw)?;
    event.validate()
}

/// A frame sent to the server
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutgoingFrame {
    Message { content: String },
}

impl OutgoingFrame {
    pub fn encode(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_every_event_kind() {
        let frames = [
            (r#"{"type":"auth_response","success":true}"#, "auth_response"),
            (r#"{"type":"tool-execution","data":{"tool":"search","args":{"q":"a"}}}"#, "tool-execution"),
            (r#"{"type":"tool-progress","data":{"tool":"search"}}"#, "tool-progress"),
            (r#"{"type":"tool-result","data":{"tool":"search","result":[1]}}"#, "tool-result"),
            (r#"{"type":"llm-stream","data":{"content":"Hel"}}"#, "llm-stream"),
            (r#"{"type":"complete"}"#, "complete"),
            (r#"{"type":"error","error":"boom"}"#, "error"),
        ];
        for (raw, kind) in frames {
            assert_eq!(decode_event(raw).unwrap().kind(), kind);
        }
    }

    #[test]
    fn test_decode_aliases() {
        let event = decode_event(r#"{"type":"llm-stream","data":{"delta":"x"}}"#).unwrap();
        assert_eq!(
            event,
            ChatEvent::LlmStream {
                data: StreamDelta {
                    content: "x".to_string()
                }
            }
        );

        let event =
            decode_event(r#"{"type":"tool-execution","data":{"tool":"t","arguments":[1]}}"#)
                .unwrap();
        match event {
            ChatEvent::ToolExecution { data } => assert_eq!(data.args, json!([1])),
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn test_decode_rejects_malformed_and_unknown() {
        assert!(matches!(decode_event("{not json"), Err(EventError::Malformed(_))));
        assert!(matches!(
            decode_event(r#"{"type":"telemetry"}"#),
            Err(EventError::Malformed(_))
        ));
        assert!(matches!(
            decode_event(r#"{"type":"tool-result","data":{}}"#),
            Err(EventError::Malformed(_))
        ));
    }

    #[test]
    fn test_decode_rejects_empty_tool_name() {
        let err = decode_event(r#"{"type":"tool-execution","data":{"tool":"  "}}"#).unwrap_err();
        assert!(matches!(err, EventError::Invalid { event: "tool-execution", .. }));
    }

    #[test]
    fn test_tool_result_error_text() {
        let data: ToolResultData =
            serde_json::from_value(json!({"tool": "t", "error": {"code": 42}})).unwrap();
        assert_eq!(data.error_text().as_deref(), Some(r#"{"code":42}"#));
    }

    #[test]
    fn test_outgoing_frame_encoding() {
        let frame = OutgoingFrame::Message {
            content: "hi".to_string(),
        };
        assert_eq!(frame.encode().unwrap(), r#"{"type":"message","content":"hi"}"#);
    }
}
