//! Incremental assembly of assistant messages from protocol events

use uuid::Uuid;

use super::event::{decode_event, ChatEvent};
use super::message::{Message, Role, ToolExecution, ToolStatus};

/// What an event did to the assembler state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    /// The open message changed
    Updated,
    /// A message was committed to the transcript
    Committed(Uuid),
    /// A terminal event arrived with nothing to commit
    Reset,
    /// The event had no effect
    Ignored,
}

/// Open assistant message plus the committed transcript of one conversation
#[derive(Debug, Default)]
pub struct MessageAssembler {
    current: Option<Message>,
    transcript: Vec<Message>,
}

impl MessageAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Message under construction, if an assistant turn is in flight
    pub fn current(&self) -> Option<&Message> {
        self.current.as_ref()
    }

    pub fn transcript(&self) -> &[Message] {
        &self.transcript
    }

    pub fn into_transcript(self) -> Vec<Message> {
        self.transcript
    }

    pub fn is_streaming(&self) -> bool {
        self.current.is_some()
    }

    /// Commit a user message
    pub fn push_user(&mut self, text: impl Into<String>) -> Uuid {
        let message = Message::with_text(Role::User, text);
        let id = message.id;
        self.transcript.push(message);
        id
    }

    fn open_message(&mut self) -> &mut Message {
        self.current
            .get_or_insert_with(|| Message::new(Role::Assistant))
    }

    /// Decode a raw frame and apply it. Malformed frames are dropped.
    pub fn ingest(&mut self, raw: &str) -> Option<Applied> {
        match decode_event(raw) {
            Ok(event) => Some(self.apply(&event)),
            Err(e) => {
                tracing::warn!(error = %e, "dropping malformed event frame");
                None
            }
        }
    }

    pub fn apply(&mut self, event: &ChatEvent) -> Applied {
        match event {
            ChatEvent::AuthResponse { .. } => Applied::Ignored,

            ChatEvent::ToolExecution { data } => {
                self.open_message()
                    .push_tool(ToolExecution::start(data.tool.clone(), data.args.clone()));
                tracing::debug!(tool = %data.tool, "tool execution started");
                Applied::Updated
            }

            ChatEvent::ToolProgress { data } => {
                let moved = self
                    .current
                    .as_mut()
                    .and_then(|m| m.latest_unresolved_tool_mut(&data.tool))
                    .map(|exec| exec.advance(ToolStatus::Running))
                    .unwrap_or(false);
                if moved {
                    Applied::Updated
                } else {
                    Applied::Ignored
                }
            }

            ChatEvent::ToolResult { data } => {
                let execution = self
                    .current
                    .as_mut()
                    .and_then(|m| m.latest_unresolved_tool_mut(&data.tool));
                match execution {
                    Some(exec) => {
                        exec.resolve(data.result.clone(), data.error_text());
                        tracing::debug!(tool = %data.tool, status = exec.status.as_str(), "tool execution resolved");
                        Applied::Updated
                    }
                    None => {
                        tracing::warn!(tool = %data.tool, "tool result without a pending execution");
                        Applied::Ignored
                    }
                }
            }

            ChatEvent::LlmStream { data } => {
                self.open_message().push_text_delta(&data.content);
                Applied::Updated
            }

            ChatEvent::Complete => match self.current.take() {
                Some(message) if !message.is_empty() => {
                    let id = message.id;
                    tracing::debug!(message_id = %id, segments = message.segments.len(), "assistant message committed");
                    self.transcript.push(message);
                    Applied::Committed(id)
                }
                _ => Applied::Reset,
            },

            ChatEvent::Error { error, details } => {
                if let Some(partial) = self.current.take() {
                    tracing::debug!(
                        message_id = %partial.id,
                        segments = partial.segments.len(),
                        "discarding partial assistant message"
                    );
                }
                let text = match details {
                    Some(details) => format!("Error: {}\n{}", error, details),
                    None => format!("Error: {}", error),
                };
                let message = Message::with_text(Role::Assistant, text);
                let id = message.id;
                self.transcript.push(message);
                Applied::Committed(id)
            }
        }
    }
}
