//! Per-connection chat session state machine
//!
//! ```text
//! Disconnected -> Connecting -> Authenticating -> Ready <-> Streaming
//!       ^                                           |
//!       +------------------ on_close ---------------+
//! ```
//!
//! The transport itself (socket, token refresh) lives outside; the session
//! is driven through `connect`, `on_open`, `on_frame` and `on_close`.

use std::fmt;
use std::time::Duration;
use url::Url;
use uuid::Uuid;

use super::assembler::{Applied, MessageAssembler};
use super::event::{decode_event, ChatEvent, OutgoingFrame};
use crate::config::StreamConfig;
use crate::error::{SessionError, TransportError};

/// Outbound half of a streaming connection
pub trait Transport {
    fn send(&mut self, frame: &str) -> Result<(), TransportError>;

    /// Dispose of the connection. Must not block.
    fn close(&mut self);
}

/// Transport that keeps every frame it is asked to send
#[derive(Debug, Default)]
pub struct RecordingTransport {
    pub sent: Vec<String>,
    pub closed: bool,
}

impl Transport for RecordingTransport {
    fn send(&mut self, frame: &str) -> Result<(), TransportError> {
        if self.closed {
            return Err(TransportError::Closed);
        }
        tracing::debug!(frame, "outgoing frame");
        self.sent.push(frame.to_string());
        Ok(())
    }

    fn close(&mut self) {
        self.closed = true;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Authenticating,
    Ready,
    Streaming,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Authenticating => "authenticating",
            ConnectionState::Ready => "ready",
            ConnectionState::Streaming => "streaming",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub url: String,
    pub token_param: String,
    pub reconnect_delay: Duration,
}

impl From<&StreamConfig> for SessionOptions {
    fn from(config: &StreamConfig) -> Self {
        Self {
            url: config.url.clone(),
            token_param: config.token_param.clone(),
            reconnect_delay: Duration::from_millis(config.reconnect_delay_ms),
        }
    }
}

/// Result of handling one incoming frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    /// Malformed, or arrived after teardown
    Dropped,
    Authenticated { initial_sent: bool },
    AuthFailed,
    Assembled(Applied),
}

pub struct ChatSession<T: Transport> {
    options: SessionOptions,
    transport: T,
    state: ConnectionState,
    assembler: MessageAssembler,
    initial_message: Option<String>,
    auto_sent: bool,
    auth_failed: bool,
    alive: bool,
    last_error: Option<String>,
}

impl<T: Transport> ChatSession<T> {
    pub fn new(transport: T, options: SessionOptions) -> Self {
        Self {
            options,
            transport,
            state: ConnectionState::Disconnected,
            assembler: MessageAssembler::new(),
            initial_message: None,
            auto_sent: false,
            auth_failed: false,
            alive: true,
            last_error: None,
        }
    }

    /// Message to send once the first successful authentication arrives
    pub fn set_initial_message(&mut self, text: impl Into<String>) {
        self.initial_message = Some(text.into());
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn assembler(&self) -> &MessageAssembler {
        &self.assembler
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn is_alive(&self) -> bool {
        self.alive
    }

    /// Start a connection attempt; returns the URL to open, token attached
    pub fn connect(&mut self, token: &str) -> Result<Url, SessionError> {
        if !self.alive {
            return Err(SessionError::TornDown);
        }
        let mut url = Url::parse(&self.options.url).map_err(|source| SessionError::InvalidUrl {
            url: self.options.url.clone(),
            source,
        })?;
        url.query_pairs_mut()
            .append_pair(&self.options.token_param, token);

        self.auth_failed = false;
        self.set_state(ConnectionState::Connecting);
        Ok(url)
    }

    pub fn on_open(&mut self) {
        if self.alive && self.state == ConnectionState::Connecting {
            self.set_state(ConnectionState::Authenticating);
        }
    }

    pub fn on_frame(&mut self, raw: &str) -> Result<FrameOutcome, SessionError> {
        if !self.alive {
            tracing::debug!("frame arrived after teardown, ignoring");
            return Ok(FrameOutcome::Dropped);
        }

        let event = match decode_event(raw) {
            Ok(event) => event,
            Err(e) => {
                tracing::warn!(error = %e, "dropping malformed event frame");
                return Ok(FrameOutcome::Dropped);
            }
        };

        match event {
            ChatEvent::AuthResponse { success: true, .. } => self.on_authenticated(),
            ChatEvent::AuthResponse {
                success: false,
                error,
            } => {
                let message = error.unwrap_or_else(|| "authentication failed".to_string());
                tracing::warn!(error = %message, "authentication rejected");
                self.last_error = Some(message);
                self.auth_failed = true;
                self.transport.close();
                self.set_state(ConnectionState::Disconnected);
                Ok(FrameOutcome::AuthFailed)
            }
            event => {
                let applied = self.assembler.apply(&event);
                let next = match (self.state, self.assembler.is_streaming()) {
                    (ConnectionState::Ready, true) => ConnectionState::Streaming,
                    (ConnectionState::Streaming, false) => ConnectionState::Ready,
                    (state, _) => state,
                };
                self.set_state(next);
                Ok(FrameOutcome::Assembled(applied))
            }
        }
    }

    fn on_authenticated(&mut self) -> Result<FrameOutcome, SessionError> {
        self.last_error = None;
        if self.state == ConnectionState::Authenticating {
            // An assistant turn left open by a dropped connection resumes
            let next = if self.assembler.is_streaming() {
                ConnectionState::Streaming
            } else {
                ConnectionState::Ready
            };
            self.set_state(next);
        }

        // The deferred send waits for a usable session and is consumed only
        // once it went out.
        if self.auto_sent || self.state != ConnectionState::Ready {
            return Ok(FrameOutcome::Authenticated {
                initial_sent: false,
            });
        }

        let initial_sent = match self.initial_message.clone() {
            Some(text) => {
                self.send_message(text)?;
                self.initial_message = None;
                true
            }
            None => false,
        };
        self.auto_sent = true;
        Ok(FrameOutcome::Authenticated { initial_sent })
    }

    /// Send a user message; only allowed between assistant turns
    pub fn send_message(&mut self, text: impl Into<String>) -> Result<Uuid, SessionError> {
        if !self.alive {
            return Err(SessionError::TornDown);
        }
        if self.state != ConnectionState::Ready {
            return Err(SessionError::NotReady(self.state.to_string()));
        }

        let text = text.into();
        let frame = OutgoingFrame::Message {
            content: text.clone(),
        }
        .encode()?;
        self.transport.send(&frame)?;
        Ok(self.assembler.push_user(text))
    }

    /// The transport closed. Returns the backoff before reconnecting, if any.
    pub fn on_close(&mut self, clean: bool) -> Option<Duration> {
        self.set_state(ConnectionState::Disconnected);
        if !self.alive || clean || self.auth_failed {
            return None;
        }
        tracing::info!(
            delay_ms = self.options.reconnect_delay.as_millis() as u64,
            "connection lost, will reconnect"
        );
        Some(self.options.reconnect_delay)
    }

    /// Dispose of the transport; later frames and sends are ignored
    pub fn teardown(&mut self) {
        if !self.alive {
            return;
        }
        self.transport.close();
        self.alive = false;
        self.set_state(ConnectionState::Disconnected);
    }

    fn set_state(&mut self, next: ConnectionState) {
        if self.state != next {
            tracing::debug!(from = %self.state, to = %next, "connection state");
            self.state = next;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::message::Role;

    const AUTH_OK: &str = r#"{"type":"auth_response","success":true}"#;

    fn options() -> SessionOptions {
        SessionOptions {
            url: "wss://chat.example.com/ws".to_string(),
            token_param: "token".to_string(),
            reconnect_delay: Duration::from_secs(3),
        }
    }

    fn ready_session() -> ChatSession<RecordingTransport> {
        let mut session = ChatSession::new(RecordingTransport::default(), options());
        session.connect("tok").unwrap();
        session.on_open();
        session.on_frame(AUTH_OK).unwrap();
        session
    }

    #[test]
    fn test_connect_appends_token() {
        let mut session = ChatSession::new(RecordingTransport::default(), options());
        let url = session.connect("a b&c").unwrap();
        assert_eq!(url.as_str(), "wss://chat.example.com/ws?token=a+b%26c");
        assert_eq!(session.state(), ConnectionState::Connecting);
        session.on_open();
        assert_eq!(session.state(), ConnectionState::Authenticating);
    }

    #[test]
    fn test_invalid_url() {
        let mut opts = options();
        opts.url = "not a url".to_string();
        let mut session = ChatSession::new(RecordingTransport::default(), opts);
        assert!(matches!(
            session.connect("tok"),
            Err(SessionError::InvalidUrl { .. })
        ));
    }

    #[test]
    fn test_initial_message_sent_once() {
        let mut session = ChatSession::new(RecordingTransport::default(), options());
        session.set_initial_message("Summarize Acme");
        session.connect("tok").unwrap();
        session.on_open();

        let outcome = session.on_frame(AUTH_OK).unwrap();
        assert_eq!(outcome, FrameOutcome::Authenticated { initial_sent: true });
        assert_eq!(session.state(), ConnectionState::Ready);

        let outcome = session.on_frame(AUTH_OK).unwrap();
        assert_eq!(outcome, FrameOutcome::Authenticated { initial_sent: false });

        assert_eq!(
            session.transport().sent,
            vec![r#"{"type":"message","content":"Summarize Acme"}"#.to_string()]
        );
        assert_eq!(session.assembler().transcript().len(), 1);
        assert_eq!(session.assembler().transcript()[0].role, Role::User);
    }

    #[test]
    fn test_initial_message_not_resent_after_reconnect() {
        let mut session = ChatSession::new(RecordingTransport::default(), options());
        session.set_initial_message("hi");
        session.connect("tok").unwrap();
        session.on_open();
        session.on_frame(AUTH_OK).unwrap();

        assert_eq!(session.on_close(false), Some(Duration::from_secs(3)));
        session.connect("tok").unwrap();
        session.on_open();
        session.on_frame(AUTH_OK).unwrap();
        assert_eq!(session.transport().sent.len(), 1);
    }

    #[test]
    fn test_streaming_state_follows_assistant_turn() {
        let mut session = ready_session();
        session
            .on_frame(r#"{"type":"llm-stream","data":{"content":"Hi"}}"#)
            .unwrap();
        assert_eq!(session.state(), ConnectionState::Streaming);
        assert!(matches!(
            session.send_message("interrupt"),
            Err(SessionError::NotReady(_))
        ));

        let outcome = session.on_frame(r#"{"type":"complete"}"#).unwrap();
        assert!(matches!(outcome, FrameOutcome::Assembled(Applied::Committed(_))));
        assert_eq!(session.state(), ConnectionState::Ready);

        session
            .on_frame(r#"{"type":"tool-execution","data":{"tool":"search"}}"#)
            .unwrap();
        assert_eq!(session.state(), ConnectionState::Streaming);
        session
            .on_frame(r#"{"type":"error","error":"boom"}"#)
            .unwrap();
        assert_eq!(session.state(), ConnectionState::Ready);
        assert_eq!(session.assembler().transcript().len(), 2);
    }

    #[test]
    fn test_auth_failure_closes_without_reconnect() {
        let mut session = ChatSession::new(RecordingTransport::default(), options());
        session.connect("expired").unwrap();
        session.on_open();
        let outcome = session
            .on_frame(r#"{"type":"auth_response","success":false,"error":"token expired"}"#)
            .unwrap();

        assert_eq!(outcome, FrameOutcome::AuthFailed);
        assert_eq!(session.state(), ConnectionState::Disconnected);
        assert_eq!(session.last_error(), Some("token expired"));
        assert!(session.transport().closed);
        assert_eq!(session.on_close(false), None);
    }

    #[test]
    fn test_clean_close_does_not_reconnect() {
        let mut session = ready_session();
        assert_eq!(session.on_close(true), None);
        assert_eq!(session.state(), ConnectionState::Disconnected);
        assert!(matches!(
            session.send_message("hello?"),
            Err(SessionError::NotReady(_))
        ));
    }

    #[test]
    fn test_teardown_ignores_late_frames() {
        let mut session = ready_session();
        session
            .on_frame(r#"{"type":"llm-stream","data":{"content":"partial"}}"#)
            .unwrap();
        session.teardown();

        assert!(session.transport().closed);
        assert!(!session.is_alive());
        assert_eq!(
            session.on_frame(r#"{"type":"complete"}"#).unwrap(),
            FrameOutcome::Dropped
        );
        assert!(session.assembler().transcript().is_empty());
        assert_eq!(session.on_close(false), None);
        assert!(matches!(session.connect("tok"), Err(SessionError::TornDown)));
    }

    #[test]
    fn test_malformed_frame_dropped() {
        let mut session = ready_session();
        assert_eq!(session.on_frame("garbage").unwrap(), FrameOutcome::Dropped);
        assert_eq!(session.state(), ConnectionState::Ready);
    }

    #[test]
    fn test_reauth_mid_turn_stays_streaming() {
        let mut session = ready_session();
        session
            .on_frame(r#"{"type":"llm-stream","data":{"content":"Half an "}}"#)
            .unwrap();
        assert_eq!(session.on_close(false), Some(Duration::from_secs(3)));

        session.connect("tok").unwrap();
        session.on_open();
        session.on_frame(AUTH_OK).unwrap();
        assert_eq!(session.state(), ConnectionState::Streaming);
        assert!(matches!(
            session.send_message("interrupt"),
            Err(SessionError::NotReady(_))
        ));

        session
            .on_frame(r#"{"type":"llm-stream","data":{"content":"answer."}}"#)
            .unwrap();
        session.on_frame(r#"{"type":"complete"}"#).unwrap();
        assert_eq!(session.state(), ConnectionState::Ready);
        assert_eq!(session.assembler().transcript()[0].text(), "Half an answer.");
        assert!(session.transport().sent.is_empty());
    }

    #[test]
    fn test_early_auth_keeps_initial_message_for_ready_session() {
        let mut session = ChatSession::new(RecordingTransport::default(), options());
        session.set_initial_message("Summarize Acme");
        session.connect("tok").unwrap();

        let outcome = session.on_frame(AUTH_OK).unwrap();
        assert_eq!(outcome, FrameOutcome::Authenticated { initial_sent: false });
        assert_eq!(session.state(), ConnectionState::Connecting);
        assert!(session.transport().sent.is_empty());

        session.on_open();
        let outcome = session.on_frame(AUTH_OK).unwrap();
        assert_eq!(outcome, FrameOutcome::Authenticated { initial_sent: true });
        assert_eq!(
            session.transport().sent,
            vec![r#"{"type":"message","content":"Summarize Acme"}"#.to_string()]
        );
    }

    #[test]
    fn test_initial_message_kept_when_send_fails() {
        let mut session = ChatSession::new(RecordingTransport::default(), options());
        session.set_initial_message("hi");
        session.connect("tok").unwrap();
        session.on_open();
        session.transport.closed = true;

        assert!(matches!(
            session.on_frame(AUTH_OK),
            Err(SessionError::Transport(TransportError::Closed))
        ));
        assert!(session.assembler().transcript().is_empty());

        session.transport.closed = false;
        let outcome = session.on_frame(AUTH_OK).unwrap();
        assert_eq!(outcome, FrameOutcome::Authenticated { initial_sent: true });
        assert_eq!(session.transport().sent.len(), 1);
    }
}
