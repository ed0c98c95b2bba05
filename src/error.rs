//! Error types for the library boundary

use thiserror::Error;

/// Failures while loading or normalizing a blueprint document.
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("failed to read schema file {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("failed to parse schema document: {0}")]
    Parse(String),

    /// No registered adapter recognised the document shape.
    #[error("unrecognised schema format (expected one of: {expected})")]
    UnknownFormat { expected: String },

    /// A forced adapter id that is not registered.
    #[error("unknown schema adapter: {0}")]
    UnknownAdapter(String),

    #[error("duplicate entity name: {0}")]
    DuplicateEntity(String),
}

/// A protocol frame that could not be turned into a [`crate::chat::ChatEvent`].
#[derive(Debug, Error)]
pub enum EventError {
    #[error("malformed event frame: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("invalid {event} event: {reason}")]
    Invalid { event: &'static str, reason: String },
}

/// Failures reported by an injected transport.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("transport closed")]
    Closed,

    #[error("send failed: {0}")]
    Send(String),
}

/// Failures of the connection session state machine.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session is not ready (state: {0})")]
    NotReady(String),

    #[error("session has been torn down")]
    TornDown,

    #[error("no reconnect is scheduled")]
    NoReconnectPending,

    #[error("invalid connection url {url}: {source}")]
    InvalidUrl {
        url: String,
        source: url::ParseError,
    },

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("failed to encode outgoing frame: {0}")]
    Encode(#[from] serde_json::Error),
}
