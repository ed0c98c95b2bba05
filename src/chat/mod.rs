//! Streaming chat: protocol events, transcript model and assembly
//!
//! Frames from the streaming transport are decoded into [`ChatEvent`]s at the
//! boundary, then folded by the [`MessageAssembler`] into ordered text and
//! tool segments. [`ChatSession`] adds the per-connection lifecycle on top.

mod assembler;
mod event;
mod message;
mod reconnect;
mod session;

pub use assembler::{Applied, MessageAssembler};
pub use event::{
    decode_event, ChatEvent, OutgoingFrame, StreamDelta, ToolExecutionData, ToolProgressData,
    ToolResultData,
};
pub use message::{Message, Role, Segment, ToolExecution, ToolStatus};
pub use reconnect::{ReconnectTimer, SessionSupervisor};
pub use session::{
    ChatSession, ConnectionState, FrameOutcome, RecordingTransport, SessionOptions, Transport,
};
