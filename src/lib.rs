//! Blueprint-driven GraphQL query construction and streaming chat assembly.
//!
//! A blueprint (entities, fields and relationships) is loaded through a
//! [`schema::AdapterRegistry`] and turned into GraphQL documents by
//! [`query`]. Streaming assistant turns are decoded and folded into a
//! transcript by [`chat`], and committed transcripts are kept in a SQLite
//! [`store::TranscriptStore`].

pub mod chat;
pub mod cli;
pub mod config;
pub mod error;
pub mod query;
pub mod schema;
pub mod store;

pub use chat::{ChatSession, MessageAssembler};
pub use config::Config;
pub use schema::{AdapterRegistry, Schema, SchemaAdapter};
pub use store::TranscriptStore;
