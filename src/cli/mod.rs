//! Command implementations for the `blueprint` binary

pub mod history;
pub mod query;
pub mod replay;
pub mod schema;
