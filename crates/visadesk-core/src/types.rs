//! Shared type definitions used across visadesk crates.

/// Identifier of a task record, unique within its source collection.
pub type TaskId = String;

/// Identifier of a client record.
pub type ClientId = String;
