//! Error types for agent operations.

use thiserror::Error;

/// Errors surfaced by agent and history operations.
///
/// Only argument validation and history-file access produce typed errors.
/// Fetch-time conditions (rate-limit denial, transport failure) are reported
/// as warning-level tracing events with an empty-string return instead; see
/// [`crate::Agent::fetch`].
#[derive(Debug, Error)]
pub enum AgentError {
    /// A required argument was empty or otherwise unusable.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The history file could not be opened, read, or written.
    #[error("history file error: {0}")]
    Io(#[from] std::io::Error),
}
