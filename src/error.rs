//! Error types for hf-queue-sync
//!
//! The taxonomy mirrors how failures are handled, not where they occur:
//! - Transport failures (poll errors, socket drops) are recovered locally by
//!   the background tasks and never reach callers through these types.
//! - Command failures are typed ([`CommandError`]) and surfaced to the
//!   caller *after* the queue view has been resynchronized.
//! - A duplicate-target collision is not an error at all — it is returned
//!   as a [`crate::StartOutcome::Conflict`] value.
//! - A task-level failure (`status = failed`) is data on the record itself.

use thiserror::Error;

use crate::types::TaskId;

/// Result type alias for hf-queue-sync operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for hf-queue-sync
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "server_url")
        key: Option<String>,
    },

    /// HTTP transport error
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Push channel (WebSocket) error
    #[error("push channel error: {0}")]
    PushChannel(String),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Server answered a control endpoint with a non-success HTTP status
    #[error("server error: HTTP {status}: {message}")]
    Api {
        /// HTTP status code
        status: u16,
        /// Response body or status text
        message: String,
    },

    /// Command rejected, either client-side or by the server
    #[error("command error: {0}")]
    Command(#[from] CommandError),

    /// Engine already closed - background channels are gone
    #[error("engine closed: no longer synchronizing")]
    Closed,
}

/// Command-related errors
///
/// Returned by the dispatch methods on [`crate::SyncEngine`]. When one of
/// these carries a server-side rejection, the queue has already been
/// resynchronized before the error is returned.
#[derive(Debug, Error)]
pub enum CommandError {
    /// Task not present in the local store
    #[error("task {id} not found")]
    UnknownTask {
        /// The task id that was not found
        id: TaskId,
    },

    /// Pause requested for a task the server cannot pause
    #[error("task {id} is not pausable")]
    NotPausable {
        /// The task id that cannot be paused
        id: TaskId,
    },

    /// Remove requested for a task that has not finished
    #[error("cannot remove task {id} in status {status}: task is still active")]
    NotRemovable {
        /// The task id that cannot be removed
        id: TaskId,
        /// Its current (non-terminal) status
        status: crate::types::TaskStatus,
    },

    /// Server processed the command but reported failure
    #[error("{operation} rejected by server: {message}")]
    Rejected {
        /// The operation that was attempted (e.g., "pause", "remove")
        operation: String,
        /// The server's failure message
        message: String,
    },
}
