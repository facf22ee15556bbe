//! Core types for hf-queue-sync

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Unique identifier for a download task.
///
/// Task ids are opaque strings minted by the queue server (derived from the
/// repository id, revision and filter set, e.g.
/// `meta-llama--Llama-2-7b-hf_main_a1b2c3d4`). They are stable for the
/// lifetime of a task.
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(pub String);

impl TaskId {
    /// Create a new TaskId
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the id as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for TaskId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for TaskId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Repository type on the hub
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RepoType {
    /// Model repository
    #[default]
    Model,
    /// Dataset repository
    Dataset,
    /// Space repository
    Space,
}

/// Download task status
///
/// The server is authoritative for all transitions; the client only requests
/// and displays them. Wire values are lowercase; the uppercase aliases exist
/// because the listing endpoint of older servers serialized enum *names*
/// while the socket channel serialized *values*.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    /// Accepted by the server, waiting to start
    #[serde(alias = "PENDING")]
    Pending,
    /// Transfer in progress
    #[serde(alias = "DOWNLOADING")]
    Downloading,
    /// Paused by user
    #[serde(alias = "PAUSED")]
    Paused,
    /// Verifying fetched files
    #[serde(alias = "VERIFYING")]
    Verifying,
    /// Successfully completed (terminal)
    #[serde(alias = "COMPLETED")]
    Completed,
    /// Failed with an error message (terminal)
    #[serde(alias = "FAILED")]
    Failed,
    /// Cancelled by user (terminal)
    #[serde(alias = "CANCELLED")]
    Cancelled,
}

impl TaskStatus {
    /// Returns true for statuses that end a task's lifecycle.
    ///
    /// Terminal tasks are mutable only by removal.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TaskStatus::Completed | TaskStatus::Failed | TaskStatus::Cancelled
        )
    }

    /// Returns true while bytes are moving or being checked.
    ///
    /// Progress is expected to be non-decreasing in these statuses; a
    /// reported drop to zero is treated as a transient re-check artifact.
    pub fn is_transferring(&self) -> bool {
        matches!(self, TaskStatus::Downloading | TaskStatus::Verifying)
    }

    /// Returns true for statuses a resume request makes sense from.
    pub fn is_resumable(&self) -> bool {
        matches!(
            self,
            TaskStatus::Paused | TaskStatus::Pending | TaskStatus::Failed | TaskStatus::Cancelled
        )
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Downloading => "downloading",
            TaskStatus::Paused => "paused",
            TaskStatus::Verifying => "verifying",
            TaskStatus::Completed => "completed",
            TaskStatus::Failed => "failed",
            TaskStatus::Cancelled => "cancelled",
        };
        write!(f, "{}", s)
    }
}

fn default_true() -> bool {
    true
}

fn default_revision() -> String {
    "main".to_string()
}

/// One queued, active or finished download task as known to the server.
///
/// Listing responses always carry complete records. Optional fields default
/// so that older servers omitting them still deserialize.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TaskRecord {
    /// Stable opaque identifier
    pub id: TaskId,
    /// Repository id, e.g. `meta-llama/Llama-2-7b-hf`
    pub repo_id: String,
    /// Repository type
    #[serde(default)]
    pub repo_type: RepoType,
    /// Branch or revision being fetched
    #[serde(default = "default_revision")]
    pub revision: String,
    /// Current status
    pub status: TaskStatus,
    /// Progress percentage (0.0 to 100.0)
    #[serde(default)]
    pub progress: f64,
    /// Bytes downloaded so far
    #[serde(default)]
    pub downloaded_size: u64,
    /// Total bytes, 0 when not yet known
    #[serde(default)]
    pub total_size: u64,
    /// Current speed in bytes per second
    #[serde(default)]
    pub speed: f64,
    /// Server-rendered speed string, e.g. `12.4 MB/s`
    #[serde(default)]
    pub speed_formatted: String,
    /// File currently being transferred
    #[serde(default)]
    pub current_file: Option<String>,
    /// Final on-disk path once known
    #[serde(default)]
    pub result_path: Option<String>,
    /// Total file count for the task
    #[serde(default)]
    pub total_files: Option<u64>,
    /// Files finished so far
    #[serde(default)]
    pub downloaded_files: Option<u64>,
    /// Glob patterns selecting files to fetch (None = everything)
    #[serde(default)]
    pub include_patterns: Option<Vec<String>>,
    /// Glob patterns excluding files from the fetch
    #[serde(default)]
    pub exclude_patterns: Option<Vec<String>>,
    /// Failure detail when status is failed
    #[serde(default)]
    pub error_message: Option<String>,
    /// Whether the server supports pausing this task
    #[serde(default = "default_true")]
    pub pausable: bool,
    /// Whether the accelerated transfer backend is in use
    #[serde(default)]
    pub use_hf_transfer: bool,
    /// When the server accepted the task
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// Partial task state pushed over the socket channel.
///
/// Every field except `id` is optional: the server emits only what changed
/// (and routinely omits `revision`, `exclude_patterns`, `result_path` and
/// the capability flags). An absent field means "unchanged", not "cleared" —
/// see [`crate::reconcile`].
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskUpdate {
    /// Id of the task this update applies to
    pub id: TaskId,
    /// New repository id, if present
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repo_id: Option<String>,
    /// New repository type, if present
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repo_type: Option<RepoType>,
    /// New status, if present
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<TaskStatus>,
    /// New progress percentage, if present
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<f64>,
    /// New downloaded byte count, if present
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub downloaded_size: Option<u64>,
    /// New total byte count, if present
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_size: Option<u64>,
    /// New speed, if present
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speed: Option<f64>,
    /// New rendered speed string, if present
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speed_formatted: Option<String>,
    /// New current file, if present
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_file: Option<String>,
    /// New result path, if present
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result_path: Option<String>,
    /// New total file count, if present
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_files: Option<u64>,
    /// New finished file count, if present
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub downloaded_files: Option<u64>,
    /// New include patterns; `Some(vec![])` explicitly clears them
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub include_patterns: Option<Vec<String>>,
    /// New exclude patterns; `Some(vec![])` explicitly clears them
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exclude_patterns: Option<Vec<String>>,
    /// New error message, if present
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    /// New pausable flag, if present
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pausable: Option<bool>,
    /// New transfer-backend flag, if present
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub use_hf_transfer: Option<bool>,
}

/// Event emitted to engine subscribers
///
/// Consumers subscribe via [`crate::SyncEngine::subscribe`]. Events are the
/// engine's observability surface — nothing here is required for the store
/// to stay consistent, so a lagging or absent subscriber is harmless.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// Push subscription established
    PushConnected,

    /// Push subscription lost; a reconnect is already scheduled
    PushDisconnected {
        /// Close or error detail
        reason: String,
    },

    /// A full listing was applied to the store
    QueueSynced {
        /// Number of tasks in the listing
        tasks: usize,
    },

    /// A task changed in the store
    TaskUpdated {
        /// Task id
        id: TaskId,
    },

    /// A task was removed from the store
    TaskRemoved {
        /// Task id
        id: TaskId,
    },

    /// A control command was rejected by the server
    CommandFailed {
        /// Operation name (`pause`, `resume`, `cancel`, `remove`, `start`)
        operation: String,
        /// Target task, when the command addressed one
        #[serde(skip_serializing_if = "Option::is_none")]
        id: Option<TaskId>,
        /// Failure detail
        error: String,
    },

    /// A start request collided with an existing download target
    DuplicateDetected {
        /// Repository that was requested
        repo_id: String,
        /// Colliding on-disk path reported by the server
        #[serde(skip_serializing_if = "Option::is_none")]
        path: Option<String>,
    },

    /// Engine torn down
    Closed,
}
