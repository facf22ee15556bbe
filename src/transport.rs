//! Queue server transport: wire types and the HTTP implementation.
//!
//! All server communication goes through the [`QueueTransport`] trait so the
//! engine can be driven against a real server, a mock, or an embedded
//! in-process backend. [`HttpTransport`] is the standard implementation,
//! speaking the REST surface of the queue server.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::types::{RepoType, TaskId, TaskRecord, TaskUpdate};

/// Machine-readable error code the server uses for duplicate-target
/// collisions on a start request.
pub const DUPLICATE_ERROR_CODE: &str = "DUPLICATE_DOWNLOAD";

/// How the server should treat a start request whose target already exists
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DuplicateAction {
    /// Report a conflict instead of starting (the default)
    #[default]
    Check,
    /// Reuse the existing target, resuming or overwriting its contents
    Overwrite,
    /// Pick a fresh, non-colliding target path
    Rename,
}

/// Body of a start-download request
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StartRequest {
    /// Repository to download
    pub repo_id: String,
    /// Repository type
    #[serde(default)]
    pub repo_type: RepoType,
    /// Branch or revision
    pub revision: String,
    /// Include patterns (server field name: `allow_patterns`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allow_patterns: Option<Vec<String>>,
    /// Exclude patterns (server field name: `ignore_patterns`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ignore_patterns: Option<Vec<String>>,
    /// Conflict handling directive
    #[serde(default)]
    pub duplicate_action: DuplicateAction,
}

/// Response to a start-download request
///
/// A duplicate-target collision arrives as a normal response with
/// `success = false` and `error_code = "DUPLICATE_DOWNLOAD"` (HTTP 409) —
/// it is part of the protocol, not a transport failure.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StartResponse {
    /// Whether the task was accepted and started
    pub success: bool,
    /// Human-readable detail
    #[serde(default)]
    pub message: Option<String>,
    /// Machine-readable error code, when the request was refused
    #[serde(default)]
    pub error_code: Option<String>,
    /// Colliding target path, present on duplicate conflicts
    #[serde(default)]
    pub path: Option<String>,
}

impl StartResponse {
    /// Returns true when this response reports a duplicate-target conflict.
    pub fn is_duplicate_conflict(&self) -> bool {
        self.error_code.as_deref() == Some(DUPLICATE_ERROR_CODE)
    }
}

/// Response to a pause/resume/cancel/remove command
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ActionResponse {
    /// Whether the server carried out the command
    pub success: bool,
    /// Human-readable detail
    #[serde(default)]
    pub message: Option<String>,
}

/// Full queue listing as returned by the listing endpoint
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct QueueListing {
    /// All tasks currently known to the server
    pub tasks: Vec<TaskRecord>,
}

/// Envelope framing every message on the push channel.
///
/// Only `task_update` envelopes carry data the engine consumes; every other
/// `type` value deserializes into [`PushEnvelope::Ignored`] and is dropped
/// without error.
#[derive(Clone, Debug, Deserialize)]
#[serde(tag = "type")]
pub enum PushEnvelope {
    /// Incremental task state
    #[serde(rename = "task_update")]
    TaskUpdate {
        /// The partial record
        data: TaskUpdate,
    },
    /// Any other message type; ignored
    #[serde(other)]
    Ignored,
}

/// Remote surface of the queue server.
///
/// Implementations must be cheap to share behind an `Arc` and safe to call
/// concurrently. Every method is one request; none of them retry.
#[async_trait]
pub trait QueueTransport: Send + Sync {
    /// Fetch the full task listing
    async fn list_tasks(&self) -> Result<Vec<TaskRecord>>;

    /// Request a new download
    ///
    /// Duplicate conflicts are returned as an `Ok` response carrying
    /// [`DUPLICATE_ERROR_CODE`], not as an error.
    async fn start(&self, request: &StartRequest) -> Result<StartResponse>;

    /// Request a pause of the given task
    async fn pause(&self, id: &TaskId) -> Result<ActionResponse>;

    /// Request a resume of the given task
    async fn resume(&self, id: &TaskId) -> Result<ActionResponse>;

    /// Request cancellation of the given task
    async fn cancel(&self, id: &TaskId) -> Result<ActionResponse>;

    /// Remove the given task from the queue
    ///
    /// With `delete_files` set, the server also deletes the downloaded
    /// artifacts from disk; otherwise files are preserved.
    async fn remove(&self, id: &TaskId, delete_files: bool) -> Result<ActionResponse>;
}

/// HTTP implementation of [`QueueTransport`] using the server's REST API
#[derive(Clone, Debug)]
pub struct HttpTransport {
    client: reqwest::Client,
    api_base: Url,
}

impl HttpTransport {
    /// Build a transport from the engine configuration
    pub fn new(config: &Config) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;

        Ok(Self {
            client,
            api_base: config.api_base()?,
        })
    }

    fn downloads_url(&self) -> Result<Url> {
        self.join("downloads/")
    }

    fn task_action_url(&self, id: &TaskId, action: &str) -> Result<Url> {
        let encoded = urlencoding::encode(id.as_str());
        self.join(&format!("downloads/{}/{}", encoded, action))
    }

    fn task_url(&self, id: &TaskId) -> Result<Url> {
        let encoded = urlencoding::encode(id.as_str());
        self.join(&format!("downloads/{}", encoded))
    }

    fn join(&self, path: &str) -> Result<Url> {
        self.api_base.join(path).map_err(|e| Error::Config {
            message: format!("cannot build endpoint URL for '{}': {}", path, e),
            key: Some("server_url".to_string()),
        })
    }

    /// Turn a non-success response into [`Error::Api`], preserving the body.
    async fn fail_from(response: reqwest::Response) -> Error {
        let status = response.status().as_u16();
        let message = response.text().await.unwrap_or_default();
        Error::Api { status, message }
    }

    async fn post_action(&self, id: &TaskId, action: &str) -> Result<ActionResponse> {
        let url = self.task_action_url(id, action)?;
        let response = self.client.post(url).send().await?;

        if !response.status().is_success() {
            return Err(Self::fail_from(response).await);
        }
        Ok(response.json().await?)
    }
}

#[async_trait]
impl QueueTransport for HttpTransport {
    async fn list_tasks(&self) -> Result<Vec<TaskRecord>> {
        let url = self.downloads_url()?;
        let response = self.client.get(url).send().await?;

        if !response.status().is_success() {
            return Err(Self::fail_from(response).await);
        }
        let listing: QueueListing = response.json().await?;
        Ok(listing.tasks)
    }

    async fn start(&self, request: &StartRequest) -> Result<StartResponse> {
        let url = self.downloads_url()?;
        let response = self.client.post(url).json(request).send().await?;
        let status = response.status();

        // 409 Conflict is the duplicate-target signal and carries a parseable
        // body; anything else non-success is a transport-level failure.
        if !status.is_success() && status != reqwest::StatusCode::CONFLICT {
            return Err(Self::fail_from(response).await);
        }
        Ok(response.json().await?)
    }

    async fn pause(&self, id: &TaskId) -> Result<ActionResponse> {
        self.post_action(id, "pause").await
    }

    async fn resume(&self, id: &TaskId) -> Result<ActionResponse> {
        self.post_action(id, "resume").await
    }

    async fn cancel(&self, id: &TaskId) -> Result<ActionResponse> {
        self.post_action(id, "cancel").await
    }

    async fn remove(&self, id: &TaskId, delete_files: bool) -> Result<ActionResponse> {
        let url = self.task_url(id)?;
        let response = self
            .client
            .delete(url)
            .query(&[("delete_files", delete_files)])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::fail_from(response).await);
        }
        Ok(response.json().await?)
    }
}
