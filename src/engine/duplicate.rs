//! Start requests and duplicate-target resolution.
//!
//! A start command whose target directory already holds a download does not
//! fail: the server answers with a conflict, and the engine surfaces it as
//! a [`DuplicateConflict`] value offering the two resolutions — reuse the
//! existing target, or save under a fresh name. Dropping the conflict
//! dismisses it; nothing is started and no task is created.

use crate::error::{CommandError, Result};
use crate::transport::{DuplicateAction, StartRequest};
use crate::types::{Event, RepoType};

use super::SyncEngine;

/// Quick filter presets for common download shapes.
///
/// Each preset expands to include/exclude glob sets that are merged into a
/// [`DownloadRequest`] client-side; the server only ever sees the patterns.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FilterPreset {
    /// Safetensors weights plus tokenizer/config JSON, excluding legacy
    /// checkpoint formats
    SafetensorsOnly,
    /// GGUF quantizations and the model card
    GgufOnly,
    /// Everything except PyTorch checkpoint files
    NoPytorch,
    /// Configuration and documentation files only
    ConfigOnly,
}

impl FilterPreset {
    /// Include patterns contributed by this preset
    pub fn include_patterns(&self) -> &'static [&'static str] {
        match self {
            FilterPreset::SafetensorsOnly => {
                &["*.safetensors", "config.json", "*.json", "tokenizer*"]
            }
            FilterPreset::GgufOnly => &["*.gguf", "README.md"],
            FilterPreset::NoPytorch => &[],
            FilterPreset::ConfigOnly => &["*.json", "*.yaml", "*.yml", "*.txt", "README.md"],
        }
    }

    /// Exclude patterns contributed by this preset
    pub fn exclude_patterns(&self) -> &'static [&'static str] {
        match self {
            FilterPreset::SafetensorsOnly => &["*.bin", "*.pt", "*.pth", "*.ckpt"],
            FilterPreset::GgufOnly => &[],
            FilterPreset::NoPytorch => &["*.bin", "*.pt", "*.pth", "pytorch_model*"],
            FilterPreset::ConfigOnly => &[],
        }
    }
}

/// A download to request from the queue server
#[derive(Clone, Debug)]
pub struct DownloadRequest {
    /// Repository to download, e.g. `meta-llama/Llama-2-7b-hf`
    pub repo_id: String,
    /// Repository type
    pub repo_type: RepoType,
    /// Branch or revision (default `main`)
    pub revision: String,
    /// Glob patterns selecting files to fetch
    pub include_patterns: Option<Vec<String>>,
    /// Glob patterns excluding files from the fetch
    pub exclude_patterns: Option<Vec<String>>,
}

impl DownloadRequest {
    /// Request a full download of a repository's default revision
    pub fn new(repo_id: impl Into<String>) -> Self {
        Self {
            repo_id: repo_id.into(),
            repo_type: RepoType::Model,
            revision: "main".to_string(),
            include_patterns: None,
            exclude_patterns: None,
        }
    }

    /// Set the repository type
    pub fn repo_type(mut self, repo_type: RepoType) -> Self {
        self.repo_type = repo_type;
        self
    }

    /// Set the revision to fetch
    pub fn revision(mut self, revision: impl Into<String>) -> Self {
        self.revision = revision.into();
        self
    }

    /// Set explicit include patterns
    pub fn include(mut self, patterns: Vec<String>) -> Self {
        self.include_patterns = Some(patterns);
        self
    }

    /// Set explicit exclude patterns
    pub fn exclude(mut self, patterns: Vec<String>) -> Self {
        self.exclude_patterns = Some(patterns);
        self
    }

    /// Merge a filter preset's patterns into the request
    ///
    /// Preset patterns are appended to any patterns already set, matching
    /// how the desktop client combines manual filters with presets.
    pub fn preset(mut self, preset: FilterPreset) -> Self {
        let preset_includes = preset.include_patterns();
        if !preset_includes.is_empty() {
            let mut includes = self.include_patterns.unwrap_or_default();
            includes.extend(preset_includes.iter().map(|p| p.to_string()));
            self.include_patterns = Some(includes);
        }

        let preset_excludes = preset.exclude_patterns();
        if !preset_excludes.is_empty() {
            let mut excludes = self.exclude_patterns.unwrap_or_default();
            excludes.extend(preset_excludes.iter().map(|p| p.to_string()));
            self.exclude_patterns = Some(excludes);
        }

        self
    }

    fn to_wire(&self, duplicate_action: DuplicateAction) -> StartRequest {
        StartRequest {
            repo_id: self.repo_id.clone(),
            repo_type: self.repo_type,
            revision: self.revision.clone(),
            allow_patterns: self.include_patterns.clone(),
            ignore_patterns: self.exclude_patterns.clone(),
            duplicate_action,
        }
    }
}

/// Outcome of a start request
#[must_use = "a Conflict outcome carries the resolution choice"]
#[derive(Debug)]
pub enum StartOutcome {
    /// The server accepted the download
    Started {
        /// Server detail message, when provided
        message: Option<String>,
    },
    /// The target collides with an existing download; resolve or dismiss
    Conflict(DuplicateConflict),
}

/// A pending duplicate-target conflict.
///
/// Holds the original request so either resolution reissues the identical
/// start command, changed only in its conflict directive. Dropping the
/// value dismisses the conflict: no command is sent and no task exists.
pub struct DuplicateConflict {
    engine: SyncEngine,
    request: DownloadRequest,
    path: Option<String>,
    message: Option<String>,
}

impl std::fmt::Debug for DuplicateConflict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DuplicateConflict")
            .field("repo_id", &self.request.repo_id)
            .field("path", &self.path)
            .finish()
    }
}

impl DuplicateConflict {
    /// Repository the colliding request was for
    pub fn repo_id(&self) -> &str {
        &self.request.repo_id
    }

    /// Existing on-disk path reported by the server
    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    /// Server detail message
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    /// Resolve by reusing the existing target.
    ///
    /// Reissues the start command with an overwrite directive; the server
    /// resumes into (or overwrites) the colliding path.
    pub async fn overwrite(self) -> Result<StartOutcome> {
        self.engine
            .start_with_action(self.request, DuplicateAction::Overwrite)
            .await
    }

    /// Resolve by downloading to a fresh copy.
    ///
    /// Reissues the start command with a rename directive; the server picks
    /// a non-colliding target path.
    pub async fn save_as_copy(self) -> Result<StartOutcome> {
        self.engine
            .start_with_action(self.request, DuplicateAction::Rename)
            .await
    }
}

impl SyncEngine {
    /// Request a new download.
    ///
    /// Returns [`StartOutcome::Conflict`] when the server reports a
    /// duplicate target, so callers can offer the user the resolution
    /// choice instead of an error. Like every command, start triggers an
    /// immediate resync regardless of outcome.
    pub async fn start(&self, request: DownloadRequest) -> Result<StartOutcome> {
        self.start_with_action(request, DuplicateAction::Check).await
    }

    pub(crate) async fn start_with_action(
        &self,
        request: DownloadRequest,
        action: DuplicateAction,
    ) -> Result<StartOutcome> {
        self.ensure_open()?;

        let wire = request.to_wire(action);
        let result = self.transport.start(&wire).await;
        self.resync_after("start").await;

        let response = match result {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(repo_id = %request.repo_id, error = %e, "start command transport failed");
                self.emit_event(Event::CommandFailed {
                    operation: "start".to_string(),
                    id: None,
                    error: e.to_string(),
                });
                return Err(e);
            }
        };

        if response.is_duplicate_conflict() {
            tracing::info!(
                repo_id = %request.repo_id,
                path = response.path.as_deref().unwrap_or(""),
                "duplicate download target reported"
            );
            self.emit_event(Event::DuplicateDetected {
                repo_id: request.repo_id.clone(),
                path: response.path.clone(),
            });
            return Ok(StartOutcome::Conflict(DuplicateConflict {
                engine: self.clone(),
                request,
                path: response.path,
                message: response.message,
            }));
        }

        if response.success {
            Ok(StartOutcome::Started {
                message: response.message,
            })
        } else {
            let message = response
                .message
                .unwrap_or_else(|| "unspecified failure".to_string());
            tracing::warn!(repo_id = %request.repo_id, message = %message, "start command rejected");
            self.emit_event(Event::CommandFailed {
                operation: "start".to_string(),
                id: None,
                error: message.clone(),
            });
            Err(CommandError::Rejected {
                operation: "start".to_string(),
                message,
            }
            .into())
        }
    }
}
