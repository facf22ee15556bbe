//! Control command dispatch — pause, resume, cancel, remove, batch variants.
//!
//! Every command is "fire, then resynchronize": exactly one remote call,
//! followed by an immediate full requery of the listing whether the call
//! succeeded or not. Push events may race a command's round trip, so the
//! view is never mutated optimistically — the post-command listing (or the
//! next poll) is the only source of truth. No command is ever retried
//! automatically.

use crate::error::{CommandError, Result};
use crate::store::StoreOp;
use crate::transport::ActionResponse;
use crate::types::{Event, TaskId, TaskStatus};

use super::SyncEngine;

impl SyncEngine {
    /// Fetch the full listing now and apply it to the store.
    ///
    /// This is the same operation the poller performs on its interval,
    /// available on demand.
    pub async fn resync(&self) -> Result<()> {
        self.ensure_open()?;
        let tasks = self.transport.list_tasks().await?;
        self.store.apply(StoreOp::SyncListing(tasks)).await;
        Ok(())
    }

    /// Request a pause of the given task.
    ///
    /// Refused client-side, before any remote call, when the task is
    /// unknown or its server declared it non-pausable. The queue view is
    /// resynchronized whether or not the server accepted the request.
    pub async fn pause(&self, id: &TaskId) -> Result<()> {
        self.ensure_open()?;

        let task = self
            .store
            .get(id)
            .ok_or_else(|| CommandError::UnknownTask { id: id.clone() })?;
        if !task.pausable {
            return Err(CommandError::NotPausable { id: id.clone() }.into());
        }

        let result = self.transport.pause(id).await;
        self.finish_command("pause", Some(id), result).await
    }

    /// Request a resume of the given task.
    ///
    /// Valid from paused, pending, failed and cancelled states; the server
    /// decides. The queue view is resynchronized afterwards regardless.
    pub async fn resume(&self, id: &TaskId) -> Result<()> {
        self.ensure_open()?;
        let result = self.transport.resume(id).await;
        self.finish_command("resume", Some(id), result).await
    }

    /// Request cancellation of the given task.
    pub async fn cancel(&self, id: &TaskId) -> Result<()> {
        self.ensure_open()?;
        let result = self.transport.cancel(id).await;
        self.finish_command("cancel", Some(id), result).await
    }

    /// Remove a finished task from the queue.
    ///
    /// Only terminal tasks (completed, failed, cancelled) can be removed;
    /// anything else is refused client-side. With `delete_files` set the
    /// server also deletes the downloaded artifacts from disk — the default
    /// preserves them.
    pub async fn remove(&self, id: &TaskId, delete_files: bool) -> Result<()> {
        self.ensure_open()?;

        let task = self
            .store
            .get(id)
            .ok_or_else(|| CommandError::UnknownTask { id: id.clone() })?;
        if !task.status.is_terminal() {
            return Err(CommandError::NotRemovable {
                id: id.clone(),
                status: task.status,
            }
            .into());
        }

        let result = self.transport.remove(id, delete_files).await;
        if matches!(&result, Ok(response) if response.success) {
            // The listing never deletes records, so the store must.
            self.store.apply(StoreOp::Remove(id.clone())).await;
        }
        self.finish_command("remove", Some(id), result).await
    }

    /// Pause every task that is currently downloading and pausable.
    ///
    /// Commands are issued sequentially, one per task, continuing past
    /// individual failures; the view is resynchronized once at the end.
    /// Returns the number of tasks the server accepted a pause for.
    pub async fn pause_all(&self) -> Result<usize> {
        self.ensure_open()?;

        let targets: Vec<TaskId> = self
            .store
            .list()
            .into_iter()
            .filter(|t| t.status == TaskStatus::Downloading && t.pausable)
            .map(|t| t.id)
            .collect();

        let mut paused_count = 0;
        for id in &targets {
            match self.transport.pause(id).await {
                Ok(response) if response.success => paused_count += 1,
                Ok(response) => {
                    tracing::warn!(
                        task_id = %id,
                        message = response.message.as_deref().unwrap_or(""),
                        "server refused pause during pause_all"
                    );
                }
                Err(e) => {
                    tracing::warn!(task_id = %id, error = %e, "failed to pause task during pause_all");
                }
            }
        }

        tracing::info!(paused_count, "paused all active tasks");
        self.resync_after("pause_all").await;
        Ok(paused_count)
    }

    /// Resume every paused task.
    ///
    /// Same shape as [`pause_all`](Self::pause_all): sequential commands,
    /// one resync at the end, count of accepted resumes returned.
    pub async fn resume_all(&self) -> Result<usize> {
        self.ensure_open()?;

        let targets: Vec<TaskId> = self
            .store
            .list()
            .into_iter()
            .filter(|t| t.status == TaskStatus::Paused)
            .map(|t| t.id)
            .collect();

        let mut resumed_count = 0;
        for id in &targets {
            match self.transport.resume(id).await {
                Ok(response) if response.success => resumed_count += 1,
                Ok(response) => {
                    tracing::warn!(
                        task_id = %id,
                        message = response.message.as_deref().unwrap_or(""),
                        "server refused resume during resume_all"
                    );
                }
                Err(e) => {
                    tracing::warn!(task_id = %id, error = %e, "failed to resume task during resume_all");
                }
            }
        }

        tracing::info!(resumed_count, "resumed all paused tasks");
        self.resync_after("resume_all").await;
        Ok(resumed_count)
    }

    /// Remove every finished task from the queue, preserving files on disk.
    ///
    /// Returns the number of records removed.
    pub async fn clear_completed(&self) -> Result<usize> {
        self.ensure_open()?;

        let targets: Vec<TaskId> = self
            .store
            .list()
            .into_iter()
            .filter(|t| t.status.is_terminal())
            .map(|t| t.id)
            .collect();

        let mut removed_count = 0;
        for id in &targets {
            match self.transport.remove(id, false).await {
                Ok(response) if response.success => {
                    self.store.apply(StoreOp::Remove(id.clone())).await;
                    removed_count += 1;
                }
                Ok(response) => {
                    tracing::warn!(
                        task_id = %id,
                        message = response.message.as_deref().unwrap_or(""),
                        "server refused removal during clear_completed"
                    );
                }
                Err(e) => {
                    tracing::warn!(task_id = %id, error = %e, "failed to remove task during clear_completed");
                }
            }
        }

        tracing::info!(removed_count, "cleared finished tasks");
        self.resync_after("clear_completed").await;
        Ok(removed_count)
    }

    /// Resync after a command, swallowing failures.
    ///
    /// A failed resync leaves a stale view that the poller corrects within
    /// one interval — it must not mask the command's own outcome.
    pub(crate) async fn resync_after(&self, operation: &str) {
        if let Err(e) = self.resync().await {
            tracing::warn!(operation, error = %e, "post-command resync failed, poller will catch up");
        }
    }

    /// Shared command epilogue: unconditional resync, then outcome mapping.
    async fn finish_command(
        &self,
        operation: &str,
        id: Option<&TaskId>,
        result: Result<ActionResponse>,
    ) -> Result<()> {
        self.resync_after(operation).await;

        match result {
            Ok(response) if response.success => Ok(()),
            Ok(response) => {
                let message = response
                    .message
                    .unwrap_or_else(|| "unspecified failure".to_string());
                tracing::warn!(operation, task_id = ?id.map(TaskId::as_str), message = %message, "command rejected by server");
                self.emit_event(Event::CommandFailed {
                    operation: operation.to_string(),
                    id: id.cloned(),
                    error: message.clone(),
                });
                Err(CommandError::Rejected {
                    operation: operation.to_string(),
                    message,
                }
                .into())
            }
            Err(e) => {
                tracing::warn!(operation, task_id = ?id.map(TaskId::as_str), error = %e, "command transport failed");
                self.emit_event(Event::CommandFailed {
                    operation: operation.to_string(),
                    id: id.cloned(),
                    error: e.to_string(),
                });
                Err(e)
            }
        }
    }
}
