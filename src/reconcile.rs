//! Merge rules for inbound task state.
//!
//! Two kinds of updates reach the store: partial records pushed over the
//! socket channel and complete records from a listing poll. Both run through
//! the rules here before anything becomes visible to consumers:
//!
//! - **Field preservation** (push only): an absent field keeps its current
//!   value; a present field replaces it, including explicitly empty pattern
//!   lists.
//! - **Progress smoothing** (both channels): while a task is transferring
//!   (downloading/verifying), a reported progress of zero over a non-zero
//!   current value is a transient re-check artifact and is suppressed. A
//!   status change out of the transferring set (e.g. a restart back to
//!   pending) adopts the incoming value verbatim.
//!
//! The functions are pure so that update ordering is the store actor's only
//! concern.

use crate::types::{TaskRecord, TaskStatus, TaskUpdate};

/// Decide whether an incoming progress value should be ignored.
///
/// `current` is the stored status *before* the update, `next` the status the
/// record will have afterwards.
fn suppress_progress_drop(
    current: TaskStatus,
    current_progress: f64,
    next: TaskStatus,
    incoming_progress: f64,
) -> bool {
    current.is_transferring()
        && next.is_transferring()
        && incoming_progress == 0.0
        && current_progress > 0.0
}

/// Merge a partial push update onto an existing record.
///
/// Absent fields are preserved; present fields overwrite. The error message
/// is additionally cleared when the update moves the task out of the failed
/// status without supplying a new one (a restart invalidates the old
/// failure detail).
pub(crate) fn apply_push_update(existing: &mut TaskRecord, update: TaskUpdate) {
    let next_status = update.status.unwrap_or(existing.status);

    if let Some(progress) = update.progress
        && !suppress_progress_drop(existing.status, existing.progress, next_status, progress)
    {
        existing.progress = progress;
    }

    if update.error_message.is_none()
        && existing.status == TaskStatus::Failed
        && next_status != TaskStatus::Failed
    {
        existing.error_message = None;
    }

    existing.status = next_status;

    if let Some(repo_id) = update.repo_id {
        existing.repo_id = repo_id;
    }
    if let Some(repo_type) = update.repo_type {
        existing.repo_type = repo_type;
    }
    if let Some(downloaded_size) = update.downloaded_size {
        existing.downloaded_size = downloaded_size;
    }
    if let Some(total_size) = update.total_size {
        existing.total_size = total_size;
    }
    if let Some(speed) = update.speed {
        existing.speed = speed;
    }
    if let Some(speed_formatted) = update.speed_formatted {
        existing.speed_formatted = speed_formatted;
    }
    if let Some(current_file) = update.current_file {
        existing.current_file = Some(current_file);
    }
    if let Some(result_path) = update.result_path {
        existing.result_path = Some(result_path);
    }
    if let Some(total_files) = update.total_files {
        existing.total_files = Some(total_files);
    }
    if let Some(downloaded_files) = update.downloaded_files {
        existing.downloaded_files = Some(downloaded_files);
    }
    if let Some(include_patterns) = update.include_patterns {
        existing.include_patterns = Some(include_patterns);
    }
    if let Some(exclude_patterns) = update.exclude_patterns {
        existing.exclude_patterns = Some(exclude_patterns);
    }
    if let Some(error_message) = update.error_message {
        existing.error_message = Some(error_message);
    }
    if let Some(pausable) = update.pausable {
        existing.pausable = pausable;
    }
    if let Some(use_hf_transfer) = update.use_hf_transfer {
        existing.use_hf_transfer = use_hf_transfer;
    }
}

/// Replace an existing record with a complete listing record.
///
/// Listing responses always carry full records, so no field preservation is
/// needed — only the progress-smoothing guard, so a poll taken mid-recheck
/// can never regress visible progress.
pub(crate) fn apply_listing_record(existing: &mut TaskRecord, incoming: TaskRecord) {
    let keep_progress = suppress_progress_drop(
        existing.status,
        existing.progress,
        incoming.status,
        incoming.progress,
    );
    let preserved = existing.progress;

    *existing = incoming;
    if keep_progress {
        existing.progress = preserved;
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{RepoType, TaskId};

    fn record(status: TaskStatus, progress: f64) -> TaskRecord {
        TaskRecord {
            id: TaskId::new("t1"),
            repo_id: "a/b".into(),
            repo_type: RepoType::Model,
            revision: "main".into(),
            status,
            progress,
            downloaded_size: 0,
            total_size: 0,
            speed: 0.0,
            speed_formatted: "0 B/s".into(),
            current_file: None,
            result_path: None,
            total_files: None,
            downloaded_files: None,
            include_patterns: Some(vec!["*.safetensors".into()]),
            exclude_patterns: None,
            error_message: None,
            pausable: true,
            use_hf_transfer: false,
            created_at: None,
        }
    }

    fn update(status: Option<TaskStatus>, progress: Option<f64>) -> TaskUpdate {
        TaskUpdate {
            id: TaskId::new("t1"),
            status,
            progress,
            ..Default::default()
        }
    }

    // --- progress smoothing ---

    #[test]
    fn zero_progress_while_downloading_is_suppressed() {
        let mut existing = record(TaskStatus::Downloading, 42.0);

        apply_push_update(&mut existing, update(Some(TaskStatus::Downloading), Some(0.0)));

        assert_eq!(existing.progress, 42.0, "transient zero must not regress the bar");
        assert_eq!(existing.status, TaskStatus::Downloading);
    }

    #[test]
    fn zero_progress_on_restart_to_pending_is_adopted() {
        let mut existing = record(TaskStatus::Downloading, 42.0);

        apply_push_update(&mut existing, update(Some(TaskStatus::Pending), Some(0.0)));

        assert_eq!(existing.progress, 0.0, "restart cycle resets progress for real");
        assert_eq!(existing.status, TaskStatus::Pending);
    }

    #[test]
    fn zero_progress_into_verifying_is_suppressed() {
        let mut existing = record(TaskStatus::Downloading, 97.0);

        apply_push_update(&mut existing, update(Some(TaskStatus::Verifying), Some(0.0)));

        assert_eq!(existing.progress, 97.0);
        assert_eq!(existing.status, TaskStatus::Verifying);
    }

    #[test]
    fn nonzero_progress_always_wins() {
        let mut existing = record(TaskStatus::Downloading, 42.0);

        apply_push_update(&mut existing, update(None, Some(43.5)));
        assert_eq!(existing.progress, 43.5);

        // Even a decrease, as long as it is not the zero artifact.
        apply_push_update(&mut existing, update(None, Some(41.0)));
        assert_eq!(existing.progress, 41.0);
    }

    #[test]
    fn zero_progress_from_nonzero_paused_state_is_adopted() {
        let mut existing = record(TaskStatus::Paused, 42.0);

        apply_push_update(&mut existing, update(Some(TaskStatus::Paused), Some(0.0)));

        assert_eq!(existing.progress, 0.0, "smoothing only protects transferring tasks");
    }

    #[test]
    fn omitted_progress_keeps_current_value() {
        let mut existing = record(TaskStatus::Downloading, 42.0);

        apply_push_update(&mut existing, update(Some(TaskStatus::Downloading), None));

        assert_eq!(existing.progress, 42.0);
    }

    // --- field preservation ---

    #[test]
    fn omitted_patterns_are_preserved() {
        let mut existing = record(TaskStatus::Downloading, 10.0);

        apply_push_update(&mut existing, update(None, Some(11.0)));

        assert_eq!(
            existing.include_patterns,
            Some(vec!["*.safetensors".to_string()]),
            "an update without patterns must not clear them"
        );
    }

    #[test]
    fn explicit_empty_patterns_clear_the_list() {
        let mut existing = record(TaskStatus::Downloading, 10.0);

        let mut upd = update(None, None);
        upd.include_patterns = Some(vec![]);
        apply_push_update(&mut existing, upd);

        assert_eq!(existing.include_patterns, Some(vec![]));
    }

    #[test]
    fn present_fields_overwrite_and_absent_fields_survive() {
        let mut existing = record(TaskStatus::Downloading, 10.0);
        existing.current_file = Some("model-00001.safetensors".into());
        existing.total_size = 1000;

        let mut upd = update(None, None);
        upd.downloaded_size = Some(512);
        upd.speed_formatted = Some("2.0 MB/s".into());
        apply_push_update(&mut existing, upd);

        assert_eq!(existing.downloaded_size, 512);
        assert_eq!(existing.speed_formatted, "2.0 MB/s");
        assert_eq!(existing.total_size, 1000, "absent total_size survives");
        assert_eq!(
            existing.current_file.as_deref(),
            Some("model-00001.safetensors"),
            "absent current_file survives"
        );
    }

    #[test]
    fn leaving_failed_without_new_error_clears_the_old_one() {
        let mut existing = record(TaskStatus::Failed, 30.0);
        existing.error_message = Some("connection reset".into());

        apply_push_update(&mut existing, update(Some(TaskStatus::Downloading), None));

        assert_eq!(existing.status, TaskStatus::Downloading);
        assert!(
            existing.error_message.is_none(),
            "a restart invalidates the previous failure detail"
        );
    }

    #[test]
    fn staying_failed_keeps_the_error() {
        let mut existing = record(TaskStatus::Failed, 30.0);
        existing.error_message = Some("connection reset".into());

        apply_push_update(&mut existing, update(None, None));

        assert_eq!(existing.error_message.as_deref(), Some("connection reset"));
    }

    // --- listing merge ---

    #[test]
    fn listing_record_replaces_all_fields() {
        let mut existing = record(TaskStatus::Downloading, 42.0);
        existing.current_file = Some("old.bin".into());

        let mut incoming = record(TaskStatus::Downloading, 55.0);
        incoming.current_file = None;
        incoming.include_patterns = None;
        apply_listing_record(&mut existing, incoming);

        assert_eq!(existing.progress, 55.0);
        assert!(existing.current_file.is_none(), "listing is authoritative per field");
        assert!(existing.include_patterns.is_none());
    }

    #[test]
    fn listing_zero_progress_while_transferring_is_suppressed() {
        let mut existing = record(TaskStatus::Downloading, 42.0);

        let incoming = record(TaskStatus::Downloading, 0.0);
        apply_listing_record(&mut existing, incoming);

        assert_eq!(existing.progress, 42.0);
    }

    #[test]
    fn listing_zero_progress_after_restart_is_adopted() {
        let mut existing = record(TaskStatus::Downloading, 42.0);

        let incoming = record(TaskStatus::Pending, 0.0);
        apply_listing_record(&mut existing, incoming);

        assert_eq!(existing.progress, 0.0);
        assert_eq!(existing.status, TaskStatus::Pending);
    }

    // --- interleaving monotonicity ---

    #[test]
    fn progress_never_regresses_under_mixed_channel_interleaving() {
        let mut existing = record(TaskStatus::Downloading, 0.0);
        let mut max_seen: f64 = 0.0;

        // Alternating push and poll updates, with zero artifacts sprinkled in.
        let steps: Vec<(bool, f64)> = vec![
            (true, 5.0),
            (false, 0.0),
            (true, 0.0),
            (false, 12.0),
            (true, 20.0),
            (false, 0.0),
            (true, 35.0),
            (true, 0.0),
            (false, 80.0),
            (true, 0.0),
        ];

        for (is_push, progress) in steps {
            if is_push {
                apply_push_update(
                    &mut existing,
                    update(Some(TaskStatus::Downloading), Some(progress)),
                );
            } else {
                apply_listing_record(&mut existing, record(TaskStatus::Downloading, progress));
            }

            // The sequence only ever reports increasing real progress, so the
            // stored value must track the maximum and never dip on a zero.
            max_seen = max_seen.max(progress);
            assert_eq!(
                existing.progress, max_seen,
                "visible progress diverged from the running maximum after update to {progress}"
            );
        }

        assert_eq!(existing.progress, 80.0);
    }
}
