//! Periodic full-listing pull.
//!
//! Polling is the resilience fallback behind the push subscription: every
//! interval it fetches the complete queue listing and applies it to the
//! store as a full-replace upsert per record. Failures are logged and
//! swallowed — a missed poll means a slightly staler view, nothing more.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::store::{StoreOp, TaskStore};
use crate::transport::QueueTransport;

/// Spawn the background task that polls the queue listing.
pub(crate) fn spawn_poller(
    transport: Arc<dyn QueueTransport>,
    store: TaskStore,
    poll_interval: Duration,
    cancel: CancellationToken,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(poll_interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    match transport.list_tasks().await {
                        Ok(tasks) => {
                            store.apply(StoreOp::SyncListing(tasks)).await;
                        }
                        Err(e) => {
                            // Never surfaced: the next tick (or a push
                            // update) restores consistency.
                            tracing::debug!(error = %e, "listing poll failed, retrying next interval");
                        }
                    }
                }
                _ = cancel.cancelled() => {
                    break;
                }
            }
        }

        tracing::debug!("listing poller stopped");
    })
}
