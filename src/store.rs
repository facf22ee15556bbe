//! Canonical task store guarded by a single writer task.
//!
//! Poll and push both feed the same collection, so mutations are serialized
//! through one mpsc channel consumed by a dedicated writer task — update
//! ordering is whatever order operations arrive in, and the merge rules in
//! [`crate::reconcile`] make that ordering safe. Reads never touch the
//! writer: every applied change publishes an immutable snapshot through a
//! `watch` channel that readers borrow lock-free.

use std::sync::Arc;

use tokio::sync::{broadcast, mpsc, watch};
use tokio_util::sync::CancellationToken;

use crate::reconcile;
use crate::types::{Event, TaskId, TaskRecord, TaskUpdate};

/// Buffer size for the store operation channel
const OP_CHANNEL_BUFFER: usize = 256;

/// A mutation applied by the store writer
#[derive(Debug)]
pub(crate) enum StoreOp {
    /// Partial record from the push channel; dropped when the id is unknown
    PushUpdate(TaskUpdate),
    /// Complete listing from the poll channel; full-replace upsert per record
    SyncListing(Vec<TaskRecord>),
    /// Explicit removal after a successful remove command
    Remove(TaskId),
}

/// Handle to the task store.
///
/// Cheap to clone; all clones share the same writer task and snapshot
/// channel. Dropping every handle closes the operation channel and stops
/// the writer.
#[derive(Clone, Debug)]
pub struct TaskStore {
    op_tx: mpsc::Sender<StoreOp>,
    snapshot_rx: watch::Receiver<Arc<Vec<TaskRecord>>>,
}

impl TaskStore {
    /// Spawn the writer task and return a handle to it.
    pub(crate) fn spawn(event_tx: broadcast::Sender<Event>, cancel: CancellationToken) -> Self {
        let (op_tx, op_rx) = mpsc::channel(OP_CHANNEL_BUFFER);
        let (snapshot_tx, snapshot_rx) = watch::channel(Arc::new(Vec::new()));

        tokio::spawn(writer_loop(op_rx, snapshot_tx, event_tx, cancel));

        Self { op_tx, snapshot_rx }
    }

    /// Current snapshot of all tasks, in stable queue order.
    pub fn list(&self) -> Vec<TaskRecord> {
        self.snapshot_rx.borrow().as_ref().clone()
    }

    /// Look up a single task by id.
    pub fn get(&self, id: &TaskId) -> Option<TaskRecord> {
        self.snapshot_rx
            .borrow()
            .iter()
            .find(|record| &record.id == id)
            .cloned()
    }

    /// Subscribe to snapshot changes.
    ///
    /// The receiver yields a fresh `Arc` snapshot whenever the store content
    /// actually changed; borrowing it never blocks the writer.
    pub fn watch(&self) -> watch::Receiver<Arc<Vec<TaskRecord>>> {
        self.snapshot_rx.clone()
    }

    /// Queue a mutation for the writer task.
    ///
    /// After teardown the writer is gone; updates are dropped silently
    /// because nothing can consume them anymore.
    pub(crate) async fn apply(&self, op: StoreOp) {
        if self.op_tx.send(op).await.is_err() {
            tracing::debug!("store writer stopped, dropping update");
        }
    }
}

/// Single writer: owns the collection, applies merges, publishes snapshots.
async fn writer_loop(
    mut op_rx: mpsc::Receiver<StoreOp>,
    snapshot_tx: watch::Sender<Arc<Vec<TaskRecord>>>,
    event_tx: broadcast::Sender<Event>,
    cancel: CancellationToken,
) {
    let mut records: Vec<TaskRecord> = Vec::new();

    loop {
        tokio::select! {
            op = op_rx.recv() => {
                let Some(op) = op else {
                    break;
                };
                if handle_op(op, &mut records, &event_tx) {
                    snapshot_tx.send_replace(Arc::new(records.clone()));
                }
            }
            _ = cancel.cancelled() => {
                break;
            }
        }
    }

    tracing::debug!(tasks = records.len(), "store writer stopped");
}

/// Apply one operation. Returns true when the collection changed.
fn handle_op(
    op: StoreOp,
    records: &mut Vec<TaskRecord>,
    event_tx: &broadcast::Sender<Event>,
) -> bool {
    match op {
        StoreOp::PushUpdate(update) => {
            let Some(existing) = records.iter_mut().find(|r| r.id == update.id) else {
                // Unknown ids are stale or not yet listed; the next poll
                // resolves them. The store never fabricates a record.
                tracing::debug!(task_id = %update.id, "push update for unknown task, dropped");
                return false;
            };

            let before = existing.clone();
            reconcile::apply_push_update(existing, update);
            if *existing == before {
                return false;
            }

            event_tx
                .send(Event::TaskUpdated {
                    id: existing.id.clone(),
                })
                .ok();
            true
        }

        StoreOp::SyncListing(listing) => {
            let mut changed = false;

            for incoming in listing.iter() {
                match records.iter().position(|r| r.id == incoming.id) {
                    Some(pos) => {
                        let existing = &mut records[pos];
                        let before = existing.clone();
                        reconcile::apply_listing_record(existing, incoming.clone());
                        if *existing != before {
                            event_tx
                                .send(Event::TaskUpdated {
                                    id: existing.id.clone(),
                                })
                                .ok();
                            changed = true;
                        }
                    }
                    None => {
                        records.push(incoming.clone());
                        event_tx
                            .send(Event::TaskUpdated {
                                id: incoming.id.clone(),
                            })
                            .ok();
                        changed = true;
                    }
                }
            }

            event_tx
                .send(Event::QueueSynced {
                    tasks: listing.len(),
                })
                .ok();
            changed
        }

        StoreOp::Remove(id) => {
            let before = records.len();
            records.retain(|r| r.id != id);
            if records.len() == before {
                return false;
            }

            event_tx.send(Event::TaskRemoved { id }).ok();
            true
        }
    }
}
