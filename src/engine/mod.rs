//! Synchronization engine split into focused submodules.
//!
//! The `SyncEngine` struct and its methods are organized by domain:
//! - [`poller`] - Periodic full-listing pull
//! - [`push`] - Auto-reconnecting push subscription
//! - [`commands`] - Control command dispatch and post-command resync
//! - [`duplicate`] - Start requests and duplicate-target resolution

mod commands;
mod duplicate;
mod poller;
mod push;

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
pub(crate) mod test_helpers;

pub use duplicate::{DownloadRequest, DuplicateConflict, FilterPreset, StartOutcome};

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::store::TaskStore;
use crate::transport::{HttpTransport, QueueTransport};
use crate::types::{Event, TaskId, TaskRecord};

/// Client-side synchronization engine for a server-managed download queue.
///
/// The engine keeps a canonical task store in sync with the queue server
/// through two channels — a push subscription and a periodic listing poll —
/// and dispatches user commands, resynchronizing the view after each one.
/// It is cheap to clone (all fields are Arc-wrapped); clones share the same
/// store, subscription and background tasks.
#[derive(Clone)]
pub struct SyncEngine {
    /// Server transport (pluggable; HTTP in production)
    pub(crate) transport: Arc<dyn QueueTransport>,
    /// Canonical task store
    pub(crate) store: TaskStore,
    /// Event broadcast channel sender (multiple subscribers supported)
    pub(crate) event_tx: tokio::sync::broadcast::Sender<Event>,
    /// Configuration (wrapped in Arc for sharing across tasks)
    pub(crate) config: Arc<Config>,
    /// Cancellation token stopping every background task on teardown
    pub(crate) cancel: CancellationToken,
    /// Whether the background channels have been started
    started: Arc<AtomicBool>,
    /// Whether the engine has been torn down
    closed: Arc<AtomicBool>,
}

impl SyncEngine {
    /// Create an engine against the configured server and start synchronizing.
    ///
    /// This builds the HTTP transport, spawns the store writer, the listing
    /// poller and the push subscription, and returns immediately; the first
    /// listing arrives within one poll interval.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use hf_queue_sync::{Config, SyncEngine};
    ///
    /// #[tokio::main]
    /// async fn main() -> Result<(), Box<dyn std::error::Error>> {
    ///     let engine = SyncEngine::connect(Config::default())?;
    ///
    ///     let mut events = engine.subscribe();
    ///     tokio::spawn(async move {
    ///         while let Ok(event) = events.recv().await {
    ///             println!("Event: {:?}", event);
    ///         }
    ///     });
    ///
    ///     Ok(())
    /// }
    /// ```
    pub fn connect(config: Config) -> Result<Self> {
        let transport = Arc::new(HttpTransport::new(&config)?);
        let engine = Self::with_transport(config, transport);
        engine.start_sync()?;
        Ok(engine)
    }

    /// Create an engine around a custom transport without starting the
    /// background channels.
    ///
    /// The store writer runs, commands dispatch and resync works, but no
    /// poll or push traffic flows until [`start_sync`](Self::start_sync) is
    /// called. Useful for embedding against an in-process backend and for
    /// testing.
    pub fn with_transport(config: Config, transport: Arc<dyn QueueTransport>) -> Self {
        let (event_tx, _rx) = tokio::sync::broadcast::channel(config.event_capacity);
        let cancel = CancellationToken::new();
        let store = TaskStore::spawn(event_tx.clone(), cancel.clone());

        Self {
            transport,
            store,
            event_tx,
            config: Arc::new(config),
            cancel,
            started: Arc::new(AtomicBool::new(false)),
            closed: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Start the poll and push channels.
    ///
    /// Idempotent: calling this more than once never spawns duplicate
    /// subscriptions. Fails if the engine has already been closed.
    pub fn start_sync(&self) -> Result<()> {
        self.ensure_open()?;
        let push_url = self.config.push_url()?;
        if self.started.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        poller::spawn_poller(
            self.transport.clone(),
            self.store.clone(),
            self.config.poll_interval,
            self.cancel.clone(),
        );

        push::spawn_push_client(
            push_url,
            self.store.clone(),
            self.event_tx.clone(),
            self.config.reconnect_delay,
            self.cancel.clone(),
        );

        Ok(())
    }

    /// Subscribe to engine events
    ///
    /// Multiple subscribers are supported. Each subscriber receives all
    /// events independently. Events are buffered; a subscriber that falls
    /// behind by more than the configured capacity receives a
    /// `RecvError::Lagged` error.
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<Event> {
        self.event_tx.subscribe()
    }

    /// Current snapshot of all tasks, in stable queue order
    pub fn tasks(&self) -> Vec<TaskRecord> {
        self.store.list()
    }

    /// Look up a single task by id
    pub fn task(&self, id: &TaskId) -> Option<TaskRecord> {
        self.store.get(id)
    }

    /// Access the underlying store handle
    pub fn store(&self) -> &TaskStore {
        &self.store
    }

    /// Stream of task snapshots, yielding whenever the store changes
    pub fn task_stream(
        &self,
    ) -> tokio_stream::wrappers::WatchStream<Arc<Vec<TaskRecord>>> {
        tokio_stream::wrappers::WatchStream::new(self.store.watch())
    }

    /// Get the current configuration
    pub fn get_config(&self) -> Arc<Config> {
        Arc::clone(&self.config)
    }

    /// Tear the engine down.
    ///
    /// Stops the poller, closes the push socket and stops the store writer,
    /// each exactly once. Idempotent: a second call is a no-op, so an owner
    /// may close defensively on every shutdown path without duplicating
    /// subscriptions on re-initialization.
    pub fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }

        tracing::info!("closing queue synchronization engine");
        self.cancel.cancel();
        self.emit_event(Event::Closed);
    }

    /// Returns an error once the engine has been closed.
    pub(crate) fn ensure_open(&self) -> Result<()> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(Error::Closed);
        }
        Ok(())
    }

    /// Emit an event to all subscribers
    ///
    /// If there are no active subscribers the event is silently dropped —
    /// synchronization never depends on anyone listening.
    pub(crate) fn emit_event(&self, event: Event) {
        self.event_tx.send(event).ok();
    }
}
