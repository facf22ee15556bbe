//! # hf-queue-sync
//!
//! Client-side synchronization engine for the download queue of a Hugging
//! Face artifact manager.
//!
//! The queue itself lives in a co-located server process that executes the
//! transfers. This crate keeps a faithful local view of it: a push
//! subscription delivers incremental task updates the moment they happen, a
//! periodic listing poll backstops anything the socket missed, and both
//! channels converge through one merge policy that never lets visible
//! progress jump backwards during transfers that can run for hours.
//!
//! ## Design Philosophy
//!
//! - **Server-authoritative** - Commands request state changes; the view is
//!   only ever updated from server responses, never optimistically
//! - **Two channels, one store** - Push and poll both land in a single
//!   writer-guarded store, so update ordering cannot corrupt the view
//! - **Nothing is fatal** - Transport failures degrade to a stale view that
//!   self-corrects within one poll interval
//! - **Library-first** - No CLI or UI, purely a Rust crate for embedding;
//!   consumers subscribe to events and snapshots
//!
//! ## Quick Start
//!
//! ```no_run
//! use hf_queue_sync::{Config, DownloadRequest, StartOutcome, SyncEngine};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let engine = SyncEngine::connect(Config::default())?;
//!
//!     // Subscribe to events
//!     let mut events = engine.subscribe();
//!     tokio::spawn(async move {
//!         while let Ok(event) = events.recv().await {
//!             println!("Event: {:?}", event);
//!         }
//!     });
//!
//!     // Request a download; a duplicate target surfaces as a choice.
//!     match engine.start(DownloadRequest::new("meta-llama/Llama-2-7b-hf")).await? {
//!         StartOutcome::Started { .. } => {}
//!         StartOutcome::Conflict(conflict) => {
//!             // Keep the existing files and resume into them.
//!             let _ = conflict.overwrite().await?;
//!         }
//!     }
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Configuration types
pub mod config;
/// Synchronization engine (decomposed into focused submodules)
pub mod engine;
/// Error types
pub mod error;
/// Canonical task store
pub mod store;
/// Queue server transport and wire types
pub mod transport;
/// Core types and events
pub mod types;
/// Size and speed formatting helpers
pub mod utils;

mod reconcile;

// Re-export commonly used types
pub use config::Config;
pub use engine::{DownloadRequest, DuplicateConflict, FilterPreset, StartOutcome, SyncEngine};
pub use error::{CommandError, Error, Result};
pub use store::TaskStore;
pub use transport::{
    ActionResponse, DUPLICATE_ERROR_CODE, DuplicateAction, HttpTransport, QueueTransport,
    StartRequest, StartResponse,
};
pub use types::{Event, RepoType, TaskId, TaskRecord, TaskStatus, TaskUpdate};
