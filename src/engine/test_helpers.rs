//! Shared test helpers for driving the engine against a scripted transport.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use crate::config::Config;
use crate::engine::SyncEngine;
use crate::error::{Error, Result};
use crate::transport::{
    ActionResponse, DuplicateAction, QueueTransport, StartRequest, StartResponse,
};
use crate::types::{RepoType, TaskId, TaskRecord, TaskStatus};

/// One remote call observed by the mock transport, in arrival order.
#[derive(Clone, Debug, PartialEq)]
pub(crate) enum Call {
    List,
    Start {
        repo_id: String,
        action: DuplicateAction,
    },
    Pause(String),
    Resume(String),
    Cancel(String),
    Remove {
        id: String,
        delete_files: bool,
    },
}

/// Scripted in-memory stand-in for the queue server.
pub(crate) struct MockTransport {
    listing: Mutex<Vec<TaskRecord>>,
    calls: Mutex<Vec<Call>>,
    start_script: Mutex<VecDeque<StartResponse>>,
    action_response: Mutex<ActionResponse>,
    fail_listing: AtomicBool,
}

impl MockTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            listing: Mutex::new(Vec::new()),
            calls: Mutex::new(Vec::new()),
            start_script: Mutex::new(VecDeque::new()),
            action_response: Mutex::new(ActionResponse {
                success: true,
                message: None,
            }),
            fail_listing: AtomicBool::new(false),
        })
    }

    pub fn with_listing(tasks: Vec<TaskRecord>) -> Arc<Self> {
        let transport = Self::new();
        transport.set_listing(tasks);
        transport
    }

    pub fn set_listing(&self, tasks: Vec<TaskRecord>) {
        *self.listing.lock().unwrap() = tasks;
    }

    pub fn set_fail_listing(&self, fail: bool) {
        self.fail_listing.store(fail, Ordering::SeqCst);
    }

    pub fn set_action_response(&self, success: bool, message: &str) {
        *self.action_response.lock().unwrap() = ActionResponse {
            success,
            message: Some(message.to_string()),
        };
    }

    pub fn push_start_response(&self, response: StartResponse) {
        self.start_script.lock().unwrap().push_back(response);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    fn record_call(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl QueueTransport for MockTransport {
    async fn list_tasks(&self) -> Result<Vec<TaskRecord>> {
        self.record_call(Call::List);
        if self.fail_listing.load(Ordering::SeqCst) {
            return Err(Error::Api {
                status: 500,
                message: "listing unavailable".to_string(),
            });
        }
        Ok(self.listing.lock().unwrap().clone())
    }

    async fn start(&self, request: &StartRequest) -> Result<StartResponse> {
        self.record_call(Call::Start {
            repo_id: request.repo_id.clone(),
            action: request.duplicate_action,
        });
        let scripted = self.start_script.lock().unwrap().pop_front();
        Ok(scripted.unwrap_or(StartResponse {
            success: true,
            message: Some("Task started".to_string()),
            error_code: None,
            path: None,
        }))
    }

    async fn pause(&self, id: &TaskId) -> Result<ActionResponse> {
        self.record_call(Call::Pause(id.as_str().to_string()));
        Ok(self.action_response.lock().unwrap().clone())
    }

    async fn resume(&self, id: &TaskId) -> Result<ActionResponse> {
        self.record_call(Call::Resume(id.as_str().to_string()));
        Ok(self.action_response.lock().unwrap().clone())
    }

    async fn cancel(&self, id: &TaskId) -> Result<ActionResponse> {
        self.record_call(Call::Cancel(id.as_str().to_string()));
        Ok(self.action_response.lock().unwrap().clone())
    }

    async fn remove(&self, id: &TaskId, delete_files: bool) -> Result<ActionResponse> {
        self.record_call(Call::Remove {
            id: id.as_str().to_string(),
            delete_files,
        });
        Ok(self.action_response.lock().unwrap().clone())
    }
}

/// Build a quiescent engine (no poll/push traffic) over the given transport.
pub(crate) fn engine_with(transport: Arc<MockTransport>) -> SyncEngine {
    SyncEngine::with_transport(Config::default(), transport)
}

/// A complete task record for test listings.
pub(crate) fn record(id: &str, status: TaskStatus, progress: f64) -> TaskRecord {
    TaskRecord {
        id: TaskId::new(id),
        repo_id: "test-org/test-model".into(),
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
        include_patterns: None,
        exclude_patterns: None,
        error_message: None,
        pausable: true,
        use_hf_transfer: false,
        created_at: None,
    }
}

/// Poll the engine's store until the predicate holds or a one second deadline.
pub(crate) async fn wait_until<F: Fn(&SyncEngine) -> bool>(engine: &SyncEngine, pred: F) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(1);
    while !pred(engine) {
        assert!(
            tokio::time::Instant::now() < deadline,
            "engine did not reach the expected state within 1s"
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

/// Resync and wait until the store reflects the transport's listing.
pub(crate) async fn sync_store(engine: &SyncEngine, expected_tasks: usize) {
    engine.resync().await.expect("resync should succeed");
    wait_until(engine, |e| e.tasks().len() == expected_tasks).await;
}
