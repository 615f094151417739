//! Status surface and cancellation collaborators.
//!
//! The surrounding system owns the actual status store; the controller only
//! writes to it at well-defined checkpoints and never reads it back.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::domain::WorkflowStatus;
use crate::error::Result;

/// Sink for the caller-facing progress states.
///
/// Written at workflow start, at each attempt boundary, and at the terminal
/// state. The controller never blocks waiting for a poll.
#[async_trait]
pub trait StatusSink: Send + Sync {
    async fn update(&self, request_id: &str, status: WorkflowStatus) -> Result<()>;
}

/// Cancellation check, polled before each external call.
///
/// In-flight external calls are allowed to complete with their result
/// discarded; the controller just refuses to start the next one.
#[async_trait]
pub trait CancelCheck: Send + Sync {
    async fn is_cancelled(&self, request_id: &str) -> Result<bool>;
}

/// In-memory status sink for embedding and tests. Keeps the full update
/// history per request.
#[derive(Default)]
pub struct InMemoryStatusSink {
    updates: Mutex<HashMap<String, Vec<WorkflowStatus>>>,
}

impl InMemoryStatusSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// All updates recorded for a request, in order.
    pub fn history(&self, request_id: &str) -> Vec<WorkflowStatus> {
        self.updates
            .lock()
            .unwrap()
            .get(request_id)
            .cloned()
            .unwrap_or_default()
    }

    /// The most recent status for a request.
    pub fn latest(&self, request_id: &str) -> Option<WorkflowStatus> {
        self.history(request_id).last().cloned()
    }
}

#[async_trait]
impl StatusSink for InMemoryStatusSink {
    async fn update(&self, request_id: &str, status: WorkflowStatus) -> Result<()> {
        self.updates
            .lock()
            .unwrap()
            .entry(request_id.to_string())
            .or_default()
            .push(status);
        Ok(())
    }
}

/// Cancellation check that never cancels.
pub struct NeverCancelled;

#[async_trait]
impl CancelCheck for NeverCancelled {
    async fn is_cancelled(&self, _request_id: &str) -> Result<bool> {
        Ok(false)
    }
}
