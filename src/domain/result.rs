//! Terminal workflow results and the caller-facing status surface.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::attempt::Attempt;

/// Terminal value of one workflow run. Created exactly once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum WorkflowResult {
    Completed {
        artifact: PathBuf,
        attempts_used: u32,
    },
    Failed {
        reason: String,
        last_diagnostic: Option<String>,
        attempts_used: u32,
    },
}

impl WorkflowResult {
    pub fn is_success(&self) -> bool {
        matches!(self, WorkflowResult::Completed { .. })
    }

    pub fn attempts_used(&self) -> u32 {
        match self {
            WorkflowResult::Completed { attempts_used, .. } => *attempts_used,
            WorkflowResult::Failed { attempts_used, .. } => *attempts_used,
        }
    }
}

/// Flat progress states exposed to the surrounding system.
///
/// The caller polls or is pushed these; the workflow never blocks waiting
/// for a poll.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum WorkflowStatus {
    Processing,
    Completed { artifact: PathBuf },
    Failed { reason: String },
}

/// The persisted shape: terminal result plus the full attempt history,
/// keyed by the opaque request id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunRecord {
    pub id: String,
    pub result: WorkflowResult,
    pub attempts: Vec<Attempt>,
    pub finished_at: chrono::DateTime<chrono::Utc>,
}

impl RunRecord {
    pub fn new(id: impl Into<String>, result: WorkflowResult, attempts: Vec<Attempt>) -> Self {
        Self {
            id: id.into(),
            result,
            attempts,
            finished_at: chrono::Utc::now(),
        }
    }
}
