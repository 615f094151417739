//! Execution outcomes reported by the sandbox adapter.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// How one script execution ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeStatus {
    Success,
    SyntaxError,
    RuntimeError,
    Timeout,
    /// Process exited zero but produced no artifact
    EmptyOutput,
}

impl std::fmt::Display for OutcomeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Success => write!(f, "success"),
            Self::SyntaxError => write!(f, "syntax_error"),
            Self::RuntimeError => write!(f, "runtime_error"),
            Self::Timeout => write!(f, "timeout"),
            Self::EmptyOutput => write!(f, "empty_output"),
        }
    }
}

/// Structured result of running a script in the sandbox.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionOutcome {
    pub status: OutcomeStatus,
    /// Location of the rendered artifact, present only on success
    pub artifact: Option<PathBuf>,
    /// Captured diagnostic text (tail of stdout+stderr), present on failure
    pub diagnostic: Option<String>,
}

impl ExecutionOutcome {
    /// A successful outcome with the rendered artifact.
    pub fn success(artifact: impl Into<PathBuf>) -> Self {
        Self {
            status: OutcomeStatus::Success,
            artifact: Some(artifact.into()),
            diagnostic: None,
        }
    }

    /// A failed outcome with diagnostic text.
    pub fn failure(status: OutcomeStatus, diagnostic: impl Into<String>) -> Self {
        Self {
            status,
            artifact: None,
            diagnostic: Some(diagnostic.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == OutcomeStatus::Success
    }
}
