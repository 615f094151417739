//! Attempt records - the append-only retry history.

use serde::{Deserialize, Serialize};

use super::outcome::ExecutionOutcome;
use crate::error::ExtractionErrorKind;
use crate::prompt::Prompt;

/// One generate-execute cycle.
///
/// Attempts are append-only: each retry creates a new record rather than
/// editing the previous one, so the history read by the composer and
/// persisted for audit is never rewritten.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attempt {
    /// Zero-based position in the retry history
    pub index: u32,
    /// The prompt sent to the generation model
    pub prompt: Prompt,
    /// Raw model output, before extraction
    pub raw_model_output: String,
    /// The extracted script, absent when extraction failed
    pub extracted_script: Option<String>,
    /// Why extraction failed, when it did
    pub extraction_failure: Option<ExtractionErrorKind>,
    /// Execution result, absent when the attempt died before execution
    pub outcome: Option<ExecutionOutcome>,
}

impl Attempt {
    /// Start a new attempt record for a prompt.
    pub fn new(index: u32, prompt: Prompt) -> Self {
        Self {
            index,
            prompt,
            raw_model_output: String::new(),
            extracted_script: None,
            extraction_failure: None,
            outcome: None,
        }
    }

    /// Whether this attempt ended in a successful execution.
    pub fn succeeded(&self) -> bool {
        self.outcome.as_ref().is_some_and(|o| o.is_success())
    }

    /// The script to show a repair prompt: the extracted script when
    /// extraction worked, otherwise the raw model output.
    pub fn script_for_repair(&self) -> &str {
        self.extracted_script
            .as_deref()
            .unwrap_or(&self.raw_model_output)
    }
}
