//! Repair loop controller - the retry state machine.
//!
//! Owns one request for its lifetime, drives
//! classify -> compose -> generate -> extract -> execute, and decides after
//! each failed execution whether to ask for a repair or give up. Attempts
//! are strictly sequential: each attempt's prompt depends on the prior
//! attempt's outcome, so there is nothing to parallelize.

use std::sync::Arc;
use std::time::{Duration, Instant};

use log::{debug, info, warn};

use crate::classifier::IntentClassifier;
use crate::domain::{
    Attempt, GenerationRequest, IntentDecision, RunRecord, WorkflowResult, WorkflowStatus,
};
use crate::error::SceneforgeError;
use crate::extractor;
use crate::llm::ModelClient;
use crate::prompt::PromptComposer;
use crate::sandbox::ScriptExecutor;
use crate::workflow::status::{CancelCheck, StatusSink};

/// States of the controller's machine. Terminal states are `Success` and
/// `Exhausted`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkflowState {
    Classifying,
    Composing,
    Generating,
    Extracting,
    Executing,
    Retrying,
    Success,
    Exhausted,
}

impl std::fmt::Display for WorkflowState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Classifying => "classifying",
            Self::Composing => "composing",
            Self::Generating => "generating",
            Self::Extracting => "extracting",
            Self::Executing => "executing",
            Self::Retrying => "retrying",
            Self::Success => "success",
            Self::Exhausted => "exhausted",
        };
        write!(f, "{}", name)
    }
}

/// Configuration for the workflow controller.
#[derive(Debug, Clone)]
pub struct WorkflowConfig {
    /// Maximum generate-execute cycles before declaring terminal failure
    pub max_attempts: u32,
    /// Wall-clock timeout for one script execution
    pub execution_timeout: Duration,
    /// Wall-clock budget across all attempts of one request
    pub overall_budget: Duration,
    /// Sampling temperature for generation calls
    pub generation_temperature: f32,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            execution_timeout: Duration::from_secs(120),
            overall_budget: Duration::from_secs(600),
            generation_temperature: 0.3,
        }
    }
}

/// Orchestrates one generation request from classification to terminal
/// result.
///
/// Holds no mutable state across requests; the attempt history lives on the
/// stack of `run` and is returned in the RunRecord.
pub struct WorkflowController {
    model: Arc<dyn ModelClient>,
    composer: Arc<PromptComposer>,
    executor: Arc<dyn ScriptExecutor>,
    status: Arc<dyn StatusSink>,
    cancel: Arc<dyn CancelCheck>,
    classifier: IntentClassifier,
    config: WorkflowConfig,
}

impl WorkflowController {
    pub fn new(
        model: Arc<dyn ModelClient>,
        composer: Arc<PromptComposer>,
        executor: Arc<dyn ScriptExecutor>,
        status: Arc<dyn StatusSink>,
        cancel: Arc<dyn CancelCheck>,
    ) -> Self {
        Self::with_config(
            model,
            composer,
            executor,
            status,
            cancel,
            WorkflowConfig::default(),
        )
    }

    pub fn with_config(
        model: Arc<dyn ModelClient>,
        composer: Arc<PromptComposer>,
        executor: Arc<dyn ScriptExecutor>,
        status: Arc<dyn StatusSink>,
        cancel: Arc<dyn CancelCheck>,
        config: WorkflowConfig,
    ) -> Self {
        let classifier = IntentClassifier::new(model.clone(), composer.clone());
        Self {
            model,
            composer,
            executor,
            status,
            cancel,
            classifier,
            config,
        }
    }

    /// Run the workflow to a terminal state.
    ///
    /// Always returns a RunRecord: retryable conditions are absorbed into
    /// repair prompts, fatal conditions become the terminal failed result.
    /// The caller never sees a raw error or raw model output.
    pub async fn run(&self, request: GenerationRequest) -> RunRecord {
        let started = Instant::now();
        let mut attempts: Vec<Attempt> = Vec::new();

        self.checkpoint(&request.id, WorkflowStatus::Processing).await;
        self.transition(&request.id, WorkflowState::Classifying);

        if self.cancelled(&request.id).await {
            return self.fail(request, attempts, "cancelled", None).await;
        }

        let decision = match self.classifier.classify(&request).await {
            Ok(decision) => decision,
            Err(e) => {
                let reason = e.to_string();
                return self.fail(request, attempts, &reason, None).await;
            }
        };

        loop {
            if attempts.len() as u32 >= self.config.max_attempts {
                return self.exhausted(request, attempts).await;
            }
            if started.elapsed() >= self.config.overall_budget {
                let diagnostic = last_diagnostic(&attempts);
                return self
                    .fail(request, attempts, "time budget exceeded", diagnostic)
                    .await;
            }

            match self.attempt(&request, &decision, &mut attempts).await {
                AttemptEnd::Succeeded(record) => return record,
                AttemptEnd::Retry => {
                    self.transition(&request.id, WorkflowState::Retrying);
                    self.checkpoint(&request.id, WorkflowStatus::Processing).await;
                }
                AttemptEnd::Fatal { reason, diagnostic } => {
                    return self.fail(request, attempts, &reason, diagnostic).await;
                }
            }
        }
    }

    /// Run one generate-execute cycle. Appends exactly one Attempt unless
    /// composition itself failed.
    async fn attempt(
        &self,
        request: &GenerationRequest,
        decision: &IntentDecision,
        attempts: &mut Vec<Attempt>,
    ) -> AttemptEnd {
        let index = attempts.len() as u32;

        self.transition(&request.id, WorkflowState::Composing);
        let prompt = match self.composer.compose(decision, request, attempts) {
            Ok(prompt) => prompt,
            Err(e) => {
                return AttemptEnd::Fatal {
                    reason: e.to_string(),
                    diagnostic: None,
                };
            }
        };
        let mut attempt = Attempt::new(index, prompt);

        self.transition(&request.id, WorkflowState::Generating);
        if self.cancelled(&request.id).await {
            attempts.push(attempt);
            return AttemptEnd::Fatal {
                reason: "cancelled".to_string(),
                diagnostic: None,
            };
        }
        match self
            .model
            .invoke(&attempt.prompt.text, self.config.generation_temperature)
            .await
        {
            Ok(raw) => attempt.raw_model_output = raw,
            Err(e) => {
                // Attempt-fatal: counts toward the budget, retries normally
                let retryable = e.is_retryable();
                let reason = e.to_string();
                warn!("request {}: model call failed: {}", request.id, reason);
                attempts.push(attempt);
                return if retryable {
                    AttemptEnd::Retry
                } else {
                    AttemptEnd::Fatal {
                        reason,
                        diagnostic: None,
                    }
                };
            }
        }

        self.transition(&request.id, WorkflowState::Extracting);
        let script = match extractor::extract(&attempt.raw_model_output) {
            Ok(script) => extractor::sanitize(&script),
            Err(SceneforgeError::Extraction(kind)) => {
                // A formatting mistake the next repair prompt can call out
                debug!("request {}: extraction failed: {}", request.id, kind);
                attempt.extraction_failure = Some(kind);
                attempts.push(attempt);
                return AttemptEnd::Retry;
            }
            Err(e) => {
                attempts.push(attempt);
                return AttemptEnd::Fatal {
                    reason: e.to_string(),
                    diagnostic: None,
                };
            }
        };
        attempt.extracted_script = Some(script.clone());

        self.transition(&request.id, WorkflowState::Executing);
        if self.cancelled(&request.id).await {
            attempts.push(attempt);
            return AttemptEnd::Fatal {
                reason: "cancelled".to_string(),
                diagnostic: None,
            };
        }
        let outcome = match self
            .executor
            .execute(&script, self.config.execution_timeout)
            .await
        {
            Ok(outcome) => outcome,
            Err(e) => {
                // The adapter itself broke; not a generation quality issue
                attempts.push(attempt);
                return AttemptEnd::Fatal {
                    reason: e.to_string(),
                    diagnostic: None,
                };
            }
        };

        let artifact = if outcome.is_success() {
            outcome.artifact.clone()
        } else {
            None
        };
        attempt.outcome = Some(outcome);
        attempts.push(attempt);

        if let Some(artifact) = artifact {
            self.transition(&request.id, WorkflowState::Success);
            self.checkpoint(
                &request.id,
                WorkflowStatus::Completed {
                    artifact: artifact.clone(),
                },
            )
            .await;
            info!(
                "request {}: completed with {:?} after {} attempt(s)",
                request.id,
                artifact,
                attempts.len()
            );
            let record = RunRecord::new(
                request.id.clone(),
                WorkflowResult::Completed {
                    artifact,
                    attempts_used: attempts.len() as u32,
                },
                std::mem::take(attempts),
            );
            return AttemptEnd::Succeeded(record);
        }

        AttemptEnd::Retry
    }

    /// Terminal failure after the attempt budget ran out.
    async fn exhausted(&self, request: GenerationRequest, attempts: Vec<Attempt>) -> RunRecord {
        let reason = attempts
            .last()
            .map(failure_reason)
            .unwrap_or_else(|| "attempt budget exhausted".to_string());
        let diagnostic = last_diagnostic(&attempts);
        self.fail(request, attempts, &reason, diagnostic).await
    }

    /// Build the terminal failed result and write the final checkpoint.
    async fn fail(
        &self,
        request: GenerationRequest,
        attempts: Vec<Attempt>,
        reason: &str,
        last_diagnostic: Option<String>,
    ) -> RunRecord {
        self.transition(&request.id, WorkflowState::Exhausted);
        self.checkpoint(
            &request.id,
            WorkflowStatus::Failed {
                reason: reason.to_string(),
            },
        )
        .await;
        info!(
            "request {}: failed ({}) after {} attempt(s)",
            request.id,
            reason,
            attempts.len()
        );
        RunRecord::new(
            request.id.clone(),
            WorkflowResult::Failed {
                reason: reason.to_string(),
                last_diagnostic,
                attempts_used: attempts.len() as u32,
            },
            attempts,
        )
    }

    fn transition(&self, request_id: &str, state: WorkflowState) {
        debug!("request {}: -> {}", request_id, state);
    }

    async fn checkpoint(&self, request_id: &str, status: WorkflowStatus) {
        if let Err(e) = self.status.update(request_id, status).await {
            // Progress reporting must not take the workflow down
            warn!("request {}: status update failed: {}", request_id, e);
        }
    }

    async fn cancelled(&self, request_id: &str) -> bool {
        match self.cancel.is_cancelled(request_id).await {
            Ok(cancelled) => cancelled,
            Err(e) => {
                warn!("request {}: cancel check failed: {}", request_id, e);
                false
            }
        }
    }
}

/// How one attempt ended, from the loop's perspective.
enum AttemptEnd {
    Succeeded(RunRecord),
    Retry,
    Fatal {
        reason: String,
        diagnostic: Option<String>,
    },
}

/// Human-readable reason for why an attempt failed.
fn failure_reason(attempt: &Attempt) -> String {
    if let Some(outcome) = &attempt.outcome {
        return outcome.status.to_string();
    }
    if let Some(kind) = attempt.extraction_failure {
        return format!("extraction failed: {}", kind);
    }
    "model call failed".to_string()
}

/// The most recent diagnostic text in the history, if any.
fn last_diagnostic(attempts: &[Attempt]) -> Option<String> {
    attempts
        .iter()
        .rev()
        .find_map(|a| a.outcome.as_ref().and_then(|o| o.diagnostic.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ExecutionOutcome, OutcomeStatus};
    use crate::llm::MockModelClient;
    use crate::sandbox::ScriptedExecutor;
    use crate::workflow::status::{InMemoryStatusSink, NeverCancelled};
    use async_trait::async_trait;
    use crate::error::Result;

    const SCENE_RESPONSE: &str =
        "```python\nfrom manim import *\n\nclass Proof(Scene):\n    def construct(self):\n        self.add(Square())\n```";

    fn decision_json() -> String {
        r#"{"curriculum": "math", "intention": "dynamic",
            "concepts": ["pythagorean theorem"], "summary": "animate it"}"#
            .to_string()
    }

    struct Harness {
        model: Arc<MockModelClient>,
        executor: Arc<ScriptedExecutor>,
        status: Arc<InMemoryStatusSink>,
        controller: WorkflowController,
    }

    fn harness(responses: Vec<String>, outcomes: Vec<ExecutionOutcome>) -> Harness {
        harness_with_config(responses, outcomes, WorkflowConfig::default())
    }

    fn harness_with_config(
        responses: Vec<String>,
        outcomes: Vec<ExecutionOutcome>,
        config: WorkflowConfig,
    ) -> Harness {
        let model = Arc::new(MockModelClient::new(responses));
        let executor = Arc::new(ScriptedExecutor::new(outcomes));
        let status = Arc::new(InMemoryStatusSink::new());
        let controller = WorkflowController::with_config(
            model.clone(),
            Arc::new(PromptComposer::new().unwrap()),
            executor.clone(),
            status.clone(),
            Arc::new(NeverCancelled),
            config,
        );
        Harness {
            model,
            executor,
            status,
            controller,
        }
    }

    fn request() -> GenerationRequest {
        GenerationRequest::new("a^2 + b^2 = c^2", "explain the Pythagorean theorem with an animation")
            .with_id("req-test")
    }

    #[tokio::test]
    async fn test_success_first_attempt() {
        let h = harness(
            vec![decision_json(), SCENE_RESPONSE.to_string()],
            vec![ExecutionOutcome::success("/out/Proof_a1.mp4")],
        );

        let record = h.controller.run(request()).await;

        assert!(record.result.is_success());
        assert_eq!(record.result.attempts_used(), 1);
        assert_eq!(record.attempts.len(), 1);
        // One classification call + one generation call, nothing after success
        assert_eq!(h.model.call_count(), 2);
        assert_eq!(h.executor.call_count(), 1);
    }

    #[tokio::test]
    async fn test_repair_prompt_embeds_script_and_diagnostic() {
        let h = harness(
            vec![
                decision_json(),
                SCENE_RESPONSE.to_string(),
                SCENE_RESPONSE.to_string(),
            ],
            vec![
                ExecutionOutcome::failure(OutcomeStatus::SyntaxError, "line 12: invalid syntax"),
                ExecutionOutcome::success("/out/Proof_b2.mp4"),
            ],
        );

        let record = h.controller.run(request()).await;

        assert!(record.result.is_success());
        assert_eq!(record.result.attempts_used(), 2);

        // Third model call is the repair prompt
        let calls = h.model.calls();
        assert_eq!(calls.len(), 3);
        let repair = &calls[2];
        assert!(repair.contains("class Proof(Scene):"));
        assert!(repair.contains("line 12"));
        assert!(repair.contains("pythagorean theorem"));
    }

    #[tokio::test]
    async fn test_exhausted_after_max_attempts() {
        let h = harness(
            vec![
                decision_json(),
                SCENE_RESPONSE.to_string(),
                SCENE_RESPONSE.to_string(),
                SCENE_RESPONSE.to_string(),
            ],
            vec![
                ExecutionOutcome::failure(OutcomeStatus::SyntaxError, "bad 1"),
                ExecutionOutcome::failure(OutcomeStatus::SyntaxError, "bad 2"),
                ExecutionOutcome::failure(OutcomeStatus::SyntaxError, "bad 3"),
            ],
        );

        let record = h.controller.run(request()).await;

        match &record.result {
            WorkflowResult::Failed {
                reason,
                last_diagnostic,
                attempts_used,
            } => {
                assert_eq!(reason, "syntax_error");
                assert_eq!(last_diagnostic.as_deref(), Some("bad 3"));
                assert_eq!(*attempts_used, 3);
            }
            other => panic!("expected failure, got {:?}", other),
        }
        assert_eq!(record.attempts.len(), 3);
        // 1 classification + 3 generations, none past the budget
        assert_eq!(h.model.call_count(), 4);
    }

    #[tokio::test]
    async fn test_extraction_failure_is_retried() {
        let h = harness(
            vec![
                decision_json(),
                "I can't write that code, sorry.".to_string(),
                SCENE_RESPONSE.to_string(),
            ],
            vec![ExecutionOutcome::success("/out/Proof_c3.mp4")],
        );

        let record = h.controller.run(request()).await;

        assert!(record.result.is_success());
        assert_eq!(record.result.attempts_used(), 2);
        assert_eq!(record.attempts[0].extraction_failure, Some(crate::error::ExtractionErrorKind::NoCodeBlock));
        // Only one execution: the first attempt never reached the sandbox
        assert_eq!(h.executor.call_count(), 1);

        let calls = h.model.calls();
        assert!(calls[2].contains("not valid, extractable code"));
    }

    #[tokio::test]
    async fn test_classification_error_is_terminal() {
        let h = harness(vec!["this is not json".to_string()], vec![]);

        let record = h.controller.run(request()).await;

        match &record.result {
            WorkflowResult::Failed { reason, attempts_used, .. } => {
                assert!(reason.contains("Classification failed"));
                assert_eq!(*attempts_used, 0);
            }
            other => panic!("expected failure, got {:?}", other),
        }
        assert_eq!(h.executor.call_count(), 0);
    }

    #[tokio::test]
    async fn test_retryable_model_errors_consume_budget() {
        use crate::error::ModelError;
        let model = Arc::new(MockModelClient::with_results(vec![
            Ok(decision_json()),
            Err(ModelError::Unavailable("down".to_string())),
            Err(ModelError::Unavailable("down".to_string())),
            Err(ModelError::Unavailable("down".to_string())),
        ]));
        let executor = Arc::new(ScriptedExecutor::new(vec![]));
        let controller = WorkflowController::new(
            model.clone(),
            Arc::new(PromptComposer::new().unwrap()),
            executor.clone(),
            Arc::new(InMemoryStatusSink::new()),
            Arc::new(NeverCancelled),
        );

        let record = controller.run(request()).await;

        match &record.result {
            WorkflowResult::Failed { reason, attempts_used, .. } => {
                assert_eq!(reason, "model call failed");
                assert_eq!(*attempts_used, 3);
            }
            other => panic!("expected failure, got {:?}", other),
        }
        assert_eq!(executor.call_count(), 0);
    }

    #[tokio::test]
    async fn test_non_retryable_model_error_is_terminal() {
        use crate::error::ModelError;
        let model = Arc::new(MockModelClient::with_results(vec![
            Ok(decision_json()),
            Err(ModelError::InvalidResponse("empty choices".to_string())),
        ]));
        let controller = WorkflowController::new(
            model.clone(),
            Arc::new(PromptComposer::new().unwrap()),
            Arc::new(ScriptedExecutor::new(vec![])),
            Arc::new(InMemoryStatusSink::new()),
            Arc::new(NeverCancelled),
        );

        let record = controller.run(request()).await;

        match &record.result {
            WorkflowResult::Failed { reason, attempts_used, .. } => {
                assert!(reason.contains("Invalid response"));
                assert_eq!(*attempts_used, 1);
            }
            other => panic!("expected failure, got {:?}", other),
        }
        // Classification + one failed generation, then stop
        assert_eq!(model.call_count(), 2);
    }

    #[tokio::test]
    async fn test_timeout_retries_without_extra_waiting() {
        let h = harness(
            vec![
                decision_json(),
                SCENE_RESPONSE.to_string(),
                SCENE_RESPONSE.to_string(),
            ],
            vec![
                ExecutionOutcome::failure(OutcomeStatus::Timeout, "execution timed out"),
                ExecutionOutcome::success("/out/Proof_d4.mp4"),
            ],
        );

        let started = Instant::now();
        let record = h.controller.run(request()).await;

        assert!(record.result.is_success());
        assert_eq!(record.result.attempts_used(), 2);
        // The retry composes immediately; with stub collaborators the whole
        // run is near-instant
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_time_budget_exceeded() {
        let config = WorkflowConfig {
            overall_budget: Duration::ZERO,
            ..WorkflowConfig::default()
        };
        let h = harness_with_config(vec![decision_json()], vec![], config);

        let record = h.controller.run(request()).await;

        match &record.result {
            WorkflowResult::Failed { reason, .. } => {
                assert_eq!(reason, "time budget exceeded");
            }
            other => panic!("expected failure, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_status_checkpoints_ordered() {
        let h = harness(
            vec![decision_json(), SCENE_RESPONSE.to_string()],
            vec![ExecutionOutcome::success("/out/Proof_e5.mp4")],
        );

        h.controller.run(request()).await;

        let history = h.status.history("req-test");
        assert!(history.len() >= 2);
        assert_eq!(history[0], WorkflowStatus::Processing);
        assert!(matches!(history.last().unwrap(), WorkflowStatus::Completed { .. }));
    }

    #[tokio::test]
    async fn test_failed_status_published() {
        let h = harness(vec!["not json".to_string()], vec![]);

        h.controller.run(request()).await;

        match h.status.latest("req-test") {
            Some(WorkflowStatus::Failed { reason }) => {
                assert!(reason.contains("Classification failed"));
            }
            other => panic!("expected failed status, got {:?}", other),
        }
    }

    struct AlwaysCancelled;

    #[async_trait]
    impl CancelCheck for AlwaysCancelled {
        async fn is_cancelled(&self, _request_id: &str) -> Result<bool> {
            Ok(true)
        }
    }

    #[tokio::test]
    async fn test_cancelled_before_first_call() {
        let model = Arc::new(MockModelClient::new(vec![decision_json()]));
        let controller = WorkflowController::new(
            model.clone(),
            Arc::new(PromptComposer::new().unwrap()),
            Arc::new(ScriptedExecutor::new(vec![])),
            Arc::new(InMemoryStatusSink::new()),
            Arc::new(AlwaysCancelled),
        );

        let record = controller.run(request()).await;

        match &record.result {
            WorkflowResult::Failed { reason, .. } => assert_eq!(reason, "cancelled"),
            other => panic!("expected failure, got {:?}", other),
        }
        // Cancelled before the classification call was issued
        assert_eq!(model.call_count(), 0);
    }

    #[tokio::test]
    async fn test_scripts_are_sanitized_before_execution() {
        let tainted = "```python\nimport subprocess\nclass Proof(Scene):\n    def construct(self):\n        self.add(Dot())\n```";
        let h = harness(
            vec![decision_json(), tainted.to_string()],
            vec![ExecutionOutcome::success("/out/Proof_f6.mp4")],
        );

        h.controller.run(request()).await;

        let executed = h.executor.executed();
        assert_eq!(executed.len(), 1);
        assert!(!executed[0].contains("subprocess"));
        assert!(executed[0].contains("from manim import"));
    }

    #[test]
    fn test_state_display() {
        assert_eq!(WorkflowState::Classifying.to_string(), "classifying");
        assert_eq!(WorkflowState::Exhausted.to_string(), "exhausted");
    }

    #[test]
    fn test_config_defaults() {
        let config = WorkflowConfig::default();
        assert_eq!(config.max_attempts, 3);
        assert_eq!(config.execution_timeout, Duration::from_secs(120));
    }
}
