//! Intent classifier - one model call turning raw content plus a query into
//! a structured [`IntentDecision`].
//!
//! No retries at this layer: a malformed or non-JSON model response is a
//! hard `Classification` error surfaced to the caller. Missing or ambiguous
//! `curriculum`/`intention` fields are defaulted instead - that is a
//! data-quality default, not error recovery.

use std::sync::Arc;

use log::debug;
use serde_json::Value;

use crate::domain::{Curriculum, GenerationRequest, IntentDecision, Mode};
use crate::error::{Result, SceneforgeError};
use crate::llm::ModelClient;
use crate::prompt::PromptComposer;

/// Maximum number of concepts kept from the model's list.
const MAX_CONCEPTS: usize = 5;

/// Classifies a request into curriculum, mode, and key concepts.
pub struct IntentClassifier {
    model: Arc<dyn ModelClient>,
    composer: Arc<PromptComposer>,
    /// Low temperature for consistent classification
    temperature: f32,
}

impl IntentClassifier {
    pub fn new(model: Arc<dyn ModelClient>, composer: Arc<PromptComposer>) -> Self {
        Self {
            model,
            composer,
            temperature: 0.0,
        }
    }

    /// Classify the request. Issues exactly one model call.
    ///
    /// If the request carries a prior script, the mode is forced to
    /// `Improvement` regardless of what the model said - enforced here, not
    /// left to the model.
    pub async fn classify(&self, request: &GenerationRequest) -> Result<IntentDecision> {
        let prompt = self.composer.classification(request)?;
        let raw = self.model.invoke(&prompt, self.temperature).await?;

        let parsed = parse_json_payload(&raw)?;
        let mut decision = decision_from_json(&parsed);

        if request.prior_script.is_some() {
            decision.mode = Mode::Improvement;
        }

        debug!(
            "classified request {}: curriculum={} mode={} concepts={:?}",
            request.id, decision.curriculum, decision.mode, decision.concepts
        );
        Ok(decision)
    }
}

/// Pull a JSON object out of the model response, tolerating a ```json fence
/// around it. Anything that does not parse to an object is a hard error.
fn parse_json_payload(raw: &str) -> Result<Value> {
    let candidate = strip_json_fence(raw);
    let value: Value = serde_json::from_str(candidate.trim()).map_err(|e| {
        SceneforgeError::Classification(format!("response was not valid JSON: {}", e))
    })?;
    if !value.is_object() {
        return Err(SceneforgeError::Classification(
            "response JSON was not an object".to_string(),
        ));
    }
    Ok(value)
}

/// Return the contents of the first fenced region, or the whole input when
/// no fence is present.
fn strip_json_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(start) = trimmed.find("```") else {
        return trimmed;
    };
    let after_fence = &trimmed[start + 3..];
    // Skip the info string (e.g. "json") up to the end of the line
    let body_start = after_fence.find('\n').map(|i| i + 1).unwrap_or(0);
    let body = &after_fence[body_start..];
    match body.find("```") {
        Some(end) => &body[..end],
        None => body,
    }
}

/// Map the parsed JSON onto a decision, applying the documented defaults.
fn decision_from_json(value: &Value) -> IntentDecision {
    let curriculum = value
        .get("curriculum")
        .and_then(|v| v.as_str())
        .map(Curriculum::parse)
        .unwrap_or_default();

    let mode = value
        .get("intention")
        .and_then(|v| v.as_str())
        .map(Mode::parse)
        .unwrap_or_default();

    let concepts: Vec<String> = value
        .get("concepts")
        .and_then(|v| v.as_array())
        .map(|items| {
            items
                .iter()
                .filter_map(|c| c.as_str())
                .map(str::to_string)
                .take(MAX_CONCEPTS)
                .collect()
        })
        .unwrap_or_default();

    let summary = value
        .get("summary")
        .and_then(|v| v.as_str())
        .unwrap_or("")
        .to_string();

    IntentDecision {
        curriculum,
        mode,
        concepts,
        summary,
    }
}
