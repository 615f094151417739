//! Prompt composer - select and fill templates.

use handlebars::Handlebars;
use serde_json::json;

use super::loader::PromptLoader;
use super::templates;
use super::{Prompt, TemplateKind};
use crate::domain::{Attempt, GenerationRequest, IntentDecision, Mode};
use crate::error::{Result, SceneforgeError};

/// Name of the classification template in the registry.
const CLASSIFIER_TEMPLATE: &str = "classifier";

/// Composes prompts from registered Handlebars templates.
///
/// Template filling is pure substitution: no side effects, no external
/// calls. Strict mode is on, so a missing substitution key surfaces as a
/// `Template` error instead of an empty section.
pub struct PromptComposer {
    handlebars: Handlebars<'static>,
}

impl PromptComposer {
    /// Create a composer with the built-in templates.
    pub fn new() -> Result<Self> {
        let mut handlebars = Handlebars::new();
        handlebars.set_strict_mode(true);
        handlebars.register_escape_fn(handlebars::no_escape);

        let mut composer = Self { handlebars };
        composer.register(CLASSIFIER_TEMPLATE, templates::CLASSIFIER)?;
        composer.register(TemplateKind::Static.name(), templates::STATIC)?;
        composer.register(TemplateKind::Dynamic.name(), templates::DYNAMIC)?;
        composer.register(TemplateKind::Improvement.name(), templates::IMPROVEMENT)?;
        composer.register(TemplateKind::Repair.name(), templates::REPAIR)?;
        Ok(composer)
    }

    /// Create a composer, replacing built-ins with any overrides found in
    /// the loader's directory.
    pub fn with_overrides(loader: &PromptLoader) -> Result<Self> {
        let mut composer = Self::new()?;
        for name in loader.list_available()? {
            let content = loader.load(&name)?;
            composer.register(&name, &content)?;
        }
        Ok(composer)
    }

    fn register(&mut self, name: &str, template: &str) -> Result<()> {
        self.handlebars
            .register_template_string(name, template)
            .map_err(|e| {
                SceneforgeError::Template(format!("failed to register '{}': {}", name, e))
            })
    }

    fn render(&self, name: &str, context: &serde_json::Value) -> Result<String> {
        self.handlebars
            .render(name, context)
            .map_err(|e| SceneforgeError::Template(format!("failed to render '{}': {}", name, e)))
    }

    /// Build the classification prompt for a request.
    pub fn classification(&self, request: &GenerationRequest) -> Result<String> {
        self.render(
            CLASSIFIER_TEMPLATE,
            &json!({
                "content": request.content,
                "query": request.query,
            }),
        )
    }

    /// Build the prompt for the next attempt.
    ///
    /// Selects by decision mode on the first attempt; selects the repair
    /// template unconditionally once a prior attempt exists that did not
    /// succeed. Repair prompts embed the most recent script, the most recent
    /// diagnostic, and the decision's concepts - the generation model has no
    /// other access to that context.
    pub fn compose(
        &self,
        decision: &IntentDecision,
        request: &GenerationRequest,
        history: &[Attempt],
    ) -> Result<Prompt> {
        if let Some(last) = history.last() {
            if !last.succeeded() {
                return self.compose_repair(decision, request, last);
            }
        }

        let kind = match decision.mode {
            Mode::Static => TemplateKind::Static,
            Mode::Dynamic => TemplateKind::Dynamic,
            Mode::Improvement => TemplateKind::Improvement,
        };

        let context = match kind {
            TemplateKind::Improvement => json!({
                "curriculum": decision.curriculum.to_string(),
                "concepts": decision.concepts_joined(),
                "prior_script": request.prior_script.as_deref().unwrap_or(""),
                "prior_diagnostics": request.prior_diagnostics.as_deref().unwrap_or(""),
                "query": request.query,
            }),
            _ => json!({
                "curriculum": decision.curriculum.to_string(),
                "concepts": decision.concepts_joined(),
                "summary": decision.summary,
                "content": request.content,
                "query": request.query,
            }),
        };

        let text = self.render(kind.name(), &context)?;
        Ok(Prompt { kind, text })
    }

    fn compose_repair(
        &self,
        decision: &IntentDecision,
        request: &GenerationRequest,
        last: &Attempt,
    ) -> Result<Prompt> {
        let diagnostic = last
            .outcome
            .as_ref()
            .and_then(|o| o.diagnostic.clone())
            .or_else(|| {
                last.extraction_failure.map(|kind| {
                    format!("previous output was not valid, extractable code ({})", kind)
                })
            })
            .unwrap_or_else(|| "previous attempt failed without diagnostics".to_string());

        let context = json!({
            "concepts": decision.concepts_joined(),
            "script": last.script_for_repair(),
            "diagnostic": diagnostic,
            "query": request.query,
        });

        let text = self.render(TemplateKind::Repair.name(), &context)?;
        Ok(Prompt {
            kind: TemplateKind::Repair,
            text,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Curriculum, ExecutionOutcome, OutcomeStatus};
    use crate::error::ExtractionErrorKind;

    fn decision() -> IntentDecision {
        IntentDecision {
            curriculum: Curriculum::Math,
            mode: Mode::Dynamic,
            concepts: vec!["pythagorean theorem".to_string()],
            summary: "animate the proof".to_string(),
        }
    }

    fn request() -> GenerationRequest {
        GenerationRequest::new("a^2 + b^2 = c^2", "explain with an animation")
    }

    fn failed_attempt(diagnostic: &str) -> Attempt {
        let composer = PromptComposer::new().unwrap();
        let prompt = composer.compose(&decision(), &request(), &[]).unwrap();
        let mut attempt = Attempt::new(0, prompt);
        attempt.raw_model_output = "```python\nclass P(Scene): pass\n```".to_string();
        attempt.extracted_script = Some("class P(Scene): pass".to_string());
        attempt.outcome = Some(ExecutionOutcome::failure(
            OutcomeStatus::SyntaxError,
            diagnostic,
        ));
        attempt
    }

    #[test]
    fn test_classification_prompt() {
        let composer = PromptComposer::new().unwrap();
        let text = composer.classification(&request()).unwrap();
        assert!(text.contains("a^2 + b^2 = c^2"));
        assert!(text.contains("explain with an animation"));
    }

    #[test]
    fn test_compose_selects_by_mode() {
        let composer = PromptComposer::new().unwrap();

        let mut d = decision();
        d.mode = Mode::Static;
        assert_eq!(composer.compose(&d, &request(), &[]).unwrap().kind, TemplateKind::Static);

        d.mode = Mode::Dynamic;
        assert_eq!(composer.compose(&d, &request(), &[]).unwrap().kind, TemplateKind::Dynamic);

        d.mode = Mode::Improvement;
        assert_eq!(
            composer.compose(&d, &request(), &[]).unwrap().kind,
            TemplateKind::Improvement
        );
    }

    #[test]
    fn test_compose_embeds_decision_and_request() {
        let composer = PromptComposer::new().unwrap();
        let prompt = composer.compose(&decision(), &request(), &[]).unwrap();
        assert!(prompt.text.contains("math"));
        assert!(prompt.text.contains("pythagorean theorem"));
        assert!(prompt.text.contains("animate the proof"));
        assert!(prompt.text.contains("a^2 + b^2 = c^2"));
    }

    #[test]
    fn test_improvement_embeds_prior_script() {
        let composer = PromptComposer::new().unwrap();
        let mut d = decision();
        d.mode = Mode::Improvement;
        let req = request().with_prior_script("class Old(Scene):\n    pass");

        let prompt = composer.compose(&d, &req, &[]).unwrap();
        assert_eq!(prompt.kind, TemplateKind::Improvement);
        assert!(prompt.text.contains("class Old(Scene):"));
    }

    #[test]
    fn test_improvement_embeds_prior_diagnostics() {
        let composer = PromptComposer::new().unwrap();
        let mut d = decision();
        d.mode = Mode::Improvement;
        let req = request()
            .with_prior_script("class Old(Scene):\n    pass")
            .with_prior_diagnostics("labels overlap at 480p");

        let prompt = composer.compose(&d, &req, &[]).unwrap();
        assert!(prompt.text.contains("labels overlap at 480p"));

        // Without diagnostics the section is omitted entirely
        let bare = request().with_prior_script("class Old(Scene):\n    pass");
        let prompt = composer.compose(&d, &bare, &[]).unwrap();
        assert!(!prompt.text.contains("Known issues"));
    }

    #[test]
    fn test_repair_selected_after_failure() {
        let composer = PromptComposer::new().unwrap();
        let history = vec![failed_attempt("line 12: invalid syntax")];

        let prompt = composer.compose(&decision(), &request(), &history).unwrap();
        assert_eq!(prompt.kind, TemplateKind::Repair);
        // Repair context: script, diagnostic, concepts
        assert!(prompt.text.contains("class P(Scene): pass"));
        assert!(prompt.text.contains("line 12"));
        assert!(prompt.text.contains("pythagorean theorem"));
    }

    #[test]
    fn test_repair_after_extraction_failure() {
        let composer = PromptComposer::new().unwrap();
        let prompt = composer.compose(&decision(), &request(), &[]).unwrap();
        let mut attempt = Attempt::new(0, prompt);
        attempt.raw_model_output = "I cannot produce code for this.".to_string();
        attempt.extraction_failure = Some(ExtractionErrorKind::NoCodeBlock);

        let prompt = composer
            .compose(&decision(), &request(), &[attempt])
            .unwrap();
        assert_eq!(prompt.kind, TemplateKind::Repair);
        assert!(prompt.text.contains("not valid, extractable code"));
        assert!(prompt.text.contains("I cannot produce code for this."));
    }

    #[test]
    fn test_first_attempt_not_repair() {
        let composer = PromptComposer::new().unwrap();
        let prompt = composer.compose(&decision(), &request(), &[]).unwrap();
        assert_ne!(prompt.kind, TemplateKind::Repair);
    }

    #[test]
    fn test_override_replaces_builtin() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join("static.md"), "custom: {{query}}").unwrap();

        let loader = PromptLoader::new(temp_dir.path());
        let composer = PromptComposer::with_overrides(&loader).unwrap();

        let mut d = decision();
        d.mode = Mode::Static;
        let prompt = composer.compose(&d, &request(), &[]).unwrap();
        assert_eq!(prompt.text, "custom: explain with an animation");
    }

    #[test]
    fn test_strict_mode_missing_key_is_template_error() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join("static.md"), "needs {{nonexistent_key}}").unwrap();

        let loader = PromptLoader::new(temp_dir.path());
        let composer = PromptComposer::with_overrides(&loader).unwrap();

        let mut d = decision();
        d.mode = Mode::Static;
        let err = composer.compose(&d, &request(), &[]).unwrap_err();
        assert!(matches!(err, SceneforgeError::Template(_)));
    }
}
