//! Prompt templates and composition.
//!
//! The composer selects one of four templates by mode (or the repair
//! template when the retry history demands it) and fills it by pure
//! substitution. Templates ship built-in and can be overridden from a
//! directory of `.md` files.

mod composer;
mod loader;
mod templates;

pub use composer::PromptComposer;
pub use loader::PromptLoader;

use serde::{Deserialize, Serialize};

/// Which template a prompt was built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TemplateKind {
    Static,
    Dynamic,
    Improvement,
    Repair,
}

impl TemplateKind {
    /// Template file stem, used for on-disk overrides.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Static => "static",
            Self::Dynamic => "dynamic",
            Self::Improvement => "improvement",
            Self::Repair => "repair",
        }
    }
}

impl std::fmt::Display for TemplateKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// A fully-substituted prompt bound to one template kind.
///
/// Constructed fresh per attempt; repair prompts differ from the initial
/// prompt by embedding the prior script and diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Prompt {
    pub kind: TemplateKind,
    pub text: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_template_kind_names() {
        assert_eq!(TemplateKind::Static.name(), "static");
        assert_eq!(TemplateKind::Dynamic.name(), "dynamic");
        assert_eq!(TemplateKind::Improvement.name(), "improvement");
        assert_eq!(TemplateKind::Repair.name(), "repair");
    }

    #[test]
    fn test_template_kind_serde() {
        let json = serde_json::to_string(&TemplateKind::Repair).unwrap();
        assert_eq!(json, "\"repair\"");
    }

    #[test]
    fn test_prompt_roundtrip() {
        let prompt = Prompt {
            kind: TemplateKind::Dynamic,
            text: "animate this".to_string(),
        };
        let json = serde_json::to_string(&prompt).unwrap();
        let back: Prompt = serde_json::from_str(&json).unwrap();
        assert_eq!(back, prompt);
    }
}
