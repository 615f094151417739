//! Intent classification results.

use serde::{Deserialize, Serialize};

/// Curriculum area detected in the source content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Curriculum {
    Math,
    Chemistry,
    Physics,
    #[default]
    Unknown,
}

impl Curriculum {
    /// Normalize a model-provided string; anything unrecognized is Unknown.
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "math" => Self::Math,
            "chemistry" => Self::Chemistry,
            "physics" => Self::Physics,
            _ => Self::Unknown,
        }
    }
}

impl std::fmt::Display for Curriculum {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Math => write!(f, "math"),
            Self::Chemistry => write!(f, "chemistry"),
            Self::Physics => write!(f, "physics"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

/// Desired output mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Static visualization or diagram
    #[default]
    Static,
    /// Animated step-by-step explanation
    Dynamic,
    /// Improve an existing scene script
    Improvement,
}

impl Mode {
    /// Normalize a model-provided string; ambiguous signals default to Static.
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "static" => Self::Static,
            "dynamic" => Self::Dynamic,
            "improvement" => Self::Improvement,
            _ => Self::Static,
        }
    }
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Static => write!(f, "static"),
            Self::Dynamic => write!(f, "dynamic"),
            Self::Improvement => write!(f, "improvement"),
        }
    }
}

/// Structured output of the intent classifier.
///
/// Produced once per request, immutable afterwards. The composer reads it to
/// select and fill templates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntentDecision {
    pub curriculum: Curriculum,
    pub mode: Mode,
    /// Key educational concepts, in the order the model listed them
    pub concepts: Vec<String>,
    /// Short analysis summary
    pub summary: String,
}

impl IntentDecision {
    /// Concepts joined for prompt substitution; falls back to a generic
    /// phrase when the classifier found none.
    pub fn concepts_joined(&self) -> String {
        if self.concepts.is_empty() {
            "general concepts".to_string()
        } else {
            self.concepts.join(", ")
        }
    }
}

impl Default for IntentDecision {
    fn default() -> Self {
        Self {
            curriculum: Curriculum::Unknown,
            mode: Mode::Static,
            concepts: Vec::new(),
            summary: String::new(),
        }
    }
}
