//! Error types for sceneforge
//!
//! Centralized error handling using thiserror.
//!
//! Execution failures (syntax errors, timeouts, empty output) are not errors
//! here - they are data, carried in `ExecutionOutcome` and fed back into the
//! repair loop. This enum covers the conditions that abort or retry the
//! workflow itself.

use thiserror::Error;

/// Why code extraction failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionErrorKind {
    /// No fenced code region and no recognizable scene definition in the output
    NoCodeBlock,
    /// More than one top-level scene class across the candidate regions
    MultipleScenes,
    /// Extraction produced a blank script
    EmptyScript,
}

impl std::fmt::Display for ExtractionErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoCodeBlock => write!(f, "no code block"),
            Self::MultipleScenes => write!(f, "multiple scene definitions"),
            Self::EmptyScript => write!(f, "empty script"),
        }
    }
}

/// Errors from the model invocation service.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("Model endpoint unavailable: {0}")]
    Unavailable(String),

    #[error("Model call timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Missing API key: environment variable {env_var} not set")]
    MissingApiKey { env_var: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
}

impl ModelError {
    /// Whether the controller may retry this failure on the next attempt.
    pub fn is_retryable(&self) -> bool {
        match self {
            ModelError::Unavailable(_) => true,
            ModelError::Timeout(_) => true,
            ModelError::Api { status, .. } => *status >= 500 || *status == 429,
            ModelError::Network(_) => true,
            ModelError::InvalidResponse(_) => false,
            ModelError::MissingApiKey { .. } => false,
        }
    }
}

/// All error types that can occur in sceneforge
#[derive(Debug, Error)]
pub enum SceneforgeError {
    /// Malformed model response during intent classification (fatal)
    #[error("Classification failed: {0}")]
    Classification(String),

    /// Prompt template misconfiguration (fatal)
    #[error("Template error: {0}")]
    Template(String),

    /// Model output could not be turned into a script (retryable)
    #[error("Extraction failed: {0}")]
    Extraction(ExtractionErrorKind),

    /// Model invocation failure
    #[error("Model error: {0}")]
    Model(#[from] ModelError),

    /// Run storage/persistence error
    #[error("Storage error: {0}")]
    Storage(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl SceneforgeError {
    /// Fatal errors terminate the workflow immediately; everything else is
    /// absorbed by the controller and converted into repair context.
    pub fn is_fatal(&self) -> bool {
        match self {
            SceneforgeError::Classification(_) => true,
            SceneforgeError::Template(_) => true,
            SceneforgeError::Extraction(_) => false,
            SceneforgeError::Model(e) => !e.is_retryable(),
            SceneforgeError::Storage(_) => true,
            SceneforgeError::Io(_) => true,
            SceneforgeError::Json(_) => true,
        }
    }
}

/// Result type alias for sceneforge operations
pub type Result<T> = std::result::Result<T, SceneforgeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification_error() {
        let err = SceneforgeError::Classification("response was not JSON".to_string());
        assert_eq!(err.to_string(), "Classification failed: response was not JSON");
        assert!(err.is_fatal());
    }

    #[test]
    fn test_template_error_is_fatal() {
        let err = SceneforgeError::Template("missing key 'concepts'".to_string());
        assert!(err.is_fatal());
    }

    #[test]
    fn test_extraction_error_is_retryable() {
        let err = SceneforgeError::Extraction(ExtractionErrorKind::NoCodeBlock);
        assert!(!err.is_fatal());
        assert_eq!(err.to_string(), "Extraction failed: no code block");
    }

    #[test]
    fn test_extraction_kind_display() {
        assert_eq!(ExtractionErrorKind::MultipleScenes.to_string(), "multiple scene definitions");
        assert_eq!(ExtractionErrorKind::EmptyScript.to_string(), "empty script");
    }

    #[test]
    fn test_model_error_retryable() {
        assert!(ModelError::Unavailable("connection refused".to_string()).is_retryable());
        assert!(ModelError::Timeout(std::time::Duration::from_secs(30)).is_retryable());
        assert!(ModelError::Api { status: 503, message: "overloaded".to_string() }.is_retryable());
        assert!(ModelError::Api { status: 429, message: "rate limited".to_string() }.is_retryable());
        assert!(!ModelError::Api { status: 400, message: "bad request".to_string() }.is_retryable());
        assert!(!ModelError::InvalidResponse("empty choices".to_string()).is_retryable());
        assert!(!ModelError::MissingApiKey { env_var: "OPENAI_API_KEY".to_string() }.is_retryable());
    }

    #[test]
    fn test_retryable_model_error_not_fatal() {
        let err = SceneforgeError::Model(ModelError::Unavailable("down".to_string()));
        assert!(!err.is_fatal());

        let err = SceneforgeError::Model(ModelError::MissingApiKey {
            env_var: "OPENAI_API_KEY".to_string(),
        });
        assert!(err.is_fatal());
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: SceneforgeError = io_err.into();
        assert!(matches!(err, SceneforgeError::Io(_)));
        assert!(err.to_string().contains("file not found"));
    }

    #[test]
    fn test_json_error_conversion() {
        let json_err = serde_json::from_str::<serde_json::Value>("invalid").unwrap_err();
        let err: SceneforgeError = json_err.into();
        assert!(matches!(err, SceneforgeError::Json(_)));
    }

    #[test]
    fn test_extraction_kind_serde() {
        let json = serde_json::to_string(&ExtractionErrorKind::NoCodeBlock).unwrap();
        assert_eq!(json, "\"no_code_block\"");
        let back: ExtractionErrorKind = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ExtractionErrorKind::NoCodeBlock);
    }
}
