//! The immutable input to one workflow invocation.

use serde::{Deserialize, Serialize};

use crate::id;

/// One user-initiated generation request.
///
/// Created once per invocation and owned by the workflow controller for the
/// request's lifetime. `prior_script` is present only for improvement and
/// repair flows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// Opaque identifier, supplied by the caller or generated
    pub id: String,

    /// Raw educational content (may be empty, never absent)
    pub content: String,

    /// The user's query (may be empty, never absent)
    pub query: String,

    /// Existing scene script to improve, if any
    pub prior_script: Option<String>,

    /// Diagnostics from a previous execution of `prior_script`, if any
    pub prior_diagnostics: Option<String>,
}

impl GenerationRequest {
    /// Create a request with a generated id.
    pub fn new(content: impl Into<String>, query: impl Into<String>) -> Self {
        Self {
            id: id::generate_request_id(),
            content: content.into(),
            query: query.into(),
            prior_script: None,
            prior_diagnostics: None,
        }
    }

    /// Set the request id explicitly.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    /// Attach an existing script for the improvement flow.
    pub fn with_prior_script(mut self, script: impl Into<String>) -> Self {
        self.prior_script = Some(script.into());
        self
    }

    /// Attach diagnostics from a previous execution.
    pub fn with_prior_diagnostics(mut self, diagnostics: impl Into<String>) -> Self {
        self.prior_diagnostics = Some(diagnostics.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_request_has_id() {
        let request = GenerationRequest::new("content", "query");
        assert!(!request.id.is_empty());
        assert_eq!(request.content, "content");
        assert_eq!(request.query, "query");
        assert!(request.prior_script.is_none());
        assert!(request.prior_diagnostics.is_none());
    }

    #[test]
    fn test_with_id() {
        let request = GenerationRequest::new("c", "q").with_id("req-42");
        assert_eq!(request.id, "req-42");
    }

    #[test]
    fn test_builder_methods() {
        let request = GenerationRequest::new("c", "q")
            .with_prior_script("class Old(Scene): pass")
            .with_prior_diagnostics("line 1: invalid syntax");
        assert_eq!(request.prior_script.as_deref(), Some("class Old(Scene): pass"));
        assert_eq!(request.prior_diagnostics.as_deref(), Some("line 1: invalid syntax"));
    }

    #[test]
    fn test_empty_inputs_allowed() {
        let request = GenerationRequest::new("", "");
        assert!(request.content.is_empty());
        assert!(request.query.is_empty());
    }
}
