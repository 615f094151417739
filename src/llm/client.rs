//! Core model client trait and test double.

use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::ModelError;

/// Stateless model client - each call is independent (fresh context).
///
/// One invocation corresponds to one workflow suspension point; retry policy
/// lives in the workflow controller, not here.
#[async_trait]
pub trait ModelClient: Send + Sync {
    /// Send a single prompt and return the raw text response.
    async fn invoke(&self, prompt: &str, temperature: f32) -> Result<String, ModelError>;

    /// Model identifier, for logging and audit records.
    fn model(&self) -> &str;
}

/// Scripted model client for tests: returns canned responses in order.
pub struct MockModelClient {
    responses: Mutex<Vec<Result<String, ModelError>>>,
    calls: Mutex<Vec<String>>,
}

impl MockModelClient {
    /// Create a mock that yields the given responses in order.
    pub fn new(responses: Vec<String>) -> Self {
        Self {
            responses: Mutex::new(responses.into_iter().map(Ok).collect()),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Create a mock with explicit per-call results, errors included.
    pub fn with_results(results: Vec<Result<String, ModelError>>) -> Self {
        Self {
            responses: Mutex::new(results),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Prompts received so far, in call order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    /// Number of invocations so far.
    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl ModelClient for MockModelClient {
    async fn invoke(&self, prompt: &str, _temperature: f32) -> Result<String, ModelError> {
        self.calls.lock().unwrap().push(prompt.to_string());
        let mut responses = self.responses.lock().unwrap();
        if responses.is_empty() {
            return Err(ModelError::Unavailable("mock exhausted".to_string()));
        }
        responses.remove(0)
    }

    fn model(&self) -> &str {
        "mock"
    }
}
