//! Script executor trait and test double.

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::domain::{ExecutionOutcome, OutcomeStatus};
use crate::error::Result;

/// Runs a script in an isolated external environment.
///
/// Implementations must enforce the wall-clock timeout and must not let the
/// script persist state outside its own artifact output directory.
#[async_trait]
pub trait ScriptExecutor: Send + Sync {
    /// Execute the script and classify how it ended.
    ///
    /// Execution failures are data in the returned outcome; an `Err` from
    /// this method means the adapter itself broke (e.g. could not create a
    /// working directory), not that the script failed.
    async fn execute(&self, script: &str, timeout: Duration) -> Result<ExecutionOutcome>;
}

/// Scripted executor for tests: returns canned outcomes in order.
pub struct ScriptedExecutor {
    outcomes: Mutex<Vec<ExecutionOutcome>>,
    executed: Mutex<Vec<String>>,
}

impl ScriptedExecutor {
    pub fn new(outcomes: Vec<ExecutionOutcome>) -> Self {
        Self {
            outcomes: Mutex::new(outcomes),
            executed: Mutex::new(Vec::new()),
        }
    }

    /// Scripts received so far, in call order.
    pub fn executed(&self) -> Vec<String> {
        self.executed.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.executed.lock().unwrap().len()
    }
}

#[async_trait]
impl ScriptExecutor for ScriptedExecutor {
    async fn execute(&self, script: &str, _timeout: Duration) -> Result<ExecutionOutcome> {
        self.executed.lock().unwrap().push(script.to_string());
        let mut outcomes = self.outcomes.lock().unwrap();
        if outcomes.is_empty() {
            return Ok(ExecutionOutcome::failure(
                OutcomeStatus::RuntimeError,
                "scripted executor exhausted",
            ));
        }
        Ok(outcomes.remove(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_scripted_executor_in_order() {
        let executor = ScriptedExecutor::new(vec![
            ExecutionOutcome::failure(OutcomeStatus::SyntaxError, "bad"),
            ExecutionOutcome::success("/tmp/a.mp4"),
        ]);

        let first = executor.execute("s1", Duration::from_secs(1)).await.unwrap();
        assert_eq!(first.status, OutcomeStatus::SyntaxError);

        let second = executor.execute("s2", Duration::from_secs(1)).await.unwrap();
        assert!(second.is_success());

        assert_eq!(executor.call_count(), 2);
        assert_eq!(executor.executed(), vec!["s1", "s2"]);
    }

    #[tokio::test]
    async fn test_scripted_executor_exhausted() {
        let executor = ScriptedExecutor::new(vec![]);
        let outcome = executor.execute("s", Duration::from_secs(1)).await.unwrap();
        assert_eq!(outcome.status, OutcomeStatus::RuntimeError);
    }
}
