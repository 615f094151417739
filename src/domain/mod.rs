//! Domain types for the generation workflow.
//!
//! These records flow through the workflow in one direction:
//! request -> decision -> prompt -> attempt -> outcome -> result.

mod attempt;
mod decision;
mod outcome;
mod request;
mod result;

pub use attempt::Attempt;
pub use decision::{Curriculum, IntentDecision, Mode};
pub use outcome::{ExecutionOutcome, OutcomeStatus};
pub use request::GenerationRequest;
pub use result::{RunRecord, WorkflowResult, WorkflowStatus};
