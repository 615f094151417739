//! The repair loop controller and its collaborator traits.

mod controller;
mod status;

pub use controller::{WorkflowConfig, WorkflowController, WorkflowState};
pub use status::{CancelCheck, InMemoryStatusSink, NeverCancelled, StatusSink};
