//! Execution sandbox adapter.
//!
//! Runs extracted scripts in an isolated subprocess and reports a structured
//! [`ExecutionOutcome`](crate::domain::ExecutionOutcome). The rendering
//! engine itself is opaque to the rest of the workflow.

mod manim;
mod traits;

pub use manim::{ManimExecutor, SandboxConfig};
pub use traits::{ScriptExecutor, ScriptedExecutor};
