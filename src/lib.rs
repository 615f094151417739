//! Sceneforge - educational animation generation through a repair loop
//!
//! Sceneforge turns raw educational content plus a user query into a
//! rendered Manim animation: classify the request, compose a prompt,
//! generate a scene script with a model call, execute it in a sandbox, and
//! feed failures back into repair prompts until the render succeeds or the
//! attempt budget runs out.

pub mod classifier;
pub mod domain;
pub mod error;
pub mod extractor;
pub mod id;
pub mod llm;
pub mod prompt;
pub mod sandbox;
pub mod storage;
pub mod workflow;

pub use error::{Result, SceneforgeError};
