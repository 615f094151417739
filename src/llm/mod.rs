//! Model invocation layer.
//!
//! The workflow talks to the generation model through the [`ModelClient`]
//! trait; [`OpenAiClient`] is the reqwest-based production implementation
//! and [`MockModelClient`] serves tests.

mod client;
mod openai;

pub use client::{MockModelClient, ModelClient};
pub use openai::{OpenAiClient, OpenAiConfig};
