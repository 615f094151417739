//! Persistence for finished runs.

mod jsonl;

pub use jsonl::RunStore;
