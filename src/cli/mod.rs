//! CLI module for sceneforge - command-line interface and subcommands.
//!
//! Provides the main entry point with subcommands for running a generation
//! request and inspecting stored runs.

pub mod commands;

pub use commands::Cli;
