//! CLI command definitions using clap.
//!
//! Defines the main CLI structure and subcommands:
//! - run: generate an animation script from content and a query
//! - list: list stored runs
//! - show: show a stored run by request id

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Sceneforge - LLM-driven educational animation generation
#[derive(Parser, Debug)]
#[command(name = "sceneforge")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Optional config file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Check if verbose mode is enabled
    pub fn is_verbose(&self) -> bool {
        self.verbose
    }
}

/// Main subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a generation request to completion
    Run {
        /// What the animation should teach or show
        query: String,

        /// File with the educational content to ground the animation in
        #[arg(short = 'f', long)]
        content_file: Option<PathBuf>,

        /// Existing script to improve instead of generating from scratch
        #[arg(long)]
        prior_script: Option<PathBuf>,
    },

    /// List stored runs, most recent first
    List {
        /// Filter by result (completed, failed)
        #[arg(short, long)]
        status: Option<String>,
    },

    /// Show a stored run
    Show {
        /// Request id to look up
        id: String,

        /// Include the full attempt history
        #[arg(short, long)]
        detailed: bool,
    },
}
