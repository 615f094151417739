//! Manim subprocess executor.
//!
//! Writes the script to a scratch directory, runs the manim CLI against it
//! with a hard timeout, classifies the result, and copies the rendered
//! artifact into the output directory.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use log::{debug, warn};
use tokio::process::Command;

use crate::domain::{ExecutionOutcome, OutcomeStatus};
use crate::error::Result;
use crate::extractor;
use crate::id;
use crate::sandbox::traits::ScriptExecutor;

/// Diagnostic markers that indicate a parse failure rather than a crash.
const SYNTAX_MARKERS: &[&str] = &[
    "SyntaxError",
    "invalid syntax",
    "IndentationError",
    "TabError",
];

/// Configuration for the Manim executor
#[derive(Debug, Clone)]
pub struct SandboxConfig {
    /// Manim binary to invoke
    pub binary: String,
    /// Render quality flag
    pub quality: String,
    /// Where successful artifacts are copied
    pub output_dir: PathBuf,
    /// Diagnostic text is truncated to this many characters, keeping the
    /// tail - the most actionable error is usually last
    pub diagnostic_tail_chars: usize,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            binary: "manim".to_string(),
            quality: "-qm".to_string(),
            output_dir: PathBuf::from("generated"),
            diagnostic_tail_chars: 4000,
        }
    }
}

/// Executes scene scripts through the manim CLI.
pub struct ManimExecutor {
    config: SandboxConfig,
}

impl ManimExecutor {
    pub fn new(config: SandboxConfig) -> Self {
        Self { config }
    }

    /// Keep only the tail of the combined diagnostic stream.
    fn truncate_diagnostic(&self, text: &str) -> String {
        truncate_tail(text, self.config.diagnostic_tail_chars)
    }

    /// Find the rendered media file under manim's media directory:
    /// videos first, then images.
    fn find_artifact(&self, media_dir: &Path) -> Option<PathBuf> {
        for pattern in ["videos/**/*.mp4", "images/**/*.png"] {
            let full = media_dir.join(pattern);
            if let Ok(paths) = glob::glob(&full.to_string_lossy()) {
                if let Some(found) = paths.flatten().next() {
                    return Some(found);
                }
            }
        }
        None
    }

    /// Copy the artifact into the output directory under a unique name.
    fn publish_artifact(&self, found: &Path, scene: &str) -> std::io::Result<PathBuf> {
        std::fs::create_dir_all(&self.config.output_dir)?;
        let extension = found
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("mp4");
        let filename = format!("{}_{}.{}", scene, id::generate_artifact_suffix(), extension);
        let dest = self.config.output_dir.join(filename);
        std::fs::copy(found, &dest)?;
        Ok(dest)
    }
}

#[async_trait]
impl ScriptExecutor for ManimExecutor {
    async fn execute(&self, script: &str, timeout: Duration) -> Result<ExecutionOutcome> {
        // Pre-flight: the CLI needs the scene class name as its entry point
        let Some(scene) = extractor::scene_name(script) else {
            return Ok(ExecutionOutcome::failure(
                OutcomeStatus::RuntimeError,
                "no Scene class found in the script",
            ));
        };

        let work_dir =
            std::env::temp_dir().join(format!("sceneforge_{}", id::generate_artifact_suffix()));
        std::fs::create_dir_all(&work_dir)?;
        let media_dir = work_dir.join("media");
        let script_path = work_dir.join("scene.py");
        std::fs::write(&script_path, script)?;

        debug!("executing scene '{}' in {:?}", scene, work_dir);

        let outcome = self
            .run_in(&work_dir, &media_dir, &scene, timeout)
            .await;

        if let Err(e) = std::fs::remove_dir_all(&work_dir) {
            warn!("failed to clean up sandbox dir {:?}: {}", work_dir, e);
        }

        outcome
    }
}

impl ManimExecutor {
    async fn run_in(
        &self,
        work_dir: &Path,
        media_dir: &Path,
        scene: &str,
        timeout: Duration,
    ) -> Result<ExecutionOutcome> {
        let mut cmd = Command::new(&self.config.binary);
        cmd.arg(&self.config.quality)
            .arg("--media_dir")
            .arg(media_dir)
            .arg("scene.py")
            .arg(scene)
            .current_dir(work_dir)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let child = cmd.spawn()?;

        let output = match tokio::time::timeout(timeout, child.wait_with_output()).await {
            Ok(result) => result?,
            Err(_) => {
                return Ok(ExecutionOutcome::failure(
                    OutcomeStatus::Timeout,
                    format!("execution timed out after {:?}", timeout),
                ));
            }
        };

        let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr);
        if !stderr.is_empty() {
            if !combined.is_empty() {
                combined.push('\n');
            }
            combined.push_str(&stderr);
        }
        let diagnostic = self.truncate_diagnostic(&combined);

        if !output.status.success() {
            return Ok(ExecutionOutcome::failure(
                classify_failure(&diagnostic),
                diagnostic,
            ));
        }

        match self.find_artifact(media_dir) {
            Some(found) => {
                let published = self.publish_artifact(&found, scene)?;
                Ok(ExecutionOutcome::success(published))
            }
            None => Ok(ExecutionOutcome::failure(
                OutcomeStatus::EmptyOutput,
                "process exited cleanly but produced no artifact",
            )),
        }
    }
}

/// Classify a nonzero-exit diagnostic. Unknown shapes map to a runtime
/// error rather than failing the adapter.
fn classify_failure(diagnostic: &str) -> OutcomeStatus {
    if SYNTAX_MARKERS.iter().any(|m| diagnostic.contains(m)) {
        OutcomeStatus::SyntaxError
    } else {
        OutcomeStatus::RuntimeError
    }
}

/// Keep the last `max_chars` characters of `text`, on a char boundary.
fn truncate_tail(text: &str, max_chars: usize) -> String {
    let count = text.chars().count();
    if count <= max_chars {
        return text.to_string();
    }
    text.chars().skip(count - max_chars).collect()
}
