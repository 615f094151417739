use clap::Parser;
use colored::*;
use eyre::{Context, Result};
use log::info;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

mod cli;
mod config;

use cli::commands::Commands;
use cli::Cli;
use config::Config;

use sceneforge::domain::{GenerationRequest, RunRecord, WorkflowResult};
use sceneforge::llm::{OpenAiClient, OpenAiConfig};
use sceneforge::prompt::{PromptComposer, PromptLoader};
use sceneforge::sandbox::{ManimExecutor, SandboxConfig};
use sceneforge::storage::RunStore;
use sceneforge::workflow::{
    InMemoryStatusSink, NeverCancelled, WorkflowConfig, WorkflowController,
};

fn setup_logging() -> Result<()> {
    // Create log directory
    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("sceneforge")
        .join("logs");

    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    let log_file = log_dir.join("sceneforge.log");

    // Setup env_logger with file output
    let target = Box::new(
        fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_file)
            .context("Failed to open log file")?,
    );

    env_logger::Builder::from_default_env()
        .target(env_logger::Target::Pipe(target))
        .init();

    info!("Logging initialized, writing to: {}", log_file.display());
    Ok(())
}

fn build_composer(config: &Config) -> Result<PromptComposer> {
    match &config.prompts.templates_dir {
        Some(dir) => {
            let loader = PromptLoader::new(dir);
            Ok(PromptComposer::with_overrides(&loader)?)
        }
        None => Ok(PromptComposer::new()?),
    }
}

async fn handle_run_command(
    query: &str,
    content_file: Option<&PathBuf>,
    prior_script: Option<&PathBuf>,
    config: &Config,
    verbose: bool,
) -> Result<()> {
    let content = match content_file {
        Some(path) => fs::read_to_string(path)
            .context(format!("Failed to read content file {}", path.display()))?,
        None => String::new(),
    };

    let mut request = GenerationRequest::new(content, query);
    if let Some(path) = prior_script {
        let script = fs::read_to_string(path)
            .context(format!("Failed to read prior script {}", path.display()))?;
        request = request.with_prior_script(script);
    }

    let model = Arc::new(
        OpenAiClient::new(OpenAiConfig {
            api_url: config.model.api_url.clone(),
            model: config.model.model.clone(),
            max_tokens: config.model.max_tokens,
            timeout: Duration::from_millis(config.model.timeout_ms),
        })
        .context("Failed to create model client")?,
    );

    let composer = Arc::new(build_composer(config)?);

    let executor = Arc::new(ManimExecutor::new(SandboxConfig {
        binary: config.sandbox.binary.clone(),
        quality: config.sandbox.quality.clone(),
        output_dir: config.sandbox.output_dir.clone(),
        diagnostic_tail_chars: config.sandbox.diagnostic_tail_chars,
    }));

    let controller = WorkflowController::with_config(
        model,
        composer,
        executor,
        Arc::new(InMemoryStatusSink::new()),
        Arc::new(NeverCancelled),
        WorkflowConfig {
            max_attempts: config.workflow.max_attempts,
            execution_timeout: Duration::from_millis(config.workflow.execution_timeout_ms),
            overall_budget: Duration::from_millis(config.workflow.overall_budget_ms),
            generation_temperature: config.model.generation_temperature,
        },
    );

    println!("{} {}", "Running:".cyan(), request.id);
    info!("running request {} for query: {}", request.id, query);

    let record = controller.run(request).await;

    let store = RunStore::new(&config.storage.runs_dir).context("Failed to open run store")?;
    store.save(&record).context("Failed to persist run")?;

    print_result(&record, verbose);
    Ok(())
}

fn print_result(record: &RunRecord, verbose: bool) {
    match &record.result {
        WorkflowResult::Completed {
            artifact,
            attempts_used,
        } => {
            println!(
                "{} {} ({} attempt(s))",
                "Completed:".green(),
                artifact.display(),
                attempts_used
            );
        }
        WorkflowResult::Failed {
            reason,
            last_diagnostic,
            attempts_used,
        } => {
            println!(
                "{} {} ({} attempt(s))",
                "Failed:".red(),
                reason,
                attempts_used
            );
            if verbose {
                if let Some(diagnostic) = last_diagnostic {
                    println!("{}", diagnostic.dimmed());
                }
            }
        }
    }
}

fn handle_list_command(status: Option<&str>, config: &Config) -> Result<()> {
    let store = RunStore::new(&config.storage.runs_dir).context("Failed to open run store")?;
    let runs = store.list()?;

    let filtered: Vec<&RunRecord> = runs
        .iter()
        .filter(|r| match status {
            Some("completed") => r.result.is_success(),
            Some("failed") => !r.result.is_success(),
            _ => true,
        })
        .collect();

    if filtered.is_empty() {
        println!("No runs found");
        return Ok(());
    }

    for run in filtered {
        let label = if run.result.is_success() {
            "completed".green()
        } else {
            "failed".red()
        };
        println!(
            "{}  {}  {} attempt(s)  {}",
            run.id,
            label,
            run.result.attempts_used(),
            run.finished_at.format("%Y-%m-%d %H:%M:%S"),
        );
    }
    Ok(())
}

fn handle_show_command(id: &str, detailed: bool, config: &Config) -> Result<()> {
    let store = RunStore::new(&config.storage.runs_dir).context("Failed to open run store")?;
    let Some(run) = store.get(id)? else {
        println!("{} no run with id {}", "Not found:".red(), id);
        return Ok(());
    };

    print_result(&run, true);

    if detailed {
        for attempt in &run.attempts {
            println!();
            println!(
                "{} {} ({} template)",
                "Attempt".cyan(),
                attempt.index + 1,
                attempt.prompt.kind
            );
            if let Some(kind) = attempt.extraction_failure {
                println!("  extraction failed: {}", kind);
            }
            match &attempt.outcome {
                Some(outcome) => {
                    println!("  outcome: {}", outcome.status);
                    if let Some(diagnostic) = &outcome.diagnostic {
                        println!("  {}", diagnostic.dimmed());
                    }
                }
                None => println!("  no execution"),
            }
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Setup logging first
    setup_logging().context("Failed to setup logging")?;

    // Parse CLI arguments
    let cli = Cli::parse();

    // Load configuration
    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;

    info!("Starting with config from: {:?}", cli.config);

    match &cli.command {
        Commands::Run {
            query,
            content_file,
            prior_script,
        } => {
            handle_run_command(
                query,
                content_file.as_ref(),
                prior_script.as_ref(),
                &config,
                cli.is_verbose(),
            )
            .await
        }
        Commands::List { status } => handle_list_command(status.as_deref(), &config),
        Commands::Show { id, detailed } => handle_show_command(id, *detailed, &config),
    }
}
