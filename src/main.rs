use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};

use prompt_golem::analytics::AnyAnalytics;
use prompt_golem::assistants::AssistantsClient;
use prompt_golem::config::{self, GolemConfig, CONFIG_FILE_NAME};
use prompt_golem::coordinator::Optimizer;
use prompt_golem::feedback;
use prompt_golem::golem_error::{GolemError, Result};
use prompt_golem::log::{job_tag, parse_log_level};
use prompt_golem::rest_store::RestStore;
use prompt_golem::status;
use prompt_golem::types::{AnalysisState, AnalysisType, Feedback, Optimization, Suggestion};
use prompt_golem::{log_info, log_warn};

type CliOptimizer = Optimizer<RestStore, AssistantsClient, AnyAnalytics>;

#[derive(Parser)]
#[command(
    name = "prompt-golem",
    about = "Parallel prompt analysis and revision"
)]
struct Cli {
    /// Path to config file (defaults to ./prompt-golem.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Log verbosity level (error, warn, info, debug)
    #[arg(long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze a prompt and produce a revised version
    Optimize {
        /// Prompt text
        #[arg(long, conflicts_with = "prompt_file", required_unless_present = "prompt_file")]
        prompt: Option<String>,
        /// Read the prompt from a file instead
        #[arg(long)]
        prompt_file: Option<PathBuf>,
        /// Free-form instructions for the custom analysis
        #[arg(long, default_value = "")]
        instructions: String,
        /// Regenerate from a completed job, avoiding its rejected suggestions
        #[arg(long)]
        parent: Option<String>,
        /// Report progress and print the revised prompt when done
        #[arg(long)]
        wait: bool,
    },
    /// Show which analyses of a job have finished
    Status { job_id: String },
    /// Show the revised prompt and suggestions of a finished job
    Result { job_id: String },
    /// Record feedback on a suggestion
    Review {
        suggestion_id: String,
        #[command(flatten)]
        verdict: Verdict,
    },
}

#[derive(Args)]
#[group(required = true, multiple = false)]
struct Verdict {
    /// Mark the suggestion as accepted
    #[arg(long)]
    accept: bool,
    /// Mark the suggestion as rejected; regenerations will avoid it
    #[arg(long)]
    reject: bool,
    /// Reset the suggestion to unrated
    #[arg(long)]
    clear: bool,
}

impl Verdict {
    fn feedback(&self) -> Feedback {
        if self.accept {
            Feedback::Accepted
        } else if self.reject {
            Feedback::Rejected
        } else {
            Feedback::Unrated
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    match parse_log_level(&cli.log_level) {
        Ok(level) => prompt_golem::log::set_log_level(level),
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(2);
        }
    }

    let config_path = cli
        .config
        .unwrap_or_else(|| PathBuf::from(CONFIG_FILE_NAME));

    let result = run_command(cli.command, &config_path).await;

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(if e.is_caller_error() { 2 } else { 1 });
    }
}

async fn run_command(command: Commands, config_path: &Path) -> Result<()> {
    match command {
        Commands::Optimize {
            prompt,
            prompt_file,
            instructions,
            parent,
            wait,
        } => {
            let config = config::load_config(config_path).map_err(GolemError::Config)?;
            let optimizer = build_optimizer(&config)?;
            let prompt = match (prompt, prompt_file) {
                (Some(text), _) => text,
                (None, Some(path)) => std::fs::read_to_string(&path).map_err(|e| {
                    GolemError::InvalidInput(format!("Failed to read {}: {}", path.display(), e))
                })?,
                (None, None) => {
                    return Err(GolemError::InvalidInput(
                        "either --prompt or --prompt-file is required".to_string(),
                    ))
                }
            };
            handle_optimize(&optimizer, &prompt, &instructions, parent.as_deref(), wait).await
        }
        // Read-only and review commands never reach the model service.
        Commands::Status { job_id } => handle_status(&build_store(config_path)?, &job_id).await,
        Commands::Result { job_id } => handle_result(&build_store(config_path)?, &job_id).await,
        Commands::Review {
            suggestion_id,
            verdict,
        } => {
            let store = build_store(config_path)?;
            let verdict = verdict.feedback();
            feedback::review(&store, &suggestion_id, verdict).await?;
            println!("Recorded {:?} for suggestion {}", verdict, suggestion_id);
            Ok(())
        }
    }
}

fn build_store(config_path: &Path) -> Result<RestStore> {
    let config = config::load_store_config(config_path).map_err(GolemError::Config)?;
    RestStore::new(&config.store)
}

fn build_optimizer(config: &GolemConfig) -> Result<CliOptimizer> {
    let store = RestStore::new(&config.store)?;
    let model = AssistantsClient::new(&config.model)?;
    let analytics = AnyAnalytics::from_config(&config.analytics)?;
    Ok(Optimizer::new(
        Arc::new(store),
        Arc::new(model),
        Arc::new(analytics),
        &config.execution,
    ))
}

async fn handle_optimize(
    optimizer: &CliOptimizer,
    prompt: &str,
    instructions: &str,
    parent: Option<&str>,
    wait: bool,
) -> Result<()> {
    let cancel = optimizer.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log_warn!("Interrupted, cancelling in-flight analyses");
            cancel.cancel();
        }
    });

    let job_id = optimizer.submit(prompt, instructions, parent).await?;
    println!("{}", job_id);

    // The job runs in this process, so always wait for it to finish.
    if wait {
        tokio::select! {
            _ = optimizer.shutdown() => {}
            _ = report_progress(optimizer, &job_id) => {}
        }
    } else {
        optimizer.shutdown().await;
    }

    match optimizer.result(&job_id).await? {
        Some((optimization, suggestions)) => {
            if wait {
                print_result(&optimization, &suggestions);
            }
            Ok(())
        }
        None => Err(GolemError::UnexpectedResponse(format!(
            "job {} finished without an optimized prompt",
            job_id
        ))),
    }
}

/// Log each analysis as it finishes. Never returns on its own.
async fn report_progress(optimizer: &CliOptimizer, job_id: &str) {
    let mut seen = AnalysisState::default();
    loop {
        match optimizer.status(job_id).await {
            Ok(state) => {
                for analysis_type in AnalysisType::ALL {
                    if state.get(analysis_type) && !seen.get(analysis_type) {
                        log_info!(
                            "{} {} analysis finished",
                            job_tag(job_id, None),
                            analysis_type.display_name()
                        );
                    }
                }
                seen = state;
            }
            Err(e) => log_warn!("{} Status check failed: {}", job_tag(job_id, None), e),
        }
        tokio::time::sleep(std::time::Duration::from_secs(2)).await;
    }
}

async fn handle_status(store: &RestStore, job_id: &str) -> Result<()> {
    let state = status::status(store, job_id).await?;
    for analysis_type in AnalysisType::ALL {
        let mark = if state.get(analysis_type) { "done" } else { "running" };
        println!("{:<22} {}", analysis_type.display_name(), mark);
    }
    println!(
        "{:<22} {}",
        "All analyses",
        if state.completed() { "done" } else { "running" }
    );
    Ok(())
}

async fn handle_result(store: &RestStore, job_id: &str) -> Result<()> {
    match status::result(store, job_id).await? {
        Some((optimization, suggestions)) => print_result(&optimization, &suggestions),
        None => println!("Job {} is still pending", job_id),
    }
    Ok(())
}

fn print_result(optimization: &Optimization, suggestions: &[Suggestion]) {
    println!("--- Optimized prompt ---");
    println!("{}", optimization.optimized_prompt);
    println!();
    println!("--- Suggestions ({}) ---", suggestions.len());
    for suggestion in suggestions {
        let verdict = if suggestion.is_rejected() {
            "rejected"
        } else if suggestion.user_feedback == Feedback::Accepted.value() {
            "accepted"
        } else {
            "unrated"
        };
        println!(
            "[{}] {} ({})",
            suggestion.analysis_type.display_name(),
            suggestion.id,
            verdict
        );
        println!("  Target:     {}", suggestion.target);
        println!("  Suggestion: {}", suggestion.suggestion);
        if !suggestion.reasoning.is_empty() {
            println!("  Reasoning:  {}", suggestion.reasoning);
        }
    }
}
