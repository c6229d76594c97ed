//! Wiggum CLI - keep resubmitting a task prompt until the agent reports
//! completion.
//!
//! The host runtime delivers lifecycle events; the `idle` subcommand reads
//! them as JSON lines on stdin and runs one idle cycle. `start`, `cancel`
//! and `status` are the control surface.

use std::io::BufRead;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use colored::Colorize;
use tracing::warn;
use tracing_subscriber::EnvFilter;

use wiggum::control::StartOptions;
use wiggum::controller::{IdleOutcome, LoopController};
use wiggum::event::AgentEvent;
use wiggum::submit::ClaudeSubmitter;
use wiggum::DEFAULT_PROMISE;

#[derive(Parser)]
#[command(name = "wiggum")]
#[command(version = "0.1.0")]
#[command(about = "Autonomous resubmission loop for agent sessions", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Workspace directory (defaults to current directory)
    #[arg(short, long, global = true, default_value = ".")]
    project: PathBuf,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start a resubmission loop for the current session
    Start {
        /// Task prompt, resent verbatim on every iteration
        prompt: String,

        /// Maximum iterations (0 = unlimited)
        #[arg(short, long, default_value = "0")]
        max_iterations: u32,

        /// Token the agent must emit inside <promise></promise> to finish
        #[arg(short, long, default_value = DEFAULT_PROMISE)]
        completion_promise: String,

        /// Session to resubmit into (falls back to the WIGGUM_SESSION_ID env var)
        #[arg(short, long, env = "WIGGUM_SESSION_ID")]
        session: Option<String>,
    },

    /// Cancel the active loop
    Cancel,

    /// Show the active loop, if any
    Status,

    /// Consume host events from stdin and run one idle cycle
    Idle,
}

fn init_tracing(verbose: bool) {
    let default_filter = if verbose { "wiggum=debug" } else { "wiggum=info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let submitter = Arc::new(ClaudeSubmitter::new(cli.project.clone()));
    let mut controller = LoopController::new(&cli.project, submitter);

    let result = match cli.command {
        Commands::Start {
            prompt,
            max_iterations,
            completion_promise,
            session,
        } => {
            if let Some(session_id) = session {
                controller.handle_event(&AgentEvent::SessionStarted { session_id });
            }
            controller.start(
                &prompt,
                StartOptions {
                    max_iterations,
                    completion_promise,
                },
            )
        }
        Commands::Cancel => controller.cancel(),
        Commands::Status => controller.status(),
        Commands::Idle => run_idle(&mut controller).await,
    };

    match result {
        Ok(message) => println!("{}", message.green()),
        Err(e) => {
            eprintln!("{} {}", "error:".red().bold(), e);
            std::process::exit(1);
        }
    }
}

/// Reads JSON-lines events from stdin, applies them, then runs the idle
/// cycle. Malformed lines are rejected at the boundary with a warning.
async fn run_idle(controller: &mut LoopController) -> wiggum::Result<String> {
    let stdin = std::io::stdin();
    for line in stdin.lock().lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        match AgentEvent::parse(&line) {
            Ok(event) => controller.handle_event(&event),
            Err(e) => warn!(error = %e, "Ignoring malformed event line"),
        }
    }

    let outcome = controller.on_idle().await?;
    Ok(match outcome {
        IdleOutcome::NoActiveLoop => "No active loop.".to_string(),
        IdleOutcome::Continued {
            iteration,
            max_iterations,
        } => {
            let cap = if max_iterations > 0 {
                format!("{max_iterations}")
            } else {
                "unlimited".to_string()
            };
            format!("Resubmitted prompt (iteration {iteration}/{cap}).")
        }
        IdleOutcome::Completed {
            iterations,
            matched,
        } => format!("Loop completed after {iterations} iterations (promise \"{matched}\")."),
        IdleOutcome::CapReached { iterations } => format!(
            "Iteration cap reached after {iterations} iterations - stopping without a completion signal."
        ),
    })
}
