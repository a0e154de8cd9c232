//! netbuddy: turn a network question into a device command plan.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use netbuddy::config;
use netbuddy::inference::ChatClient;
use netbuddy::planner::{self, planner_system_prompt, PlannerError, Testbed};

#[derive(Parser)]
#[command(name = "netbuddy", about = "Plan show commands for a network testbed", version)]
struct Cli {
    /// Config file (default: $NETBUDDY_CONFIG or netbuddy.yaml found upward)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Testbed YAML (overrides testbed.path)
    #[arg(long, global = true)]
    testbed: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Ask the model which device and command answer a question
    Plan {
        /// The question, e.g. "what is the default route on CAT9k_AO?"
        #[arg(required = true, num_args = 1..)]
        question: Vec<String>,
    },
    /// Print the planner system prompt for the testbed
    Prompt,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let (cfg, cfg_path) = config::resolve_config(cli.config.as_deref())?;
    netbuddy::init_tracing(&cfg.logging)?;
    tracing::debug!(config = ?cfg_path, "netbuddy starting");

    let testbed_path = cli.testbed.unwrap_or_else(|| cfg.testbed.path.clone());
    let testbed = Testbed::load(&testbed_path)?;

    match cli.command {
        Command::Prompt => {
            print!("{}", planner_system_prompt(&testbed));
        }
        Command::Plan { question } => {
            let question = question.join(" ");
            let chat = ChatClient::from_config(&cfg.planner)?;

            match planner::plan_question(&chat, &testbed, &question).await {
                Ok(planned) => println!("{}", serde_json::to_string_pretty(&planned)?),
                Err(e) => {
                    if let Some(raw) = e.raw_response() {
                        eprintln!("Model reply:\n{raw}");
                    }
                    if let PlannerError::Inference(inner) = &e {
                        if let Some(body) = inner.error_body() {
                            eprintln!("Endpoint response:\n{}", pretty_body(body));
                        }
                    }
                    if matches!(e, PlannerError::UnknownDevice { .. }) {
                        eprintln!("Check the device name against {}", testbed_path.display());
                    }
                    return Err(e.into());
                }
            }
        }
    }
    Ok(())
}

/// Pretty-print a JSON error body; anything else is shown as sent.
fn pretty_body(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| serde_json::to_string_pretty(&v).ok())
        .unwrap_or_else(|| body.to_string())
}
