//! multiply-client: spawns the multiply tool host and multiplies numbers
//! typed at the prompt.

use std::io::Write;
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use serde_json::json;
use tokio::io::{AsyncBufReadExt, BufReader};

use netbuddy::config;
use netbuddy::mcp_client::{spawn_server, ManagedServer};
use netbuddy::repl::{parse_line, render_result, ReplInput, PROMPT, USAGE_HINT};

#[derive(Parser)]
#[command(name = "multiply-client", about = "Interactive client for the multiply tool host", version)]
struct Cli {
    /// Config file (default: $NETBUDDY_CONFIG or netbuddy.yaml found upward)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Server command to launch instead of the configured one
    #[arg(long)]
    server: Option<String>,

    /// Arguments for --server (repeatable)
    #[arg(long = "server-arg", requires = "server")]
    server_args: Vec<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let (cfg, cfg_path) = config::resolve_config(cli.config.as_deref())?;
    netbuddy::init_tracing(&cfg.logging)?;
    tracing::info!(config = ?cfg_path, "multiply-client starting");

    let mut server_config = cfg.server_config();
    if let Some(command) = cli.server {
        server_config.command = command;
        server_config.args = cli.server_args;
    }

    let mut server = spawn_server("multiply", &server_config, cfg.spawn_options())
        .await
        .with_context(|| format!("could not start {}", server_config.command))?;
    tracing::info!(server = %server.name, pid = ?server.pid(), "session ready");

    let result = run_session(&mut server).await;
    server.shutdown().await;
    result
}

async fn run_session(server: &mut ManagedServer) -> anyhow::Result<()> {
    let tools = server.client().tools_list().await?;
    let names: Vec<&str> = tools.iter().map(|t| t.name.as_str()).collect();
    println!("Available tools: {}", names.join(", "));

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("{PROMPT}");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };

        let (a, b) = match parse_line(&line) {
            ReplInput::Exit => break,
            ReplInput::Invalid => {
                println!("{USAGE_HINT}");
                continue;
            }
            ReplInput::Operands(a, b) => (a, b),
        };

        match server.client().tools_call("multiply", json!({ "a": a, "b": b })).await {
            Ok(result) => println!("{}", render_result(&result)),
            Err(e) if e.is_fatal() => return Err(e.into()),
            Err(e) => {
                tracing::warn!(error = %e, "multiply call failed");
                println!("Error: {e}");
            }
        }
    }

    let stale = server.client().stale_responses();
    if stale > 0 {
        tracing::warn!(stale, "session saw late responses");
    }
    Ok(())
}
