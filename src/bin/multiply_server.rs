//! multiply-server: stdio tool host exposing `multiply`.
//!
//! stdout carries protocol frames only; logs go to stderr, where the client
//! forwards them into its own log.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;

use netbuddy::config::{self, LoggingConfig};
use netbuddy::mcp_server;

#[derive(Parser)]
#[command(name = "multiply-server", about = "MCP stdio server with a multiply tool", version)]
struct Cli {
    /// Config file (default: $NETBUDDY_CONFIG or netbuddy.yaml found upward)
    #[arg(long)]
    config: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // A broken config must not take the tool host down; fall back to defaults.
    let filter = config::resolve_config(cli.config.as_deref())
        .map(|(cfg, _)| cfg.logging.filter)
        .unwrap_or_else(|_| LoggingConfig::default().filter);

    // Always stderr: the client may be writing the configured log file.
    netbuddy::init_tracing(&LoggingConfig {
        filter,
        json: false,
        file: None,
    })?;

    let stdin = std::io::stdin();
    let stdout = std::io::stdout();
    let answered = mcp_server::serve(stdin.lock(), stdout.lock()).context("stdio loop failed")?;

    tracing::debug!(answered, "exiting");
    Ok(())
}
