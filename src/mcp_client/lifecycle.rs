//! Server process lifecycle management.
//!
//! Spawns the tool host as a child process, forwards its stderr to the log,
//! runs the initialization handshake, and tears the process down again.
//! The child is created with kill-on-drop, so a `ManagedServer` that goes out
//! of scope without an explicit [`ManagedServer::shutdown`] still takes its
//! process with it.

use std::process::ExitStatus;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, ChildStderr, ChildStdin, ChildStdout, Command};

use super::client::{McpClient, DEFAULT_REQUEST_TIMEOUT};
use super::errors::McpError;
use super::transport::LineTransport;
use super::types::{ClientInfo, ServerConfig};

// ─── Constants ───────────────────────────────────────────────────────────────

/// Grace period between closing stdin and force-killing the process.
pub const DEFAULT_SHUTDOWN_GRACE: Duration = Duration::from_secs(1);

/// Log target for forwarded server stderr lines.
const STDERR_TARGET: &str = "netbuddy::server_stderr";

// ─── Options ─────────────────────────────────────────────────────────────────

/// Session settings applied when spawning a server.
#[derive(Debug, Clone)]
pub struct SpawnOptions {
    pub client_info: ClientInfo,
    pub request_timeout: Duration,
    pub shutdown_grace: Duration,
}

impl Default for SpawnOptions {
    fn default() -> Self {
        Self {
            client_info: ClientInfo {
                name: "multiply-demo-client".into(),
                version: "1.0".into(),
            },
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            shutdown_grace: DEFAULT_SHUTDOWN_GRACE,
        }
    }
}

// ─── ManagedServer ───────────────────────────────────────────────────────────

/// How a shutdown ended.
#[derive(Debug)]
pub enum ShutdownOutcome {
    /// The process exited on its own after stdin closed.
    Exited(ExitStatus),
    /// The grace period ran out and the process was killed.
    Killed,
    /// The process could not be waited on or killed.
    Unknown(String),
}

/// A running tool host with its protocol session.
pub struct ManagedServer {
    /// Human-readable server name (e.g., "multiply").
    pub name: String,
    process: Child,
    client: McpClient<ChildStdout, ChildStdin>,
    shutdown_grace: Duration,
}

impl ManagedServer {
    /// The protocol session for this server.
    pub fn client(&mut self) -> &mut McpClient<ChildStdout, ChildStdin> {
        &mut self.client
    }

    /// OS process id, if the process has not been reaped yet.
    pub fn pid(&self) -> Option<u32> {
        self.process.id()
    }

    /// Stop the server: close its stdin, wait out the grace period, then kill.
    ///
    /// Never fails; whatever happened is reported in the returned outcome.
    pub async fn shutdown(&mut self) -> ShutdownOutcome {
        self.client.transport_mut().close().await;

        let outcome = match tokio::time::timeout(self.shutdown_grace, self.process.wait()).await {
            Ok(Ok(status)) => ShutdownOutcome::Exited(status),
            Ok(Err(e)) => {
                tracing::warn!(server = %self.name, error = %e, "wait failed; killing");
                self.force_kill().await
            }
            Err(_) => {
                tracing::warn!(
                    server = %self.name,
                    grace_ms = self.shutdown_grace.as_millis() as u64,
                    "server did not exit in time; killing"
                );
                self.force_kill().await
            }
        };

        tracing::info!(server = %self.name, outcome = ?outcome, "server stopped");
        outcome
    }

    async fn force_kill(&mut self) -> ShutdownOutcome {
        match self.process.kill().await {
            Ok(()) => ShutdownOutcome::Killed,
            Err(e) => ShutdownOutcome::Unknown(e.to_string()),
        }
    }
}

// ─── Spawning ────────────────────────────────────────────────────────────────

/// Spawn a server process and perform the initialization handshake.
///
/// If the handshake fails the process is shut down before the error is
/// returned.
pub async fn spawn_server(
    name: &str,
    config: &ServerConfig,
    options: SpawnOptions,
) -> Result<ManagedServer, McpError> {
    if config.command.trim().is_empty() {
        return Err(McpError::ConfigError {
            reason: format!("server '{name}' has an empty command"),
        });
    }

    let mut cmd = Command::new(&config.command);
    cmd.args(&config.args);

    for (key, value) in &config.env {
        cmd.env(key, value);
    }

    if let Some(dir) = config.cwd.as_deref() {
        cmd.current_dir(dir);
    }

    // Windows: prevent console window from appearing for child processes
    #[cfg(target_os = "windows")]
    {
        const CREATE_NO_WINDOW: u32 = 0x08000000;
        cmd.creation_flags(CREATE_NO_WINDOW);
    }

    cmd.stdin(std::process::Stdio::piped());
    cmd.stdout(std::process::Stdio::piped());
    cmd.stderr(std::process::Stdio::piped());
    cmd.kill_on_drop(true);

    let mut child = cmd.spawn().map_err(|e| McpError::SpawnFailed {
        name: name.to_string(),
        reason: format!("{} ({e})", config.command),
    })?;

    let stdin = child.stdin.take().ok_or(McpError::SpawnFailed {
        name: name.to_string(),
        reason: "failed to capture stdin".into(),
    })?;

    let stdout = child.stdout.take().ok_or(McpError::SpawnFailed {
        name: name.to_string(),
        reason: "failed to capture stdout".into(),
    })?;

    if let Some(stderr) = child.stderr.take() {
        forward_stderr(name, stderr);
    }

    tracing::info!(
        server = name,
        command = %config.command,
        args = ?config.args,
        pid = ?child.id(),
        "spawned server"
    );

    let mut client = McpClient::new(LineTransport::new(name, stdout, stdin), options.client_info);
    client.set_request_timeout(options.request_timeout);

    let mut server = ManagedServer {
        name: name.to_string(),
        process: child,
        client,
        shutdown_grace: options.shutdown_grace,
    };

    let handshake = server.client.initialize().await.map(|_| ());
    if let Err(e) = handshake {
        server.shutdown().await;
        return Err(McpError::InitFailed {
            name: name.to_string(),
            reason: e.to_string(),
        });
    }

    Ok(server)
}

/// Forward each stderr line from the server to the log.
///
/// Runs as a detached task: it is never joined and ends by itself when the
/// stream closes, which happens when the process exits.
fn forward_stderr(name: &str, stderr: ChildStderr) {
    let name = name.to_string();
    tokio::spawn(async move {
        let mut lines = BufReader::new(stderr).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => {
                    tracing::info!(target: STDERR_TARGET, server = %name, "{}", line.trim_end())
                }
                Ok(None) => break,
                Err(e) => {
                    tracing::debug!(target: STDERR_TARGET, server = %name, error = %e, "stderr read failed");
                    break;
                }
            }
        }
    });
}

// ─── Tests ───────────────────────────────────────────────────────────────────
