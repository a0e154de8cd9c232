//! Line-delimited JSON-RPC transport.
//!
//! Handles low-level communication with the tool host:
//! - Writing one JSON object per line, flushed immediately
//! - Reading lines back, skipping blanks and anything that isn't JSON
//! - Matching responses to request ids
//!
//! The transport is generic over the byte streams so tests can drive it with
//! in-memory pipes instead of a child process.

use std::time::Duration;

use serde::Serialize;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::process::{ChildStdin, ChildStdout};
use tokio::time::Instant;

use super::errors::McpError;
use super::types::JsonRpcMessage;

/// Transport over a child process's stdio.
pub type StdioTransport = LineTransport<ChildStdout, ChildStdin>;

// ─── Transport ───────────────────────────────────────────────────────────────

/// Bi-directional line-delimited JSON transport.
pub struct LineTransport<R, W> {
    server_name: String,
    reader: BufReader<R>,
    /// Bytes of the line being read. Survives a timed-out read so the rest
    /// of the line is picked up by the next call.
    line_buf: Vec<u8>,
    /// `None` once the write half has been closed.
    writer: Option<W>,
    stale_responses: u64,
}

impl<R, W> LineTransport<R, W>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    /// Create a new transport from a read half and a write half.
    pub fn new(server_name: &str, reader: R, writer: W) -> Self {
        Self {
            server_name: server_name.to_string(),
            reader: BufReader::new(reader),
            line_buf: Vec::new(),
            writer: Some(writer),
            stale_responses: 0,
        }
    }

    /// Name of the peer, used in errors and log fields.
    pub fn server_name(&self) -> &str {
        &self.server_name
    }

    /// Number of responses discarded because their request was abandoned.
    pub fn stale_responses(&self) -> u64 {
        self.stale_responses
    }

    /// Serialize `message` as one line and flush it.
    pub async fn send<T: Serialize>(&mut self, message: &T) -> Result<(), McpError> {
        let mut json = serde_json::to_string(message).map_err(|e| McpError::TransportError {
            server: self.server_name.clone(),
            reason: format!("failed to serialize message: {e}"),
        })?;
        json.push('\n');

        let writer = self.writer.as_mut().ok_or_else(|| McpError::TransportError {
            server: self.server_name.clone(),
            reason: "write half already closed".into(),
        })?;

        writer
            .write_all(json.as_bytes())
            .await
            .map_err(|e| McpError::TransportError {
                server: self.server_name.clone(),
                reason: format!("failed to write to stdin: {e}"),
            })?;
        writer.flush().await.map_err(|e| McpError::TransportError {
            server: self.server_name.clone(),
            reason: format!("failed to flush stdin: {e}"),
        })?;

        Ok(())
    }

    /// Read the next parseable message, waiting at most `timeout`.
    pub async fn recv(&mut self, timeout: Duration) -> Result<JsonRpcMessage, McpError> {
        let deadline = Instant::now() + timeout;
        self.recv_until(deadline, timeout).await
    }

    /// Read messages until one carries `id`, waiting at most `timeout` overall.
    ///
    /// Notifications and responses for other ids are dropped. A response with
    /// a lower id belongs to a request this side already gave up on; it is
    /// counted and logged rather than queued.
    pub async fn await_response(
        &mut self,
        id: u64,
        timeout: Duration,
    ) -> Result<JsonRpcMessage, McpError> {
        let deadline = Instant::now() + timeout;

        loop {
            let message = self.recv_until(deadline, timeout).await?;

            if message.is_notification() {
                tracing::debug!(
                    server = %self.server_name,
                    method = message.method.as_deref().unwrap_or(""),
                    "skipping notification while awaiting response"
                );
                continue;
            }

            match message.numeric_id() {
                Some(got) if got == id => return Ok(message),
                Some(got) if got < id => {
                    self.stale_responses += 1;
                    tracing::warn!(
                        server = %self.server_name,
                        stale_id = got,
                        expected_id = id,
                        "stale response observed; dropping"
                    );
                }
                other => {
                    tracing::debug!(
                        server = %self.server_name,
                        got = ?other,
                        expected_id = id,
                        "skipping message for another id"
                    );
                }
            }
        }
    }

    /// Close the write half. Stdio servers treat EOF on stdin as a shutdown request.
    pub async fn close(&mut self) {
        if let Some(mut writer) = self.writer.take() {
            let _ = writer.shutdown().await;
        }
    }

    async fn recv_until(
        &mut self,
        deadline: Instant,
        timeout: Duration,
    ) -> Result<JsonRpcMessage, McpError> {
        loop {
            let read = tokio::time::timeout_at(
                deadline,
                self.reader.read_until(b'\n', &mut self.line_buf),
            )
            .await;

            match read {
                Err(_) => {
                    return Err(McpError::Timeout {
                        server: self.server_name.clone(),
                        timeout_ms: timeout.as_millis() as u64,
                    })
                }
                Ok(Err(e)) => {
                    return Err(McpError::TransportError {
                        server: self.server_name.clone(),
                        reason: format!("failed to read from stdout: {e}"),
                    })
                }
                Ok(Ok(0)) => {
                    return Err(McpError::ChildExited {
                        server: self.server_name.clone(),
                    })
                }
                Ok(Ok(_)) => {}
            }

            let line = std::mem::take(&mut self.line_buf);
            if line.iter().all(u8::is_ascii_whitespace) {
                continue;
            }

            match serde_json::from_slice::<JsonRpcMessage>(&line) {
                Ok(message) => return Ok(message),
                Err(e) => {
                    // Servers sometimes print banners or log lines on stdout.
                    let text = String::from_utf8_lossy(&line);
                    tracing::debug!(
                        server = %self.server_name,
                        error = %e,
                        line = %truncate(text.trim(), 200),
                        "discarding non-JSON line"
                    );
                }
            }
        }
    }
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
