//! MCP Client error types.

use thiserror::Error;

/// Errors that can occur during MCP client operations.
#[derive(Debug, Error)]
pub enum McpError {
    /// The server process failed to start.
    #[error("failed to spawn server '{name}': {reason}")]
    SpawnFailed {
        name: String,
        reason: String,
    },

    /// The initialization handshake failed.
    #[error("server '{name}' initialization failed: {reason}")]
    InitFailed {
        name: String,
        reason: String,
    },

    /// No matching message arrived within the read window.
    #[error("timed out after {timeout_ms}ms waiting for server '{server}'")]
    Timeout {
        server: String,
        timeout_ms: u64,
    },

    /// A response arrived but its shape is not what the protocol promises.
    #[error("protocol error from server '{server}': {reason}")]
    ProtocolError {
        server: String,
        reason: String,
    },

    /// The server closed its stdout while a request was pending.
    #[error("server '{server}' exited (stdout closed)")]
    ChildExited {
        server: String,
    },

    /// I/O or serialization failure on the pipe.
    #[error("transport error for server '{server}': {reason}")]
    TransportError {
        server: String,
        reason: String,
    },

    /// Server returned a JSON-RPC error response.
    #[error("server error [{code}]: {message}")]
    ServerError {
        code: i32,
        message: String,
        data: Option<serde_json::Value>,
    },

    /// The tool ran but reported failure (`isError: true`).
    #[error("tool '{tool}' failed: {message}")]
    ToolFailed {
        tool: String,
        message: String,
    },

    /// Configuration error (bad server command, unreadable config).
    #[error("config error: {reason}")]
    ConfigError {
        reason: String,
    },
}

impl McpError {
    /// Whether the transport is unusable after this error.
    ///
    /// Fatal errors end the session; the rest only fail the current call.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            McpError::ChildExited { .. }
                | McpError::TransportError { .. }
                | McpError::SpawnFailed { .. }
                | McpError::InitFailed { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_child_exit_is_fatal() {
        let err = McpError::ChildExited {
            server: "multiply".into(),
        };
        assert!(err.is_fatal());
    }

    #[test]
    fn test_timeout_is_not_fatal() {
        let err = McpError::Timeout {
            server: "multiply".into(),
            timeout_ms: 10_000,
        };
        assert!(!err.is_fatal());
        assert_eq!(
            err.to_string(),
            "timed out after 10000ms waiting for server 'multiply'"
        );
    }

    #[test]
    fn test_tool_failed_is_not_fatal() {
        let err = McpError::ToolFailed {
            tool: "multiply".into(),
            message: "missing argument 'b'".into(),
        };
        assert!(!err.is_fatal());
    }
}
