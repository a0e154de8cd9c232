//! MCP client: JSON-RPC over stdio transport for a single tool host.
//!
//! This module handles:
//! - Spawning and owning the tool host child process
//! - Line-delimited JSON-RPC 2.0 over the process's stdio
//! - The initialize handshake, tool listing, and tool calls
//! - Graceful-then-forced shutdown
//!
//! The wire types in [`types`] are shared with the stdio tool host in
//! [`crate::mcp_server`].

pub mod client;
pub mod errors;
pub mod lifecycle;
pub mod transport;
pub mod types;

// Re-exports for convenience
pub use client::McpClient;
pub use errors::McpError;
pub use lifecycle::{spawn_server, ManagedServer, ShutdownOutcome, SpawnOptions};
pub use transport::{LineTransport, StdioTransport};
pub use types::{ClientInfo, ServerConfig, ToolDescriptor};
