//! MCP stdio tool host
//!
//! Manual implementation of the Model Context Protocol over stdin/stdout,
//! exposing a single `multiply` tool. The client side lives in
//! [`crate::mcp_client`].

pub mod server;
pub mod tools;

pub use server::serve;
