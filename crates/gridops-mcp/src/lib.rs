//! Client for the grid tool server: MCP (JSON-RPC 2.0) over the newline
//! delimited stdio of a child process.

pub mod client;
pub mod error;
pub mod launch;
pub mod types;

pub use client::{McpClient, McpClientOptions};
pub use error::McpError;
pub use launch::ServerLaunch;
pub use types::{McpTool, McpToolResult, ServerInfo};

/// Protocol version sent in `initialize` unless configured otherwise.
pub const DEFAULT_PROTOCOL_VERSION: &str = "2024-11-05";
