//! Tool-server process configuration.

use serde::{Deserialize, Serialize};

/// How the tool-execution server is launched and talked to.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Interpreter to launch the server script with. Empty means infer from
    /// the script extension (`.py` -> `python`, `.js` -> `node`).
    pub command: String,
    /// Extra arguments placed before the script path.
    pub args: Vec<String>,
    /// MCP protocol version sent in `initialize`.
    pub protocol_version: String,
    /// Upper bound on a single JSON-RPC request, in seconds (valid range: 1-600).
    pub request_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            command: String::new(),
            args: Vec::new(),
            protocol_version: "2024-11-05".into(),
            request_timeout_secs: 60,
        }
    }
}
