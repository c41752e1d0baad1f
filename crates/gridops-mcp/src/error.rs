use std::time::Duration;

/// Errors raised while talking to the tool server.
#[derive(Debug, thiserror::Error)]
pub enum McpError {
    #[error("failed to spawn tool server: {0}")]
    Spawn(String),

    #[error("unsupported server script {0:?}: expected a .py or .js file")]
    UnsupportedScript(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("protocol error: {0}")]
    Protocol(String),

    #[error("server error {code}: {message}")]
    Server { code: i64, message: String },

    #[error("{method} timed out after {timeout:?}")]
    Timeout { method: String, timeout: Duration },

    #[error("tool server closed the connection")]
    Closed,

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}
