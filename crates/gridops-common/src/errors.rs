use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("config parse error: {0}")]
    ParseError(String),

    #[error("config validation error: {0}")]
    ValidationError(String),
}

/// Errors that end the process during bootstrap. Per-query failures are
/// reported through `gridops_ai::AiError` instead and never reach this type.
#[derive(Debug, thiserror::Error)]
pub enum GridOpsError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("tool server error: {0}")]
    ToolServer(String),

    #[error("model error: {0}")]
    Model(String),
}
