//! Tool execution: the seam between a session and the tool server.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, info};

use gridops_mcp::{McpClient, McpClientOptions, McpError, McpTool, ServerInfo, ServerLaunch};

use crate::ToolSpec;

/// Runs one named tool. No retries; a failure is reported once.
#[async_trait]
pub trait ToolExecutor: Send + Sync {
    async fn execute(&self, name: &str, arguments: &Value) -> Result<Value, ToolExecutionError>;
}

#[derive(Debug, thiserror::Error)]
pub enum ToolExecutionError {
    #[error("tool transport failed: {0}")]
    Transport(String),
    #[error("tool reported an error: {0}")]
    Remote(String),
    #[error("tool call timed out after {0:?}")]
    Timeout(Duration),
}

impl From<McpError> for ToolExecutionError {
    fn from(e: McpError) -> Self {
        match e {
            McpError::Timeout { timeout, .. } => ToolExecutionError::Timeout(timeout),
            McpError::Server { code, message } => {
                ToolExecutionError::Remote(format!("{message} (code {code})"))
            }
            other => ToolExecutionError::Transport(other.to_string()),
        }
    }
}

/// [`ToolExecutor`] backed by an MCP tool server.
pub struct McpToolBridge {
    client: McpClient,
}

impl McpToolBridge {
    pub fn new(client: McpClient) -> Self {
        Self { client }
    }

    /// Spawn the server described by `launch` and complete the handshake.
    pub async fn connect(launch: &ServerLaunch, options: McpClientOptions) -> Result<Self, McpError> {
        let client = McpClient::spawn(launch, options).await?;
        Ok(Self::new(client))
    }

    pub fn server_info(&self) -> &ServerInfo {
        self.client.server_info()
    }

    pub async fn list_tools(&self) -> Result<Vec<ToolSpec>, McpError> {
        let tools = self.client.list_tools().await?;
        info!(count = tools.len(), "tools available");
        Ok(tools.into_iter().map(tool_spec).collect())
    }

    pub async fn disconnect(&self) {
        self.client.disconnect().await;
    }
}

#[async_trait]
impl ToolExecutor for McpToolBridge {
    async fn execute(&self, name: &str, arguments: &Value) -> Result<Value, ToolExecutionError> {
        let result = self.client.call_tool(name, arguments.clone()).await?;
        if result.is_error {
            return Err(ToolExecutionError::Remote(result.content));
        }
        debug!(tool = %name, bytes = result.content.len(), "tool result received");
        Ok(parse_payload(result.content))
    }
}

fn tool_spec(tool: McpTool) -> ToolSpec {
    ToolSpec {
        name: tool.name,
        description: tool.description.unwrap_or_default(),
        input_schema: tool.input_schema,
    }
}

/// Tool text as JSON when it parses, else as a JSON string.
pub(crate) fn parse_payload(text: String) -> Value {
    serde_json::from_str(&text).unwrap_or(Value::String(text))
}
