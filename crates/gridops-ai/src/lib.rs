//! Tool-orchestration core for GridOps.
//!
//! Provides:
//! - Provider adapters translating canonical messages and tools to and from
//!   the OpenAI, Anthropic, Google and Mistral wire formats
//! - An HTTP model service for those providers
//! - The operational-context tracker
//! - A tool execution bridge over the MCP client
//! - Sessions that run one query through the two-call tool loop

pub mod adapter;
pub mod bridge;
pub mod context;
pub mod http;
pub mod registry;
pub mod session;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub use bridge::{McpToolBridge, ToolExecutionError, ToolExecutor};
pub use context::{AnalysisRecord, OperationalContext, OperationalContextTracker};
pub use http::{HttpModelConfig, HttpModelService};
pub use registry::{available_models, is_valid_model, is_valid_model_str, ModelIdentifier, Provider};
pub use session::{HistoryPolicy, KeepFirstAndLast, Session, Unbounded};

/// A chat-style model backend. Returns the provider's raw response JSON;
/// interpretation is left to [`adapter::parse_response`].
#[async_trait]
pub trait ModelService: Send + Sync {
    async fn complete(&self, request: &ModelRequest) -> Result<Value, AiError>;
}

/// Everything one model call needs.
#[derive(Debug, Clone)]
pub struct ModelRequest {
    pub model: ModelIdentifier,
    pub messages: Vec<Message>,
    /// Tools already in the provider's wire shape, see [`adapter::format_tools`].
    pub tools: Option<Value>,
    pub temperature: f64,
    pub max_output_tokens: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCallRequest>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: Some(content.into()),
            tool_calls: None,
            tool_call_id: None,
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: Some(content.into()),
            tool_calls: None,
            tool_call_id: None,
        }
    }

    /// Assistant message; an empty call list is stored as `None`.
    pub fn assistant(content: Option<String>, tool_calls: Vec<ToolCallRequest>) -> Self {
        Self {
            role: Role::Assistant,
            content,
            tool_calls: if tool_calls.is_empty() {
                None
            } else {
                Some(tool_calls)
            },
            tool_call_id: None,
        }
    }

    pub fn tool(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: Role::Tool,
            content: Some(content.into()),
            tool_calls: None,
            tool_call_id: Some(tool_call_id.into()),
        }
    }

    pub fn text(&self) -> &str {
        self.content.as_deref().unwrap_or("")
    }

    pub fn tool_calls(&self) -> &[ToolCallRequest] {
        self.tool_calls.as_deref().unwrap_or(&[])
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

/// A tool offered by the tool server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
}

/// A tool invocation requested by the model. `id` round-trips unchanged
/// into the matching tool-result message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallRequest {
    pub id: String,
    pub name: String,
    pub arguments: Value,
}

/// Outcome of a dispatched tool call, matched to its request by `id`.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolCallResult {
    pub id: String,
    pub payload: Value,
}

/// The parts of a model response the session acts on.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AssistantTurn {
    pub content: Option<String>,
    pub tool_calls: Vec<ToolCallRequest>,
}

#[derive(Debug, thiserror::Error)]
pub enum AiError {
    #[error("invalid model: {0}")]
    InvalidModel(String),
    #[error("model unavailable: {0}")]
    ModelUnavailable(String),
    #[error("failed to serialize operational context: {0}")]
    ContextSerialization(String),
    #[error("query cancelled")]
    Cancelled,
}
