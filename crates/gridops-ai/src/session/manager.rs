//! Session struct, construction and model switching.

use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use gridops_common::SessionId;

use crate::bridge::ToolExecutor;
use crate::context::{OperationalContext, OperationalContextTracker};
use crate::registry::ModelIdentifier;
use crate::{AiError, Message, ModelService, ToolSpec};

use super::history::{HistoryPolicy, Unbounded};

/// Sampling temperature for every model call. Kept low for operational
/// answers.
pub const TEMPERATURE: f64 = 0.3;

const DEFAULT_MAX_OUTPUT_TOKENS: u32 = 2000;

/// One operator session: history, operational context and the current model.
pub struct Session {
    /// Unique session identifier, attached to every turn's log span.
    pub(super) id: SessionId,
    /// Model used for both calls of the next turn.
    pub(super) model: ModelIdentifier,
    /// Base system prompt, before provider formatting.
    pub(super) system_prompt: String,
    /// Tools offered to the model on the first call of each turn.
    pub(super) tools: Vec<ToolSpec>,
    /// Every stored message, oldest first. Never trimmed in place.
    pub(super) history: Vec<Message>,
    /// Entities and analyses gathered from successful tool calls.
    pub(super) tracker: OperationalContextTracker,
    /// Backend for model calls.
    pub(super) model_service: Arc<dyn ModelService>,
    /// Backend for tool calls.
    pub(super) tool_executor: Arc<dyn ToolExecutor>,
    /// Chooses which part of `history` is replayed.
    pub(super) history_policy: Box<dyn HistoryPolicy>,
    /// Output token cap per model call.
    pub(super) max_output_tokens: u32,
    /// Bound on one model call; `None` waits indefinitely.
    pub(super) model_timeout: Option<Duration>,
    /// Bound on one tool call; `None` relies on the executor's own timeout.
    pub(super) tool_timeout: Option<Duration>,
}

impl Session {
    pub fn new(
        model: ModelIdentifier,
        model_service: Arc<dyn ModelService>,
        tool_executor: Arc<dyn ToolExecutor>,
    ) -> Self {
        Self {
            id: SessionId::new(),
            model,
            system_prompt: String::new(),
            tools: Vec::new(),
            history: Vec::new(),
            tracker: OperationalContextTracker::new(),
            model_service,
            tool_executor,
            history_policy: Box::new(Unbounded),
            max_output_tokens: DEFAULT_MAX_OUTPUT_TOKENS,
            model_timeout: None,
            tool_timeout: None,
        }
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    pub fn with_tools(mut self, tools: Vec<ToolSpec>) -> Self {
        self.tools = tools;
        self
    }

    pub fn with_history_policy(mut self, policy: Box<dyn HistoryPolicy>) -> Self {
        self.history_policy = policy;
        self
    }

    pub fn with_tracker(mut self, tracker: OperationalContextTracker) -> Self {
        self.tracker = tracker;
        self
    }

    pub fn with_max_output_tokens(mut self, max: u32) -> Self {
        self.max_output_tokens = max;
        self
    }

    pub fn with_model_timeout(mut self, timeout: Duration) -> Self {
        self.model_timeout = Some(timeout);
        self
    }

    pub fn with_tool_timeout(mut self, timeout: Duration) -> Self {
        self.tool_timeout = Some(timeout);
        self
    }

    pub fn id(&self) -> &SessionId {
        &self.id
    }

    pub fn model(&self) -> &ModelIdentifier {
        &self.model
    }

    pub fn tools(&self) -> &[ToolSpec] {
        &self.tools
    }

    pub fn history(&self) -> &[Message] {
        &self.history
    }

    pub fn context(&self) -> &OperationalContext {
        self.tracker.snapshot()
    }

    pub fn context_json(&self) -> Result<String, AiError> {
        self.tracker
            .to_pretty_json()
            .map_err(|e| AiError::ContextSerialization(e.to_string()))
    }

    /// Switch models for subsequent queries. Invalid input leaves the
    /// current model in place; history is never touched.
    pub fn change_model(&mut self, text: &str) -> Result<&ModelIdentifier, AiError> {
        let model = ModelIdentifier::parse(text)?;
        info!(from = %self.model, to = %model, "model changed");
        self.model = model;
        Ok(&self.model)
    }
}
