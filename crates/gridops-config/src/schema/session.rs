//! Per-session configuration: the host system prompt, history retention, and
//! operational-context retention.

use serde::{Deserialize, Serialize};

const DEFAULT_SYSTEM_PROMPT: &str = "You are a Grid Operations Assistant, an AI specialized in power grid management,
outage response, maintenance scheduling, and operational analytics. You have access
to grid topology, sensor data, maintenance logs, and operational tools through the
Model Context Protocol.

When answering questions:
1. Use available tools to access up-to-date grid data and operational records.
2. Provide evidence-based responses with references to grid events or logs where possible.
3. Acknowledge operational uncertainty when appropriate.
4. Consider multiple perspectives on grid reliability and restoration strategies.
5. Explain complex grid concepts clearly for operators and engineers.

Your goal is to help grid operators and engineers maintain reliability, optimize performance,
and restore power efficiently through rigorous operational analysis.";

/// Host-side prompt configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HostConfig {
    /// Base system prompt. Provider-specific guidance is appended at query time.
    pub system_prompt: String,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            system_prompt: DEFAULT_SYSTEM_PROMPT.into(),
        }
    }
}

/// Conversation history retention.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    /// Prior messages replayed into each model call (0 = unbounded, otherwise 2-1000).
    pub max_messages: u32,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self { max_messages: 20 }
    }
}

/// Operational-context retention.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ContextConfig {
    /// Analysis records kept before the oldest is evicted (0 = unbounded, max 10000).
    pub max_analyses: u32,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self { max_analyses: 100 }
    }
}
