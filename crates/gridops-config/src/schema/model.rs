//! Model selection and provider endpoint configuration.

use serde::{Deserialize, Serialize};

/// Model settings applied to every query.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Initial model in `provider:model` form. The CLI argument wins over this.
    pub default: String,
    /// Output-length cap sent with every model call (valid range: 1-32000).
    pub max_output_tokens: u32,
    /// Upper bound on a single model call, in seconds (valid range: 1-600).
    pub request_timeout_secs: u64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            default: "openai:gpt-4o".into(),
            max_output_tokens: 2000,
            request_timeout_secs: 120,
        }
    }
}

/// Base URLs for each provider's HTTP API.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProvidersConfig {
    pub openai_base_url: String,
    pub anthropic_base_url: String,
    pub google_base_url: String,
    pub mistral_base_url: String,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            openai_base_url: "https://api.openai.com/v1".into(),
            anthropic_base_url: "https://api.anthropic.com/v1".into(),
            google_base_url: "https://generativelanguage.googleapis.com/v1beta".into(),
            mistral_base_url: "https://api.mistral.ai/v1".into(),
        }
    }
}
