//! HTTP [`ModelService`] for every supported provider.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use crate::adapter::build_request_body;
use crate::registry::Provider;
use crate::{AiError, ModelRequest, ModelService};

const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Endpoints and credentials for the HTTP model service.
#[derive(Clone)]
pub struct HttpModelConfig {
    pub openai_base_url: String,
    pub anthropic_base_url: String,
    pub google_base_url: String,
    pub mistral_base_url: String,
    pub openai_api_key: Option<String>,
    pub anthropic_api_key: Option<String>,
    pub google_api_key: Option<String>,
    pub mistral_api_key: Option<String>,
    pub request_timeout: Duration,
}

impl fmt::Debug for HttpModelConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn redact(key: &Option<String>) -> &'static str {
            if key.is_some() {
                "[REDACTED]"
            } else {
                "<unset>"
            }
        }
        f.debug_struct("HttpModelConfig")
            .field("openai_base_url", &self.openai_base_url)
            .field("anthropic_base_url", &self.anthropic_base_url)
            .field("google_base_url", &self.google_base_url)
            .field("mistral_base_url", &self.mistral_base_url)
            .field("openai_api_key", &redact(&self.openai_api_key))
            .field("anthropic_api_key", &redact(&self.anthropic_api_key))
            .field("google_api_key", &redact(&self.google_api_key))
            .field("mistral_api_key", &redact(&self.mistral_api_key))
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

impl Default for HttpModelConfig {
    fn default() -> Self {
        Self {
            openai_base_url: "https://api.openai.com/v1".into(),
            anthropic_base_url: "https://api.anthropic.com/v1".into(),
            google_base_url: "https://generativelanguage.googleapis.com/v1beta".into(),
            mistral_base_url: "https://api.mistral.ai/v1".into(),
            openai_api_key: None,
            anthropic_api_key: None,
            google_api_key: None,
            mistral_api_key: None,
            request_timeout: Duration::from_secs(120),
        }
    }
}

impl HttpModelConfig {
    /// Read API keys from `OPENAI_API_KEY`, `ANTHROPIC_API_KEY`,
    /// `GOOGLE_API_KEY` (falling back to `GEMINI_API_KEY`) and
    /// `MISTRAL_API_KEY`. A missing key only fails calls to that provider.
    pub fn with_env_keys(mut self) -> Self {
        let var = |name: &str| std::env::var(name).ok().filter(|v| !v.is_empty());
        self.openai_api_key = var("OPENAI_API_KEY");
        self.anthropic_api_key = var("ANTHROPIC_API_KEY");
        self.google_api_key = var("GOOGLE_API_KEY").or_else(|| var("GEMINI_API_KEY"));
        self.mistral_api_key = var("MISTRAL_API_KEY");
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    fn api_key(&self, provider: Provider) -> Result<&str, AiError> {
        let (key, var) = match provider {
            Provider::OpenAi => (&self.openai_api_key, "OPENAI_API_KEY"),
            Provider::Anthropic => (&self.anthropic_api_key, "ANTHROPIC_API_KEY"),
            Provider::Google => (&self.google_api_key, "GOOGLE_API_KEY"),
            Provider::Mistral => (&self.mistral_api_key, "MISTRAL_API_KEY"),
        };
        key.as_deref()
            .ok_or_else(|| AiError::ModelUnavailable(format!("{provider} is not configured: set {var}")))
    }

    /// Endpoint for one call to `model` at `provider`.
    pub(crate) fn endpoint(&self, provider: Provider, model: &str) -> String {
        match provider {
            Provider::OpenAi => format!("{}/chat/completions", self.openai_base_url.trim_end_matches('/')),
            Provider::Mistral => format!("{}/chat/completions", self.mistral_base_url.trim_end_matches('/')),
            Provider::Anthropic => format!("{}/messages", self.anthropic_base_url.trim_end_matches('/')),
            Provider::Google => format!(
                "{}/models/{}:generateContent",
                self.google_base_url.trim_end_matches('/'),
                model
            ),
        }
    }
}

/// Talks to the provider APIs over HTTPS.
pub struct HttpModelService {
    config: HttpModelConfig,
    http: reqwest::Client,
}

impl HttpModelService {
    pub fn new(config: HttpModelConfig) -> Result<Self, AiError> {
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| AiError::ModelUnavailable(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { config, http })
    }

    fn authorize(
        &self,
        builder: reqwest::RequestBuilder,
        provider: Provider,
    ) -> Result<reqwest::RequestBuilder, AiError> {
        let key = self.config.api_key(provider)?;
        Ok(match provider {
            Provider::OpenAi | Provider::Mistral => builder.bearer_auth(key),
            Provider::Anthropic => builder
                .header("x-api-key", key)
                .header("anthropic-version", ANTHROPIC_VERSION),
            Provider::Google => builder.header("x-goog-api-key", key),
        })
    }
}

#[async_trait]
impl ModelService for HttpModelService {
    async fn complete(&self, request: &ModelRequest) -> Result<Value, AiError> {
        let provider = request.model.provider;
        let url = self.config.endpoint(provider, &request.model.name);
        let body = build_request_body(request);

        debug!(model = %request.model, messages = request.messages.len(), "model API request");

        let response = self
            .authorize(self.http.post(&url), provider)?
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| AiError::ModelUnavailable(format!("{provider} request failed: {e}")))?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(AiError::ModelUnavailable(format!(
                "{provider} rate limited the request (HTTP 429)"
            )));
        }
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let text = text.chars().take(200).collect::<String>();
            return Err(AiError::ModelUnavailable(format!("{provider} HTTP {status}: {text}")));
        }

        response
            .json()
            .await
            .map_err(|e| AiError::ModelUnavailable(format!("{provider} returned invalid JSON: {e}")))
    }
}
