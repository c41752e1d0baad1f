//! Supported providers and the static table of models each one accepts.

use std::fmt;
use std::str::FromStr;

use crate::AiError;

/// A model provider. Each maps onto one wire format in [`crate::adapter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Provider {
    OpenAi,
    Anthropic,
    Google,
    Mistral,
}

impl Provider {
    pub const ALL: [Provider; 4] = [
        Provider::OpenAi,
        Provider::Anthropic,
        Provider::Google,
        Provider::Mistral,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::OpenAi => "openai",
            Provider::Anthropic => "anthropic",
            Provider::Google => "google",
            Provider::Mistral => "mistral",
        }
    }

    /// Models accepted for this provider.
    pub fn models(&self) -> &'static [&'static str] {
        match self {
            Provider::OpenAi => &["gpt-4o", "gpt-4-turbo", "gpt-4", "gpt-3.5-turbo"],
            Provider::Anthropic => &[
                "claude-3-5-sonnet-20241022",
                "claude-3-opus-20240229",
                "claude-3-sonnet-20240229",
            ],
            Provider::Google => &["gemini-1.5-pro", "gemini-1.5-flash"],
            Provider::Mistral => &["mistral-large-latest", "mistral-medium-latest"],
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Provider {
    type Err = AiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Provider::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| AiError::InvalidModel(format!("unknown provider {s:?}")))
    }
}

/// `provider:model`. Constructing one with [`ModelIdentifier::new`] does not
/// check the table; [`ModelIdentifier::parse`] does.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ModelIdentifier {
    pub provider: Provider,
    pub name: String,
}

impl ModelIdentifier {
    pub fn new(provider: Provider, name: impl Into<String>) -> Self {
        Self {
            provider,
            name: name.into(),
        }
    }

    /// Parse and validate `provider:model` against the model table.
    pub fn parse(text: &str) -> Result<Self, AiError> {
        let (provider, name) = text
            .trim()
            .split_once(':')
            .ok_or_else(|| AiError::InvalidModel(format!("{text:?} is not in provider:model form")))?;
        let id = Self::new(provider.parse()?, name);
        if !is_valid_model(&id) {
            return Err(AiError::InvalidModel(format!(
                "{name:?} is not a supported {provider} model"
            )));
        }
        Ok(id)
    }
}

impl fmt::Display for ModelIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.provider, self.name)
    }
}

impl FromStr for ModelIdentifier {
    type Err = AiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

pub fn is_valid_model(id: &ModelIdentifier) -> bool {
    id.provider.models().contains(&id.name.as_str())
}

pub fn is_valid_model_str(text: &str) -> bool {
    ModelIdentifier::parse(text).is_ok()
}

/// Every supported model, grouped by provider.
pub fn available_models() -> Vec<(Provider, &'static [&'static str])> {
    Provider::ALL.iter().map(|p| (*p, p.models())).collect()
}
