//! Per-section validators.

use super::helpers::{validate_http_url, validate_range, validate_range_or_zero};
use crate::schema::GridOpsConfig;

/// Validate model constraints.
pub(crate) fn validate_model(errors: &mut Vec<String>, config: &GridOpsConfig) {
    let model = &config.model;
    match model.default.split_once(':') {
        Some((provider, name)) if !provider.is_empty() && !name.is_empty() => {}
        _ => errors.push(format!(
            "model.default = {:?} must be in provider:model form",
            model.default
        )),
    }
    validate_range(
        errors,
        "model.max_output_tokens",
        model.max_output_tokens as u64,
        1,
        32000,
    );
    validate_range(
        errors,
        "model.request_timeout_secs",
        model.request_timeout_secs,
        1,
        600,
    );
}

/// Validate provider endpoints.
pub(crate) fn validate_providers(errors: &mut Vec<String>, config: &GridOpsConfig) {
    let p = &config.providers;
    validate_http_url(errors, "providers.openai_base_url", &p.openai_base_url);
    validate_http_url(errors, "providers.anthropic_base_url", &p.anthropic_base_url);
    validate_http_url(errors, "providers.google_base_url", &p.google_base_url);
    validate_http_url(errors, "providers.mistral_base_url", &p.mistral_base_url);
}

/// Validate tool-server constraints.
pub(crate) fn validate_server(errors: &mut Vec<String>, config: &GridOpsConfig) {
    if config.server.protocol_version.trim().is_empty() {
        errors.push("server.protocol_version must not be empty".into());
    }
    validate_range(
        errors,
        "server.request_timeout_secs",
        config.server.request_timeout_secs,
        1,
        600,
    );
}

/// Validate history retention.
pub(crate) fn validate_history(errors: &mut Vec<String>, config: &GridOpsConfig) {
    validate_range_or_zero(
        errors,
        "history.max_messages",
        config.history.max_messages as u64,
        2,
        1000,
    );
}

/// Validate context retention.
pub(crate) fn validate_context(errors: &mut Vec<String>, config: &GridOpsConfig) {
    validate_range(
        errors,
        "context.max_analyses",
        config.context.max_analyses as u64,
        0,
        10000,
    );
}
