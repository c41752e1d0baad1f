//! Wiring config into a connected session.

use std::sync::Arc;
use std::time::Duration;

use gridops_ai::session::policy_for_limit;
use gridops_ai::{
    HttpModelConfig, HttpModelService, McpToolBridge, ModelIdentifier, OperationalContextTracker,
    Session,
};
use gridops_common::GridOpsError;
use gridops_config::GridOpsConfig;
use gridops_mcp::{McpClientOptions, ServerLaunch};
use tracing::info;

use crate::cli::Args;

/// A ready session plus the bridge it talks through, kept for shutdown.
pub struct Runtime {
    pub session: Session,
    pub bridge: Arc<McpToolBridge>,
}

/// Model from the CLI argument, falling back to config. Validated here so a
/// typo fails before the tool server is started.
pub fn initial_model(args: &Args, config: &GridOpsConfig) -> Result<ModelIdentifier, GridOpsError> {
    let text = args.model.as_deref().unwrap_or(&config.model.default);
    ModelIdentifier::parse(text).map_err(|e| GridOpsError::Model(e.to_string()))
}

pub fn http_config(config: &GridOpsConfig) -> HttpModelConfig {
    let providers = &config.providers;
    HttpModelConfig {
        openai_base_url: providers.openai_base_url.clone(),
        anthropic_base_url: providers.anthropic_base_url.clone(),
        google_base_url: providers.google_base_url.clone(),
        mistral_base_url: providers.mistral_base_url.clone(),
        ..HttpModelConfig::default()
    }
    .with_env_keys()
    .with_request_timeout(Duration::from_secs(config.model.request_timeout_secs))
}

pub async fn start(args: &Args, config: &GridOpsConfig) -> Result<Runtime, GridOpsError> {
    let model = initial_model(args, config)?;

    let launch = ServerLaunch::for_script(&args.server_script, &config.server.command, &config.server.args)
        .map_err(|e| GridOpsError::ToolServer(e.to_string()))?;
    let options = McpClientOptions {
        protocol_version: config.server.protocol_version.clone(),
        request_timeout: Duration::from_secs(config.server.request_timeout_secs),
    };
    let bridge = McpToolBridge::connect(&launch, options)
        .await
        .map_err(|e| GridOpsError::ToolServer(e.to_string()))?;
    let tools = match bridge.list_tools().await {
        Ok(tools) => tools,
        Err(e) => {
            bridge.disconnect().await;
            return Err(GridOpsError::ToolServer(e.to_string()));
        }
    };
    let bridge = Arc::new(bridge);

    let service = HttpModelService::new(http_config(config))
        .map_err(|e| GridOpsError::Model(e.to_string()))?;
    let tracker =
        OperationalContextTracker::new().with_max_analyses(config.context.max_analyses as usize);

    let session = Session::new(model, Arc::new(service), bridge.clone())
        .with_system_prompt(config.host.system_prompt.clone())
        .with_tools(tools)
        .with_history_policy(policy_for_limit(config.history.max_messages as usize))
        .with_tracker(tracker)
        .with_max_output_tokens(config.model.max_output_tokens)
        .with_model_timeout(Duration::from_secs(config.model.request_timeout_secs));

    info!(
        session = %session.id(),
        server = %bridge.server_info().name,
        model = %session.model(),
        tools = session.tools().len(),
        history = config.history.max_messages,
        "session ready"
    );

    Ok(Runtime { session, bridge })
}
