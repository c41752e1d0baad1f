//! GridOps configuration system.
//!
//! TOML-based configuration with documented defaults and validation. Every
//! section uses `serde(default)` so a partial file (or no file at all) works.
//!
//! ```rust,no_run
//! let config = gridops_config::load_config(None).expect("failed to load config");
//! println!("default model: {}", config.model.default);
//! ```

pub mod schema;
pub mod toml_loader;
pub mod validation;

pub use schema::{
    ContextConfig, GridOpsConfig, HistoryConfig, HostConfig, LogLevel, LoggingConfig, ModelConfig,
    ProvidersConfig, ServerConfig,
};

use std::path::Path;

use gridops_common::ConfigError;

/// Load config from `path_override` if given, otherwise from the platform
/// default path (created from the template when missing), then validate.
pub fn load_config(path_override: Option<&Path>) -> Result<GridOpsConfig, ConfigError> {
    let config = match path_override {
        Some(path) => toml_loader::load_from_path(path)?,
        None => toml_loader::load_default()?,
    };

    validation::validate(&config)?;
    Ok(config)
}
