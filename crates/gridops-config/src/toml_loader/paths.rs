//! Where the config file lives.

use std::path::{Path, PathBuf};

use gridops_common::ConfigError;

const APP_DIR: &str = "gridops";
const FILE_NAME: &str = "config.toml";

/// `<platform config dir>/gridops/config.toml`: `~/.config` on Linux,
/// `~/Library/Application Support` on macOS.
pub fn default_config_path() -> Result<PathBuf, ConfigError> {
    config_file_in(dirs::config_dir())
}

fn config_file_in(config_dir: Option<PathBuf>) -> Result<PathBuf, ConfigError> {
    config_dir
        .map(|dir| dir.join(APP_DIR).join(FILE_NAME))
        .ok_or_else(|| {
            ConfigError::ParseError("no platform config directory; pass --config <path>".into())
        })
}

/// `ParseError` describing a failed filesystem `action` on `path`.
pub(super) fn io_failure(action: &str, path: &Path, err: std::io::Error) -> ConfigError {
    ConfigError::ParseError(format!("failed to {action} {}: {err}", path.display()))
}
