//! Reading config files, and seeding the default one from the template.

use std::fs::OpenOptions;
use std::io::{ErrorKind, Write};
use std::path::Path;

use gridops_common::ConfigError;
use tracing::{debug, info};

use super::paths::{default_config_path, io_failure};
use super::template::default_config_toml;
use crate::schema::GridOpsConfig;

/// Parse the TOML file at `path`. Absent keys take their defaults; range
/// checks are left to [`crate::validation`].
pub fn load_from_path(path: &Path) -> Result<GridOpsConfig, ConfigError> {
    let text = std::fs::read_to_string(path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => ConfigError::FileNotFound(path.to_path_buf()),
        _ => io_failure("read", path, e),
    })?;

    let config = toml::from_str::<GridOpsConfig>(&text)
        .map_err(|e| ConfigError::ParseError(format!("{}: {e}", path.display())))?;

    info!(path = %path.display(), "config loaded");
    Ok(config)
}

/// Load the file at the default path. On first run the documented template
/// is written there and the built-in defaults are returned.
pub fn load_default() -> Result<GridOpsConfig, ConfigError> {
    let path = default_config_path()?;
    match load_from_path(&path) {
        Err(ConfigError::FileNotFound(_)) => {
            create_default_config(&path)?;
            Ok(GridOpsConfig::default())
        }
        other => other,
    }
}

/// Write the template to `path`, creating parent directories. An existing
/// file is left untouched.
pub fn create_default_config(path: &Path) -> Result<(), ConfigError> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir).map_err(|e| io_failure("create directory", dir, e))?;
    }

    let mut file = match OpenOptions::new().write(true).create_new(true).open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == ErrorKind::AlreadyExists => {
            debug!(path = %path.display(), "config already present, not overwriting");
            return Ok(());
        }
        Err(e) => return Err(io_failure("create", path, e)),
    };
    file.write_all(default_config_toml().as_bytes())
        .map_err(|e| io_failure("write", path, e))?;

    info!(path = %path.display(), "wrote default config");
    Ok(())
}
