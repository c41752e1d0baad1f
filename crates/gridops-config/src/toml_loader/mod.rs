//! TOML config file loading and creation.

mod loader;
mod paths;
mod template;


pub use loader::{create_default_config, load_default, load_from_path};
pub use paths::default_config_path;
pub use template::default_config_toml;
