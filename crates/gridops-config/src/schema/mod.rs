//! Configuration schema types for GridOps.
//!
//! All structs use `serde(default)` so partial configs work correctly.

mod model;
mod server;
mod session;
mod system;

pub use model::*;
pub use server::*;
pub use session::*;
pub use system::*;

use serde::{Deserialize, Serialize};

/// Root configuration for GridOps.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GridOpsConfig {
    pub model: ModelConfig,
    pub providers: ProvidersConfig,
    pub server: ServerConfig,
    pub host: HostConfig,
    pub history: HistoryConfig,
    pub context: ContextConfig,
    pub logging: LoggingConfig,
}
