//! Types shared by every GridOps crate: the top-level error taxonomy and
//! identifier helpers.

pub mod errors;
pub mod id;

pub use errors::{ConfigError, GridOpsError};
pub use id::{new_tool_call_id, SessionId, TurnId};

pub type Result<T> = std::result::Result<T, GridOpsError>;
