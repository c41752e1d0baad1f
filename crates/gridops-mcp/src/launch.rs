//! Resolving how to start the tool-server process.

use std::path::Path;

use crate::error::McpError;

/// Program and arguments used to spawn the tool server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerLaunch {
    pub program: String,
    pub args: Vec<String>,
}

impl ServerLaunch {
    /// Build a launch for `script`. An empty `command` picks the interpreter
    /// from the extension: `.py` runs under `python`, `.js` under `node`.
    /// `extra_args` go between the interpreter and the script path.
    pub fn for_script(script: &Path, command: &str, extra_args: &[String]) -> Result<Self, McpError> {
        let script_str = script.display().to_string();
        let program = if command.is_empty() {
            match script.extension().and_then(|ext| ext.to_str()) {
                Some("py") => "python".to_string(),
                Some("js") => "node".to_string(),
                _ => return Err(McpError::UnsupportedScript(script_str)),
            }
        } else {
            command.to_string()
        };

        let mut args = extra_args.to_vec();
        args.push(script_str);
        Ok(Self { program, args })
    }
}
