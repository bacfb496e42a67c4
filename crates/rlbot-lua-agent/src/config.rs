//! Agent configuration files.

use std::path::{Path, PathBuf};

use rlbot_lua_host::SandboxConfig;
use rlbot_lua_packet::ControllerLayout;

use crate::AgentError;

/// Everything needed to build one agent.
///
/// Stored as JSON next to the bot's scripts:
///
/// ```json
/// {
///   "name": "lua",
///   "sandbox": { "base_dir": ".", "bot_script": "bot.lua" }
/// }
/// ```
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Registry name of the agent implementation. Default: `"lua"`.
    pub name: String,
    pub sandbox: SandboxConfig,
}

impl AgentConfig {
    pub fn new(name: &str, base_dir: impl Into<PathBuf>) -> Self {
        Self {
            name: name.to_owned(),
            sandbox: SandboxConfig::new(base_dir),
        }
    }

    /// Replace the bot script name.
    pub fn with_bot_script(mut self, name: &str) -> Self {
        self.sandbox = self.sandbox.with_bot_script(name);
        self
    }

    /// Replace the controller layout.
    pub fn with_layout(mut self, layout: ControllerLayout) -> Self {
        self.sandbox = self.sandbox.with_layout(layout);
        self
    }

    /// Read a JSON config. A relative `sandbox.base_dir` is resolved against
    /// the directory holding the file, not the working directory.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, AgentError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| AgentError::Config(format!("failed to read {}: {e}", path.display())))?;
        let mut config: Self = serde_json::from_str(&text)
            .map_err(|e| AgentError::Config(format!("failed to parse {}: {e}", path.display())))?;

        let root = path.parent().unwrap_or_else(|| Path::new("."));
        config.sandbox.resolve_base_dir(root);
        Ok(config)
    }
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            name: "lua".to_owned(),
            sandbox: SandboxConfig::default(),
        }
    }
}
