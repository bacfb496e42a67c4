//! Sandbox configuration.

use std::path::{Path, PathBuf};

use rlbot_lua_packet::ControllerLayout;

/// Configuration for one Lua sandbox.
///
/// Script names are resolved against `base_dir`, never against the process
/// working directory, so a bot folder can be moved or launched from
/// anywhere.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct SandboxConfig {
    /// Directory holding the bot's scripts. Also prepended to Lua's
    /// `package.path` so `require` resolves from here. Default: `"."`.
    pub base_dir: PathBuf,

    /// Class library run first. Must return `class, super, dump`, which are
    /// installed as globals. `None` skips it. Default: `"classes.lua"`.
    pub class_script: Option<String>,

    /// Struct definitions (`GameTickPacket`, `ControllerState`,
    /// `BallPrediction`) run second. `None` skips it.
    /// Default: `"structs.lua"`.
    pub struct_script: Option<String>,

    /// Bot script, run last. Must return the bot instance.
    /// Default: `"bot.lua"`.
    pub bot_script: String,

    /// Method called once with the one-based agent index after loading.
    /// Optional on the bot. Default: `"bot_init"`.
    pub init_function: String,

    /// Method called every tick with the packet. Required on the bot.
    /// Default: `"get_output"`.
    pub entry_point: String,

    /// Arity and order of the control-output record.
    /// Default: [`ControllerLayout::standard`].
    pub layout: ControllerLayout,

    /// Cap on Lua heap allocation in bytes. `None` leaves it unbounded.
    pub memory_limit_bytes: Option<usize>,
}

impl SandboxConfig {
    /// Default configuration rooted at `base_dir`.
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            ..Self::default()
        }
    }

    /// Replace the bot script name.
    pub fn with_bot_script(mut self, name: &str) -> Self {
        self.bot_script = name.to_owned();
        self
    }

    /// Replace the controller layout.
    pub fn with_layout(mut self, layout: ControllerLayout) -> Self {
        self.layout = layout;
        self
    }

    /// Absolute-or-relative path of `name` under `base_dir`.
    pub fn script_path(&self, name: &str) -> PathBuf {
        self.base_dir.join(name)
    }

    /// Resolve a relative `base_dir` against `root`. Absolute paths are left
    /// untouched.
    pub fn resolve_base_dir(&mut self, root: &Path) {
        if self.base_dir.is_relative() {
            self.base_dir = root.join(&self.base_dir);
        }
    }
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            base_dir: PathBuf::from("."),
            class_script: Some("classes.lua".to_owned()),
            struct_script: Some("structs.lua".to_owned()),
            bot_script: "bot.lua".to_owned(),
            init_function: "bot_init".to_owned(),
            entry_point: "get_output".to_owned(),
            layout: ControllerLayout::standard(),
            memory_limit_bytes: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let config: SandboxConfig =
            serde_json::from_str(r#"{"base_dir": "bots/lua", "bot_script": "chase.lua"}"#)
                .unwrap();
        assert_eq!(config.base_dir, PathBuf::from("bots/lua"));
        assert_eq!(config.bot_script, "chase.lua");
        assert_eq!(config.entry_point, "get_output");
        assert_eq!(config.class_script.as_deref(), Some("classes.lua"));
        assert_eq!(config.layout, ControllerLayout::standard());
    }

    #[test]
    fn relative_base_dir_resolves_against_root() {
        let mut config = SandboxConfig::new("scripts");
        config.resolve_base_dir(Path::new("/opt/bots"));
        assert_eq!(config.base_dir, PathBuf::from("/opt/bots/scripts"));
    }
}
