//! Lua sandbox loading, per-tick execution, and reload.
//!
//! [`LuaSandbox`] owns one Lua state exclusively. Script globals therefore
//! never leak between agents: two sandboxes built for two indices share
//! nothing but the files they were loaded from.

use std::path::PathBuf;
use std::rc::Rc;

use mlua::{Lua, MultiValue, RegistryKey, Table, TableExt, Value};
use rlbot_lua_packet::{AgentIndex, ControllerLayout, ControllerState, GameTickPacket};

use crate::config::SandboxConfig;
use crate::host_api::{self, BallPredictionSource};
use crate::{marshal, SandboxError};

// ---------------------------------------------------------------------------
// Script sources
// ---------------------------------------------------------------------------

/// One script read from disk.
#[derive(Debug, Clone)]
struct ScriptSource {
    name: String,
    path: PathBuf,
    text: String,
}

impl ScriptSource {
    fn read(config: &SandboxConfig, name: &str) -> Result<Self, SandboxError> {
        let path = config.script_path(name);
        let text = std::fs::read_to_string(&path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                SandboxError::ScriptNotFound { path: path.clone() }
            } else {
                SandboxError::Io {
                    path: path.clone(),
                    message: e.to_string(),
                }
            }
        })?;
        Ok(Self {
            name: name.to_owned(),
            path,
            text,
        })
    }

    /// Chunk name Lua reports in error messages and tracebacks.
    fn chunk_name(&self) -> String {
        format!("@{}", self.path.display())
    }
}

/// The class library, struct library, and bot script of one sandbox.
#[derive(Debug, Clone)]
struct ScriptSet {
    classes: Option<ScriptSource>,
    structs: Option<ScriptSource>,
    bot: ScriptSource,
}

impl ScriptSet {
    fn read(config: &SandboxConfig) -> Result<Self, SandboxError> {
        let classes = config
            .class_script
            .as_deref()
            .map(|name| ScriptSource::read(config, name))
            .transpose()?;
        let structs = config
            .struct_script
            .as_deref()
            .map(|name| ScriptSource::read(config, name))
            .transpose()?;
        let bot = ScriptSource::read(config, &config.bot_script)?;
        Ok(Self {
            classes,
            structs,
            bot,
        })
    }

    /// BLAKE3 hex digest over every script's name and contents, in load order.
    fn digest(&self) -> String {
        let mut hasher = blake3::Hasher::new();
        for script in [self.classes.as_ref(), self.structs.as_ref(), Some(&self.bot)]
            .into_iter()
            .flatten()
        {
            hasher.update(script.name.as_bytes());
            hasher.update(&[0]);
            hasher.update(script.text.as_bytes());
            hasher.update(&[0]);
        }
        hasher.finalize().to_hex().to_string()
    }
}

// ---------------------------------------------------------------------------
// LuaSandbox
// ---------------------------------------------------------------------------

/// A loaded bot script bound to one agent index.
///
/// # Load order
///
/// 1. Fresh Lua state with the safe standard libraries and the optional
///    memory cap.
/// 2. `base_dir` prepended to `package.path`; the `rlbot` host table installed.
/// 3. Class library (must return `class, super, dump`, installed as globals).
/// 4. Struct library.
/// 5. Bot script (must return the bot instance).
/// 6. `get_ball_prediction` attached to the bot, then `bot:bot_init(index + 1)`.
///
/// Any failure aborts construction; there is no partially loaded sandbox.
pub struct LuaSandbox {
    lua: Lua,
    /// The bot instance, pinned in the Lua registry.
    bot: RegistryKey,
    config: SandboxConfig,
    index: AgentIndex,
    prediction: Option<Rc<dyn BallPredictionSource>>,
    digest: String,
    ticks_run: u64,
}

impl LuaSandbox {
    /// Load the scripts named by `config` and bind them to `index`.
    ///
    /// # Errors
    ///
    /// - [`SandboxError::ScriptNotFound`] / [`SandboxError::Io`] if a script
    ///   cannot be read.
    /// - [`SandboxError::Load`] if a script fails to parse or raises while
    ///   running, or if `bot_init` raises.
    /// - [`SandboxError::InvalidBot`] if the bot script does not return a table.
    /// - [`SandboxError::MissingEntryPoint`] if the bot has no entry point method.
    pub fn load(config: &SandboxConfig, index: AgentIndex) -> Result<Self, SandboxError> {
        Self::load_with(config, index, None)
    }

    /// Like [`load`](Self::load), with a ball prediction source for
    /// `bot:get_ball_prediction()`.
    pub fn load_with_prediction(
        config: &SandboxConfig,
        index: AgentIndex,
        source: Rc<dyn BallPredictionSource>,
    ) -> Result<Self, SandboxError> {
        Self::load_with(config, index, Some(source))
    }

    fn load_with(
        config: &SandboxConfig,
        index: AgentIndex,
        prediction: Option<Rc<dyn BallPredictionSource>>,
    ) -> Result<Self, SandboxError> {
        let scripts = ScriptSet::read(config)?;
        let digest = scripts.digest();

        let lua = Lua::new();
        if let Some(limit) = config.memory_limit_bytes {
            lua.set_memory_limit(limit)
                .map_err(|e| SandboxError::Runtime(format!("failed to set memory limit: {e}")))?;
        }

        let bot = bootstrap(&lua, config, &scripts, index, prediction.clone())?;

        tracing::debug!(
            agent = index.0,
            base_dir = %config.base_dir.display(),
            bot_script = %config.bot_script,
            digest = %digest,
            "Lua sandbox loaded"
        );

        Ok(Self {
            lua,
            bot,
            config: config.clone(),
            index,
            prediction,
            digest,
            ticks_run: 0,
        })
    }

    /// Run the entry point for one tick and build the control record.
    ///
    /// The packet is only borrowed for the duration of the call. Script
    /// errors are returned as-is; no default output is substituted, and the
    /// sandbox stays usable for the next tick.
    ///
    /// # Errors
    ///
    /// - [`SandboxError::Marshal`] if the packet cannot be converted.
    /// - [`SandboxError::Runtime`] if the script raises.
    /// - [`SandboxError::MemoryLimitExceeded`] if the script or the packet
    ///   table hits the memory cap.
    /// - [`SandboxError::Control`] if the reply does not fit the layout.
    pub fn get_output(&mut self, packet: &GameTickPacket) -> Result<ControllerState, SandboxError> {
        let bot: Table = self
            .lua
            .registry_value(&self.bot)
            .map_err(|e| SandboxError::Runtime(format!("bot instance unavailable: {e}")))?;

        let raw = marshal::packet_to_lua(&self.lua, packet).map_err(|e| {
            self.memory_exceeded(&e)
                .unwrap_or_else(|| SandboxError::Marshal(format!("failed to build packet table: {e}")))
        })?;
        let packet_value = marshal::construct_with_global(&self.lua, "GameTickPacket", raw)
            .map_err(|e| self.classify(e))?;

        let reply: MultiValue = bot
            .call_method(self.config.entry_point.as_str(), packet_value)
            .map_err(|e| self.classify(e))?;

        let state = marshal::controls_from_reply(reply, &self.config.layout)?;

        self.ticks_run += 1;
        tracing::trace!(agent = self.index.0, tick = self.ticks_run, "get_output completed");

        Ok(state)
    }

    /// Rebuild the sandbox from the same config, index, and prediction
    /// source.
    ///
    /// If loading fails the current scripts stay in place and keep working;
    /// the error is returned.
    pub fn reload(&mut self) -> Result<(), SandboxError> {
        match Self::load_with(&self.config, self.index, self.prediction.clone()) {
            Ok(mut fresh) => {
                fresh.ticks_run = self.ticks_run;
                tracing::info!(
                    agent = self.index.0,
                    old_digest = %self.digest,
                    new_digest = %fresh.digest,
                    "Lua sandbox reloaded"
                );
                *self = fresh;
                Ok(())
            }
            Err(e) => {
                tracing::warn!(
                    agent = self.index.0,
                    error = %e,
                    "reload failed, keeping previously loaded scripts"
                );
                Err(e)
            }
        }
    }

    /// Reload only if the script files changed since the last load.
    ///
    /// Returns `true` if a reload happened.
    pub fn reload_if_changed(&mut self) -> Result<bool, SandboxError> {
        let digest = ScriptSet::read(&self.config)?.digest();
        if digest == self.digest {
            return Ok(false);
        }
        self.reload()?;
        Ok(true)
    }

    pub fn index(&self) -> AgentIndex {
        self.index
    }

    pub fn config(&self) -> &SandboxConfig {
        &self.config
    }

    pub fn layout(&self) -> &ControllerLayout {
        &self.config.layout
    }

    /// Number of successful `get_output` calls, carried across reloads.
    pub fn ticks_run(&self) -> u64 {
        self.ticks_run
    }

    /// BLAKE3 hex digest of the loaded scripts.
    pub fn script_digest(&self) -> &str {
        &self.digest
    }

    /// Bytes currently allocated by the Lua state.
    pub fn used_memory(&self) -> usize {
        self.lua.used_memory()
    }

    // -- Internal helpers ---------------------------------------------------

    /// Map a Lua error raised during a tick to a [`SandboxError`].
    fn classify(&self, error: mlua::Error) -> SandboxError {
        self.memory_exceeded(&error)
            .unwrap_or_else(|| SandboxError::Runtime(error.to_string()))
    }

    fn memory_exceeded(&self, error: &mlua::Error) -> Option<SandboxError> {
        if !is_memory_error(error) {
            return None;
        }
        self.config
            .memory_limit_bytes
            .map(|limit_bytes| SandboxError::MemoryLimitExceeded { limit_bytes })
    }
}

impl std::fmt::Debug for LuaSandbox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LuaSandbox")
            .field("index", &self.index)
            .field("base_dir", &self.config.base_dir)
            .field("digest", &self.digest)
            .field("ticks_run", &self.ticks_run)
            .field("has_prediction", &self.prediction.is_some())
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Bootstrap
// ---------------------------------------------------------------------------

/// Run the load sequence inside `lua` and return the pinned bot instance.
fn bootstrap(
    lua: &Lua,
    config: &SandboxConfig,
    scripts: &ScriptSet,
    index: AgentIndex,
    prediction: Option<Rc<dyn BallPredictionSource>>,
) -> Result<RegistryKey, SandboxError> {
    let setup_error =
        |e: mlua::Error| SandboxError::Runtime(format!("failed to prepare Lua state: {e}"));

    host_api::extend_package_path(lua, &config.base_dir).map_err(setup_error)?;
    host_api::register_host_api(lua, index).map_err(setup_error)?;

    if let Some(classes) = &scripts.classes {
        let (class, sup, dump): (Value, Value, Value) = lua
            .load(classes.text.as_str())
            .set_name(classes.chunk_name())
            .eval()
            .map_err(|e| load_error(classes, e))?;
        if class.is_nil() {
            return Err(SandboxError::Load {
                script: classes.name.clone(),
                message: "class library must return class, super, dump".to_owned(),
            });
        }
        let globals = lua.globals();
        globals
            .set("class", class)
            .and_then(|()| globals.set("super", sup))
            .and_then(|()| globals.set("dump", dump))
            .map_err(|e| load_error(classes, e))?;
    }

    if let Some(structs) = &scripts.structs {
        lua.load(structs.text.as_str())
            .set_name(structs.chunk_name())
            .exec()
            .map_err(|e| load_error(structs, e))?;
    }

    let source = &scripts.bot;
    let returned: Value = lua
        .load(source.text.as_str())
        .set_name(source.chunk_name())
        .eval()
        .map_err(|e| load_error(source, e))?;
    let bot = match returned {
        Value::Table(bot) => bot,
        other => {
            return Err(SandboxError::InvalidBot {
                script: source.name.clone(),
                found: other.type_name().to_owned(),
            })
        }
    };

    let entry: Value = bot
        .get(config.entry_point.as_str())
        .map_err(|e| load_error(source, e))?;
    if !matches!(entry, Value::Function(_)) {
        return Err(SandboxError::MissingEntryPoint {
            name: config.entry_point.clone(),
        });
    }

    host_api::attach_ball_prediction(lua, &bot, prediction).map_err(|e| load_error(source, e))?;

    let init: Value = bot
        .get(config.init_function.as_str())
        .map_err(|e| load_error(source, e))?;
    if let Value::Function(init) = init {
        init.call::<_, ()>((bot.clone(), index.lua_index()))
            .map_err(|e| load_error(source, e))?;
    }

    lua.create_registry_value(bot)
        .map_err(|e| load_error(source, e))
}

fn load_error(script: &ScriptSource, error: mlua::Error) -> SandboxError {
    SandboxError::Load {
        script: script.name.clone(),
        message: error.to_string(),
    }
}

pub(crate) fn is_memory_error(error: &mlua::Error) -> bool {
    match error {
        mlua::Error::MemoryError(_) => true,
        mlua::Error::CallbackError { cause, .. } => is_memory_error(cause),
        _ => false,
    }
}
