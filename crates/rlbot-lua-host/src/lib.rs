//! RLBot Lua host -- embedded Lua sandbox for bot scripts.
//!
//! This crate runs a Lua bot script once per simulation tick: it converts
//! the frame snapshot into script tables, calls the bot's entry point, and
//! turns the reply into a control-output record. Lua itself (compiler, VM,
//! GC, standard library) comes from `mlua`, which builds a vendored Lua 5.4.
//!
//! # Architecture
//!
//! - **`SandboxConfig`**: base directory, script names, entry points, the
//!   controller layout, and an optional memory cap.
//! - **`LuaSandbox`**: loads the scripts into a private Lua state bound to
//!   one agent index and runs `get_output` each tick.
//! - **`BallPredictionSource`**: host-side provider behind
//!   `bot:get_ball_prediction()`.
//! - **`SandboxError`**: error type covering script loading, runtime errors,
//!   marshaling, and control-record construction.
//!
//! # Script contract
//!
//! The bot script must return the bot instance. The instance must define
//! `get_output(self, packet)` and may define `bot_init(self, index)`. The
//! reply from `get_output` is read as an ordered tuple (several return
//! values, or a sequence table) or as a named controller object.
//!
//! # Example
//!
//! ```no_run
//! use rlbot_lua_host::{LuaSandbox, SandboxConfig};
//! use rlbot_lua_packet::{AgentIndex, GameTickPacket};
//!
//! let config = SandboxConfig::new("/opt/bots/lua");
//! let mut sandbox = LuaSandbox::load(&config, AgentIndex(0)).unwrap();
//! let controls = sandbox.get_output(&GameTickPacket::zeroed(2)).unwrap();
//! println!("throttle = {:?}", controls.analog("throttle"));
//! ```

#![deny(unsafe_code)]

pub mod config;
pub mod host_api;
mod marshal;
mod sandbox;

use std::path::PathBuf;

pub use config::SandboxConfig;
pub use host_api::{BallPredictionSource, SCRIPT_LOG_TARGET};
pub use sandbox::LuaSandbox;

use rlbot_lua_packet::ControlError;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors produced by sandbox operations.
#[derive(Debug, Clone, thiserror::Error)]
pub enum SandboxError {
    /// A configured script does not exist under the base directory.
    #[error("script not found: {}", path.display())]
    ScriptNotFound {
        /// Full path that was tried.
        path: PathBuf,
    },

    /// A script exists but could not be read.
    #[error("failed to read {}: {message}", path.display())]
    Io { path: PathBuf, message: String },

    /// A script failed to parse, raised while running, or `bot_init` raised.
    #[error("failed to load '{script}': {message}")]
    Load { script: String, message: String },

    /// The bot script returned something other than the bot instance.
    #[error("'{script}' must return the bot instance (a table), got {found}")]
    InvalidBot { script: String, found: String },

    /// The bot instance does not define the per-tick entry point.
    #[error("bot does not define a '{name}' method")]
    MissingEntryPoint { name: String },

    /// The script raised an error during a tick.
    #[error("Lua runtime error: {0}")]
    Runtime(String),

    /// Frame data could not be converted into Lua values.
    #[error("failed to marshal frame data: {0}")]
    Marshal(String),

    /// The script allocated past its memory cap.
    #[error("Lua state exceeded memory limit of {limit_bytes} bytes")]
    MemoryLimitExceeded { limit_bytes: usize },

    /// The reply did not fit the controller layout.
    #[error(transparent)]
    Control(#[from] ControlError),
}

impl SandboxError {
    /// `true` for errors that happen while loading scripts, as opposed to
    /// errors raised during a tick.
    pub fn is_load_error(&self) -> bool {
        matches!(
            self,
            Self::ScriptNotFound { .. }
                | Self::Io { .. }
                | Self::Load { .. }
                | Self::InvalidBot { .. }
                | Self::MissingEntryPoint { .. }
        )
    }
}

// ---------------------------------------------------------------------------
// Tests -- loading against the fixture directory
// ---------------------------------------------------------------------------
