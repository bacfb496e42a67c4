//! RLBot Lua agent -- the host-facing shim around a Lua sandbox.
//!
//! The host framework drives a bot through two calls: `initialize` once
//! with the car index it assigned, then `get_output` once per tick. This
//! crate defines that contract as the [`Agent`] trait and implements it for
//! Lua scripts with [`LuaAgent`].
//!
//! # Architecture
//!
//! - **`Agent`**: the two-call lifecycle every bot implementation provides.
//! - **`LuaAgent`**: loads a [`LuaSandbox`] on `initialize` and forwards
//!   each tick to it.
//! - **`AgentRegistry`**: bot name to factory, so hosts select an
//!   implementation by name instead of subclassing.
//! - **`Roster`**: one agent per car index, ticked together with failures
//!   kept per agent.
//! - **`replay`**: runs an agent over a recorded packet log offline.
//!
//! # Example
//!
//! ```no_run
//! use rlbot_lua_agent::{Agent, AgentConfig, LuaAgent};
//! use rlbot_lua_packet::{AgentIndex, GameTickPacket};
//!
//! let config = AgentConfig::from_json_file("bot/agent.json").unwrap();
//! let mut agent = LuaAgent::new(config);
//! agent.initialize(AgentIndex(0)).unwrap();
//! let controls = agent.get_output(&GameTickPacket::zeroed(2)).unwrap();
//! println!("{:?}", controls.values());
//! ```

#![deny(unsafe_code)]

pub mod config;
pub mod registry;
pub mod replay;
pub mod roster;

use std::rc::Rc;

pub use config::AgentConfig;
pub use registry::{AgentFactory, AgentRegistry, DynAgent};
pub use roster::{Roster, TickOutcome};

use rlbot_lua_host::{BallPredictionSource, LuaSandbox, SandboxError};
use rlbot_lua_packet::{AgentIndex, ControllerState, GameTickPacket};

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors produced by agents.
#[derive(Debug, Clone, thiserror::Error)]
pub enum AgentError {
    /// `get_output` was called before a successful `initialize`.
    #[error("agent is not initialized")]
    NotReady,

    /// The sandbox failed to load or to run a tick.
    #[error(transparent)]
    Sandbox(#[from] SandboxError),

    /// An agent configuration file could not be read or parsed.
    #[error("invalid agent config: {0}")]
    Config(String),

    /// No factory is registered under the requested bot name.
    #[error("no agent registered under the name '{0}'")]
    UnknownBot(String),
}

// ---------------------------------------------------------------------------
// Agent trait
// ---------------------------------------------------------------------------

/// The lifecycle the host framework drives.
///
/// Calls are synchronous and never overlap: `initialize` runs once before
/// any `get_output`, and each `get_output` returns before the next tick.
pub trait Agent {
    type Error;

    /// Bind the agent to the car at `index` and load whatever it needs.
    fn initialize(&mut self, index: AgentIndex) -> Result<(), Self::Error>;

    /// Produce the control output for one tick.
    fn get_output(&mut self, packet: &GameTickPacket) -> Result<ControllerState, Self::Error>;

    /// The bound car index, once initialized.
    fn index(&self) -> Option<AgentIndex>;
}

// ---------------------------------------------------------------------------
// LuaAgent
// ---------------------------------------------------------------------------

/// An [`Agent`] backed by a Lua script.
///
/// Not ready until [`initialize`](Agent::initialize) succeeds. A failed
/// `initialize` leaves the agent not ready; the host decides whether to
/// try again.
pub struct LuaAgent {
    config: AgentConfig,
    prediction: Option<Rc<dyn BallPredictionSource>>,
    sandbox: Option<LuaSandbox>,
}

impl LuaAgent {
    pub fn new(config: AgentConfig) -> Self {
        Self {
            config,
            prediction: None,
            sandbox: None,
        }
    }

    /// Serve `bot:get_ball_prediction()` from `source`. Takes effect on the
    /// next `initialize`.
    pub fn with_ball_prediction(mut self, source: Rc<dyn BallPredictionSource>) -> Self {
        self.prediction = Some(source);
        self
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    pub fn is_ready(&self) -> bool {
        self.sandbox.is_some()
    }

    /// The loaded sandbox, once initialized.
    pub fn sandbox(&self) -> Option<&LuaSandbox> {
        self.sandbox.as_ref()
    }

    /// Reload the scripts from disk. On failure the running scripts stay
    /// in place.
    pub fn reload(&mut self) -> Result<(), AgentError> {
        let sandbox = self.sandbox.as_mut().ok_or(AgentError::NotReady)?;
        sandbox.reload()?;
        Ok(())
    }

    /// Reload only if a script changed on disk. Returns `true` if a reload
    /// happened.
    pub fn reload_if_changed(&mut self) -> Result<bool, AgentError> {
        let sandbox = self.sandbox.as_mut().ok_or(AgentError::NotReady)?;
        Ok(sandbox.reload_if_changed()?)
    }
}

impl Agent for LuaAgent {
    type Error = AgentError;

    fn initialize(&mut self, index: AgentIndex) -> Result<(), AgentError> {
        self.sandbox = None;

        let sandbox = match &self.prediction {
            Some(source) => {
                LuaSandbox::load_with_prediction(&self.config.sandbox, index, Rc::clone(source))
            }
            None => LuaSandbox::load(&self.config.sandbox, index),
        }
        .map_err(|e| {
            tracing::error!(
                agent = index.0,
                bot = %self.config.name,
                error = %e,
                "failed to initialize agent"
            );
            e
        })?;

        tracing::info!(
            agent = index.0,
            bot = %self.config.name,
            digest = %sandbox.script_digest(),
            "agent initialized"
        );
        self.sandbox = Some(sandbox);
        Ok(())
    }

    fn get_output(&mut self, packet: &GameTickPacket) -> Result<ControllerState, AgentError> {
        let sandbox = self.sandbox.as_mut().ok_or(AgentError::NotReady)?;
        Ok(sandbox.get_output(packet)?)
    }

    fn index(&self) -> Option<AgentIndex> {
        self.sandbox.as_ref().map(LuaSandbox::index)
    }
}

impl std::fmt::Debug for LuaAgent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LuaAgent")
            .field("name", &self.config.name)
            .field("sandbox", &self.sandbox)
            .finish_non_exhaustive()
    }
}
