//! Host API exposed to bot scripts.
//!
//! Everything a script can call back into Rust is installed here:
//!
//! - the `rlbot` global table: `rlbot.index` (one-based agent index) and
//!   `rlbot.log(level, message)`, which forwards to `tracing`;
//! - `bot:get_ball_prediction()`, attached to the bot instance, which asks
//!   the agent's [`BallPredictionSource`] for a fresh prediction;
//! - the bot directory on `package.path`, so `require` resolves relative to
//!   the scripts rather than the launch directory.

use std::path::Path;
use std::rc::Rc;

use mlua::{Lua, Table, Value};
use rlbot_lua_packet::{AgentIndex, BallPrediction};

use crate::marshal;

/// Tracing target for messages logged by scripts.
pub const SCRIPT_LOG_TARGET: &str = "rlbot_lua::script";

// ---------------------------------------------------------------------------
// Ball prediction
// ---------------------------------------------------------------------------

/// Supplies ball predictions to scripts on demand.
///
/// The host framework owns the prediction; a source is called at most once
/// per `bot:get_ball_prediction()` call, synchronously on the tick path.
pub trait BallPredictionSource {
    fn ball_prediction(&self) -> anyhow::Result<BallPrediction>;
}

impl<F> BallPredictionSource for F
where
    F: Fn() -> anyhow::Result<BallPrediction>,
{
    fn ball_prediction(&self) -> anyhow::Result<BallPrediction> {
        self()
    }
}

// ---------------------------------------------------------------------------
// Registration
// ---------------------------------------------------------------------------

/// Install the `rlbot` global table.
pub(crate) fn register_host_api(lua: &Lua, index: AgentIndex) -> mlua::Result<()> {
    let api = lua.create_table()?;
    api.set("index", index.lua_index())?;

    let log = lua.create_function(move |_, (level, message): (String, String)| {
        host_log(index, &level, &message);
        Ok(())
    })?;
    api.set("log", log)?;

    lua.globals().set("rlbot", api)?;
    Ok(())
}

/// Prepend `base_dir` to `package.path`.
pub(crate) fn extend_package_path(lua: &Lua, base_dir: &Path) -> mlua::Result<()> {
    let package: Table = lua.globals().get("package")?;
    let current: String = package.get("path")?;
    let dir = base_dir.display();
    package.set("path", format!("{dir}/?.lua;{dir}/?/init.lua;{current}"))?;
    Ok(())
}

/// Attach `get_ball_prediction` to the bot instance.
///
/// Without a source the method still exists but raises a Lua error, so a
/// script that calls it fails loudly instead of reading `nil`.
pub(crate) fn attach_ball_prediction(
    lua: &Lua,
    bot: &Table<'_>,
    source: Option<Rc<dyn BallPredictionSource>>,
) -> mlua::Result<()> {
    let get_ball_prediction = lua.create_function(move |lua, _bot: Value| {
        let source = source.as_ref().ok_or_else(|| {
            mlua::Error::RuntimeError(
                "no ball prediction source is attached to this agent".to_owned(),
            )
        })?;
        let prediction = source
            .ball_prediction()
            .map_err(mlua::Error::external)?;
        let raw = marshal::prediction_to_lua(lua, &prediction)?;
        marshal::construct_with_global(lua, "BallPrediction", raw)
    })?;
    bot.set("get_ball_prediction", get_ball_prediction)
}

fn host_log(index: AgentIndex, level: &str, message: &str) {
    match level.to_ascii_lowercase().as_str() {
        "error" => tracing::error!(target: SCRIPT_LOG_TARGET, agent = index.0, "{message}"),
        "warn" | "warning" => {
            tracing::warn!(target: SCRIPT_LOG_TARGET, agent = index.0, "{message}")
        }
        "debug" => tracing::debug!(target: SCRIPT_LOG_TARGET, agent = index.0, "{message}"),
        "trace" => tracing::trace!(target: SCRIPT_LOG_TARGET, agent = index.0, "{message}"),
        _ => tracing::info!(target: SCRIPT_LOG_TARGET, agent = index.0, "{message}"),
    }
}
