//! PyO3 bindings that let an RLBot Python agent run a Lua bot.
//!
//! The framework loads a Python agent; that agent constructs a
//! [`LuaBot`](bot::PyLuaBot) and forwards each tick to it. Packets are read
//! attribute by attribute from the framework's ctypes structures.

#![deny(unsafe_code)]

use pyo3::prelude::*;

mod bot;
mod packet;

/// Install a `tracing` subscriber that writes to stderr.
///
/// Args:
///     filter: An `EnvFilter` directive such as `"rlbot_lua=debug"`.
///         Defaults to `RUST_LOG`, or `"info"` if that is unset.
///
/// Returns False if a subscriber was already installed.
#[pyfunction]
#[pyo3(signature = (filter=None))]
fn init_logging(filter: Option<&str>) -> PyResult<bool> {
    let filter = match filter {
        Some(directive) => tracing_subscriber::EnvFilter::try_new(directive).map_err(|e| {
            pyo3::exceptions::PyValueError::new_err(format!("invalid log filter: {e}"))
        })?,
        None => tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
    };
    Ok(tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .is_ok())
}

/// The `rlbot_lua` native module.
#[pymodule]
fn rlbot_lua(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<bot::PyLuaBot>()?;
    m.add_function(wrap_pyfunction!(init_logging, m)?)?;
    Ok(())
}
