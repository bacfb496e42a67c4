//! Python-facing Lua bot.
//!
//! [`PyLuaBot`] owns one [`LuaSandbox`]. The Python agent builds it in
//! `initialize_agent` and calls `get_output` every tick; the returned tuple
//! is in `SimpleControllerState` constructor order, so the agent can return
//! `SimpleControllerState(*values)` directly.

use std::path::PathBuf;
use std::rc::Rc;

use pyo3::prelude::*;
use pyo3::types::PyTuple;
use pyo3::IntoPyObjectExt;
use rlbot_lua_host::{BallPredictionSource, LuaSandbox, SandboxConfig, SandboxError};
use rlbot_lua_packet::{AgentIndex, BallPrediction, ControlValue, ControllerLayout};

use crate::packet;

fn runtime_error(e: SandboxError) -> PyErr {
    pyo3::exceptions::PyRuntimeError::new_err(e.to_string())
}

/// Fetches predictions from the host agent's `get_ball_prediction_struct()`.
struct HostBallPrediction {
    agent: PyObject,
}

impl BallPredictionSource for HostBallPrediction {
    fn ball_prediction(&self) -> anyhow::Result<BallPrediction> {
        let prediction = Python::with_gil(|py| {
            let raw = self
                .agent
                .bind(py)
                .call_method0("get_ball_prediction_struct")?;
            packet::extract_ball_prediction(&raw)
        })?;
        Ok(prediction)
    }
}

/// A Lua bot bound to one car.
///
/// Usage from Python:
/// ```python
/// from rlbot_lua import LuaBot
/// bot = LuaBot(self, self.index, os.path.dirname(__file__))
/// controls = SimpleControllerState(*bot.get_output(packet))
/// ```
#[pyclass(name = "LuaBot", unsendable)]
pub struct PyLuaBot {
    sandbox: LuaSandbox,
}

#[pymethods]
impl PyLuaBot {
    /// Load `classes.lua`, `structs.lua` and `bot.lua` and run `bot_init`.
    ///
    /// Args:
    ///     bot: The host agent, used for `get_ball_prediction_struct()`.
    ///         May be None, in which case scripts cannot fetch predictions.
    ///     index: The car index assigned by the framework.
    ///     base_dir: Directory holding the scripts (default: the current
    ///         directory).
    #[new]
    #[pyo3(signature = (bot, index, base_dir=None))]
    fn new(bot: Option<PyObject>, index: i64, base_dir: Option<PathBuf>) -> PyResult<Self> {
        let index = u32::try_from(index).map_err(|_| {
            pyo3::exceptions::PyValueError::new_err(format!(
                "index must be a non-negative car index, got {index}"
            ))
        })?;
        let base_dir = match base_dir {
            Some(dir) => dir,
            None => std::env::current_dir().map_err(|e| {
                pyo3::exceptions::PyRuntimeError::new_err(format!(
                    "failed to read current directory: {e}"
                ))
            })?,
        };

        let config =
            SandboxConfig::new(base_dir).with_layout(ControllerLayout::simple_controller_state());
        let index = AgentIndex(index);
        let sandbox = match bot {
            Some(agent) => {
                let source: Rc<dyn BallPredictionSource> = Rc::new(HostBallPrediction { agent });
                LuaSandbox::load_with_prediction(&config, index, source)
            }
            None => LuaSandbox::load(&config, index),
        }
        .map_err(runtime_error)?;

        Ok(Self { sandbox })
    }

    /// Run the script for one tick.
    ///
    /// Returns a tuple `(steer, throttle, pitch, yaw, roll, jump, boost,
    /// handbrake, use_item)`. Script errors raise `RuntimeError`.
    fn get_output<'py>(
        &mut self,
        py: Python<'py>,
        packet: &Bound<'py, PyAny>,
    ) -> PyResult<Bound<'py, PyTuple>> {
        let packet = packet::extract_packet(packet)?;
        let state = self.sandbox.get_output(&packet).map_err(runtime_error)?;

        let values = state
            .values()
            .iter()
            .map(|value| match *value {
                ControlValue::Analog(v) => v.into_py_any(py),
                ControlValue::Button(b) => b.into_py_any(py),
            })
            .collect::<PyResult<Vec<_>>>()?;
        PyTuple::new(py, values)
    }

    /// Reload the scripts if any of them changed on disk.
    ///
    /// Returns True if a reload happened. On failure the previous scripts
    /// keep running and `RuntimeError` is raised.
    fn reload(&mut self) -> PyResult<bool> {
        self.sandbox.reload_if_changed().map_err(runtime_error)
    }

    #[getter]
    fn index(&self) -> u32 {
        self.sandbox.index().0
    }

    #[getter]
    fn ticks_run(&self) -> u64 {
        self.sandbox.ticks_run()
    }

    #[getter]
    fn script_digest(&self) -> String {
        self.sandbox.script_digest().to_owned()
    }

    fn __repr__(&self) -> String {
        format!(
            "LuaBot(index={}, base_dir={:?}, ticks_run={})",
            self.sandbox.index(),
            self.sandbox.config().base_dir,
            self.sandbox.ticks_run()
        )
    }
}
