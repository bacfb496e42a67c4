//! Offline replay of recorded packets through an agent.
//!
//! A [`PacketLog`] is a JSON-lines file with one [`GameTickPacket`] per
//! line. [`replay`] feeds the packets to an initialized agent in order and
//! collects the control outputs, stopping at the first failure. A failed
//! tick is reported as-is; no neutral output is substituted for it.

use std::io::BufRead;
use std::path::Path;

use anyhow::Context;
use rlbot_lua_packet::{ControllerState, GameTickPacket};
use serde::Serialize;

use crate::Agent;

// ---------------------------------------------------------------------------
// PacketLog
// ---------------------------------------------------------------------------

/// Recorded packets in tick order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PacketLog {
    pub packets: Vec<GameTickPacket>,
}

impl PacketLog {
    /// Parse JSON lines. Blank lines are skipped.
    pub fn from_reader(reader: impl BufRead) -> anyhow::Result<Self> {
        let mut packets = Vec::new();
        for (number, line) in reader.lines().enumerate() {
            let line = line.with_context(|| format!("failed to read line {}", number + 1))?;
            if line.trim().is_empty() {
                continue;
            }
            let packet: GameTickPacket = serde_json::from_str(&line)
                .with_context(|| format!("line {} is not a valid packet", number + 1))?;
            packets.push(packet);
        }
        Ok(Self { packets })
    }

    pub fn from_path(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let file = std::fs::File::open(path)
            .with_context(|| format!("failed to open packet log {}", path.display()))?;
        Self::from_reader(std::io::BufReader::new(file))
    }

    pub fn len(&self) -> usize {
        self.packets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packets.is_empty()
    }
}

// ---------------------------------------------------------------------------
// ReplayReport
// ---------------------------------------------------------------------------

/// What happened when a [`PacketLog`] was replayed.
#[derive(Debug, Serialize)]
pub struct ReplayReport {
    /// Ticks that produced an output.
    pub ticks_run: u64,
    /// One output per successful tick, in order.
    pub outputs: Vec<ControllerState>,
    /// The tick that stopped the replay, if any.
    pub failure: Option<ReplayFailure>,
}

impl ReplayReport {
    pub fn completed(&self) -> bool {
        self.failure.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReplayFailure {
    /// Zero-based position of the failing packet in the log.
    pub tick: u64,
    pub message: String,
}

// ---------------------------------------------------------------------------
// replay()
// ---------------------------------------------------------------------------

/// Run `agent` over `log`. The agent must already be initialized.
pub fn replay<A>(agent: &mut A, log: &PacketLog) -> ReplayReport
where
    A: Agent + ?Sized,
    A::Error: std::fmt::Display,
{
    let mut outputs = Vec::with_capacity(log.len());
    let mut failure = None;

    for (tick, packet) in log.packets.iter().enumerate() {
        match agent.get_output(packet) {
            Ok(state) => outputs.push(state),
            Err(e) => {
                tracing::warn!(tick, error = %e, "replay stopped");
                failure = Some(ReplayFailure {
                    tick: tick as u64,
                    message: e.to_string(),
                });
                break;
            }
        }
    }

    ReplayReport {
        ticks_run: outputs.len() as u64,
        outputs,
        failure,
    }
}
