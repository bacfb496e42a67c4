//! Several agents driven from one process, one per car index.
//!
//! Each agent owns its own sandbox, so agents never observe each other's
//! script state. A failing agent is reported in its own [`TickOutcome`]
//! and the rest of the roster keeps running.

use rlbot_lua_packet::{AgentIndex, ControllerState, GameTickPacket};

use crate::{AgentConfig, AgentError, AgentRegistry, DynAgent};

/// One agent's result for one tick.
#[derive(Debug)]
pub struct TickOutcome {
    pub index: AgentIndex,
    pub result: Result<ControllerState, AgentError>,
}

struct Slot {
    index: AgentIndex,
    agent: DynAgent,
}

/// Agents keyed by car index, in insertion order.
#[derive(Default)]
pub struct Roster {
    slots: Vec<Slot>,
}

impl Roster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build one agent per index from the same config.
    pub fn from_registry(
        registry: &AgentRegistry,
        config: &AgentConfig,
        indices: impl IntoIterator<Item = AgentIndex>,
    ) -> Result<Self, AgentError> {
        let mut roster = Self::new();
        for index in indices {
            roster.add(index, registry.create(config)?)?;
        }
        Ok(roster)
    }

    /// Add an uninitialized agent for `index`.
    ///
    /// # Errors
    ///
    /// [`AgentError::Config`] if `index` already has an agent.
    pub fn add(&mut self, index: AgentIndex, agent: DynAgent) -> Result<(), AgentError> {
        if self.slots.iter().any(|slot| slot.index == index) {
            return Err(AgentError::Config(format!(
                "roster already has an agent for index {index}"
            )));
        }
        self.slots.push(Slot { index, agent });
        Ok(())
    }

    /// Initialize every agent with its own index.
    ///
    /// Returns the indices that failed together with their errors. Failed
    /// agents stay in the roster and report [`AgentError::NotReady`] on
    /// every tick.
    pub fn initialize_all(&mut self) -> Vec<(AgentIndex, AgentError)> {
        let mut failures = Vec::new();
        for slot in &mut self.slots {
            if let Err(e) = slot.agent.initialize(slot.index) {
                tracing::warn!(agent = slot.index.0, error = %e, "agent failed to initialize");
                failures.push((slot.index, e));
            }
        }
        failures
    }

    /// Run every agent on `packet`.
    pub fn tick(&mut self, packet: &GameTickPacket) -> Vec<TickOutcome> {
        self.slots
            .iter_mut()
            .map(|slot| {
                let result = slot.agent.get_output(packet);
                if let Err(e) = &result {
                    tracing::debug!(agent = slot.index.0, error = %e, "agent tick failed");
                }
                TickOutcome {
                    index: slot.index,
                    result,
                }
            })
            .collect()
    }

    pub fn indices(&self) -> impl Iterator<Item = AgentIndex> + '_ {
        self.slots.iter().map(|slot| slot.index)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

impl std::fmt::Debug for Roster {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Roster")
            .field("indices", &self.indices().collect::<Vec<_>>())
            .finish()
    }
}
