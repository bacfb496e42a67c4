//! Named agent factories.

use std::collections::BTreeMap;

use crate::{Agent, AgentConfig, AgentError, LuaAgent};

/// A boxed agent as handed out by the registry.
pub type DynAgent = Box<dyn Agent<Error = AgentError>>;

/// Builds an uninitialized agent from its config.
pub type AgentFactory = Box<dyn Fn(&AgentConfig) -> DynAgent>;

/// Maps bot names to agent factories.
///
/// [`AgentRegistry::new`] registers [`LuaAgent`] under `"lua"`.
pub struct AgentRegistry {
    factories: BTreeMap<String, AgentFactory>,
}

impl AgentRegistry {
    pub fn new() -> Self {
        let mut registry = Self::empty();
        registry.register("lua", |config| Box::new(LuaAgent::new(config.clone())));
        registry
    }

    /// A registry with nothing registered.
    pub fn empty() -> Self {
        Self {
            factories: BTreeMap::new(),
        }
    }

    /// Register `factory` under `name`, replacing any previous entry.
    pub fn register<F>(&mut self, name: &str, factory: F)
    where
        F: Fn(&AgentConfig) -> DynAgent + 'static,
    {
        if self
            .factories
            .insert(name.to_owned(), Box::new(factory))
            .is_some()
        {
            tracing::debug!(name, "replaced agent factory");
        }
    }

    /// Build the agent named by `config.name`.
    pub fn create(&self, config: &AgentConfig) -> Result<DynAgent, AgentError> {
        let factory = self
            .factories
            .get(&config.name)
            .ok_or_else(|| AgentError::UnknownBot(config.name.clone()))?;
        Ok(factory(config))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Registered names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }
}

impl Default for AgentRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for AgentRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentRegistry")
            .field("names", &self.factories.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rlbot_lua_packet::{AgentIndex, ControllerLayout, ControllerState, GameTickPacket};

    /// Always outputs neutral controls.
    struct IdleAgent {
        index: Option<AgentIndex>,
    }

    impl Agent for IdleAgent {
        type Error = AgentError;

        fn initialize(&mut self, index: AgentIndex) -> Result<(), AgentError> {
            self.index = Some(index);
            Ok(())
        }

        fn get_output(&mut self, _: &GameTickPacket) -> Result<ControllerState, AgentError> {
            Ok(ControllerState::neutral(&ControllerLayout::standard()))
        }

        fn index(&self) -> Option<AgentIndex> {
            self.index
        }
    }

    #[test]
    fn lua_is_registered_by_default() {
        let registry = AgentRegistry::new();
        assert!(registry.contains("lua"));
        let agent = registry.create(&AgentConfig::default()).unwrap();
        assert_eq!(agent.index(), None);
    }

    #[test]
    fn unknown_name_is_rejected() {
        let registry = AgentRegistry::empty();
        let err = registry.create(&AgentConfig::default()).err().unwrap();
        assert!(matches!(err, AgentError::UnknownBot(ref name) if name == "lua"));
    }

    #[test]
    fn custom_factory_is_used_by_name() {
        let mut registry = AgentRegistry::new();
        registry.register("idle", |_| Box::new(IdleAgent { index: None }));
        assert_eq!(registry.names().collect::<Vec<_>>(), vec!["idle", "lua"]);

        let config = AgentConfig {
            name: "idle".to_owned(),
            ..AgentConfig::default()
        };
        let mut agent = registry.create(&config).unwrap();
        agent.initialize(AgentIndex(3)).unwrap();
        let state = agent.get_output(&GameTickPacket::zeroed(4)).unwrap();
        assert_eq!(state.analog("throttle"), Some(0.0));
        assert_eq!(agent.index(), Some(AgentIndex(3)));
    }
}
