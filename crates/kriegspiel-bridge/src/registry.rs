//! Registry of selectable agents

use kriegspiel_core::{Agent, BridgeError, GameDescriptor};
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Zero-argument factory producing a fresh agent for one match
pub type AgentFactory = Box<dyn Fn() -> Result<Box<dyn Agent>, BridgeError> + Send + Sync>;

/// Capability predicate: can the agent play this game?
pub type SupportsPredicate = Box<dyn Fn(&GameDescriptor) -> bool + Send + Sync>;

struct RegistryEntry {
    factory: AgentFactory,
    supports: SupportsPredicate,
}

/// Agents selectable by display name
#[derive(Default)]
pub struct AgentRegistry {
    agents: BTreeMap<String, RegistryEntry>,
}

impl AgentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an agent under `name`.
    ///
    /// A name collision leaves the existing entry in place and returns
    /// `AlreadyRegistered`; callers should warn, not abort.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        factory: impl Fn() -> Result<Box<dyn Agent>, BridgeError> + Send + Sync + 'static,
        supports: impl Fn(&GameDescriptor) -> bool + Send + Sync + 'static,
    ) -> Result<(), RegistryError> {
        let name = name.into();
        if self.agents.contains_key(&name) {
            return Err(RegistryError::AlreadyRegistered(name));
        }
        debug!("Registered agent {}", name);
        self.agents.insert(
            name,
            RegistryEntry {
                factory: Box::new(factory),
                supports: Box::new(supports),
            },
        );
        Ok(())
    }

    /// Deregister an agent
    pub fn deregister(&mut self, name: &str) -> Result<(), RegistryError> {
        self.agents
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| RegistryError::NotFound(name.to_owned()))
    }

    /// Build a fresh agent instance
    pub fn create(&self, name: &str) -> Result<Box<dyn Agent>, RegistryError> {
        let entry = self
            .agents
            .get(name)
            .ok_or_else(|| RegistryError::NotFound(name.to_owned()))?;
        Ok((entry.factory)()?)
    }

    /// Whether `name` can play `game`; unknown agents cannot
    pub fn supports(&self, name: &str, game: &GameDescriptor) -> bool {
        self.agents
            .get(name)
            .is_some_and(|entry| (entry.supports)(game))
    }

    /// Names of agents able to play `game`, in name order
    pub fn agents_for(&self, game: &GameDescriptor) -> Vec<&str> {
        self.agents
            .iter()
            .filter(|(_, entry)| (entry.supports)(game))
            .map(|(name, _)| name.as_str())
            .collect()
    }

    /// All registered names
    pub fn names(&self) -> Vec<&str> {
        self.agents.keys().map(String::as_str).collect()
    }

    pub fn count(&self) -> usize {
        self.agents.len()
    }
}

/// Register, downgrading a name collision to a warning
pub fn register_or_warn(
    registry: &mut AgentRegistry,
    name: impl Into<String>,
    factory: impl Fn() -> Result<Box<dyn Agent>, BridgeError> + Send + Sync + 'static,
    supports: impl Fn(&GameDescriptor) -> bool + Send + Sync + 'static,
) -> bool {
    match registry.register(name, factory, supports) {
        Ok(()) => true,
        Err(e) => {
            warn!("WARNING! Failed to register agent: {}", e);
            false
        }
    }
}

/// Registry errors
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("Agent already registered: {0}")]
    AlreadyRegistered(String),
    #[error("Agent not found: {0}")]
    NotFound(String),
    #[error(transparent)]
    Agent(#[from] BridgeError),
}
