use std::sync::Arc;

use crate::backend::Backend;
use crate::capabilities::{Capability, CapabilitySet};

use super::CrewError;

/// A role-bound executor: fixed persona, capability set, optional own backend.
///
/// Immutable once built. Share it with `Arc` across the units it executes.
pub struct Actor {
    role: String,
    goal: String,
    backstory: String,
    capabilities: CapabilitySet,
    backend: Option<Arc<dyn Backend>>,
}

impl std::fmt::Debug for Actor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Actor")
            .field("role", &self.role)
            .field("capabilities", &self.capabilities)
            .field("backend", &self.backend.as_ref().map(|b| b.name()))
            .finish()
    }
}

impl Actor {
    pub fn builder(role: impl Into<String>, goal: impl Into<String>) -> ActorBuilder {
        ActorBuilder {
            role: role.into(),
            goal: goal.into(),
            backstory: String::new(),
            capabilities: Vec::new(),
            backend: None,
        }
    }

    pub fn role(&self) -> &str {
        &self.role
    }

    pub fn goal(&self) -> &str {
        &self.goal
    }

    pub fn backstory(&self) -> &str {
        &self.backstory
    }

    pub fn capabilities(&self) -> &CapabilitySet {
        &self.capabilities
    }

    /// The actor's own backend, if it carries one. Otherwise the crew's is used.
    pub fn backend(&self) -> Option<&Arc<dyn Backend>> {
        self.backend.as_ref()
    }
}

pub struct ActorBuilder {
    role: String,
    goal: String,
    backstory: String,
    capabilities: Vec<Arc<dyn Capability>>,
    backend: Option<Arc<dyn Backend>>,
}

impl ActorBuilder {
    pub fn backstory(mut self, backstory: impl Into<String>) -> Self {
        self.backstory = backstory.into();
        self
    }

    pub fn capability(mut self, capability: Arc<dyn Capability>) -> Self {
        self.capabilities.push(capability);
        self
    }

    pub fn backend(mut self, backend: Arc<dyn Backend>) -> Self {
        self.backend = Some(backend);
        self
    }

    /// Fails if two capabilities share a name.
    pub fn build(self) -> Result<Arc<Actor>, CrewError> {
        let mut capabilities = CapabilitySet::new();
        for capability in self.capabilities {
            capabilities.register(capability)?;
        }
        Ok(Arc::new(Actor {
            role: self.role,
            goal: self.goal,
            backstory: self.backstory,
            capabilities,
            backend: self.backend,
        }))
    }
}
