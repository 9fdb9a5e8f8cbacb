pub mod sequential;

use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;

use crate::backend::{Backend, TokenUsage};
use crate::crew::{CrewConfig, CrewError, Inputs, WorkUnit};
use crate::events::EventBus;
use crate::memory::SharedMemory;

pub use sequential::Sequential;

/// What a process gets to work with for one run. Borrowed from the crew.
pub struct RunContext<'a> {
    pub units: &'a [WorkUnit],
    pub backend: &'a Arc<dyn Backend>,
    pub config: &'a CrewConfig,
    pub memory: Option<&'a mut SharedMemory>,
    pub events: Option<&'a EventBus>,
}

#[derive(Debug, Clone, Default)]
pub struct RunOutput {
    /// Result of the last unit executed, or empty.
    pub result: String,
    /// Every unit's result, indexed like the units.
    pub results: Vec<String>,
    pub usage: TokenUsage,
}

/// An execution strategy. The crew delegates each run to one of these.
#[async_trait]
pub trait Process: Send + Sync {
    fn name(&self) -> &str;
    async fn execute(&self, run: RunContext<'_>, inputs: &Inputs) -> Result<RunOutput>;
}

/// Declared process modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProcessMode {
    #[default]
    Sequential,
    /// A manager actor delegating to the others. Declared, not implemented:
    /// selecting it fails the build instead of silently running something else.
    Hierarchical,
}

impl ProcessMode {
    pub fn strategy(self) -> Result<Box<dyn Process>, CrewError> {
        match self {
            ProcessMode::Sequential => Ok(Box::new(Sequential)),
            ProcessMode::Hierarchical => Err(CrewError::UnsupportedProcess(self)),
        }
    }
}

impl std::fmt::Display for ProcessMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProcessMode::Sequential => write!(f, "sequential"),
            ProcessMode::Hierarchical => write!(f, "hierarchical"),
        }
    }
}

impl std::str::FromStr for ProcessMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "sequential" => Ok(ProcessMode::Sequential),
            "hierarchical" => Ok(ProcessMode::Hierarchical),
            other => anyhow::bail!("unknown process mode: {other}"),
        }
    }
}
