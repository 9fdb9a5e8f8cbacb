//! The crew: actors, ordered work units, a process strategy, and the
//! run entry point.
//!
//! Build one with [`Crew::builder`], register units with
//! [`CrewBuilder::add_unit`] (which hands back a [`UnitId`] to depend on),
//! then call [`Crew::run`] with the input map.

mod actor;
mod unit;

pub use actor::{Actor, ActorBuilder};
pub use unit::{UnitId, WorkUnit};

use anyhow::Result;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use crate::backend::{Backend, TokenUsage};
use crate::capabilities::Args;
use crate::consts::DEFAULT_CONTEXT_WINDOW;
use crate::engine::{Process, ProcessMode, RunContext};
use crate::events::{Event, EventBus};
use crate::memory::SharedMemory;

/// Run inputs: field name to value. Unrecognized fields are ignored.
pub type Inputs = Args;

/// Invalid crew construction, reported by [`CrewBuilder::build`].
#[derive(Debug, thiserror::Error)]
pub enum CrewError {
    #[error("unit {unit} has no actor assigned")]
    MissingActor { unit: UnitId },

    #[error("unit {unit} depends on {dependency}, which is not part of this crew")]
    UnknownDependency { unit: UnitId, dependency: UnitId },

    #[error("unit {unit} depends on {dependency}, which is not scheduled before it")]
    ForwardDependency { unit: UnitId, dependency: UnitId },

    #[error("capability '{0}' is registered twice for the same actor")]
    DuplicateCapability(String),

    #[error("the {0} process is not implemented")]
    UnsupportedProcess(ProcessMode),
}

/// Engine tunables, injected at build time.
#[derive(Debug, Clone)]
pub struct CrewConfig {
    /// Keep only the last N characters of rolling history in a prompt. `None` keeps all.
    pub context_window: Option<usize>,
    pub include_backstory: bool,
    /// Input fields surfaced at the top of every prompt, in this order.
    pub highlight_fields: Vec<String>,
    /// Input field the backend is told to stay focused on.
    pub focus_field: Option<String>,
    pub capability_timeout: Option<Duration>,
    /// Relative output targets resolve against this directory.
    pub output_dir: Option<PathBuf>,
}

impl Default for CrewConfig {
    fn default() -> Self {
        Self {
            context_window: Some(DEFAULT_CONTEXT_WINDOW),
            include_backstory: true,
            highlight_fields: Vec::new(),
            focus_field: None,
            capability_timeout: None,
            output_dir: None,
        }
    }
}

pub struct Crew {
    actors: Vec<Arc<Actor>>,
    units: Vec<WorkUnit>,
    process: Box<dyn Process>,
    memory: Option<SharedMemory>,
    backend: Arc<dyn Backend>,
    config: CrewConfig,
    events: Option<Arc<EventBus>>,
    usage: TokenUsage,
}

impl Crew {
    pub fn builder(backend: Arc<dyn Backend>) -> CrewBuilder {
        CrewBuilder {
            backend,
            actors: Vec::new(),
            units: Vec::new(),
            process: ProcessChoice::Mode(ProcessMode::Sequential),
            memory: None,
            config: CrewConfig::default(),
            events: None,
        }
    }

    /// Execute every unit once, per the process strategy, and return the
    /// last unit's result (empty when there are no units).
    ///
    /// A backend failure aborts the run and propagates. Capability failures never do.
    pub async fn run(&mut self, inputs: &Inputs) -> Result<String> {
        info!(units = self.units.len(), process = self.process.name(), "run started");
        if let Some(bus) = self.events.as_deref() {
            bus.emit(Event::RunStarted {
                units: self.units.len(),
                process: self.process.name().to_string(),
            });
        }

        let run = RunContext {
            units: &self.units,
            backend: &self.backend,
            config: &self.config,
            memory: self.memory.as_mut(),
            events: self.events.as_deref(),
        };
        let output = self.process.execute(run, inputs).await?;

        self.usage.add(output.usage);
        info!(chars = output.result.chars().count(), "run finished");
        if let Some(bus) = self.events.as_deref() {
            bus.emit(Event::RunFinished {
                units: self.units.len(),
            });
        }
        Ok(output.result)
    }

    pub fn actors(&self) -> &[Arc<Actor>] {
        &self.actors
    }

    pub fn units(&self) -> &[WorkUnit] {
        &self.units
    }

    pub fn memory(&self) -> Option<&SharedMemory> {
        self.memory.as_ref()
    }

    pub fn config(&self) -> &CrewConfig {
        &self.config
    }

    pub fn process_name(&self) -> &str {
        self.process.name()
    }

    /// Tokens used across every run of this crew.
    pub fn session_usage(&self) -> TokenUsage {
        self.usage
    }
}

enum ProcessChoice {
    Mode(ProcessMode),
    Custom(Box<dyn Process>),
}

/// Registers actors and units in order, then validates everything in [`build`](Self::build).
pub struct CrewBuilder {
    backend: Arc<dyn Backend>,
    actors: Vec<Arc<Actor>>,
    units: Vec<WorkUnit>,
    process: ProcessChoice,
    memory: Option<SharedMemory>,
    config: CrewConfig,
    events: Option<Arc<EventBus>>,
}

impl CrewBuilder {
    pub fn actor(&mut self, actor: Arc<Actor>) -> &mut Self {
        if !self.actors.iter().any(|a| Arc::ptr_eq(a, &actor)) {
            self.actors.push(actor);
        }
        self
    }

    /// Append a unit to the execution order and return its handle.
    pub fn add_unit(&mut self, unit: WorkUnit) -> UnitId {
        self.units.push(unit);
        UnitId(self.units.len() - 1)
    }

    pub fn process(&mut self, mode: ProcessMode) -> &mut Self {
        self.process = ProcessChoice::Mode(mode);
        self
    }

    /// Plug in a strategy not covered by [`ProcessMode`].
    pub fn process_strategy(&mut self, process: Box<dyn Process>) -> &mut Self {
        self.process = ProcessChoice::Custom(process);
        self
    }

    pub fn memory(&mut self, memory: SharedMemory) -> &mut Self {
        self.memory = Some(memory);
        self
    }

    pub fn config(&mut self, config: CrewConfig) -> &mut Self {
        self.config = config;
        self
    }

    /// Emit progress events on this bus. Without one, runs are silent.
    pub fn events(&mut self, bus: Arc<EventBus>) -> &mut Self {
        self.events = Some(bus);
        self
    }

    pub fn build(self) -> Result<Crew, CrewError> {
        let CrewBuilder {
            backend,
            mut actors,
            units,
            process,
            memory,
            config,
            events,
        } = self;

        for (index, unit) in units.iter().enumerate() {
            let id = UnitId(index);
            let actor = unit
                .assigned_actor()
                .ok_or(CrewError::MissingActor { unit: id })?;
            if !actors.iter().any(|a| Arc::ptr_eq(a, actor)) {
                actors.push(Arc::clone(actor));
            }

            for &dependency in unit.dependencies() {
                if dependency.index() >= units.len() {
                    return Err(CrewError::UnknownDependency {
                        unit: id,
                        dependency,
                    });
                }
                if dependency.index() >= index {
                    return Err(CrewError::ForwardDependency {
                        unit: id,
                        dependency,
                    });
                }
            }
        }

        let process = match process {
            ProcessChoice::Mode(mode) => mode.strategy()?,
            ProcessChoice::Custom(process) => process,
        };

        Ok(Crew {
            actors,
            units,
            process,
            memory,
            backend,
            config,
            events,
            usage: TokenUsage::default(),
        })
    }
}
