use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::Actor;

/// Stable handle to a unit inside one crew: its position in the arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UnitId(pub(crate) usize);

impl UnitId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl std::fmt::Display for UnitId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0 + 1)
    }
}

/// One pipeline step. Stateless between runs: results live in the run, not here.
#[derive(Debug, Clone)]
pub struct WorkUnit {
    instruction: String,
    expected_output: String,
    actor: Option<Arc<Actor>>,
    dependencies: Vec<UnitId>,
    output_file: Option<PathBuf>,
}

impl WorkUnit {
    /// `instruction` may contain `{field}` placeholders filled from run inputs.
    pub fn new(instruction: impl Into<String>, expected_output: impl Into<String>) -> Self {
        Self {
            instruction: instruction.into(),
            expected_output: expected_output.into(),
            actor: None,
            dependencies: Vec::new(),
            output_file: None,
        }
    }

    pub fn actor(mut self, actor: Arc<Actor>) -> Self {
        self.actor = Some(actor);
        self
    }

    /// Feed this unit the result of `dependency`. Order of calls is the
    /// order of the context blocks.
    pub fn depends_on(mut self, dependency: UnitId) -> Self {
        self.dependencies.push(dependency);
        self
    }

    /// Persist the raw result here after every run (overwritten each time).
    pub fn output_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_file = Some(path.into());
        self
    }

    pub fn instruction(&self) -> &str {
        &self.instruction
    }

    pub fn expected_output(&self) -> &str {
        &self.expected_output
    }

    pub fn assigned_actor(&self) -> Option<&Arc<Actor>> {
        self.actor.as_ref()
    }

    pub fn dependencies(&self) -> &[UnitId] {
        &self.dependencies
    }

    pub fn output_target(&self) -> Option<&Path> {
        self.output_file.as_deref()
    }
}
