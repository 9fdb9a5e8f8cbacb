//! Ready-made pipelines.

pub mod simple;
pub mod travel;

use anyhow::Result;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::backend::Backend;
use crate::consts::{DEFAULT_CONTEXT_WINDOW, DEFAULT_MEMORY_CAPACITY};
use crate::crew::Crew;
use crate::events::EventBus;

/// Input fields every trip pipeline reads, in prompt order.
pub const TRIP_FIELDS: &[&str] = &["destination", "duration", "budget", "origin"];

/// Knobs shared by every pipeline.
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    /// `0` disables shared memory.
    pub memory_capacity: usize,
    pub context_window: Option<usize>,
    pub output_dir: Option<PathBuf>,
    pub capability_timeout: Option<Duration>,
    pub events: Option<Arc<EventBus>>,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            memory_capacity: DEFAULT_MEMORY_CAPACITY,
            context_window: Some(DEFAULT_CONTEXT_WINDOW),
            output_dir: None,
            capability_timeout: Some(Duration::from_secs(20)),
            events: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Pipeline {
    /// Six specialists, one of them writing the final guide to disk.
    #[default]
    Travel,
    /// A single planner, no capabilities.
    Simple,
}

impl Pipeline {
    pub fn build(self, backend: Arc<dyn Backend>, options: &PipelineOptions) -> Result<Crew> {
        match self {
            Pipeline::Travel => travel::build(backend, options),
            Pipeline::Simple => simple::build(backend, options),
        }
    }

    /// Output file the pipeline writes, relative to the output directory.
    pub fn output_file(self) -> Option<&'static str> {
        match self {
            Pipeline::Travel => Some(travel::OUTPUT_FILE),
            Pipeline::Simple => None,
        }
    }
}

impl std::fmt::Display for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Pipeline::Travel => write!(f, "travel"),
            Pipeline::Simple => write!(f, "simple"),
        }
    }
}

impl std::str::FromStr for Pipeline {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "travel" => Ok(Pipeline::Travel),
            "simple" => Ok(Pipeline::Simple),
            other => anyhow::bail!("unknown crew: {other} (expected travel or simple)"),
        }
    }
}
