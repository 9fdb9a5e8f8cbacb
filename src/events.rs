//! Progress events for interactive front ends.
//!
//! A crew built with an [`EventBus`] emits an [`Event`] at each step of a
//! run; front ends subscribe via [`EventBus::subscribe`]. Built on
//! [`tokio::sync::broadcast`] so multiple listeners can react independently.
//! A crew without a bus runs silently.

use std::path::PathBuf;

use tokio::sync::broadcast;

/// Events that flow out of a run.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    RunStarted { units: usize, process: String },
    /// `index` is zero-based.
    UnitStarted {
        index: usize,
        total: usize,
        role: String,
    },
    CapabilitySkipped {
        role: String,
        capability: String,
        missing: Vec<String>,
    },
    CapabilityFailed {
        role: String,
        capability: String,
        error: String,
    },
    UnitFinished {
        index: usize,
        total: usize,
        role: String,
        result: String,
    },
    OutputSaved { path: PathBuf },
    RunFinished { units: usize },
}

/// A broadcast channel that any component can emit to or subscribe from.
#[derive(Debug)]
pub struct EventBus {
    tx: broadcast::Sender<Event>,
}

impl EventBus {
    /// Create a new event bus with the given channel capacity.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Emit an event to all current subscribers.
    /// Returns the number of receivers that will see it.
    pub fn emit(&self, event: Event) -> usize {
        self.tx.send(event).unwrap_or(0)
    }

    /// Subscribe to events. Returns a receiver that yields all
    /// future events (does not replay past ones).
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.tx.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(64)
    }
}
