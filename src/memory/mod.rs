//! Bounded shared memory: the cross-step log a crew falls back to when a
//! unit declares no dependencies.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::consts::DEFAULT_MEMORY_CAPACITY;

/// A single entry: which actor said what.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryEntry {
    pub role: String,
    pub content: String,
}

/// FIFO log of `(role, content)` pairs. Never holds more than `capacity` entries.
#[derive(Debug, Clone)]
pub struct SharedMemory {
    capacity: usize,
    entries: VecDeque<MemoryEntry>,
}

impl Default for SharedMemory {
    fn default() -> Self {
        Self::new(DEFAULT_MEMORY_CAPACITY)
    }
}

impl SharedMemory {
    /// A capacity of zero keeps nothing.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: VecDeque::with_capacity(capacity.min(64)),
        }
    }

    /// Append an entry, evicting the oldest ones once over capacity.
    pub fn add(&mut self, role: impl Into<String>, content: impl Into<String>) {
        self.entries.push_back(MemoryEntry {
            role: role.into(),
            content: content.into(),
        });
        while self.entries.len() > self.capacity {
            self.entries.pop_front();
        }
    }

    /// All entries as `role: content` lines in insertion order; empty when empty.
    pub fn get_context(&self) -> String {
        self.entries
            .iter()
            .map(|e| format!("{}: {}", e.role, e.content))
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn entries(&self) -> impl Iterator<Item = &MemoryEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
