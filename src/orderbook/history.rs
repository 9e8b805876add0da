//! Bounded rolling history of snapshots for one symbol

use std::collections::VecDeque;

use super::Snapshot;
use crate::error::{Result, StochasticError};
use crate::parser::Observation;

/// Default number of snapshots retained per symbol
pub const DEFAULT_HISTORY_CAPACITY: usize = 100;

/// FIFO ring of snapshots ordered by non-decreasing timestamp
#[derive(Debug, Clone)]
pub struct History {
    snapshots: VecDeque<Snapshot>,
    capacity: usize,
}

impl Default for History {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAPACITY)
    }
}

impl History {
    /// Create an empty history; capacity is clamped to at least one entry
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            snapshots: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Validate an observation, turn it into a snapshot and append it
    ///
    /// Rejected observations leave the history untouched.
    pub fn ingest(&mut self, observation: Observation) -> Result<&Snapshot> {
        if let Some(latest) = self.latest() {
            if observation.timestamp < latest.timestamp() {
                return Err(StochasticError::InvalidObservation(format!(
                    "timestamp {} precedes latest snapshot at {}",
                    observation.timestamp,
                    latest.timestamp()
                )));
            }
        }

        let snapshot = Snapshot::from_observation(observation)?;
        self.push(snapshot);
        // Just pushed, so back() is populated
        Ok(&self.snapshots[self.snapshots.len() - 1])
    }

    fn push(&mut self, snapshot: Snapshot) {
        while self.snapshots.len() >= self.capacity {
            self.snapshots.pop_front();
        }
        self.snapshots.push_back(snapshot);
    }

    pub fn latest(&self) -> Option<&Snapshot> {
        self.snapshots.back()
    }

    /// The `n` most recent snapshots, oldest first
    pub fn recent(&self, n: usize) -> impl Iterator<Item = &Snapshot> {
        let skip = self.snapshots.len().saturating_sub(n);
        self.snapshots.iter().skip(skip)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Snapshot> {
        self.snapshots.iter()
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
