//! Tracker manager
//!
//! Keeps one independent tracking context per symbol.

use serde::Serialize;
use std::collections::HashMap;

use super::{Interpretation, SymbolTracker, Tick, DEFAULT_HISTORY_CAPACITY};
use crate::error::{Result, StochasticError};
use crate::parser::Observation;

/// Point-in-time status of one tracked symbol
#[derive(Debug, Clone, Serialize)]
pub struct TrackerStatus {
    pub symbol: String,
    pub history_len: usize,
    pub ticks: u64,
    pub last_timestamp: Option<i64>,
    pub interpretation: Option<Interpretation>,
}

/// Manages tracking contexts for multiple symbols
#[derive(Debug)]
pub struct TrackerManager {
    trackers: HashMap<String, SymbolTracker>,
    history_capacity: usize,
}

impl Default for TrackerManager {
    fn default() -> Self {
        Self::new()
    }
}

impl TrackerManager {
    /// Create a new manager with the default history capacity
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_HISTORY_CAPACITY)
    }

    /// Create with custom per-symbol history capacity
    pub fn with_capacity(history_capacity: usize) -> Self {
        Self {
            trackers: HashMap::new(),
            history_capacity,
        }
    }

    /// Start tracking a symbol; existing state is kept
    pub fn track(&mut self, symbol: &str) {
        if !self.trackers.contains_key(symbol) {
            self.trackers.insert(
                symbol.to_string(),
                SymbolTracker::new(symbol, self.history_capacity),
            );
        }
    }

    /// Stop tracking a symbol, discarding its history
    pub fn untrack(&mut self, symbol: &str) -> bool {
        self.trackers.remove(symbol).is_some()
    }

    /// Run one observation through the tracker for `symbol`
    pub fn process(&mut self, symbol: &str, observation: Observation) -> Result<Tick> {
        self.trackers
            .get_mut(symbol)
            .ok_or_else(|| StochasticError::UnknownSymbol(symbol.to_string()))?
            .process(observation)
    }

    pub fn tracker(&self, symbol: &str) -> Option<&SymbolTracker> {
        self.trackers.get(symbol)
    }

    /// Status of a specific symbol
    pub fn status(&self, symbol: &str) -> Option<TrackerStatus> {
        self.trackers.get(symbol).map(status_of)
    }

    /// Status of every tracked symbol, sorted by symbol
    pub fn all_status(&self) -> Vec<TrackerStatus> {
        let mut all: Vec<TrackerStatus> = self.trackers.values().map(status_of).collect();
        all.sort_by(|a, b| a.symbol.cmp(&b.symbol));
        all
    }

    /// Get list of symbols being tracked
    pub fn symbols(&self) -> Vec<String> {
        self.trackers.keys().cloned().collect()
    }

    pub fn has_symbol(&self, symbol: &str) -> bool {
        self.trackers.contains_key(symbol)
    }
}

fn status_of(tracker: &SymbolTracker) -> TrackerStatus {
    TrackerStatus {
        symbol: tracker.symbol().to_string(),
        history_len: tracker.history().len(),
        ticks: tracker.ticks(),
        last_timestamp: tracker.history().latest().map(|s| s.timestamp()),
        interpretation: tracker.last_interpretation().copied(),
    }
}
