//! Per-symbol tracking context
//!
//! Owns the rolling history for one symbol and runs the
//! ingest -> compute -> interpret cycle for each observation.

use super::{History, Interpretation, StochasticMetrics, Tick, Totals};
use crate::error::Result;
use crate::parser::Observation;

/// Tracking state for a single symbol
#[derive(Debug)]
pub struct SymbolTracker {
    symbol: String,
    history: History,
    last_metrics: Option<StochasticMetrics>,
    last_interpretation: Option<Interpretation>,
    ticks: u64,
}

impl SymbolTracker {
    pub fn new(symbol: &str, capacity: usize) -> Self {
        Self {
            symbol: symbol.to_string(),
            history: History::new(capacity),
            last_metrics: None,
            last_interpretation: None,
            ticks: 0,
        }
    }

    /// Ingest one observation and derive its metrics and interpretation
    pub fn process(&mut self, observation: Observation) -> Result<Tick> {
        let snapshot = self.history.ingest(observation)?.clone();

        let metrics = StochasticMetrics::compute(&self.history);
        let interpretation =
            metrics.map(|m| Interpretation::interpret(&m, Totals::from(&snapshot)));

        self.last_metrics = metrics;
        self.last_interpretation = interpretation;
        self.ticks += 1;

        Ok(Tick {
            symbol: self.symbol.clone(),
            snapshot,
            metrics,
            interpretation,
        })
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn last_metrics(&self) -> Option<&StochasticMetrics> {
        self.last_metrics.as_ref()
    }

    pub fn last_interpretation(&self) -> Option<&Interpretation> {
        self.last_interpretation.as_ref()
    }

    /// Number of observations accepted since tracking started
    pub fn ticks(&self) -> u64 {
        self.ticks
    }
}
