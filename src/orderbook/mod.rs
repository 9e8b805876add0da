//! Order book statistics module
//!
//! Turns a stream of depth snapshots into stochastic flow metrics and
//! categorical market signals, one independent history per symbol.

mod history;
mod interpret;
mod manager;
mod metrics;
mod snapshot;
mod tracker;

pub use history::{History, DEFAULT_HISTORY_CAPACITY};
pub use interpret::{Direction, Interpretation, LiquidityStability, Totals};
pub use manager::{TrackerManager, TrackerStatus};
pub use metrics::{StochasticMetrics, TIME_EPSILON, VOLATILITY_EPSILON, VOLATILITY_WINDOW};
pub use snapshot::Snapshot;
pub use tracker::SymbolTracker;

use serde::{Deserialize, Serialize};

/// One processed observation, handed to sinks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tick {
    pub symbol: String,
    pub snapshot: Snapshot,
    pub metrics: Option<StochasticMetrics>,
    pub interpretation: Option<Interpretation>,
}

impl Tick {
    pub fn totals(&self) -> Totals {
        Totals::from(&self.snapshot)
    }
}
