//! ORPflow - Stochastic Order Book Metrics
//!
//! This crate turns a stream of order book depth observations into drift,
//! volatility and flow imbalance signals per symbol, and classifies market
//! direction and liquidity stability. Feeds, sinks and the health server are
//! thin collaborators around the pure statistics core in [`orderbook`].

use std::sync::Arc;
use tokio::sync::RwLock;

pub mod config;
pub mod error;
pub mod feed;
pub mod orderbook;
pub mod parser;
pub mod pipeline;
pub mod server;
pub mod sink;
pub mod telemetry;

pub use config::{Config, FeedMode};
pub use error::{Result, StochasticError};
pub use feed::{FeedEvent, RestPoller, StreamFeed};
pub use orderbook::{
    Direction, History, Interpretation, LiquidityStability, Snapshot, StochasticMetrics,
    SymbolTracker, Tick, TrackerManager, Totals,
};
pub use parser::{MarketStats, Observation};
pub use pipeline::Pipeline;
pub use sink::{CsvSink, IpcPublisher, LogSink, Sink};
pub use telemetry::Telemetry;

/// Application state shared across components
pub struct AppState {
    pub trackers: Arc<RwLock<TrackerManager>>,
    pub telemetry: Arc<Telemetry>,
    pub config: Arc<Config>,
}
