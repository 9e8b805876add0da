//! Depth feed module
//!
//! Feeds push `FeedEvent` messages into a channel consumed by the pipeline.
//! Dropping the receiver is the cancellation signal for every feed.

mod backoff;
mod poller;
mod stream;

pub use backoff::PollBackoff;
pub use poller::RestPoller;
pub use stream::{StreamClient, StreamFeed};

use crate::parser::Observation;

/// Event emitted by a feed
#[derive(Debug, Clone)]
pub enum FeedEvent {
    /// Feed connected (stream) or started polling
    Connected,
    /// One depth observation for a symbol
    Depth {
        symbol: String,
        observation: Observation,
    },
    /// Recoverable feed failure
    Error(String),
    /// Feed lost its connection
    Disconnected(String),
}
