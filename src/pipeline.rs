//! Processing pipeline
//!
//! Drains feed events, runs each depth observation through its symbol's
//! tracker and fans the resulting tick out to every sink.

use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::feed::FeedEvent;
use crate::orderbook::Tick;
use crate::sink::Sink;
use crate::AppState;

pub struct Pipeline {
    state: Arc<AppState>,
    sinks: Vec<Box<dyn Sink>>,
}

impl Pipeline {
    pub fn new(state: Arc<AppState>, sinks: Vec<Box<dyn Sink>>) -> Self {
        Self { state, sinks }
    }

    /// Process events until every sender is dropped
    pub async fn run(&self, mut rx: mpsc::Receiver<FeedEvent>) {
        let sinks: Vec<&str> = self.sinks.iter().map(|s| s.name()).collect();
        info!(sinks = ?sinks, "Pipeline started");

        while let Some(event) = rx.recv().await {
            self.handle(event).await;
        }

        info!("Feed channel closed, pipeline stopping");
    }

    /// Handle one feed event, returning the tick it produced if any
    pub async fn handle(&self, event: FeedEvent) -> Option<Tick> {
        match event {
            FeedEvent::Connected => {
                info!("Feed connected");
                None
            }
            FeedEvent::Depth { symbol, observation } => {
                // Lock only around the synchronous core step
                let result = {
                    let mut trackers = self.state.trackers.write().await;
                    trackers.process(&symbol, observation)
                };

                match result {
                    Ok(tick) => {
                        self.state
                            .telemetry
                            .ticks_processed
                            .with_label_values(&[symbol.as_str()])
                            .inc();
                        self.publish(&tick).await;
                        Some(tick)
                    }
                    Err(e) => {
                        warn!(symbol = %symbol, error = %e, "Failed to process observation");
                        self.state
                            .telemetry
                            .invalid_observations
                            .with_label_values(&[symbol.as_str()])
                            .inc();
                        None
                    }
                }
            }
            FeedEvent::Error(msg) => {
                warn!(error = %msg, "Feed error");
                self.state.telemetry.feed_errors.inc();
                None
            }
            FeedEvent::Disconnected(reason) => {
                warn!(reason = %reason, "Feed disconnected");
                self.state.telemetry.feed_errors.inc();
                None
            }
        }
    }

    async fn publish(&self, tick: &Tick) {
        for sink in &self.sinks {
            if let Err(e) = sink.publish(tick).await {
                warn!(sink = sink.name(), symbol = %tick.symbol, error = %e, "Sink publish failed");
                self.state
                    .telemetry
                    .sink_failures
                    .with_label_values(&[sink.name()])
                    .inc();
            }
        }
    }
}
