//! Prometheus counters for the processing pipeline

use prometheus::{Encoder, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};

use crate::error::{Result, StochasticError};

/// Pipeline counters, registered in a process-local registry
pub struct Telemetry {
    registry: Registry,
    pub ticks_processed: IntCounterVec,
    pub invalid_observations: IntCounterVec,
    pub sink_failures: IntCounterVec,
    pub feed_errors: IntCounter,
}

impl Telemetry {
    pub fn new() -> Result<Self> {
        let registry = Registry::new_custom(Some("stochastics".to_string()), None)?;

        let ticks_processed = IntCounterVec::new(
            Opts::new("ticks_processed_total", "Observations ingested per symbol"),
            &["symbol"],
        )?;
        let invalid_observations = IntCounterVec::new(
            Opts::new("invalid_observations_total", "Observations rejected per symbol"),
            &["symbol"],
        )?;
        let sink_failures = IntCounterVec::new(
            Opts::new("sink_failures_total", "Failed publishes per sink"),
            &["sink"],
        )?;
        let feed_errors = IntCounter::new("feed_errors_total", "Feed errors and disconnects")?;

        registry.register(Box::new(ticks_processed.clone()))?;
        registry.register(Box::new(invalid_observations.clone()))?;
        registry.register(Box::new(sink_failures.clone()))?;
        registry.register(Box::new(feed_errors.clone()))?;

        Ok(Self {
            registry,
            ticks_processed,
            invalid_observations,
            sink_failures,
            feed_errors,
        })
    }

    /// Render all counters in the Prometheus text format
    pub fn encode(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| StochasticError::Telemetry(e.to_string()))
    }
}

impl std::fmt::Debug for Telemetry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Telemetry")
            .field("feed_errors", &self.feed_errors.get())
            .finish_non_exhaustive()
    }
}
