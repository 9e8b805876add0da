//! REST depth poller
//!
//! Polls the broker depth endpoint for every symbol once per cycle and
//! adapts the cycle interval to the failure rate.

use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use super::{FeedEvent, PollBackoff};
use crate::config::Config;
use crate::error::{Result, StochasticError};
use crate::parser::{DepthResponse, Observation};

/// Polling depth feed
pub struct RestPoller {
    client: reqwest::Client,
    endpoint: String,
    symbols: Vec<String>,
    access_token: Option<String>,
    backoff: PollBackoff,
    jitter: Duration,
}

impl RestPoller {
    pub fn new(config: &Config) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: config.rest_endpoint.clone(),
            symbols: config.symbols.clone(),
            access_token: config.access_token.clone(),
            backoff: PollBackoff::new(
                Duration::from_millis(config.poll_interval_ms),
                Duration::from_millis(config.poll_min_interval_ms),
                Duration::from_millis(config.poll_max_interval_ms),
                config.poll_error_threshold,
            ),
            jitter: Duration::from_millis(config.poll_jitter_ms),
        }
    }

    /// Poll until the receiving side of `tx` is dropped
    pub async fn run(mut self, tx: mpsc::Sender<FeedEvent>) -> Result<()> {
        info!(
            endpoint = %self.endpoint,
            symbols = ?self.symbols,
            interval_ms = self.backoff.interval().as_millis() as u64,
            "Starting depth poller"
        );

        if tx.send(FeedEvent::Connected).await.is_err() {
            return Ok(());
        }

        loop {
            let mut cycle_failed = false;

            for symbol in &self.symbols {
                let event = match self.fetch(symbol).await {
                    Ok(observation) => FeedEvent::Depth {
                        symbol: symbol.clone(),
                        observation,
                    },
                    Err(e) => {
                        cycle_failed = true;
                        warn!(symbol = %symbol, error = %e, "Depth poll failed");
                        FeedEvent::Error(format!("{}: {}", symbol, e))
                    }
                };

                if tx.send(event).await.is_err() {
                    info!("Pipeline closed, stopping depth poller");
                    return Ok(());
                }
            }

            if cycle_failed {
                self.backoff.on_failure();
            } else {
                self.backoff.on_success();
            }

            let delay = self.backoff.jittered(self.jitter, &mut rand::rng());
            debug!(
                delay_ms = delay.as_millis() as u64,
                consecutive_errors = self.backoff.consecutive_errors(),
                "Sleeping until next poll"
            );
            sleep(delay).await;
        }
    }

    /// Fetch one depth observation for `symbol`
    async fn fetch(&self, symbol: &str) -> Result<Observation> {
        let mut request = self
            .client
            .get(&self.endpoint)
            .query(&[("symbol", symbol), ("ohlcv_flag", "1")]);

        if let Some(token) = &self.access_token {
            request = request.header(reqwest::header::AUTHORIZATION, token.as_str());
        }

        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(StochasticError::Feed(format!(
                "Depth endpoint returned {}: {}",
                status, body
            )));
        }

        DepthResponse::parse(&body)?.into_observation(symbol, chrono::Utc::now().timestamp())
    }
}
