//! Configuration module for the stochastic metrics engine

use serde::Deserialize;
use std::env;
use std::str::FromStr;

use crate::error::{Result, StochasticError};
use crate::parser::normalize_symbol;

/// How depth observations are sourced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedMode {
    /// Poll a REST depth endpoint on an adaptive interval
    Poll,
    /// Subscribe to a WebSocket depth stream
    Stream,
}

impl FromStr for FeedMode {
    type Err = StochasticError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "poll" | "rest" => Ok(FeedMode::Poll),
            "stream" | "ws" | "websocket" => Ok(FeedMode::Stream),
            other => Err(StochasticError::Config(format!("Unknown feed mode: {}", other))),
        }
    }
}

/// Application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Symbols to track (e.g., ["NSE:NIFTY25JUNFUT"])
    pub symbols: Vec<String>,

    pub feed_mode: FeedMode,

    /// REST depth endpoint used in poll mode
    pub rest_endpoint: String,

    /// WebSocket endpoint used in stream mode
    pub ws_endpoint: String,

    /// Pre-issued broker access token, sent verbatim as the Authorization header
    pub access_token: Option<String>,

    /// Rolling history capacity per symbol
    pub history_capacity: usize,

    /// Poll interval settings
    pub poll_interval_ms: u64,
    pub poll_min_interval_ms: u64,
    pub poll_max_interval_ms: u64,
    pub poll_error_threshold: u32,
    pub poll_jitter_ms: u64,

    /// Base delay for WebSocket reconnects
    pub reconnect_delay_ms: u64,

    /// Directory for per-symbol CSV files (CSV sink disabled when unset)
    pub csv_dir: Option<String>,

    /// IPC socket path for publishing ticks (IPC sink disabled when unset)
    pub ipc_socket_path: Option<String>,

    pub health_port: u16,

    /// Emit JSON formatted logs
    pub log_json: bool,

    /// Feed -> pipeline channel capacity
    pub channel_capacity: usize,
}

impl Config {
    /// Load configuration from environment variables
    pub fn load() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let defaults = Self::default();

        let symbols: Vec<String> = env::var("SYMBOLS")
            .unwrap_or_else(|_| defaults.symbols.join(","))
            .split(',')
            .map(normalize_symbol)
            .filter(|s| !s.is_empty())
            .collect();

        let feed_mode = match env::var("FEED_MODE") {
            Ok(raw) => raw.parse::<FeedMode>()?,
            Err(_) => defaults.feed_mode,
        };

        let config = Self {
            symbols,
            feed_mode,
            rest_endpoint: env::var("REST_ENDPOINT").unwrap_or(defaults.rest_endpoint),
            ws_endpoint: env::var("WS_ENDPOINT").unwrap_or(defaults.ws_endpoint),
            access_token: env::var("ACCESS_TOKEN").ok().filter(|t| !t.is_empty()),
            history_capacity: parse_var("HISTORY_CAPACITY", defaults.history_capacity),
            poll_interval_ms: parse_var("POLL_INTERVAL_MS", defaults.poll_interval_ms),
            poll_min_interval_ms: parse_var("POLL_MIN_INTERVAL_MS", defaults.poll_min_interval_ms),
            poll_max_interval_ms: parse_var("POLL_MAX_INTERVAL_MS", defaults.poll_max_interval_ms),
            poll_error_threshold: parse_var("POLL_ERROR_THRESHOLD", defaults.poll_error_threshold),
            poll_jitter_ms: parse_var("POLL_JITTER_MS", defaults.poll_jitter_ms),
            reconnect_delay_ms: parse_var("RECONNECT_DELAY_MS", defaults.reconnect_delay_ms),
            csv_dir: env::var("CSV_DIR").ok().filter(|d| !d.is_empty()),
            ipc_socket_path: env::var("IPC_SOCKET_PATH").ok().filter(|p| !p.is_empty()),
            health_port: parse_var("HEALTH_PORT", defaults.health_port),
            log_json: parse_var("LOG_JSON", defaults.log_json),
            channel_capacity: parse_var("CHANNEL_CAPACITY", defaults.channel_capacity),
        };

        config.validate()?;
        Ok(config)
    }

    /// Reject settings the engine cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.symbols.is_empty() {
            return Err(StochasticError::Config("No symbols configured".to_string()));
        }
        if self.history_capacity < 2 {
            return Err(StochasticError::Config(format!(
                "History capacity must be at least 2, got {}",
                self.history_capacity
            )));
        }
        if self.poll_min_interval_ms > self.poll_max_interval_ms {
            return Err(StochasticError::Config(format!(
                "Poll min interval {}ms exceeds max interval {}ms",
                self.poll_min_interval_ms, self.poll_max_interval_ms
            )));
        }
        if !(self.poll_min_interval_ms..=self.poll_max_interval_ms).contains(&self.poll_interval_ms)
        {
            return Err(StochasticError::Config(format!(
                "Poll interval {}ms outside [{}, {}]ms",
                self.poll_interval_ms, self.poll_min_interval_ms, self.poll_max_interval_ms
            )));
        }
        if self.channel_capacity == 0 {
            return Err(StochasticError::Config("Channel capacity must be non-zero".to_string()));
        }
        Ok(())
    }
}

fn parse_var<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|raw| raw.trim().parse().ok())
        .unwrap_or(default)
}

impl Default for Config {
    fn default() -> Self {
        Self {
            symbols: vec!["NSE:NIFTY25JUNFUT".to_string()],
            feed_mode: FeedMode::Poll,
            rest_endpoint: "https://api-t1.fyers.in/data/depth".to_string(),
            ws_endpoint: "ws://127.0.0.1:8765/depth".to_string(),
            access_token: None,
            history_capacity: 100,
            poll_interval_ms: 2000,
            poll_min_interval_ms: 1000,
            poll_max_interval_ms: 30_000,
            poll_error_threshold: 5,
            poll_jitter_ms: 250,
            reconnect_delay_ms: 1000,
            csv_dir: None,
            ipc_socket_path: None,
            health_port: 9090,
            log_json: true,
            channel_capacity: 1024,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_rejects_tiny_history() {
        let config = Config {
            history_capacity: 1,
            ..Config::default()
        };
        assert!(matches!(config.validate(), Err(StochasticError::Config(_))));
    }

    #[test]
    fn test_rejects_inverted_poll_bounds() {
        let config = Config {
            poll_min_interval_ms: 5000,
            poll_max_interval_ms: 1000,
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_empty_symbols() {
        let config = Config {
            symbols: vec![],
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_feed_mode_parse() {
        assert_eq!("poll".parse::<FeedMode>().unwrap(), FeedMode::Poll);
        assert_eq!("WebSocket".parse::<FeedMode>().unwrap(), FeedMode::Stream);
        assert!("carrier-pigeon".parse::<FeedMode>().is_err());
    }
}
