//! Error types for the stochastic metrics engine

use thiserror::Error;

/// Stochastic engine errors
#[derive(Error, Debug)]
pub enum StochasticError {
    #[error("Invalid observation: {0}")]
    InvalidObservation(String),

    #[error("Feed error: {0}")]
    Feed(String),

    #[error("WebSocket error: {0}")]
    WebSocket(String),

    #[error("Sink error: {0}")]
    Sink(String),

    #[error("IPC error: {0}")]
    Ipc(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Symbol is not tracked: {0}")]
    UnknownSymbol(String),

    #[error("Telemetry error: {0}")]
    Telemetry(String),
}

impl From<tokio_tungstenite::tungstenite::Error> for StochasticError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        StochasticError::WebSocket(err.to_string())
    }
}

impl From<serde_json::Error> for StochasticError {
    fn from(err: serde_json::Error) -> Self {
        StochasticError::InvalidObservation(err.to_string())
    }
}

impl From<reqwest::Error> for StochasticError {
    fn from(err: reqwest::Error) -> Self {
        StochasticError::Feed(err.to_string())
    }
}

impl From<std::io::Error> for StochasticError {
    fn from(err: std::io::Error) -> Self {
        StochasticError::Sink(err.to_string())
    }
}

impl From<rmp_serde::encode::Error> for StochasticError {
    fn from(err: rmp_serde::encode::Error) -> Self {
        StochasticError::Serialization(err.to_string())
    }
}

impl From<prometheus::Error> for StochasticError {
    fn from(err: prometheus::Error) -> Self {
        StochasticError::Telemetry(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, StochasticError>;
