//! WebSocket depth stream
//!
//! `StreamClient` owns a single connection; `StreamFeed` wraps it with
//! reconnection and turns frames into feed events.

use futures_util::{SinkExt, StreamExt};
use std::time::{Duration, Instant};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::time::{sleep, timeout};
use tokio_tungstenite::{
    connect_async, tungstenite::protocol::Message, MaybeTlsStream, WebSocketStream,
};
use tracing::{debug, error, info, warn};

use super::FeedEvent;
use crate::config::Config;
use crate::error::{Result, StochasticError};
use crate::parser::ParsedMessage;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Maximum backoff delay in milliseconds (60 seconds)
const MAX_BACKOFF_MS: u64 = 60_000;
/// Cooldown period after which reconnect attempts are reset (5 minutes)
const RECONNECT_COOLDOWN_SECS: u64 = 300;

/// WebSocket client for a single connection
pub struct StreamClient {
    stream: Option<WsStream>,
    endpoint: String,
    symbols: Vec<String>,
    access_token: Option<String>,
}

impl StreamClient {
    pub fn new(endpoint: &str, symbols: Vec<String>, access_token: Option<String>) -> Self {
        Self {
            stream: None,
            endpoint: endpoint.to_string(),
            symbols,
            access_token,
        }
    }

    /// Connect and subscribe to depth for all symbols
    pub async fn connect(&mut self) -> Result<()> {
        info!(url = %self.endpoint, "Connecting to depth stream");

        let (mut ws_stream, response) = connect_async(self.endpoint.as_str()).await.map_err(|e| {
            StochasticError::WebSocket(format!("Failed to connect: {}", e))
        })?;

        info!(status = ?response.status(), "WebSocket connected");

        let subscribe = subscribe_message(&self.symbols, self.access_token.as_deref());
        ws_stream.send(Message::Text(subscribe)).await?;
        debug!(symbols = ?self.symbols, "Subscription sent");

        self.stream = Some(ws_stream);
        Ok(())
    }

    /// Receive the next data frame; `None` for control frames
    pub async fn recv(&mut self) -> Result<Option<String>> {
        let stream = self
            .stream
            .as_mut()
            .ok_or_else(|| StochasticError::WebSocket("Not connected".to_string()))?;

        match stream.next().await {
            Some(Ok(Message::Text(text))) => Ok(Some(text)),
            Some(Ok(Message::Binary(data))) => Ok(Some(String::from_utf8_lossy(&data).to_string())),
            Some(Ok(Message::Ping(data))) => {
                debug!("Received ping, sending pong");
                let _ = stream.send(Message::Pong(data)).await;
                Ok(None)
            }
            Some(Ok(Message::Pong(_))) | Some(Ok(Message::Frame(_))) => Ok(None),
            Some(Ok(Message::Close(frame))) => {
                warn!(frame = ?frame, "Received close frame");
                self.stream = None;
                Err(StochasticError::WebSocket("Connection closed".to_string()))
            }
            Some(Err(e)) => {
                error!(error = %e, "WebSocket error");
                self.stream = None;
                Err(StochasticError::WebSocket(e.to_string()))
            }
            None => {
                warn!("WebSocket stream ended");
                self.stream = None;
                Err(StochasticError::WebSocket("Stream ended".to_string()))
            }
        }
    }

    /// Send a ping to keep connection alive
    pub async fn ping(&mut self) -> Result<()> {
        if let Some(stream) = self.stream.as_mut() {
            stream.send(Message::Ping(vec![])).await?;
        }
        Ok(())
    }

    pub fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    pub async fn close(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            let _ = stream.close(None).await;
        }
    }
}

fn subscribe_message(symbols: &[String], access_token: Option<&str>) -> String {
    serde_json::json!({
        "type": "subscribe",
        "mode": "depth",
        "symbols": symbols,
        "token": access_token,
    })
    .to_string()
}

/// Reconnect delay for the given attempt: base * 2^min(attempt, 6), capped
fn reconnect_delay(base_ms: u64, attempt: u32) -> Duration {
    let delay = base_ms.saturating_mul(2u64.pow(attempt.min(6)));
    Duration::from_millis(delay.min(MAX_BACKOFF_MS))
}

/// Map one text frame to the event it produces, if any
fn frame_event(text: &str) -> Option<FeedEvent> {
    match ParsedMessage::parse(text) {
        Ok(ParsedMessage::Depth(depth)) => Some(FeedEvent::Depth {
            symbol: depth.symbol,
            observation: depth.observation,
        }),
        Ok(ParsedMessage::Error(msg)) => Some(FeedEvent::Error(msg)),
        Ok(ParsedMessage::Unknown(msg)) => {
            tracing::trace!(msg = %msg, "Unknown message type");
            None
        }
        Err(e) => {
            warn!(error = %e, "Failed to parse stream frame");
            Some(FeedEvent::Error(e.to_string()))
        }
    }
}

/// Depth stream feed with automatic reconnection
pub struct StreamFeed {
    client: StreamClient,
    reconnect_delay_ms: u64,
    reconnect_attempts: u32,
    last_successful_connection: Option<Instant>,
}

/// Outcome of one connection's message loop
enum SessionEnd {
    PipelineClosed,
}

impl StreamFeed {
    pub fn new(config: &Config) -> Self {
        Self {
            client: StreamClient::new(
                &config.ws_endpoint,
                config.symbols.clone(),
                config.access_token.clone(),
            ),
            reconnect_delay_ms: config.reconnect_delay_ms,
            reconnect_attempts: 0,
            last_successful_connection: None,
        }
    }

    /// Stream until the receiving side of `tx` is dropped
    pub async fn run(mut self, tx: mpsc::Sender<FeedEvent>) -> Result<()> {
        info!("Starting depth stream with infinite retry");

        loop {
            if let Some(last_success) = self.last_successful_connection {
                if last_success.elapsed() > Duration::from_secs(RECONNECT_COOLDOWN_SECS)
                    && self.reconnect_attempts > 0
                {
                    info!(
                        previous_attempts = self.reconnect_attempts,
                        "Resetting reconnect counter after cooldown period"
                    );
                    self.reconnect_attempts = 0;
                }
            }

            match self.connect_and_process(&tx).await {
                Ok(SessionEnd::PipelineClosed) => {
                    info!("Pipeline closed, stopping depth stream");
                    self.client.close().await;
                    return Ok(());
                }
                Err(e) => {
                    error!(error = %e, "Depth stream error");
                    if tx.send(FeedEvent::Disconnected(e.to_string())).await.is_err() {
                        return Ok(());
                    }

                    self.reconnect_attempts += 1;
                    let delay = reconnect_delay(self.reconnect_delay_ms, self.reconnect_attempts);
                    warn!(
                        attempt = self.reconnect_attempts,
                        delay_secs = delay.as_secs(),
                        "Reconnecting after error..."
                    );
                    sleep(delay).await;
                }
            }
        }
    }

    async fn connect_and_process(&mut self, tx: &mpsc::Sender<FeedEvent>) -> Result<SessionEnd> {
        self.client.connect().await?;

        self.last_successful_connection = Some(Instant::now());
        self.reconnect_attempts = 0;

        if tx.send(FeedEvent::Connected).await.is_err() {
            return Ok(SessionEnd::PipelineClosed);
        }

        let mut last_message = Instant::now();
        let keepalive_timeout = Duration::from_secs(30);
        let recv_timeout = Duration::from_secs(45);

        loop {
            let event = match timeout(recv_timeout, self.client.recv()).await {
                Ok(Ok(Some(text))) => {
                    last_message = Instant::now();
                    frame_event(&text)
                }
                Ok(Ok(None)) => {
                    if last_message.elapsed() > keepalive_timeout {
                        if let Err(e) = self.client.ping().await {
                            warn!(error = %e, "Failed to send keepalive ping");
                        }
                    }
                    None
                }
                Ok(Err(e)) => return Err(e),
                Err(_) => {
                    warn!(
                        last_message_secs = last_message.elapsed().as_secs(),
                        "No message received within timeout, sending keepalive"
                    );
                    if let Err(e) = self.client.ping().await {
                        warn!(error = %e, "Failed to send keepalive ping, reconnecting");
                        return Err(StochasticError::WebSocket("Connection timeout".to_string()));
                    }
                    None
                }
            };

            if let Some(event) = event {
                if tx.send(event).await.is_err() {
                    return Ok(SessionEnd::PipelineClosed);
                }
            }
        }
    }
}
