//! IPC sink
//!
//! Publishes ticks as length-prefixed MessagePack frames over a Unix socket.

use async_trait::async_trait;
use std::path::Path;
use tokio::io::AsyncWriteExt;
use tokio::net::UnixStream;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::Sink;
use crate::error::{Result, StochasticError};
use crate::orderbook::Tick;

/// Publisher for sending ticks via Unix socket
pub struct IpcPublisher {
    socket_path: String,
    stream: Mutex<Option<UnixStream>>,
}

impl IpcPublisher {
    /// Create a new publisher
    pub async fn new(socket_path: &str) -> Self {
        let publisher = Self {
            socket_path: socket_path.to_string(),
            stream: Mutex::new(None),
        };

        // Consumer may not be listening yet
        if let Err(e) = publisher.connect().await {
            warn!(error = %e, "Initial IPC connection failed, will retry on publish");
        }

        publisher
    }

    async fn connect(&self) -> Result<()> {
        let path = Path::new(&self.socket_path);

        if !path.exists() {
            return Err(StochasticError::Ipc(format!(
                "Socket path does not exist: {}",
                self.socket_path
            )));
        }

        let stream = UnixStream::connect(path).await.map_err(|e| {
            StochasticError::Ipc(format!("Failed to connect to {}: {}", self.socket_path, e))
        })?;

        *self.stream.lock().await = Some(stream);

        info!(path = %self.socket_path, "Connected to IPC socket");
        Ok(())
    }
}

/// MessagePack body behind a 4-byte big-endian length prefix
pub(crate) fn encode_frame(tick: &Tick) -> Result<Vec<u8>> {
    let data = rmp_serde::to_vec_named(tick)?;

    let len = (data.len() as u32).to_be_bytes();
    let mut message = Vec::with_capacity(4 + data.len());
    message.extend_from_slice(&len);
    message.extend_from_slice(&data);
    Ok(message)
}

#[async_trait]
impl Sink for IpcPublisher {
    fn name(&self) -> &'static str {
        "ipc"
    }

    async fn publish(&self, tick: &Tick) -> Result<()> {
        let message = encode_frame(tick)?;

        let mut guard = self.stream.lock().await;

        if guard.is_none() {
            drop(guard);
            self.connect().await?;
            guard = self.stream.lock().await;
        }

        let stream = guard
            .as_mut()
            .ok_or_else(|| StochasticError::Ipc("IPC stream closed during reconnect".to_string()))?;

        let written = stream.write_all(&message).await;
        if let Err(e) = written {
            // Reconnect on the next tick
            *guard = None;
            return Err(StochasticError::Ipc(format!(
                "Failed to write to {}: {}",
                self.socket_path, e
            )));
        }

        debug!(
            symbol = %tick.symbol,
            timestamp = tick.snapshot.timestamp(),
            "Published tick"
        );
        Ok(())
    }
}
