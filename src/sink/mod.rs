//! Sink adapters
//!
//! A sink consumes processed ticks and performs the I/O the core never does.

mod csv;
mod ipc;
mod log;

pub use self::csv::{CsvSink, CSV_HEADER};
pub use self::ipc::IpcPublisher;
pub use self::log::LogSink;

use async_trait::async_trait;

use crate::error::Result;
use crate::orderbook::Tick;

/// Consumer of processed ticks
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Sink: Send + Sync {
    /// Short name used in logs and telemetry
    fn name(&self) -> &'static str;

    async fn publish(&self, tick: &Tick) -> Result<()>;
}
