//! ORPflow - Stochastic Order Book Metrics
//!
//! Streams or polls order book depth for the configured symbols, computes
//! stochastic flow metrics per symbol and publishes each tick to the enabled
//! sinks.

use std::sync::Arc;
use tokio::sync::{mpsc, RwLock};
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use stochastics::config::{Config, FeedMode};
use stochastics::feed::{RestPoller, StreamFeed};
use stochastics::orderbook::TrackerManager;
use stochastics::pipeline::Pipeline;
use stochastics::server::start_health_server;
use stochastics::sink::{CsvSink, IpcPublisher, LogSink, Sink};
use stochastics::telemetry::Telemetry;
use stochastics::AppState;

fn init_tracing(json: bool) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    if json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().pretty())
            .init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Arc::new(Config::load()?);
    init_tracing(config.log_json);

    info!("Starting stochastic order book analysis");
    info!(
        symbols = ?config.symbols,
        feed_mode = ?config.feed_mode,
        history_capacity = config.history_capacity,
        "Configuration loaded"
    );

    let mut trackers = TrackerManager::with_capacity(config.history_capacity);
    for symbol in &config.symbols {
        trackers.track(symbol);
    }

    let state = Arc::new(AppState {
        trackers: Arc::new(RwLock::new(trackers)),
        telemetry: Arc::new(Telemetry::new()?),
        config: config.clone(),
    });

    let mut sinks: Vec<Box<dyn Sink>> = vec![Box::new(LogSink)];
    if let Some(dir) = &config.csv_dir {
        let csv = CsvSink::new(dir, chrono::Utc::now())?;
        info!(dir = %dir, "CSV output enabled");
        sinks.push(Box::new(csv));
    }
    if let Some(path) = &config.ipc_socket_path {
        sinks.push(Box::new(IpcPublisher::new(path).await));
    }

    // Start health check server
    let health_state = state.clone();
    tokio::spawn(async move {
        if let Err(e) = start_health_server(health_state).await {
            warn!(error = %e, "Health server error");
        }
    });

    let (tx, rx) = mpsc::channel(config.channel_capacity);

    let feed = match config.feed_mode {
        FeedMode::Poll => tokio::spawn(RestPoller::new(&config).run(tx)),
        FeedMode::Stream => tokio::spawn(StreamFeed::new(&config).run(tx)),
    };

    let pipeline = Pipeline::new(state, sinks);

    tokio::select! {
        _ = pipeline.run(rx) => {
            info!("Pipeline finished");
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Data collection stopped by user");
        }
    }

    feed.abort();
    match feed.await {
        Ok(Err(e)) => error!(error = %e, "Feed terminated with error"),
        Ok(Ok(())) | Err(_) => info!("Feed stopped"),
    }

    Ok(())
}
