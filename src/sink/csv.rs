//! CSV sink
//!
//! Appends one row per interpreted tick to a per-symbol file. Ticks without
//! metrics (history still warming up) are skipped.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::info;

use super::Sink;
use crate::error::Result;
use crate::orderbook::Tick;

pub const CSV_HEADER: &str = "timestamp,datetime,total_buy_qty,total_sell_qty,\
ltp,open,high,low,close,volume,change_percent,\
top_bid,top_ask,mid_price,spread,spread_bps,\
bid_drift,ask_drift,flow_imbalance,bid_volatility,ask_volatility,bid_wiener,ask_wiener,price_pressure,\
order_book_imbalance,direction,confidence,volatility_ratio,stability,estimated_impact";

/// Per-symbol CSV writer
pub struct CsvSink {
    dir: PathBuf,
    session: String,
    files: Mutex<HashMap<String, File>>,
}

impl CsvSink {
    /// Files created by this sink carry the session start time in their name
    pub fn new(dir: impl AsRef<Path>, started_at: DateTime<Utc>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir)?;

        Ok(Self {
            dir,
            session: started_at.format("%Y%m%d_%H%M%S").to_string(),
            files: Mutex::new(HashMap::new()),
        })
    }

    /// Output path for a symbol's rows
    pub fn path_for(&self, symbol: &str) -> PathBuf {
        self.dir.join(format!(
            "stochastic_orderbook_{}_{}.csv",
            symbol.replace(':', "_"),
            self.session
        ))
    }

    async fn open(&self, symbol: &str) -> Result<File> {
        let path = self.path_for(symbol);
        let mut file = OpenOptions::new().create(true).append(true).open(&path).await?;

        if file.metadata().await?.len() == 0 {
            write_line(&mut file, CSV_HEADER).await?;
            info!(path = %path.display(), "Created CSV output");
        }
        Ok(file)
    }
}

#[async_trait]
impl Sink for CsvSink {
    fn name(&self) -> &'static str {
        "csv"
    }

    async fn publish(&self, tick: &Tick) -> Result<()> {
        let Some(row) = format_row(tick) else {
            return Ok(());
        };

        let mut files = self.files.lock().await;
        if !files.contains_key(&tick.symbol) {
            let file = self.open(&tick.symbol).await?;
            files.insert(tick.symbol.clone(), file);
        }

        if let Some(file) = files.get_mut(&tick.symbol) {
            write_line(file, &row).await?;
        }
        Ok(())
    }
}

/// Append one line; flushed so the row is on disk when publish returns
async fn write_line(file: &mut File, line: &str) -> Result<()> {
    file.write_all(format!("{}\n", line).as_bytes()).await?;
    file.flush().await?;
    Ok(())
}

fn cell<T: ToString>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

/// CSV row for a tick, `None` when there are no metrics yet
pub(crate) fn format_row(tick: &Tick) -> Option<String> {
    let metrics = tick.metrics.as_ref()?;
    let snapshot = &tick.snapshot;
    let stats = snapshot.stats();
    let interpretation = tick.interpretation.as_ref();

    let datetime = DateTime::<Utc>::from_timestamp(snapshot.timestamp(), 0)
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string());

    let cells = [
        snapshot.timestamp().to_string(),
        cell(datetime),
        snapshot.total_buy_qty().to_string(),
        snapshot.total_sell_qty().to_string(),
        cell(stats.map(|s| s.ltp)),
        cell(stats.map(|s| s.open)),
        cell(stats.map(|s| s.high)),
        cell(stats.map(|s| s.low)),
        cell(stats.map(|s| s.close)),
        cell(stats.map(|s| s.volume)),
        cell(stats.map(|s| s.change_percent)),
        cell(snapshot.top_bid()),
        cell(snapshot.top_ask()),
        cell(snapshot.mid_price()),
        cell(snapshot.spread()),
        cell(snapshot.spread_bps()),
        metrics.bid_drift.to_string(),
        metrics.ask_drift.to_string(),
        metrics.flow_imbalance.to_string(),
        metrics.bid_volatility.to_string(),
        metrics.ask_volatility.to_string(),
        metrics.bid_wiener.to_string(),
        metrics.ask_wiener.to_string(),
        metrics.price_pressure.to_string(),
        cell(interpretation.and_then(|i| i.order_book_imbalance)),
        cell(interpretation.map(|i| i.direction)),
        cell(interpretation.map(|i| i.confidence)),
        cell(interpretation.map(|i| i.volatility_ratio)),
        // Stability labels contain spaces but never commas
        cell(interpretation.map(|i| i.stability)),
        cell(interpretation.map(|i| i.estimated_impact)),
    ];

    Some(cells.join(","))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orderbook::SymbolTracker;
    use crate::parser::{MarketStats, Observation};
    use chrono::TimeZone;

    fn started() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 3, 9, 15, 0).unwrap()
    }

    fn ticks() -> Vec<Tick> {
        let mut tracker = SymbolTracker::new("NSE:NIFTY25JUNFUT", 10);
        vec![
            tracker.process(Observation::new(1_748_942_100, 100, 80)).unwrap(),
            tracker
                .process(
                    Observation::new(1_748_942_101, 120, 70)
                        .with_top_of_book(Some(99.0), Some(101.0))
                        .with_stats(MarketStats {
                            ltp: 100.5,
                            volume: 42,
                            ..MarketStats::default()
                        }),
                )
                .unwrap(),
        ]
    }

    #[test]
    fn test_path_sanitizes_symbol() {
        let dir = tempfile::tempdir().unwrap();
        let sink = CsvSink::new(dir.path(), started()).unwrap();
        let path = sink.path_for("NSE:NIFTY25JUNFUT");
        assert_eq!(
            path.file_name().unwrap().to_str().unwrap(),
            "stochastic_orderbook_NSE_NIFTY25JUNFUT_20250603_091500.csv"
        );
    }

    #[test]
    fn test_row_layout() {
        let ticks = ticks();
        assert!(format_row(&ticks[0]).is_none());

        let row = format_row(&ticks[1]).unwrap();
        let cells: Vec<&str> = row.split(',').collect();
        let header: Vec<&str> = CSV_HEADER.split(',').collect();
        assert_eq!(cells.len(), header.len());

        let col = |name: &str| cells[header.iter().position(|h| *h == name).unwrap()];
        assert_eq!(col("total_buy_qty"), "120");
        assert_eq!(col("ltp"), "100.5");
        assert_eq!(col("volume"), "42");
        assert_eq!(col("spread"), "2");
        assert_eq!(col("bid_drift"), "20");
        assert_eq!(col("flow_imbalance"), "30");
        assert_eq!(col("direction"), "BULLISH");
        assert_eq!(col("datetime"), "2025-06-03 09:15:01");
    }

    #[tokio::test]
    async fn test_header_written_once() {
        let dir = tempfile::tempdir().unwrap();
        let sink = CsvSink::new(dir.path(), started()).unwrap();

        for tick in ticks() {
            sink.publish(&tick).await.unwrap();
        }
        let tick = ticks().pop().unwrap();
        sink.publish(&tick).await.unwrap();

        let contents = std::fs::read_to_string(sink.path_for("NSE:NIFTY25JUNFUT")).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], CSV_HEADER);
        assert_eq!(lines.iter().filter(|l| **l == CSV_HEADER).count(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_concurrent_publishes_keep_every_row() {
        let dir = tempfile::tempdir().unwrap();
        let sink = std::sync::Arc::new(CsvSink::new(dir.path(), started()).unwrap());

        let mut handles = Vec::new();
        for symbol in ["NSE:NIFTY25JUNFUT", "NSE:BANKNIFTY25JUNFUT"] {
            let sink = sink.clone();
            handles.push(tokio::spawn(async move {
                let mut tracker = SymbolTracker::new(symbol, 10);
                for t in 0..20 {
                    let tick = tracker.process(Observation::new(t, 100 + t, 80)).unwrap();
                    sink.publish(&tick).await.unwrap();
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        for symbol in ["NSE:NIFTY25JUNFUT", "NSE:BANKNIFTY25JUNFUT"] {
            let contents = std::fs::read_to_string(sink.path_for(symbol)).unwrap();
            // Header plus every tick after the first
            assert_eq!(contents.lines().count(), 20);
            assert!(contents.lines().skip(1).all(|l| l.split(',').count() == 30));
        }
    }

    #[tokio::test]
    async fn test_reopening_existing_file_skips_header() {
        let dir = tempfile::tempdir().unwrap();
        let tick = ticks().pop().unwrap();

        let first = CsvSink::new(dir.path(), started()).unwrap();
        first.publish(&tick).await.unwrap();
        drop(first);

        let second = CsvSink::new(dir.path(), started()).unwrap();
        second.publish(&tick).await.unwrap();

        let contents = std::fs::read_to_string(second.path_for(&tick.symbol)).unwrap();
        assert_eq!(contents.lines().count(), 3);
    }
}
