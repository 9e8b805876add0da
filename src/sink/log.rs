//! Structured log sink

use async_trait::async_trait;
use tracing::{debug, info};

use super::Sink;
use crate::error::Result;
use crate::orderbook::Tick;

/// Emits one tracing event per tick
#[derive(Debug, Default)]
pub struct LogSink;

#[async_trait]
impl Sink for LogSink {
    fn name(&self) -> &'static str {
        "log"
    }

    async fn publish(&self, tick: &Tick) -> Result<()> {
        let snapshot = &tick.snapshot;

        match (&tick.metrics, &tick.interpretation) {
            (Some(m), Some(i)) => info!(
                symbol = %tick.symbol,
                timestamp = snapshot.timestamp(),
                total_buy_qty = snapshot.total_buy_qty(),
                total_sell_qty = snapshot.total_sell_qty(),
                spread_bps = ?snapshot.spread_bps(),
                bid_drift = m.bid_drift,
                ask_drift = m.ask_drift,
                bid_volatility = m.bid_volatility,
                ask_volatility = m.ask_volatility,
                flow_imbalance = m.flow_imbalance,
                price_pressure = m.price_pressure,
                obi = ?i.order_book_imbalance,
                direction = %i.direction,
                confidence = i.confidence,
                stability = %i.stability,
                volatility_ratio = i.volatility_ratio,
                estimated_impact = i.estimated_impact,
                "Stochastic order book analysis"
            ),
            _ => debug!(
                symbol = %tick.symbol,
                timestamp = snapshot.timestamp(),
                total_buy_qty = snapshot.total_buy_qty(),
                total_sell_qty = snapshot.total_sell_qty(),
                "Waiting for more history"
            ),
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orderbook::SymbolTracker;
    use crate::parser::Observation;

    #[test]
    fn test_publish_never_fails() {
        let mut tracker = SymbolTracker::new("NIFTY", 10);
        let sink = LogSink;

        let warming = tracker.process(Observation::new(0, 1, 1)).unwrap();
        let ready = tracker.process(Observation::new(1, 2, 1)).unwrap();

        assert!(tokio_test::block_on(sink.publish(&warming)).is_ok());
        assert!(tokio_test::block_on(sink.publish(&ready)).is_ok());
        assert_eq!(sink.name(), "log");
    }
}
