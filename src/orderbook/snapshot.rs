//! Immutable order book snapshot

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::parser::{MarketStats, Observation};

/// One order book observation at a point in time
///
/// Fields are private so a snapshot cannot change once it sits in a history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    timestamp: i64,
    total_buy_qty: u64,
    total_sell_qty: u64,
    top_bid: Option<f64>,
    top_ask: Option<f64>,
    spread: Option<f64>,
    mid_price: Option<f64>,
    spread_bps: Option<f64>,
    stats: Option<MarketStats>,
}

impl Snapshot {
    /// Build a snapshot from a validated observation
    pub fn from_observation(observation: Observation) -> Result<Self> {
        observation.validate()?;

        let (spread, mid_price, spread_bps) = match (observation.top_bid, observation.top_ask) {
            (Some(bid), Some(ask)) => {
                let spread = ask - bid;
                let mid = (bid + ask) / 2.0;
                (Some(spread), Some(mid), Some(spread / mid * 10_000.0))
            }
            _ => (None, None, None),
        };

        Ok(Self {
            timestamp: observation.timestamp,
            total_buy_qty: observation.total_buy_qty as u64,
            total_sell_qty: observation.total_sell_qty as u64,
            top_bid: observation.top_bid,
            top_ask: observation.top_ask,
            spread,
            mid_price,
            spread_bps,
            stats: observation.stats,
        })
    }

    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }

    pub fn total_buy_qty(&self) -> u64 {
        self.total_buy_qty
    }

    pub fn total_sell_qty(&self) -> u64 {
        self.total_sell_qty
    }

    pub fn top_bid(&self) -> Option<f64> {
        self.top_bid
    }

    pub fn top_ask(&self) -> Option<f64> {
        self.top_ask
    }

    /// Ask minus bid, present only when both sides are quoted
    pub fn spread(&self) -> Option<f64> {
        self.spread
    }

    pub fn mid_price(&self) -> Option<f64> {
        self.mid_price
    }

    /// Spread in basis points of the mid price
    pub fn spread_bps(&self) -> Option<f64> {
        self.spread_bps
    }

    pub fn stats(&self) -> Option<&MarketStats> {
        self.stats.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derived_fields() {
        let obs = Observation::new(1, 100, 80).with_top_of_book(Some(99.0), Some(101.0));
        let snap = Snapshot::from_observation(obs).unwrap();

        assert_eq!(snap.spread(), Some(2.0));
        assert_eq!(snap.mid_price(), Some(100.0));
        assert_eq!(snap.spread_bps(), Some(200.0));
    }

    #[test]
    fn test_one_sided_book_omits_derived_fields() {
        let obs = Observation::new(1, 100, 0).with_top_of_book(Some(99.0), None);
        let snap = Snapshot::from_observation(obs).unwrap();

        assert_eq!(snap.top_bid(), Some(99.0));
        assert_eq!(snap.spread(), None);
        assert_eq!(snap.mid_price(), None);
        assert_eq!(snap.spread_bps(), None);
    }

    #[test]
    fn test_rejects_invalid_observation() {
        assert!(Snapshot::from_observation(Observation::new(1, 0, -1)).is_err());
    }
}
