//! Stochastic order flow metrics
//!
//! Models aggregate resting quantity on each side of the book as a drift +
//! diffusion process and derives flow signals from the two most recent
//! snapshots (five for volatility).

use serde::{Deserialize, Serialize};

use super::History;

/// Floor for the time step between snapshots sharing a timestamp
pub const TIME_EPSILON: f64 = 0.001;

/// Guard added to volatility and quantity denominators
pub const VOLATILITY_EPSILON: f64 = 0.0001;

/// Number of snapshots the volatility estimate looks back over
pub const VOLATILITY_WINDOW: usize = 5;

/// Computed flow metrics for the latest snapshot
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct StochasticMetrics {
    /// Rate of change of bid quantity (units per second)
    pub bid_drift: f64,

    /// Rate of change of ask quantity (units per second)
    pub ask_drift: f64,

    /// Population std-dev of bid quantity changes over the volatility window
    pub bid_volatility: f64,

    pub ask_volatility: f64,

    /// Change not explained by drift over the last interval
    pub bid_wiener: f64,

    pub ask_wiener: f64,

    /// bid_drift - ask_drift
    pub flow_imbalance: f64,

    /// Flow imbalance normalised by combined volatility
    pub price_pressure: f64,
}

impl StochasticMetrics {
    /// Compute metrics from a history; `None` until two snapshots exist
    pub fn compute(history: &History) -> Option<Self> {
        if history.len() < 2 {
            return None;
        }

        let mut tail = history.recent(2);
        let previous = tail.next()?;
        let current = tail.next()?;

        // Subtract in f64: the i64 gap between arbitrary timestamps can overflow
        let dt = (current.timestamp() as f64 - previous.timestamp() as f64).max(TIME_EPSILON);

        let bid_change = current.total_buy_qty() as f64 - previous.total_buy_qty() as f64;
        let ask_change = current.total_sell_qty() as f64 - previous.total_sell_qty() as f64;

        let bid_drift = bid_change / dt;
        let ask_drift = ask_change / dt;

        let (bid_volatility, ask_volatility) = if history.len() >= VOLATILITY_WINDOW {
            let bids: Vec<f64> = history
                .recent(VOLATILITY_WINDOW)
                .map(|s| s.total_buy_qty() as f64)
                .collect();
            let asks: Vec<f64> = history
                .recent(VOLATILITY_WINDOW)
                .map(|s| s.total_sell_qty() as f64)
                .collect();
            (change_std_dev(&bids), change_std_dev(&asks))
        } else {
            (0.0, 0.0)
        };

        // First-order residual against the two-point drift; near zero by construction
        let bid_wiener = bid_change - bid_drift * dt;
        let ask_wiener = ask_change - ask_drift * dt;

        let flow_imbalance = bid_drift - ask_drift;
        let price_pressure = flow_imbalance / (bid_volatility + ask_volatility + VOLATILITY_EPSILON);

        Some(Self {
            bid_drift,
            ask_drift,
            bid_volatility,
            ask_volatility,
            bid_wiener,
            ask_wiener,
            flow_imbalance,
            price_pressure,
        })
    }
}

/// Population standard deviation of successive differences
fn change_std_dev(values: &[f64]) -> f64 {
    let changes: Vec<f64> = values.windows(2).map(|w| w[1] - w[0]).collect();
    if changes.is_empty() {
        return 0.0;
    }

    let n = changes.len() as f64;
    let mean = changes.iter().sum::<f64>() / n;
    let variance = changes.iter().map(|c| (c - mean).powi(2)).sum::<f64>() / n;
    variance.sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::Observation;

    fn history_of(points: &[(i64, i64, i64)]) -> History {
        let mut history = History::new(100);
        for &(t, buy, sell) in points {
            history.ingest(Observation::new(t, buy, sell)).unwrap();
        }
        history
    }

    #[test]
    fn test_insufficient_history_is_none() {
        assert!(StochasticMetrics::compute(&History::new(10)).is_none());
        assert!(StochasticMetrics::compute(&history_of(&[(0, 100, 80)])).is_none());
    }

    #[test]
    fn test_drift_and_flow_imbalance() {
        let history = history_of(&[(0, 100, 80), (1, 120, 70)]);
        let m = StochasticMetrics::compute(&history).unwrap();

        assert_eq!(m.bid_drift, 20.0);
        assert_eq!(m.ask_drift, -10.0);
        assert_eq!(m.flow_imbalance, 30.0);
        assert_eq!(m.bid_volatility, 0.0);
        assert_eq!(m.ask_volatility, 0.0);
        assert!((m.price_pressure - 30.0 / VOLATILITY_EPSILON).abs() < 1e-6);
    }

    #[test]
    fn test_shared_timestamp_uses_time_epsilon() {
        let history = history_of(&[(5, 100, 80), (5, 101, 80)]);
        let m = StochasticMetrics::compute(&history).unwrap();
        assert!((m.bid_drift - 1.0 / TIME_EPSILON).abs() < 1e-9);
        assert_eq!(m.ask_drift, 0.0);
    }

    #[test]
    fn test_widely_spaced_timestamps_stay_finite() {
        let history = history_of(&[(i64::MIN, 100, 80), (i64::MAX, 120, 70)]);
        let m = StochasticMetrics::compute(&history).unwrap();
        assert!(m.bid_drift.is_finite() && m.ask_drift.is_finite());
        assert!(m.bid_drift > 0.0);
        assert!(m.ask_drift < 0.0);
        assert!(m.flow_imbalance > 0.0);
        assert!(m.price_pressure.is_finite());
    }

    #[test]
    fn test_volatility_zero_below_window() {
        let history = history_of(&[(0, 10, 500), (1, 900, 3), (2, 1, 7000), (3, 5000, 0)]);
        let m = StochasticMetrics::compute(&history).unwrap();
        assert_eq!(m.bid_volatility, 0.0);
        assert_eq!(m.ask_volatility, 0.0);
    }

    #[test]
    fn test_volatility_population_std_dev() {
        // bid changes: 10, -10, 10, -10 -> mean 0, std 10
        // ask changes: 0, 0, 0, 0 -> std 0
        let history = history_of(&[
            (0, 100, 50),
            (1, 110, 50),
            (2, 100, 50),
            (3, 110, 50),
            (4, 100, 50),
        ]);
        let m = StochasticMetrics::compute(&history).unwrap();
        assert!((m.bid_volatility - 10.0).abs() < 1e-12);
        assert_eq!(m.ask_volatility, 0.0);
    }

    #[test]
    fn test_volatility_uses_last_five_only() {
        let mut points = vec![(0, 1_000_000, 0)];
        points.extend([(1, 100, 0), (2, 110, 0), (3, 100, 0), (4, 110, 0), (5, 100, 0)]);
        let m = StochasticMetrics::compute(&history_of(&points)).unwrap();
        assert!((m.bid_volatility - 10.0).abs() < 1e-12);
    }

    #[test]
    fn test_wiener_residual_near_zero() {
        let history = history_of(&[(0, 100, 80), (3, 137, 61)]);
        let m = StochasticMetrics::compute(&history).unwrap();
        assert!(m.bid_wiener.abs() < 1e-9);
        assert!(m.ask_wiener.abs() < 1e-9);
    }

    #[test]
    fn test_price_pressure_sign_matches_flow_imbalance() {
        let cases: [&[(i64, i64, i64)]; 3] = [
            &[(0, 100, 100), (1, 120, 90), (2, 90, 140), (3, 150, 100), (4, 160, 95)],
            &[(0, 100, 100), (1, 80, 130), (2, 95, 110), (3, 70, 150), (4, 60, 170)],
            &[(0, 100, 100), (1, 100, 100)],
        ];
        for points in cases {
            let m = StochasticMetrics::compute(&history_of(points)).unwrap();
            assert!(m.bid_volatility >= 0.0 && m.ask_volatility >= 0.0);
            assert_eq!(m.price_pressure.signum(), m.flow_imbalance.signum());
        }
    }

    #[test]
    fn test_deterministic_for_same_sequence() {
        let points = [(0, 100, 80), (1, 130, 60), (3, 90, 95), (4, 140, 70), (6, 120, 120)];
        let first = StochasticMetrics::compute(&history_of(&points)).unwrap();
        let second = StochasticMetrics::compute(&history_of(&points)).unwrap();
        assert_eq!(first, second);
    }
}
