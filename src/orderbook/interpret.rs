//! Interpretation of stochastic metrics into categorical signals

use serde::{Deserialize, Serialize};
use std::fmt;

use super::metrics::{StochasticMetrics, VOLATILITY_EPSILON};
use super::Snapshot;

/// Confidence multiplier applied to the volatility-normalised imbalance
const CONFIDENCE_SCALE: f64 = 20.0;

const MAX_CONFIDENCE: f64 = 100.0;

/// Impact is quoted per this many units of aggregate quantity
const IMPACT_UNITS: f64 = 10_000.0;

/// Predicted market direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    Bullish,
    Bearish,
}

impl Direction {
    /// Positive flow imbalance is bullish; zero breaks toward bearish
    pub fn from_flow_imbalance(flow_imbalance: f64) -> Self {
        if flow_imbalance > 0.0 {
            Direction::Bullish
        } else {
            Direction::Bearish
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Bullish => write!(f, "BULLISH"),
            Direction::Bearish => write!(f, "BEARISH"),
        }
    }
}

/// Liquidity stability class from the volatility/drift ratio
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LiquidityStability {
    VeryUnstable,
    Unstable,
    ModeratelyStable,
    Stable,
}

impl LiquidityStability {
    /// Thresholds are strict lower bounds, checked from the top
    pub fn from_ratio(volatility_ratio: f64) -> Self {
        if volatility_ratio > 5.0 {
            LiquidityStability::VeryUnstable
        } else if volatility_ratio > 2.0 {
            LiquidityStability::Unstable
        } else if volatility_ratio > 1.0 {
            LiquidityStability::ModeratelyStable
        } else {
            LiquidityStability::Stable
        }
    }
}

impl fmt::Display for LiquidityStability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            LiquidityStability::VeryUnstable => "Very Unstable",
            LiquidityStability::Unstable => "Unstable",
            LiquidityStability::ModeratelyStable => "Moderately Stable",
            LiquidityStability::Stable => "Stable",
        };
        f.write_str(label)
    }
}

/// Aggregate resting quantity on both sides of the book
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Totals {
    pub total_buy: u64,
    pub total_sell: u64,
}

impl Totals {
    pub fn new(total_buy: u64, total_sell: u64) -> Self {
        Self { total_buy, total_sell }
    }

    /// (buy - sell) / (buy + sell), undefined for an empty book
    pub fn order_book_imbalance(&self) -> Option<f64> {
        let total = self.total_buy as f64 + self.total_sell as f64;
        if total > 0.0 {
            Some((self.total_buy as f64 - self.total_sell as f64) / total)
        } else {
            None
        }
    }

    fn sum(&self) -> f64 {
        self.total_buy as f64 + self.total_sell as f64
    }
}

impl From<&Snapshot> for Totals {
    fn from(snapshot: &Snapshot) -> Self {
        Self::new(snapshot.total_buy_qty(), snapshot.total_sell_qty())
    }
}

/// Categorical reading of one metrics result
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Interpretation {
    pub order_book_imbalance: Option<f64>,
    pub direction: Direction,
    /// Signal confidence in percent, capped at 100
    pub confidence: f64,
    pub volatility_ratio: f64,
    pub stability: LiquidityStability,
    /// Estimated price impact in points per 10,000 units
    pub estimated_impact: f64,
}

impl Interpretation {
    pub fn interpret(metrics: &StochasticMetrics, totals: Totals) -> Self {
        let direction = Direction::from_flow_imbalance(metrics.flow_imbalance);

        let side_volatility = match direction {
            Direction::Bullish => metrics.bid_volatility,
            Direction::Bearish => metrics.ask_volatility,
        };
        let confidence = (metrics.flow_imbalance.abs() / (side_volatility + VOLATILITY_EPSILON)
            * CONFIDENCE_SCALE)
            .min(MAX_CONFIDENCE);

        let combined_volatility = metrics.bid_volatility + metrics.ask_volatility;
        let volatility_ratio = combined_volatility
            / (metrics.bid_drift.abs() + metrics.ask_drift.abs() + VOLATILITY_EPSILON);

        let estimated_impact = combined_volatility / (totals.sum() + VOLATILITY_EPSILON) * IMPACT_UNITS;

        Self {
            order_book_imbalance: totals.order_book_imbalance(),
            direction,
            confidence,
            volatility_ratio,
            stability: LiquidityStability::from_ratio(volatility_ratio),
            estimated_impact,
        }
    }
}
