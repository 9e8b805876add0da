//! Parser module for depth observations
//!
//! Handles deserialization of raw feed observations, broker REST depth
//! responses and WebSocket stream frames.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::{Result, StochasticError};

/// Session market statistics carried alongside a depth observation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MarketStats {
    #[serde(default)]
    pub ltp: f64,
    #[serde(default)]
    pub open: f64,
    #[serde(default)]
    pub high: f64,
    #[serde(default)]
    pub low: f64,
    #[serde(default)]
    pub close: f64,
    #[serde(default)]
    pub volume: u64,
    #[serde(default)]
    pub change_percent: f64,
}

/// One raw order book observation as supplied by a feed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    /// Unix time in seconds
    pub timestamp: i64,

    /// Aggregate resting quantity on the bid side
    pub total_buy_qty: i64,

    /// Aggregate resting quantity on the ask side
    pub total_sell_qty: i64,

    #[serde(default)]
    pub top_bid: Option<f64>,

    #[serde(default)]
    pub top_ask: Option<f64>,

    #[serde(default)]
    pub stats: Option<MarketStats>,
}

impl Observation {
    pub fn new(timestamp: i64, total_buy_qty: i64, total_sell_qty: i64) -> Self {
        Self {
            timestamp,
            total_buy_qty,
            total_sell_qty,
            top_bid: None,
            top_ask: None,
            stats: None,
        }
    }

    pub fn with_top_of_book(mut self, top_bid: Option<f64>, top_ask: Option<f64>) -> Self {
        self.top_bid = top_bid;
        self.top_ask = top_ask;
        self
    }

    pub fn with_stats(mut self, stats: MarketStats) -> Self {
        self.stats = Some(stats);
        self
    }

    /// Parse an observation from JSON text
    ///
    /// Missing or non-numeric required fields surface as `InvalidObservation`.
    pub fn from_json(raw: &str) -> Result<Self> {
        let observation: Observation = serde_json::from_str(raw)?;
        observation.validate()?;
        Ok(observation)
    }

    /// Structural validation of numeric fields
    pub fn validate(&self) -> Result<()> {
        if self.total_buy_qty < 0 {
            return Err(StochasticError::InvalidObservation(format!(
                "total_buy_qty is negative: {}",
                self.total_buy_qty
            )));
        }
        if self.total_sell_qty < 0 {
            return Err(StochasticError::InvalidObservation(format!(
                "total_sell_qty is negative: {}",
                self.total_sell_qty
            )));
        }
        validate_price("top_bid", self.top_bid)?;
        validate_price("top_ask", self.top_ask)?;
        Ok(())
    }
}

fn validate_price(field: &str, price: Option<f64>) -> Result<()> {
    match price {
        Some(p) if !p.is_finite() || p <= 0.0 => Err(StochasticError::InvalidObservation(
            format!("{} must be a positive finite price, got {}", field, p),
        )),
        _ => Ok(()),
    }
}

/// Single price level from a broker depth response
#[derive(Debug, Clone, Deserialize)]
pub struct DepthLevel {
    #[serde(default)]
    pub price: f64,

    #[serde(default)]
    pub volume: i64,

    /// Number of orders at this level
    #[serde(default)]
    pub ord: i64,
}

/// Per-symbol payload of a broker depth response
#[derive(Debug, Clone, Deserialize)]
pub struct SymbolDepth {
    #[serde(rename = "totalbuyqty", default)]
    pub total_buy_qty: i64,

    #[serde(rename = "totalsellqty", default)]
    pub total_sell_qty: i64,

    #[serde(default)]
    pub bids: Vec<DepthLevel>,

    #[serde(rename = "ask", default)]
    pub asks: Vec<DepthLevel>,

    #[serde(default)]
    pub ltp: f64,

    #[serde(rename = "o", default)]
    pub open: f64,

    #[serde(rename = "h", default)]
    pub high: f64,

    #[serde(rename = "l", default)]
    pub low: f64,

    #[serde(rename = "c", default)]
    pub close: f64,

    #[serde(rename = "v", default)]
    pub volume: u64,

    #[serde(rename = "chp", default)]
    pub change_percent: f64,
}

/// Broker REST depth response
#[derive(Debug, Clone, Deserialize)]
pub struct DepthResponse {
    /// Status flag ("ok" on success)
    #[serde(rename = "s")]
    pub status: String,

    #[serde(rename = "d", default)]
    pub data: HashMap<String, SymbolDepth>,

    #[serde(default)]
    pub message: Option<String>,
}

impl DepthResponse {
    pub fn parse(raw: &str) -> Result<Self> {
        serde_json::from_str(raw).map_err(|e| StochasticError::Feed(format!("Bad depth response: {}", e)))
    }

    /// Extract the observation for `symbol`, stamped with `timestamp`
    ///
    /// Quantities are not validated here; `History::ingest` rejects them.
    pub fn into_observation(mut self, symbol: &str, timestamp: i64) -> Result<Observation> {
        if self.status != "ok" {
            return Err(StochasticError::Feed(format!(
                "Depth request for {} failed: status={} message={}",
                symbol,
                self.status,
                self.message.unwrap_or_default()
            )));
        }

        let depth = self.data.remove(symbol).ok_or_else(|| {
            StochasticError::Feed(format!("Depth response has no entry for {}", symbol))
        })?;

        let top_bid = depth.bids.first().map(|level| level.price);
        let top_ask = depth.asks.first().map(|level| level.price);
        // Top of book only counts when both sides are quoted
        let (top_bid, top_ask) = match (top_bid, top_ask) {
            (Some(bid), Some(ask)) if bid > 0.0 && ask > 0.0 => (Some(bid), Some(ask)),
            _ => (None, None),
        };

        let observation = Observation::new(timestamp, depth.total_buy_qty, depth.total_sell_qty)
            .with_top_of_book(top_bid, top_ask)
            .with_stats(MarketStats {
                ltp: depth.ltp,
                open: depth.open,
                high: depth.high,
                low: depth.low,
                close: depth.close,
                volume: depth.volume,
                change_percent: depth.change_percent,
            });

        Ok(observation)
    }
}

/// Depth frame pushed by the WebSocket stream
#[derive(Debug, Clone, Deserialize)]
pub struct StreamDepth {
    pub symbol: String,

    #[serde(flatten)]
    pub observation: Observation,
}

/// Error frame pushed by the WebSocket stream
#[derive(Debug, Clone, Deserialize)]
struct StreamError {
    error: String,
}

/// Canonical form of a symbol, shared by config and feeds
pub fn normalize_symbol(raw: &str) -> String {
    raw.trim().to_uppercase()
}

/// Parsed WebSocket message
#[derive(Debug, Clone)]
pub enum ParsedMessage {
    Depth(StreamDepth),
    Error(String),
    Unknown(String),
}

impl ParsedMessage {
    /// Parse a raw WebSocket message
    ///
    /// Depth frames are only checked for shape. Value checks happen on ingest
    /// so bad quantities are counted the same way in every feed mode.
    pub fn parse(raw: &str) -> Result<Self> {
        let value: serde_json::Value = serde_json::from_str(raw)?;

        if value.get("symbol").is_some() {
            let mut depth: StreamDepth = serde_json::from_value(value)?;
            depth.symbol = normalize_symbol(&depth.symbol);
            return Ok(ParsedMessage::Depth(depth));
        }

        if let Ok(err) = serde_json::from_value::<StreamError>(value) {
            return Ok(ParsedMessage::Error(err.error));
        }

        Ok(ParsedMessage::Unknown(raw.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_observation_from_json() {
        let raw = r#"{
            "timestamp": 1748922844,
            "total_buy_qty": 120,
            "total_sell_qty": 70,
            "top_bid": 24990.5,
            "top_ask": 24991.0
        }"#;

        let obs = Observation::from_json(raw).unwrap();
        assert_eq!(obs.total_buy_qty, 120);
        assert_eq!(obs.top_ask, Some(24991.0));
        assert!(obs.stats.is_none());
    }

    #[test]
    fn test_observation_missing_field_is_invalid() {
        let raw = r#"{"timestamp": 1, "total_buy_qty": 10}"#;
        assert!(matches!(
            Observation::from_json(raw),
            Err(StochasticError::InvalidObservation(_))
        ));
    }

    #[test]
    fn test_observation_non_numeric_is_invalid() {
        let raw = r#"{"timestamp": 1, "total_buy_qty": "lots", "total_sell_qty": 3}"#;
        assert!(matches!(
            Observation::from_json(raw),
            Err(StochasticError::InvalidObservation(_))
        ));
    }

    #[test]
    fn test_observation_negative_qty_is_invalid() {
        let obs = Observation::new(1, -5, 3);
        assert!(matches!(obs.validate(), Err(StochasticError::InvalidObservation(_))));
    }

    #[test]
    fn test_observation_bad_price_is_invalid() {
        let obs = Observation::new(1, 5, 3).with_top_of_book(Some(f64::NAN), Some(10.0));
        assert!(obs.validate().is_err());

        let obs = Observation::new(1, 5, 3).with_top_of_book(Some(10.0), Some(-1.0));
        assert!(obs.validate().is_err());
    }

    #[test]
    fn test_depth_response_into_observation() {
        let raw = r#"{
            "s": "ok",
            "d": {
                "NSE:NIFTY25JUNFUT": {
                    "totalbuyqty": 150000,
                    "totalsellqty": 98000,
                    "bids": [{"price": 24990.0, "volume": 75, "ord": 1}, {"price": 24989.5, "volume": 150, "ord": 2}],
                    "ask": [{"price": 24991.0, "volume": 225, "ord": 3}],
                    "ltp": 24990.5,
                    "o": 24900.0,
                    "h": 25010.0,
                    "l": 24880.0,
                    "c": 24950.0,
                    "v": 1234567,
                    "chp": 0.16
                }
            }
        }"#;

        let obs = DepthResponse::parse(raw)
            .unwrap()
            .into_observation("NSE:NIFTY25JUNFUT", 1_748_922_844)
            .unwrap();

        assert_eq!(obs.timestamp, 1_748_922_844);
        assert_eq!(obs.total_buy_qty, 150000);
        assert_eq!(obs.total_sell_qty, 98000);
        assert_eq!(obs.top_bid, Some(24990.0));
        assert_eq!(obs.top_ask, Some(24991.0));
        let stats = obs.stats.unwrap();
        assert_eq!(stats.volume, 1234567);
        assert_eq!(stats.change_percent, 0.16);
    }

    #[test]
    fn test_depth_response_one_sided_book_drops_top() {
        let raw = r#"{"s":"ok","d":{"X":{"totalbuyqty":10,"totalsellqty":0,"bids":[{"price":5.0,"volume":10,"ord":1}],"ask":[]}}}"#;
        let obs = DepthResponse::parse(raw).unwrap().into_observation("X", 7).unwrap();
        assert_eq!(obs.top_bid, None);
        assert_eq!(obs.top_ask, None);
    }

    #[test]
    fn test_depth_response_error_status() {
        let raw = r#"{"s":"error","message":"invalid token"}"#;
        let err = DepthResponse::parse(raw).unwrap().into_observation("X", 0).unwrap_err();
        assert!(matches!(err, StochasticError::Feed(msg) if msg.contains("invalid token")));
    }

    #[test]
    fn test_depth_response_missing_symbol() {
        let raw = r#"{"s":"ok","d":{}}"#;
        assert!(DepthResponse::parse(raw).unwrap().into_observation("X", 0).is_err());
    }

    #[test]
    fn test_parse_stream_depth() {
        let raw = r#"{"symbol":"NIFTY25JUNFUT","timestamp":10,"total_buy_qty":100,"total_sell_qty":80}"#;
        match ParsedMessage::parse(raw).unwrap() {
            ParsedMessage::Depth(depth) => {
                assert_eq!(depth.symbol, "NIFTY25JUNFUT");
                assert_eq!(depth.observation.total_sell_qty, 80);
                assert_eq!(depth.observation.top_bid, None);
            }
            other => panic!("Expected Depth, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_stream_depth_normalizes_symbol() {
        let raw = r#"{"symbol":" nse:nifty25junfut ","timestamp":10,"total_buy_qty":100,"total_sell_qty":80}"#;
        match ParsedMessage::parse(raw).unwrap() {
            ParsedMessage::Depth(depth) => assert_eq!(depth.symbol, "NSE:NIFTY25JUNFUT"),
            other => panic!("Expected Depth, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_stream_depth_keeps_negative_qty_for_ingest() {
        let raw = r#"{"symbol":"NIFTY","timestamp":10,"total_buy_qty":-5,"total_sell_qty":80}"#;
        match ParsedMessage::parse(raw).unwrap() {
            ParsedMessage::Depth(depth) => {
                assert_eq!(depth.observation.total_buy_qty, -5);
                assert!(depth.observation.validate().is_err());
            }
            other => panic!("Expected Depth, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_stream_depth_wrong_shape_is_error() {
        let raw = r#"{"symbol":"NIFTY","timestamp":10,"total_buy_qty":"lots","total_sell_qty":80}"#;
        assert!(ParsedMessage::parse(raw).is_err());
    }

    #[test]
    fn test_depth_response_negative_qty_passes_through() {
        let raw = r#"{"s":"ok","d":{"X":{"totalbuyqty":-10,"totalsellqty":4}}}"#;
        let obs = DepthResponse::parse(raw).unwrap().into_observation("X", 7).unwrap();
        assert_eq!(obs.total_buy_qty, -10);
    }

    #[test]
    fn test_normalize_symbol() {
        assert_eq!(normalize_symbol("  nse:nifty25junfut"), "NSE:NIFTY25JUNFUT");
    }

    #[test]
    fn test_parse_stream_error() {
        let raw = r#"{"error":"subscription rejected"}"#;
        assert!(matches!(
            ParsedMessage::parse(raw).unwrap(),
            ParsedMessage::Error(msg) if msg == "subscription rejected"
        ));
    }

    #[test]
    fn test_parse_stream_unknown() {
        let raw = r#"{"type":"heartbeat"}"#;
        assert!(matches!(ParsedMessage::parse(raw).unwrap(), ParsedMessage::Unknown(_)));
    }
}
