//! Signal-side data model: readings, directions, tiers and confirmed events.
//!
//! Everything here is immutable once produced. Readings describe the market at
//! one candle; events describe a confirmed, tiered signal. Neither carries any
//! dedup or dispatch state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::candle::Timeframe;

/// Directional intent of a signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Buy,
    Sell,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Buy => "buy",
            Direction::Sell => "sell",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "buy" => Some(Direction::Buy),
            "sell" => Some(Direction::Sell),
            _ => None,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Routing class of an eligible symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RiskTier {
    #[serde(rename = "standard")]
    Standard,
    #[serde(rename = "high-risk")]
    HighRisk,
}

impl RiskTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskTier::Standard => "standard",
            RiskTier::HighRisk => "high-risk",
        }
    }
}

impl fmt::Display for RiskTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Indicator state at one candle.
///
/// A pure function of the trailing window ending at `index`; never mutated.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IndicatorReading {
    /// Position of the candle in its series.
    pub index: usize,
    pub timestamp: DateTime<Utc>,
    /// WaveTrend line (wt1).
    pub oscillator_value: f64,
    /// Smoothed signal line (wt2).
    pub signal_value: f64,
    /// Volume-weighted money-flow momentum.
    pub momentum_value: f64,
    pub is_overbought: bool,
    pub is_oversold: bool,
    /// Crossover candidate at this candle, if any.
    pub candidate: Option<Direction>,
}

/// Stochastic RSI lines at one candle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StochRsiPoint {
    pub k: f64,
    pub d: f64,
}

/// A confirmed, tiered signal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalEvent {
    pub symbol: String,
    pub timeframe: Timeframe,
    pub direction: Direction,
    pub risk_tier: RiskTier,
    pub timestamp: DateTime<Utc>,
    /// The readings at the candle before the crossover and at the crossover.
    pub supporting_readings: Vec<IndicatorReading>,
    pub stoch_rsi: StochRsiPoint,
}

impl SignalEvent {
    /// The reading at the crossover candle.
    pub fn trigger(&self) -> Option<&IndicatorReading> {
        self.supporting_readings.last()
    }
}
