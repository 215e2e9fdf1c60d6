//! Alert payloads handed to dispatch sinks.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::data::base_asset;
use crate::domain::{Direction, RiskTier, SignalEvent, Timeframe};

const TRADINGVIEW_CHART: &str = "https://www.tradingview.com/chart/";

/// Everything a notifier needs to render one alert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertPayload {
    pub symbol: String,
    pub direction: Direction,
    pub risk_tier: RiskTier,
    pub timeframe: Timeframe,
    pub timestamp: DateTime<Utc>,
    pub chart_link: String,
    pub oscillator: f64,
    pub signal: f64,
    pub momentum: f64,
    pub stoch_k: f64,
    pub stoch_d: f64,
}

impl AlertPayload {
    pub fn from_event(event: &SignalEvent) -> Self {
        let (oscillator, signal, momentum) = event
            .trigger()
            .map(|r| (r.oscillator_value, r.signal_value, r.momentum_value))
            .unwrap_or((f64::NAN, f64::NAN, f64::NAN));
        Self {
            symbol: event.symbol.clone(),
            direction: event.direction,
            risk_tier: event.risk_tier,
            timeframe: event.timeframe,
            timestamp: event.timestamp,
            chart_link: chart_link(&event.symbol, event.timeframe),
            oscillator,
            signal,
            momentum,
            stoch_k: event.stoch_rsi.k,
            stoch_d: event.stoch_rsi.d,
        }
    }

    /// One-line human summary, e.g. `BUY BTC 15m (standard) wt1=-65.2 wt2=-70.1 stoch_d=12.3`.
    pub fn summary(&self) -> String {
        format!(
            "{} {} {} ({}) wt1={:.1} wt2={:.1} mf={:.2} stoch_k={:.1} stoch_d={:.1}",
            self.direction.as_str().to_ascii_uppercase(),
            self.symbol,
            self.timeframe,
            self.risk_tier,
            self.oscillator,
            self.signal,
            self.momentum,
            self.stoch_k,
            self.stoch_d,
        )
    }
}

/// TradingView chart for the symbol's USDT pair at the timeframe's resolution.
pub fn chart_link(symbol: &str, timeframe: Timeframe) -> String {
    format!(
        "{TRADINGVIEW_CHART}?symbol={}USDT&interval={}",
        base_asset(symbol),
        timeframe.minutes()
    )
}
