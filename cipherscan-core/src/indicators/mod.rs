//! Concrete indicator implementations.
//!
//! Every indicator implements the `Indicator` trait from `components::indicator`
//! and is a pure function of the candle slice it is given. The engine computes
//! them once per contiguous segment and reads the values back by index.
//!
//! Multi-line indicators (WaveTrend, Stochastic RSI) expose a `lines()` method
//! returning every line at once; `Indicator::compute` returns the primary line.

pub mod ema;
pub mod heikin_ashi;
pub mod money_flow;
pub mod rsi;
pub mod sma;
pub mod stoch_rsi;
pub mod wavetrend;

pub use ema::Ema;
pub use heikin_ashi::heikin_ashi;
pub use money_flow::MoneyFlow;
pub use rsi::Rsi;
pub use sma::Sma;
pub use stoch_rsi::{StochRsi, StochRsiLines};
pub use wavetrend::{WaveTrend, WaveTrendLines};

/// Create synthetic 15-minute candles from close prices for testing.
///
/// Generates plausible OHLCV: open = prev_close (or close for first candle),
/// high = max(open,close) + 1.0, low = min(open,close) - 1.0, volume = 1000.
#[cfg(test)]
pub fn make_candles(closes: &[f64]) -> Vec<crate::domain::Candle> {
    use crate::domain::Candle;
    use chrono::TimeZone;
    let base = chrono::Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| {
            let open = if i == 0 { close } else { closes[i - 1] };
            let high = open.max(close) + 1.0;
            let low = open.min(close) - 1.0;
            Candle {
                timestamp: base + chrono::Duration::minutes(15 * i as i64),
                open,
                high,
                low,
                close,
                volume: 1000.0,
            }
        })
        .collect()
}

/// Assert two f64 values are approximately equal (within epsilon).
#[cfg(test)]
pub fn assert_approx(actual: f64, expected: f64, epsilon: f64) {
    assert!(
        (actual - expected).abs() < epsilon,
        "assert_approx failed: actual={actual}, expected={expected}, diff={}, epsilon={epsilon}",
        (actual - expected).abs()
    );
}

/// Default epsilon for indicator tests.
#[cfg(test)]
pub const DEFAULT_EPSILON: f64 = 1e-10;
