//! Property tests for signal invariants.
//!
//! Uses proptest to verify:
//! 1. Determinism: identical series give identical readings
//! 2. No look-ahead: appending candles never changes earlier readings
//! 3. Bounded oscillators: Stochastic RSI %K and %D stay within 0..=100
//! 4. Cooldown monotonicity: alerts per key are at least `cooldown` apart

use chrono::{DateTime, Duration, TimeZone, Utc};
use proptest::prelude::*;

use cipherscan_core::dedup::CooldownStore;
use cipherscan_core::domain::{Candle, CandleSeries, Direction, Timeframe};
use cipherscan_core::engine::IndicatorEngine;
use cipherscan_core::indicators::StochRsi;

// ── Strategies (proptest) ────────────────────────────────────────────

fn arb_returns(min: usize, max: usize) -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec(-0.05..0.05_f64, min..max)
}

fn walk(returns: &[f64]) -> Vec<Candle> {
    let base = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    let mut price = 100.0;
    returns
        .iter()
        .enumerate()
        .map(|(i, r)| {
            let open = price;
            let close = price * (1.0 + r);
            price = close;
            Candle {
                timestamp: base + Duration::minutes(15 * i as i64),
                open,
                high: open.max(close) * 1.01,
                low: open.min(close) * 0.99,
                close,
                volume: 500.0 + (i % 13) as f64 * 40.0,
            }
        })
        .collect()
}

fn series(candles: Vec<Candle>) -> CandleSeries {
    CandleSeries::new("PROP", Timeframe::M15, candles).unwrap()
}

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
}

// ── 1. Determinism ───────────────────────────────────────────────────

proptest! {
    #[test]
    fn readings_are_deterministic(returns in arb_returns(30, 200)) {
        let engine = IndicatorEngine::default();
        let s = series(walk(&returns));
        prop_assert_eq!(engine.readings(&s), engine.readings(&s.clone()));
    }
}

// ── 2. No Look-Ahead ─────────────────────────────────────────────────

proptest! {
    #[test]
    fn appending_candles_keeps_earlier_readings(
        returns in arb_returns(60, 200),
        cut in 30usize..60,
    ) {
        let engine = IndicatorEngine::default();
        let candles = walk(&returns);
        let full = engine.readings(&series(candles.clone()));
        let truncated = engine.readings(&series(candles[..cut].to_vec()));

        let prefix: Vec<_> = full.into_iter().filter(|r| r.index < cut).collect();
        prop_assert_eq!(prefix.len(), truncated.len());
        for (a, b) in prefix.iter().zip(&truncated) {
            prop_assert_eq!(a.index, b.index);
            prop_assert_eq!(a.candidate, b.candidate);
            prop_assert!((a.oscillator_value - b.oscillator_value).abs() < 1e-9);
            prop_assert!((a.signal_value - b.signal_value).abs() < 1e-9);
        }
    }
}

// ── 3. Bounded Oscillators ───────────────────────────────────────────

proptest! {
    #[test]
    fn stoch_rsi_is_bounded(returns in arb_returns(40, 200)) {
        let lines = StochRsi::default_params().lines(&walk(&returns));
        for v in lines.k.iter().chain(&lines.d).filter(|v| !v.is_nan()) {
            prop_assert!((-1e-9..=100.0 + 1e-9).contains(v), "out of range: {}", v);
        }
    }

    #[test]
    fn zone_flags_match_signal_line(returns in arb_returns(30, 200)) {
        let engine = IndicatorEngine::default();
        for r in engine.readings(&series(walk(&returns))) {
            prop_assert_eq!(r.is_oversold, r.signal_value <= -60.0);
            prop_assert_eq!(r.is_overbought, r.signal_value >= 60.0);
            match r.candidate {
                Some(Direction::Buy) => prop_assert!(r.is_oversold),
                Some(Direction::Sell) => prop_assert!(r.is_overbought),
                None => {}
            }
        }
    }
}

// ── 4. Cooldown Monotonicity ─────────────────────────────────────────

proptest! {
    /// Alerts recorded for one key are always at least one cooldown apart,
    /// and every suppression falls inside the window of the last alert.
    #[test]
    fn alerts_are_spaced_by_cooldown(mut offsets in prop::collection::vec(0i64..2_000, 1..60)) {
        offsets.sort_unstable();
        let cooldown = Duration::hours(2);
        let store = CooldownStore::in_memory(cooldown);
        let mut last_alert: Option<DateTime<Utc>> = None;

        for minutes in offsets {
            let ts = t0() + Duration::minutes(minutes);
            let decision = store.check_and_record("ETH", Direction::Sell, ts).unwrap();
            if decision.is_alert() {
                if let Some(last) = last_alert {
                    prop_assert!(ts - last >= cooldown);
                }
                last_alert = Some(ts);
            } else {
                let last = last_alert.unwrap();
                prop_assert!(ts - last < cooldown);
            }
        }
    }
}
