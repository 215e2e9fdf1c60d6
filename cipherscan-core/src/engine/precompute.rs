//! Per-segment indicator precomputation.
//!
//! Each contiguous segment of a series is computed from scratch; indicator
//! state never crosses a gap.

use crate::components::indicator::{Indicator, IndicatorValues};
use crate::domain::Candle;
use crate::indicators::{heikin_ashi, MoneyFlow, WaveTrend};

pub const OSCILLATOR: &str = "wt1";
pub const SIGNAL_LINE: &str = "wt2";
pub const MOMENTUM: &str = "mf";

/// Compute oscillator, signal line and momentum for one contiguous segment.
///
/// With `use_heikin_ashi` the candles are transformed first; money flow is
/// computed on the same input as the oscillator.
pub fn precompute_segment(
    candles: &[Candle],
    wavetrend: &WaveTrend,
    money_flow: &MoneyFlow,
    use_heikin_ashi: bool,
) -> IndicatorValues {
    let transformed;
    let input = if use_heikin_ashi {
        transformed = heikin_ashi(candles);
        transformed.as_slice()
    } else {
        candles
    };

    let lines = wavetrend.lines(input);
    let momentum = money_flow.compute(input);
    debug_assert_eq!(lines.wt1.len(), candles.len());
    debug_assert_eq!(momentum.len(), candles.len());

    let mut iv = IndicatorValues::new();
    iv.insert(OSCILLATOR, lines.wt1);
    iv.insert(SIGNAL_LINE, lines.wt2);
    iv.insert(MOMENTUM, momentum);
    iv
}

/// Number of candles a segment needs before the first complete reading.
pub fn compute_warmup(wavetrend: &WaveTrend, money_flow: &MoneyFlow) -> usize {
    (wavetrend.signal_lookback() + 1).max(money_flow.lookback() + 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::make_candles;

    #[test]
    fn precompute_stores_three_series() {
        let candles = make_candles(&[10.0, 11.0, 12.0, 13.0, 14.0, 15.0]);
        let iv = precompute_segment(&candles, &WaveTrend::new(2, 2, 2), &MoneyFlow::new(2), false);
        assert_eq!(iv.len(), 3);
        assert_eq!(iv.get_series(OSCILLATOR).map(<[f64]>::len), Some(6));
        assert!(iv.get_valid(SIGNAL_LINE, 5).is_some());
        assert!(iv.get_valid(MOMENTUM, 5).is_some());
    }

    #[test]
    fn heikin_ashi_changes_the_input() {
        let closes: Vec<f64> = (0..40).map(|i| 100.0 + 6.0 * (i as f64 * 0.5).sin()).collect();
        let candles = make_candles(&closes);
        let (wt, mf) = (WaveTrend::default_params(), MoneyFlow::new(14));
        let raw = precompute_segment(&candles, &wt, &mf, false);
        let ha = precompute_segment(&candles, &wt, &mf, true);
        assert_ne!(raw.get(OSCILLATOR, 39), ha.get(OSCILLATOR, 39));
    }

    #[test]
    fn warmup_defaults() {
        assert_eq!(compute_warmup(&WaveTrend::default_params(), &MoneyFlow::new(14)), 30);
        assert_eq!(compute_warmup(&WaveTrend::new(2, 2, 2), &MoneyFlow::new(40)), 41);
    }
}
