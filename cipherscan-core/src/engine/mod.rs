//! Indicator engine — turns a candle series into per-candle readings.
//!
//! The engine is a pure function of its input: every call recomputes each
//! contiguous segment from scratch and nothing survives between calls.
//!
//! 1. Split the series at gaps (void candles, missing intervals)
//! 2. Skip segments shorter than the warmup
//! 3. Precompute oscillator, signal line and money flow per segment
//! 4. Emit one reading per candle where every value is defined

pub mod precompute;

pub use precompute::{compute_warmup, precompute_segment};

use serde::{Deserialize, Serialize};

use crate::components::signal::{crossover_at, ZoneLevels};
use crate::domain::{CandleSeries, IndicatorReading};
use crate::indicators::{MoneyFlow, WaveTrend};
use precompute::{MOMENTUM, OSCILLATOR, SIGNAL_LINE};

/// Indicator engine parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub channel_len: usize,
    pub average_len: usize,
    pub signal_len: usize,
    pub oversold: f64,
    pub overbought: f64,
    pub money_flow_len: usize,
    pub heikin_ashi: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            channel_len: 9,
            average_len: 12,
            signal_len: 3,
            oversold: -60.0,
            overbought: 60.0,
            money_flow_len: 14,
            heikin_ashi: false,
        }
    }
}

impl EngineConfig {
    pub fn levels(&self) -> ZoneLevels {
        ZoneLevels {
            oversold: self.oversold,
            overbought: self.overbought,
        }
    }
}

#[derive(Debug, Clone)]
pub struct IndicatorEngine {
    config: EngineConfig,
    wavetrend: WaveTrend,
    money_flow: MoneyFlow,
    levels: ZoneLevels,
}

impl IndicatorEngine {
    /// Panics on zero lengths; configs are validated before they get here.
    pub fn new(config: EngineConfig) -> Self {
        let wavetrend = WaveTrend::new(config.channel_len, config.average_len, config.signal_len);
        let money_flow = MoneyFlow::new(config.money_flow_len);
        let levels = config.levels();
        Self {
            config,
            wavetrend,
            money_flow,
            levels,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn levels(&self) -> &ZoneLevels {
        &self.levels
    }

    /// Minimum segment length that yields a reading.
    pub fn lookback(&self) -> usize {
        compute_warmup(&self.wavetrend, &self.money_flow)
    }

    /// One reading per candle from the first fully defined candle onward, per segment.
    ///
    /// Readings are ordered by index. Candles inside a gap, and segments shorter
    /// than `lookback()`, produce nothing.
    pub fn readings(&self, series: &CandleSeries) -> Vec<IndicatorReading> {
        let candles = series.candles();
        let lookback = self.lookback();
        let mut readings = Vec::new();

        for segment in series.segments() {
            if segment.len() < lookback {
                continue;
            }
            let start = segment.start;
            let slice = &candles[segment];
            let iv = precompute_segment(
                slice,
                &self.wavetrend,
                &self.money_flow,
                self.config.heikin_ashi,
            );
            let (Some(osc), Some(sig)) = (iv.get_series(OSCILLATOR), iv.get_series(SIGNAL_LINE))
            else {
                continue;
            };

            for (j, candle) in slice.iter().enumerate() {
                let (Some(o), Some(s), Some(m)) = (
                    iv.get_valid(OSCILLATOR, j),
                    iv.get_valid(SIGNAL_LINE, j),
                    iv.get_valid(MOMENTUM, j),
                ) else {
                    continue;
                };
                readings.push(IndicatorReading {
                    index: start + j,
                    timestamp: candle.timestamp,
                    oscillator_value: o,
                    signal_value: s,
                    momentum_value: m,
                    is_overbought: self.levels.is_overbought(s),
                    is_oversold: self.levels.is_oversold(s),
                    candidate: crossover_at(osc, sig, j, &self.levels),
                });
            }
        }

        readings
    }
}

impl Default for IndicatorEngine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Candle, Timeframe};
    use crate::indicators::make_candles;

    fn sine_series(n: usize) -> CandleSeries {
        let closes: Vec<f64> = (0..n)
            .map(|i| 100.0 + 10.0 * (i as f64 * 0.3).sin())
            .collect();
        CandleSeries::new("BTC", Timeframe::M15, make_candles(&closes)).unwrap()
    }

    #[test]
    fn default_lookback_is_thirty() {
        assert_eq!(IndicatorEngine::default().lookback(), 30);
    }

    #[test]
    fn lookback_boundary() {
        let engine = IndicatorEngine::default();
        assert!(engine.readings(&sine_series(29)).is_empty());
        let readings = engine.readings(&sine_series(30));
        assert_eq!(readings.len(), 1);
        assert_eq!(readings[0].index, 29);
        // No previous signal value yet, so no crossover.
        assert_eq!(readings[0].candidate, None);
    }

    #[test]
    fn readings_are_deterministic() {
        let engine = IndicatorEngine::default();
        let series = sine_series(120);
        assert_eq!(engine.readings(&series), engine.readings(&series));
    }

    #[test]
    fn zone_flags_follow_signal_line() {
        let engine = IndicatorEngine::default();
        for r in engine.readings(&sine_series(200)) {
            assert_eq!(r.is_oversold, r.signal_value <= -60.0);
            assert_eq!(r.is_overbought, r.signal_value >= 60.0);
        }
    }

    #[test]
    fn void_candle_restarts_warmup() {
        let closes: Vec<f64> = (0..80).map(|i| 100.0 + (i as f64 * 0.2).sin()).collect();
        let mut candles: Vec<Candle> = make_candles(&closes);
        candles[40].close = f64::NAN;
        let series = CandleSeries::new("ETH", Timeframe::M15, candles).unwrap();
        let readings = IndicatorEngine::default().readings(&series);

        // Segment 0..40 yields indices 29..40, segment 41..80 yields 70..80.
        let indices: Vec<usize> = readings.iter().map(|r| r.index).collect();
        assert_eq!(indices.first(), Some(&29));
        assert!(indices.iter().all(|&i| i < 40 || i >= 70));
        assert_eq!(indices.iter().filter(|&&i| i >= 70).count(), 10);
    }

    #[test]
    fn segment_matches_standalone_computation() {
        let closes: Vec<f64> = (0..90).map(|i| 50.0 + 4.0 * (i as f64 * 0.25).cos()).collect();
        let mut candles = make_candles(&closes);
        candles[20].volume = f64::INFINITY;
        let tail = candles[21..].to_vec();

        let engine = IndicatorEngine::default();
        let full = engine.readings(&CandleSeries::new("X", Timeframe::M15, candles).unwrap());
        let alone = engine.readings(&CandleSeries::new("X", Timeframe::M15, tail).unwrap());

        assert_eq!(full.len(), alone.len());
        for (a, b) in full.iter().zip(&alone) {
            assert_eq!(a.index, b.index + 21);
            assert_eq!(a.oscillator_value, b.oscillator_value);
            assert_eq!(a.candidate, b.candidate);
        }
    }
}
