//! Indicator engine integration tests: lookback boundary, crossovers, gaps.

use chrono::{DateTime, Duration, TimeZone, Utc};
use cipherscan_core::domain::{Candle, CandleSeries, Direction, Timeframe};
use cipherscan_core::engine::{EngineConfig, IndicatorEngine};

fn base() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap()
}

fn candle(i: usize, close: f64, prev: f64) -> Candle {
    Candle {
        timestamp: base() + Duration::minutes(15 * i as i64),
        open: prev,
        high: prev.max(close) + 1.0,
        low: prev.min(close) - 1.0,
        close,
        volume: 1000.0 + (i % 7) as f64 * 50.0,
    }
}

fn series_from_closes(closes: &[f64]) -> CandleSeries {
    let candles = closes
        .iter()
        .enumerate()
        .map(|(i, &c)| candle(i, c, if i == 0 { c } else { closes[i - 1] }))
        .collect();
    CandleSeries::new("TEST", Timeframe::M15, candles).unwrap()
}

fn wave(n: usize) -> Vec<f64> {
    (0..n)
        .map(|i| 100.0 + (i as f64 * 0.3).sin() * 8.0 + i as f64 * 0.05)
        .collect()
}

#[test]
fn lookback_boundary() {
    let engine = IndicatorEngine::default();
    let lookback = engine.lookback();
    assert_eq!(lookback, 30);

    assert!(engine.readings(&series_from_closes(&wave(lookback - 1))).is_empty());

    let readings = engine.readings(&series_from_closes(&wave(lookback)));
    assert_eq!(readings.len(), 1);
    assert_eq!(readings[0].index, lookback - 1);
}

#[test]
fn readings_are_deterministic() {
    let engine = IndicatorEngine::default();
    let series = series_from_closes(&wave(300));
    assert_eq!(engine.readings(&series), engine.readings(&series));
}

#[test]
fn reversal_after_decline_fires_buy() {
    // Steady decline pins the oscillator near its oversold floor, a capitulation
    // candle pushes it under the signal line, then a sharp reversal lifts it
    // back through.
    let mut closes: Vec<f64> = (0..99).map(|i| 300.0 - i as f64).collect();
    closes.push(closes[98] - 10.0);
    let bottom = closes[99];
    closes.extend((1..=10).map(|i| bottom + 8.0 * i as f64));

    let readings = IndicatorEngine::default().readings(&series_from_closes(&closes));
    let buys: Vec<_> = readings
        .iter()
        .filter(|r| r.candidate == Some(Direction::Buy) && (100..=102).contains(&r.index))
        .collect();

    assert!(!buys.is_empty(), "expected a buy candidate after the reversal");
    assert!(buys.iter().all(|r| r.is_oversold));
    assert!(readings.iter().all(|r| r.candidate != Some(Direction::Sell)));
}

#[test]
fn candidates_respect_zone_levels() {
    let config = EngineConfig {
        oversold: -1000.0,
        overbought: 1000.0,
        ..EngineConfig::default()
    };
    let readings = IndicatorEngine::new(config).readings(&series_from_closes(&wave(400)));
    assert!(!readings.is_empty());
    assert!(readings.iter().all(|r| r.candidate.is_none()));
}

#[test]
fn missing_interval_restarts_warmup() {
    let closes = wave(80);
    let mut candles: Vec<Candle> = closes
        .iter()
        .enumerate()
        .map(|(i, &c)| candle(i, c, if i == 0 { c } else { closes[i - 1] }))
        .collect();
    // Shift the second half by one extra interval.
    for c in candles.iter_mut().skip(40) {
        c.timestamp += Duration::minutes(15);
    }
    let series = CandleSeries::new("GAP", Timeframe::M15, candles).unwrap();
    assert_eq!(series.segments(), vec![0..40, 40..80]);

    let engine = IndicatorEngine::default();
    let readings = engine.readings(&series);
    let first: Vec<_> = readings.iter().filter(|r| r.index < 40).collect();
    let second: Vec<_> = readings.iter().filter(|r| r.index >= 40).collect();

    assert_eq!(first.first().map(|r| r.index), Some(29));
    assert_eq!(second.first().map(|r| r.index), Some(40 + 29));
    assert_eq!(readings.len(), 11 + 11);
}

#[test]
fn void_candle_emits_nothing_in_its_range() {
    let closes = wave(50);
    let mut candles: Vec<Candle> = closes
        .iter()
        .enumerate()
        .map(|(i, &c)| candle(i, c, if i == 0 { c } else { closes[i - 1] }))
        .collect();
    candles[45].close = f64::NAN;
    let series = CandleSeries::new("VOID", Timeframe::M15, candles).unwrap();

    let readings = IndicatorEngine::default().readings(&series);
    assert!(readings.iter().all(|r| r.index < 45));
    assert_eq!(readings.len(), 45 - 29);
}

#[test]
fn heikin_ashi_changes_readings() {
    let series = series_from_closes(&wave(200));
    let plain = IndicatorEngine::default().readings(&series);
    let smoothed = IndicatorEngine::new(EngineConfig {
        heikin_ashi: true,
        ..EngineConfig::default()
    })
    .readings(&series);

    assert_eq!(plain.len(), smoothed.len());
    assert_ne!(plain, smoothed);
}
