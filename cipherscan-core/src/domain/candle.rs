//! Candle and CandleSeries — the input to all indicator math.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Range;
use std::str::FromStr;
use thiserror::Error;

/// Candle interval supported by the scanner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Timeframe {
    #[serde(rename = "1m")]
    M1,
    #[serde(rename = "5m")]
    M5,
    #[serde(rename = "15m")]
    M15,
    #[serde(rename = "30m")]
    M30,
    #[serde(rename = "1h")]
    H1,
    #[serde(rename = "2h")]
    H2,
    #[serde(rename = "4h")]
    H4,
    #[serde(rename = "1d")]
    D1,
}

impl Timeframe {
    pub const ALL: [Timeframe; 8] = [
        Timeframe::M1,
        Timeframe::M5,
        Timeframe::M15,
        Timeframe::M30,
        Timeframe::H1,
        Timeframe::H2,
        Timeframe::H4,
        Timeframe::D1,
    ];

    pub fn minutes(&self) -> i64 {
        match self {
            Timeframe::M1 => 1,
            Timeframe::M5 => 5,
            Timeframe::M15 => 15,
            Timeframe::M30 => 30,
            Timeframe::H1 => 60,
            Timeframe::H2 => 120,
            Timeframe::H4 => 240,
            Timeframe::D1 => 1440,
        }
    }

    pub fn duration(&self) -> Duration {
        Duration::minutes(self.minutes())
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Timeframe::M1 => "1m",
            Timeframe::M5 => "5m",
            Timeframe::M15 => "15m",
            Timeframe::M30 => "30m",
            Timeframe::H1 => "1h",
            Timeframe::H2 => "2h",
            Timeframe::H4 => "4h",
            Timeframe::D1 => "1d",
        }
    }

    /// Floor a timestamp to the open time of the candle containing it.
    pub fn floor(&self, ts: DateTime<Utc>) -> DateTime<Utc> {
        let step = self.minutes() * 60;
        let secs = ts.timestamp().div_euclid(step) * step;
        DateTime::from_timestamp(secs, 0).unwrap_or(ts)
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Timeframe {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Timeframe::ALL
            .iter()
            .copied()
            .find(|tf| tf.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown timeframe '{s}'"))
    }
}

/// One OHLCV candle. `timestamp` is the candle open time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Candle {
    /// Returns true if any OHLCV field is missing (NaN or infinite) or a price
    /// is not positive. Void candles are hard gaps for the indicator math.
    pub fn is_void(&self) -> bool {
        let prices = [self.open, self.high, self.low, self.close];
        !(prices.iter().all(|p| p.is_finite() && *p > 0.0) && self.volume.is_finite())
    }

    /// Basic OHLCV sanity check: high >= low, high >= open, high >= close, etc.
    pub fn is_sane(&self) -> bool {
        if self.is_void() {
            return false;
        }
        self.high >= self.low
            && self.high >= self.open
            && self.high >= self.close
            && self.low <= self.open
            && self.low <= self.close
            && self.open > 0.0
            && self.close > 0.0
            && self.volume >= 0.0
    }

    /// Typical price: (high + low + close) / 3.
    pub fn hlc3(&self) -> f64 {
        (self.high + self.low + self.close) / 3.0
    }
}

/// Structural errors rejected at series construction.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SeriesError {
    #[error("candle {index} at {timestamp} is earlier than the previous candle")]
    OutOfOrder {
        index: usize,
        timestamp: DateTime<Utc>,
    },

    #[error("duplicate timestamp {timestamp} at candle {index}")]
    DuplicateTimestamp {
        index: usize,
        timestamp: DateTime<Utc>,
    },
}

/// Why a contiguous run of candles was broken.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GapKind {
    /// The candle itself carries a NaN / missing field.
    VoidCandle,
    /// One or more candles are missing before this one.
    MissingInterval,
}

/// A hard break in the series. Indicator state never crosses a gap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Gap {
    pub index: usize,
    pub timestamp: DateTime<Utc>,
    pub kind: GapKind,
}

/// Ordered candles for one (symbol, timeframe) pair.
///
/// Timestamps are strictly increasing. The series is immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandleSeries {
    symbol: String,
    timeframe: Timeframe,
    candles: Vec<Candle>,
}

impl CandleSeries {
    pub fn new(
        symbol: impl Into<String>,
        timeframe: Timeframe,
        candles: Vec<Candle>,
    ) -> Result<Self, SeriesError> {
        for (i, pair) in candles.windows(2).enumerate() {
            let (prev, cur) = (&pair[0], &pair[1]);
            if cur.timestamp == prev.timestamp {
                return Err(SeriesError::DuplicateTimestamp {
                    index: i + 1,
                    timestamp: cur.timestamp,
                });
            }
            if cur.timestamp < prev.timestamp {
                return Err(SeriesError::OutOfOrder {
                    index: i + 1,
                    timestamp: cur.timestamp,
                });
            }
        }
        Ok(Self {
            symbol: symbol.into(),
            timeframe,
            candles,
        })
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn timeframe(&self) -> Timeframe {
        self.timeframe
    }

    pub fn candles(&self) -> &[Candle] {
        &self.candles
    }

    pub fn len(&self) -> usize {
        self.candles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candles.is_empty()
    }

    pub fn last(&self) -> Option<&Candle> {
        self.candles.last()
    }

    /// Maximal runs of usable candles, split at every gap.
    pub fn segments(&self) -> Vec<Range<usize>> {
        self.partition().0
    }

    /// Every hard break in the series, in order.
    pub fn gaps(&self) -> Vec<Gap> {
        self.partition().1
    }

    fn partition(&self) -> (Vec<Range<usize>>, Vec<Gap>) {
        let interval = self.timeframe.duration();
        let mut segments = Vec::new();
        let mut gaps = Vec::new();
        let mut start: Option<usize> = None;

        for (i, candle) in self.candles.iter().enumerate() {
            if candle.is_void() {
                if let Some(s) = start.take() {
                    segments.push(s..i);
                }
                gaps.push(Gap {
                    index: i,
                    timestamp: candle.timestamp,
                    kind: GapKind::VoidCandle,
                });
                continue;
            }

            if let Some(s) = start {
                if candle.timestamp - self.candles[i - 1].timestamp > interval {
                    segments.push(s..i);
                    gaps.push(Gap {
                        index: i,
                        timestamp: candle.timestamp,
                        kind: GapKind::MissingInterval,
                    });
                    start = Some(i);
                }
            } else {
                start = Some(i);
            }
        }

        if let Some(s) = start {
            segments.push(s..self.candles.len());
        }

        (segments, gaps)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts(minute: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap() + Duration::minutes(minute)
    }

    fn candle(minute: i64, close: f64) -> Candle {
        Candle {
            timestamp: ts(minute),
            open: close,
            high: close + 1.0,
            low: close - 1.0,
            close,
            volume: 10.0,
        }
    }

    #[test]
    fn candle_is_sane() {
        assert!(candle(0, 100.0).is_sane());
    }

    #[test]
    fn candle_detects_void() {
        let mut c = candle(0, 100.0);
        c.volume = f64::NAN;
        assert!(c.is_void());
        assert!(!c.is_sane());

        let mut zero = candle(0, 100.0);
        zero.low = 0.0;
        assert!(zero.is_void());
    }

    #[test]
    fn hlc3_is_typical_price() {
        let c = Candle {
            timestamp: ts(0),
            open: 1.0,
            high: 12.0,
            low: 6.0,
            close: 9.0,
            volume: 1.0,
        };
        assert_eq!(c.hlc3(), 9.0);
    }

    #[test]
    fn series_rejects_duplicates() {
        let err = CandleSeries::new("BTC", Timeframe::M15, vec![candle(0, 1.0), candle(0, 2.0)])
            .unwrap_err();
        assert!(matches!(err, SeriesError::DuplicateTimestamp { index: 1, .. }));
    }

    #[test]
    fn series_rejects_out_of_order() {
        let err = CandleSeries::new(
            "BTC",
            Timeframe::M15,
            vec![candle(30, 1.0), candle(15, 2.0)],
        )
        .unwrap_err();
        assert!(matches!(err, SeriesError::OutOfOrder { index: 1, .. }));
    }

    #[test]
    fn contiguous_series_is_one_segment() {
        let candles = (0..5).map(|i| candle(i * 15, 100.0)).collect();
        let series = CandleSeries::new("BTC", Timeframe::M15, candles).unwrap();
        assert_eq!(series.segments(), vec![0..5]);
        assert!(series.gaps().is_empty());
    }

    #[test]
    fn void_candle_splits_segments() {
        let mut candles: Vec<Candle> = (0..6).map(|i| candle(i * 15, 100.0)).collect();
        candles[2].close = f64::NAN;
        let series = CandleSeries::new("BTC", Timeframe::M15, candles).unwrap();
        assert_eq!(series.segments(), vec![0..2, 3..6]);
        let gaps = series.gaps();
        assert_eq!(gaps.len(), 1);
        assert_eq!(gaps[0].index, 2);
        assert_eq!(gaps[0].kind, GapKind::VoidCandle);
    }

    #[test]
    fn missing_interval_splits_segments() {
        let candles = vec![candle(0, 1.0), candle(15, 1.0), candle(60, 1.0), candle(75, 1.0)];
        let series = CandleSeries::new("BTC", Timeframe::M15, candles).unwrap();
        assert_eq!(series.segments(), vec![0..2, 2..4]);
        assert_eq!(series.gaps()[0].kind, GapKind::MissingInterval);
    }

    #[test]
    fn timeframe_parse_and_floor() {
        assert_eq!("15m".parse::<Timeframe>().unwrap(), Timeframe::M15);
        assert_eq!("4H".parse::<Timeframe>().unwrap(), Timeframe::H4);
        assert!("3h".parse::<Timeframe>().is_err());
        let t = ts(37);
        assert_eq!(Timeframe::M15.floor(t), ts(30));
    }
}
