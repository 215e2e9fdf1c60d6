//! WaveTrend oscillator.
//!
//! src  = hlc3
//! esa  = EMA(src, n1)
//! de   = EMA(|src - esa|, n1)
//! ci   = (src - esa) / (0.015 * de), 0 when de == 0
//! wt1  = EMA(ci, n2)        (oscillator)
//! wt2  = SMA(wt1, n3)       (signal line)
//!
//! Lookback: wt1 is first defined at 2*(n1-1) + (n2-1), wt2 at that plus n3-1.

use super::ema::ema_of_series;
use super::sma::sma_of_series;
use crate::components::indicator::Indicator;
use crate::domain::Candle;

/// Scaling constant of the channel index.
pub const CI_COEFFICIENT: f64 = 0.015;

#[derive(Debug, Clone)]
pub struct WaveTrend {
    channel_len: usize,
    average_len: usize,
    signal_len: usize,
    name: String,
}

/// Both WaveTrend lines, aligned with the input candles.
#[derive(Debug, Clone, PartialEq)]
pub struct WaveTrendLines {
    pub wt1: Vec<f64>,
    pub wt2: Vec<f64>,
}

impl WaveTrend {
    pub fn new(channel_len: usize, average_len: usize, signal_len: usize) -> Self {
        assert!(channel_len >= 1, "WaveTrend channel length must be >= 1");
        assert!(average_len >= 1, "WaveTrend average length must be >= 1");
        assert!(signal_len >= 1, "WaveTrend signal length must be >= 1");
        Self {
            channel_len,
            average_len,
            signal_len,
            name: format!("wt1_{channel_len}_{average_len}"),
        }
    }

    /// 9 / 12 / 3.
    pub fn default_params() -> Self {
        Self::new(9, 12, 3)
    }

    pub fn channel_len(&self) -> usize {
        self.channel_len
    }

    pub fn average_len(&self) -> usize {
        self.average_len
    }

    pub fn signal_len(&self) -> usize {
        self.signal_len
    }

    /// Index of the first defined signal-line value.
    pub fn signal_lookback(&self) -> usize {
        self.lookback() + self.signal_len - 1
    }

    /// Compute the oscillator and the signal line in one pass.
    pub fn lines(&self, candles: &[Candle]) -> WaveTrendLines {
        let src: Vec<f64> = candles.iter().map(Candle::hlc3).collect();
        let esa = ema_of_series(&src, self.channel_len);

        let deviation: Vec<f64> = src
            .iter()
            .zip(&esa)
            .map(|(s, e)| (s - e).abs())
            .collect();
        let de = ema_of_series(&deviation, self.channel_len);

        let ci: Vec<f64> = src
            .iter()
            .zip(esa.iter().zip(&de))
            .map(|(s, (e, d))| {
                if d.is_nan() || e.is_nan() {
                    f64::NAN
                } else if *d == 0.0 {
                    0.0
                } else {
                    (s - e) / (CI_COEFFICIENT * d)
                }
            })
            .collect();

        let wt1 = ema_of_series(&ci, self.average_len);
        let wt2 = sma_of_series(&wt1, self.signal_len);
        WaveTrendLines { wt1, wt2 }
    }
}

impl Indicator for WaveTrend {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        2 * (self.channel_len - 1) + (self.average_len - 1)
    }

    fn compute(&self, candles: &[Candle]) -> Vec<f64> {
        self.lines(candles).wt1
    }
}
