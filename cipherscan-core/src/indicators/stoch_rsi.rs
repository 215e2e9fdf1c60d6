//! Stochastic RSI.
//!
//! RSI(close, rsi_period) normalised to 0..100 against its own min/max over
//! `stoch_period`, then smoothed: %K = SMA(stoch, k_smooth), %D = SMA(%K, d_smooth).
//! A flat RSI window (max == min) gives 0.
//!
//! Lookback of %D: rsi_period + (stoch_period-1) + (k_smooth-1) + (d_smooth-1).

use super::rsi::rsi_of_series;
use super::sma::sma_of_series;
use crate::components::indicator::Indicator;
use crate::domain::Candle;

#[derive(Debug, Clone)]
pub struct StochRsi {
    rsi_period: usize,
    stoch_period: usize,
    k_smooth: usize,
    d_smooth: usize,
    name: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StochRsiLines {
    pub rsi: Vec<f64>,
    pub k: Vec<f64>,
    pub d: Vec<f64>,
}

impl StochRsi {
    pub fn new(rsi_period: usize, stoch_period: usize, k_smooth: usize, d_smooth: usize) -> Self {
        assert!(rsi_period >= 1, "RSI period must be >= 1");
        assert!(stoch_period >= 1, "stochastic period must be >= 1");
        assert!(k_smooth >= 1 && d_smooth >= 1, "smoothing lengths must be >= 1");
        Self {
            rsi_period,
            stoch_period,
            k_smooth,
            d_smooth,
            name: format!("stoch_rsi_d_{rsi_period}_{stoch_period}_{k_smooth}_{d_smooth}"),
        }
    }

    /// 14 / 14 / 3 / 3.
    pub fn default_params() -> Self {
        Self::new(14, 14, 3, 3)
    }

    /// Index of the first defined %K value.
    pub fn k_lookback(&self) -> usize {
        self.rsi_period + (self.stoch_period - 1) + (self.k_smooth - 1)
    }

    pub fn lines(&self, candles: &[Candle]) -> StochRsiLines {
        let closes: Vec<f64> = candles.iter().map(|c| c.close).collect();
        let rsi = rsi_of_series(&closes, self.rsi_period);
        let stoch = stochastic_of_series(&rsi, self.stoch_period);
        let k = sma_of_series(&stoch, self.k_smooth);
        let d = sma_of_series(&k, self.d_smooth);
        StochRsiLines { rsi, k, d }
    }
}

impl Indicator for StochRsi {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.k_lookback() + (self.d_smooth - 1)
    }

    fn compute(&self, candles: &[Candle]) -> Vec<f64> {
        self.lines(candles).d
    }
}

/// Min-max normalisation of a series over a trailing window, scaled to 0..100.
fn stochastic_of_series(values: &[f64], period: usize) -> Vec<f64> {
    let n = values.len();
    let mut result = vec![f64::NAN; n];
    if period == 0 || n < period {
        return result;
    }

    for i in (period - 1)..n {
        let window = &values[(i + 1 - period)..=i];
        if window.iter().any(|v| v.is_nan()) {
            continue;
        }
        let lo = window.iter().copied().fold(f64::INFINITY, f64::min);
        let hi = window.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        result[i] = if hi == lo {
            0.0
        } else {
            (values[i] - lo) / (hi - lo) * 100.0
        };
    }

    result
}
