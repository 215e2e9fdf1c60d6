//! Crossover detection between the WaveTrend oscillator and its signal line.
//!
//! Fires Buy when the oscillator crosses above the signal line while the signal
//! line sits in the oversold zone. Fires Sell when it crosses below while the
//! signal line sits in the overbought zone. Equal current values never cross.

use serde::{Deserialize, Serialize};

use crate::domain::Direction;

/// Oscillator zone boundaries (inclusive).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ZoneLevels {
    pub oversold: f64,
    pub overbought: f64,
}

impl Default for ZoneLevels {
    fn default() -> Self {
        Self {
            oversold: -60.0,
            overbought: 60.0,
        }
    }
}

impl ZoneLevels {
    pub fn is_oversold(&self, value: f64) -> bool {
        value <= self.oversold
    }

    pub fn is_overbought(&self, value: f64) -> bool {
        value >= self.overbought
    }
}

/// Crossover candidate at `index`, if any.
///
/// Needs both lines defined at `index` and `index - 1`; otherwise `None`.
pub fn crossover_at(
    oscillator: &[f64],
    signal: &[f64],
    index: usize,
    levels: &ZoneLevels,
) -> Option<Direction> {
    if index == 0 || index >= oscillator.len() || index >= signal.len() {
        return None;
    }

    let osc_cur = oscillator[index];
    let sig_cur = signal[index];
    let osc_prev = oscillator[index - 1];
    let sig_prev = signal[index - 1];

    if osc_cur.is_nan() || sig_cur.is_nan() || osc_prev.is_nan() || sig_prev.is_nan() {
        return None;
    }

    // Current: osc > sig. Previous: osc <= sig.
    if osc_cur > sig_cur && osc_prev <= sig_prev && levels.is_oversold(sig_cur) {
        return Some(Direction::Buy);
    }

    // Current: osc < sig. Previous: osc >= sig.
    if osc_cur < sig_cur && osc_prev >= sig_prev && levels.is_overbought(sig_cur) {
        return Some(Direction::Sell);
    }

    None
}

/// Crossover candidates for every index of the two lines.
pub fn detect_crossovers(
    oscillator: &[f64],
    signal: &[f64],
    levels: &ZoneLevels,
) -> Vec<Option<Direction>> {
    (0..oscillator.len().min(signal.len()))
        .map(|i| crossover_at(oscillator, signal, i, levels))
        .collect()
}
