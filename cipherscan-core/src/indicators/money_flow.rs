//! Money-flow momentum.
//!
//! Volume-weighted average percentage change of the typical price:
//! MF = EMA(pct_change(hlc3) * 100 * volume, m) / EMA(volume, m)
//! Index 0 has no change and is NaN in both series so the two EMAs share one
//! seed window. A zero volume average yields 0.
//! Lookback: m.

use super::ema::ema_of_series;
use crate::components::indicator::Indicator;
use crate::domain::Candle;

#[derive(Debug, Clone)]
pub struct MoneyFlow {
    period: usize,
    name: String,
}

impl MoneyFlow {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "money flow period must be >= 1");
        Self {
            period,
            name: format!("mf_{period}"),
        }
    }
}

impl Indicator for MoneyFlow {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period
    }

    fn compute(&self, candles: &[Candle]) -> Vec<f64> {
        let n = candles.len();
        let mut weighted = vec![f64::NAN; n];
        let mut volume = vec![f64::NAN; n];

        for i in 1..n {
            let prev = candles[i - 1].hlc3();
            let cur = candles[i].hlc3();
            let v = candles[i].volume;
            if prev == 0.0 || !prev.is_finite() || !cur.is_finite() || !v.is_finite() {
                continue;
            }
            weighted[i] = (cur - prev) / prev * 100.0 * v;
            volume[i] = v;
        }

        let num = ema_of_series(&weighted, self.period);
        let den = ema_of_series(&volume, self.period);

        num.iter()
            .zip(&den)
            .map(|(&n, &d)| {
                if n.is_nan() || d.is_nan() {
                    f64::NAN
                } else if d == 0.0 {
                    0.0
                } else {
                    n / d
                }
            })
            .collect()
    }
}
