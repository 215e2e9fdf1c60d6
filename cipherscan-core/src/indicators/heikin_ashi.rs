//! Heikin-Ashi candle transform.
//!
//! ha_close = (open + high + low + close) / 4
//! ha_open  = (ha_open[t-1] + ha_close[t-1]) / 2, seeded with (open + close) / 2
//! ha_high  = max(high, ha_open, ha_close)
//! ha_low   = min(low, ha_open, ha_close)
//!
//! Timestamps and volume pass through unchanged. The seed makes the transform
//! path-dependent, so it is applied per contiguous segment.

use crate::domain::Candle;

pub fn heikin_ashi(candles: &[Candle]) -> Vec<Candle> {
    let mut out = Vec::with_capacity(candles.len());
    let mut prev: Option<(f64, f64)> = None;

    for c in candles {
        let ha_close = (c.open + c.high + c.low + c.close) / 4.0;
        let ha_open = match prev {
            Some((po, pc)) => (po + pc) / 2.0,
            None => (c.open + c.close) / 2.0,
        };
        out.push(Candle {
            timestamp: c.timestamp,
            open: ha_open,
            high: c.high.max(ha_open).max(ha_close),
            low: c.low.min(ha_open).min(ha_close),
            close: ha_close,
            volume: c.volume,
        });
        prev = Some((ha_open, ha_close));
    }

    out
}
