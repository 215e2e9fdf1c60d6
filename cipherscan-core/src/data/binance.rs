//! Binance spot kline provider.
//!
//! `GET /api/v3/klines?symbol=BTCUSDT&interval=15m&limit=N`. Each row is
//! `[open_time_ms, "open", "high", "low", "close", "volume", close_time_ms, ...]`,
//! oldest first. The still-open candle is dropped.

use chrono::{DateTime, Utc};
use serde_json::Value;
use std::sync::Arc;

use super::circuit_breaker::CircuitBreaker;
use super::http::HttpClient;
use super::provider::{CandleProvider, ProviderError};
use super::usdt_pair;
use crate::domain::{Candle, CandleSeries, Timeframe};

pub const DEFAULT_BASE_URL: &str = "https://api.binance.com";

/// Binance rejects larger `limit` values.
const MAX_LIMIT: usize = 1000;

pub struct BinanceProvider {
    http: HttpClient,
    base_url: String,
}

impl BinanceProvider {
    pub fn new(circuit_breaker: Arc<CircuitBreaker>) -> Result<Self, ProviderError> {
        Ok(Self {
            http: HttpClient::new(circuit_breaker)?,
            base_url: DEFAULT_BASE_URL.to_string(),
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

impl CandleProvider for BinanceProvider {
    fn name(&self) -> &str {
        "binance"
    }

    fn fetch_candles(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        limit: usize,
    ) -> Result<CandleSeries, ProviderError> {
        let pair = usdt_pair(symbol);
        let url = format!("{}/api/v3/klines", self.base_url);
        // One extra row: the newest one is usually still open.
        let query = [
            ("symbol", pair.clone()),
            ("interval", timeframe.as_str().to_string()),
            ("limit", (limit + 1).min(MAX_LIMIT).to_string()),
        ];
        let rows: Vec<Vec<Value>> = self.http.get_json(&url, &query, &[], &pair)?;
        let mut series = parse_klines(symbol, timeframe, &rows, Utc::now())?;
        if series.len() > limit {
            let keep = series.candles()[series.len() - limit..].to_vec();
            series = CandleSeries::new(symbol, timeframe, keep)?;
        }
        Ok(series)
    }

    fn is_available(&self) -> bool {
        self.http.is_allowed()
    }
}

/// Convert raw kline rows into a series, keeping only candles closed by `now`.
pub fn parse_klines(
    symbol: &str,
    timeframe: Timeframe,
    rows: &[Vec<Value>],
    now: DateTime<Utc>,
) -> Result<CandleSeries, ProviderError> {
    let mut candles = Vec::with_capacity(rows.len());

    for row in rows {
        if row.len() < 7 {
            return Err(ProviderError::ResponseFormatChanged(format!(
                "kline row has {} fields, expected at least 7",
                row.len()
            )));
        }
        let open_time = millis(&row[0])?;
        let close_time = millis(&row[6])?;
        if close_time > now {
            continue;
        }
        candles.push(Candle {
            timestamp: open_time,
            open: number(&row[1]),
            high: number(&row[2]),
            low: number(&row[3]),
            close: number(&row[4]),
            volume: number(&row[5]),
        });
    }

    Ok(CandleSeries::new(symbol, timeframe, candles)?)
}

fn millis(value: &Value) -> Result<DateTime<Utc>, ProviderError> {
    value
        .as_i64()
        .or_else(|| value.as_str().and_then(|s| s.parse().ok()))
        .and_then(DateTime::from_timestamp_millis)
        .ok_or_else(|| ProviderError::ResponseFormatChanged(format!("invalid timestamp: {value}")))
}

/// Prices arrive as strings; anything unparsable becomes NaN and is treated as a gap.
pub(crate) fn number(value: &Value) -> f64 {
    match value {
        Value::String(s) => s.parse().unwrap_or(f64::NAN),
        Value::Number(n) => n.as_f64().unwrap_or(f64::NAN),
        _ => f64::NAN,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn rows() -> Vec<Vec<Value>> {
        let t0 = Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap().timestamp_millis();
        let step = 15 * 60 * 1000;
        (0..3)
            .map(|i| {
                let open = t0 + i * step;
                json!([open, "100.5", "101.0", "99.5", "100.8", "1234.5", open + step - 1, "0", 10, "0", "0", "0"])
                    .as_array()
                    .cloned()
                    .unwrap()
            })
            .collect()
    }

    #[test]
    fn parses_closed_klines() {
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 1, 0, 0).unwrap();
        let series = parse_klines("BTC", Timeframe::M15, &rows(), now).unwrap();
        assert_eq!(series.len(), 3);
        let c = series.candles()[0];
        assert_eq!(c.open, 100.5);
        assert_eq!(c.close, 100.8);
        assert_eq!(c.volume, 1234.5);
        assert_eq!(c.timestamp, Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap());
    }

    #[test]
    fn drops_candle_still_open() {
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 0, 40, 0).unwrap();
        let series = parse_klines("BTC", Timeframe::M15, &rows(), now).unwrap();
        assert_eq!(series.len(), 2);
    }

    #[test]
    fn short_row_is_format_error() {
        let rows = vec![vec![json!(1), json!("1")]];
        let err = parse_klines("BTC", Timeframe::M15, &rows, Utc::now()).unwrap_err();
        assert!(matches!(err, ProviderError::ResponseFormatChanged(_)));
    }

    #[test]
    fn garbage_price_becomes_nan() {
        assert!(number(&json!("n/a")).is_nan());
        assert!(number(&Value::Null).is_nan());
        assert_eq!(number(&json!(2.5)), 2.5);
    }
}
