//! Bybit v5 spot kline provider.
//!
//! `GET /v5/market/kline?category=spot&symbol=BTCUSDT&interval=15&limit=N`.
//! Rows are `[start_ms, open, high, low, close, volume, turnover]` as strings,
//! newest first.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;

use super::binance::number;
use super::circuit_breaker::CircuitBreaker;
use super::http::HttpClient;
use super::provider::{CandleProvider, ProviderError};
use super::usdt_pair;
use crate::domain::{Candle, CandleSeries, Timeframe};

pub const DEFAULT_BASE_URL: &str = "https://api.bybit.com";

const MAX_LIMIT: usize = 1000;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KlineResponse {
    ret_code: i64,
    ret_msg: String,
    result: Option<KlineResult>,
}

#[derive(Debug, Deserialize)]
struct KlineResult {
    #[serde(default)]
    list: Vec<Vec<Value>>,
}

pub struct BybitProvider {
    http: HttpClient,
    base_url: String,
}

impl BybitProvider {
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

/// Bybit interval code: minutes for intraday, `D` for daily.
pub fn interval_code(timeframe: Timeframe) -> String {
    match timeframe {
        Timeframe::D1 => "D".to_string(),
        tf => tf.minutes().to_string(),
    }
}

impl CandleProvider for BybitProvider {
    fn name(&self) -> &str {
        "bybit"
    }

    fn fetch_candles(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        limit: usize,
    ) -> Result<CandleSeries, ProviderError> {
        let pair = usdt_pair(symbol);
        let url = format!("{}/v5/market/kline", self.base_url);
        let query = [
            ("category", "spot".to_string()),
            ("symbol", pair.clone()),
            ("interval", interval_code(timeframe)),
            ("limit", (limit + 1).min(MAX_LIMIT).to_string()),
        ];
        let resp: KlineResponse = self.http.get_json(&url, &query, &[], &pair)?;
        let mut series = parse_response(symbol, timeframe, resp, Utc::now())?;
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

/// Convert a kline response into an oldest-first series of closed candles.
pub fn parse_response(
    symbol: &str,
    timeframe: Timeframe,
    resp: KlineResponse,
    now: DateTime<Utc>,
) -> Result<CandleSeries, ProviderError> {
    if resp.ret_code != 0 {
        return if resp.ret_msg.to_ascii_lowercase().contains("symbol") {
            Err(ProviderError::SymbolNotFound {
                symbol: symbol.to_string(),
            })
        } else {
            Err(ProviderError::ResponseFormatChanged(format!(
                "retCode {}: {}",
                resp.ret_code, resp.ret_msg
            )))
        };
    }

    let rows = resp
        .result
        .ok_or_else(|| ProviderError::ResponseFormatChanged("missing result".into()))?
        .list;

    let mut candles = Vec::with_capacity(rows.len());
    for row in rows.iter().rev() {
        if row.len() < 6 {
            return Err(ProviderError::ResponseFormatChanged(format!(
                "kline row has {} fields, expected at least 6",
                row.len()
            )));
        }
        let start = row[0]
            .as_str()
            .and_then(|s| s.parse::<i64>().ok())
            .or_else(|| row[0].as_i64())
            .and_then(DateTime::from_timestamp_millis)
            .ok_or_else(|| {
                ProviderError::ResponseFormatChanged(format!("invalid timestamp: {}", row[0]))
            })?;
        if start + timeframe.duration() > now {
            continue;
        }
        candles.push(Candle {
            timestamp: start,
            open: number(&row[1]),
            high: number(&row[2]),
            low: number(&row[3]),
            close: number(&row[4]),
            volume: number(&row[5]),
        });
    }

    Ok(CandleSeries::new(symbol, timeframe, candles)?)
}
