//! Market data traits and structured error types.
//!
//! `CandleProvider` abstracts over candle sources (exchange REST APIs, CSV
//! directories, synthetic data) so they can be chained and mocked in tests.
//! `MarketMetadataSource` supplies the per-cycle universe snapshot.

use thiserror::Error;

use super::universe::UniverseEntry;
use crate::domain::{CandleSeries, SeriesError, Timeframe};

/// Structured error types for data operations.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("network unreachable: {0}")]
    NetworkUnreachable(String),

    #[error("rate limited by provider (retry after {retry_after_secs}s)")]
    RateLimited { retry_after_secs: u64 },

    #[error("response format changed: {0}")]
    ResponseFormatChanged(String),

    #[error("authentication required: {0}")]
    AuthenticationRequired(String),

    #[error("symbol not found: {symbol}")]
    SymbolNotFound { symbol: String },

    #[error("hard stop: provider has blocked requests (circuit breaker tripped)")]
    CircuitBreakerTripped,

    #[error("{provider} returned {got} candles for {symbol}, need at least {need}")]
    TooFewCandles {
        provider: String,
        symbol: String,
        got: usize,
        need: usize,
    },

    #[error("invalid series: {0}")]
    InvalidSeries(#[from] SeriesError),

    #[error("all providers failed for {symbol}: {}", .errors.join("; "))]
    Exhausted { symbol: String, errors: Vec<String> },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("data error: {0}")]
    Other(String),
}

/// Source of OHLCV candles for one (symbol, timeframe).
///
/// Implementations return the most recent `limit` closed candles, oldest first.
pub trait CandleProvider: Send + Sync {
    /// Human-readable name of this provider.
    fn name(&self) -> &str;

    fn fetch_candles(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        limit: usize,
    ) -> Result<CandleSeries, ProviderError>;

    /// Check if the provider is currently available (not rate-limited, not blocked).
    fn is_available(&self) -> bool {
        true
    }
}

/// Source of the market metadata snapshot used by the universe filter.
pub trait MarketMetadataSource: Send + Sync {
    fn name(&self) -> &str;

    fn fetch_universe(&self) -> Result<Vec<UniverseEntry>, ProviderError>;
}
