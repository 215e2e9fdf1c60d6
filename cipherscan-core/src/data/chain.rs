//! Ordered provider fallback.
//!
//! Providers are tried in order; the first one that returns a series with at
//! least `min_candles` candles wins. Every failure is kept so the caller can
//! report why a symbol had no data.

use std::sync::Arc;
use tracing::{debug, warn};

use super::provider::{CandleProvider, ProviderError};
use crate::domain::{CandleSeries, Timeframe};

#[derive(Clone)]
pub struct ProviderChain {
    providers: Vec<Arc<dyn CandleProvider>>,
    min_candles: usize,
}

impl ProviderChain {
    pub fn new(min_candles: usize) -> Self {
        Self {
            providers: Vec::new(),
            min_candles,
        }
    }

    pub fn with_provider(mut self, provider: Arc<dyn CandleProvider>) -> Self {
        self.providers.push(provider);
        self
    }

    pub fn push(&mut self, provider: Arc<dyn CandleProvider>) {
        self.providers.push(provider);
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    pub fn min_candles(&self) -> usize {
        self.min_candles
    }

    pub fn provider_names(&self) -> Vec<&str> {
        self.providers.iter().map(|p| p.name()).collect()
    }
}

impl std::fmt::Debug for ProviderChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderChain")
            .field("providers", &self.provider_names())
            .field("min_candles", &self.min_candles)
            .finish()
    }
}

impl CandleProvider for ProviderChain {
    fn name(&self) -> &str {
        "chain"
    }

    fn fetch_candles(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        limit: usize,
    ) -> Result<CandleSeries, ProviderError> {
        let mut errors = Vec::new();

        for provider in &self.providers {
            if !provider.is_available() {
                errors.push(format!("{}: unavailable", provider.name()));
                continue;
            }

            match provider.fetch_candles(symbol, timeframe, limit) {
                Ok(series) if series.len() >= self.min_candles => {
                    debug!(
                        symbol,
                        provider = provider.name(),
                        candles = series.len(),
                        "fetched candles"
                    );
                    return Ok(series);
                }
                Ok(series) => {
                    let err = ProviderError::TooFewCandles {
                        provider: provider.name().to_string(),
                        symbol: symbol.to_string(),
                        got: series.len(),
                        need: self.min_candles,
                    };
                    debug!(symbol, provider = provider.name(), "{err}");
                    errors.push(err.to_string());
                }
                Err(e) => {
                    warn!(symbol, provider = provider.name(), error = %e, "provider failed");
                    errors.push(format!("{}: {e}", provider.name()));
                }
            }
        }

        Err(ProviderError::Exhausted {
            symbol: symbol.to_string(),
            errors,
        })
    }

    fn is_available(&self) -> bool {
        self.providers.iter().any(|p| p.is_available())
    }
}
