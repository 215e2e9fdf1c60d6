//! Build providers, sinks and the cooldown store from a `ScanConfig`.
//!
//! Each exchange gets its own circuit breaker so one blocked API does not
//! close off the fallbacks.

use std::sync::Arc;

use cipherscan_core::data::{
    BinanceProvider, BybitProvider, CandleProvider, CircuitBreaker, CoinGeckoSource,
    CsvDirectoryProvider, MarketMetadataSource, ProviderChain, ProviderError, SyntheticProvider,
    UniverseFile,
};
use cipherscan_core::dedup::{
    CooldownStore, DedupPersistence, JsonFileStore, MemoryStore, StoreError,
};

use crate::config::{CandleSource, ScanConfig, UniverseSource};
use crate::dispatch::{AlertSink, JsonlSink, LogSink};

/// Candle providers in configured order. A series shorter than the
/// indicators need counts as a miss and falls through to the next provider.
pub fn build_candle_chain(config: &ScanConfig) -> Result<ProviderChain, ProviderError> {
    let mut chain = ProviderChain::new(config.required_candles());
    for source in &config.sources.candles {
        let provider: Arc<dyn CandleProvider> = match source {
            CandleSource::Binance => Arc::new(BinanceProvider::new(Arc::new(
                CircuitBreaker::default_provider(),
            ))?),
            CandleSource::Bybit => Arc::new(BybitProvider::new(Arc::new(
                CircuitBreaker::default_provider(),
            ))?),
            CandleSource::Csv => {
                let dir = config.sources.csv_dir.clone().ok_or_else(|| {
                    ProviderError::Other("csv provider configured without csv_dir".into())
                })?;
                Arc::new(CsvDirectoryProvider::new(dir))
            }
            CandleSource::Synthetic => Arc::new(SyntheticProvider::live()),
        };
        chain.push(provider);
    }
    Ok(chain)
}

pub fn build_metadata_source(
    config: &ScanConfig,
) -> Result<Arc<dyn MarketMetadataSource>, ProviderError> {
    let sources = &config.sources;
    match sources.universe {
        UniverseSource::Coingecko => {
            let key = std::env::var(&sources.coingecko_key_env).ok();
            let source = CoinGeckoSource::new(Arc::new(CircuitBreaker::default_provider()))?
                .with_api_key(key)
                .with_pages(sources.coingecko_pages);
            Ok(Arc::new(source))
        }
        UniverseSource::File => {
            let path = sources.universe_file.clone().ok_or_else(|| {
                ProviderError::Other("file universe configured without universe_file".into())
            })?;
            Ok(Arc::new(UniverseFile::new(path)))
        }
    }
}

pub fn build_sinks(config: &ScanConfig) -> Vec<Box<dyn AlertSink>> {
    let mut sinks: Vec<Box<dyn AlertSink>> = Vec::new();
    if config.dispatch.log {
        sinks.push(Box::new(LogSink));
    }
    if let Some(path) = &config.dispatch.jsonl {
        sinks.push(Box::new(JsonlSink::new(path)));
    }
    sinks
}

pub fn open_cooldown_store(config: &ScanConfig) -> Result<CooldownStore, StoreError> {
    CooldownStore::open(
        Box::new(JsonFileStore::new(&config.cooldown.store)),
        config.cooldown.cooldown(),
    )
}

/// Store seeded from the configured file that never writes back to it.
pub fn open_dry_run_store(config: &ScanConfig) -> Result<CooldownStore, StoreError> {
    let snapshot = JsonFileStore::new(&config.cooldown.store).load()?;
    CooldownStore::open(
        Box::new(MemoryStore::with_snapshot(snapshot)),
        config.cooldown.cooldown(),
    )
}
