//! Market data: universe filtering, provider traits and concrete sources.

pub mod binance;
pub mod bybit;
pub mod chain;
pub mod circuit_breaker;
pub mod coingecko;
pub mod csv_source;
pub mod http;
pub mod provider;
pub mod synthetic;
pub mod universe;
pub mod universe_file;

pub use binance::BinanceProvider;
pub use bybit::BybitProvider;
pub use chain::ProviderChain;
pub use circuit_breaker::CircuitBreaker;
pub use coingecko::CoinGeckoSource;
pub use csv_source::CsvDirectoryProvider;
pub use provider::{CandleProvider, MarketMetadataSource, ProviderError};
pub use synthetic::SyntheticProvider;
pub use universe::{
    Blocklist, EligibleSymbol, Exclusion, FilterStats, TierThresholds, UniverseEntry,
    UniverseError, UniverseFilter, UniverseSelection,
};
pub use universe_file::UniverseFile;

/// Exchange pair for a base symbol: `BTC` → `BTCUSDT`. Pairs pass through.
pub fn usdt_pair(symbol: &str) -> String {
    let symbol = symbol.trim().to_ascii_uppercase();
    if symbol.ends_with("USDT") {
        symbol
    } else {
        format!("{symbol}USDT")
    }
}

/// Base asset of a symbol or pair: `BTCUSDT` → `BTC`, `ETHUSD` → `ETH`.
pub fn base_asset(symbol: &str) -> String {
    let symbol = symbol.trim().to_ascii_uppercase();
    for quote in ["USDT", "USD"] {
        if let Some(base) = symbol.strip_suffix(quote) {
            if !base.is_empty() {
                return base.to_string();
            }
        }
    }
    symbol
}
