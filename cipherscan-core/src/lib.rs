//! CipherScan Core — candles, indicators, confirmation, universe and cooldown.
//!
//! This crate contains everything a scan cycle needs except orchestration:
//! - Domain types (candles, series, readings, signal events)
//! - WaveTrend / money-flow indicator engine with zone-gated crossovers
//! - Stochastic RSI confirmation filter
//! - Universe tiering and blocklist
//! - Candle providers and market metadata sources
//! - Cooldown store with pluggable persistence
//! - Alert payloads

pub mod alert;
pub mod components;
pub mod data;
pub mod dedup;
pub mod domain;
pub mod engine;
pub mod indicators;

#[cfg(test)]
mod tests {
    use super::*;

    /// Compile-time check: everything shared across scan workers is Send + Sync.
    #[allow(dead_code)]
    fn assert_send_sync() {
        fn require_send<T: Send>() {}
        fn require_sync<T: Sync>() {}

        // Domain types
        require_send::<domain::Candle>();
        require_sync::<domain::Candle>();
        require_send::<domain::CandleSeries>();
        require_sync::<domain::CandleSeries>();
        require_send::<domain::IndicatorReading>();
        require_sync::<domain::IndicatorReading>();
        require_send::<domain::SignalEvent>();
        require_sync::<domain::SignalEvent>();

        // Engine and filter
        require_send::<engine::IndicatorEngine>();
        require_sync::<engine::IndicatorEngine>();
        require_send::<components::ConfirmationFilter>();
        require_sync::<components::ConfirmationFilter>();
        require_send::<components::IndicatorValues>();
        require_sync::<components::IndicatorValues>();

        // Data layer
        require_send::<data::UniverseFilter>();
        require_sync::<data::UniverseFilter>();
        require_send::<data::ProviderChain>();
        require_sync::<data::ProviderChain>();
        require_send::<data::CircuitBreaker>();
        require_sync::<data::CircuitBreaker>();
        require_send::<data::BinanceProvider>();
        require_sync::<data::BinanceProvider>();
        require_send::<data::BybitProvider>();
        require_sync::<data::BybitProvider>();

        // Cooldown
        require_send::<dedup::CooldownStore>();
        require_sync::<dedup::CooldownStore>();
        require_send::<dedup::JsonFileStore>();
        require_sync::<dedup::JsonFileStore>();

        require_send::<alert::AlertPayload>();
        require_sync::<alert::AlertPayload>();
    }

    /// Indicators see only candles: `compute` takes a slice and nothing else,
    /// so no cooldown or dispatch state can leak into the math.
    #[test]
    fn indicator_trait_takes_only_candles() {
        fn _check_trait_object_builds(
            ind: &dyn components::Indicator,
            candles: &[domain::Candle],
        ) -> Vec<f64> {
            ind.compute(candles)
        }
    }
}
