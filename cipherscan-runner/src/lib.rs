//! CipherScan Runner — scan cycle orchestration.
//!
//! This crate builds on `cipherscan-core` to provide:
//! - TOML scan configuration with validation
//! - Provider wiring from configuration (candle chain, universe source)
//! - Parallel scan cycles with cooldown gating and deadline handling
//! - Cycle reports with CSV export
//! - Alert sinks (JSON lines, log)

pub mod config;
pub mod dispatch;
pub mod pipeline;
pub mod report;
pub mod sources;

pub use config::{
    CandleSource, ConfigError, CooldownConfig, CycleConfig, DispatchConfig, ScanConfig,
    SourcesConfig, UniverseConfig, UniverseSource,
};
pub use dispatch::{dispatch_all, AlertSink, DispatchError, DispatchSummary, JsonlSink, LogSink};
pub use pipeline::{CycleError, Evaluation, Scanner, SignalError};
pub use report::{cycle_id, CycleReport, SymbolOutcome, SymbolReport};
pub use sources::{
    build_candle_chain, build_metadata_source, build_sinks, open_cooldown_store, open_dry_run_store,
};
