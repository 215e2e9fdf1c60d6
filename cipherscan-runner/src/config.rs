//! Scan configuration, loaded from TOML.
//!
//! Every section is optional; missing keys fall back to the defaults below.
//!
//! ```toml
//! [indicator]
//! channel_len = 9
//! average_len = 12
//!
//! [cycle]
//! timeframe = "15m"
//! workers = 8
//!
//! [sources]
//! candles = ["binance", "bybit"]
//! universe = "coingecko"
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use cipherscan_core::components::{ConfirmationConfig, ConfirmationFilter};
use cipherscan_core::data::TierThresholds;
use cipherscan_core::dedup::{DEFAULT_COOLDOWN_HOURS, DEFAULT_RETENTION_DAYS};
use cipherscan_core::domain::Timeframe;
use cipherscan_core::engine::{EngineConfig, IndicatorEngine};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    pub indicator: EngineConfig,
    pub confirmation: ConfirmationConfig,
    pub universe: UniverseConfig,
    pub cooldown: CooldownConfig,
    pub cycle: CycleConfig,
    pub sources: SourcesConfig,
    pub dispatch: DispatchConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UniverseConfig {
    #[serde(flatten)]
    pub thresholds: TierThresholds,
    pub exclude_stablecoins: bool,
    /// One symbol per line; `#` starts a comment.
    pub blocklist: Option<PathBuf>,
}

impl Default for UniverseConfig {
    fn default() -> Self {
        Self {
            thresholds: TierThresholds::default(),
            exclude_stablecoins: true,
            blocklist: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CooldownConfig {
    pub hours: i64,
    pub retention_days: i64,
    pub store: PathBuf,
}

impl Default for CooldownConfig {
    fn default() -> Self {
        Self {
            hours: DEFAULT_COOLDOWN_HOURS,
            retention_days: DEFAULT_RETENTION_DAYS,
            store: PathBuf::from("data/cooldowns.json"),
        }
    }
}

impl CooldownConfig {
    pub fn cooldown(&self) -> chrono::Duration {
        chrono::Duration::hours(self.hours)
    }

    pub fn retention(&self) -> chrono::Duration {
        chrono::Duration::days(self.retention_days)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CycleConfig {
    pub timeframe: Timeframe,
    /// Candles requested per symbol.
    pub candle_limit: usize,
    /// Trailing candles whose crossovers may alert this cycle.
    pub signal_window: usize,
    pub workers: usize,
    pub deadline_secs: u64,
}

impl Default for CycleConfig {
    fn default() -> Self {
        Self {
            timeframe: Timeframe::M15,
            candle_limit: 200,
            signal_window: 1,
            workers: 8,
            deadline_secs: 600,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CandleSource {
    Binance,
    Bybit,
    Csv,
    Synthetic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UniverseSource {
    Coingecko,
    File,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourcesConfig {
    /// Candle providers, tried in order.
    pub candles: Vec<CandleSource>,
    pub csv_dir: Option<PathBuf>,
    pub universe: UniverseSource,
    pub universe_file: Option<PathBuf>,
    pub coingecko_pages: usize,
    /// Environment variable holding the CoinGecko demo key.
    pub coingecko_key_env: String,
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            candles: vec![CandleSource::Binance, CandleSource::Bybit],
            csv_dir: None,
            universe: UniverseSource::Coingecko,
            universe_file: None,
            coingecko_pages: 6,
            coingecko_key_env: "COINGECKO_API_KEY".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// Append each alert as one JSON line.
    pub jsonl: Option<PathBuf>,
    /// Log each alert at info level.
    pub log: bool,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            jsonl: None,
            log: true,
        }
    }
}

impl ScanConfig {
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: ScanConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// Reject values the engine, filter or cycle cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: String| Err(ConfigError::Invalid(msg));

        let ind = &self.indicator;
        if ind.channel_len == 0 || ind.average_len == 0 || ind.signal_len == 0 {
            return invalid("indicator lengths must be >= 1".into());
        }
        if ind.money_flow_len == 0 {
            return invalid("indicator.money_flow_len must be >= 1".into());
        }
        if ind.oversold >= ind.overbought {
            return invalid(format!(
                "indicator.oversold ({}) must be below indicator.overbought ({})",
                ind.oversold, ind.overbought
            ));
        }

        let conf = &self.confirmation;
        if conf.rsi_period == 0 || conf.stoch_period == 0 || conf.k_smooth == 0 || conf.d_smooth == 0 {
            return invalid("confirmation periods must be >= 1".into());
        }
        if conf.oversold >= conf.overbought {
            return invalid(format!(
                "confirmation.oversold ({}) must be below confirmation.overbought ({})",
                conf.oversold, conf.overbought
            ));
        }
        if !(0.0..=100.0).contains(&conf.oversold) || !(0.0..=100.0).contains(&conf.overbought) {
            return invalid("confirmation levels must lie within 0..=100".into());
        }

        let t = &self.universe.thresholds;
        let values = [
            t.standard_min_market_cap,
            t.standard_min_volume,
            t.high_risk_min_market_cap,
            t.high_risk_min_volume,
        ];
        if values.iter().any(|v| !v.is_finite() || *v < 0.0) {
            return invalid("universe thresholds must be finite and non-negative".into());
        }
        if t.high_risk_min_market_cap > t.standard_min_market_cap {
            return invalid(format!(
                "universe.high_risk_min_market_cap ({}) exceeds universe.standard_min_market_cap ({})",
                t.high_risk_min_market_cap, t.standard_min_market_cap
            ));
        }

        if self.cooldown.hours <= 0 {
            return invalid("cooldown.hours must be > 0".into());
        }
        if self.cooldown.retention_days <= 0 {
            return invalid("cooldown.retention_days must be > 0".into());
        }

        let cycle = &self.cycle;
        if cycle.workers == 0 {
            return invalid("cycle.workers must be >= 1".into());
        }
        if cycle.signal_window == 0 {
            return invalid("cycle.signal_window must be >= 1".into());
        }
        if cycle.deadline_secs == 0 {
            return invalid("cycle.deadline_secs must be > 0".into());
        }
        let required = self.required_candles();
        if cycle.candle_limit < required {
            return invalid(format!(
                "cycle.candle_limit ({}) is below the {} candles the indicators need",
                cycle.candle_limit, required
            ));
        }

        let sources = &self.sources;
        if sources.candles.is_empty() {
            return invalid("sources.candles must name at least one provider".into());
        }
        if sources.candles.contains(&CandleSource::Csv) && sources.csv_dir.is_none() {
            return invalid("sources.csv_dir is required for the csv provider".into());
        }
        if sources.universe == UniverseSource::File && sources.universe_file.is_none() {
            return invalid("sources.universe_file is required for the file universe".into());
        }

        Ok(())
    }

    /// Candles needed before both the engine and the confirmation line are defined.
    ///
    /// Only meaningful once the periods are known to be non-zero.
    pub fn required_candles(&self) -> usize {
        let engine = IndicatorEngine::new(self.indicator.clone());
        let filter = ConfirmationFilter::new(self.confirmation.clone());
        engine.lookback().max(filter.lookback())
    }

    /// Deterministic fingerprint of the configuration.
    pub fn fingerprint(&self) -> String {
        let json = serde_json::to_string(self).unwrap_or_default();
        blake3::hash(json.as_bytes()).to_hex().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        let config = ScanConfig::from_toml_str("").unwrap();
        assert_eq!(config, ScanConfig::default());
        assert_eq!(config.cycle.timeframe, Timeframe::M15);
        assert_eq!(config.cooldown.hours, 2);
    }

    #[test]
    fn default_required_candles() {
        // StochRSI %D (14/14/3/3) is the longest warmup.
        assert_eq!(ScanConfig::default().required_candles(), 32);
    }

    #[test]
    fn partial_sections_merge_with_defaults() {
        let config = ScanConfig::from_toml_str(
            r#"
            [indicator]
            channel_len = 10
            heikin_ashi = true

            [confirmation]
            line = "k"

            [universe]
            standard_min_market_cap = 1e9
            blocklist = "blocklist.txt"

            [cycle]
            timeframe = "4h"
            workers = 2

            [sources]
            candles = ["csv", "synthetic"]
            csv_dir = "candles"
            universe = "file"
            universe_file = "universe.json"
            "#,
        )
        .unwrap();

        assert_eq!(config.indicator.channel_len, 10);
        assert_eq!(config.indicator.average_len, 12);
        assert!(config.indicator.heikin_ashi);
        assert_eq!(config.universe.thresholds.standard_min_market_cap, 1e9);
        assert_eq!(config.universe.thresholds.standard_min_volume, 30_000_000.0);
        assert_eq!(config.universe.blocklist, Some(PathBuf::from("blocklist.txt")));
        assert_eq!(config.cycle.timeframe, Timeframe::H4);
        assert_eq!(config.sources.candles, vec![CandleSource::Csv, CandleSource::Synthetic]);
    }

    #[test]
    fn rejects_zero_periods() {
        let err = ScanConfig::from_toml_str("[indicator]\nsignal_len = 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));

        let err = ScanConfig::from_toml_str("[confirmation]\nd_smooth = 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn rejects_inverted_levels() {
        let err =
            ScanConfig::from_toml_str("[indicator]\noversold = 50.0\noverbought = -50.0\n").unwrap_err();
        assert!(err.to_string().contains("oversold"));
    }

    #[test]
    fn rejects_inverted_tiers() {
        let err = ScanConfig::from_toml_str("[universe]\nhigh_risk_min_market_cap = 1e12\n")
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn rejects_short_candle_limit() {
        let err = ScanConfig::from_toml_str("[cycle]\ncandle_limit = 20\n").unwrap_err();
        assert!(err.to_string().contains("candle_limit"));
    }

    #[test]
    fn csv_source_needs_directory() {
        let err = ScanConfig::from_toml_str("[sources]\ncandles = [\"csv\"]\n").unwrap_err();
        assert!(err.to_string().contains("csv_dir"));
    }

    #[test]
    fn unknown_timeframe_is_parse_error() {
        let err = ScanConfig::from_toml_str("[cycle]\ntimeframe = \"3m\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn fingerprint_tracks_changes() {
        let a = ScanConfig::default();
        let mut b = ScanConfig::default();
        assert_eq!(a.fingerprint(), b.fingerprint());
        b.cycle.workers = 3;
        assert_ne!(a.fingerprint(), b.fingerprint());
    }
}
