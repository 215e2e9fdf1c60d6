//! Universe filter — eligibility and risk tier per market.
//!
//! Input is a per-cycle snapshot of market metadata plus a static blocklist.
//! Each entry is either excluded (with a reason) or assigned a tier:
//!
//! - `standard`:  market cap >= $500M and 24h volume >= $30M
//! - `high-risk`: $10M <= market cap < $500M and 24h volume >= $10M
//!
//! Stablecoins and wrapped tokens are excluded by pattern unless disabled.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::domain::RiskTier;

/// Substrings that mark a stablecoin symbol.
pub const STABLECOIN_PATTERNS: [&str; 7] = ["USD", "USDT", "USDC", "BUSD", "TUSD", "FDUSD", "DAI"];

/// Wrapped versions of assets already in the universe.
pub const WRAPPED_TOKENS: [&str; 3] = ["WBTC", "WETH", "WBNB"];

#[derive(Debug, Error)]
pub enum UniverseError {
    #[error("read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("parse universe snapshot: {0}")]
    Parse(String),
}

/// Market metadata snapshot for one symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UniverseEntry {
    pub symbol: String,
    pub market_cap: f64,
    pub volume_24h: f64,
    #[serde(default)]
    pub is_blocked: bool,
}

impl UniverseEntry {
    pub fn new(symbol: impl Into<String>, market_cap: f64, volume_24h: f64) -> Self {
        Self {
            symbol: symbol.into(),
            market_cap,
            volume_24h,
            is_blocked: false,
        }
    }
}

/// Static set of symbols that are never scanned. Matching is exact after
/// upper-casing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Blocklist {
    symbols: HashSet<String>,
}

impl Blocklist {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a blocklist file: one symbol per line, `#` starts a comment line.
    pub fn from_file(path: &Path) -> Result<Self, UniverseError> {
        let content = std::fs::read_to_string(path).map_err(|source| UniverseError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::parse(&content))
    }

    pub fn parse(content: &str) -> Self {
        content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .collect()
    }

    pub fn contains(&self, symbol: &str) -> bool {
        self.symbols.contains(&symbol.trim().to_ascii_uppercase())
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }
}

impl<S: AsRef<str>> FromIterator<S> for Blocklist {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            symbols: iter
                .into_iter()
                .map(|s| s.as_ref().trim().to_ascii_uppercase())
                .filter(|s| !s.is_empty())
                .collect(),
        }
    }
}

/// Tier boundaries in USD.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TierThresholds {
    pub standard_min_market_cap: f64,
    pub standard_min_volume: f64,
    pub high_risk_min_market_cap: f64,
    pub high_risk_min_volume: f64,
}

impl Default for TierThresholds {
    fn default() -> Self {
        Self {
            standard_min_market_cap: 500_000_000.0,
            standard_min_volume: 30_000_000.0,
            high_risk_min_market_cap: 10_000_000.0,
            high_risk_min_volume: 10_000_000.0,
        }
    }
}

/// Why an entry was left out of the cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Exclusion {
    /// Flagged by the metadata source.
    Blocked,
    /// Present in the static blocklist.
    Blocklisted,
    Stablecoin,
    InvalidData,
    BelowMarketCap,
    BelowVolume,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EligibleSymbol {
    pub symbol: String,
    pub tier: RiskTier,
    pub market_cap: f64,
    pub volume_24h: f64,
}

/// Per-reason counts for one filter pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterStats {
    pub total: usize,
    pub standard: usize,
    pub high_risk: usize,
    pub blocked: usize,
    pub stablecoin: usize,
    pub invalid_data: usize,
    pub below_market_cap: usize,
    pub below_volume: usize,
}

impl FilterStats {
    pub fn eligible(&self) -> usize {
        self.standard + self.high_risk
    }

    fn record(&mut self, outcome: Result<RiskTier, Exclusion>) {
        match outcome {
            Ok(RiskTier::Standard) => self.standard += 1,
            Ok(RiskTier::HighRisk) => self.high_risk += 1,
            Err(Exclusion::Blocked | Exclusion::Blocklisted) => self.blocked += 1,
            Err(Exclusion::Stablecoin) => self.stablecoin += 1,
            Err(Exclusion::InvalidData) => self.invalid_data += 1,
            Err(Exclusion::BelowMarketCap) => self.below_market_cap += 1,
            Err(Exclusion::BelowVolume) => self.below_volume += 1,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UniverseSelection {
    pub eligible: Vec<EligibleSymbol>,
    pub stats: FilterStats,
}

#[derive(Debug, Clone)]
pub struct UniverseFilter {
    thresholds: TierThresholds,
    blocklist: Blocklist,
    exclude_stablecoins: bool,
}

impl UniverseFilter {
    pub fn new(thresholds: TierThresholds, blocklist: Blocklist) -> Self {
        Self {
            thresholds,
            blocklist,
            exclude_stablecoins: true,
        }
    }

    pub fn with_stablecoin_exclusion(mut self, exclude: bool) -> Self {
        self.exclude_stablecoins = exclude;
        self
    }

    pub fn thresholds(&self) -> &TierThresholds {
        &self.thresholds
    }

    /// Tier for one entry, or the first reason it is excluded.
    pub fn classify(&self, entry: &UniverseEntry) -> Result<RiskTier, Exclusion> {
        if entry.is_blocked {
            return Err(Exclusion::Blocked);
        }
        if self.blocklist.contains(&entry.symbol) {
            return Err(Exclusion::Blocklisted);
        }
        if self.exclude_stablecoins && is_stable_or_wrapped(&entry.symbol) {
            return Err(Exclusion::Stablecoin);
        }
        if !(entry.market_cap.is_finite() && entry.market_cap > 0.0)
            || !(entry.volume_24h.is_finite() && entry.volume_24h > 0.0)
        {
            return Err(Exclusion::InvalidData);
        }

        let t = &self.thresholds;
        let (cap, vol) = (entry.market_cap, entry.volume_24h);
        if cap >= t.standard_min_market_cap {
            return if vol >= t.standard_min_volume {
                Ok(RiskTier::Standard)
            } else {
                Err(Exclusion::BelowVolume)
            };
        }
        if cap >= t.high_risk_min_market_cap {
            return if vol >= t.high_risk_min_volume {
                Ok(RiskTier::HighRisk)
            } else {
                Err(Exclusion::BelowVolume)
            };
        }
        Err(Exclusion::BelowMarketCap)
    }

    /// Eligible symbols in snapshot order. Repeated symbols keep their first entry.
    pub fn apply(&self, entries: &[UniverseEntry]) -> UniverseSelection {
        let mut seen = HashSet::new();
        let mut selection = UniverseSelection::default();

        for entry in entries {
            let symbol = entry.symbol.trim().to_ascii_uppercase();
            if !seen.insert(symbol.clone()) {
                continue;
            }
            selection.stats.total += 1;
            let outcome = self.classify(entry);
            selection.stats.record(outcome);
            if let Ok(tier) = outcome {
                selection.eligible.push(EligibleSymbol {
                    symbol,
                    tier,
                    market_cap: entry.market_cap,
                    volume_24h: entry.volume_24h,
                });
            }
        }

        selection
    }
}

impl Default for UniverseFilter {
    fn default() -> Self {
        Self::new(TierThresholds::default(), Blocklist::new())
    }
}

/// Stablecoin substring match or exact wrapped-token match.
pub fn is_stable_or_wrapped(symbol: &str) -> bool {
    let symbol = symbol.trim().to_ascii_uppercase();
    STABLECOIN_PATTERNS.iter().any(|p| symbol.contains(p))
        || WRAPPED_TOKENS.contains(&symbol.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tiering_examples() {
        let filter = UniverseFilter::default();
        assert_eq!(
            filter.classify(&UniverseEntry::new("SOL", 600e6, 40e6)),
            Ok(RiskTier::Standard)
        );
        assert_eq!(
            filter.classify(&UniverseEntry::new("PEPE", 50e6, 15e6)),
            Ok(RiskTier::HighRisk)
        );
        assert_eq!(
            filter.classify(&UniverseEntry::new("TINY", 5e6, 15e6)),
            Err(Exclusion::BelowMarketCap)
        );
    }

    #[test]
    fn threshold_boundaries_are_inclusive() {
        let filter = UniverseFilter::default();
        assert_eq!(
            filter.classify(&UniverseEntry::new("A", 500e6, 30e6)),
            Ok(RiskTier::Standard)
        );
        assert_eq!(
            filter.classify(&UniverseEntry::new("B", 10e6, 10e6)),
            Ok(RiskTier::HighRisk)
        );
        assert_eq!(
            filter.classify(&UniverseEntry::new("C", 499e6, 9.9e6)),
            Err(Exclusion::BelowVolume)
        );
    }

    #[test]
    fn large_cap_with_thin_volume_is_excluded() {
        let filter = UniverseFilter::default();
        assert_eq!(
            filter.classify(&UniverseEntry::new("BIG", 2e9, 20e6)),
            Err(Exclusion::BelowVolume)
        );
    }

    #[test]
    fn blocklist_and_flag_exclude() {
        let filter = UniverseFilter::new(TierThresholds::default(), Blocklist::parse("luna\n"));
        assert_eq!(
            filter.classify(&UniverseEntry::new("LUNA", 600e6, 40e6)),
            Err(Exclusion::Blocklisted)
        );

        let mut flagged = UniverseEntry::new("SOL", 600e6, 40e6);
        flagged.is_blocked = true;
        assert_eq!(filter.classify(&flagged), Err(Exclusion::Blocked));
    }

    #[test]
    fn blocklist_parsing() {
        let list = Blocklist::parse("# delisted\nFTT\n\n  luna \n#SHIB\n");
        assert_eq!(list.len(), 2);
        assert!(list.contains("ftt"));
        assert!(list.contains("LUNA"));
        assert!(!list.contains("SHIB"));
    }

    #[test]
    fn blocklist_from_missing_file_errors() {
        let err = Blocklist::from_file(Path::new("/nonexistent/blocked.txt")).unwrap_err();
        assert!(matches!(err, UniverseError::Io { .. }));
    }

    #[test]
    fn stablecoins_and_wrapped_tokens() {
        assert!(is_stable_or_wrapped("USDC"));
        assert!(is_stable_or_wrapped("fdusd"));
        assert!(is_stable_or_wrapped("DAI"));
        assert!(is_stable_or_wrapped("WBTC"));
        assert!(!is_stable_or_wrapped("BTC"));

        let filter = UniverseFilter::default();
        assert_eq!(
            filter.classify(&UniverseEntry::new("USDT", 80e9, 40e9)),
            Err(Exclusion::Stablecoin)
        );
        let lenient = UniverseFilter::default().with_stablecoin_exclusion(false);
        assert_eq!(
            lenient.classify(&UniverseEntry::new("USDT", 80e9, 40e9)),
            Ok(RiskTier::Standard)
        );
    }

    #[test]
    fn invalid_metadata_is_rejected() {
        let filter = UniverseFilter::default();
        assert_eq!(
            filter.classify(&UniverseEntry::new("X", f64::NAN, 40e6)),
            Err(Exclusion::InvalidData)
        );
        assert_eq!(
            filter.classify(&UniverseEntry::new("Y", 600e6, 0.0)),
            Err(Exclusion::InvalidData)
        );
    }

    #[test]
    fn apply_keeps_order_and_counts() {
        let entries = vec![
            UniverseEntry::new("eth", 300e9, 10e9),
            UniverseEntry::new("PEPE", 50e6, 15e6),
            UniverseEntry::new("USDC", 30e9, 5e9),
            UniverseEntry::new("TINY", 5e6, 1e6),
            UniverseEntry::new("ETH", 1.0, 1.0),
        ];
        let selection = UniverseFilter::default().apply(&entries);

        let symbols: Vec<&str> = selection.eligible.iter().map(|e| e.symbol.as_str()).collect();
        assert_eq!(symbols, vec!["ETH", "PEPE"]);
        assert_eq!(selection.stats.total, 4);
        assert_eq!(selection.stats.standard, 1);
        assert_eq!(selection.stats.high_risk, 1);
        assert_eq!(selection.stats.stablecoin, 1);
        assert_eq!(selection.stats.below_market_cap, 1);
        assert_eq!(selection.stats.eligible(), 2);
    }
}
