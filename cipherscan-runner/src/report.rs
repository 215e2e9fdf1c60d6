//! Cycle report: per-symbol outcomes, emitted payloads, universe statistics.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io;

use cipherscan_core::alert::AlertPayload;
use cipherscan_core::data::{FilterStats, UniverseEntry};
use cipherscan_core::domain::{RiskTier, Timeframe};

use crate::config::ScanConfig;

/// What happened to one eligible symbol this cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SymbolOutcome {
    /// At least one confirmed signal passed the cooldown.
    Alerted { alerts: usize },
    /// Confirmed signals, all inside their cooldown window.
    Suppressed { signals: usize },
    NoSignal,
    /// Crossover candidates the Stochastic RSI did not confirm.
    Unconfirmed { candidates: usize },
    Insufficient { got: usize, need: usize },
    /// The evaluation window falls inside a data gap.
    Gap,
    ProviderFailed { reason: String },
    SkippedDeadline,
}

impl SymbolOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            SymbolOutcome::Alerted { .. } => "alerted",
            SymbolOutcome::Suppressed { .. } => "suppressed",
            SymbolOutcome::NoSignal => "no_signal",
            SymbolOutcome::Unconfirmed { .. } => "unconfirmed",
            SymbolOutcome::Insufficient { .. } => "insufficient",
            SymbolOutcome::Gap => "gap",
            SymbolOutcome::ProviderFailed { .. } => "provider_failed",
            SymbolOutcome::SkippedDeadline => "skipped_deadline",
        }
    }

    fn detail(&self) -> String {
        match self {
            SymbolOutcome::Alerted { alerts } => alerts.to_string(),
            SymbolOutcome::Suppressed { signals } => signals.to_string(),
            SymbolOutcome::Unconfirmed { candidates } => candidates.to_string(),
            SymbolOutcome::Insufficient { got, need } => format!("{got}/{need}"),
            SymbolOutcome::ProviderFailed { reason } => reason.clone(),
            _ => String::new(),
        }
    }
}

impl fmt::Display for SymbolOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let detail = self.detail();
        if detail.is_empty() {
            f.write_str(self.label())
        } else {
            write!(f, "{} ({detail})", self.label())
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SymbolReport {
    pub symbol: String,
    pub tier: RiskTier,
    pub outcome: SymbolOutcome,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CycleReport {
    pub cycle_id: String,
    pub started_at: DateTime<Utc>,
    pub timeframe: Timeframe,
    pub outcomes: Vec<SymbolReport>,
    pub payloads: Vec<AlertPayload>,
    pub stats: FilterStats,
}

impl CycleReport {
    pub fn count(&self, label: &str) -> usize {
        self.outcomes
            .iter()
            .filter(|r| r.outcome.label() == label)
            .count()
    }

    pub fn outcome(&self, symbol: &str) -> Option<&SymbolOutcome> {
        self.outcomes
            .iter()
            .find(|r| r.symbol == symbol)
            .map(|r| &r.outcome)
    }

    /// Outcome table as CSV: `symbol,tier,outcome,detail`.
    pub fn write_outcomes_csv<W: io::Write>(&self, writer: W) -> Result<(), csv::Error> {
        let mut wtr = csv::Writer::from_writer(writer);
        wtr.write_record(["symbol", "tier", "outcome", "detail"])?;
        for r in &self.outcomes {
            wtr.write_record([
                r.symbol.as_str(),
                r.tier.as_str(),
                r.outcome.label(),
                r.outcome.detail().as_str(),
            ])?;
        }
        wtr.flush()?;
        Ok(())
    }

    pub fn outcomes_csv(&self) -> Result<String, csv::Error> {
        let mut buf = Vec::new();
        self.write_outcomes_csv(&mut buf)?;
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }
}

/// BLAKE3 over the configuration and the universe snapshot the cycle saw.
pub fn cycle_id(config: &ScanConfig, universe: &[UniverseEntry]) -> String {
    let mut hasher = blake3::Hasher::new();
    hasher.update(config.fingerprint().as_bytes());
    for entry in universe {
        hasher.update(entry.symbol.as_bytes());
        hasher.update(&entry.market_cap.to_le_bytes());
        hasher.update(&entry.volume_24h.to_le_bytes());
        hasher.update(&[entry.is_blocked as u8]);
    }
    hasher.finalize().to_hex().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn report() -> CycleReport {
        CycleReport {
            cycle_id: "abc".into(),
            started_at: Utc.with_ymd_and_hms(2024, 9, 1, 0, 0, 0).unwrap(),
            timeframe: Timeframe::M15,
            outcomes: vec![
                SymbolReport {
                    symbol: "BTC".into(),
                    tier: RiskTier::Standard,
                    outcome: SymbolOutcome::Alerted { alerts: 1 },
                },
                SymbolReport {
                    symbol: "PEPE".into(),
                    tier: RiskTier::HighRisk,
                    outcome: SymbolOutcome::Insufficient { got: 12, need: 32 },
                },
                SymbolReport {
                    symbol: "ETH".into(),
                    tier: RiskTier::Standard,
                    outcome: SymbolOutcome::NoSignal,
                },
            ],
            payloads: Vec::new(),
            stats: FilterStats::default(),
        }
    }

    #[test]
    fn counts_by_label() {
        let r = report();
        assert_eq!(r.count("alerted"), 1);
        assert_eq!(r.count("no_signal"), 1);
        assert_eq!(r.count("gap"), 0);
        assert_eq!(r.outcome("PEPE"), Some(&SymbolOutcome::Insufficient { got: 12, need: 32 }));
    }

    #[test]
    fn csv_has_one_row_per_symbol() {
        let csv = report().outcomes_csv().unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], "symbol,tier,outcome,detail");
        assert_eq!(lines[1], "BTC,standard,alerted,1");
        assert_eq!(lines[2], "PEPE,high-risk,insufficient,12/32");
        assert_eq!(lines[3], "ETH,standard,no_signal,");
        assert_eq!(lines.len(), 4);
    }

    #[test]
    fn cycle_id_depends_on_universe() {
        let config = ScanConfig::default();
        let a = vec![UniverseEntry::new("BTC", 1e12, 1e10)];
        let b = vec![UniverseEntry::new("BTC", 1e12, 2e10)];
        assert_eq!(cycle_id(&config, &a), cycle_id(&config, &a));
        assert_ne!(cycle_id(&config, &a), cycle_id(&config, &b));
    }

    #[test]
    fn outcome_display() {
        assert_eq!(SymbolOutcome::Gap.to_string(), "gap");
        assert_eq!(
            SymbolOutcome::ProviderFailed { reason: "timeout".into() }.to_string(),
            "provider_failed (timeout)"
        );
    }
}
