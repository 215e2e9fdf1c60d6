//! Scan cycle: universe → candles → engine → confirmation → cooldown → payloads.
//!
//! Symbols are evaluated in parallel on a bounded Rayon pool. The engine and
//! the filter are pure; the cooldown store is the only shared state. A symbol
//! whose data is missing, short or gapped is reported and skipped without
//! touching any other symbol.
//!
//! A cooldown store failure is fatal: remaining workers stop picking up
//! symbols, every cooldown written earlier in the cycle is reverted, and
//! `run_cycle` returns `Err` with the collected payloads dropped. The next
//! cycle can then alert on the same signals.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use rayon::prelude::*;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use cipherscan_core::alert::AlertPayload;
use cipherscan_core::components::{ConfirmationFilter, Verdict};
use cipherscan_core::data::{
    Blocklist, CandleProvider, EligibleSymbol, MarketMetadataSource, ProviderError,
    UniverseEntry, UniverseError, UniverseFilter,
};
use cipherscan_core::dedup::{CooldownDecision, CooldownStore, RecordedAlert, StoreError};
use cipherscan_core::domain::{CandleSeries, SignalEvent};
use cipherscan_core::engine::IndicatorEngine;

use crate::config::{ConfigError, ScanConfig};
use crate::report::{cycle_id, CycleReport, SymbolOutcome, SymbolReport};

/// Fatal cycle errors. Nothing is dispatched when one of these is returned.
#[derive(Debug, Error)]
pub enum CycleError {
    #[error("universe: {0}")]
    Universe(#[from] UniverseError),

    #[error("market metadata from {source_name}: {error}")]
    Metadata {
        source_name: String,
        #[source]
        error: ProviderError,
    },

    #[error("cooldown store: {0}")]
    Store(#[from] StoreError),

    #[error("worker pool: {0}")]
    Pool(String),
}

/// Why a symbol produced no signal events. Never fatal.
#[derive(Debug, Error)]
pub enum SignalError {
    #[error("{got} candles, need {need}")]
    Insufficient { got: usize, need: usize },

    #[error("evaluation window has no readings")]
    Gap,

    #[error(transparent)]
    Provider(#[from] ProviderError),
}

impl From<SignalError> for SymbolOutcome {
    fn from(e: SignalError) -> Self {
        match e {
            SignalError::Insufficient { got, need } => SymbolOutcome::Insufficient { got, need },
            SignalError::Gap => SymbolOutcome::Gap,
            SignalError::Provider(ProviderError::TooFewCandles { got, need, .. }) => {
                SymbolOutcome::Insufficient { got, need }
            }
            SignalError::Provider(e) => SymbolOutcome::ProviderFailed {
                reason: e.to_string(),
            },
        }
    }
}

/// One symbol's share of a cycle.
struct Processed {
    report: SymbolReport,
    payloads: Vec<AlertPayload>,
    recorded: Vec<RecordedAlert>,
}

impl Processed {
    fn quiet(report: SymbolReport) -> Self {
        Self {
            report,
            payloads: Vec::new(),
            recorded: Vec::new(),
        }
    }
}

/// Confirmed events for one symbol, plus how many candidates were rejected.
#[derive(Debug, Clone, Default)]
pub struct Evaluation {
    pub events: Vec<SignalEvent>,
    pub unconfirmed: usize,
}

pub struct Scanner {
    config: ScanConfig,
    engine: IndicatorEngine,
    filter: ConfirmationFilter,
    candles: Arc<dyn CandleProvider>,
    metadata: Arc<dyn MarketMetadataSource>,
}

impl Scanner {
    pub fn new(
        config: ScanConfig,
        candles: Arc<dyn CandleProvider>,
        metadata: Arc<dyn MarketMetadataSource>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            engine: IndicatorEngine::new(config.indicator.clone()),
            filter: ConfirmationFilter::new(config.confirmation.clone()),
            config,
            candles,
            metadata,
        })
    }

    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    pub fn required_candles(&self) -> usize {
        self.engine.lookback().max(self.filter.lookback())
    }

    /// Universe filter with the blocklist re-read from disk.
    pub fn universe_filter(&self) -> Result<UniverseFilter, CycleError> {
        let blocklist = match &self.config.universe.blocklist {
            Some(path) => Blocklist::from_file(path)?,
            None => Blocklist::new(),
        };
        Ok(UniverseFilter::new(self.config.universe.thresholds, blocklist)
            .with_stablecoin_exclusion(self.config.universe.exclude_stablecoins))
    }

    pub fn fetch_universe(&self) -> Result<Vec<UniverseEntry>, CycleError> {
        self.metadata
            .fetch_universe()
            .map_err(|error| CycleError::Metadata {
                source_name: self.metadata.name().to_string(),
                error,
            })
    }

    /// One full cycle against live sources.
    pub fn run_cycle(
        &self,
        store: &CooldownStore,
        now: DateTime<Utc>,
    ) -> Result<CycleReport, CycleError> {
        let entries = self.fetch_universe()?;
        let filter = self.universe_filter()?;
        self.scan(&entries, &filter, store, now)
    }

    /// Evaluate a given universe snapshot.
    pub fn scan(
        &self,
        entries: &[UniverseEntry],
        universe: &UniverseFilter,
        store: &CooldownStore,
        now: DateTime<Utc>,
    ) -> Result<CycleReport, CycleError> {
        let cycle_id = cycle_id(&self.config, entries);
        let selection = universe.apply(entries);
        let stats = selection.stats;
        info!(
            cycle = %short_id(&cycle_id),
            total = stats.total,
            standard = stats.standard,
            high_risk = stats.high_risk,
            "universe filtered"
        );

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.cycle.workers)
            .build()
            .map_err(|e| CycleError::Pool(e.to_string()))?;

        let deadline = Instant::now() + Duration::from_secs(self.config.cycle.deadline_secs);
        let aborted = AtomicBool::new(false);

        let results: Vec<Result<Processed, StoreError>> = pool.install(|| {
            selection
                .eligible
                .par_iter()
                .map(|symbol| self.process_symbol(symbol, store, now, deadline, &aborted))
                .collect()
        });

        let mut outcomes = Vec::with_capacity(results.len());
        let mut payloads = Vec::new();
        let mut recorded = Vec::new();
        let mut failure = None;
        for result in results {
            match result {
                Ok(mut processed) => {
                    outcomes.push(processed.report);
                    payloads.append(&mut processed.payloads);
                    recorded.append(&mut processed.recorded);
                }
                Err(e) => {
                    if failure.is_none() {
                        failure = Some(e);
                    }
                }
            }
        }

        if let Some(e) = failure {
            error!(error = %e, reverted = recorded.len(), "cooldown store failed; aborting cycle");
            if let Err(revert) = store.revert(&recorded) {
                warn!(error = %revert, "could not persist reverted cooldowns");
            }
            return Err(CycleError::Store(e));
        }

        let report = CycleReport {
            cycle_id,
            started_at: now,
            timeframe: self.config.cycle.timeframe,
            outcomes,
            payloads,
            stats,
        };
        info!(
            alerted = report.count("alerted"),
            suppressed = report.count("suppressed"),
            unconfirmed = report.count("unconfirmed"),
            skipped = report.count("skipped_deadline"),
            payloads = report.payloads.len(),
            "cycle complete"
        );
        Ok(report)
    }

    fn process_symbol(
        &self,
        symbol: &EligibleSymbol,
        store: &CooldownStore,
        now: DateTime<Utc>,
        deadline: Instant,
        aborted: &AtomicBool,
    ) -> Result<Processed, StoreError> {
        let report = |outcome| SymbolReport {
            symbol: symbol.symbol.clone(),
            tier: symbol.tier,
            outcome,
        };

        if aborted.load(Ordering::Relaxed) || Instant::now() >= deadline {
            debug!(symbol = %symbol.symbol, "skipped: cycle deadline or abort");
            return Ok(Processed::quiet(report(SymbolOutcome::SkippedDeadline)));
        }

        let evaluation = match self.evaluate_symbol(symbol) {
            Ok(e) => e,
            Err(e) => {
                match &e {
                    SignalError::Provider(p) if !matches!(p, ProviderError::TooFewCandles { .. }) => {
                        warn!(symbol = %symbol.symbol, error = %p, "candle fetch failed")
                    }
                    other => debug!(symbol = %symbol.symbol, reason = %other, "symbol skipped"),
                }
                return Ok(Processed::quiet(report(e.into())));
            }
        };

        if evaluation.events.is_empty() {
            let outcome = if evaluation.unconfirmed > 0 {
                SymbolOutcome::Unconfirmed {
                    candidates: evaluation.unconfirmed,
                }
            } else {
                SymbolOutcome::NoSignal
            };
            return Ok(Processed::quiet(report(outcome)));
        }

        let mut payloads = Vec::new();
        let mut recorded = Vec::new();
        let signals = evaluation.events.len();
        for event in &evaluation.events {
            let (decision, write) =
                match store.check_and_record_tracked(&event.symbol, event.direction, event.timestamp) {
                    Ok(tracked) => tracked,
                    Err(e) => {
                        aborted.store(true, Ordering::Relaxed);
                        // Undo this symbol's earlier writes; the failed key is already rolled back.
                        if let Err(revert) = store.revert(&recorded) {
                            warn!(symbol = %event.symbol, error = %revert, "could not persist reverted cooldowns");
                        }
                        return Err(e);
                    }
                };
            recorded.extend(write);
            match decision {
                CooldownDecision::Alert => {
                    info!(
                        symbol = %event.symbol,
                        direction = %event.direction,
                        tier = %event.risk_tier,
                        timestamp = %event.timestamp,
                        "signal confirmed"
                    );
                    payloads.push(AlertPayload::from_event(event));
                }
                CooldownDecision::Suppressed { last_alert } => {
                    debug!(
                        symbol = %event.symbol,
                        direction = %event.direction,
                        %last_alert,
                        age_secs = (now - last_alert).num_seconds(),
                        "signal inside cooldown"
                    );
                }
            }
        }

        let outcome = if payloads.is_empty() {
            SymbolOutcome::Suppressed { signals }
        } else {
            SymbolOutcome::Alerted {
                alerts: payloads.len(),
            }
        };
        Ok(Processed {
            report: report(outcome),
            payloads,
            recorded,
        })
    }

    /// Fetch, compute and confirm one symbol. Touches no shared state.
    pub fn evaluate_symbol(&self, symbol: &EligibleSymbol) -> Result<Evaluation, SignalError> {
        let cycle = &self.config.cycle;
        let series = self
            .candles
            .fetch_candles(&symbol.symbol, cycle.timeframe, cycle.candle_limit)?;
        self.evaluate_series(&series, symbol)
    }

    /// Confirmed events whose trigger lies in the trailing signal window.
    pub fn evaluate_series(
        &self,
        series: &CandleSeries,
        symbol: &EligibleSymbol,
    ) -> Result<Evaluation, SignalError> {
        let need = self.required_candles();
        if series.len() < need {
            return Err(SignalError::Insufficient {
                got: series.len(),
                need,
            });
        }

        let window_start = series.len().saturating_sub(self.config.cycle.signal_window);
        let readings = self.engine.readings(series);
        if !readings.iter().any(|r| r.index >= window_start) {
            return Err(SignalError::Gap);
        }

        let lines = self.filter.stoch_lines(series);
        let unconfirmed = self
            .filter
            .evaluate(&readings, &lines)
            .iter()
            .filter(|e| e.index >= window_start && e.verdict != Verdict::Confirmed)
            .count();
        let events = self
            .filter
            .confirm_with_lines(series.symbol(), series.timeframe(), &readings, &lines, symbol.tier)
            .into_iter()
            .filter(|e| e.trigger().is_some_and(|r| r.index >= window_start))
            .collect();

        Ok(Evaluation {
            events,
            unconfirmed,
        })
    }
}

fn short_id(id: &str) -> &str {
    id.get(..12).unwrap_or(id)
}

impl std::fmt::Debug for Scanner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scanner")
            .field("config", &self.config)
            .field("candles", &self.candles.name())
            .field("metadata", &self.metadata.name())
            .finish()
    }
}
