//! Alert sinks.
//!
//! Dispatch runs after a cycle completes. A sink failure is logged and counted
//! but never stops the remaining payloads or sinks.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use thiserror::Error;
use tracing::{info, warn};

use cipherscan_core::alert::AlertPayload;

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("serialize alert: {0}")]
    Serialize(#[from] serde_json::Error),
}

pub trait AlertSink: Send + Sync {
    fn name(&self) -> &str;

    fn send(&self, payload: &AlertPayload) -> Result<(), DispatchError>;
}

/// Appends each payload as one JSON line.
#[derive(Debug)]
pub struct JsonlSink {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonlSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Every payload written so far. A missing file reads as empty.
    pub fn read_all(&self) -> Result<Vec<AlertPayload>, DispatchError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => {
                return Err(DispatchError::Io {
                    path: self.path.clone(),
                    source,
                })
            }
        };
        content
            .lines()
            .filter(|l| !l.trim().is_empty())
            .map(|l| serde_json::from_str(l).map_err(DispatchError::from))
            .collect()
    }

    fn io_err(&self, source: io::Error) -> DispatchError {
        DispatchError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

impl AlertSink for JsonlSink {
    fn name(&self) -> &str {
        "jsonl"
    }

    fn send(&self, payload: &AlertPayload) -> Result<(), DispatchError> {
        let json = serde_json::to_string(payload)?;
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| self.io_err(e))?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| self.io_err(e))?;
        writeln!(file, "{json}").map_err(|e| self.io_err(e))
    }
}

/// Logs each payload through `tracing`.
#[derive(Debug, Default)]
pub struct LogSink;

impl AlertSink for LogSink {
    fn name(&self) -> &str {
        "log"
    }

    fn send(&self, payload: &AlertPayload) -> Result<(), DispatchError> {
        info!(
            symbol = %payload.symbol,
            direction = %payload.direction,
            tier = %payload.risk_tier,
            chart = %payload.chart_link,
            "{}",
            payload.summary()
        );
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchSummary {
    pub sent: usize,
    pub failed: usize,
}

/// Hand every payload to every sink.
pub fn dispatch_all(sinks: &[Box<dyn AlertSink>], payloads: &[AlertPayload]) -> DispatchSummary {
    let mut summary = DispatchSummary::default();
    for payload in payloads {
        for sink in sinks {
            match sink.send(payload) {
                Ok(()) => summary.sent += 1,
                Err(e) => {
                    summary.failed += 1;
                    warn!(sink = sink.name(), symbol = %payload.symbol, error = %e, "alert dispatch failed");
                }
            }
        }
    }
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use cipherscan_core::alert::chart_link;
    use cipherscan_core::domain::{Direction, RiskTier, Timeframe};

    fn payload(symbol: &str) -> AlertPayload {
        AlertPayload {
            symbol: symbol.into(),
            direction: Direction::Sell,
            risk_tier: RiskTier::Standard,
            timeframe: Timeframe::H1,
            timestamp: Utc.with_ymd_and_hms(2024, 10, 1, 14, 0, 0).unwrap(),
            chart_link: chart_link(symbol, Timeframe::H1),
            oscillator: 64.0,
            signal: 68.0,
            momentum: -0.4,
            stoch_k: 85.0,
            stoch_d: 80.0,
        }
    }

    struct Broken;

    impl AlertSink for Broken {
        fn name(&self) -> &str {
            "broken"
        }

        fn send(&self, _payload: &AlertPayload) -> Result<(), DispatchError> {
            Err(DispatchError::Io {
                path: PathBuf::from("/dev/null"),
                source: io::Error::other("down"),
            })
        }
    }

    #[test]
    fn jsonl_appends_lines() {
        let dir = tempfile::tempdir().unwrap();
        let sink = JsonlSink::new(dir.path().join("out").join("alerts.jsonl"));
        sink.send(&payload("BTC")).unwrap();
        sink.send(&payload("ETH")).unwrap();

        let written = sink.read_all().unwrap();
        assert_eq!(written, vec![payload("BTC"), payload("ETH")]);
    }

    #[test]
    fn failing_sink_does_not_stop_others() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("alerts.jsonl");
        let sinks: Vec<Box<dyn AlertSink>> = vec![
            Box::new(Broken),
            Box::new(JsonlSink::new(&path)),
            Box::new(LogSink),
        ];
        let summary = dispatch_all(&sinks, &[payload("SOL"), payload("XRP")]);
        assert_eq!(summary, DispatchSummary { sent: 4, failed: 2 });
        assert_eq!(JsonlSink::new(&path).read_all().unwrap().len(), 2);
    }
}
