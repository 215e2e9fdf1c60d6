//! Cooldown store — suppresses repeat alerts per (symbol, direction).
//!
//! A key is eligible when it has no record, or its last alert is at least
//! `cooldown` older than the candidate. `check_and_record` decides and writes
//! atomically per key; a suppressed check leaves the record untouched, so the
//! window stays anchored to the first alert.
//!
//! Every write goes through to the persistence backend before the decision is
//! returned. A failed save rolls the in-memory write back and surfaces the error.
//! Callers that record several keys as one unit keep the [`RecordedAlert`]s from
//! `check_and_record_tracked` and hand them to `revert` if the unit fails.

pub mod persistence;

pub use persistence::{DedupPersistence, DedupSnapshot, JsonFileStore, MemoryStore, StoreError};

use chrono::{DateTime, Duration, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{Mutex, PoisonError};
use tracing::{debug, warn};

use crate::domain::Direction;

/// Default cooldown window.
pub const DEFAULT_COOLDOWN_HOURS: i64 = 2;

/// Default retention for `prune`.
pub const DEFAULT_RETENTION_DAYS: i64 = 7;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DedupKey {
    pub symbol: String,
    pub direction: Direction,
}

impl DedupKey {
    pub fn new(symbol: &str, direction: Direction) -> Self {
        Self {
            symbol: symbol.trim().to_ascii_uppercase(),
            direction,
        }
    }

    /// Parse the persisted `SYMBOL:direction` form.
    pub fn parse(raw: &str) -> Option<Self> {
        let (symbol, direction) = raw.rsplit_once(':')?;
        if symbol.trim().is_empty() {
            return None;
        }
        Some(Self::new(symbol, Direction::parse(direction)?))
    }
}

impl fmt::Display for DedupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.symbol, self.direction)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DedupRecord {
    pub symbol: String,
    pub direction: Direction,
    pub last_alert_timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CooldownDecision {
    /// Recorded; the alert may be dispatched.
    Alert,
    /// Inside the window of `last_alert`.
    Suppressed { last_alert: DateTime<Utc> },
}

impl CooldownDecision {
    pub fn is_alert(&self) -> bool {
        matches!(self, CooldownDecision::Alert)
    }
}

/// A write made by `check_and_record_tracked`, with the value it replaced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedAlert {
    pub key: DedupKey,
    pub written: DateTime<Utc>,
    pub previous: Option<DateTime<Utc>>,
}

pub struct CooldownStore {
    records: DashMap<DedupKey, DateTime<Utc>>,
    cooldown: Duration,
    persistence: Box<dyn DedupPersistence>,
    // Serialises snapshot + save so the backend always ends with the newest map.
    save_lock: Mutex<()>,
}

impl CooldownStore {
    /// Load existing records from `persistence`. Unreadable keys are skipped.
    pub fn open(
        persistence: Box<dyn DedupPersistence>,
        cooldown: Duration,
    ) -> Result<Self, StoreError> {
        let snapshot = persistence.load()?;
        let records = DashMap::new();
        for (raw, ts) in snapshot {
            match DedupKey::parse(&raw) {
                Some(key) => {
                    records.insert(key, ts);
                }
                None => warn!(key = %raw, "skipping unreadable cooldown record"),
            }
        }
        debug!(records = records.len(), "cooldown store opened");
        Ok(Self {
            records,
            cooldown,
            persistence,
            save_lock: Mutex::new(()),
        })
    }

    /// Empty in-memory store.
    pub fn in_memory(cooldown: Duration) -> Self {
        Self {
            records: DashMap::new(),
            cooldown,
            persistence: Box::new(MemoryStore::new()),
            save_lock: Mutex::new(()),
        }
    }

    pub fn cooldown(&self) -> Duration {
        self.cooldown
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn last_alert(&self, symbol: &str, direction: Direction) -> Option<DateTime<Utc>> {
        self.records
            .get(&DedupKey::new(symbol, direction))
            .map(|r| *r.value())
    }

    fn eligible(&self, last: Option<DateTime<Utc>>, timestamp: DateTime<Utc>) -> bool {
        match last {
            None => true,
            Some(last) => timestamp - last >= self.cooldown,
        }
    }

    /// Read-only eligibility check.
    pub fn is_eligible(&self, symbol: &str, direction: Direction, timestamp: DateTime<Utc>) -> bool {
        self.eligible(self.last_alert(symbol, direction), timestamp)
    }

    /// Decide and record in one step.
    ///
    /// Returns `Alert` after the new record is persisted, `Suppressed` without
    /// touching anything.
    pub fn check_and_record(
        &self,
        symbol: &str,
        direction: Direction,
        timestamp: DateTime<Utc>,
    ) -> Result<CooldownDecision, StoreError> {
        self.check_and_record_tracked(symbol, direction, timestamp)
            .map(|(decision, _)| decision)
    }

    /// Like `check_and_record`, also returning the write on `Alert` so it can
    /// be undone with `revert`.
    pub fn check_and_record_tracked(
        &self,
        symbol: &str,
        direction: Direction,
        timestamp: DateTime<Utc>,
    ) -> Result<(CooldownDecision, Option<RecordedAlert>), StoreError> {
        let key = DedupKey::new(symbol, direction);

        // The entry guard holds the shard lock, so check and insert are atomic per key.
        let previous = match self.records.entry(key.clone()) {
            Entry::Occupied(mut occupied) => {
                let last = *occupied.get();
                if !self.eligible(Some(last), timestamp) {
                    debug!(symbol = %key.symbol, direction = %direction, %last, "suppressed by cooldown");
                    return Ok((CooldownDecision::Suppressed { last_alert: last }, None));
                }
                Some(occupied.insert(timestamp))
            }
            Entry::Vacant(vacant) => {
                vacant.insert(timestamp);
                None
            }
        };

        if let Err(e) = self.save() {
            self.rollback(&key, timestamp, previous);
            return Err(e);
        }
        debug!(symbol = %key.symbol, direction = %direction, %timestamp, "cooldown recorded");
        let recorded = RecordedAlert {
            key,
            written: timestamp,
            previous,
        };
        Ok((CooldownDecision::Alert, Some(recorded)))
    }

    /// Undo `recorded` writes, newest first, then persist.
    ///
    /// A key rewritten since the recorded write keeps its newer value.
    pub fn revert(&self, recorded: &[RecordedAlert]) -> Result<(), StoreError> {
        if recorded.is_empty() {
            return Ok(());
        }
        for r in recorded.iter().rev() {
            self.rollback(&r.key, r.written, r.previous);
        }
        self.save()?;
        debug!(reverted = recorded.len(), "cooldown writes reverted");
        Ok(())
    }

    // Only undo our own write; a newer one from another worker stays.
    fn rollback(&self, key: &DedupKey, written: DateTime<Utc>, previous: Option<DateTime<Utc>>) {
        if let Entry::Occupied(mut occupied) = self.records.entry(key.clone()) {
            if *occupied.get() == written {
                match previous {
                    Some(prev) => {
                        occupied.insert(prev);
                    }
                    None => {
                        occupied.remove();
                    }
                }
            }
        }
    }

    /// Drop records whose last alert is older than `now - retention`, then persist.
    pub fn prune(&self, now: DateTime<Utc>, retention: Duration) -> Result<usize, StoreError> {
        let horizon = now - retention;
        let before = self.records.len();
        self.records.retain(|_, last| *last >= horizon);
        let removed = before.saturating_sub(self.records.len());
        self.save()?;
        debug!(removed, "pruned cooldown records");
        Ok(removed)
    }

    /// All records, ordered by symbol then direction.
    pub fn records(&self) -> Vec<DedupRecord> {
        let mut records: Vec<DedupRecord> = self
            .records
            .iter()
            .map(|r| DedupRecord {
                symbol: r.key().symbol.clone(),
                direction: r.key().direction,
                last_alert_timestamp: *r.value(),
            })
            .collect();
        records.sort_by(|a, b| (&a.symbol, a.direction).cmp(&(&b.symbol, b.direction)));
        records
    }

    pub fn snapshot(&self) -> DedupSnapshot {
        self.records
            .iter()
            .map(|r| (r.key().to_string(), *r.value()))
            .collect()
    }

    /// Persist the current map.
    pub fn save(&self) -> Result<(), StoreError> {
        let _guard = self.save_lock.lock().unwrap_or_else(PoisonError::into_inner);
        self.persistence.save(&self.snapshot())
    }
}

impl fmt::Debug for CooldownStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CooldownStore")
            .field("records", &self.records.len())
            .field("cooldown", &self.cooldown)
            .finish()
    }
}
