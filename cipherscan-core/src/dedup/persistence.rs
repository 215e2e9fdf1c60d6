//! Durable storage for cooldown records.
//!
//! The store sees an opaque mapping `"SYMBOL:direction" → last alert time`.
//! `JsonFileStore` writes it as a JSON object through a temp file and rename;
//! `MemoryStore` keeps it in process for tests and dry runs.

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};
use thiserror::Error;

/// Persisted form of the cooldown map.
pub type DedupSnapshot = BTreeMap<String, DateTime<Utc>>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("cooldown store I/O at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cooldown store at {path} is corrupt: {reason}")]
    Corrupt { path: PathBuf, reason: String },

    #[error("cooldown store unavailable: {0}")]
    Unavailable(String),
}

pub trait DedupPersistence: Send + Sync {
    fn load(&self) -> Result<DedupSnapshot, StoreError>;

    fn save(&self, snapshot: &DedupSnapshot) -> Result<(), StoreError>;
}

/// JSON object on disk. A missing file loads as an empty store.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_err(&self, source: std::io::Error) -> StoreError {
        StoreError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

impl DedupPersistence for JsonFileStore {
    fn load(&self) -> Result<DedupSnapshot, StoreError> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(DedupSnapshot::new()),
            Err(e) => return Err(self.io_err(e)),
        };
        if content.trim().is_empty() {
            return Ok(DedupSnapshot::new());
        }
        serde_json::from_str(&content).map_err(|e| StoreError::Corrupt {
            path: self.path.clone(),
            reason: e.to_string(),
        })
    }

    fn save(&self, snapshot: &DedupSnapshot) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| self.io_err(e))?;
        }
        let json = serde_json::to_string_pretty(snapshot).map_err(|e| StoreError::Corrupt {
            path: self.path.clone(),
            reason: e.to_string(),
        })?;
        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);
        std::fs::write(&tmp, json).map_err(|e| self.io_err(e))?;
        std::fs::rename(&tmp, &self.path).map_err(|e| self.io_err(e))
    }
}

/// In-process store. `failing()` builds one whose saves always error.
#[derive(Debug, Default)]
pub struct MemoryStore {
    snapshot: Mutex<DedupSnapshot>,
    fail_saves: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_snapshot(snapshot: DedupSnapshot) -> Self {
        Self {
            snapshot: Mutex::new(snapshot),
            fail_saves: AtomicBool::new(false),
        }
    }

    pub fn failing() -> Self {
        let store = Self::new();
        store.set_failing(true);
        store
    }

    pub fn set_failing(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }

    pub fn snapshot(&self) -> DedupSnapshot {
        self.snapshot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl DedupPersistence for MemoryStore {
    fn load(&self) -> Result<DedupSnapshot, StoreError> {
        Ok(self.snapshot())
    }

    fn save(&self, snapshot: &DedupSnapshot) -> Result<(), StoreError> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("memory store set to fail".into()));
        }
        *self.snapshot.lock().unwrap_or_else(PoisonError::into_inner) = snapshot.clone();
        Ok(())
    }
}
