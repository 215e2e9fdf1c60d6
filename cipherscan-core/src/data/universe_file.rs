//! Universe snapshot from a local JSON file.
//!
//! The file is an array of `{symbol, market_cap, volume_24h, is_blocked?}`
//! objects. Useful offline and in tests.

use std::path::{Path, PathBuf};

use super::provider::{MarketMetadataSource, ProviderError};
use super::universe::{UniverseEntry, UniverseError};

#[derive(Debug, Clone)]
pub struct UniverseFile {
    path: PathBuf,
}

impl UniverseFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Result<Vec<UniverseEntry>, UniverseError> {
        let content = std::fs::read_to_string(&self.path).map_err(|source| UniverseError::Io {
            path: self.path.clone(),
            source,
        })?;
        parse_snapshot(&content)
    }
}

pub fn parse_snapshot(content: &str) -> Result<Vec<UniverseEntry>, UniverseError> {
    serde_json::from_str(content).map_err(|e| UniverseError::Parse(e.to_string()))
}

impl MarketMetadataSource for UniverseFile {
    fn name(&self) -> &str {
        "universe_file"
    }

    fn fetch_universe(&self) -> Result<Vec<UniverseEntry>, ProviderError> {
        self.load().map_err(|e| ProviderError::Other(e.to_string()))
    }
}
