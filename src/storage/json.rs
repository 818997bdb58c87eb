//! Whole-file JSON collections
//!
//! Both collections are rewritten in full on every mutation. Writes go to a
//! sibling temporary file which is then renamed over the target, so a crash
//! mid-write leaves the previous version intact.

use crate::capture::CapturedExchange;
use crate::storage::traits::{ExchangeLog, StorageResult, VisitedStore};
use crate::storage::VisitedSet;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Visited set stored as a JSON array of URL strings
pub struct JsonVisitedStore {
    path: PathBuf,
    visited: VisitedSet,
}

impl JsonVisitedStore {
    /// Opens the store, loading any prior state
    ///
    /// A missing or unreadable file yields an empty set.
    pub fn open(path: &Path) -> Self {
        let visited = read_or_default::<VisitedSet>(path, "visited URLs");
        tracing::info!("Loaded {} previously visited URLs", visited.len());
        Self {
            path: path.to_path_buf(),
            visited,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl VisitedStore for JsonVisitedStore {
    fn has(&self, url: &str) -> StorageResult<bool> {
        Ok(self.visited.contains(url))
    }

    fn claim(&mut self, url: &str) -> StorageResult<bool> {
        if !self.visited.insert(url) {
            return Ok(false);
        }
        write_atomic(&self.path, &self.visited)?;
        Ok(true)
    }

    fn load(&mut self) -> StorageResult<VisitedSet> {
        self.visited = read_or_default::<VisitedSet>(&self.path, "visited URLs");
        Ok(self.visited.clone())
    }

    fn persist(&mut self, set: &VisitedSet) -> StorageResult<()> {
        self.visited = set.clone();
        write_atomic(&self.path, &self.visited)
    }

    fn len(&self) -> StorageResult<usize> {
        Ok(self.visited.len())
    }
}

/// Captured exchanges stored as a pretty-printed JSON array
pub struct JsonExchangeLog {
    path: PathBuf,
    exchanges: Vec<CapturedExchange>,
}

impl JsonExchangeLog {
    /// Opens the log; new exchanges are appended to whatever it already holds
    pub fn open(path: &Path) -> Self {
        let exchanges = read_or_default::<Vec<CapturedExchange>>(path, "captured exchanges");
        Self {
            path: path.to_path_buf(),
            exchanges,
        }
    }
}

impl ExchangeLog for JsonExchangeLog {
    fn append(&mut self, exchange: &CapturedExchange) -> StorageResult<()> {
        self.exchanges.push(exchange.clone());
        write_atomic(&self.path, &self.exchanges)
    }

    fn exchanges(&self) -> StorageResult<Vec<CapturedExchange>> {
        Ok(self.exchanges.clone())
    }

    fn len(&self) -> StorageResult<usize> {
        Ok(self.exchanges.len())
    }
}

/// Reads a JSON document, falling back to the default on any failure
fn read_or_default<T: DeserializeOwned + Default>(path: &Path, what: &str) -> T {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("No previous {} at {}", what, path.display());
            return T::default();
        }
        Err(e) => {
            tracing::warn!("Could not read {} from {}: {}", what, path.display(), e);
            return T::default();
        }
    };

    if content.trim().is_empty() {
        return T::default();
    }

    match serde_json::from_str(&content) {
        Ok(value) => value,
        Err(e) => {
            tracing::warn!(
                "Ignoring corrupt {} in {}: {}",
                what,
                path.display(),
                e
            );
            T::default()
        }
    }
}

fn write_atomic<T: Serialize + ?Sized>(path: &Path, value: &T) -> StorageResult<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let json = serde_json::to_string_pretty(value)?;
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    fs::write(&tmp, json)?;
    fs::rename(&tmp, path)?;
    Ok(())
}
