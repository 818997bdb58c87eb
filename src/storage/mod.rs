//! Storage module for persisting crawl state
//!
//! This module owns the two durable collections of a crawl:
//! - The visited set (which pages have already been processed)
//! - The captured-exchange log (JSON endpoints observed while rendering)
//!
//! Two backends are provided: whole-file JSON/CSV collections and a single
//! SQLite database. Both are shared behind a mutex so the crawler and the
//! interceptor can hold them at the same time.

mod csv_log;
mod json;
mod schema;
mod sqlite;
mod traits;

pub use csv_log::CsvExchangeLog;
pub use json::{JsonExchangeLog, JsonVisitedStore};
pub use sqlite::SqliteStorage;
pub use traits::{ExchangeLog, StorageError, StorageResult, VisitedStore};

use crate::config::{ExchangeFormat, OutputConfig, StorageBackend};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use std::sync::{Arc, Mutex};

/// Visited store shared between tasks
pub type SharedVisitedStore = Arc<Mutex<dyn VisitedStore + Send>>;

/// Exchange log shared between the interceptor and reporting
pub type SharedExchangeLog = Arc<Mutex<dyn ExchangeLog + Send>>;

/// Insertion-ordered set of URL strings
///
/// Serializes as a plain JSON array in the order URLs were added.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct VisitedSet {
    order: Vec<String>,
    members: HashSet<String>,
}

impl VisitedSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `url`, returning false if it was already present
    pub fn insert(&mut self, url: &str) -> bool {
        if self.members.contains(url) {
            return false;
        }
        self.members.insert(url.to_string());
        self.order.push(url.to_string());
        true
    }

    pub fn contains(&self, url: &str) -> bool {
        self.members.contains(url)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    pub fn clear(&mut self) {
        self.order.clear();
        self.members.clear();
    }
}

impl From<Vec<String>> for VisitedSet {
    fn from(urls: Vec<String>) -> Self {
        let mut set = VisitedSet::new();
        for url in &urls {
            set.insert(url);
        }
        set
    }
}

impl From<VisitedSet> for Vec<String> {
    fn from(set: VisitedSet) -> Self {
        set.order
    }
}

impl<'a> FromIterator<&'a str> for VisitedSet {
    fn from_iter<I: IntoIterator<Item = &'a str>>(iter: I) -> Self {
        let mut set = VisitedSet::new();
        for url in iter {
            set.insert(url);
        }
        set
    }
}

/// Opens the visited store and exchange log selected by `[output]`
///
/// With the SQLite backend both handles point at the same database. Stores
/// that cannot be read start empty rather than failing.
pub fn open_storage(config: &OutputConfig) -> StorageResult<(SharedVisitedStore, SharedExchangeLog)> {
    match config.backend {
        StorageBackend::Sqlite => {
            let storage = Arc::new(Mutex::new(SqliteStorage::open_or_recover(Path::new(
                &config.database_path,
            ))?));
            let visited: SharedVisitedStore = storage.clone();
            let exchanges: SharedExchangeLog = storage;
            Ok((visited, exchanges))
        }
        StorageBackend::Files => {
            let visited: SharedVisitedStore = Arc::new(Mutex::new(JsonVisitedStore::open(
                Path::new(&config.visited_path),
            )));
            let exchanges: SharedExchangeLog = match config.exchanges_format {
                ExchangeFormat::Json => Arc::new(Mutex::new(JsonExchangeLog::open(Path::new(
                    &config.exchanges_path,
                )))),
                ExchangeFormat::Csv => Arc::new(Mutex::new(CsvExchangeLog::open(Path::new(
                    &config.exchanges_path,
                )))),
            };
            Ok((visited, exchanges))
        }
    }
}

/// In-memory exchange log for tests
#[cfg(test)]
#[derive(Debug, Default)]
pub(crate) struct MemoryExchangeLog {
    entries: Vec<crate::capture::CapturedExchange>,
}

#[cfg(test)]
impl ExchangeLog for MemoryExchangeLog {
    fn append(&mut self, exchange: &crate::capture::CapturedExchange) -> StorageResult<()> {
        self.entries.push(exchange.clone());
        Ok(())
    }

    fn exchanges(&self) -> StorageResult<Vec<crate::capture::CapturedExchange>> {
        Ok(self.entries.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_visited_set_keeps_insertion_order() {
        let mut set = VisitedSet::new();
        assert!(set.insert("https://example.com/b"));
        assert!(set.insert("https://example.com/a"));
        assert!(!set.insert("https://example.com/b"));

        let urls: Vec<&str> = set.iter().collect();
        assert_eq!(urls, vec!["https://example.com/b", "https://example.com/a"]);
    }

    #[test]
    fn test_visited_set_is_exact_match() {
        let set: VisitedSet = ["http://x/a"].into_iter().collect();
        assert!(set.contains("http://x/a"));
        assert!(!set.contains("http://x/a/"));
    }

    #[test]
    fn test_visited_set_json_is_array() {
        let set: VisitedSet = ["https://a.com/", "https://b.com/"].into_iter().collect();
        let json = serde_json::to_string(&set).unwrap();
        assert_eq!(json, r#"["https://a.com/","https://b.com/"]"#);

        let back: VisitedSet = serde_json::from_str(&json).unwrap();
        assert_eq!(back, set);
    }

    #[test]
    fn test_duplicates_in_array_collapse() {
        let set: VisitedSet =
            serde_json::from_str(r#"["https://a.com/","https://a.com/"]"#).unwrap();
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_open_storage_sqlite_shares_database() {
        let dir = TempDir::new().unwrap();
        let config = OutputConfig {
            backend: StorageBackend::Sqlite,
            database_path: dir.path().join("sieve.db").display().to_string(),
            ..OutputConfig::default()
        };

        let (visited, exchanges) = open_storage(&config).unwrap();
        assert!(visited.lock().unwrap().claim("https://example.com/").unwrap());
        assert_eq!(exchanges.lock().unwrap().len().unwrap(), 0);
    }

    #[test]
    fn test_open_storage_sqlite_survives_corrupt_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("sieve.db");
        std::fs::write(&path, vec![0xAB; 4096]).unwrap();
        let config = OutputConfig {
            backend: StorageBackend::Sqlite,
            database_path: path.display().to_string(),
            ..OutputConfig::default()
        };

        let (visited, exchanges) = open_storage(&config).unwrap();
        assert_eq!(visited.lock().unwrap().len().unwrap(), 0);
        assert_eq!(exchanges.lock().unwrap().len().unwrap(), 0);
    }

    #[test]
    fn test_open_storage_files_uses_configured_paths() {
        let dir = TempDir::new().unwrap();
        let config = OutputConfig {
            visited_path: dir.path().join("visited.json").display().to_string(),
            exchanges_path: dir.path().join("api.csv").display().to_string(),
            exchanges_format: ExchangeFormat::Csv,
            ..OutputConfig::default()
        };

        let (visited, _) = open_storage(&config).unwrap();
        visited.lock().unwrap().claim("https://example.com/").unwrap();
        assert!(dir.path().join("visited.json").exists());
    }
}
