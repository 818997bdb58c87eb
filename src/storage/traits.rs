//! Storage traits and error types
//!
//! This module defines the two durable collections the engine owns (the
//! visited set and the captured-exchange log) and their error type.

use crate::capture::CapturedExchange;
use crate::storage::VisitedSet;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Storage lock poisoned")]
    LockPoisoned,
}

impl From<serde_json::Error> for StorageError {
    fn from(e: serde_json::Error) -> Self {
        StorageError::Serialization(e.to_string())
    }
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Durable set of already-processed URLs
///
/// URL identity is exact string equality; implementations never normalize.
/// Every mutation is persisted before the call returns, so a crash loses at
/// most the URL in flight.
pub trait VisitedStore {
    /// Returns true if `url` has been visited
    fn has(&self, url: &str) -> StorageResult<bool>;

    /// Atomically tests and marks `url`
    ///
    /// Returns `Ok(true)` only for the caller that newly added the URL. An
    /// `Err` means the URL was added in memory but could not be persisted.
    fn claim(&mut self, url: &str) -> StorageResult<bool>;

    /// Marks `url` as visited (idempotent)
    fn mark_visited(&mut self, url: &str) -> StorageResult<()> {
        self.claim(url).map(|_| ())
    }

    /// Re-reads the set from durable storage, replacing the in-memory copy
    fn load(&mut self) -> StorageResult<VisitedSet>;

    /// Replaces the durable set with `set`
    fn persist(&mut self, set: &VisitedSet) -> StorageResult<()>;

    /// Number of visited URLs
    fn len(&self) -> StorageResult<usize>;

    fn is_empty(&self) -> StorageResult<bool> {
        Ok(self.len()? == 0)
    }

    /// Forgets every visited URL
    fn clear(&mut self) -> StorageResult<()> {
        self.persist(&VisitedSet::new())
    }
}

/// Append-only log of captured exchanges
pub trait ExchangeLog {
    /// Appends one exchange and flushes it to durable storage
    fn append(&mut self, exchange: &CapturedExchange) -> StorageResult<()>;

    /// All exchanges recorded so far, oldest first
    fn exchanges(&self) -> StorageResult<Vec<CapturedExchange>>;

    fn len(&self) -> StorageResult<usize> {
        Ok(self.exchanges()?.len())
    }
}
