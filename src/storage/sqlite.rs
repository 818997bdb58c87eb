//! SQLite storage implementation
//!
//! One database backs both the visited set and the exchange log. Every
//! statement runs in autocommit mode, so a mutation is durable when the
//! call returns.

use crate::capture::CapturedExchange;
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{ExchangeLog, StorageError, StorageResult, VisitedStore};
use crate::storage::VisitedSet;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, ErrorCode, OptionalExtension};
use std::fs;
use std::path::{Path, PathBuf};

/// SQLite storage backend
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Opens or creates the database at `path`
    pub fn new(path: &Path) -> StorageResult<Self> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Opens the database at `path`, starting over if the file is unreadable
    ///
    /// A file that is not a valid database is renamed to
    /// `<name>.corrupt-<timestamp>` and an empty database replaces it. Other
    /// failures (locked, permission denied) are returned unchanged.
    pub fn open_or_recover(path: &Path) -> StorageResult<Self> {
        match Self::new(path) {
            Err(StorageError::Sqlite(e)) if is_corruption(&e) => {
                let aside = move_aside(path)?;
                tracing::warn!(
                    "Database {} is unreadable ({}), moved it to {}; starting with no prior state",
                    path.display(),
                    e,
                    aside.display()
                );
                Self::new(path)
            }
            result => result,
        }
    }

    /// Creates an in-memory database (for testing)
    #[cfg(test)]
    pub fn new_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }

    fn insert_visited(&self, url: &str) -> StorageResult<bool> {
        let now = Utc::now().to_rfc3339();
        let inserted = self.conn.execute(
            "INSERT OR IGNORE INTO visited_urls (url, visited_at) VALUES (?1, ?2)",
            params![url, now],
        )?;
        Ok(inserted == 1)
    }
}

impl VisitedStore for SqliteStorage {
    fn has(&self, url: &str) -> StorageResult<bool> {
        let found: Option<i64> = self
            .conn
            .query_row(
                "SELECT id FROM visited_urls WHERE url = ?1",
                params![url],
                |row| row.get(0),
            )
            .optional()?;
        Ok(found.is_some())
    }

    fn claim(&mut self, url: &str) -> StorageResult<bool> {
        self.insert_visited(url)
    }

    fn load(&mut self) -> StorageResult<VisitedSet> {
        let mut stmt = self
            .conn
            .prepare("SELECT url FROM visited_urls ORDER BY id")?;

        let urls = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(VisitedSet::from(urls))
    }

    fn persist(&mut self, set: &VisitedSet) -> StorageResult<()> {
        let tx = self.conn.transaction()?;
        tx.execute("DELETE FROM visited_urls", [])?;
        {
            let now = Utc::now().to_rfc3339();
            let mut stmt =
                tx.prepare("INSERT INTO visited_urls (url, visited_at) VALUES (?1, ?2)")?;
            for url in set.iter() {
                stmt.execute(params![url, now])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn len(&self) -> StorageResult<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM visited_urls", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}

impl ExchangeLog for SqliteStorage {
    fn append(&mut self, exchange: &CapturedExchange) -> StorageResult<()> {
        self.conn.execute(
            "INSERT INTO exchanges (request_url, origin_page_url, content_type, observed_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                exchange.request_url,
                exchange.origin_page_url,
                exchange.content_type,
                exchange.observed_at.to_rfc3339()
            ],
        )?;
        Ok(())
    }

    fn exchanges(&self) -> StorageResult<Vec<CapturedExchange>> {
        let mut stmt = self.conn.prepare(
            "SELECT request_url, origin_page_url, content_type, observed_at
             FROM exchanges ORDER BY id",
        )?;

        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, Option<String>>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(request_url, origin_page_url, content_type, observed_at)| {
                let observed_at = DateTime::parse_from_rfc3339(&observed_at)
                    .map_err(|e| StorageError::Database(format!("bad timestamp: {}", e)))?
                    .with_timezone(&Utc);
                Ok(CapturedExchange {
                    request_url,
                    origin_page_url,
                    content_type,
                    observed_at,
                })
            })
            .collect()
    }

    fn len(&self) -> StorageResult<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM exchanges", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}

fn is_corruption(error: &rusqlite::Error) -> bool {
    matches!(
        error,
        rusqlite::Error::SqliteFailure(failure, _)
            if matches!(failure.code, ErrorCode::NotADatabase | ErrorCode::DatabaseCorrupt)
    )
}

/// Renames a damaged database file and drops its journal sidecars
fn move_aside(path: &Path) -> StorageResult<PathBuf> {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(format!(".corrupt-{}", Utc::now().format("%Y%m%dT%H%M%S")));
    let aside = path.with_file_name(name);
    fs::rename(path, &aside)?;

    for suffix in ["-wal", "-shm"] {
        let mut sidecar = path.as_os_str().to_os_string();
        sidecar.push(suffix);
        match fs::remove_file(PathBuf::from(sidecar)) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!("Could not remove stale {} file: {}", suffix, e),
        }
    }

    Ok(aside)
}
