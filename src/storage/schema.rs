//! Database schema definitions
//!
//! This module contains all SQL schema definitions for the Netsieve database.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- Pages already processed by the crawler, in visit order
CREATE TABLE IF NOT EXISTS visited_urls (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    url TEXT NOT NULL UNIQUE,
    visited_at TEXT NOT NULL
);

-- JSON endpoints observed while pages rendered
CREATE TABLE IF NOT EXISTS exchanges (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    request_url TEXT NOT NULL,
    origin_page_url TEXT,
    content_type TEXT NOT NULL,
    observed_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_exchanges_request_url ON exchanges(request_url);
CREATE INDEX IF NOT EXISTS idx_exchanges_origin ON exchanges(origin_page_url);
"#;

/// Initializes the database schema
///
/// # Arguments
///
/// * `conn` - The database connection
///
/// # Returns
///
/// * `Ok(())` - Schema initialized successfully
/// * `Err(rusqlite::Error)` - Failed to initialize schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
