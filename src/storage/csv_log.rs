//! CSV exchange log
//!
//! Rows are appended to the end of the file; the header row is written only
//! when the file is new or empty.

use crate::capture::CapturedExchange;
use crate::storage::traits::{ExchangeLog, StorageError, StorageResult};
use chrono::{DateTime, Utc};
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};

const HEADER: [&str; 4] = ["request_url", "origin_page_url", "content_type", "observed_at"];

/// Captured exchanges stored as CSV rows
pub struct CsvExchangeLog {
    path: PathBuf,
}

impl CsvExchangeLog {
    pub fn open(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
        }
    }

    fn needs_header(&self) -> bool {
        fs::metadata(&self.path)
            .map(|meta| meta.len() == 0)
            .unwrap_or(true)
    }
}

impl ExchangeLog for CsvExchangeLog {
    fn append(&mut self, exchange: &CapturedExchange) -> StorageResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let write_header = self.needs_header();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;

        let mut writer = csv::Writer::from_writer(file);
        if write_header {
            writer.write_record(HEADER)?;
        }

        let observed_at = exchange.observed_at.to_rfc3339();
        writer.write_record([
            exchange.request_url.as_str(),
            exchange.origin_page_url.as_deref().unwrap_or(""),
            exchange.content_type.as_str(),
            observed_at.as_str(),
        ])?;
        writer.flush()?;
        Ok(())
    }

    fn exchanges(&self) -> StorageResult<Vec<CapturedExchange>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let mut reader = csv::Reader::from_path(&self.path)?;
        let mut exchanges = Vec::new();

        for record in reader.records() {
            let record = record?;
            let field = |i: usize| record.get(i).unwrap_or("").to_string();

            let observed_at = DateTime::parse_from_rfc3339(&field(3))
                .map_err(|e| StorageError::Serialization(format!("bad timestamp: {}", e)))?
                .with_timezone(&Utc);
            let origin = field(1);

            exchanges.push(CapturedExchange {
                request_url: field(0),
                origin_page_url: if origin.is_empty() { None } else { Some(origin) },
                content_type: field(2),
                observed_at,
            });
        }

        Ok(exchanges)
    }
}
