//! Statistics over persisted crawl state
//!
//! This module summarizes the visited set and the captured-exchange log and
//! prints the summary to stdout.

use crate::capture::CapturedExchange;
use crate::storage::{SharedExchangeLog, SharedVisitedStore, StorageError, StorageResult};
use std::collections::{HashMap, HashSet};

/// How many origin pages the summary lists
const TOP_ORIGINS: usize = 10;

/// Capture statistics summary
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CaptureStats {
    /// Pages in the visited set
    pub visited_pages: usize,

    /// Exchanges in the log, duplicates included
    pub exchanges: usize,

    /// Distinct request URLs among the exchanges
    pub distinct_endpoints: usize,

    /// Exchanges whose request carried no referer
    pub unassociated: usize,

    /// Origin pages with the most exchanges, most first
    pub top_origins: Vec<(String, usize)>,
}

impl CaptureStats {
    pub fn compute(visited_pages: usize, exchanges: &[CapturedExchange]) -> Self {
        let distinct_endpoints = exchanges
            .iter()
            .map(|e| e.request_url.as_str())
            .collect::<HashSet<_>>()
            .len();

        let mut per_origin: HashMap<&str, usize> = HashMap::new();
        let mut unassociated = 0;
        for exchange in exchanges {
            match exchange.origin_page_url.as_deref() {
                Some(origin) => *per_origin.entry(origin).or_default() += 1,
                None => unassociated += 1,
            }
        }

        let mut top_origins: Vec<(String, usize)> = per_origin
            .into_iter()
            .map(|(origin, count)| (origin.to_string(), count))
            .collect();
        top_origins.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        top_origins.truncate(TOP_ORIGINS);

        Self {
            visited_pages,
            exchanges: exchanges.len(),
            distinct_endpoints,
            unassociated,
            top_origins,
        }
    }
}

/// Loads statistics from storage
///
/// The two handles may share one lock (SQLite backend), so they are never
/// held at the same time.
pub fn load_statistics(
    visited: &SharedVisitedStore,
    exchanges: &SharedExchangeLog,
) -> StorageResult<CaptureStats> {
    let visited_pages = visited
        .lock()
        .map_err(|_| StorageError::LockPoisoned)?
        .len()?;

    let logged = exchanges
        .lock()
        .map_err(|_| StorageError::LockPoisoned)?
        .exchanges()?;

    Ok(CaptureStats::compute(visited_pages, &logged))
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(stats: &CaptureStats) {
    println!("=== Capture Statistics ===\n");

    println!("Overview:");
    println!("  Pages visited: {}", stats.visited_pages);
    println!("  Exchanges captured: {}", stats.exchanges);
    println!("  Distinct endpoints: {}", stats.distinct_endpoints);
    println!("  Unassociated exchanges: {}", stats.unassociated);
    println!();

    if !stats.top_origins.is_empty() {
        println!("Top Origin Pages:");
        for (origin, count) in &stats.top_origins {
            println!("  {} ({})", origin, count);
        }
        println!();
    }

    let per_page = if stats.visited_pages > 0 {
        stats.exchanges as f64 / stats.visited_pages as f64
    } else {
        0.0
    };
    println!("Exchanges per page: {:.2}", per_page);
}
