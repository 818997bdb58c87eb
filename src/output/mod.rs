//! Output module for reports and summaries
//!
//! This module handles:
//! - Writing the HTML report of extracted records
//! - Printing extracted records to the console
//! - Computing and printing capture statistics

mod report;
pub mod stats;

pub use report::{escape_html, render_report, write_report};
pub use stats::{load_statistics, print_statistics, CaptureStats};

use crate::extract::ExtractedRecord;
use thiserror::Error;

/// Errors that can occur during output operations
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] crate::storage::StorageError),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// Formats records the way the extraction command prints them
pub fn format_records(records: &[ExtractedRecord]) -> String {
    let rule = "-".repeat(50);
    let mut out = String::new();

    for record in records {
        out.push_str(&rule);
        out.push('\n');
        out.push_str(&format!("Product {}:\n", record.index));
        out.push_str(&format!("Name: {}\n", record.name));
        out.push_str(&format!("Price: {}\n", record.price));
        out.push_str(&format!("Image: {}\n", record.image_url));
        out.push_str(&format!("Link: {}\n", record.detail_link));
    }

    out
}

/// Prints every record to stdout
pub fn print_records(records: &[ExtractedRecord]) {
    print!("{}", format_records(records));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_records() {
        let records = vec![ExtractedRecord {
            index: 3,
            name: "Phone".to_string(),
            detail_link: "https://shop.example.com/p/3".to_string(),
            price: "۱۰۰".to_string(),
            image_url: "https://img.example.com/3.jpg".to_string(),
        }];

        let text = format_records(&records);
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[0], "-".repeat(50));
        assert_eq!(lines[1], "Product 3:");
        assert_eq!(lines[2], "Name: Phone");
        assert_eq!(lines[3], "Price: ۱۰۰");
        assert_eq!(lines[4], "Image: https://img.example.com/3.jpg");
        assert_eq!(lines[5], "Link: https://shop.example.com/p/3");
    }

    #[test]
    fn test_format_no_records() {
        assert_eq!(format_records(&[]), "");
    }
}
