//! Data models for blob storage operations

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tabled::Tabled;

/// Information about a stored blob
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Tabled)]
pub struct BlobInfo {
    #[tabled(rename = "Name")]
    pub name: String,
    #[tabled(rename = "Size", display_with = "display_size")]
    pub size: u64,
    #[tabled(rename = "Content-Type")]
    pub content_type: String,
    #[tabled(rename = "Modified", display_with = "display_timestamp")]
    pub last_modified: DateTime<Utc>,
    #[tabled(skip)]
    pub etag: String,
}

fn display_size(size: &u64) -> String {
    format_size(*size)
}

fn display_timestamp(timestamp: &DateTime<Utc>) -> String {
    timestamp.format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Guess a content type from the blob name
pub fn guess_content_type(name: &str) -> String {
    mime_guess::from_path(name)
        .first_or_octet_stream()
        .to_string()
}

/// Format file size in human-readable format
pub fn format_size(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];

    if bytes == 0 {
        return "0 B".to_string();
    }

    let mut size = bytes as f64;
    let mut unit_idx = 0;

    while size >= 1024.0 && unit_idx < UNITS.len() - 1 {
        size /= 1024.0;
        unit_idx += 1;
    }

    if unit_idx == 0 {
        format!("{} {}", size as u64, UNITS[unit_idx])
    } else {
        format!("{:.2} {}", size, UNITS[unit_idx])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guess_content_type() {
        assert_eq!(guess_content_type("report.csv"), "text/csv");
        assert_eq!(guess_content_type("archive"), "application/octet-stream");
    }

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(0), "0 B");
        assert_eq!(format_size(512), "512 B");
        assert_eq!(format_size(1536), "1.50 KB");
        assert_eq!(format_size(5 * 1024 * 1024), "5.00 MB");
    }
}
