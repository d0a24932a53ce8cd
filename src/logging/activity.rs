//! Activity log sinks
//!
//! Every provisioning step and blob operation records one line here.
//! The file sink appends `[timestamp] [LEVEL] message` lines and never
//! truncates.

use chrono::{SecondsFormat, Utc};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::Level;

use crate::error::Result;

/// Sink for operator-facing activity lines
pub trait ActivityLog: Send + Sync {
    fn log(&self, level: Level, message: &str);

    fn info(&self, message: &str) {
        self.log(Level::INFO, message);
    }

    fn warn(&self, message: &str) {
        self.log(Level::WARN, message);
    }

    fn error(&self, message: &str) {
        self.log(Level::ERROR, message);
    }
}

/// Render one activity line
pub fn format_entry(level: Level, message: &str) -> String {
    format!(
        "[{}] [{}] {}",
        Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
        level,
        message
    )
}

/// Append-only file sink
///
/// Entries are mirrored to tracing at debug level only, so `--debug` shows
/// them on stderr and normal runs leave stderr to the command output.
pub struct FileActivityLog {
    path: PathBuf,
    file: Mutex<std::fs::File>,
}

impl FileActivityLog {
    /// Open (or create) the log file in append mode
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let file = OpenOptions::new().create(true).append(true).open(&path)?;

        Ok(Self {
            path,
            file: Mutex::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ActivityLog for FileActivityLog {
    fn log(&self, level: Level, message: &str) {
        tracing::debug!(activity = %level, "{message}");

        let line = format_entry(level, message);
        match self.file.lock() {
            Ok(mut file) => {
                if let Err(e) = writeln!(file, "{line}") {
                    tracing::warn!("Failed to write activity log {}: {}", self.path.display(), e);
                }
            }
            Err(_) => tracing::warn!("Activity log lock poisoned; dropping entry"),
        }
    }
}

/// Capturing sink, mainly for tests
#[derive(Default)]
pub struct MemoryActivityLog {
    entries: Mutex<Vec<(Level, String)>>,
}

impl MemoryActivityLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything logged so far
    pub fn entries(&self) -> Vec<(Level, String)> {
        self.entries
            .lock()
            .map(|entries| entries.clone())
            .unwrap_or_default()
    }

    /// True if any entry at `level` contains `needle`
    pub fn contains(&self, level: Level, needle: &str) -> bool {
        self.entries()
            .iter()
            .any(|(l, message)| *l == level && message.contains(needle))
    }
}

impl ActivityLog for MemoryActivityLog {
    fn log(&self, level: Level, message: &str) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.push((level, message.to_string()));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_format_entry() {
        let line = format_entry(Level::WARN, "container exists");
        assert!(line.starts_with('['));
        assert!(line.ends_with("[WARN] container exists"));
    }

    #[test]
    fn test_file_log_appends() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("logs").join("blobctl.log");

        {
            let log = FileActivityLog::open(&path).unwrap();
            log.info("first");
        }
        {
            let log = FileActivityLog::open(&path).unwrap();
            log.error("second");
        }

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].ends_with("[INFO] first"));
        assert!(lines[1].ends_with("[ERROR] second"));
    }

    #[test]
    fn test_memory_log_captures() {
        let log = MemoryActivityLog::new();
        log.info("uploaded a.txt");
        log.warn("public access enabled");

        assert_eq!(log.entries().len(), 2);
        assert!(log.contains(Level::INFO, "a.txt"));
        assert!(!log.contains(Level::ERROR, "a.txt"));
    }
}
