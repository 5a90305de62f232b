// 📝 Progress Log - append-only milestone log shared across runs

use crate::error::{EtlError, Result};
use chrono::{DateTime, Local};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Timestamp layout of every log line, e.g. `2026-Oct-18-14:03:07`
pub const TIMESTAMP_FORMAT: &str = "%Y-%b-%d-%H:%M:%S";

#[derive(Debug, Clone, PartialEq)]
pub struct LogEntry {
    pub timestamp: String,
    pub message: String,
}

impl LogEntry {
    pub fn at(time: DateTime<Local>, message: &str) -> Self {
        LogEntry {
            timestamp: time.format(TIMESTAMP_FORMAT).to_string(),
            message: message.to_string(),
        }
    }

    /// The line as written to the log file (without newline)
    pub fn line(&self) -> String {
        format!("{} : {}", self.timestamp, self.message)
    }
}

/// File-backed progress log. The file is opened in append mode for every
/// entry and never truncated.
#[derive(Debug, Clone)]
pub struct ProgressLog {
    path: PathBuf,
}

impl ProgressLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        ProgressLog { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append a timestamped entry for a pipeline milestone
    pub fn log_progress(&self, message: &str) -> Result<LogEntry> {
        let entry = LogEntry::at(Local::now(), message);
        self.append(&entry)?;
        log::info!("{}", entry.line());
        Ok(entry)
    }

    fn append(&self, entry: &LogEntry) -> Result<()> {
        let log_error = |source: std::io::Error| EtlError::LogWriteError {
            path: self.path.clone(),
            source,
        };

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(log_error)?;
        writeln!(file, "{}", entry.line()).map_err(log_error)
    }
}
