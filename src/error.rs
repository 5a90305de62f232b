// ⚠️ Error taxonomy for the ETL run
// Every stage fails fast; the orchestrator surfaces these unchanged.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by any stage of the pipeline.
#[derive(Debug, Error)]
pub enum EtlError {
    #[error("resource not found: {}", path.display())]
    ResourceNotFound { path: PathBuf },

    #[error("failed to read {}: {source}", path.display())]
    ReadError {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("failed to fetch {url}: {message}")]
    FetchError { url: String, message: String },

    #[error("no table body found in source document")]
    NoTableFound,

    #[error("row {row}: cannot parse {field} from {value:?}")]
    FieldParseError {
        row: usize,
        field: &'static str,
        value: String,
    },

    #[error("malformed exchange rate row at line {line}: {reason}")]
    MalformedRateRow { line: u64, reason: String },

    #[error("exchange rate for {currency} is missing")]
    MissingRate { currency: String },

    #[error("failed to write {}: {source}", path.display())]
    WriteError {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("failed to write table '{table}': {source}")]
    StoreWriteError {
        table: String,
        #[source]
        source: rusqlite::Error,
    },

    #[error("query failed ({query}): {message}")]
    QueryError { query: String, message: String },

    #[error("failed to append to progress log {}: {source}", path.display())]
    LogWriteError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("invalid CSS selector '{selector}': {message}")]
    InvalidSelector { selector: String, message: String },
}

pub type Result<T> = std::result::Result<T, EtlError>;
