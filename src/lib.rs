// Largest Banks ETL - Core Library
// Exposes all pipeline stages for the CLI and tests

pub mod config;
pub mod db;
pub mod error;
pub mod loader;
pub mod parser;
pub mod pipeline;
pub mod progress;
pub mod rates;
pub mod transform;

// Re-export commonly used types
pub use config::{PipelineConfig, DEFAULT_URL};
pub use db::{
    BankRecord, QueryResult, QueryValue,
    open_store, close_store, run_query, count_rows,
};
pub use error::{EtlError, Result};
pub use loader::{
    CsvFileSink, RecordSink,
    load_to_file, load_to_store, read_from_file,
};
pub use parser::{
    BankSource, HttpTableSource, HtmlSnapshotSource, RawBank,
    fetch_document, parse_banks_table, TABLE_ATTRIBUTES,
};
pub use pipeline::{run_pipeline, Pipeline, RunReport};
pub use progress::{LogEntry, ProgressLog};
pub use rates::{Currency, ExchangeRateTable, load_exchange_rates};
pub use transform::transform;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
