// 🚚 Pipeline - extract → transform → load → query, strictly in sequence
//
// Each step runs only if the previous one succeeded. Once the store is open
// it is closed on every exit path, and a failed run still leaves a
// terminating line in the progress log.

use crate::config::PipelineConfig;
use crate::db::{close_store, open_store, run_query, BankRecord, QueryResult};
use crate::error::Result;
use crate::loader::{load_to_store, CsvFileSink, RecordSink};
use crate::parser::{BankSource, HttpTableSource, TABLE_ATTRIBUTES};
use crate::progress::ProgressLog;
use crate::rates::load_exchange_rates;
use crate::transform::transform;
use rusqlite::Connection;

/// Outcome of a completed run
#[derive(Debug, Clone)]
pub struct RunReport {
    pub extracted: usize,
    pub loaded: usize,
    pub queries: Vec<QueryResult>,
}

/// Production wiring: HTTP source, CSV sink and log file from the config
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Pipeline { config }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn run(&self) -> Result<RunReport> {
        let log = ProgressLog::new(&self.config.log_path);
        let sink = CsvFileSink::new(&self.config.output_path);
        let source = match HttpTableSource::new(&self.config.url, &TABLE_ATTRIBUTES) {
            Ok(source) => source,
            Err(err) => {
                record_abort(&log, &err.to_string());
                return Err(err);
            }
        };
        run_pipeline(&self.config, &source, &sink, &log)
    }
}

/// Run the full ETL sequence with the given collaborators.
pub fn run_pipeline(
    config: &PipelineConfig,
    source: &dyn BankSource,
    sink: &dyn RecordSink,
    log: &ProgressLog,
) -> Result<RunReport> {
    let outcome = run_stages(config, source, sink, log);
    if let Err(err) = &outcome {
        record_abort(log, &err.to_string());
    }
    outcome
}

fn run_stages(
    config: &PipelineConfig,
    source: &dyn BankSource,
    sink: &dyn RecordSink,
    log: &ProgressLog,
) -> Result<RunReport> {
    config.validate()?;
    log.log_progress("Preliminaries complete. Initiating ETL process")?;

    log::info!("Extracting from {}", source.describe());
    let banks = source.extract()?;
    log.log_progress("Data extraction complete. Initiating Transformation process")?;

    let rates = load_exchange_rates(&config.rate_path)?;
    let records = transform(&banks, &rates)?;
    log.log_progress("Data transformation complete. Initiating Loading process")?;

    sink.write_records(&records)?;
    log.log_progress("Data saved to CSV file")?;

    let conn = open_store(&config.store_path)?;
    let outcome = load_and_query(&conn, config, &records, log);
    let closed = close_store(conn);

    match outcome {
        Ok((loaded, queries)) => {
            closed?;
            log.log_progress("Server Connection closed")?;
            Ok(RunReport {
                extracted: banks.len(),
                loaded,
                queries,
            })
        }
        Err(err) => {
            match closed {
                Ok(()) => record_best_effort(log, "Server Connection closed"),
                Err(close_err) => log::warn!("Failed to close store: {}", close_err),
            }
            Err(err)
        }
    }
}

/// Everything that needs the open connection
fn load_and_query(
    conn: &Connection,
    config: &PipelineConfig,
    records: &[BankRecord],
    log: &ProgressLog,
) -> Result<(usize, Vec<QueryResult>)> {
    log.log_progress("SQL connection initiated")?;

    let loaded = load_to_store(conn, records, &config.table_name)?;
    log.log_progress("Data loaded to Database as a table, Executing queries")?;

    let queries = config
        .queries()
        .iter()
        .map(|query| run_query(conn, query))
        .collect::<Result<Vec<_>>>()?;
    log.log_progress("Process Complete")?;

    Ok((loaded, queries))
}

fn record_abort(log: &ProgressLog, reason: &str) {
    record_best_effort(log, &format!("ETL process aborted: {}", reason));
}

/// Log without letting a log failure replace the error being reported
fn record_best_effort(log: &ProgressLog, message: &str) {
    if let Err(err) = log.log_progress(message) {
        log::warn!("Could not write progress log: {}", err);
    }
}
