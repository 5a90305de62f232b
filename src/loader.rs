// 💾 Loader - persists the transformed record set
// CSV file sink (with row index) + SQLite table (full replace, no index)

use crate::db::{quote_identifier, BankRecord, STORE_COLUMNS};
use crate::error::{EtlError, Result};
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

// ============================================================================
// FILE SINK
// ============================================================================

/// One CSV line: the record plus its 0-based position.
/// The index column has an empty header, like a dataframe export.
#[derive(Debug, Serialize, Deserialize)]
struct FileRow {
    #[serde(rename = "")]
    index: usize,

    #[serde(rename = "Name")]
    name: String,

    #[serde(rename = "MC_USD_Billion")]
    market_cap_usd: f64,

    #[serde(rename = "MC_GBP_Billion")]
    market_cap_gbp: f64,

    #[serde(rename = "MC_EUR_Billion")]
    market_cap_eur: f64,

    #[serde(rename = "MC_INR_Billion")]
    market_cap_inr: f64,
}

impl FileRow {
    fn new(index: usize, record: &BankRecord) -> Self {
        FileRow {
            index,
            name: record.name.clone(),
            market_cap_usd: record.market_cap_usd,
            market_cap_gbp: record.market_cap_gbp,
            market_cap_eur: record.market_cap_eur,
            market_cap_inr: record.market_cap_inr,
        }
    }

    fn into_record(self) -> BankRecord {
        BankRecord {
            name: self.name,
            market_cap_usd: self.market_cap_usd,
            market_cap_gbp: self.market_cap_gbp,
            market_cap_eur: self.market_cap_eur,
            market_cap_inr: self.market_cap_inr,
        }
    }
}

/// Header of the output file: empty index column, then the store columns
const FILE_HEADER: [&str; 6] = [
    "",
    STORE_COLUMNS[0],
    STORE_COLUMNS[1],
    STORE_COLUMNS[2],
    STORE_COLUMNS[3],
    STORE_COLUMNS[4],
];

/// Write every record to `path`, replacing any existing file.
/// The header row is written even when there are no records.
pub fn load_to_file(records: &[BankRecord], path: &Path) -> Result<()> {
    let write_error = |source: csv::Error| EtlError::WriteError {
        path: path.to_path_buf(),
        source,
    };

    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(path)
        .map_err(write_error)?;
    writer.write_record(FILE_HEADER).map_err(write_error)?;
    for (index, record) in records.iter().enumerate() {
        writer
            .serialize(FileRow::new(index, record))
            .map_err(write_error)?;
    }
    writer.flush().map_err(|err| write_error(err.into()))?;

    log::info!("Wrote {} records to {}", records.len(), path.display());
    Ok(())
}

/// Read a file written by `load_to_file`, dropping the index column
pub fn read_from_file(path: &Path) -> Result<Vec<BankRecord>> {
    let mut reader = csv::Reader::from_path(path).map_err(|source| EtlError::ReadError {
        path: path.to_path_buf(),
        source,
    })?;

    let mut records = Vec::new();
    for result in reader.deserialize() {
        let row: FileRow = result.map_err(|source| EtlError::ReadError {
            path: path.to_path_buf(),
            source,
        })?;
        records.push(row.into_record());
    }

    Ok(records)
}

/// RecordSink - destination for the transformed record set
pub trait RecordSink {
    fn write_records(&self, records: &[BankRecord]) -> Result<()>;

    fn describe(&self) -> String;
}

/// Production sink: CSV file at a fixed path
pub struct CsvFileSink {
    path: PathBuf,
}

impl CsvFileSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        CsvFileSink { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl RecordSink for CsvFileSink {
    fn write_records(&self, records: &[BankRecord]) -> Result<()> {
        load_to_file(records, &self.path)
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

// ============================================================================
// STORE SINK
// ============================================================================

/// Replace `table_name` with the given records.
///
/// Drop, create and insert run in one transaction, so the table never ends up
/// half-written and repeated loads never append.
pub fn load_to_store(conn: &Connection, records: &[BankRecord], table_name: &str) -> Result<usize> {
    let store_error = |source: rusqlite::Error| EtlError::StoreWriteError {
        table: table_name.to_string(),
        source,
    };

    if table_name.trim().is_empty() {
        return Err(store_error(rusqlite::Error::InvalidParameterName(
            "empty table name".to_string(),
        )));
    }

    let table = quote_identifier(table_name);
    let tx = conn.unchecked_transaction().map_err(store_error)?;

    tx.execute_batch(&format!(
        "DROP TABLE IF EXISTS {table};
         CREATE TABLE {table} (
            Name TEXT NOT NULL,
            MC_USD_Billion REAL NOT NULL,
            MC_GBP_Billion REAL NOT NULL,
            MC_EUR_Billion REAL NOT NULL,
            MC_INR_Billion REAL NOT NULL
         );"
    ))
    .map_err(store_error)?;

    {
        let mut stmt = tx
            .prepare(&format!(
                "INSERT INTO {} ({}) VALUES (?1, ?2, ?3, ?4, ?5)",
                table,
                STORE_COLUMNS.join(", ")
            ))
            .map_err(store_error)?;

        for record in records {
            stmt.execute(params![
                record.name,
                record.market_cap_usd,
                record.market_cap_gbp,
                record.market_cap_eur,
                record.market_cap_inr,
            ])
            .map_err(store_error)?;
        }
    }

    tx.commit().map_err(store_error)?;

    log::info!("Loaded {} rows into table {}", records.len(), table_name);
    Ok(records.len())
}
