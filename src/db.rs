use crate::error::{EtlError, Result};
use rusqlite::types::ValueRef;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Bank record after currency conversion.
/// Field names on the wire match the columns of the published dataset.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct BankRecord {
    #[serde(rename = "Name")]
    pub name: String,

    #[serde(rename = "MC_USD_Billion")]
    pub market_cap_usd: f64,

    #[serde(rename = "MC_GBP_Billion")]
    pub market_cap_gbp: f64,

    #[serde(rename = "MC_EUR_Billion")]
    pub market_cap_eur: f64,

    #[serde(rename = "MC_INR_Billion")]
    pub market_cap_inr: f64,
}

/// Store column names, in insertion order
pub const STORE_COLUMNS: [&str; 5] = [
    "Name",
    "MC_USD_Billion",
    "MC_GBP_Billion",
    "MC_EUR_Billion",
    "MC_INR_Billion",
];

/// Quote an identifier for use in SQL text
pub fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

// ============================================================================
// CONNECTION
// ============================================================================

/// Open (or create) the SQLite store. `:memory:` opens a private in-memory db.
pub fn open_store(path: &Path) -> Result<Connection> {
    let conn = Connection::open(path).map_err(|source| EtlError::StoreWriteError {
        table: path.display().to_string(),
        source,
    })?;
    log::debug!("Opened store {}", path.display());
    Ok(conn)
}

/// Release the connection, surfacing any error SQLite reports on close
pub fn close_store(conn: Connection) -> Result<()> {
    conn.close()
        .map_err(|(_, source)| EtlError::StoreWriteError {
            table: "<connection>".to_string(),
            source,
        })
}

pub fn count_rows(conn: &Connection, table_name: &str) -> Result<i64> {
    let sql = format!("SELECT COUNT(*) FROM {}", quote_identifier(table_name));
    conn.query_row(&sql, [], |row| row.get(0))
        .map_err(|err| EtlError::QueryError {
            query: sql.clone(),
            message: err.to_string(),
        })
}

// ============================================================================
// QUERY RUNNER
// ============================================================================

/// A single cell of a query result
#[derive(Debug, Clone, PartialEq)]
pub enum QueryValue {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
}

impl From<ValueRef<'_>> for QueryValue {
    fn from(value: ValueRef<'_>) -> Self {
        match value {
            ValueRef::Null => QueryValue::Null,
            ValueRef::Integer(i) => QueryValue::Integer(i),
            ValueRef::Real(f) => QueryValue::Real(f),
            ValueRef::Text(t) => QueryValue::Text(String::from_utf8_lossy(t).into_owned()),
            ValueRef::Blob(b) => QueryValue::Blob(b.to_vec()),
        }
    }
}

impl fmt::Display for QueryValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryValue::Null => write!(f, "NULL"),
            QueryValue::Integer(i) => write!(f, "{}", i),
            QueryValue::Real(r) => write!(f, "{}", r),
            QueryValue::Text(t) => write!(f, "{}", t),
            QueryValue::Blob(b) => write!(f, "<{} bytes>", b.len()),
        }
    }
}

/// Tabular result of a read query
#[derive(Debug, Clone, PartialEq)]
pub struct QueryResult {
    pub query: String,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<QueryValue>>,
}

impl QueryResult {
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// All values of one column, by name
    pub fn column(&self, name: &str) -> Option<Vec<&QueryValue>> {
        let index = self.columns.iter().position(|c| c == name)?;
        Some(self.rows.iter().filter_map(|row| row.get(index)).collect())
    }
}

impl fmt::Display for QueryResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered: Vec<Vec<String>> = self
            .rows
            .iter()
            .map(|row| row.iter().map(ToString::to_string).collect())
            .collect();

        let mut widths: Vec<usize> = self.columns.iter().map(|c| c.chars().count()).collect();
        for row in &rendered {
            for (width, cell) in widths.iter_mut().zip(row) {
                *width = (*width).max(cell.chars().count());
            }
        }

        writeln!(f, "{}", self.query)?;
        let header: Vec<String> = self
            .columns
            .iter()
            .zip(&widths)
            .map(|(c, w)| format!("{:<w$}", c, w = *w))
            .collect();
        writeln!(f, "{}", header.join(" | ").trim_end())?;
        let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
        writeln!(f, "{}", rule.join("-+-"))?;

        for row in &rendered {
            let line: Vec<String> = row
                .iter()
                .zip(&widths)
                .map(|(cell, w)| format!("{:<w$}", cell, w = *w))
                .collect();
            writeln!(f, "{}", line.join(" | ").trim_end())?;
        }

        write!(f, "({} rows)", self.rows.len())
    }
}

/// Run a read-only statement verbatim and collect every row.
///
/// Statements that would modify the database are refused.
pub fn run_query(conn: &Connection, query: &str) -> Result<QueryResult> {
    let query_error = |err: rusqlite::Error| EtlError::QueryError {
        query: query.to_string(),
        message: err.to_string(),
    };

    let mut stmt = conn.prepare(query).map_err(query_error)?;

    if !stmt.readonly() {
        return Err(EtlError::QueryError {
            query: query.to_string(),
            message: "statement is not read-only".to_string(),
        });
    }

    let columns: Vec<String> = stmt
        .column_names()
        .into_iter()
        .map(str::to_string)
        .collect();
    let column_count = columns.len();

    let mut rows = Vec::new();
    let mut cursor = stmt.query([]).map_err(query_error)?;
    while let Some(row) = cursor.next().map_err(query_error)? {
        let mut values = Vec::with_capacity(column_count);
        for index in 0..column_count {
            let value = row.get_ref(index).map_err(query_error)?;
            values.push(QueryValue::from(value));
        }
        rows.push(values);
    }

    log::debug!("{} -> {} rows", query, rows.len());

    Ok(QueryResult {
        query: query.to_string(),
        columns,
        rows,
    })
}
