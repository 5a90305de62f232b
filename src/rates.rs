// 💱 Exchange Rate Table
// Static USD → target currency rates, loaded once per run from a CSV file

use crate::error::{EtlError, Result};
use csv::ReaderBuilder;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{ErrorKind, Read};
use std::path::Path;

// ============================================================================
// CURRENCY
// ============================================================================

/// Target currencies the transformer derives from the USD figure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Currency {
    Gbp,
    Eur,
    Inr,
}

impl Currency {
    pub const TARGETS: [Currency; 3] = [Currency::Gbp, Currency::Eur, Currency::Inr];

    /// ISO 4217 code as it appears in the rate file
    pub fn code(&self) -> &'static str {
        match self {
            Currency::Gbp => "GBP",
            Currency::Eur => "EUR",
            Currency::Inr => "INR",
        }
    }
}

// ============================================================================
// EXCHANGE RATE TABLE
// ============================================================================

/// Units of target currency per 1 USD, keyed by currency code.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExchangeRateTable {
    rates: BTreeMap<String, f64>,
}

impl ExchangeRateTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder pattern: add or overwrite a rate
    pub fn with_rate(mut self, code: &str, rate: f64) -> Self {
        self.rates.insert(code.to_string(), rate);
        self
    }

    pub fn rate(&self, code: &str) -> Option<f64> {
        self.rates.get(code).copied()
    }

    /// Rate for one of the required target currencies
    pub fn require(&self, currency: Currency) -> Result<f64> {
        self.rate(currency.code()).ok_or_else(|| EtlError::MissingRate {
            currency: currency.code().to_string(),
        })
    }

    pub fn len(&self) -> usize {
        self.rates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rates.is_empty()
    }

    pub fn codes(&self) -> impl Iterator<Item = &str> {
        self.rates.keys().map(String::as_str)
    }
}

// ============================================================================
// LOADER
// ============================================================================

/// Load the rate table from a `code,rate` CSV file.
///
/// The first row is always treated as a header and discarded. Codes are not
/// validated; a later row for the same code replaces the earlier one.
pub fn load_exchange_rates(path: &Path) -> Result<ExchangeRateTable> {
    let file = File::open(path).map_err(|err| {
        if err.kind() == ErrorKind::NotFound {
            EtlError::ResourceNotFound {
                path: path.to_path_buf(),
            }
        } else {
            EtlError::ReadError {
                path: path.to_path_buf(),
                source: err.into(),
            }
        }
    })?;

    let table = parse_exchange_rates(file, path)?;

    log::debug!(
        "Loaded {} exchange rates from {}",
        table.len(),
        path.display()
    );
    Ok(table)
}

/// Parse rate rows from any reader (header row discarded).
/// `origin` only labels read errors.
pub fn parse_exchange_rates<R: Read>(reader: R, origin: &Path) -> Result<ExchangeRateTable> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let mut table = ExchangeRateTable::new();

    for result in reader.records() {
        let record = result.map_err(|source| EtlError::ReadError {
            path: origin.to_path_buf(),
            source,
        })?;
        let line = record.position().map(|p| p.line()).unwrap_or_default();

        let (code, raw_rate) = match (record.get(0), record.get(1)) {
            (Some(code), Some(rate)) => (code.trim(), rate.trim()),
            _ => {
                return Err(EtlError::MalformedRateRow {
                    line,
                    reason: format!("expected 2 fields, found {}", record.len()),
                })
            }
        };

        let rate: f64 = raw_rate.parse().map_err(|_| EtlError::MalformedRateRow {
            line,
            reason: format!("rate {:?} is not a number", raw_rate),
        })?;

        if !rate.is_finite() || rate <= 0.0 {
            return Err(EtlError::MalformedRateRow {
                line,
                reason: format!("rate {} must be a positive number", rate),
            });
        }

        table.rates.insert(code.to_string(), rate);
    }

    Ok(table)
}
