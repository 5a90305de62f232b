// ⚙️ Pipeline configuration
// Every path, URL and table name a run touches, passed explicitly

use crate::db::quote_identifier;
use crate::error::{EtlError, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Archived copy of the Wikipedia "List of largest banks" page
pub const DEFAULT_URL: &str =
    "https://web.archive.org/web/20230908091635/https://en.wikipedia.org/wiki/List_of_largest_banks";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub url: String,
    pub rate_path: PathBuf,
    pub output_path: PathBuf,
    pub store_path: PathBuf,
    pub table_name: String,
    pub log_path: PathBuf,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        PipelineConfig {
            url: DEFAULT_URL.to_string(),
            rate_path: PathBuf::from("exchange_rate.csv"),
            output_path: PathBuf::from("Largest_banks_data.csv"),
            store_path: PathBuf::from("Banks.db"),
            table_name: "Largest_banks".to_string(),
            log_path: PathBuf::from("code_log.txt"),
        }
    }
}

impl PipelineConfig {
    /// Load from a JSON file; keys that are absent keep their defaults
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|err| {
            if err.kind() == ErrorKind::NotFound {
                EtlError::ResourceNotFound {
                    path: path.to_path_buf(),
                }
            } else {
                EtlError::InvalidConfig(format!("{}: {}", path.display(), err))
            }
        })?;

        let config: PipelineConfig = serde_json::from_reader(file)
            .map_err(|err| EtlError::InvalidConfig(format!("{}: {}", path.display(), err)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.url.trim().is_empty() {
            return Err(EtlError::InvalidConfig("url must not be empty".to_string()));
        }
        if self.table_name.trim().is_empty() {
            return Err(EtlError::InvalidConfig(
                "table_name must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// The three analytical queries, in execution order
    pub fn queries(&self) -> [String; 3] {
        let table = quote_identifier(&self.table_name);
        [
            format!("SELECT * FROM {}", table),
            format!("SELECT Name, AVG(MC_USD_Billion) FROM {} GROUP BY Name", table),
            format!("SELECT Name FROM {} LIMIT 5", table),
        ]
    }
}
