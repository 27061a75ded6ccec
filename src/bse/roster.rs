use anyhow::{anyhow, Context, Result};
use log::warn;
use serde::Deserialize;
use std::fmt;
use std::path::Path;

use crate::utils::dirs;

const REQUIRED_COLUMNS: [&str; 3] = ["Sr No", "Symbol", "Security Code"];

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Symbol(String);

impl Symbol {
    pub fn new(symbol: String) -> Result<Self> {
        let uppercase_symbol = symbol.trim().to_uppercase();
        if uppercase_symbol.is_empty() {
            return Err(anyhow!("Symbol cannot be empty"));
        }
        if !uppercase_symbol
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-')
        {
            return Err(anyhow!(
                "Symbol must contain only alphanumeric characters or hyphens: {}",
                symbol
            ));
        }
        Ok(Symbol(uppercase_symbol))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for Symbol {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Deserialize)]
struct RawRosterRecord {
    #[serde(rename = "Sr No")]
    serial: String,
    #[serde(rename = "Symbol")]
    symbol: String,
    #[serde(rename = "Security Code")]
    security_code: String,
}

/// One entity to process: serial number, display symbol and the code the
/// exchange search understands.
#[derive(Debug, Clone)]
pub struct RosterEntry {
    pub serial: u32,
    pub symbol: Symbol,
    pub security_code: String,
}

impl RosterEntry {
    pub fn working_folder_name(&self) -> String {
        dirs::working_folder_name(self.serial, self.symbol.as_str())
    }
}

/// Load the roster CSV. A missing required column is a fatal
/// misconfiguration; a malformed row is skipped with a warning.
pub fn load_roster(path: &Path) -> Result<Vec<RosterEntry>> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("failed to open roster: {}", path.display()))?;

    let headers = reader.headers()?.clone();
    for required in REQUIRED_COLUMNS {
        if !headers.iter().any(|h| h == required) {
            return Err(anyhow!(
                "roster is missing required column '{}' in {}",
                required,
                path.display()
            ));
        }
    }

    let mut entries = Vec::new();
    for record in reader.deserialize::<RawRosterRecord>() {
        let record = record?;
        let serial: u32 = match record.serial.trim().parse() {
            Ok(serial) => serial,
            Err(_) => {
                warn!("skipping roster row with invalid serial: {:?}", record.serial);
                continue;
            }
        };
        let symbol = match Symbol::new(record.symbol) {
            Ok(symbol) => symbol,
            Err(e) => {
                warn!("skipping roster row {}: {}", serial, e);
                continue;
            }
        };
        entries.push(RosterEntry {
            serial,
            symbol,
            security_code: record.security_code.trim().to_string(),
        });
    }

    log::debug!("Loaded {} roster entries from {}", entries.len(), path.display());
    Ok(entries)
}
