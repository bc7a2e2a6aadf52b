//! Report settings.
//!
//! Everything that used to be a magic constant of the export (lot prefix
//! length, disposal marker, excluded counterparty codes, column names) and
//! the output directory lives in [`Settings`], which is passed explicitly
//! to the pipeline, the CLI and the HTTP server.

use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

use crate::error::ConfigError;

/// Number of lot identifier characters that define a lot.
pub const DEFAULT_LOT_PREFIX_LEN: usize = 11;

/// Counterparty name used for goods sent to disposal.
pub const DEFAULT_DISPOSAL_MARKER: &str = "Corbeille";

/// Counterparty codes whose rows are dropped before partitioning.
pub const DEFAULT_EXCLUDED_CODES: &[&str] = &["-REGUL"];

/// Header names of the transaction export.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnMap {
    pub kind: String,
    pub party: String,
    pub date: String,
    pub lot_id: String,
    pub description: String,
    pub weight: String,
    pub unit: String,
    pub unit_price: String,
    pub result: String,
    /// Counterparty code, only used to filter out excluded rows.
    pub party_code: String,
}

impl Default for ColumnMap {
    fn default() -> Self {
        Self {
            kind: "TYPE".to_string(),
            party: "Raison C/F".to_string(),
            date: "Date".to_string(),
            lot_id: "Lot".to_string(),
            description: "Désignation".to_string(),
            weight: "Poids".to_string(),
            unit: "UN".to_string(),
            unit_price: "PU".to_string(),
            result: "Résultat".to_string(),
            party_code: "Code C/F".to_string(),
        }
    }
}

impl ColumnMap {
    /// Column names in report order (the header line of every buyer group).
    pub fn report_headers(&self) -> [&str; 9] {
        [
            &self.kind,
            &self.party,
            &self.date,
            &self.lot_id,
            &self.description,
            &self.weight,
            &self.unit,
            &self.unit_price,
            &self.result,
        ]
    }
}

/// Settings for one report run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Lot identifier characters compared to detect a lot boundary.
    pub lot_prefix_len: usize,
    /// Counterparty name that tags a row as disposal.
    pub disposal_marker: String,
    /// Values of the counterparty code column whose rows are dropped.
    pub excluded_party_codes: Vec<String>,
    /// Where report files are written.
    pub output_dir: PathBuf,
    /// Export header names.
    pub columns: ColumnMap,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            lot_prefix_len: DEFAULT_LOT_PREFIX_LEN,
            disposal_marker: DEFAULT_DISPOSAL_MARKER.to_string(),
            excluded_party_codes: DEFAULT_EXCLUDED_CODES.iter().map(|s| s.to_string()).collect(),
            output_dir: PathBuf::from("."),
            columns: ColumnMap::default(),
        }
    }
}

impl Settings {
    /// Build settings from `MARGES_*` environment variables, loading a
    /// `.env` file first if present. Unset variables keep their defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|name| env::var(name).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut settings = Self::default();

        if let Some(dir) = lookup("MARGES_OUTPUT_DIR") {
            settings.output_dir = PathBuf::from(dir);
        }

        if let Some(raw) = lookup("MARGES_LOT_PREFIX_LEN") {
            settings.lot_prefix_len = match raw.trim().parse::<usize>() {
                Ok(n) if n > 0 => n,
                _ => {
                    return Err(ConfigError::InvalidValue {
                        name: "MARGES_LOT_PREFIX_LEN".to_string(),
                        value: raw,
                    })
                }
            };
        }

        if let Some(marker) = lookup("MARGES_DISPOSAL_MARKER") {
            if marker.trim().is_empty() {
                return Err(ConfigError::InvalidValue {
                    name: "MARGES_DISPOSAL_MARKER".to_string(),
                    value: marker,
                });
            }
            settings.disposal_marker = marker.trim().to_string();
        }

        if let Some(codes) = lookup("MARGES_EXCLUDED_CODES") {
            settings.excluded_party_codes = codes
                .split(',')
                .map(|c| c.trim())
                .filter(|c| !c.is_empty())
                .map(String::from)
                .collect();
        }

        Ok(settings)
    }

    /// Override the output directory.
    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }
}
