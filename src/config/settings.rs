//! User settings for paycycle
//!
//! Holds the engine's tunables: the reconciliation matching window, the
//! date transactions become eligible for reconciliation, and display
//! preferences. Everything that used to be a process-wide constant in older
//! budgeting tools is an explicit value here, loaded once and passed into
//! the components that need it.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::paths::PaycyclePaths;
use crate::error::PaycycleError;
use crate::storage::file_io::{read_json, write_json_atomic};

/// User settings for paycycle
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Schema version for migration support
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,

    /// How many days before/after an external posting date a ledger
    /// transaction may fall and still be proposed as a match
    #[serde(default = "default_match_window_days")]
    pub match_window_days: i64,

    /// Transactions dated before this are never offered for reconciliation
    #[serde(default)]
    pub reconcile_begin_date: Option<NaiveDate>,

    /// Default currency symbol
    #[serde(default = "default_currency")]
    pub currency_symbol: String,

    /// Date format preference (strftime format)
    #[serde(default = "default_date_format")]
    pub date_format: String,
}

fn default_schema_version() -> u32 {
    1
}

fn default_match_window_days() -> i64 {
    3
}

fn default_currency() -> String {
    "$".to_string()
}

fn default_date_format() -> String {
    "%Y-%m-%d".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            schema_version: default_schema_version(),
            match_window_days: default_match_window_days(),
            reconcile_begin_date: None,
            currency_symbol: default_currency(),
            date_format: default_date_format(),
        }
    }
}

impl Settings {
    /// Load settings from disk, creating the file with defaults if missing
    pub fn load_or_create(paths: &PaycyclePaths) -> Result<Self, PaycycleError> {
        let path = paths.settings_file();
        if path.exists() {
            read_json(&path)
        } else {
            let settings = Self::default();
            settings.save(paths)?;
            Ok(settings)
        }
    }

    /// Save settings to disk
    pub fn save(&self, paths: &PaycyclePaths) -> Result<(), PaycycleError> {
        write_json_atomic(paths.settings_file(), self)
    }
}
