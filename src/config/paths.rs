//! Path management for paycycle
//!
//! Provides XDG-compliant path resolution for configuration and data.
//!
//! ## Path Resolution Order
//!
//! 1. `PAYCYCLE_DATA_DIR` environment variable (if set)
//! 2. Unix (Linux/macOS): `$XDG_CONFIG_HOME/paycycle` or `~/.config/paycycle`
//! 3. Windows: `%APPDATA%\paycycle`

use std::path::PathBuf;

use crate::error::PaycycleError;

/// Manages all paths used by paycycle
#[derive(Debug, Clone)]
pub struct PaycyclePaths {
    /// Base directory for all paycycle data
    base_dir: PathBuf,
}

impl PaycyclePaths {
    /// Create a new PaycyclePaths instance
    ///
    /// # Errors
    ///
    /// Returns an error if the home directory cannot be determined.
    pub fn new() -> Result<Self, PaycycleError> {
        let base_dir = if let Ok(custom) = std::env::var("PAYCYCLE_DATA_DIR") {
            PathBuf::from(custom)
        } else {
            resolve_default_path()?
        };

        Ok(Self { base_dir })
    }

    /// Create PaycyclePaths with a custom base directory (useful for testing)
    pub fn with_base_dir(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    /// Get the base directory (~/.config/paycycle/ or equivalent)
    pub fn base_dir(&self) -> &PathBuf {
        &self.base_dir
    }

    /// Get the data directory (~/.config/paycycle/data/)
    pub fn data_dir(&self) -> PathBuf {
        self.base_dir.join("data")
    }

    /// Get the path to the settings file
    pub fn settings_file(&self) -> PathBuf {
        self.base_dir.join("config.json")
    }

    /// Get the path to accounts.json
    pub fn accounts_file(&self) -> PathBuf {
        self.data_dir().join("accounts.json")
    }

    /// Get the path to budgets.json
    pub fn budgets_file(&self) -> PathBuf {
        self.data_dir().join("budgets.json")
    }

    /// Get the path to schedules.json
    pub fn schedules_file(&self) -> PathBuf {
        self.data_dir().join("schedules.json")
    }

    /// Get the path to transactions.json
    pub fn transactions_file(&self) -> PathBuf {
        self.data_dir().join("transactions.json")
    }

    /// Get the path to external.json (bank-feed transactions)
    pub fn external_file(&self) -> PathBuf {
        self.data_dir().join("external.json")
    }

    /// Get the path to links.json (reconciliation links)
    pub fn links_file(&self) -> PathBuf {
        self.data_dir().join("links.json")
    }

    /// Ensure all required directories exist
    pub fn ensure_directories(&self) -> Result<(), PaycycleError> {
        std::fs::create_dir_all(&self.base_dir)
            .map_err(|e| PaycycleError::Io(format!("Failed to create base directory: {}", e)))?;

        std::fs::create_dir_all(self.data_dir())
            .map_err(|e| PaycycleError::Io(format!("Failed to create data directory: {}", e)))?;

        Ok(())
    }

    /// Check if paycycle has been initialized (config file exists)
    pub fn is_initialized(&self) -> bool {
        self.settings_file().exists()
    }
}

/// Resolve the default data directory path based on platform
#[cfg(not(windows))]
fn resolve_default_path() -> Result<PathBuf, PaycycleError> {
    // Unix (Linux/macOS): Use XDG_CONFIG_HOME if set, otherwise ~/.config
    let config_base = std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .or_else(|_| {
            std::env::var("HOME").map(|home| PathBuf::from(home).join(".config"))
        })
        .map_err(|_| PaycycleError::Config("Could not determine home directory".into()))?;
    Ok(config_base.join("paycycle"))
}

/// Resolve the default data directory path based on platform
#[cfg(windows)]
fn resolve_default_path() -> Result<PathBuf, PaycycleError> {
    // Windows: Use APPDATA
    let appdata = std::env::var("APPDATA")
        .map_err(|_| PaycycleError::Config("Could not determine APPDATA directory".into()))?;
    Ok(PathBuf::from(appdata).join("paycycle"))
}
