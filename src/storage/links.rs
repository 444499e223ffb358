//! Reconciliation link repository for JSON storage
//!
//! Manages links in links.json with a two-sided index: by external key and
//! by ledger transaction id. Both indexes are unique, which is what gives
//! the 1:1 reconciliation property its teeth at the storage layer.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::RwLock;

use crate::error::PaycycleError;
use crate::models::{ExternalKey, ReconciliationLink, TransactionId};

use super::file_io::{read_json, write_json_atomic};

/// Serializable link data structure
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
struct LinkData {
    links: Vec<ReconciliationLink>,
}

/// Repository for reconciliation link persistence
pub struct LinkRepository {
    path: PathBuf,
    by_external: RwLock<HashMap<ExternalKey, ReconciliationLink>>,
    by_transaction: RwLock<HashMap<TransactionId, ExternalKey>>,
}

impl LinkRepository {
    /// Create a new link repository
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            by_external: RwLock::new(HashMap::new()),
            by_transaction: RwLock::new(HashMap::new()),
        }
    }

    /// Load links from disk and build both indexes
    pub fn load(&self) -> Result<(), PaycycleError> {
        let file_data: LinkData = read_json(&self.path)?;

        let mut by_external = self
            .by_external
            .write()
            .map_err(|e| PaycycleError::Storage(format!("Failed to acquire write lock: {}", e)))?;
        let mut by_transaction = self
            .by_transaction
            .write()
            .map_err(|e| PaycycleError::Storage(format!("Failed to acquire write lock: {}", e)))?;

        by_external.clear();
        by_transaction.clear();

        for link in file_data.links {
            by_transaction.insert(link.transaction_id, link.external.clone());
            by_external.insert(link.external.clone(), link);
        }

        Ok(())
    }

    /// Save links to disk
    pub fn save(&self) -> Result<(), PaycycleError> {
        let by_external = self
            .by_external
            .read()
            .map_err(|e| PaycycleError::Storage(format!("Failed to acquire read lock: {}", e)))?;

        let mut links: Vec<_> = by_external.values().cloned().collect();
        links.sort_by(|a, b| a.external.cmp(&b.external));

        let file_data = LinkData { links };
        write_json_atomic(&self.path, &file_data)
    }

    /// Get the link for an external transaction
    pub fn get_by_external(
        &self,
        key: &ExternalKey,
    ) -> Result<Option<ReconciliationLink>, PaycycleError> {
        let by_external = self
            .by_external
            .read()
            .map_err(|e| PaycycleError::Storage(format!("Failed to acquire read lock: {}", e)))?;

        Ok(by_external.get(key).cloned())
    }

    /// Get the link for a ledger transaction
    pub fn get_by_transaction(
        &self,
        transaction_id: TransactionId,
    ) -> Result<Option<ReconciliationLink>, PaycycleError> {
        let by_external = self
            .by_external
            .read()
            .map_err(|e| PaycycleError::Storage(format!("Failed to acquire read lock: {}", e)))?;
        let by_transaction = self
            .by_transaction
            .read()
            .map_err(|e| PaycycleError::Storage(format!("Failed to acquire read lock: {}", e)))?;

        Ok(by_transaction
            .get(&transaction_id)
            .and_then(|key| by_external.get(key))
            .cloned())
    }

    /// Get all links, sorted by external key
    pub fn get_all(&self) -> Result<Vec<ReconciliationLink>, PaycycleError> {
        let by_external = self
            .by_external
            .read()
            .map_err(|e| PaycycleError::Storage(format!("Failed to acquire read lock: {}", e)))?;

        let mut links: Vec<_> = by_external.values().cloned().collect();
        links.sort_by(|a, b| a.external.cmp(&b.external));
        Ok(links)
    }

    /// Insert a link, replacing any prior link for the same external key
    ///
    /// Conflict policy (who may replace whom) is the matcher service's job;
    /// the repository keeps both indexes consistent.
    pub fn insert(&self, link: ReconciliationLink) -> Result<(), PaycycleError> {
        let mut by_external = self
            .by_external
            .write()
            .map_err(|e| PaycycleError::Storage(format!("Failed to acquire write lock: {}", e)))?;
        let mut by_transaction = self
            .by_transaction
            .write()
            .map_err(|e| PaycycleError::Storage(format!("Failed to acquire write lock: {}", e)))?;

        if let Some(old) = by_external.get(&link.external) {
            by_transaction.remove(&old.transaction_id);
        }
        by_transaction.insert(link.transaction_id, link.external.clone());
        by_external.insert(link.external.clone(), link);
        Ok(())
    }

    /// Remove the link for an external transaction
    pub fn remove_by_external(&self, key: &ExternalKey) -> Result<bool, PaycycleError> {
        let mut by_external = self
            .by_external
            .write()
            .map_err(|e| PaycycleError::Storage(format!("Failed to acquire write lock: {}", e)))?;
        let mut by_transaction = self
            .by_transaction
            .write()
            .map_err(|e| PaycycleError::Storage(format!("Failed to acquire write lock: {}", e)))?;

        if let Some(link) = by_external.remove(key) {
            by_transaction.remove(&link.transaction_id);
            Ok(true)
        } else {
            Ok(false)
        }
    }

    /// Remove the link for a ledger transaction (cascade from ledger delete)
    pub fn remove_by_transaction(
        &self,
        transaction_id: TransactionId,
    ) -> Result<bool, PaycycleError> {
        let mut by_external = self
            .by_external
            .write()
            .map_err(|e| PaycycleError::Storage(format!("Failed to acquire write lock: {}", e)))?;
        let mut by_transaction = self
            .by_transaction
            .write()
            .map_err(|e| PaycycleError::Storage(format!("Failed to acquire write lock: {}", e)))?;

        if let Some(key) = by_transaction.remove(&transaction_id) {
            by_external.remove(&key);
            Ok(true)
        } else {
            Ok(false)
        }
    }

    /// Count links
    pub fn count(&self) -> Result<usize, PaycycleError> {
        let by_external = self
            .by_external
            .read()
            .map_err(|e| PaycycleError::Storage(format!("Failed to acquire read lock: {}", e)))?;

        Ok(by_external.len())
    }
}
