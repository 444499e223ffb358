//! External transaction repository for JSON storage
//!
//! Manages bank-feed transactions in external.json, keyed by the
//! (account, external id) pair. Upserting the same key again replaces the
//! record in place, which is what makes re-imports idempotent.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::RwLock;

use crate::error::PaycycleError;
use crate::models::{AccountId, ExternalKey, ExternalTransaction};

use super::file_io::{read_json, write_json_atomic};

/// Serializable external transaction data structure
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
struct ExternalData {
    transactions: Vec<ExternalTransaction>,
}

/// Outcome of an upsert: whether the key was new
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted,
    Updated,
}

/// Repository for external (bank-feed) transaction persistence
///
/// Backed by a BTreeMap so iteration order follows the key order and query
/// results are reproducible without re-sorting.
pub struct ExternalRepository {
    path: PathBuf,
    data: RwLock<BTreeMap<ExternalKey, ExternalTransaction>>,
}

impl ExternalRepository {
    /// Create a new external transaction repository
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            data: RwLock::new(BTreeMap::new()),
        }
    }

    /// Load external transactions from disk
    pub fn load(&self) -> Result<(), PaycycleError> {
        let file_data: ExternalData = read_json(&self.path)?;

        let mut data = self
            .data
            .write()
            .map_err(|e| PaycycleError::Storage(format!("Failed to acquire write lock: {}", e)))?;

        data.clear();
        for txn in file_data.transactions {
            data.insert(txn.key.clone(), txn);
        }

        Ok(())
    }

    /// Save external transactions to disk
    pub fn save(&self) -> Result<(), PaycycleError> {
        let data = self
            .data
            .read()
            .map_err(|e| PaycycleError::Storage(format!("Failed to acquire read lock: {}", e)))?;

        let file_data = ExternalData {
            transactions: data.values().cloned().collect(),
        };
        write_json_atomic(&self.path, &file_data)
    }

    /// Get an external transaction by key
    pub fn get(&self, key: &ExternalKey) -> Result<Option<ExternalTransaction>, PaycycleError> {
        let data = self
            .data
            .read()
            .map_err(|e| PaycycleError::Storage(format!("Failed to acquire read lock: {}", e)))?;

        Ok(data.get(key).cloned())
    }

    /// Get all external transactions in key order
    pub fn get_all(&self) -> Result<Vec<ExternalTransaction>, PaycycleError> {
        let data = self
            .data
            .read()
            .map_err(|e| PaycycleError::Storage(format!("Failed to acquire read lock: {}", e)))?;

        Ok(data.values().cloned().collect())
    }

    /// Get all external transactions for one account
    pub fn get_by_account(
        &self,
        account_id: AccountId,
    ) -> Result<Vec<ExternalTransaction>, PaycycleError> {
        let data = self
            .data
            .read()
            .map_err(|e| PaycycleError::Storage(format!("Failed to acquire read lock: {}", e)))?;

        Ok(data
            .values()
            .filter(|t| t.key.account_id == account_id)
            .cloned()
            .collect())
    }

    /// Insert or replace an external transaction by its stable key
    ///
    /// Replacing an existing key never duplicates the record; the returned
    /// outcome says which case happened.
    pub fn upsert(&self, txn: ExternalTransaction) -> Result<UpsertOutcome, PaycycleError> {
        let mut data = self
            .data
            .write()
            .map_err(|e| PaycycleError::Storage(format!("Failed to acquire write lock: {}", e)))?;

        match data.insert(txn.key.clone(), txn) {
            Some(_) => Ok(UpsertOutcome::Updated),
            None => Ok(UpsertOutcome::Inserted),
        }
    }

    /// Count external transactions
    pub fn count(&self) -> Result<usize, PaycycleError> {
        let data = self
            .data
            .read()
            .map_err(|e| PaycycleError::Storage(format!("Failed to acquire read lock: {}", e)))?;

        Ok(data.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Money;
    use chrono::NaiveDate;
    use tempfile::TempDir;

    fn create_test_repo() -> (TempDir, ExternalRepository) {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("external.json");
        let repo = ExternalRepository::new(path);
        (temp_dir, repo)
    }

    fn feed_txn(account_id: AccountId, fitid: &str, cents: i64) -> ExternalTransaction {
        ExternalTransaction::new(
            account_id,
            fitid,
            NaiveDate::from_ymd_opt(2025, 1, 15).unwrap(),
            Money::from_cents(cents),
            "CARD PURCHASE",
        )
    }

    #[test]
    fn test_upsert_is_idempotent_per_key() {
        let (_temp_dir, repo) = create_test_repo();
        repo.load().unwrap();

        let account_id = AccountId::new();
        let outcome = repo.upsert(feed_txn(account_id, "FITID-1", -5000)).unwrap();
        assert_eq!(outcome, UpsertOutcome::Inserted);

        // Re-importing the same external id replaces, never duplicates
        let outcome = repo.upsert(feed_txn(account_id, "FITID-1", -5000)).unwrap();
        assert_eq!(outcome, UpsertOutcome::Updated);
        assert_eq!(repo.count().unwrap(), 1);
    }

    #[test]
    fn test_same_fitid_on_different_accounts_is_distinct() {
        let (_temp_dir, repo) = create_test_repo();
        repo.load().unwrap();

        repo.upsert(feed_txn(AccountId::new(), "FITID-1", -5000)).unwrap();
        repo.upsert(feed_txn(AccountId::new(), "FITID-1", -5000)).unwrap();
        assert_eq!(repo.count().unwrap(), 2);
    }

    #[test]
    fn test_get_by_account() {
        let (_temp_dir, repo) = create_test_repo();
        repo.load().unwrap();

        let account_id = AccountId::new();
        repo.upsert(feed_txn(account_id, "A", -100)).unwrap();
        repo.upsert(feed_txn(account_id, "B", -200)).unwrap();
        repo.upsert(feed_txn(AccountId::new(), "C", -300)).unwrap();

        assert_eq!(repo.get_by_account(account_id).unwrap().len(), 2);
    }

    #[test]
    fn test_save_and_reload() {
        let (temp_dir, repo) = create_test_repo();
        repo.load().unwrap();

        let account_id = AccountId::new();
        repo.upsert(feed_txn(account_id, "FITID-9", -4200)).unwrap();
        repo.save().unwrap();

        let repo2 = ExternalRepository::new(temp_dir.path().join("external.json"));
        repo2.load().unwrap();
        let key = ExternalKey::new(account_id, "FITID-9");
        assert_eq!(
            repo2.get(&key).unwrap().unwrap().amount,
            Money::from_cents(-4200)
        );
    }
}
