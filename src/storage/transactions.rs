//! Transaction repository for JSON storage
//!
//! Manages loading and saving ledger transactions to transactions.json,
//! with indexes by budget (through allocations) and by source schedule.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::RwLock;

use chrono::NaiveDate;

use crate::error::PaycycleError;
use crate::models::{BudgetId, ScheduleId, Transaction, TransactionId};

use super::file_io::{read_json, write_json_atomic};

/// Serializable transaction data structure
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
struct TransactionData {
    transactions: Vec<Transaction>,
}

/// Repository for transaction persistence with indexing
pub struct TransactionRepository {
    path: PathBuf,
    data: RwLock<HashMap<TransactionId, Transaction>>,
    /// Index: budget_id -> transaction_ids (through allocations)
    by_budget: RwLock<HashMap<BudgetId, Vec<TransactionId>>>,
    /// Index: schedule_id -> transaction_ids (materialized occurrences)
    by_schedule: RwLock<HashMap<ScheduleId, Vec<TransactionId>>>,
}

impl TransactionRepository {
    /// Create a new transaction repository
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            data: RwLock::new(HashMap::new()),
            by_budget: RwLock::new(HashMap::new()),
            by_schedule: RwLock::new(HashMap::new()),
        }
    }

    /// Load transactions from disk and build indexes
    pub fn load(&self) -> Result<(), PaycycleError> {
        let file_data: TransactionData = read_json(&self.path)?;

        let mut data = self
            .data
            .write()
            .map_err(|e| PaycycleError::Storage(format!("Failed to acquire write lock: {}", e)))?;
        let mut by_budget = self
            .by_budget
            .write()
            .map_err(|e| PaycycleError::Storage(format!("Failed to acquire write lock: {}", e)))?;
        let mut by_schedule = self
            .by_schedule
            .write()
            .map_err(|e| PaycycleError::Storage(format!("Failed to acquire write lock: {}", e)))?;

        data.clear();
        by_budget.clear();
        by_schedule.clear();

        for txn in file_data.transactions {
            let id = txn.id;
            for allocation in &txn.allocations {
                let ids = by_budget.entry(allocation.budget_id).or_default();
                if !ids.contains(&id) {
                    ids.push(id);
                }
            }
            if let Some(schedule_id) = txn.scheduled_id {
                by_schedule.entry(schedule_id).or_default().push(id);
            }
            data.insert(id, txn);
        }

        Ok(())
    }

    /// Save transactions to disk
    pub fn save(&self) -> Result<(), PaycycleError> {
        let data = self
            .data
            .read()
            .map_err(|e| PaycycleError::Storage(format!("Failed to acquire read lock: {}", e)))?;

        let mut transactions: Vec<_> = data.values().cloned().collect();
        transactions.sort_by(|a, b| a.date.cmp(&b.date).then(a.id.cmp(&b.id)));

        let file_data = TransactionData { transactions };
        write_json_atomic(&self.path, &file_data)
    }

    /// Get a transaction by ID
    pub fn get(&self, id: TransactionId) -> Result<Option<Transaction>, PaycycleError> {
        let data = self
            .data
            .read()
            .map_err(|e| PaycycleError::Storage(format!("Failed to acquire read lock: {}", e)))?;

        Ok(data.get(&id).cloned())
    }

    /// Get all transactions, ordered by (date, id) for determinism
    pub fn get_all(&self) -> Result<Vec<Transaction>, PaycycleError> {
        let data = self
            .data
            .read()
            .map_err(|e| PaycycleError::Storage(format!("Failed to acquire read lock: {}", e)))?;

        let mut transactions: Vec<_> = data.values().cloned().collect();
        transactions.sort_by(|a, b| a.date.cmp(&b.date).then(a.id.cmp(&b.id)));
        Ok(transactions)
    }

    /// Get transactions in a closed date range, ordered by (date, id)
    pub fn get_by_date_range(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Transaction>, PaycycleError> {
        let all = self.get_all()?;
        Ok(all
            .into_iter()
            .filter(|t| t.date >= start && t.date <= end)
            .collect())
    }

    /// Get transactions with an allocation against a budget
    pub fn get_by_budget(&self, budget_id: BudgetId) -> Result<Vec<Transaction>, PaycycleError> {
        let data = self
            .data
            .read()
            .map_err(|e| PaycycleError::Storage(format!("Failed to acquire read lock: {}", e)))?;
        let by_budget = self
            .by_budget
            .read()
            .map_err(|e| PaycycleError::Storage(format!("Failed to acquire read lock: {}", e)))?;

        let ids = by_budget
            .get(&budget_id)
            .map(|v| v.as_slice())
            .unwrap_or(&[]);
        let mut transactions: Vec<_> = ids.iter().filter_map(|id| data.get(id).cloned()).collect();
        transactions.sort_by(|a, b| a.date.cmp(&b.date).then(a.id.cmp(&b.id)));
        Ok(transactions)
    }

    /// Get transactions materialized from a schedule
    pub fn get_by_schedule(
        &self,
        schedule_id: ScheduleId,
    ) -> Result<Vec<Transaction>, PaycycleError> {
        let data = self
            .data
            .read()
            .map_err(|e| PaycycleError::Storage(format!("Failed to acquire read lock: {}", e)))?;
        let by_schedule = self
            .by_schedule
            .read()
            .map_err(|e| PaycycleError::Storage(format!("Failed to acquire read lock: {}", e)))?;

        let ids = by_schedule
            .get(&schedule_id)
            .map(|v| v.as_slice())
            .unwrap_or(&[]);
        let mut transactions: Vec<_> = ids.iter().filter_map(|id| data.get(id).cloned()).collect();
        transactions.sort_by(|a, b| a.date.cmp(&b.date).then(a.id.cmp(&b.id)));
        Ok(transactions)
    }

    /// Whether any allocation references the given budget
    pub fn references_budget(&self, budget_id: BudgetId) -> Result<bool, PaycycleError> {
        let by_budget = self
            .by_budget
            .read()
            .map_err(|e| PaycycleError::Storage(format!("Failed to acquire read lock: {}", e)))?;

        Ok(by_budget.get(&budget_id).is_some_and(|ids| !ids.is_empty()))
    }

    /// Insert or update a transaction
    pub fn upsert(&self, txn: Transaction) -> Result<(), PaycycleError> {
        let mut data = self
            .data
            .write()
            .map_err(|e| PaycycleError::Storage(format!("Failed to acquire write lock: {}", e)))?;
        let mut by_budget = self
            .by_budget
            .write()
            .map_err(|e| PaycycleError::Storage(format!("Failed to acquire write lock: {}", e)))?;
        let mut by_schedule = self
            .by_schedule
            .write()
            .map_err(|e| PaycycleError::Storage(format!("Failed to acquire write lock: {}", e)))?;

        // Remove from old indexes if updating
        if let Some(old) = data.get(&txn.id) {
            for allocation in &old.allocations {
                if let Some(ids) = by_budget.get_mut(&allocation.budget_id) {
                    ids.retain(|&id| id != txn.id);
                }
            }
            if let Some(schedule_id) = old.scheduled_id {
                if let Some(ids) = by_schedule.get_mut(&schedule_id) {
                    ids.retain(|&id| id != txn.id);
                }
            }
        }

        // Add to new indexes
        for allocation in &txn.allocations {
            let ids = by_budget.entry(allocation.budget_id).or_default();
            if !ids.contains(&txn.id) {
                ids.push(txn.id);
            }
        }
        if let Some(schedule_id) = txn.scheduled_id {
            by_schedule.entry(schedule_id).or_default().push(txn.id);
        }

        data.insert(txn.id, txn);
        Ok(())
    }

    /// Delete a transaction; its allocations go with it
    pub fn delete(&self, id: TransactionId) -> Result<bool, PaycycleError> {
        let mut data = self
            .data
            .write()
            .map_err(|e| PaycycleError::Storage(format!("Failed to acquire write lock: {}", e)))?;
        let mut by_budget = self
            .by_budget
            .write()
            .map_err(|e| PaycycleError::Storage(format!("Failed to acquire write lock: {}", e)))?;
        let mut by_schedule = self
            .by_schedule
            .write()
            .map_err(|e| PaycycleError::Storage(format!("Failed to acquire write lock: {}", e)))?;

        if let Some(txn) = data.remove(&id) {
            for allocation in &txn.allocations {
                if let Some(ids) = by_budget.get_mut(&allocation.budget_id) {
                    ids.retain(|&tid| tid != id);
                }
            }
            if let Some(schedule_id) = txn.scheduled_id {
                if let Some(ids) = by_schedule.get_mut(&schedule_id) {
                    ids.retain(|&tid| tid != id);
                }
            }
            Ok(true)
        } else {
            Ok(false)
        }
    }

    /// Count transactions
    pub fn count(&self) -> Result<usize, PaycycleError> {
        let data = self
            .data
            .read()
            .map_err(|e| PaycycleError::Storage(format!("Failed to acquire read lock: {}", e)))?;

        Ok(data.len())
    }
}
