//! Budget repository for JSON storage
//!
//! Manages loading and saving budgets to budgets.json

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::RwLock;

use crate::error::PaycycleError;
use crate::models::{Budget, BudgetId};

use super::file_io::{read_json, write_json_atomic};

/// Serializable budget data structure
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
struct BudgetData {
    budgets: Vec<Budget>,
}

/// Repository for budget persistence
pub struct BudgetRepository {
    path: PathBuf,
    data: RwLock<HashMap<BudgetId, Budget>>,
}

impl BudgetRepository {
    /// Create a new budget repository
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            data: RwLock::new(HashMap::new()),
        }
    }

    /// Load budgets from disk
    pub fn load(&self) -> Result<(), PaycycleError> {
        let file_data: BudgetData = read_json(&self.path)?;

        let mut data = self
            .data
            .write()
            .map_err(|e| PaycycleError::Storage(format!("Failed to acquire write lock: {}", e)))?;

        data.clear();
        for budget in file_data.budgets {
            data.insert(budget.id, budget);
        }

        Ok(())
    }

    /// Save budgets to disk
    pub fn save(&self) -> Result<(), PaycycleError> {
        let data = self
            .data
            .read()
            .map_err(|e| PaycycleError::Storage(format!("Failed to acquire read lock: {}", e)))?;

        let mut budgets: Vec<_> = data.values().cloned().collect();
        budgets.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));

        let file_data = BudgetData { budgets };
        write_json_atomic(&self.path, &file_data)
    }

    /// Get a budget by ID
    pub fn get(&self, id: BudgetId) -> Result<Option<Budget>, PaycycleError> {
        let data = self
            .data
            .read()
            .map_err(|e| PaycycleError::Storage(format!("Failed to acquire read lock: {}", e)))?;

        Ok(data.get(&id).cloned())
    }

    /// Get all budgets, sorted by name
    pub fn get_all(&self) -> Result<Vec<Budget>, PaycycleError> {
        let data = self
            .data
            .read()
            .map_err(|e| PaycycleError::Storage(format!("Failed to acquire read lock: {}", e)))?;

        let mut budgets: Vec<_> = data.values().cloned().collect();
        budgets.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(budgets)
    }

    /// Get all active budgets, sorted by name
    pub fn get_active(&self) -> Result<Vec<Budget>, PaycycleError> {
        Ok(self.get_all()?.into_iter().filter(|b| b.active).collect())
    }

    /// Insert or update a budget
    pub fn upsert(&self, budget: Budget) -> Result<(), PaycycleError> {
        let mut data = self
            .data
            .write()
            .map_err(|e| PaycycleError::Storage(format!("Failed to acquire write lock: {}", e)))?;

        data.insert(budget.id, budget);
        Ok(())
    }

    /// Delete a budget
    ///
    /// Reference checks live in the budget service; the repository removes
    /// unconditionally.
    pub fn delete(&self, id: BudgetId) -> Result<bool, PaycycleError> {
        let mut data = self
            .data
            .write()
            .map_err(|e| PaycycleError::Storage(format!("Failed to acquire write lock: {}", e)))?;

        Ok(data.remove(&id).is_some())
    }

    /// Count budgets
    pub fn count(&self) -> Result<usize, PaycycleError> {
        let data = self
            .data
            .read()
            .map_err(|e| PaycycleError::Storage(format!("Failed to acquire read lock: {}", e)))?;

        Ok(data.len())
    }
}
