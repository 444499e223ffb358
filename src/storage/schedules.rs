//! Scheduled transaction repository for JSON storage
//!
//! Manages loading and saving recurrence rules to schedules.json

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::RwLock;

use crate::error::PaycycleError;
use crate::models::{BudgetId, ScheduleId, ScheduledTransaction};

use super::file_io::{read_json, write_json_atomic};

/// Serializable schedule data structure
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
struct ScheduleData {
    schedules: Vec<ScheduledTransaction>,
}

/// Repository for scheduled transaction persistence
pub struct ScheduleRepository {
    path: PathBuf,
    data: RwLock<HashMap<ScheduleId, ScheduledTransaction>>,
}

impl ScheduleRepository {
    /// Create a new schedule repository
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            data: RwLock::new(HashMap::new()),
        }
    }

    /// Load schedules from disk
    pub fn load(&self) -> Result<(), PaycycleError> {
        let file_data: ScheduleData = read_json(&self.path)?;

        let mut data = self
            .data
            .write()
            .map_err(|e| PaycycleError::Storage(format!("Failed to acquire write lock: {}", e)))?;

        data.clear();
        for schedule in file_data.schedules {
            data.insert(schedule.id, schedule);
        }

        Ok(())
    }

    /// Save schedules to disk
    pub fn save(&self) -> Result<(), PaycycleError> {
        let data = self
            .data
            .read()
            .map_err(|e| PaycycleError::Storage(format!("Failed to acquire read lock: {}", e)))?;

        let mut schedules: Vec<_> = data.values().cloned().collect();
        schedules.sort_by(|a, b| a.description.cmp(&b.description).then(a.id.cmp(&b.id)));

        let file_data = ScheduleData { schedules };
        write_json_atomic(&self.path, &file_data)
    }

    /// Get a schedule by ID
    pub fn get(&self, id: ScheduleId) -> Result<Option<ScheduledTransaction>, PaycycleError> {
        let data = self
            .data
            .read()
            .map_err(|e| PaycycleError::Storage(format!("Failed to acquire read lock: {}", e)))?;

        Ok(data.get(&id).cloned())
    }

    /// Get all schedules, sorted by description
    pub fn get_all(&self) -> Result<Vec<ScheduledTransaction>, PaycycleError> {
        let data = self
            .data
            .read()
            .map_err(|e| PaycycleError::Storage(format!("Failed to acquire read lock: {}", e)))?;

        let mut schedules: Vec<_> = data.values().cloned().collect();
        schedules.sort_by(|a, b| a.description.cmp(&b.description).then(a.id.cmp(&b.id)));
        Ok(schedules)
    }

    /// Get all active schedules, sorted by description
    pub fn get_active(&self) -> Result<Vec<ScheduledTransaction>, PaycycleError> {
        Ok(self.get_all()?.into_iter().filter(|s| s.active).collect())
    }

    /// Whether any schedule targets the given budget
    pub fn references_budget(&self, budget_id: BudgetId) -> Result<bool, PaycycleError> {
        let data = self
            .data
            .read()
            .map_err(|e| PaycycleError::Storage(format!("Failed to acquire read lock: {}", e)))?;

        Ok(data.values().any(|s| s.budget_id == budget_id))
    }

    /// Insert or update a schedule
    pub fn upsert(&self, schedule: ScheduledTransaction) -> Result<(), PaycycleError> {
        let mut data = self
            .data
            .write()
            .map_err(|e| PaycycleError::Storage(format!("Failed to acquire write lock: {}", e)))?;

        data.insert(schedule.id, schedule);
        Ok(())
    }

    /// Delete a schedule
    pub fn delete(&self, id: ScheduleId) -> Result<bool, PaycycleError> {
        let mut data = self
            .data
            .write()
            .map_err(|e| PaycycleError::Storage(format!("Failed to acquire write lock: {}", e)))?;

        Ok(data.remove(&id).is_some())
    }

    /// Count schedules
    pub fn count(&self) -> Result<usize, PaycycleError> {
        let data = self
            .data
            .read()
            .map_err(|e| PaycycleError::Storage(format!("Failed to acquire read lock: {}", e)))?;

        Ok(data.len())
    }
}
