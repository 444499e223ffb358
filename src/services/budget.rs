//! Budget registry service
//!
//! Provides business logic for the budget catalog: creation, lookup,
//! deactivation, and the delete guard that protects the ledger's
//! referential integrity.

use tracing::info;

use crate::error::{PaycycleError, PaycycleResult};
use crate::models::{Budget, BudgetId, BudgetKind};
use crate::storage::Storage;

/// Service for budget registry operations
pub struct BudgetService<'a> {
    storage: &'a Storage,
}

impl<'a> BudgetService<'a> {
    /// Create a new budget service
    pub fn new(storage: &'a Storage) -> Self {
        Self { storage }
    }

    /// Create a new budget
    pub fn create(&self, name: impl Into<String>, kind: BudgetKind) -> PaycycleResult<Budget> {
        let budget = Budget::new(name, kind);
        budget
            .validate()
            .map_err(PaycycleError::Validation)?;

        self.storage.budgets.upsert(budget.clone())?;
        self.storage.budgets.save()?;

        info!(budget = %budget.id, name = %budget.name, kind = %budget.kind, "created budget");
        Ok(budget)
    }

    /// Get a budget by ID
    pub fn get(&self, id: BudgetId) -> PaycycleResult<Budget> {
        self.storage
            .budgets
            .get(id)?
            .ok_or_else(|| PaycycleError::budget_not_found(id.to_string()))
    }

    /// List all active budgets
    pub fn list_active(&self) -> PaycycleResult<Vec<Budget>> {
        self.storage.budgets.get_active()
    }

    /// List every budget, active or not
    pub fn list_all(&self) -> PaycycleResult<Vec<Budget>> {
        self.storage.budgets.get_all()
    }

    /// Whether a budget can be deleted
    ///
    /// False while any allocation or scheduled transaction references it.
    pub fn can_delete(&self, id: BudgetId) -> PaycycleResult<bool> {
        Ok(!self.storage.transactions.references_budget(id)?
            && !self.storage.schedules.references_budget(id)?)
    }

    /// Delete a budget
    ///
    /// Refused with `BudgetInUse` while referenced; references are never
    /// silently cascaded away.
    pub fn delete(&self, id: BudgetId) -> PaycycleResult<()> {
        let budget = self.get(id)?;

        if !self.can_delete(id)? {
            return Err(PaycycleError::BudgetInUse {
                identifier: budget.name,
            });
        }

        self.storage.budgets.delete(id)?;
        self.storage.budgets.save()?;

        info!(budget = %id, name = %budget.name, "deleted budget");
        Ok(())
    }

    /// Deactivate a budget, keeping it for historical lookups
    pub fn deactivate(&self, id: BudgetId) -> PaycycleResult<Budget> {
        let mut budget = self.get(id)?;
        budget.deactivate();

        self.storage.budgets.upsert(budget.clone())?;
        self.storage.budgets.save()?;

        info!(budget = %id, name = %budget.name, "deactivated budget");
        Ok(budget)
    }
}
