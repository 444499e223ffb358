//! Transaction and allocation models
//!
//! A transaction owns an ordered list of allocations that split its amount
//! across budgets. The allocations must sum exactly to the transaction
//! amount; that invariant is checked by `validate` and enforced by the
//! ledger service before anything is persisted.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{PaycycleError, PaycycleResult};

use super::ids::{AccountId, BudgetId, ScheduleId, TransactionId};
use super::money::Money;

/// The portion of a transaction's amount assigned to one budget
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Allocation {
    /// The budget this portion is allocated against
    pub budget_id: BudgetId,

    /// The amount for this portion (same sign as the parent transaction)
    pub amount: Money,
}

impl Allocation {
    /// Create a new allocation
    pub fn new(budget_id: BudgetId, amount: Money) -> Self {
        Self { budget_id, amount }
    }
}

/// A ledger transaction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    /// Unique identifier
    pub id: TransactionId,

    /// The account this transaction posted against
    pub account_id: AccountId,

    /// Transaction date
    pub date: NaiveDate,

    /// Description
    pub description: String,

    /// Free-form notes
    #[serde(default)]
    pub notes: String,

    /// Total amount (positive for inflow, negative for outflow)
    pub amount: Money,

    /// Ordered split of the amount across budgets; owned by this
    /// transaction and deleted with it
    pub allocations: Vec<Allocation>,

    /// The budget that would have funded this transaction per the schedule
    /// it came from; may differ from the budgets that actually funded it
    pub planned_budget_id: Option<BudgetId>,

    /// The schedule this transaction was materialized from, if any
    pub scheduled_id: Option<ScheduleId>,

    /// When the transaction was created
    pub created_at: DateTime<Utc>,

    /// When the transaction was last modified
    pub updated_at: DateTime<Utc>,
}

impl Transaction {
    /// Create a new transaction with its allocation split
    pub fn new(
        account_id: AccountId,
        date: NaiveDate,
        description: impl Into<String>,
        amount: Money,
        allocations: Vec<Allocation>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: TransactionId::new(),
            account_id,
            date,
            description: description.into(),
            notes: String::new(),
            amount,
            allocations,
            planned_budget_id: None,
            scheduled_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Check if this transaction is split across more than one budget
    pub fn is_split(&self) -> bool {
        self.allocations.len() > 1
    }

    /// Check if this is an inflow (positive amount)
    pub fn is_inflow(&self) -> bool {
        self.amount.is_positive()
    }

    /// Check if this is an outflow (negative amount)
    pub fn is_outflow(&self) -> bool {
        self.amount.is_negative()
    }

    /// Total of all allocations
    pub fn allocations_total(&self) -> Money {
        self.allocations.iter().map(|a| a.amount).sum()
    }

    /// Sum of the allocations targeting one budget
    pub fn allocated_to(&self, budget_id: BudgetId) -> Money {
        self.allocations
            .iter()
            .filter(|a| a.budget_id == budget_id)
            .map(|a| a.amount)
            .sum()
    }

    /// Whether any allocation references the given budget
    pub fn references_budget(&self, budget_id: BudgetId) -> bool {
        self.allocations.iter().any(|a| a.budget_id == budget_id)
    }

    /// Replace the allocation list wholesale
    ///
    /// The caller revalidates before persisting; old allocations are gone,
    /// never partially patched.
    pub fn set_allocations(&mut self, allocations: Vec<Allocation>) {
        self.allocations = allocations;
        self.updated_at = Utc::now();
    }

    /// Whether the actual funding diverged from the planned budget
    pub fn diverged_from_plan(&self) -> bool {
        match self.planned_budget_id {
            Some(planned) => self.allocations.iter().any(|a| a.budget_id != planned),
            None => false,
        }
    }

    /// Validate the transaction
    ///
    /// Fails with `UnbalancedAllocation` when the allocations do not sum
    /// exactly to the transaction amount. An empty allocation list is only
    /// balanced for a zero amount.
    pub fn validate(&self) -> PaycycleResult<()> {
        let total = self.allocations_total();
        if total != self.amount {
            return Err(PaycycleError::UnbalancedAllocation {
                transaction_amount: self.amount,
                allocations_total: total,
            });
        }
        if self.description.trim().is_empty() {
            return Err(PaycycleError::Validation(
                "Transaction description cannot be empty".into(),
            ));
        }
        Ok(())
    }
}

impl fmt::Display for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {}",
            self.date.format("%Y-%m-%d"),
            self.description,
            self.amount
        )
    }
}
