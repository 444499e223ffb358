//! Budget model
//!
//! Budgets are the allocation targets of the ledger. A budget is either
//! standing (carries a balance across pay periods), periodic (resets each
//! period), or one-off (a temporary bucket for a single purpose).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::ids::BudgetId;

/// The kind of budget
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum BudgetKind {
    /// Long-running budget whose balance carries across pay periods
    Standing,
    /// Resets each pay period or budget cycle
    #[default]
    Periodic,
    /// Temporary single-purpose budget
    OneOff,
}

impl fmt::Display for BudgetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Standing => write!(f, "Standing"),
            Self::Periodic => write!(f, "Periodic"),
            Self::OneOff => write!(f, "One-off"),
        }
    }
}

/// A budget category that transactions allocate against
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Budget {
    /// Unique identifier
    pub id: BudgetId,

    /// Budget name
    pub name: String,

    /// Standing, periodic, or one-off
    pub kind: BudgetKind,

    /// Free-form description
    #[serde(default)]
    pub description: String,

    /// Whether this is an income budget rather than an expense budget
    #[serde(default)]
    pub is_income: bool,

    /// Excluded from running-balance math when set
    #[serde(default)]
    pub skip_balance: bool,

    /// Display-only flag: omit from spending graphs
    #[serde(default)]
    pub omit_from_graphs: bool,

    /// Whether active or historical
    #[serde(default = "default_active")]
    pub active: bool,

    /// When the budget was created
    pub created_at: DateTime<Utc>,

    /// When the budget was last modified
    pub updated_at: DateTime<Utc>,
}

fn default_active() -> bool {
    true
}

impl Budget {
    /// Create a new budget
    pub fn new(name: impl Into<String>, kind: BudgetKind) -> Self {
        let now = Utc::now();
        Self {
            id: BudgetId::new(),
            name: name.into(),
            kind,
            description: String::new(),
            is_income: false,
            skip_balance: false,
            omit_from_graphs: false,
            active: true,
            created_at: now,
            updated_at: now,
        }
    }

    /// Create a standing budget
    pub fn standing(name: impl Into<String>) -> Self {
        Self::new(name, BudgetKind::Standing)
    }

    /// Create a periodic budget
    pub fn periodic(name: impl Into<String>) -> Self {
        Self::new(name, BudgetKind::Periodic)
    }

    /// Create a one-off budget
    pub fn one_off(name: impl Into<String>) -> Self {
        Self::new(name, BudgetKind::OneOff)
    }

    /// Deactivate the budget; it stays available for historical lookups
    pub fn deactivate(&mut self) {
        self.active = false;
        self.updated_at = Utc::now();
    }

    /// Reactivate the budget
    pub fn activate(&mut self) {
        self.active = true;
        self.updated_at = Utc::now();
    }

    /// Validate the budget
    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("Budget name cannot be empty".to_string());
        }
        if self.name.len() > 50 {
            return Err(format!("Budget name too long: {} chars", self.name.len()));
        }
        Ok(())
    }
}

impl fmt::Display for Budget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.kind)
    }
}
