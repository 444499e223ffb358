//! Custom error types for paycycle
//!
//! This module defines the error hierarchy for the engine using thiserror
//! for ergonomic error definitions.

use thiserror::Error;

use crate::models::Money;

/// The main error type for paycycle operations
#[derive(Error, Debug)]
pub enum PaycycleError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// File I/O errors
    #[error("I/O error: {0}")]
    Io(String),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(String),

    /// Validation errors for data models
    #[error("Validation error: {0}")]
    Validation(String),

    /// Entity not found errors
    #[error("{entity_type} not found: {identifier}")]
    NotFound {
        entity_type: &'static str,
        identifier: String,
    },

    /// A transaction's allocations do not sum exactly to its amount
    #[error(
        "Allocations sum to {allocations_total} but transaction amount is {transaction_amount}"
    )]
    UnbalancedAllocation {
        transaction_amount: Money,
        allocations_total: Money,
    },

    /// An allocation or schedule references a missing or unusable budget
    #[error("Invalid budget {identifier}: {reason}")]
    InvalidBudget {
        identifier: String,
        reason: String,
    },

    /// Reconciliation conflict: one side already has a different link
    #[error("Already linked: {0}")]
    AlreadyLinked(String),

    /// Budget deletion blocked by existing references
    #[error("Budget in use: {identifier}")]
    BudgetInUse { identifier: String },

    /// Bank feed import errors
    #[error("Import error: {0}")]
    Import(String),

    /// Storage errors
    #[error("Storage error: {0}")]
    Storage(String),
}

impl PaycycleError {
    /// Create a "not found" error for accounts
    pub fn account_not_found(identifier: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type: "Account",
            identifier: identifier.into(),
        }
    }

    /// Create a "not found" error for budgets
    pub fn budget_not_found(identifier: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type: "Budget",
            identifier: identifier.into(),
        }
    }

    /// Create a "not found" error for transactions
    pub fn transaction_not_found(identifier: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type: "Transaction",
            identifier: identifier.into(),
        }
    }

    /// Create a "not found" error for scheduled transactions
    pub fn schedule_not_found(identifier: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type: "ScheduledTransaction",
            identifier: identifier.into(),
        }
    }

    /// Create a "not found" error for external (bank-feed) transactions
    pub fn external_not_found(identifier: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type: "ExternalTransaction",
            identifier: identifier.into(),
        }
    }

    /// Check if this is a "not found" error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Check if this is a validation error
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}

// Implement From traits for common error types

impl From<std::io::Error> for PaycycleError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<serde_json::Error> for PaycycleError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json(err.to_string())
    }
}

/// Result type alias for paycycle operations
pub type PaycycleResult<T> = Result<T, PaycycleError>;
