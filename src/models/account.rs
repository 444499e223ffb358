//! Account model
//!
//! Accounts are the axis along which external (bank-feed) transactions are
//! keyed. The engine does not manage account credentials or statements; it
//! only needs identity, an active flag, and whether the account participates
//! in reconciliation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::ids::AccountId;

/// A bank or card account known to the ledger
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    /// Unique identifier
    pub id: AccountId,

    /// Account name
    pub name: String,

    /// Whether transactions on this account participate in reconciliation
    #[serde(default = "default_true")]
    pub reconcilable: bool,

    /// Whether the account is active
    #[serde(default = "default_true")]
    pub active: bool,

    /// When the account was created
    pub created_at: DateTime<Utc>,

    /// When the account was last modified
    pub updated_at: DateTime<Utc>,
}

fn default_true() -> bool {
    true
}

impl Account {
    /// Create a new account
    pub fn new(name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: AccountId::new(),
            name: name.into(),
            reconcilable: true,
            active: true,
            created_at: now,
            updated_at: now,
        }
    }

    /// Exclude this account's transactions from reconciliation
    pub fn set_reconcilable(&mut self, reconcilable: bool) {
        self.reconcilable = reconcilable;
        self.updated_at = Utc::now();
    }

    /// Deactivate the account
    pub fn deactivate(&mut self) {
        self.active = false;
        self.updated_at = Utc::now();
    }

    /// Validate the account
    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("Account name cannot be empty".to_string());
        }
        Ok(())
    }
}

impl fmt::Display for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_account() {
        let account = Account::new("Checking");
        assert_eq!(account.name, "Checking");
        assert!(account.active);
        assert!(account.reconcilable);
        assert!(account.validate().is_ok());
    }

    #[test]
    fn test_deactivate() {
        let mut account = Account::new("Old Card");
        account.deactivate();
        assert!(!account.active);
    }

    #[test]
    fn test_validate_empty_name() {
        let mut account = Account::new("  ");
        assert!(account.validate().is_err());
        account.name = "Savings".to_string();
        assert!(account.validate().is_ok());
    }

    #[test]
    fn test_serialization() {
        let account = Account::new("Checking");
        let json = serde_json::to_string(&account).unwrap();
        let deserialized: Account = serde_json::from_str(&json).unwrap();
        assert_eq!(account.id, deserialized.id);
        assert_eq!(account.name, deserialized.name);
    }
}
