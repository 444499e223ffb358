//! External (bank-feed) transaction model
//!
//! External transactions are supplied by the excluded import layer as
//! already-fetched records. They are keyed by an opaque
//! (account, external id) pair that is stable across re-imports, which is
//! what makes ingestion idempotent.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::ids::AccountId;
use super::money::Money;

/// Composite key identifying an external transaction
///
/// `external_id` is unique per account and stable across re-imports; the
/// engine treats it as opaque.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ExternalKey {
    pub account_id: AccountId,
    pub external_id: String,
}

impl ExternalKey {
    /// Create a new key
    pub fn new(account_id: AccountId, external_id: impl Into<String>) -> Self {
        Self {
            account_id,
            external_id: external_id.into(),
        }
    }
}

impl fmt::Display for ExternalKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.account_id, self.external_id)
    }
}

/// A transaction sourced from a bank feed
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExternalTransaction {
    /// Stable identity within the source account
    pub key: ExternalKey,

    /// Date the transaction posted
    pub date: NaiveDate,

    /// Posted amount
    pub amount: Money,

    /// Description from the feed
    pub description: String,

    /// Memo from the feed, if any
    #[serde(default)]
    pub memo: String,

    /// When this record was first ingested
    pub imported_at: DateTime<Utc>,
}

impl ExternalTransaction {
    /// Create a new external transaction
    pub fn new(
        account_id: AccountId,
        external_id: impl Into<String>,
        date: NaiveDate,
        amount: Money,
        description: impl Into<String>,
    ) -> Self {
        Self {
            key: ExternalKey::new(account_id, external_id),
            date,
            amount,
            description: description.into(),
            memo: String::new(),
            imported_at: Utc::now(),
        }
    }

    /// Validate the record
    pub fn validate(&self) -> Result<(), String> {
        if self.key.external_id.trim().is_empty() {
            return Err("External transaction id cannot be empty".to_string());
        }
        Ok(())
    }
}

impl fmt::Display for ExternalTransaction {
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_external_transaction() {
        let account = AccountId::new();
        let ext = ExternalTransaction::new(
            account,
            "FITID-001",
            NaiveDate::from_ymd_opt(2025, 1, 15).unwrap(),
            Money::from_cents(-5000),
            "CARD PURCHASE",
        );
        assert_eq!(ext.key.account_id, account);
        assert_eq!(ext.key.external_id, "FITID-001");
        assert!(ext.validate().is_ok());
    }

    #[test]
    fn test_empty_external_id_invalid() {
        let ext = ExternalTransaction::new(
            AccountId::new(),
            "",
            NaiveDate::from_ymd_opt(2025, 1, 15).unwrap(),
            Money::zero(),
            "x",
        );
        assert!(ext.validate().is_err());
    }

    #[test]
    fn test_key_ordering_is_stable() {
        let account = AccountId::new();
        let a = ExternalKey::new(account, "A");
        let b = ExternalKey::new(account, "B");
        assert!(a < b);
    }

    #[test]
    fn test_serialization_roundtrip() {
        let ext = ExternalTransaction::new(
            AccountId::new(),
            "FITID-002",
            NaiveDate::from_ymd_opt(2025, 2, 1).unwrap(),
            Money::from_cents(12345),
            "DEPOSIT",
        );
        let json = serde_json::to_string(&ext).unwrap();
        let deserialized: ExternalTransaction = serde_json::from_str(&json).unwrap();
        assert_eq!(ext.key, deserialized.key);
        assert_eq!(ext.amount, deserialized.amount);
    }
}
