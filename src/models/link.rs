//! Reconciliation link model
//!
//! A link pairs one external transaction with one ledger transaction. The
//! 1:1 property is enforced by the link repository's two-sided index and the
//! matcher service; the model itself is just the pairing record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::external::ExternalKey;
use super::ids::TransactionId;

/// A committed match between an external and a ledger transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconciliationLink {
    /// The external side of the pair
    pub external: ExternalKey,

    /// The ledger side of the pair
    pub transaction_id: TransactionId,

    /// Optional note recorded when the link was made
    #[serde(default)]
    pub note: String,

    /// When the link was committed
    pub linked_at: DateTime<Utc>,
}

impl ReconciliationLink {
    /// Create a new link
    pub fn new(external: ExternalKey, transaction_id: TransactionId) -> Self {
        Self {
            external,
            transaction_id,
            note: String::new(),
            linked_at: Utc::now(),
        }
    }

    /// Create a new link with a note
    pub fn with_note(
        external: ExternalKey,
        transaction_id: TransactionId,
        note: impl Into<String>,
    ) -> Self {
        Self {
            note: note.into(),
            ..Self::new(external, transaction_id)
        }
    }
}

impl fmt::Display for ReconciliationLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} <-> {}", self.external, self.transaction_id)
    }
}
