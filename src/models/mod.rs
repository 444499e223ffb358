//! Core data models for paycycle
//!
//! This module contains all the data structures that represent the
//! budgeting domain: money, accounts, budgets, scheduled transactions,
//! ledger transactions with their allocations, external (bank-feed)
//! transactions, and reconciliation links.

pub mod account;
pub mod budget;
pub mod external;
pub mod ids;
pub mod link;
pub mod money;
pub mod schedule;
pub mod transaction;

pub use account::Account;
pub use budget::{Budget, BudgetKind};
pub use external::{ExternalKey, ExternalTransaction};
pub use ids::{AccountId, BudgetId, ScheduleId, TransactionId};
pub use link::ReconciliationLink;
pub use money::{Money, MoneyParseError};
pub use schedule::{Occurrence, Occurrences, Projection, Recurrence, ScheduledTransaction};
pub use transaction::{Allocation, Transaction};
