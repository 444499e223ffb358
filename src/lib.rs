//! paycycle - transaction allocation and reconciliation engine
//!
//! This library is the core of a personal-finance budgeting system built
//! around recurring biweekly pay periods. It owns the hard parts: splitting
//! real-world transactions across budgets with exact-sum invariants,
//! projecting recurrence rules into concrete dated occurrences, matching
//! bank-feed transactions against the ledger under 1:1 constraints, and
//! computing running and projected balances. The web UI, authentication,
//! and bank download layers live elsewhere and consume this crate.
//!
//! # Architecture
//!
//! - `config`: path resolution and user settings
//! - `error`: the `PaycycleError` type and result alias
//! - `models`: money, budgets, schedules, transactions, external
//!   transactions, reconciliation links
//! - `storage`: JSON file repositories with atomic writes
//! - `services`: the mutation surface and read models (ledger, budget
//!   registry, matcher, balances, bank feed import)
//!
//! # Example
//!
//! ```rust,no_run
//! use paycycle::config::paths::PaycyclePaths;
//! use paycycle::storage::Storage;
//!
//! # fn main() -> Result<(), paycycle::PaycycleError> {
//! let paths = PaycyclePaths::new()?;
//! let mut storage = Storage::new(paths)?;
//! storage.load_all()?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod models;
pub mod services;
pub mod storage;

pub use error::{PaycycleError, PaycycleResult};
