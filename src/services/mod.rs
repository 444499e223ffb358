//! Service layer for paycycle
//!
//! The service layer is the engine's only mutation surface. Each service
//! validates completely before committing, so every operation is
//! all-or-nothing against the store.

pub mod balance;
pub mod budget;
pub mod import;
pub mod ledger;
pub mod matcher;

pub use balance::{BalanceEntry, BalanceReport, BalanceService, BudgetTotal};
pub use budget::BudgetService;
pub use import::{ExternalRecord, FeedColumns, ImportService, IngestResult};
pub use ledger::{CreateTransactionInput, LedgerService};
pub use matcher::{MatchCandidate, MatchConfig, MatchProposal, ReconciliationMatcher};
