//! Storage layer for paycycle
//!
//! Provides JSON file storage with atomic writes and automatic directory
//! creation. Each repository guards its in-memory map with an RwLock, so
//! reads observe consistent snapshots while the single writer commits one
//! operation at a time.

pub mod accounts;
pub mod budgets;
pub mod external;
pub mod file_io;
pub mod links;
pub mod schedules;
pub mod transactions;

pub use accounts::AccountRepository;
pub use budgets::BudgetRepository;
pub use external::{ExternalRepository, UpsertOutcome};
pub use file_io::{read_json, write_json_atomic};
pub use links::LinkRepository;
pub use schedules::ScheduleRepository;
pub use transactions::TransactionRepository;

use crate::config::paths::PaycyclePaths;
use crate::error::PaycycleError;

/// Main storage coordinator that provides access to all repositories
pub struct Storage {
    paths: PaycyclePaths,
    pub accounts: AccountRepository,
    pub budgets: BudgetRepository,
    pub schedules: ScheduleRepository,
    pub transactions: TransactionRepository,
    pub externals: ExternalRepository,
    pub links: LinkRepository,
}

impl Storage {
    /// Create a new Storage instance
    pub fn new(paths: PaycyclePaths) -> Result<Self, PaycycleError> {
        // Ensure directories exist
        paths.ensure_directories()?;

        Ok(Self {
            accounts: AccountRepository::new(paths.accounts_file()),
            budgets: BudgetRepository::new(paths.budgets_file()),
            schedules: ScheduleRepository::new(paths.schedules_file()),
            transactions: TransactionRepository::new(paths.transactions_file()),
            externals: ExternalRepository::new(paths.external_file()),
            links: LinkRepository::new(paths.links_file()),
            paths,
        })
    }

    /// Get the paths configuration
    pub fn paths(&self) -> &PaycyclePaths {
        &self.paths
    }

    /// Load all data from disk
    pub fn load_all(&mut self) -> Result<(), PaycycleError> {
        self.accounts.load()?;
        self.budgets.load()?;
        self.schedules.load()?;
        self.transactions.load()?;
        self.externals.load()?;
        self.links.load()?;
        Ok(())
    }

    /// Save all data to disk
    pub fn save_all(&self) -> Result<(), PaycycleError> {
        self.accounts.save()?;
        self.budgets.save()?;
        self.schedules.save()?;
        self.transactions.save()?;
        self.externals.save()?;
        self.links.save()?;
        Ok(())
    }
}
