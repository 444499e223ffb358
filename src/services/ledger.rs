//! Transaction/allocation ledger service
//!
//! The only mutation surface for ledger transactions. Every operation
//! validates completely before touching the store, so a failure leaves no
//! partial state behind; the single repository upsert is the commit point.

use chrono::{Duration, NaiveDate};
use tracing::info;

use crate::error::{PaycycleError, PaycycleResult};
use crate::models::{
    AccountId, Allocation, BudgetId, Money, ScheduleId, Transaction, TransactionId,
};
use crate::storage::Storage;

/// How far ahead apply_scheduled searches for the next occurrence
const APPLY_HORIZON_DAYS: i64 = 400;

/// Input for creating a new transaction
#[derive(Debug, Clone)]
pub struct CreateTransactionInput {
    pub account_id: AccountId,
    pub date: NaiveDate,
    pub description: String,
    pub amount: Money,
    pub allocations: Vec<Allocation>,
    pub planned_budget_id: Option<BudgetId>,
    pub scheduled_id: Option<ScheduleId>,
    pub notes: Option<String>,
}

/// Service for ledger mutations and lookups
pub struct LedgerService<'a> {
    storage: &'a Storage,
}

impl<'a> LedgerService<'a> {
    /// Create a new ledger service
    pub fn new(storage: &'a Storage) -> Self {
        Self { storage }
    }

    /// Create a new transaction with its allocation split
    ///
    /// Fails with `UnbalancedAllocation` when the allocations don't sum
    /// exactly to the amount, and `InvalidBudget` when any allocation
    /// references a missing or inactive budget. Nothing is persisted unless
    /// every check passes.
    pub fn create_transaction(&self, input: CreateTransactionInput) -> PaycycleResult<Transaction> {
        let account = self
            .storage
            .accounts
            .get(input.account_id)?
            .ok_or_else(|| PaycycleError::account_not_found(input.account_id.to_string()))?;

        if !account.active {
            return Err(PaycycleError::Validation(
                "Cannot add transactions to an inactive account".into(),
            ));
        }

        for allocation in &input.allocations {
            self.check_budget_usable(allocation.budget_id)?;
        }
        if let Some(planned) = input.planned_budget_id {
            // The plan reference only needs to exist; it may point at a
            // budget that has since been deactivated.
            self.storage
                .budgets
                .get(planned)?
                .ok_or_else(|| PaycycleError::budget_not_found(planned.to_string()))?;
        }

        let mut txn = Transaction::new(
            input.account_id,
            input.date,
            input.description,
            input.amount,
            input.allocations,
        );
        txn.planned_budget_id = input.planned_budget_id;
        txn.scheduled_id = input.scheduled_id;
        if let Some(notes) = input.notes {
            txn.notes = notes;
        }

        txn.validate()?;

        self.storage.transactions.upsert(txn.clone())?;
        self.storage.transactions.save()?;

        info!(
            transaction = %txn.id,
            date = %txn.date,
            amount = %txn.amount,
            splits = txn.allocations.len(),
            "created transaction"
        );
        Ok(txn)
    }

    /// Replace a transaction's allocations wholesale
    ///
    /// The new split must balance against the existing amount; old
    /// allocations are fully removed in the same commit, never partially
    /// patched.
    pub fn reallocate(
        &self,
        transaction_id: TransactionId,
        new_allocations: Vec<Allocation>,
    ) -> PaycycleResult<Transaction> {
        let mut txn = self.get(transaction_id)?;

        for allocation in &new_allocations {
            self.check_budget_usable(allocation.budget_id)?;
        }

        txn.set_allocations(new_allocations);
        txn.validate()?;

        self.storage.transactions.upsert(txn.clone())?;
        self.storage.transactions.save()?;

        info!(
            transaction = %txn.id,
            splits = txn.allocations.len(),
            "reallocated transaction"
        );
        Ok(txn)
    }

    /// Materialize the next occurrence of a schedule as a real transaction
    ///
    /// Picks the first projected occurrence on or after `as_of_date` that
    /// has not already been materialized, records the rule's budget as
    /// `planned_budget_id`, and funds it with a single allocation unless
    /// `allocations` overrides the split.
    pub fn apply_scheduled(
        &self,
        schedule_id: ScheduleId,
        as_of_date: NaiveDate,
        allocations: Option<Vec<Allocation>>,
    ) -> PaycycleResult<Transaction> {
        let schedule = self
            .storage
            .schedules
            .get(schedule_id)?
            .ok_or_else(|| PaycycleError::schedule_not_found(schedule_id.to_string()))?;

        if !schedule.active {
            return Err(PaycycleError::Validation(format!(
                "Schedule '{}' is inactive",
                schedule.description
            )));
        }

        let already_materialized: Vec<NaiveDate> = self
            .storage
            .transactions
            .get_by_schedule(schedule_id)?
            .iter()
            .map(|t| t.date)
            .collect();

        let horizon = as_of_date
            .checked_add_signed(Duration::days(APPLY_HORIZON_DAYS))
            .unwrap_or(as_of_date);
        let occurrence = schedule
            .project(as_of_date, horizon)
            .find(|o| !already_materialized.contains(&o.date))
            .ok_or_else(|| {
                PaycycleError::Validation(format!(
                    "Schedule '{}' has no unmaterialized occurrence after {}",
                    schedule.description, as_of_date
                ))
            })?;

        let allocations = allocations
            .unwrap_or_else(|| vec![Allocation::new(occurrence.budget_id, occurrence.amount)]);

        self.create_transaction(CreateTransactionInput {
            account_id: occurrence.account_id,
            date: occurrence.date,
            description: occurrence.description,
            amount: occurrence.amount,
            allocations,
            planned_budget_id: Some(schedule.budget_id),
            scheduled_id: Some(schedule_id),
            notes: None,
        })
    }

    /// Delete a transaction
    ///
    /// Cascades to its allocations (owned by the record) and to any
    /// reconciliation link pointing at it.
    pub fn delete_transaction(&self, id: TransactionId) -> PaycycleResult<()> {
        if self.storage.transactions.get(id)?.is_none() {
            return Err(PaycycleError::transaction_not_found(id.to_string()));
        }

        let unlinked = self.storage.links.remove_by_transaction(id)?;
        self.storage.transactions.delete(id)?;
        self.storage.transactions.save()?;
        if unlinked {
            self.storage.links.save()?;
        }

        info!(transaction = %id, unlinked, "deleted transaction");
        Ok(())
    }

    /// Get a transaction by ID
    pub fn get(&self, id: TransactionId) -> PaycycleResult<Transaction> {
        self.storage
            .transactions
            .get(id)?
            .ok_or_else(|| PaycycleError::transaction_not_found(id.to_string()))
    }

    /// List transactions in a closed date range, ordered by (date, id)
    pub fn list_range(&self, start: NaiveDate, end: NaiveDate) -> PaycycleResult<Vec<Transaction>> {
        self.storage.transactions.get_by_date_range(start, end)
    }

    /// A budget must exist and be active to receive new allocations
    fn check_budget_usable(&self, budget_id: BudgetId) -> PaycycleResult<()> {
        let budget = self.storage.budgets.get(budget_id)?.ok_or_else(|| {
            PaycycleError::InvalidBudget {
                identifier: budget_id.to_string(),
                reason: "budget does not exist".into(),
            }
        })?;
        if !budget.active {
            return Err(PaycycleError::InvalidBudget {
                identifier: budget.name,
                reason: "budget is inactive".into(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::paths::PaycyclePaths;
    use crate::models::{
        Account, AccountId, Budget, ExternalKey, Money, Recurrence, ReconciliationLink,
        ScheduledTransaction,
    };
    use tempfile::TempDir;

    fn create_test_storage() -> (TempDir, Storage) {
        let temp_dir = TempDir::new().unwrap();
        let paths = PaycyclePaths::with_base_dir(temp_dir.path().to_path_buf());
        let mut storage = Storage::new(paths).unwrap();
        storage.load_all().unwrap();
        (temp_dir, storage)
    }

    fn setup_account(storage: &Storage) -> AccountId {
        let account = Account::new("Checking");
        let id = account.id;
        storage.accounts.upsert(account).unwrap();
        storage.accounts.save().unwrap();
        id
    }

    fn setup_budget(storage: &Storage, name: &str) -> BudgetId {
        let budget = Budget::periodic(name);
        let id = budget.id;
        storage.budgets.upsert(budget).unwrap();
        storage.budgets.save().unwrap();
        id
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn input(
        account_id: AccountId,
        amount: Money,
        allocations: Vec<Allocation>,
    ) -> CreateTransactionInput {
        CreateTransactionInput {
            account_id,
            date: date(2025, 1, 15),
            description: "Grocery run".into(),
            amount,
            allocations,
            planned_budget_id: None,
            scheduled_id: None,
            notes: None,
        }
    }

    #[test]
    fn test_create_split_and_reallocate_end_to_end() {
        let (_temp_dir, storage) = create_test_storage();
        let account_id = setup_account(&storage);
        let food = setup_budget(&storage, "Food");
        let household = setup_budget(&storage, "Household");
        let service = LedgerService::new(&storage);

        // $100.00 split $60.00 / $40.00
        let txn = service
            .create_transaction(input(
                account_id,
                Money::from_dollars(100),
                vec![
                    Allocation::new(food, Money::from_dollars(60)),
                    Allocation::new(household, Money::from_dollars(40)),
                ],
            ))
            .unwrap();
        assert_eq!(txn.allocations_total(), Money::from_dollars(100));

        // Reallocate to $70.00 / $30.00: both allocations replaced
        let txn = service
            .reallocate(
                txn.id,
                vec![
                    Allocation::new(food, Money::from_dollars(70)),
                    Allocation::new(household, Money::from_dollars(30)),
                ],
            )
            .unwrap();
        assert_eq!(txn.allocations.len(), 2);
        assert_eq!(txn.allocated_to(food), Money::from_dollars(70));
        assert_eq!(txn.allocated_to(household), Money::from_dollars(30));
        assert_eq!(txn.allocations_total(), Money::from_dollars(100));

        // The stored copy agrees
        let stored = service.get(txn.id).unwrap();
        assert_eq!(stored.allocated_to(food), Money::from_dollars(70));
    }

    #[test]
    fn test_unbalanced_create_rejected_and_nothing_persisted() {
        let (_temp_dir, storage) = create_test_storage();
        let account_id = setup_account(&storage);
        let food = setup_budget(&storage, "Food");
        let service = LedgerService::new(&storage);

        let result = service.create_transaction(input(
            account_id,
            Money::from_dollars(100),
            vec![Allocation::new(food, Money::from_dollars(60))],
        ));
        assert!(matches!(
            result,
            Err(PaycycleError::UnbalancedAllocation { .. })
        ));
        assert_eq!(storage.transactions.count().unwrap(), 0);
    }

    #[test]
    fn test_unbalanced_reallocate_leaves_old_split_intact() {
        let (_temp_dir, storage) = create_test_storage();
        let account_id = setup_account(&storage);
        let food = setup_budget(&storage, "Food");
        let household = setup_budget(&storage, "Household");
        let service = LedgerService::new(&storage);

        let txn = service
            .create_transaction(input(
                account_id,
                Money::from_dollars(100),
                vec![
                    Allocation::new(food, Money::from_dollars(60)),
                    Allocation::new(household, Money::from_dollars(40)),
                ],
            ))
            .unwrap();

        let result = service.reallocate(txn.id, vec![Allocation::new(food, Money::from_dollars(70))]);
        assert!(matches!(
            result,
            Err(PaycycleError::UnbalancedAllocation { .. })
        ));

        let stored = service.get(txn.id).unwrap();
        assert_eq!(stored.allocated_to(food), Money::from_dollars(60));
        assert_eq!(stored.allocated_to(household), Money::from_dollars(40));
    }

    #[test]
    fn test_unknown_budget_rejected() {
        let (_temp_dir, storage) = create_test_storage();
        let account_id = setup_account(&storage);
        let service = LedgerService::new(&storage);

        let result = service.create_transaction(input(
            account_id,
            Money::from_dollars(10),
            vec![Allocation::new(BudgetId::new(), Money::from_dollars(10))],
        ));
        assert!(matches!(result, Err(PaycycleError::InvalidBudget { .. })));
    }

    #[test]
    fn test_inactive_budget_rejected() {
        let (_temp_dir, storage) = create_test_storage();
        let account_id = setup_account(&storage);
        let service = LedgerService::new(&storage);

        let mut budget = Budget::one_off("Closed");
        budget.deactivate();
        let budget_id = budget.id;
        storage.budgets.upsert(budget).unwrap();

        let result = service.create_transaction(input(
            account_id,
            Money::from_dollars(10),
            vec![Allocation::new(budget_id, Money::from_dollars(10))],
        ));
        assert!(matches!(result, Err(PaycycleError::InvalidBudget { .. })));
    }

    #[test]
    fn test_unknown_account_rejected() {
        let (_temp_dir, storage) = create_test_storage();
        let food = setup_budget(&storage, "Food");
        let service = LedgerService::new(&storage);

        let result = service.create_transaction(input(
            AccountId::new(),
            Money::from_dollars(10),
            vec![Allocation::new(food, Money::from_dollars(10))],
        ));
        assert!(result.unwrap_err().is_not_found());
    }

    #[test]
    fn test_apply_scheduled_materializes_next_occurrence() {
        let (_temp_dir, storage) = create_test_storage();
        let account_id = setup_account(&storage);
        let rent = setup_budget(&storage, "Rent");
        let service = LedgerService::new(&storage);

        let schedule = ScheduledTransaction::new(
            "Rent",
            Money::from_dollars(-1200),
            account_id,
            rent,
            Recurrence::DayOfMonth { day: 1 },
        );
        let schedule_id = schedule.id;
        storage.schedules.upsert(schedule).unwrap();

        let txn = service
            .apply_scheduled(schedule_id, date(2025, 3, 15), None)
            .unwrap();
        assert_eq!(txn.date, date(2025, 4, 1));
        assert_eq!(txn.amount, Money::from_dollars(-1200));
        assert_eq!(txn.planned_budget_id, Some(rent));
        assert_eq!(txn.scheduled_id, Some(schedule_id));
        assert_eq!(txn.allocations, vec![Allocation::new(rent, Money::from_dollars(-1200))]);

        // Applying again from the same date skips the materialized
        // occurrence and takes the next one
        let next = service
            .apply_scheduled(schedule_id, date(2025, 3, 15), None)
            .unwrap();
        assert_eq!(next.date, date(2025, 5, 1));
    }

    #[test]
    fn test_apply_scheduled_with_split_override() {
        let (_temp_dir, storage) = create_test_storage();
        let account_id = setup_account(&storage);
        let rent = setup_budget(&storage, "Rent");
        let utilities = setup_budget(&storage, "Utilities");
        let service = LedgerService::new(&storage);

        let schedule = ScheduledTransaction::new(
            "Rent + utilities",
            Money::from_dollars(-1300),
            account_id,
            rent,
            Recurrence::DayOfMonth { day: 1 },
        );
        let schedule_id = schedule.id;
        storage.schedules.upsert(schedule).unwrap();

        let txn = service
            .apply_scheduled(
                schedule_id,
                date(2025, 1, 1),
                Some(vec![
                    Allocation::new(rent, Money::from_dollars(-1200)),
                    Allocation::new(utilities, Money::from_dollars(-100)),
                ]),
            )
            .unwrap();
        // Planned budget records the rule's target even though the actual
        // funding was split differently
        assert_eq!(txn.planned_budget_id, Some(rent));
        assert!(txn.diverged_from_plan());
        assert_eq!(txn.allocations_total(), Money::from_dollars(-1300));
    }

    #[test]
    fn test_apply_scheduled_inactive_rejected() {
        let (_temp_dir, storage) = create_test_storage();
        let account_id = setup_account(&storage);
        let rent = setup_budget(&storage, "Rent");
        let service = LedgerService::new(&storage);

        let mut schedule = ScheduledTransaction::new(
            "Rent",
            Money::from_dollars(-1200),
            account_id,
            rent,
            Recurrence::DayOfMonth { day: 1 },
        );
        schedule.deactivate();
        let schedule_id = schedule.id;
        storage.schedules.upsert(schedule).unwrap();

        assert!(matches!(
            service.apply_scheduled(schedule_id, date(2025, 1, 1), None),
            Err(PaycycleError::Validation(_))
        ));
    }

    #[test]
    fn test_delete_cascades_link_and_frees_budget() {
        let (_temp_dir, storage) = create_test_storage();
        let account_id = setup_account(&storage);
        let food = setup_budget(&storage, "Food");
        let service = LedgerService::new(&storage);

        let txn = service
            .create_transaction(input(
                account_id,
                Money::from_cents(-5000),
                vec![Allocation::new(food, Money::from_cents(-5000))],
            ))
            .unwrap();

        let external = ExternalKey::new(account_id, "FITID-1");
        storage
            .links
            .insert(ReconciliationLink::new(external.clone(), txn.id))
            .unwrap();

        service.delete_transaction(txn.id).unwrap();

        assert!(service.get(txn.id).unwrap_err().is_not_found());
        assert!(storage.links.get_by_external(&external).unwrap().is_none());
        assert!(!storage.transactions.references_budget(food).unwrap());
    }

    #[test]
    fn test_delete_unknown_transaction_not_found() {
        let (_temp_dir, storage) = create_test_storage();
        let service = LedgerService::new(&storage);
        assert!(service
            .delete_transaction(TransactionId::new())
            .unwrap_err()
            .is_not_found());
    }
}
