//! Balance projector service
//!
//! Composes the ledger and the schedule projector into running-balance read
//! models. Actual balances cover only persisted transactions; projected
//! balances additionally fold in occurrences that have not been
//! materialized yet, up to a future cutoff, and the two are kept distinct
//! in the result.

use std::collections::HashMap;

use chrono::NaiveDate;

use crate::error::PaycycleResult;
use crate::models::{Budget, BudgetId, Money, ScheduleId, Transaction, TransactionId};
use crate::storage::Storage;

/// One step of a running balance
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BalanceEntry {
    pub date: NaiveDate,
    /// Set for persisted transactions, None for projected occurrences
    pub transaction_id: Option<TransactionId>,
    /// Set for projected occurrences
    pub schedule_id: Option<ScheduleId>,
    pub description: String,
    /// This entry's contribution (allocations to counted budgets only)
    pub amount: Money,
    /// Cumulative balance through this entry
    pub running: Money,
}

impl BalanceEntry {
    /// Whether this entry is a projected occurrence rather than a
    /// persisted transaction
    pub fn is_projected(&self) -> bool {
        self.transaction_id.is_none()
    }
}

/// A running balance over a date range
#[derive(Debug, Clone)]
pub struct BalanceReport {
    pub entries: Vec<BalanceEntry>,
    /// Balance after the final entry
    pub closing: Money,
    /// Closing balance counting only persisted transactions
    pub closing_actual: Money,
}

/// Total allocated to one budget over a range
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BudgetTotal {
    pub budget_id: BudgetId,
    pub name: String,
    pub total: Money,
}

/// Service for balance projection
pub struct BalanceService<'a> {
    storage: &'a Storage,
}

impl<'a> BalanceService<'a> {
    /// Create a new balance service
    pub fn new(storage: &'a Storage) -> Self {
        Self { storage }
    }

    /// Running balance of persisted transactions over `[start, end]`
    ///
    /// Entries are ordered by (date, transaction id) so repeated runs
    /// produce identical output. Allocations against budgets flagged
    /// `skip_balance` do not contribute.
    pub fn actual(&self, start: NaiveDate, end: NaiveDate) -> PaycycleResult<BalanceReport> {
        let counted = self.counted_budgets()?;
        let mut entries = Vec::new();
        let mut running = Money::zero();

        for txn in self.storage.transactions.get_by_date_range(start, end)? {
            let amount = counted_amount(&txn, &counted);
            running += amount;
            entries.push(BalanceEntry {
                date: txn.date,
                transaction_id: Some(txn.id),
                schedule_id: None,
                description: txn.description,
                amount,
                running,
            });
        }

        Ok(BalanceReport {
            closing: running,
            closing_actual: running,
            entries,
        })
    }

    /// Running balance including projected schedule occurrences
    ///
    /// Persisted transactions cover `[start, cutoff]` as in `actual`;
    /// occurrences of active schedules that have not been materialized are
    /// folded in up to `cutoff`. On equal dates, persisted entries come
    /// before projected ones; projected ties break by schedule id.
    pub fn projected(&self, start: NaiveDate, cutoff: NaiveDate) -> PaycycleResult<BalanceReport> {
        let counted = self.counted_budgets()?;

        #[derive(Clone)]
        enum Step {
            Actual(Transaction),
            Projected {
                date: NaiveDate,
                schedule_id: ScheduleId,
                description: String,
                amount: Money,
                budget_id: BudgetId,
            },
        }

        let mut steps: Vec<Step> = self
            .storage
            .transactions
            .get_by_date_range(start, cutoff)?
            .into_iter()
            .map(Step::Actual)
            .collect();

        for schedule in self.storage.schedules.get_active()? {
            let materialized: Vec<NaiveDate> = self
                .storage
                .transactions
                .get_by_schedule(schedule.id)?
                .iter()
                .map(|t| t.date)
                .collect();
            for occurrence in schedule.project(start, cutoff) {
                if materialized.contains(&occurrence.date) {
                    continue;
                }
                steps.push(Step::Projected {
                    date: occurrence.date,
                    schedule_id: occurrence.schedule_id,
                    description: occurrence.description,
                    amount: occurrence.amount,
                    budget_id: occurrence.budget_id,
                });
            }
        }

        steps.sort_by(|a, b| {
            let key = |s: &Step| match s {
                Step::Actual(t) => (t.date, 0u8, Some(t.id), None),
                Step::Projected {
                    date, schedule_id, ..
                } => (*date, 1u8, None, Some(*schedule_id)),
            };
            key(a).cmp(&key(b))
        });

        let mut entries = Vec::new();
        let mut running = Money::zero();
        let mut closing_actual = Money::zero();

        for step in steps {
            match step {
                Step::Actual(txn) => {
                    let amount = counted_amount(&txn, &counted);
                    running += amount;
                    closing_actual += amount;
                    entries.push(BalanceEntry {
                        date: txn.date,
                        transaction_id: Some(txn.id),
                        schedule_id: None,
                        description: txn.description,
                        amount,
                        running,
                    });
                }
                Step::Projected {
                    date,
                    schedule_id,
                    description,
                    amount,
                    budget_id,
                } => {
                    let amount = if counted.contains_key(&budget_id) {
                        amount
                    } else {
                        Money::zero()
                    };
                    running += amount;
                    entries.push(BalanceEntry {
                        date,
                        transaction_id: None,
                        schedule_id: Some(schedule_id),
                        description,
                        amount,
                        running,
                    });
                }
            }
        }

        Ok(BalanceReport {
            closing: running,
            closing_actual,
            entries,
        })
    }

    /// Per-budget allocation totals over `[start, end]`, sorted by name
    pub fn budget_totals(&self, start: NaiveDate, end: NaiveDate) -> PaycycleResult<Vec<BudgetTotal>> {
        let mut sums: HashMap<BudgetId, Money> = HashMap::new();
        for txn in self.storage.transactions.get_by_date_range(start, end)? {
            for allocation in &txn.allocations {
                *sums.entry(allocation.budget_id).or_insert_with(Money::zero) +=
                    allocation.amount;
            }
        }

        let mut totals = Vec::new();
        for budget in self.storage.budgets.get_all()? {
            if let Some(total) = sums.get(&budget.id) {
                totals.push(BudgetTotal {
                    budget_id: budget.id,
                    name: budget.name,
                    total: *total,
                });
            }
        }
        Ok(totals)
    }

    /// Budgets that participate in running-balance math
    fn counted_budgets(&self) -> PaycycleResult<HashMap<BudgetId, Budget>> {
        Ok(self
            .storage
            .budgets
            .get_all()?
            .into_iter()
            .filter(|b| !b.skip_balance)
            .map(|b| (b.id, b))
            .collect())
    }
}

/// Sum of a transaction's allocations against counted budgets
fn counted_amount(txn: &Transaction, counted: &HashMap<BudgetId, Budget>) -> Money {
    txn.allocations
        .iter()
        .filter(|a| counted.contains_key(&a.budget_id))
        .map(|a| a.amount)
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::paths::PaycyclePaths;
    use crate::models::{
        Account, AccountId, Allocation, Budget, Money, Recurrence, ScheduledTransaction,
    };
    use crate::services::ledger::{CreateTransactionInput, LedgerService};
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
        id
    }

    fn setup_budget(storage: &Storage, name: &str, skip_balance: bool) -> BudgetId {
        let mut budget = Budget::periodic(name);
        budget.skip_balance = skip_balance;
        let id = budget.id;
        storage.budgets.upsert(budget).unwrap();
        id
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn add_txn(
        storage: &Storage,
        account_id: AccountId,
        on: NaiveDate,
        allocations: Vec<Allocation>,
    ) -> Transaction {
        let amount = allocations.iter().map(|a| a.amount).sum();
        LedgerService::new(storage)
            .create_transaction(CreateTransactionInput {
                account_id,
                date: on,
                description: "entry".into(),
                amount,
                allocations,
                planned_budget_id: None,
                scheduled_id: None,
                notes: None,
            })
            .unwrap()
    }

    #[test]
    fn test_actual_running_balance_ordered_and_cumulative() {
        let (_temp_dir, storage) = create_test_storage();
        let account_id = setup_account(&storage);
        let budget_id = setup_budget(&storage, "Spending", false);
        let service = BalanceService::new(&storage);

        add_txn(
            &storage,
            account_id,
            date(2025, 1, 20),
            vec![Allocation::new(budget_id, Money::from_dollars(-30))],
        );
        add_txn(
            &storage,
            account_id,
            date(2025, 1, 10),
            vec![Allocation::new(budget_id, Money::from_dollars(100))],
        );

        let report = service.actual(date(2025, 1, 1), date(2025, 1, 31)).unwrap();
        assert_eq!(report.entries.len(), 2);
        assert_eq!(report.entries[0].date, date(2025, 1, 10));
        assert_eq!(report.entries[0].running, Money::from_dollars(100));
        assert_eq!(report.entries[1].running, Money::from_dollars(70));
        assert_eq!(report.closing, Money::from_dollars(70));
        assert_eq!(report.closing_actual, report.closing);
    }

    #[test]
    fn test_skip_balance_budgets_do_not_contribute() {
        let (_temp_dir, storage) = create_test_storage();
        let account_id = setup_account(&storage);
        let spending = setup_budget(&storage, "Spending", false);
        let tracked_only = setup_budget(&storage, "Tracked", true);
        let service = BalanceService::new(&storage);

        add_txn(
            &storage,
            account_id,
            date(2025, 1, 10),
            vec![
                Allocation::new(spending, Money::from_dollars(-40)),
                Allocation::new(tracked_only, Money::from_dollars(-60)),
            ],
        );

        let report = service.actual(date(2025, 1, 1), date(2025, 1, 31)).unwrap();
        assert_eq!(report.entries.len(), 1);
        // Only the counted allocation contributes
        assert_eq!(report.entries[0].amount, Money::from_dollars(-40));
        assert_eq!(report.closing, Money::from_dollars(-40));
    }

    #[test]
    fn test_projected_folds_in_unmaterialized_occurrences() {
        let (_temp_dir, storage) = create_test_storage();
        let account_id = setup_account(&storage);
        let rent = setup_budget(&storage, "Rent", false);
        let service = BalanceService::new(&storage);

        let schedule = ScheduledTransaction::new(
            "Rent",
            Money::from_dollars(-1200),
            account_id,
            rent,
            Recurrence::DayOfMonth { day: 1 },
        );
        let schedule_id = schedule.id;
        storage.schedules.upsert(schedule).unwrap();

        // Materialize January's occurrence as a real transaction
        LedgerService::new(&storage)
            .apply_scheduled(schedule_id, date(2025, 1, 1), None)
            .unwrap();

        let report = service.projected(date(2025, 1, 1), date(2025, 3, 31)).unwrap();

        // One actual (Jan) + two projected (Feb, Mar); January is not
        // double-counted
        assert_eq!(report.entries.len(), 3);
        assert!(!report.entries[0].is_projected());
        assert!(report.entries[1].is_projected());
        assert_eq!(report.entries[1].schedule_id, Some(schedule_id));
        assert_eq!(report.closing, Money::from_dollars(-3600));
        assert_eq!(report.closing_actual, Money::from_dollars(-1200));
    }

    #[test]
    fn test_projected_orders_actual_before_projected_on_same_date() {
        let (_temp_dir, storage) = create_test_storage();
        let account_id = setup_account(&storage);
        let rent = setup_budget(&storage, "Rent", false);
        let spending = setup_budget(&storage, "Spending", false);
        let service = BalanceService::new(&storage);

        let schedule = ScheduledTransaction::new(
            "Rent",
            Money::from_dollars(-1200),
            account_id,
            rent,
            Recurrence::DayOfMonth { day: 15 },
        );
        storage.schedules.upsert(schedule).unwrap();

        add_txn(
            &storage,
            account_id,
            date(2025, 1, 15),
            vec![Allocation::new(spending, Money::from_dollars(-25))],
        );

        let report = service.projected(date(2025, 1, 1), date(2025, 1, 31)).unwrap();
        assert_eq!(report.entries.len(), 2);
        assert_eq!(report.entries[0].date, report.entries[1].date);
        assert!(!report.entries[0].is_projected());
        assert!(report.entries[1].is_projected());
    }

    #[test]
    fn test_projected_is_deterministic() {
        let (_temp_dir, storage) = create_test_storage();
        let account_id = setup_account(&storage);
        let rent = setup_budget(&storage, "Rent", false);
        let groceries = setup_budget(&storage, "Groceries", false);
        let service = BalanceService::new(&storage);

        for (name, budget_id) in [("Rent", rent), ("Groceries", groceries)] {
            storage
                .schedules
                .upsert(ScheduledTransaction::new(
                    name,
                    Money::from_dollars(-100),
                    account_id,
                    budget_id,
                    Recurrence::DayOfMonth { day: 1 },
                ))
                .unwrap();
        }

        let first = service.projected(date(2025, 1, 1), date(2025, 2, 28)).unwrap();
        let second = service.projected(date(2025, 1, 1), date(2025, 2, 28)).unwrap();
        assert_eq!(first.entries, second.entries);
        assert_eq!(first.closing, Money::from_dollars(-400));
    }

    #[test]
    fn test_budget_totals() {
        let (_temp_dir, storage) = create_test_storage();
        let account_id = setup_account(&storage);
        let food = setup_budget(&storage, "Food", false);
        let household = setup_budget(&storage, "Household", false);
        let service = BalanceService::new(&storage);

        add_txn(
            &storage,
            account_id,
            date(2025, 1, 10),
            vec![
                Allocation::new(food, Money::from_dollars(-60)),
                Allocation::new(household, Money::from_dollars(-40)),
            ],
        );
        add_txn(
            &storage,
            account_id,
            date(2025, 1, 12),
            vec![Allocation::new(food, Money::from_dollars(-15))],
        );

        let totals = service.budget_totals(date(2025, 1, 1), date(2025, 1, 31)).unwrap();
        assert_eq!(totals.len(), 2);
        let food_total = totals.iter().find(|t| t.budget_id == food).unwrap();
        assert_eq!(food_total.total, Money::from_dollars(-75));
        let household_total = totals.iter().find(|t| t.budget_id == household).unwrap();
        assert_eq!(household_total.total, Money::from_dollars(-40));
    }
}
