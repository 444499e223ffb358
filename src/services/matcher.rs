//! Reconciliation matcher service
//!
//! Pairs external (bank-feed) transactions with ledger transactions.
//! Proposal generation is a pure function of its inputs: an exact amount
//! match is a hard filter, date proximity within the configured window
//! ranks candidates, and ties break by date then transaction id, so the
//! same inputs always produce the same ordered proposals.
//!
//! Committed links are 1:1. Linking either side to a different partner
//! fails with `AlreadyLinked`; the caller must unlink first. Re-linking an
//! existing pair is a no-op.

use chrono::NaiveDate;
use tracing::info;

use crate::error::{PaycycleError, PaycycleResult};
use crate::models::{
    ExternalKey, ExternalTransaction, ReconciliationLink, Transaction, TransactionId,
};
use crate::storage::Storage;

/// Matcher tuning, passed in explicitly rather than read from global state
#[derive(Debug, Clone, Copy)]
pub struct MatchConfig {
    /// How many days before/after the external posting date a ledger
    /// transaction may fall and still be proposed
    pub window_days: i64,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self { window_days: 3 }
    }
}

/// One ranked candidate for an external transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchCandidate {
    pub transaction_id: TransactionId,
    pub date: NaiveDate,
    /// Higher is better; `window_days - |date delta|`
    pub score: i64,
}

/// Ordered candidates for one external transaction
#[derive(Debug, Clone)]
pub struct MatchProposal {
    pub external: ExternalKey,
    pub candidates: Vec<MatchCandidate>,
}

/// Service for reconciliation matching
pub struct ReconciliationMatcher<'a> {
    storage: &'a Storage,
    config: MatchConfig,
}

impl<'a> ReconciliationMatcher<'a> {
    /// Create a new matcher with explicit configuration
    pub fn new(storage: &'a Storage, config: MatchConfig) -> Self {
        Self { storage, config }
    }

    /// Rank ledger candidates for each external transaction
    ///
    /// Pure with respect to its arguments and deterministic: candidates are
    /// sorted by (score desc, date asc, transaction id asc) and proposals
    /// follow the order of `externals`. Nothing is committed.
    pub fn propose_matches(
        &self,
        candidates: &[Transaction],
        externals: &[ExternalTransaction],
    ) -> Vec<MatchProposal> {
        externals
            .iter()
            .map(|external| {
                let mut ranked: Vec<MatchCandidate> = candidates
                    .iter()
                    .filter(|txn| txn.amount == external.amount)
                    .filter_map(|txn| {
                        let delta = (txn.date - external.date).num_days().abs();
                        if delta <= self.config.window_days {
                            Some(MatchCandidate {
                                transaction_id: txn.id,
                                date: txn.date,
                                score: self.config.window_days - delta,
                            })
                        } else {
                            None
                        }
                    })
                    .collect();
                ranked.sort_by(|a, b| {
                    b.score
                        .cmp(&a.score)
                        .then(a.date.cmp(&b.date))
                        .then(a.transaction_id.cmp(&b.transaction_id))
                });
                MatchProposal {
                    external: external.key.clone(),
                    candidates: ranked,
                }
            })
            .collect()
    }

    /// Rank candidates for everything currently unmatched in the store
    pub fn propose_unmatched(&self) -> PaycycleResult<Vec<MatchProposal>> {
        let externals = self.unmatched_externals()?;
        let candidates = self.unlinked_transactions(None)?;
        Ok(self.propose_matches(&candidates, &externals))
    }

    /// Commit a 1:1 link between an external and a ledger transaction
    ///
    /// Fails with `AlreadyLinked` when either side already has a different
    /// partner; linking an already-linked pair to itself is a no-op.
    pub fn link(
        &self,
        external: &ExternalKey,
        transaction_id: TransactionId,
    ) -> PaycycleResult<ReconciliationLink> {
        self.storage
            .externals
            .get(external)?
            .ok_or_else(|| PaycycleError::external_not_found(external.to_string()))?;
        self.storage
            .transactions
            .get(transaction_id)?
            .ok_or_else(|| PaycycleError::transaction_not_found(transaction_id.to_string()))?;

        if let Some(existing) = self.storage.links.get_by_external(external)? {
            if existing.transaction_id == transaction_id {
                // Re-linking the same pair is idempotent
                return Ok(existing);
            }
            return Err(PaycycleError::AlreadyLinked(format!(
                "external transaction {} is linked to {}",
                external, existing.transaction_id
            )));
        }
        if let Some(existing) = self.storage.links.get_by_transaction(transaction_id)? {
            return Err(PaycycleError::AlreadyLinked(format!(
                "transaction {} is linked to {}",
                transaction_id, existing.external
            )));
        }

        let link = ReconciliationLink::new(external.clone(), transaction_id);
        self.storage.links.insert(link.clone())?;
        self.storage.links.save()?;

        info!(external = %external, transaction = %transaction_id, "linked");
        Ok(link)
    }

    /// Remove the link for an external transaction
    ///
    /// Both sides return to unmatched; the underlying transaction is never
    /// deleted.
    pub fn unlink(&self, external: &ExternalKey) -> PaycycleResult<()> {
        if !self.storage.links.remove_by_external(external)? {
            return Err(PaycycleError::NotFound {
                entity_type: "ReconciliationLink",
                identifier: external.to_string(),
            });
        }
        self.storage.links.save()?;

        info!(external = %external, "unlinked");
        Ok(())
    }

    /// External transactions with no committed link, in key order
    pub fn unmatched_externals(&self) -> PaycycleResult<Vec<ExternalTransaction>> {
        let mut unmatched = Vec::new();
        for external in self.storage.externals.get_all()? {
            if self.storage.links.get_by_external(&external.key)?.is_none() {
                unmatched.push(external);
            }
        }
        Ok(unmatched)
    }

    /// Ledger transactions eligible for matching but not yet linked
    ///
    /// Filters out transactions on non-reconcilable accounts, and anything
    /// dated before `begin_date` when one is given.
    pub fn unlinked_transactions(
        &self,
        begin_date: Option<NaiveDate>,
    ) -> PaycycleResult<Vec<Transaction>> {
        let mut unlinked = Vec::new();
        for txn in self.storage.transactions.get_all()? {
            if let Some(begin) = begin_date {
                if txn.date < begin {
                    continue;
                }
            }
            let reconcilable = self
                .storage
                .accounts
                .get(txn.account_id)?
                .map(|a| a.reconcilable)
                .unwrap_or(false);
            if !reconcilable {
                continue;
            }
            if self.storage.links.get_by_transaction(txn.id)?.is_none() {
                unlinked.push(txn);
            }
        }
        Ok(unlinked)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::paths::PaycyclePaths;
    use crate::models::{Account, AccountId, Allocation, Budget, BudgetId, Money};
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

    fn setup_budget(storage: &Storage) -> BudgetId {
        let budget = Budget::periodic("Spending");
        let id = budget.id;
        storage.budgets.upsert(budget).unwrap();
        id
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn ledger_txn(
        storage: &Storage,
        account_id: AccountId,
        budget_id: BudgetId,
        on: NaiveDate,
        amount: Money,
    ) -> Transaction {
        let txn = Transaction::new(
            account_id,
            on,
            "purchase",
            amount,
            vec![Allocation::new(budget_id, amount)],
        );
        storage.transactions.upsert(txn.clone()).unwrap();
        txn
    }

    fn external_txn(
        storage: &Storage,
        account_id: AccountId,
        fitid: &str,
        on: NaiveDate,
        amount: Money,
    ) -> ExternalTransaction {
        let ext = ExternalTransaction::new(account_id, fitid, on, amount, "CARD PURCHASE");
        storage.externals.upsert(ext.clone()).unwrap();
        ext
    }

    #[test]
    fn test_exact_amount_is_a_hard_filter() {
        let (_temp_dir, storage) = create_test_storage();
        let account_id = setup_account(&storage);
        let budget_id = setup_budget(&storage);
        let matcher = ReconciliationMatcher::new(&storage, MatchConfig::default());

        let on = date(2025, 1, 15);
        ledger_txn(&storage, account_id, budget_id, on, Money::from_cents(-5000));
        ledger_txn(&storage, account_id, budget_id, on, Money::from_cents(-5001));
        let ext = external_txn(&storage, account_id, "F1", on, Money::from_cents(-5000));

        let proposals = matcher.propose_unmatched().unwrap();
        let proposal = proposals.iter().find(|p| p.external == ext.key).unwrap();
        assert_eq!(proposal.candidates.len(), 1);
        assert_eq!(proposal.candidates[0].score, 3);
    }

    #[test]
    fn test_window_excludes_distant_dates_and_ranks_closer_higher() {
        let (_temp_dir, storage) = create_test_storage();
        let account_id = setup_account(&storage);
        let budget_id = setup_budget(&storage);
        let matcher = ReconciliationMatcher::new(&storage, MatchConfig { window_days: 3 });

        let amount = Money::from_cents(-2500);
        let near = ledger_txn(&storage, account_id, budget_id, date(2025, 1, 16), amount);
        let far = ledger_txn(&storage, account_id, budget_id, date(2025, 1, 18), amount);
        ledger_txn(&storage, account_id, budget_id, date(2025, 1, 25), amount);
        external_txn(&storage, account_id, "F1", date(2025, 1, 15), amount);

        let proposals = matcher.propose_unmatched().unwrap();
        let candidates = &proposals[0].candidates;
        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].transaction_id, near.id);
        assert_eq!(candidates[0].score, 2);
        assert_eq!(candidates[1].transaction_id, far.id);
        assert_eq!(candidates[1].score, 0);
    }

    #[test]
    fn test_propose_matches_is_deterministic() {
        let (_temp_dir, storage) = create_test_storage();
        let account_id = setup_account(&storage);
        let budget_id = setup_budget(&storage);
        let matcher = ReconciliationMatcher::new(&storage, MatchConfig::default());

        let amount = Money::from_cents(-1200);
        // Several equally-scored candidates on the same date
        for _ in 0..5 {
            ledger_txn(&storage, account_id, budget_id, date(2025, 1, 15), amount);
        }
        external_txn(&storage, account_id, "F1", date(2025, 1, 15), amount);
        external_txn(&storage, account_id, "F2", date(2025, 1, 15), amount);

        let first = matcher.propose_unmatched().unwrap();
        for _ in 0..10 {
            let again = matcher.propose_unmatched().unwrap();
            assert_eq!(again.len(), first.len());
            for (a, b) in first.iter().zip(again.iter()) {
                assert_eq!(a.external, b.external);
                assert_eq!(a.candidates, b.candidates);
            }
        }

        // Equal scores and dates break ties by transaction id
        let ids: Vec<_> = first[0]
            .candidates
            .iter()
            .map(|c| c.transaction_id)
            .collect();
        let mut sorted = ids.clone();
        sorted.sort();
        assert_eq!(ids, sorted);
    }

    #[test]
    fn test_link_unlink_link_is_idempotent_up_to_state() {
        let (_temp_dir, storage) = create_test_storage();
        let account_id = setup_account(&storage);
        let budget_id = setup_budget(&storage);
        let matcher = ReconciliationMatcher::new(&storage, MatchConfig::default());

        let amount = Money::from_cents(-5000);
        let txn = ledger_txn(&storage, account_id, budget_id, date(2025, 1, 15), amount);
        let ext = external_txn(&storage, account_id, "F1", date(2025, 1, 15), amount);

        matcher.link(&ext.key, txn.id).unwrap();
        matcher.unlink(&ext.key).unwrap();
        let link = matcher.link(&ext.key, txn.id).unwrap();
        assert_eq!(link.transaction_id, txn.id);

        // Re-linking the same pair is a no-op
        let again = matcher.link(&ext.key, txn.id).unwrap();
        assert_eq!(again.transaction_id, txn.id);
        assert_eq!(storage.links.count().unwrap(), 1);
    }

    #[test]
    fn test_link_conflict_on_either_side() {
        let (_temp_dir, storage) = create_test_storage();
        let account_id = setup_account(&storage);
        let budget_id = setup_budget(&storage);
        let matcher = ReconciliationMatcher::new(&storage, MatchConfig::default());

        let amount = Money::from_cents(-5000);
        let txn_a = ledger_txn(&storage, account_id, budget_id, date(2025, 1, 15), amount);
        let txn_b = ledger_txn(&storage, account_id, budget_id, date(2025, 1, 15), amount);
        let ext_a = external_txn(&storage, account_id, "A", date(2025, 1, 15), amount);
        let ext_b = external_txn(&storage, account_id, "B", date(2025, 1, 15), amount);

        matcher.link(&ext_a.key, txn_a.id).unwrap();

        // External side already linked to a different transaction
        assert!(matches!(
            matcher.link(&ext_a.key, txn_b.id),
            Err(PaycycleError::AlreadyLinked(_))
        ));
        // Ledger side already linked to a different external
        assert!(matches!(
            matcher.link(&ext_b.key, txn_a.id),
            Err(PaycycleError::AlreadyLinked(_))
        ));

        // Explicit unlink clears the way
        matcher.unlink(&ext_a.key).unwrap();
        matcher.link(&ext_a.key, txn_b.id).unwrap();
    }

    #[test]
    fn test_unlink_never_deletes_the_transaction() {
        let (_temp_dir, storage) = create_test_storage();
        let account_id = setup_account(&storage);
        let budget_id = setup_budget(&storage);
        let matcher = ReconciliationMatcher::new(&storage, MatchConfig::default());

        let amount = Money::from_cents(-5000);
        let txn = ledger_txn(&storage, account_id, budget_id, date(2025, 1, 15), amount);
        let ext = external_txn(&storage, account_id, "F1", date(2025, 1, 15), amount);

        matcher.link(&ext.key, txn.id).unwrap();
        matcher.unlink(&ext.key).unwrap();

        assert!(storage.transactions.get(txn.id).unwrap().is_some());
        assert!(storage.externals.get(&ext.key).unwrap().is_some());
    }

    #[test]
    fn test_unlink_unknown_fails_not_found() {
        let (_temp_dir, storage) = create_test_storage();
        let matcher = ReconciliationMatcher::new(&storage, MatchConfig::default());
        let key = ExternalKey::new(AccountId::new(), "nope");
        assert!(matcher.unlink(&key).unwrap_err().is_not_found());
    }

    #[test]
    fn test_linked_pairs_leave_the_unmatched_pools() {
        let (_temp_dir, storage) = create_test_storage();
        let account_id = setup_account(&storage);
        let budget_id = setup_budget(&storage);
        let matcher = ReconciliationMatcher::new(&storage, MatchConfig::default());

        let amount = Money::from_cents(-5000);
        let txn = ledger_txn(&storage, account_id, budget_id, date(2025, 1, 15), amount);
        let ext = external_txn(&storage, account_id, "F1", date(2025, 1, 15), amount);

        assert_eq!(matcher.unmatched_externals().unwrap().len(), 1);
        assert_eq!(matcher.unlinked_transactions(None).unwrap().len(), 1);

        matcher.link(&ext.key, txn.id).unwrap();

        assert!(matcher.unmatched_externals().unwrap().is_empty());
        assert!(matcher.unlinked_transactions(None).unwrap().is_empty());
        assert!(matcher.propose_unmatched().unwrap().is_empty());
    }

    #[test]
    fn test_non_reconcilable_accounts_and_begin_date_filtered() {
        let (_temp_dir, storage) = create_test_storage();
        let budget_id = setup_budget(&storage);
        let matcher = ReconciliationMatcher::new(&storage, MatchConfig::default());

        let mut cash = Account::new("Cash");
        cash.set_reconcilable(false);
        let cash_id = cash.id;
        storage.accounts.upsert(cash).unwrap();
        let checking_id = setup_account(&storage);

        let amount = Money::from_cents(-100);
        ledger_txn(&storage, cash_id, budget_id, date(2025, 1, 15), amount);
        let old = ledger_txn(&storage, checking_id, budget_id, date(2024, 6, 1), amount);
        let recent = ledger_txn(&storage, checking_id, budget_id, date(2025, 1, 15), amount);

        let eligible = matcher.unlinked_transactions(Some(date(2025, 1, 1))).unwrap();
        assert_eq!(eligible.len(), 1);
        assert_eq!(eligible[0].id, recent.id);

        let no_cutoff = matcher.unlinked_transactions(None).unwrap();
        assert!(no_cutoff.iter().any(|t| t.id == old.id));
        assert_eq!(no_cutoff.len(), 2);
    }
}
