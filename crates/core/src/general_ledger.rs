//! The wired ledger engine.
//!
//! `GeneralLedger` owns one instance of every store, shares a single
//! `WriteGate` between every cross-store writer, and is what a hosting
//! application injects into its handlers. Store mutators are crate-private,
//! so every write from outside goes through a gated method here.

use std::sync::Arc;

use chrono::NaiveDate;
use ledgerline_shared::LedgerConfig;
use ledgerline_shared::types::{AccountId, TransactionId};
use tracing::info;

use crate::accounts::{
    Account, AccountError, AccountFilter, AccountPatch, AccountStore, Descendants, NewAccount,
};
use crate::fiscal::{FiscalError, FiscalPeriod, NewPeriod, PeriodKey, PeriodManager};
use crate::ledger::{
    EntryCursor, EntryStore, GlEntry, LedgerError, PostingReceipt, PostingRequest,
    PostingService, ReversalRequest, WriteGate,
};
use crate::reports::{
    AccountSummaryLine, AggregationEngine, DateRange, IntegrityReport, ReportError,
    RunningBalanceView, TrialBalanceReport,
};

/// The General Ledger engine.
#[derive(Debug, Clone)]
pub struct GeneralLedger {
    config: LedgerConfig,
    accounts: Arc<AccountStore>,
    entries: Arc<EntryStore>,
    periods: Arc<PeriodManager>,
    gate: WriteGate,
    posting: PostingService,
    aggregation: AggregationEngine,
}

impl Default for GeneralLedger {
    fn default() -> Self {
        Self::new(LedgerConfig::default())
    }
}

impl GeneralLedger {
    /// Creates an empty ledger with the given policy.
    #[must_use]
    pub fn new(config: LedgerConfig) -> Self {
        let accounts = Arc::new(AccountStore::new());
        let entries = Arc::new(EntryStore::new());
        let periods = Arc::new(PeriodManager::new());
        let gate = WriteGate::new();

        let posting = PostingService::new(
            Arc::clone(&accounts),
            Arc::clone(&entries),
            Arc::clone(&periods),
            gate.clone(),
        )
        .with_reversal_module_source(config.reversal_module_source.clone());
        let aggregation = AggregationEngine::new(Arc::clone(&accounts), Arc::clone(&entries));

        Self {
            config,
            accounts,
            entries,
            periods,
            gate,
            posting,
            aggregation,
        }
    }

    /// The policy this ledger was built with.
    #[must_use]
    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    /// Read access to the Account Hierarchy Store.
    #[must_use]
    pub fn accounts(&self) -> &AccountStore {
        &self.accounts
    }

    /// Read access to the Ledger Entry Store.
    ///
    /// Entries can only be written through [`Self::post`] and
    /// [`Self::reverse`]:
    ///
    /// ```compile_fail
    /// use ledgerline_core::GeneralLedger;
    /// use ledgerline_shared::types::TransactionId;
    ///
    /// let gl = GeneralLedger::default();
    /// let _ = gl.entries().append(TransactionId::new(), Vec::new());
    /// ```
    #[must_use]
    pub fn entries(&self) -> &EntryStore {
        &self.entries
    }

    /// Read access to the Period Manager.
    ///
    /// Periods are opened and closed through this facade, under the gate:
    ///
    /// ```compile_fail
    /// use ledgerline_core::GeneralLedger;
    /// use ledgerline_core::fiscal::PeriodKey;
    ///
    /// let gl = GeneralLedger::default();
    /// let _ = gl.periods().close(PeriodKey::new(2024, 1));
    /// ```
    #[must_use]
    pub fn periods(&self) -> &PeriodManager {
        &self.periods
    }

    /// The Aggregation Engine.
    #[must_use]
    pub fn aggregation(&self) -> &AggregationEngine {
        &self.aggregation
    }

    // ========== Chart of Accounts ==========

    /// Creates an account.
    ///
    /// # Errors
    ///
    /// See [`AccountStore::create_account`].
    pub fn create_account(&self, input: NewAccount) -> Result<Account, AccountError> {
        let _gate = self.gate.enter();
        self.accounts.create_account(input)
    }

    /// Updates an account under optimistic concurrency.
    ///
    /// # Errors
    ///
    /// See [`AccountStore::update_account`].
    pub fn update_account(
        &self,
        id: AccountId,
        patch: AccountPatch,
        expected_version: i64,
    ) -> Result<Account, AccountError> {
        let _gate = self.gate.enter();
        self.accounts
            .update_account(id, patch, expected_version, &*self.entries)
    }

    /// Deactivates an account.
    ///
    /// # Errors
    ///
    /// See [`AccountStore::deactivate`].
    pub fn deactivate_account(&self, id: AccountId) -> Result<Account, AccountError> {
        let _gate = self.gate.enter();
        self.accounts.deactivate(id, &*self.entries)
    }

    /// Reactivates an account.
    ///
    /// # Errors
    ///
    /// See [`AccountStore::reactivate`].
    pub fn reactivate_account(&self, id: AccountId) -> Result<Account, AccountError> {
        let _gate = self.gate.enter();
        self.accounts.reactivate(id)
    }

    /// Deletes an unreferenced leaf account.
    ///
    /// # Errors
    ///
    /// See [`AccountStore::delete_account`].
    pub fn delete_account(&self, id: AccountId) -> Result<Account, AccountError> {
        let _gate = self.gate.enter();
        self.accounts.delete_account(id, &*self.entries)
    }

    /// Resolves an account by id.
    ///
    /// # Errors
    ///
    /// Returns `AccountNotFound` if no such account exists.
    pub fn account(&self, id: AccountId) -> Result<Account, AccountError> {
        self.accounts.resolve(id)
    }

    /// Resolves an account by code.
    ///
    /// # Errors
    ///
    /// Returns `CodeNotFound` if no account carries the code.
    pub fn account_by_code(&self, code: &str) -> Result<Account, AccountError> {
        self.accounts.resolve_code(code)
    }

    /// Depth-first walk below an account.
    ///
    /// # Errors
    ///
    /// Returns `AccountNotFound` if no such account exists.
    pub fn descendants(&self, id: AccountId) -> Result<Descendants, AccountError> {
        self.accounts.list_descendants(id)
    }

    /// Accounts matching `filter`, ordered by code.
    #[must_use]
    pub fn list_accounts(&self, filter: &AccountFilter) -> Vec<Account> {
        self.accounts.list(filter)
    }

    // ========== Fiscal Periods ==========

    /// Opens one fiscal period.
    ///
    /// # Errors
    ///
    /// See [`PeriodManager::open_period`].
    pub fn open_period(&self, input: NewPeriod) -> Result<FiscalPeriod, FiscalError> {
        let _gate = self.gate.enter();
        self.periods.open_period(input)
    }

    /// Opens the twelve monthly periods of `year`, starting at the
    /// configured month.
    ///
    /// # Errors
    ///
    /// See [`PeriodManager::open_fiscal_year`].
    pub fn open_fiscal_year(&self, year: i32) -> Result<Vec<FiscalPeriod>, FiscalError> {
        let _gate = self.gate.enter();
        self.periods
            .open_fiscal_year(year, self.config.fiscal_year_start_month)
    }

    /// Closes a fiscal period.
    ///
    /// Holds the write gate, so no posting can land between the balance
    /// check and the transition. With `require_balanced_close` set, a period
    /// whose entries do not net to zero stays open.
    ///
    /// # Errors
    ///
    /// - `PeriodNotFound` / `AlreadyClosed`
    /// - `UnbalancedPeriod` if the period's trial balance is off
    /// - `TotalsOverflow` if the period's totals cannot be computed
    pub fn close_period(&self, key: PeriodKey) -> Result<FiscalPeriod, FiscalError> {
        let _gate = self.gate.enter();
        if !self.config.require_balanced_close {
            return self.periods.close(key);
        }

        let closed = self.periods.close_with(key, |period| {
            let totals = self
                .aggregation
                .period_totals(period.key)
                .map_err(|_| FiscalError::TotalsOverflow(period.key))?;
            if totals.is_balanced {
                Ok(())
            } else {
                Err(FiscalError::UnbalancedPeriod {
                    key: period.key,
                    difference: totals.difference,
                })
            }
        })?;
        info!(period = %key, "Fiscal period closed after balance check");
        Ok(closed)
    }

    /// Looks up a period.
    ///
    /// # Errors
    ///
    /// Returns `PeriodNotFound` if the key is unknown.
    pub fn period(&self, key: PeriodKey) -> Result<FiscalPeriod, FiscalError> {
        self.periods.get(key)
    }

    // ========== Posting ==========

    /// Validates and commits a transaction.
    ///
    /// # Errors
    ///
    /// See [`PostingService::post`].
    pub fn post(&self, request: PostingRequest) -> Result<PostingReceipt, LedgerError> {
        self.posting.post(request)
    }

    /// Posts the offsetting transaction for `transaction_id`.
    ///
    /// # Errors
    ///
    /// See [`PostingService::reverse`].
    pub fn reverse(
        &self,
        transaction_id: TransactionId,
        request: &ReversalRequest,
    ) -> Result<PostingReceipt, LedgerError> {
        self.posting.reverse(transaction_id, request)
    }

    /// Entries of one account within `range`, in date then sequence order.
    #[must_use]
    pub fn query_by_account(&self, account_id: AccountId, range: &DateRange) -> EntryCursor {
        self.entries.query_by_account(account_id, range)
    }

    /// Entries of one transaction.
    #[must_use]
    pub fn query_by_transaction(&self, transaction_id: TransactionId) -> Vec<Arc<GlEntry>> {
        self.entries.query_by_transaction(transaction_id)
    }

    // ========== Reports ==========

    /// Trial balance over a date range.
    ///
    /// # Errors
    ///
    /// See [`AggregationEngine::trial_balance`].
    pub fn trial_balance(&self, range: &DateRange) -> Result<TrialBalanceReport, ReportError> {
        self.aggregation.trial_balance(range)
    }

    /// Trial balance of one fiscal period.
    ///
    /// # Errors
    ///
    /// See [`AggregationEngine::trial_balance_for_period`].
    pub fn trial_balance_for_period(
        &self,
        key: PeriodKey,
    ) -> Result<TrialBalanceReport, ReportError> {
        self.aggregation.trial_balance_for_period(key)
    }

    /// Per-account summary over a date range.
    ///
    /// # Errors
    ///
    /// See [`AggregationEngine::account_summary`].
    pub fn account_summary(
        &self,
        range: &DateRange,
    ) -> Result<Vec<AccountSummaryLine>, ReportError> {
        self.aggregation.account_summary(range)
    }

    /// Running balance of one account.
    ///
    /// # Errors
    ///
    /// See [`AggregationEngine::running_balance`].
    pub fn running_balance(
        &self,
        account_id: AccountId,
        as_of: NaiveDate,
    ) -> Result<RunningBalanceView, ReportError> {
        self.aggregation.running_balance(account_id, as_of)
    }

    /// Re-folds the whole log and checks it.
    ///
    /// # Errors
    ///
    /// Returns `IntegrityViolation` if the log is inconsistent.
    pub fn assert_integrity(&self) -> Result<IntegrityReport, ReportError> {
        self.aggregation.assert_integrity()
    }
}
