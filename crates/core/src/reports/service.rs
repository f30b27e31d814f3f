//! Aggregation engine.
//!
//! Every report is a pure fold over the committed entry log, taken under a
//! single read snapshot. Nothing here caches results; the maintained
//! per-account totals in the entry store are only ever compared against,
//! never trusted.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::NaiveDate;
use ledgerline_shared::types::AccountId;
use rust_decimal::Decimal;
use tracing::{debug, error};

use super::error::ReportError;
use super::types::{
    AccountSummaryLine, DateRange, IntegrityReport, ReportScope, RunningBalanceLine,
    RunningBalanceView, TransactionImbalance, TrialBalanceLine, TrialBalanceReport,
    TrialBalanceTotals, TypeGroup,
};
use crate::accounts::{AccountArena, AccountStore, AccountType};
use crate::fiscal::PeriodKey;
use crate::ledger::balance::{AccountTotals, RunningBalance};
use crate::ledger::entry::GlEntry;
use crate::ledger::store::EntryStore;

/// Computes trial balances, summaries and running balances on demand.
#[derive(Debug, Clone)]
pub struct AggregationEngine {
    accounts: Arc<AccountStore>,
    entries: Arc<EntryStore>,
}

impl AggregationEngine {
    /// Creates an engine reading from the given stores.
    #[must_use]
    pub fn new(accounts: Arc<AccountStore>, entries: Arc<EntryStore>) -> Self {
        Self { accounts, entries }
    }

    /// Trial balance over entries dated inside `range`.
    ///
    /// A non-zero difference is an integrity alarm and is logged as such.
    ///
    /// # Errors
    ///
    /// - `InvalidDateRange` if the range is inverted
    /// - `AccountNotFound` if an entry references an unknown account
    /// - `AmountOverflow` if a total leaves the `Decimal` range
    pub fn trial_balance(&self, range: &DateRange) -> Result<TrialBalanceReport, ReportError> {
        range.validate()?;
        let totals = self.entries.read(|log| {
            fold_totals(log.iter().filter(|e| range.contains(e.transaction_date)))
        })?;
        self.build_trial_balance(ReportScope::Range(*range), &totals)
    }

    /// Trial balance over entries booked in one fiscal period.
    ///
    /// # Errors
    ///
    /// - `AccountNotFound` if an entry references an unknown account
    /// - `AmountOverflow` if a total leaves the `Decimal` range
    pub fn trial_balance_for_period(
        &self,
        key: PeriodKey,
    ) -> Result<TrialBalanceReport, ReportError> {
        let totals = self
            .entries
            .read(|log| fold_totals(log.period_entries(key).iter().map(AsRef::as_ref)))?;
        self.build_trial_balance(ReportScope::Period(key), &totals)
    }

    /// Grand totals of one fiscal period, without per-account lines.
    ///
    /// Needs no chart lookups. Used by period closing.
    ///
    /// # Errors
    ///
    /// Returns `AmountOverflow` if a total leaves the `Decimal` range.
    pub fn period_totals(&self, key: PeriodKey) -> Result<TrialBalanceTotals, ReportError> {
        let totals = self
            .entries
            .read(|log| fold_totals(log.period_entries(key).iter().map(AsRef::as_ref)))?;
        grand_totals(&totals)
    }

    /// Per-account totals for every account in the chart, ordered by code.
    ///
    /// Accounts without activity in `range` report zeros.
    ///
    /// # Errors
    ///
    /// - `InvalidDateRange` if the range is inverted
    /// - `AccountNotFound` if an entry references an unknown account
    /// - `AmountOverflow` if a total leaves the `Decimal` range
    pub fn account_summary(
        &self,
        range: &DateRange,
    ) -> Result<Vec<AccountSummaryLine>, ReportError> {
        range.validate()?;
        let totals = self.entries.read(|log| {
            fold_totals(log.iter().filter(|e| range.contains(e.transaction_date)))
        })?;
        let chart = self.accounts.snapshot();
        ensure_known(&chart, &totals)?;

        let mut lines: Vec<AccountSummaryLine> = chart
            .iter()
            .map(|account| {
                let sums = totals.get(&account.id).copied().unwrap_or_default();
                AccountSummaryLine {
                    account_id: account.id,
                    code: account.code.clone(),
                    name: account.name.clone(),
                    account_type: account.account_type,
                    total_debits: sums.debit_total,
                    total_credits: sums.credit_total,
                    net_amount: sums.net(account.account_type.normal_balance()),
                    entry_count: sums.entry_count,
                }
            })
            .collect();
        lines.sort_by(|a, b| a.code.cmp(&b.code));
        Ok(lines)
    }

    /// Folds one account's entries up to and including `as_of`, in date
    /// then sequence order.
    ///
    /// # Errors
    ///
    /// - `AccountNotFound` if the account does not exist
    /// - `AmountOverflow` if the balance leaves the `Decimal` range
    pub fn running_balance(
        &self,
        account_id: AccountId,
        as_of: NaiveDate,
    ) -> Result<RunningBalanceView, ReportError> {
        let account = self
            .accounts
            .snapshot()
            .get(account_id)
            .cloned()
            .ok_or(ReportError::AccountNotFound(account_id))?;
        let normal = account.account_type.normal_balance();

        let mut lines: Vec<RunningBalanceLine> = Vec::new();
        for entry in self
            .entries
            .query_by_account(account_id, &DateRange::until(as_of))
        {
            let change = normal.calculate_balance_change(entry.debit, entry.credit);
            let running = RunningBalance::after(lines.last().map(|l| &l.running), change)
                .ok_or(ReportError::AmountOverflow)?;
            lines.push(RunningBalanceLine {
                entry_id: entry.id,
                transaction_id: entry.transaction_id,
                sequence: entry.sequence,
                transaction_date: entry.transaction_date,
                debit: entry.debit,
                credit: entry.credit,
                description: entry.description.clone(),
                running,
            });
        }

        let balance = lines
            .last()
            .map_or(Decimal::ZERO, |l| l.running.current_balance);
        debug!(
            account_id = %account_id,
            as_of = %as_of,
            entries = lines.len(),
            balance = %balance,
            "Running balance computed"
        );

        Ok(RunningBalanceView {
            account_id,
            code: account.code,
            as_of,
            normal_balance: normal,
            lines,
            balance,
        })
    }

    /// Re-folds the whole log and compares it against the double-entry
    /// invariant and the store's maintained totals.
    ///
    /// # Errors
    ///
    /// Returns `AmountOverflow` if a re-folded total leaves the `Decimal`
    /// range.
    pub fn verify_integrity(&self) -> Result<IntegrityReport, ReportError> {
        let report = self.entries.read(|log| -> Result<IntegrityReport, ReportError> {
            let mut unbalanced_transactions = Vec::new();
            for (transaction_id, entries) in log.transactions() {
                let sums = fold_entries(entries.iter().map(AsRef::as_ref))?;
                if sums.debit_total != sums.credit_total {
                    unbalanced_transactions.push(TransactionImbalance {
                        transaction_id,
                        debit: sums.debit_total,
                        credit: sums.credit_total,
                    });
                }
            }

            let fresh = fold_totals(log.iter())?;
            let mut drifted_accounts: Vec<AccountId> = log
                .all_totals()
                .iter()
                .filter(|&(id, maintained)| fresh.get(id) != Some(maintained))
                .map(|(id, _)| *id)
                .chain(
                    fresh
                        .keys()
                        .filter(|id| !log.all_totals().contains_key(*id))
                        .copied(),
                )
                .collect();
            drifted_accounts.sort_unstable();

            Ok(IntegrityReport {
                entry_count: log.len(),
                transaction_count: log.transaction_count(),
                totals: grand_totals(&fresh)?,
                unbalanced_transactions,
                drifted_accounts,
            })
        })?;

        if !report.is_consistent() {
            error!(
                target: "ledgerline::integrity",
                difference = %report.totals.difference,
                unbalanced_transactions = report.unbalanced_transactions.len(),
                drifted_accounts = report.drifted_accounts.len(),
                "Ledger integrity check failed"
            );
        }
        Ok(report)
    }

    /// Like [`Self::verify_integrity`], but turns any inconsistency into an
    /// error.
    ///
    /// # Errors
    ///
    /// - `IntegrityViolation` if the log is inconsistent
    /// - `AmountOverflow` if the log cannot be re-folded
    pub fn assert_integrity(&self) -> Result<IntegrityReport, ReportError> {
        let report = self.verify_integrity()?;
        if report.is_consistent() {
            Ok(report)
        } else {
            Err(ReportError::IntegrityViolation {
                difference: report.totals.difference,
                unbalanced_transactions: report.unbalanced_transactions.len(),
                drifted_accounts: report.drifted_accounts.len(),
            })
        }
    }

    fn build_trial_balance(
        &self,
        scope: ReportScope,
        totals: &HashMap<AccountId, AccountTotals>,
    ) -> Result<TrialBalanceReport, ReportError> {
        // Taken after the log read: accounts referenced by entries are never
        // deleted, so a newer chart always covers them.
        let chart = self.accounts.snapshot();
        ensure_known(&chart, totals)?;

        let mut accounts: Vec<TrialBalanceLine> = totals
            .iter()
            .filter_map(|(id, sums)| chart.get(*id).map(|account| (account, sums)))
            .map(|(account, sums)| TrialBalanceLine {
                account_id: account.id,
                code: account.code.clone(),
                name: account.name.clone(),
                account_type: account.account_type,
                is_active: account.is_active,
                total_debits: sums.debit_total,
                total_credits: sums.credit_total,
                balance: sums.net(account.account_type.normal_balance()),
            })
            .collect();
        accounts.sort_by(|a, b| a.code.cmp(&b.code));

        let mut groups = Vec::with_capacity(AccountType::ALL.len());
        for account_type in AccountType::ALL {
            let mut sums = AccountTotals::default();
            for line in accounts.iter().filter(|l| l.account_type == account_type) {
                sums = sums
                    .checked_add(line.total_debits, line.total_credits)
                    .ok_or(ReportError::AmountOverflow)?;
            }
            groups.push(TypeGroup {
                account_type,
                total_debits: sums.debit_total,
                total_credits: sums.credit_total,
                balance: sums.net(account_type.normal_balance()),
            });
        }

        let report = TrialBalanceReport {
            scope,
            groups,
            accounts,
            totals: grand_totals(totals)?,
        };

        if !report.totals.is_balanced {
            error!(
                target: "ledgerline::integrity",
                scope = ?report.scope,
                total_debits = %report.totals.total_debits,
                total_credits = %report.totals.total_credits,
                difference = %report.totals.difference,
                "Trial balance is not balanced"
            );
        }
        Ok(report)
    }
}

/// Folds entries into per-account debit/credit totals.
fn fold_totals<'a>(
    entries: impl Iterator<Item = &'a GlEntry>,
) -> Result<HashMap<AccountId, AccountTotals>, ReportError> {
    let mut totals: HashMap<AccountId, AccountTotals> = HashMap::new();
    for entry in entries {
        let sums = totals.entry(entry.account_id).or_default();
        *sums = sums
            .checked_add(entry.debit, entry.credit)
            .ok_or(ReportError::AmountOverflow)?;
    }
    Ok(totals)
}

/// Folds entries into one pair of debit/credit totals.
fn fold_entries<'a>(
    mut entries: impl Iterator<Item = &'a GlEntry>,
) -> Result<AccountTotals, ReportError> {
    entries.try_fold(AccountTotals::default(), |sums, entry| {
        sums.checked_add(entry.debit, entry.credit)
            .ok_or(ReportError::AmountOverflow)
    })
}

fn grand_totals(
    totals: &HashMap<AccountId, AccountTotals>,
) -> Result<TrialBalanceTotals, ReportError> {
    let sums = totals
        .values()
        .try_fold(AccountTotals::default(), |sums, account| {
            sums.checked_add(account.debit_total, account.credit_total)
        })
        .ok_or(ReportError::AmountOverflow)?;
    Ok(TrialBalanceTotals::new(sums.debit_total, sums.credit_total))
}

fn ensure_known(
    chart: &AccountArena,
    totals: &HashMap<AccountId, AccountTotals>,
) -> Result<(), ReportError> {
    match totals.keys().find(|id| chart.get(**id).is_none()) {
        Some(id) => Err(ReportError::AccountNotFound(*id)),
        None => Ok(()),
    }
}
