//! Report data types.

use chrono::NaiveDate;
use ledgerline_shared::types::{AccountId, LedgerEntryId, TransactionId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::error::ReportError;
use crate::accounts::AccountType;
use crate::fiscal::PeriodKey;
use crate::ledger::balance::{NormalBalance, RunningBalance};

/// Inclusive date window. An open bound is unbounded on that side.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DateRange {
    /// First day included.
    pub start: Option<NaiveDate>,
    /// Last day included.
    pub end: Option<NaiveDate>,
}

impl DateRange {
    /// Creates a validated range.
    ///
    /// # Errors
    ///
    /// Returns `InvalidDateRange` if `start` is after `end`.
    pub fn new(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Result<Self, ReportError> {
        let range = Self { start, end };
        range.validate()?;
        Ok(range)
    }

    /// The unbounded range.
    #[must_use]
    pub const fn all() -> Self {
        Self {
            start: None,
            end: None,
        }
    }

    /// Both bounds set.
    ///
    /// # Errors
    ///
    /// Returns `InvalidDateRange` if `start` is after `end`.
    pub fn between(start: NaiveDate, end: NaiveDate) -> Result<Self, ReportError> {
        Self::new(Some(start), Some(end))
    }

    /// Everything up to and including `end`.
    #[must_use]
    pub const fn until(end: NaiveDate) -> Self {
        Self {
            start: None,
            end: Some(end),
        }
    }

    /// Checks that the bounds are ordered.
    ///
    /// # Errors
    ///
    /// Returns `InvalidDateRange` if `start` is after `end`.
    pub fn validate(&self) -> Result<(), ReportError> {
        match (self.start, self.end) {
            (Some(start), Some(end)) if start > end => {
                Err(ReportError::InvalidDateRange { start, end })
            }
            _ => Ok(()),
        }
    }

    /// Returns true if `date` falls inside the range.
    #[must_use]
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start.is_none_or(|start| date >= start) && self.end.is_none_or(|end| date <= end)
    }

    pub(crate) fn first_day(&self) -> NaiveDate {
        self.start.unwrap_or(NaiveDate::MIN)
    }

    pub(crate) fn last_day(&self) -> NaiveDate {
        self.end.unwrap_or(NaiveDate::MAX)
    }
}

/// Which entries a trial balance folds over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReportScope {
    /// Entries whose transaction date falls in the range.
    Range(DateRange),
    /// Entries booked in one fiscal period.
    Period(PeriodKey),
}

/// One account's line in a trial balance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrialBalanceLine {
    /// Account ID.
    pub account_id: AccountId,
    /// Account code.
    pub code: String,
    /// Account name.
    pub name: String,
    /// Account type.
    pub account_type: AccountType,
    /// Inactive accounts still report their history.
    pub is_active: bool,
    /// Total debit amount.
    pub total_debits: Decimal,
    /// Total credit amount.
    pub total_credits: Decimal,
    /// Net balance on the type's normal side.
    pub balance: Decimal,
}

/// Totals for one account type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeGroup {
    /// The account type.
    pub account_type: AccountType,
    /// Total debit amount.
    pub total_debits: Decimal,
    /// Total credit amount.
    pub total_credits: Decimal,
    /// Net balance on the type's normal side.
    pub balance: Decimal,
}

/// Trial balance totals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrialBalanceTotals {
    /// Total debit.
    pub total_debits: Decimal,
    /// Total credit.
    pub total_credits: Decimal,
    /// `total_debits - total_credits`.
    pub difference: Decimal,
    /// Whether debits equal credits.
    pub is_balanced: bool,
}

impl TrialBalanceTotals {
    /// Builds totals from the two sums.
    #[must_use]
    pub fn new(total_debits: Decimal, total_credits: Decimal) -> Self {
        let difference = total_debits - total_credits;
        Self {
            total_debits,
            total_credits,
            difference,
            is_balanced: difference.is_zero(),
        }
    }
}

/// Trial balance report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrialBalanceReport {
    /// What the report covers.
    pub scope: ReportScope,
    /// One group per account type, in reporting order.
    pub groups: Vec<TypeGroup>,
    /// Accounts with activity in scope, ordered by code.
    pub accounts: Vec<TrialBalanceLine>,
    /// Grand totals.
    pub totals: TrialBalanceTotals,
}

/// One account's line in the general ledger summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountSummaryLine {
    /// Account ID.
    pub account_id: AccountId,
    /// Account code.
    pub code: String,
    /// Account name.
    pub name: String,
    /// Account type.
    pub account_type: AccountType,
    /// Total debit amount.
    pub total_debits: Decimal,
    /// Total credit amount.
    pub total_credits: Decimal,
    /// Net amount on the type's normal side.
    pub net_amount: Decimal,
    /// Number of entries in range.
    pub entry_count: u64,
}

/// One entry in an account's running balance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunningBalanceLine {
    /// Entry ID.
    pub entry_id: LedgerEntryId,
    /// Transaction the entry belongs to.
    pub transaction_id: TransactionId,
    /// Global insertion sequence.
    pub sequence: u64,
    /// Transaction date.
    pub transaction_date: NaiveDate,
    /// Debit amount.
    pub debit: Decimal,
    /// Credit amount.
    pub credit: Decimal,
    /// Line memo.
    pub description: Option<String>,
    /// Balance before and after this entry.
    pub running: RunningBalance,
}

/// An account's history folded in date order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunningBalanceView {
    /// Account ID.
    pub account_id: AccountId,
    /// Account code.
    pub code: String,
    /// Last day folded.
    pub as_of: NaiveDate,
    /// Side on which the balance is signed positive.
    pub normal_balance: NormalBalance,
    /// Entries in fold order.
    pub lines: Vec<RunningBalanceLine>,
    /// Balance after the last line.
    pub balance: Decimal,
}

/// A committed transaction whose sides disagree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionImbalance {
    /// Transaction ID.
    pub transaction_id: TransactionId,
    /// Sum of debits.
    pub debit: Decimal,
    /// Sum of credits.
    pub credit: Decimal,
}

/// Result of re-folding the whole log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntegrityReport {
    /// Committed entries.
    pub entry_count: usize,
    /// Committed transactions.
    pub transaction_count: usize,
    /// Grand totals of the fresh fold.
    pub totals: TrialBalanceTotals,
    /// Transactions with `sum(debit) != sum(credit)`.
    pub unbalanced_transactions: Vec<TransactionImbalance>,
    /// Accounts whose maintained totals disagree with the fresh fold.
    pub drifted_accounts: Vec<AccountId>,
}

impl IntegrityReport {
    /// Returns true if nothing disagrees.
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        self.totals.is_balanced
            && self.unbalanced_transactions.is_empty()
            && self.drifted_accounts.is_empty()
    }
}
