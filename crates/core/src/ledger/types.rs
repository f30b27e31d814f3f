//! Ledger domain types for posting and validation.

use std::fmt;

use chrono::NaiveDate;
use ledgerline_shared::types::{AccountId, LedgerEntryId, TransactionId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::entry::ApprovalStatus;
use crate::fiscal::PeriodKey;

/// How a posting line names its account.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountRef {
    /// By account id.
    Id(AccountId),
    /// By account code.
    Code(String),
}

impl fmt::Display for AccountRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Id(id) => write!(f, "{id}"),
            Self::Code(code) => write!(f, "code '{code}'"),
        }
    }
}

impl From<AccountId> for AccountRef {
    fn from(id: AccountId) -> Self {
        Self::Id(id)
    }
}

impl From<&str> for AccountRef {
    fn from(code: &str) -> Self {
        Self::Code(code.to_string())
    }
}

/// One candidate line of a posting request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostingLine {
    /// The account to post to.
    pub account: AccountRef,
    /// Debit amount (non-negative).
    #[serde(default)]
    pub debit: Decimal,
    /// Credit amount (non-negative).
    #[serde(default)]
    pub credit: Decimal,
    /// Optional memo for this line.
    #[serde(default)]
    pub description: Option<String>,
}

impl PostingLine {
    /// A debit line.
    #[must_use]
    pub fn debit(account: impl Into<AccountRef>, amount: Decimal) -> Self {
        Self {
            account: account.into(),
            debit: amount,
            credit: Decimal::ZERO,
            description: None,
        }
    }

    /// A credit line.
    #[must_use]
    pub fn credit(account: impl Into<AccountRef>, amount: Decimal) -> Self {
        Self {
            account: account.into(),
            debit: Decimal::ZERO,
            credit: amount,
            description: None,
        }
    }

    /// Attaches a memo.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Inbound posting request from an originating module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostingRequest {
    /// Caller-chosen transaction id; generated when absent.
    #[serde(default)]
    pub transaction_id: Option<TransactionId>,
    /// Candidate lines.
    pub entries: Vec<PostingLine>,
    /// Originating module.
    pub module_source: String,
    /// Kind of source document.
    pub reference_type: String,
    /// Business date.
    pub transaction_date: NaiveDate,
    /// Explicit fiscal period; resolved from the date when absent.
    #[serde(default)]
    pub fiscal_period: Option<PeriodKey>,
    /// Transaction-level description, used for lines without their own.
    #[serde(default)]
    pub description: Option<String>,
    /// Approval state to stamp on the entries.
    #[serde(default)]
    pub approval_status: ApprovalStatus,
    /// Who submitted the posting.
    #[serde(default)]
    pub created_by: Option<String>,
}

impl PostingRequest {
    /// Creates a request with default metadata.
    #[must_use]
    pub fn new(
        module_source: impl Into<String>,
        reference_type: impl Into<String>,
        transaction_date: NaiveDate,
        entries: Vec<PostingLine>,
    ) -> Self {
        Self {
            transaction_id: None,
            entries,
            module_source: module_source.into(),
            reference_type: reference_type.into(),
            transaction_date,
            fiscal_period: None,
            description: None,
            approval_status: ApprovalStatus::default(),
            created_by: None,
        }
    }
}

/// The validator's input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProposedTransaction {
    /// Lines to validate.
    pub lines: Vec<PostingLine>,
    /// Business date.
    pub transaction_date: NaiveDate,
    /// Explicit fiscal period, if the caller named one.
    pub fiscal_period: Option<PeriodKey>,
}

/// A validated line with its account resolved to an id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedLine {
    /// Resolved account id.
    pub account_id: AccountId,
    /// Debit amount.
    pub debit: Decimal,
    /// Credit amount.
    pub credit: Decimal,
    /// Optional memo.
    pub description: Option<String>,
}

/// Information about an account needed for validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccountInfo {
    /// The account ID.
    pub id: AccountId,
    /// Whether the account is active.
    pub is_active: bool,
}

/// Information about a fiscal period needed for validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeriodInfo {
    /// The period key.
    pub key: PeriodKey,
    /// First day of the period.
    pub start_date: NaiveDate,
    /// Last day of the period.
    pub end_date: NaiveDate,
    /// Whether the period accepts postings.
    pub is_open: bool,
}

/// Transaction totals for validation and display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionTotals {
    /// Total debit amount.
    pub debit: Decimal,
    /// Total credit amount.
    pub credit: Decimal,
    /// Whether the transaction is balanced (debits == credits).
    pub is_balanced: bool,
}

impl TransactionTotals {
    /// Creates new transaction totals from debit and credit sums.
    #[must_use]
    pub fn new(debit: Decimal, credit: Decimal) -> Self {
        Self {
            debit,
            credit,
            is_balanced: debit == credit,
        }
    }

    /// Sums the debit and credit columns of `lines`.
    ///
    /// Returns `None` if either column overflows.
    #[must_use]
    pub fn checked_of(lines: &[ResolvedLine]) -> Option<Self> {
        let mut debit = Decimal::ZERO;
        let mut credit = Decimal::ZERO;
        for line in lines {
            debit = debit.checked_add(line.debit)?;
            credit = credit.checked_add(line.credit)?;
        }
        Some(Self::new(debit, credit))
    }

    /// Returns the difference between debits and credits.
    #[must_use]
    pub fn difference(&self) -> Decimal {
        self.debit - self.credit
    }
}

/// A transaction that passed every posting rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedTransaction {
    /// The validated lines.
    pub lines: Vec<ResolvedLine>,
    /// The open period the transaction books into.
    pub period: PeriodKey,
    /// Debit/credit totals (always balanced).
    pub totals: TransactionTotals,
}

/// Result of a successful posting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostingReceipt {
    /// The committed transaction id.
    pub transaction_id: TransactionId,
    /// Ids of the appended entries, in line order.
    pub entry_ids: Vec<LedgerEntryId>,
    /// The period the transaction was booked in.
    pub period: PeriodKey,
    /// Transaction totals.
    pub totals: TransactionTotals,
}

/// Parameters for reversing a committed transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReversalRequest {
    /// Business date of the reversal.
    pub reversal_date: NaiveDate,
    /// Why the transaction is reversed.
    #[serde(default)]
    pub reason: Option<String>,
    /// Who requested the reversal.
    #[serde(default)]
    pub created_by: Option<String>,
}
