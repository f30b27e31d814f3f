//! Ledger entry domain types.

use chrono::{DateTime, NaiveDate, Utc};
use ledgerline_shared::types::{AccountId, LedgerEntryId, TransactionId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::fiscal::PeriodKey;

/// Approval state carried on an entry. Informational only; posting does
/// not depend on it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApprovalStatus {
    /// Awaiting approval in the originating module.
    Pending,
    /// Approved.
    #[default]
    Approved,
    /// Rejected in the originating module.
    Rejected,
}

/// A single committed line in the General Ledger.
///
/// Entries are immutable once appended. A transaction is the set of
/// entries sharing a `transaction_id`; its debits equal its credits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlEntry {
    /// Unique identifier for this entry.
    pub id: LedgerEntryId,
    /// The transaction this entry belongs to.
    pub transaction_id: TransactionId,
    /// Global insertion order, assigned by the entry store.
    pub sequence: u64,
    /// The account affected by this entry.
    pub account_id: AccountId,
    /// Debit amount (non-negative).
    pub debit: Decimal,
    /// Credit amount (non-negative).
    pub credit: Decimal,
    /// Business date of the transaction.
    pub transaction_date: NaiveDate,
    /// Fiscal period the entry is booked in.
    pub fiscal_period: PeriodKey,
    /// Originating module (e.g. "sales", "payroll").
    pub module_source: String,
    /// Kind of source document (e.g. "invoice").
    pub reference_type: String,
    /// Optional description for this line item.
    pub description: Option<String>,
    /// Approval state at posting time.
    pub approval_status: ApprovalStatus,
    /// Who submitted the posting.
    pub created_by: Option<String>,
    /// When the entry was appended.
    pub created_at: DateTime<Utc>,
    /// The transaction this entry reverses, if any.
    pub reversal_of: Option<TransactionId>,
}

impl GlEntry {
    /// Returns the signed amount (positive for debit, negative for credit).
    #[must_use]
    pub fn signed_amount(&self) -> Decimal {
        self.debit - self.credit
    }
}
