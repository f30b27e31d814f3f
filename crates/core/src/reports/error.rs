//! Report error types.

use chrono::NaiveDate;
use ledgerline_shared::types::AccountId;
use rust_decimal::Decimal;
use thiserror::Error;

/// Errors that can occur during report generation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ReportError {
    // ========== Validation Errors ==========
    /// Invalid date range.
    #[error("Invalid date range: start {start} is after end {end}")]
    InvalidDateRange {
        /// Start date.
        start: NaiveDate,
        /// End date.
        end: NaiveDate,
    },

    // ========== Lookup Errors ==========
    /// Account not found.
    #[error("Account not found: {0}")]
    AccountNotFound(AccountId),

    // ========== Integrity Errors ==========
    /// A report total left the range of `Decimal`. The entry store keeps
    /// ledger-wide totals in range, so this means the log was altered.
    #[error("Report totals exceed the representable range")]
    AmountOverflow,

    /// The committed log contradicts the double-entry invariant.
    #[error(
        "Ledger integrity violated: difference {difference}, {unbalanced_transactions} unbalanced transaction(s), {drifted_accounts} drifted account total(s)"
    )]
    IntegrityViolation {
        /// `sum(debits) - sum(credits)` over the whole log.
        difference: Decimal,
        /// Number of transactions whose sides disagree.
        unbalanced_transactions: usize,
        /// Number of accounts whose maintained totals disagree with a fresh fold.
        drifted_accounts: usize,
    },
}

impl ReportError {
    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidDateRange { .. } => "INVALID_DATE_RANGE",
            Self::AccountNotFound(_) => "ACCOUNT_NOT_FOUND",
            Self::AmountOverflow => "AMOUNT_OVERFLOW",
            Self::IntegrityViolation { .. } => "LEDGER_INTEGRITY_VIOLATION",
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub fn http_status_code(&self) -> u16 {
        match self {
            Self::InvalidDateRange { .. } => 400,
            Self::AccountNotFound(_) => 404,
            Self::AmountOverflow | Self::IntegrityViolation { .. } => 500,
        }
    }

    /// Report errors never go away on retry.
    #[must_use]
    #[allow(clippy::unused_self)]
    pub fn is_retryable(&self) -> bool {
        false
    }
}
