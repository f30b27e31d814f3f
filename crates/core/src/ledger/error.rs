//! Ledger error types for posting validation and entry storage.

use chrono::NaiveDate;
use ledgerline_shared::types::{AccountId, TransactionId};
use rust_decimal::Decimal;
use thiserror::Error;

use super::types::AccountRef;
use crate::fiscal::PeriodKey;

/// Errors that can occur during ledger operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LedgerError {
    // ========== Validation Errors ==========
    /// Transaction has no lines.
    #[error("Transaction must have at least one entry")]
    EmptyTransaction,

    /// A line carries a negative amount.
    #[error("Entry {line} has a negative amount")]
    NegativeAmount {
        /// Zero-based line index.
        line: usize,
    },

    /// A line carries both a debit and a credit.
    #[error("Entry {line} must specify either debit or credit, not both")]
    BothSidesNonZero {
        /// Zero-based line index.
        line: usize,
    },

    /// Transaction is not balanced (debits != credits).
    #[error("Transaction is not balanced. Debit: {debit}, Credit: {credit}")]
    Unbalanced {
        /// Total debit amount.
        debit: Decimal,
        /// Total credit amount.
        credit: Decimal,
    },

    /// A total would leave the range of `Decimal`, either within the
    /// transaction or in the ledger's running totals.
    #[error("Amounts exceed the representable range")]
    AmountOverflow,

    // ========== Account Errors ==========
    /// Account not found.
    #[error("Account not found: {0}")]
    UnknownAccount(AccountRef),

    /// Account is inactive and cannot be posted to.
    #[error("Account {0} is inactive")]
    InactiveAccount(AccountId),

    // ========== Fiscal Period Errors ==========
    /// No fiscal period covers the transaction date.
    #[error("No fiscal period found for date {0}")]
    NoFiscalPeriod(NaiveDate),

    /// The requested fiscal period does not exist.
    #[error("Fiscal period {0} does not exist")]
    UnknownPeriod(PeriodKey),

    /// The transaction date lies outside the requested period.
    #[error("Date {date} lies outside fiscal period {period}")]
    DateOutsidePeriod {
        /// Transaction date.
        date: NaiveDate,
        /// Requested period.
        period: PeriodKey,
    },

    /// Fiscal period is closed, no posting allowed.
    #[error("Fiscal period {0} is closed, no posting allowed")]
    PeriodClosed(PeriodKey),

    // ========== Entry Store Errors ==========
    /// An appended line belongs to a different transaction.
    #[error("Entry belongs to transaction {found}, expected {expected}")]
    TransactionMismatch {
        /// The transaction being appended.
        expected: TransactionId,
        /// The id carried by the offending line.
        found: TransactionId,
    },

    /// The transaction id is already in the ledger.
    #[error("Transaction {0} has already been posted")]
    DuplicateTransaction(TransactionId),

    /// Transaction not found.
    #[error("Transaction not found: {0}")]
    TransactionNotFound(TransactionId),

    /// The transaction already has a reversal.
    #[error("Transaction {0} has already been reversed")]
    AlreadyReversed(TransactionId),
}

impl LedgerError {
    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::EmptyTransaction => "EMPTY_TRANSACTION",
            Self::NegativeAmount { .. } => "NEGATIVE_AMOUNT",
            Self::BothSidesNonZero { .. } => "INVALID_ENTRY_TYPE",
            Self::Unbalanced { .. } => "UNBALANCED_TRANSACTION",
            Self::AmountOverflow => "AMOUNT_OVERFLOW",
            Self::UnknownAccount(_) => "ACCOUNT_NOT_FOUND",
            Self::InactiveAccount(_) => "ACCOUNT_INACTIVE",
            Self::NoFiscalPeriod(_) => "NO_FISCAL_PERIOD",
            Self::UnknownPeriod(_) => "PERIOD_NOT_FOUND",
            Self::DateOutsidePeriod { .. } => "DATE_OUTSIDE_PERIOD",
            Self::PeriodClosed(_) => "PERIOD_CLOSED",
            Self::TransactionMismatch { .. } => "TRANSACTION_MISMATCH",
            Self::DuplicateTransaction(_) => "DUPLICATE_TRANSACTION",
            Self::TransactionNotFound(_) => "TRANSACTION_NOT_FOUND",
            Self::AlreadyReversed(_) => "ALREADY_REVERSED",
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub fn http_status_code(&self) -> u16 {
        match self {
            // 400 Bad Request - malformed postings
            Self::EmptyTransaction
            | Self::NegativeAmount { .. }
            | Self::BothSidesNonZero { .. }
            | Self::Unbalanced { .. }
            | Self::TransactionMismatch { .. } => 400,

            // 404 Not Found
            Self::UnknownAccount(_) | Self::UnknownPeriod(_) | Self::TransactionNotFound(_) => 404,

            // 409 Conflict
            Self::DuplicateTransaction(_) | Self::AlreadyReversed(_) => 409,

            // 422 Unprocessable - well-formed but not allowed now
            Self::AmountOverflow
            | Self::InactiveAccount(_)
            | Self::NoFiscalPeriod(_)
            | Self::DateOutsidePeriod { .. }
            | Self::PeriodClosed(_) => 422,
        }
    }

    /// Returns true if this error is retryable.
    ///
    /// Posting is validated under the write gate, so every rejection is a
    /// property of the request or of committed state.
    #[must_use]
    #[allow(clippy::unused_self)]
    pub fn is_retryable(&self) -> bool {
        false
    }
}
