//! Fiscal period error types.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use thiserror::Error;

use super::period::PeriodKey;

/// Errors that can occur while managing fiscal periods.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FiscalError {
    /// Fiscal period not found.
    #[error("Fiscal period not found: {0}")]
    PeriodNotFound(PeriodKey),

    /// A period with this key already exists.
    #[error("Fiscal period {0} already exists")]
    DuplicatePeriod(PeriodKey),

    /// Start date must not be after end date.
    #[error("Start date {start} must not be after end date {end}")]
    InvalidDateRange {
        /// Requested start date.
        start: NaiveDate,
        /// Requested end date.
        end: NaiveDate,
    },

    /// The date range overlaps an existing period.
    #[error("Fiscal period {requested} overlaps existing period {existing}")]
    OverlappingPeriod {
        /// The period being opened.
        requested: PeriodKey,
        /// The period it collides with.
        existing: PeriodKey,
    },

    /// Fiscal year start month must be 1-12.
    #[error("Invalid fiscal year start month: {0}")]
    InvalidStartMonth(u32),

    /// Closing is a one-way transition.
    #[error("Fiscal period {0} is already closed")]
    AlreadyClosed(PeriodKey),

    /// The period's trial balance does not net to zero.
    #[error("Cannot close fiscal period {key}: trial balance is off by {difference}")]
    UnbalancedPeriod {
        /// The period being closed.
        key: PeriodKey,
        /// Total debits minus total credits within the period.
        difference: Decimal,
    },

    /// The period's totals could not be computed for the balance check.
    #[error("Cannot close fiscal period {0}: period totals exceed the representable range")]
    TotalsOverflow(PeriodKey),
}

impl FiscalError {
    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::PeriodNotFound(_) => "PERIOD_NOT_FOUND",
            Self::DuplicatePeriod(_) => "DUPLICATE_PERIOD",
            Self::InvalidDateRange { .. } => "INVALID_DATE_RANGE",
            Self::OverlappingPeriod { .. } => "OVERLAPPING_PERIOD",
            Self::InvalidStartMonth(_) => "INVALID_START_MONTH",
            Self::AlreadyClosed(_) => "PERIOD_ALREADY_CLOSED",
            Self::UnbalancedPeriod { .. } => "UNBALANCED_PERIOD",
            Self::TotalsOverflow(_) => "PERIOD_TOTALS_OVERFLOW",
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub fn http_status_code(&self) -> u16 {
        match self {
            Self::InvalidDateRange { .. } | Self::InvalidStartMonth(_) => 400,
            Self::PeriodNotFound(_) => 404,
            Self::DuplicatePeriod(_) | Self::OverlappingPeriod { .. } => 409,
            Self::AlreadyClosed(_) | Self::UnbalancedPeriod { .. } => 422,
            Self::TotalsOverflow(_) => 500,
        }
    }

    /// Returns true if the caller may retry.
    #[must_use]
    #[allow(clippy::unused_self)]
    pub fn is_retryable(&self) -> bool {
        false
    }
}
