//! Conversions from domain errors into the transport-facing `AppError`.
//!
//! Each domain error already knows its HTTP status; the envelope variant is
//! picked from that status so the two can never disagree.

use ledgerline_shared::AppError;

use crate::accounts::AccountError;
use crate::fiscal::FiscalError;
use crate::ledger::LedgerError;
use crate::reports::ReportError;

fn envelope(status: u16, message: String) -> AppError {
    match status {
        400 => AppError::Validation(message),
        404 => AppError::NotFound(message),
        409 => AppError::Conflict(message),
        422 => AppError::BusinessRule(message),
        500 => AppError::Integrity(message),
        _ => AppError::Internal(message),
    }
}

impl From<AccountError> for AppError {
    fn from(err: AccountError) -> Self {
        envelope(err.http_status_code(), err.to_string())
    }
}

impl From<LedgerError> for AppError {
    fn from(err: LedgerError) -> Self {
        envelope(err.http_status_code(), err.to_string())
    }
}

impl From<FiscalError> for AppError {
    fn from(err: FiscalError) -> Self {
        envelope(err.http_status_code(), err.to_string())
    }
}

impl From<ReportError> for AppError {
    fn from(err: ReportError) -> Self {
        envelope(err.http_status_code(), err.to_string())
    }
}
