//! Chart of Accounts error types.

use ledgerline_shared::types::AccountId;
use thiserror::Error;

/// Errors that can occur while maintaining the account hierarchy.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AccountError {
    // ========== Lookup Errors ==========
    /// Account not found.
    #[error("Account not found: {0}")]
    AccountNotFound(AccountId),

    /// No account carries this code.
    #[error("No account with code '{0}'")]
    CodeNotFound(String),

    // ========== Validation Errors ==========
    /// Account code is blank.
    #[error("Account code must not be blank")]
    InvalidCode,

    /// Account code already exists.
    #[error("Account code '{0}' already exists")]
    DuplicateCode(String),

    /// Parent account does not exist or is inactive.
    #[error("Parent account {0} does not exist or is inactive")]
    InvalidParent(AccountId),

    /// The proposed parent is the account itself or one of its descendants.
    #[error("Moving account {account_id} under {parent_id} would create a cycle")]
    CycleDetected {
        /// The account being moved.
        account_id: AccountId,
        /// The rejected parent.
        parent_id: AccountId,
    },

    /// Account type cannot change once entries reference the account.
    #[error("Cannot change account type for account {0} because it has ledger entries")]
    TypeChangeWithPostings(AccountId),

    // ========== Lifecycle Errors ==========
    /// Ledger entries reference the account.
    #[error("Account {0} is referenced by ledger entries")]
    HasActivePostings(AccountId),

    /// The account still has children.
    #[error("Account {0} has child accounts")]
    HasChildren(AccountId),

    // ========== Concurrency Errors ==========
    /// Optimistic concurrency check failed.
    #[error("Account version mismatch for account {account_id}: expected {expected}, got {actual}")]
    VersionConflict {
        /// The account ID.
        account_id: AccountId,
        /// The version the caller based its change on.
        expected: i64,
        /// The version currently stored.
        actual: i64,
    },
}

impl AccountError {
    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::AccountNotFound(_) => "ACCOUNT_NOT_FOUND",
            Self::CodeNotFound(_) => "ACCOUNT_CODE_NOT_FOUND",
            Self::InvalidCode => "INVALID_CODE",
            Self::DuplicateCode(_) => "DUPLICATE_CODE",
            Self::InvalidParent(_) => "INVALID_PARENT",
            Self::CycleDetected { .. } => "CYCLE_DETECTED",
            Self::TypeChangeWithPostings(_) => "ACCOUNT_TYPE_CHANGE_NOT_ALLOWED",
            Self::HasActivePostings(_) => "HAS_ACTIVE_POSTINGS",
            Self::HasChildren(_) => "HAS_CHILDREN",
            Self::VersionConflict { .. } => "VERSION_CONFLICT",
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub fn http_status_code(&self) -> u16 {
        match self {
            Self::InvalidCode | Self::InvalidParent(_) | Self::CycleDetected { .. } => 400,
            Self::AccountNotFound(_) | Self::CodeNotFound(_) => 404,
            Self::DuplicateCode(_) | Self::VersionConflict { .. } => 409,
            Self::TypeChangeWithPostings(_)
            | Self::HasActivePostings(_)
            | Self::HasChildren(_) => 422,
        }
    }

    /// Returns true if the caller may retry with fresh state.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::VersionConflict { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_conflict_is_retryable() {
        let err = AccountError::VersionConflict {
            account_id: AccountId::new(),
            expected: 1,
            actual: 2,
        };
        assert!(err.is_retryable());
        assert_eq!(err.http_status_code(), 409);
        assert!(!AccountError::InvalidCode.is_retryable());
    }

    #[test]
    fn test_cycle_error_code() {
        let err = AccountError::CycleDetected {
            account_id: AccountId::new(),
            parent_id: AccountId::new(),
        };
        assert_eq!(err.error_code(), "CYCLE_DETECTED");
        assert_eq!(err.http_status_code(), 400);
    }

    #[test]
    fn test_duplicate_code_display() {
        let err = AccountError::DuplicateCode("1000".to_string());
        assert_eq!(err.to_string(), "Account code '1000' already exists");
    }
}
