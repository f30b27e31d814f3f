//! Double-entry bookkeeping logic.
//!
//! This module implements the posting side of the General Ledger:
//! - Ledger entries and the append-only entry store
//! - Balance calculations
//! - Posting validation
//! - The posting service and reversals

pub mod balance;
pub mod entry;
pub mod error;
pub mod gate;
pub mod reversal;
pub mod service;
pub mod store;
pub mod types;
pub mod validation;

#[cfg(test)]
mod service_props;
#[cfg(test)]
mod validation_props;

pub use balance::{AccountTotals, NormalBalance, RunningBalance};
pub use entry::{ApprovalStatus, GlEntry};
pub use error::LedgerError;
pub use gate::WriteGate;
pub use service::{DEFAULT_REVERSAL_MODULE_SOURCE, PostingService};
pub use store::{EntryCursor, EntryLog, EntryStore};
pub use types::{
    AccountInfo, AccountRef, PeriodInfo, PostingLine, PostingReceipt, PostingRequest,
    ProposedTransaction, ResolvedLine, ReversalRequest, TransactionTotals, ValidatedTransaction,
};
pub use validation::PostingValidator;
