//! Ledger aggregation.
//!
//! Reports are folds over the committed entry log:
//! - Trial Balance, by date range or fiscal period
//! - General ledger summary per account
//! - Per-account running balance
//! - Whole-log integrity verification

pub mod error;
pub mod service;
pub mod types;


pub use error::ReportError;
pub use service::AggregationEngine;
pub use types::*;
