//! Core ledger engine for Ledgerline.
//!
//! This crate contains the double-entry General Ledger with ZERO web or
//! database dependencies. All domain types, validation rules, and
//! aggregations live here.
//!
//! # Modules
//!
//! - `accounts` - Chart of Accounts hierarchy
//! - `ledger` - Entry store, posting validation and the posting service
//! - `fiscal` - Fiscal periods and closing
//! - `reports` - Trial balance, account summary and running balances
//! - `general_ledger` - The wired engine a host application injects

pub mod accounts;
pub mod error;
pub mod fiscal;
pub mod general_ledger;
pub mod ledger;
pub mod reports;

pub use general_ledger::GeneralLedger;
