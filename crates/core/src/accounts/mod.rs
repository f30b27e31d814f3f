//! Chart of Accounts hierarchy.
//!
//! Accounts live in an arena keyed by id; `parent_id` is a plain reference
//! and every hierarchy question (level, ancestry, cycles) is answered by an
//! explicit walk over the arena.

pub mod error;
pub mod store;
pub mod types;

#[cfg(test)]
mod hierarchy_props;

pub use error::AccountError;
pub use store::{AccountArena, AccountStore, Descendants, PostingIndex};
pub use types::{Account, AccountFilter, AccountPatch, AccountType, NewAccount};
