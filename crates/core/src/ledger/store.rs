//! Ledger Entry Store.
//!
//! Append-only. A transaction's entries are published together under one
//! write lock, so no reader ever sees part of a transaction. Entries are
//! shared as `Arc<GlEntry>` between the log and its indexes.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::vec;

use chrono::NaiveDate;
use ledgerline_shared::types::{AccountId, TransactionId};
use parking_lot::RwLock;
use tracing::debug;

use super::balance::AccountTotals;
use super::entry::GlEntry;
use super::error::LedgerError;
use crate::accounts::PostingIndex;
use crate::fiscal::PeriodKey;
use crate::reports::DateRange;

/// The committed log plus its secondary indexes.
///
/// Only reachable through `EntryStore::read`, which holds the store's read
/// lock for the duration of the closure.
#[derive(Debug, Default)]
pub struct EntryLog {
    entries: Vec<Arc<GlEntry>>,
    by_account: HashMap<AccountId, BTreeMap<(NaiveDate, u64), Arc<GlEntry>>>,
    transactions: HashMap<TransactionId, Vec<Arc<GlEntry>>>,
    transaction_order: Vec<TransactionId>,
    by_period: HashMap<PeriodKey, Vec<Arc<GlEntry>>>,
    by_module: HashMap<String, Vec<Arc<GlEntry>>>,
    totals: HashMap<AccountId, AccountTotals>,
    ledger_totals: AccountTotals,
    reversed_by: HashMap<TransactionId, TransactionId>,
    next_sequence: u64,
}

impl EntryLog {
    /// Number of committed entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if nothing has been posted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Every entry in append order.
    pub fn iter(&self) -> impl Iterator<Item = &GlEntry> {
        self.entries.iter().map(AsRef::as_ref)
    }

    /// Entries of one account within `range`, ordered by transaction date
    /// then sequence.
    pub fn account_entries(
        &self,
        account_id: AccountId,
        range: &DateRange,
    ) -> impl Iterator<Item = &Arc<GlEntry>> {
        let (first, last) = (range.first_day(), range.last_day());
        self.by_account
            .get(&account_id)
            .filter(|_| first <= last)
            .into_iter()
            .flat_map(move |index| index.range((first, 0)..=(last, u64::MAX)).map(|(_, e)| e))
    }

    /// Entries of one transaction, in line order.
    #[must_use]
    pub fn transaction(&self, transaction_id: TransactionId) -> Option<&[Arc<GlEntry>]> {
        self.transactions.get(&transaction_id).map(Vec::as_slice)
    }

    /// Every transaction in append order.
    pub fn transactions(&self) -> impl Iterator<Item = (TransactionId, &[Arc<GlEntry>])> {
        self.transaction_order
            .iter()
            .filter_map(|id| self.transaction(*id).map(|entries| (*id, entries)))
    }

    /// Number of committed transactions.
    #[must_use]
    pub fn transaction_count(&self) -> usize {
        self.transaction_order.len()
    }

    /// Entries booked in a fiscal period, in append order.
    #[must_use]
    pub fn period_entries(&self, key: PeriodKey) -> &[Arc<GlEntry>] {
        self.by_period.get(&key).map(Vec::as_slice).unwrap_or_default()
    }

    /// Entries posted by a module, in append order.
    #[must_use]
    pub fn module_entries(&self, module_source: &str) -> &[Arc<GlEntry>] {
        self.by_module
            .get(module_source)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Running totals maintained at append time.
    #[must_use]
    pub fn account_totals(&self, account_id: AccountId) -> AccountTotals {
        self.totals.get(&account_id).copied().unwrap_or_default()
    }

    /// All maintained running totals.
    #[must_use]
    pub fn all_totals(&self) -> &HashMap<AccountId, AccountTotals> {
        &self.totals
    }

    /// Debit and credit totals over the whole log, maintained at append
    /// time. Every report sums a subset of these columns, so no report can
    /// overflow while they fit.
    #[must_use]
    pub fn ledger_totals(&self) -> AccountTotals {
        self.ledger_totals
    }

    /// The transaction that reversed `transaction_id`, if any.
    #[must_use]
    pub fn reversed_by(&self, transaction_id: TransactionId) -> Option<TransactionId> {
        self.reversed_by.get(&transaction_id).copied()
    }

    /// Returns true if any entry references the account.
    #[must_use]
    pub fn has_postings(&self, account_id: AccountId) -> bool {
        self.by_account.contains_key(&account_id)
    }

    fn index(&mut self, entry: &Arc<GlEntry>) {
        self.entries.push(Arc::clone(entry));
        self.by_account
            .entry(entry.account_id)
            .or_default()
            .insert((entry.transaction_date, entry.sequence), Arc::clone(entry));
        self.by_period
            .entry(entry.fiscal_period)
            .or_default()
            .push(Arc::clone(entry));
        self.by_module
            .entry(entry.module_source.clone())
            .or_default()
            .push(Arc::clone(entry));
    }

    /// Totals after folding in `entries`, computed without touching the log.
    fn staged_totals(
        &self,
        entries: &[GlEntry],
    ) -> Option<(HashMap<AccountId, AccountTotals>, AccountTotals)> {
        let mut accounts: HashMap<AccountId, AccountTotals> = HashMap::new();
        let mut ledger = self.ledger_totals;
        for entry in entries {
            let current = accounts
                .get(&entry.account_id)
                .copied()
                .unwrap_or_else(|| self.account_totals(entry.account_id));
            accounts.insert(
                entry.account_id,
                current.checked_add(entry.debit, entry.credit)?,
            );
            ledger = ledger.checked_add(entry.debit, entry.credit)?;
        }
        Some((accounts, ledger))
    }
}

/// Lazy cursor over one account's entries.
///
/// Holds its own references to a consistent snapshot taken at query time;
/// entries appended afterwards are not visited.
#[derive(Debug, Clone)]
pub struct EntryCursor {
    inner: vec::IntoIter<Arc<GlEntry>>,
}

impl Iterator for EntryCursor {
    type Item = Arc<GlEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl ExactSizeIterator for EntryCursor {}

/// Ledger Entry Store.
#[derive(Debug, Default)]
pub struct EntryStore {
    log: RwLock<EntryLog>,
}

impl EntryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends every entry of one transaction, or none of them.
    ///
    /// Sequences are assigned here; whatever the caller put in `sequence`
    /// is overwritten. A batch whose entries carry `reversal_of` records
    /// the reversal link atomically with the append.
    ///
    /// # Errors
    ///
    /// - `EmptyTransaction` for an empty batch
    /// - `TransactionMismatch` if an entry names another transaction
    /// - `DuplicateTransaction` if the id is already in the log
    /// - `TransactionNotFound` / `AlreadyReversed` for a bad reversal link
    /// - `AmountOverflow` if an account's or the ledger's totals would
    ///   leave the `Decimal` range
    pub(crate) fn append(
        &self,
        transaction_id: TransactionId,
        entries: Vec<GlEntry>,
    ) -> Result<Vec<Arc<GlEntry>>, LedgerError> {
        if entries.is_empty() {
            return Err(LedgerError::EmptyTransaction);
        }
        if let Some(stray) = entries.iter().find(|e| e.transaction_id != transaction_id) {
            return Err(LedgerError::TransactionMismatch {
                expected: transaction_id,
                found: stray.transaction_id,
            });
        }
        let reversal_of = entries.iter().find_map(|e| e.reversal_of);

        let mut log = self.log.write();
        if log.transactions.contains_key(&transaction_id) {
            return Err(LedgerError::DuplicateTransaction(transaction_id));
        }
        if let Some(original) = reversal_of {
            if !log.transactions.contains_key(&original) {
                return Err(LedgerError::TransactionNotFound(original));
            }
            if log.reversed_by.contains_key(&original) {
                return Err(LedgerError::AlreadyReversed(original));
            }
        }

        // Everything fallible happens before the first index is touched.
        let (account_totals, ledger_totals) = log
            .staged_totals(&entries)
            .ok_or(LedgerError::AmountOverflow)?;

        let mut committed = Vec::with_capacity(entries.len());
        for mut entry in entries {
            log.next_sequence += 1;
            entry.sequence = log.next_sequence;
            let entry = Arc::new(entry);
            log.index(&entry);
            committed.push(entry);
        }
        log.totals.extend(account_totals);
        log.ledger_totals = ledger_totals;
        log.transactions.insert(transaction_id, committed.clone());
        log.transaction_order.push(transaction_id);
        if let Some(original) = reversal_of {
            log.reversed_by.insert(original, transaction_id);
        }

        debug!(
            transaction_id = %transaction_id,
            entries = committed.len(),
            last_sequence = log.next_sequence,
            "Entries appended"
        );
        Ok(committed)
    }

    /// Entries of one account within `range`, ordered by transaction date
    /// then sequence.
    #[must_use]
    pub fn query_by_account(&self, account_id: AccountId, range: &DateRange) -> EntryCursor {
        let snapshot: Vec<Arc<GlEntry>> = self
            .log
            .read()
            .account_entries(account_id, range)
            .cloned()
            .collect();
        EntryCursor {
            inner: snapshot.into_iter(),
        }
    }

    /// Entries of one transaction; empty if the id is unknown.
    #[must_use]
    pub fn query_by_transaction(&self, transaction_id: TransactionId) -> Vec<Arc<GlEntry>> {
        self.log
            .read()
            .transaction(transaction_id)
            .map(<[_]>::to_vec)
            .unwrap_or_default()
    }

    /// Entries booked in a fiscal period.
    #[must_use]
    pub fn query_by_period(&self, key: PeriodKey) -> Vec<Arc<GlEntry>> {
        self.log.read().period_entries(key).to_vec()
    }

    /// Entries posted by a module.
    #[must_use]
    pub fn query_by_module(&self, module_source: &str) -> Vec<Arc<GlEntry>> {
        self.log.read().module_entries(module_source).to_vec()
    }

    /// Committed transaction ids in append order.
    #[must_use]
    pub fn transaction_ids(&self) -> Vec<TransactionId> {
        self.log.read().transaction_order.clone()
    }

    /// Number of committed entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.log.read().len()
    }

    /// Returns true if nothing has been posted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.log.read().is_empty()
    }

    /// Running totals for an account. Not authoritative; reports fold the
    /// log itself.
    #[must_use]
    pub fn account_totals(&self, account_id: AccountId) -> AccountTotals {
        self.log.read().account_totals(account_id)
    }

    /// Runs `f` against the log under a single read lock.
    pub fn read<R>(&self, f: impl FnOnce(&EntryLog) -> R) -> R {
        f(&self.log.read())
    }
}

impl PostingIndex for EntryStore {
    fn has_postings(&self, account_id: AccountId) -> bool {
        self.log.read().has_postings(account_id)
    }
}
