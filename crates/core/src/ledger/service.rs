//! Ledger Posting Service.
//!
//! Turns a posting request into committed entries. Under the write gate
//! it reads the chart and the fiscal calendar, validates, and appends, so
//! the state a transaction was validated against is the state it lands in.

use std::sync::Arc;

use chrono::Utc;
use ledgerline_shared::types::{LedgerEntryId, TransactionId};
use tracing::{info, warn};

use super::entry::GlEntry;
use super::error::LedgerError;
use super::gate::WriteGate;
use super::reversal::reversing_request;
use super::store::EntryStore;
use super::types::{
    AccountInfo, AccountRef, PeriodInfo, PostingReceipt, PostingRequest, ProposedTransaction,
    ReversalRequest,
};
use super::validation::PostingValidator;
use crate::accounts::AccountStore;
use crate::fiscal::{FiscalPeriod, PeriodManager};

/// Module source stamped on reversals when none is configured.
pub const DEFAULT_REVERSAL_MODULE_SOURCE: &str = "general_ledger";

const POSTING_TARGET: &str = "ledgerline::posting";

/// Ledger Posting Service.
#[derive(Debug, Clone)]
pub struct PostingService {
    accounts: Arc<AccountStore>,
    entries: Arc<EntryStore>,
    periods: Arc<PeriodManager>,
    gate: WriteGate,
    reversal_module_source: String,
}

impl PostingService {
    /// Creates a service over the given stores. `gate` must be the gate
    /// every other cross-store writer uses.
    #[must_use]
    pub fn new(
        accounts: Arc<AccountStore>,
        entries: Arc<EntryStore>,
        periods: Arc<PeriodManager>,
        gate: WriteGate,
    ) -> Self {
        Self {
            accounts,
            entries,
            periods,
            gate,
            reversal_module_source: DEFAULT_REVERSAL_MODULE_SOURCE.to_string(),
        }
    }

    /// Sets the module source stamped on reversing transactions.
    #[must_use]
    pub fn with_reversal_module_source(mut self, module_source: impl Into<String>) -> Self {
        self.reversal_module_source = module_source.into();
        self
    }

    /// Validates and commits a transaction.
    ///
    /// Either every line is appended or nothing is.
    ///
    /// # Errors
    ///
    /// Any `LedgerError` from validation or from the entry store.
    pub fn post(&self, request: PostingRequest) -> Result<PostingReceipt, LedgerError> {
        let _gate = self.gate.enter();
        self.post_locked(request, None)
    }

    /// Posts the offsetting transaction for `transaction_id`.
    ///
    /// # Errors
    ///
    /// - `TransactionNotFound` if the id was never posted
    /// - `AlreadyReversed` if a reversal already exists
    /// - any error `post` would return for the reversing entries
    pub fn reverse(
        &self,
        transaction_id: TransactionId,
        request: &ReversalRequest,
    ) -> Result<PostingReceipt, LedgerError> {
        let _gate = self.gate.enter();

        let original = self.entries.query_by_transaction(transaction_id);
        if original.is_empty() {
            return Err(LedgerError::TransactionNotFound(transaction_id));
        }
        if self
            .entries
            .read(|log| log.reversed_by(transaction_id))
            .is_some()
        {
            return Err(LedgerError::AlreadyReversed(transaction_id));
        }

        let posting = reversing_request(
            transaction_id,
            &original,
            request,
            &self.reversal_module_source,
        );
        let receipt = self.post_locked(posting, Some(transaction_id))?;
        info!(
            target: POSTING_TARGET,
            original = %transaction_id,
            reversal = %receipt.transaction_id,
            "Transaction reversed"
        );
        Ok(receipt)
    }

    /// Posting pipeline. Caller must hold the gate.
    fn post_locked(
        &self,
        request: PostingRequest,
        reversal_of: Option<TransactionId>,
    ) -> Result<PostingReceipt, LedgerError> {
        let transaction_id = request.transaction_id.unwrap_or_else(TransactionId::new);
        let module_source = request.module_source;

        let chart = self.accounts.snapshot();
        let proposed = ProposedTransaction {
            lines: request.entries,
            transaction_date: request.transaction_date,
            fiscal_period: request.fiscal_period,
        };
        let validated = PostingValidator::validate(
            proposed,
            |account| {
                let found = match account {
                    AccountRef::Id(id) => chart.get(*id),
                    AccountRef::Code(code) => chart.get_by_code(code),
                }?;
                Some(AccountInfo {
                    id: found.id,
                    is_active: found.is_active,
                })
            },
            |key| self.periods.get(key).ok().as_ref().map(period_info),
            |date| self.periods.resolve_date(date).as_ref().map(period_info),
        )
        .inspect_err(|err| {
            warn!(
                target: POSTING_TARGET,
                transaction_id = %transaction_id,
                module_source = %module_source,
                code = err.error_code(),
                error = %err,
                "Posting rejected"
            );
        })?;

        let now = Utc::now();
        let entries: Vec<GlEntry> = validated
            .lines
            .into_iter()
            .map(|line| GlEntry {
                id: LedgerEntryId::new(),
                transaction_id,
                sequence: 0,
                account_id: line.account_id,
                debit: line.debit,
                credit: line.credit,
                transaction_date: request.transaction_date,
                fiscal_period: validated.period,
                module_source: module_source.clone(),
                reference_type: request.reference_type.clone(),
                description: line.description.or_else(|| request.description.clone()),
                approval_status: request.approval_status,
                created_by: request.created_by.clone(),
                created_at: now,
                reversal_of,
            })
            .collect();

        let committed = self
            .entries
            .append(transaction_id, entries)
            .inspect_err(|err| {
                warn!(
                    target: POSTING_TARGET,
                    transaction_id = %transaction_id,
                    module_source = %module_source,
                    code = err.error_code(),
                    error = %err,
                    "Append rejected"
                );
            })?;

        info!(
            target: POSTING_TARGET,
            transaction_id = %transaction_id,
            module_source = %module_source,
            period = %validated.period,
            entries = committed.len(),
            amount = %validated.totals.debit,
            "Transaction posted"
        );

        Ok(PostingReceipt {
            transaction_id,
            entry_ids: committed.iter().map(|e| e.id).collect(),
            period: validated.period,
            totals: validated.totals,
        })
    }
}

fn period_info(period: &FiscalPeriod) -> PeriodInfo {
    PeriodInfo {
        key: period.key,
        start_date: period.start_date,
        end_date: period.end_date,
        is_open: period.is_open(),
    }
}
