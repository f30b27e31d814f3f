//! Property-based tests for the posting service.
//!
//! - Every accepted transaction leaves the whole ledger balanced
//! - A rejected transaction leaves no entries behind
//! - Reversing every transaction nets every account to zero
//! - Amounts near the decimal limit are refused whole, never half-posted

use std::sync::Arc;

use chrono::NaiveDate;
use proptest::prelude::*;
use rust_decimal::Decimal;

use super::error::LedgerError;
use super::gate::WriteGate;
use super::service::PostingService;
use super::store::EntryStore;
use super::types::{PostingLine, PostingRequest, ReversalRequest};
use crate::accounts::{AccountStore, AccountType, NewAccount};
use crate::fiscal::PeriodManager;

const CODES: [&str; 4] = ["1000", "2000", "4000", "5000"];

/// Strategy to generate positive decimal amounts (0.01 to 10,000.00).
fn positive_amount() -> impl Strategy<Value = Decimal> {
    (1i64..1_000_000i64).prop_map(|cents| Decimal::new(cents, 2))
}

/// Strategy for amounts between a quarter of `Decimal::MAX` and the limit.
fn huge_amount() -> impl Strategy<Value = Decimal> {
    let floor = (Decimal::MAX / Decimal::from(4)).trunc();
    let step = ((Decimal::MAX - floor) / Decimal::from(1_000)).trunc();
    (0u32..=1_000).prop_map(move |n| floor + step * Decimal::from(n))
}

/// Debit lines on random accounts, the account of the single credit line,
/// and an optional skew that unbalances the credit.
type Candidate = (Vec<(usize, Decimal)>, usize, Option<Decimal>);

fn candidate() -> impl Strategy<Value = Candidate> {
    (
        prop::collection::vec((0..CODES.len(), positive_amount()), 1..5),
        0..CODES.len(),
        proptest::option::of(positive_amount()),
    )
}

fn setup() -> (PostingService, Arc<EntryStore>) {
    let accounts = Arc::new(AccountStore::new());
    let entries = Arc::new(EntryStore::new());
    let periods = Arc::new(PeriodManager::new());
    periods.open_fiscal_year(2024, 1).unwrap();

    let types = [
        AccountType::Asset,
        AccountType::Liability,
        AccountType::Revenue,
        AccountType::Expense,
    ];
    for (code, account_type) in CODES.iter().zip(types) {
        accounts
            .create_account(NewAccount::new(*code, *code, account_type))
            .unwrap();
    }

    let service = PostingService::new(accounts, Arc::clone(&entries), periods, WriteGate::new());
    (service, entries)
}

fn request((debits, credit_at, skew): &Candidate) -> PostingRequest {
    let total: Decimal = debits.iter().map(|(_, amount)| *amount).sum();
    let mut lines: Vec<PostingLine> = debits
        .iter()
        .map(|(at, amount)| PostingLine::debit(CODES[*at], *amount))
        .collect();
    lines.push(PostingLine::credit(CODES[*credit_at], total + skew.unwrap_or_default()));

    PostingRequest::new(
        "journal",
        "manual",
        NaiveDate::from_ymd_opt(2024, 6, 15).unwrap(),
        lines,
    )
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Accepted postings keep the ledger balanced; rejected ones leave
    /// nothing behind.
    #[test]
    fn prop_ledger_stays_balanced(candidates in prop::collection::vec(candidate(), 1..20)) {
        let (service, entries) = setup();
        let mut accepted = 0usize;

        for candidate in &candidates {
            let before = entries.len();
            match service.post(request(candidate)) {
                Ok(receipt) => {
                    prop_assert!(candidate.2.is_none());
                    prop_assert_eq!(entries.len(), before + receipt.entry_ids.len());
                    accepted += 1;
                }
                Err(_) => {
                    prop_assert!(candidate.2.is_some());
                    prop_assert_eq!(entries.len(), before);
                }
            }
        }

        let (debits, credits, transactions) = entries.read(|log| {
            let debits: Decimal = log.iter().map(|e| e.debit).sum();
            let credits: Decimal = log.iter().map(|e| e.credit).sum();
            (debits, credits, log.transaction_count())
        });
        prop_assert_eq!(debits, credits);
        prop_assert_eq!(transactions, accepted);
    }

    /// Reversing every transaction brings every account back to zero.
    #[test]
    fn prop_reversal_nets_to_zero(candidates in prop::collection::vec(candidate(), 1..10)) {
        let (service, entries) = setup();
        let reversal = ReversalRequest {
            reversal_date: NaiveDate::from_ymd_opt(2024, 7, 1).unwrap(),
            reason: None,
            created_by: None,
        };

        for candidate in &candidates {
            let balanced = (candidate.0.clone(), candidate.1, None);
            let receipt = service.post(request(&balanced)).unwrap();
            service.reverse(receipt.transaction_id, &reversal).unwrap();
        }

        entries.read(|log| {
            for totals in log.all_totals().values() {
                prop_assert_eq!(totals.debit_total, totals.credit_total);
            }
            Ok(())
        })?;
    }

    /// Transfers near the decimal limit either commit whole or fail with
    /// `AmountOverflow` and leave the log as it was.
    #[test]
    fn prop_huge_transfers_commit_whole_or_not_at_all(
        amounts in prop::collection::vec(huge_amount(), 1..8)
    ) {
        let (service, entries) = setup();
        let mut accepted = 0usize;

        for amount in amounts {
            let before = entries.len();
            let result = service.post(request(&(vec![(0, amount)], 2, None)));
            match result {
                Ok(_) => {
                    prop_assert_eq!(entries.len(), before + 2);
                    accepted += 1;
                }
                Err(LedgerError::AmountOverflow) => prop_assert_eq!(entries.len(), before),
                Err(other) => prop_assert!(false, "unexpected error: {other}"),
            }
        }

        entries.read(|log| {
            let ledger = log.ledger_totals();
            prop_assert_eq!(ledger.debit_total, ledger.credit_total);
            prop_assert_eq!(ledger.entry_count, u64::try_from(accepted * 2).unwrap());
            prop_assert_eq!(log.transaction_count(), accepted);
            Ok(())
        })?;
    }
}
