//! Concurrent posting stress tests.
//!
//! These tests verify that:
//! - N concurrent balanced postings yield exactly N transactions and a
//!   balanced trial balance
//! - Concurrent writers never leave a half-appended transaction visible
//! - A period closed while posters race is never posted into afterwards
//! - Running balances are the same whatever order the writers ran in

#![allow(clippy::cast_possible_truncation)]

use std::sync::Arc;

use chrono::NaiveDate;
use futures::future::join_all;
use ledgerline_core::GeneralLedger;
use ledgerline_core::accounts::{AccountType, NewAccount};
use ledgerline_core::fiscal::PeriodKey;
use ledgerline_core::ledger::{LedgerError, PostingLine, PostingRequest};
use ledgerline_core::reports::DateRange;
use ledgerline_shared::LedgerConfig;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tokio::sync::Barrier;

const NUM_TRANSACTIONS: usize = 100;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn setup() -> Arc<GeneralLedger> {
    let gl = GeneralLedger::new(LedgerConfig::default());
    gl.open_fiscal_year(2024).unwrap();
    for (code, name, account_type) in [
        ("1000", "Cash", AccountType::Asset),
        ("4000", "Sales", AccountType::Revenue),
        ("5000", "Salaries", AccountType::Expense),
    ] {
        gl.create_account(NewAccount::new(code, name, account_type))
            .unwrap();
    }
    Arc::new(gl)
}

/// Alternates between an invoicing sale and a payroll run.
fn request(i: usize) -> PostingRequest {
    let amount = Decimal::from(i as u64 + 1);
    let on = date(2024, 3, (i % 28) as u32 + 1);
    if i % 2 == 0 {
        PostingRequest::new(
            "invoicing",
            "invoice",
            on,
            vec![
                PostingLine::debit("1000", amount),
                PostingLine::credit("4000", amount),
            ],
        )
    } else {
        PostingRequest::new(
            "payroll",
            "payroll_run",
            on,
            vec![
                PostingLine::debit("5000", amount),
                PostingLine::credit("1000", amount),
            ],
        )
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_100_transactions_stay_balanced() {
    let gl = setup();
    let barrier = Arc::new(Barrier::new(NUM_TRANSACTIONS));

    let handles: Vec<_> = (0..NUM_TRANSACTIONS)
        .map(|i| {
            let gl = Arc::clone(&gl);
            let barrier = Arc::clone(&barrier);
            tokio::spawn(async move {
                barrier.wait().await;
                tokio::task::spawn_blocking(move || gl.post(request(i)))
                    .await
                    .unwrap()
            })
        })
        .collect();

    let results = join_all(handles).await;
    let accepted = results
        .into_iter()
        .map(|r| r.unwrap())
        .filter(Result::is_ok)
        .count();
    assert_eq!(accepted, NUM_TRANSACTIONS);

    let report = gl.trial_balance(&DateRange::all()).unwrap();
    assert!(report.totals.is_balanced);
    let expected: Decimal = (1..=NUM_TRANSACTIONS as u64).map(Decimal::from).sum();
    assert_eq!(report.totals.total_debits, expected);

    let integrity = gl.assert_integrity().unwrap();
    assert_eq!(integrity.transaction_count, NUM_TRANSACTIONS);
    assert_eq!(integrity.entry_count, NUM_TRANSACTIONS * 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_readers_never_see_half_a_transaction() {
    let gl = setup();

    let writers: Vec<_> = (0..NUM_TRANSACTIONS)
        .map(|i| {
            let gl = Arc::clone(&gl);
            tokio::task::spawn_blocking(move || gl.post(request(i)))
        })
        .collect();
    let readers: Vec<_> = (0..20)
        .map(|_| {
            let gl = Arc::clone(&gl);
            tokio::task::spawn_blocking(move || {
                let report = gl.trial_balance(&DateRange::all()).unwrap();
                let entries = gl.entries().read(|log| log.len());
                (report.totals.is_balanced, entries % 2)
            })
        })
        .collect();

    for result in join_all(writers).await {
        result.unwrap().unwrap();
    }
    for result in join_all(readers).await {
        let (balanced, odd) = result.unwrap();
        assert!(balanced);
        assert_eq!(odd, 0);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_close_races_with_posters() {
    let gl = setup();
    let march = PeriodKey::new(2024, 3);

    let posters: Vec<_> = (0..NUM_TRANSACTIONS)
        .map(|i| {
            let gl = Arc::clone(&gl);
            tokio::task::spawn_blocking(move || gl.post(request(i)))
        })
        .collect();
    let closer = {
        let gl = Arc::clone(&gl);
        tokio::task::spawn_blocking(move || gl.close_period(march))
    };

    let outcomes: Vec<Result<_, LedgerError>> = join_all(posters)
        .await
        .into_iter()
        .map(|r| r.unwrap())
        .collect();
    let closed = closer.await.unwrap().unwrap();
    let closed_at = closed.closed_at.unwrap();

    for outcome in &outcomes {
        match outcome {
            Ok(receipt) => {
                let entries = gl.query_by_transaction(receipt.transaction_id);
                assert!(entries.iter().all(|e| e.created_at <= closed_at));
            }
            Err(err) => assert_eq!(err, &LedgerError::PeriodClosed(march)),
        }
    }

    let accepted = outcomes.iter().filter(|o| o.is_ok()).count();
    let report = gl.trial_balance_for_period(march).unwrap();
    assert!(report.totals.is_balanced);
    assert_eq!(gl.entries().read(|log| log.transaction_count()), accepted);
    assert_eq!(
        gl.post(request(0)),
        Err(LedgerError::PeriodClosed(march))
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_running_balance_is_order_independent() {
    let gl = setup();

    let handles: Vec<_> = (0..NUM_TRANSACTIONS)
        .map(|i| {
            let gl = Arc::clone(&gl);
            tokio::task::spawn_blocking(move || gl.post(request(i)))
        })
        .collect();
    for result in join_all(handles).await {
        result.unwrap().unwrap();
    }

    let cash = gl.account_by_code("1000").unwrap();
    let view = gl.running_balance(cash.id, date(2024, 12, 31)).unwrap();

    // Sales add (i + 1) for even i, payroll subtracts (i + 1) for odd i.
    let expected: Decimal = (0..NUM_TRANSACTIONS)
        .map(|i| {
            let amount = Decimal::from(i as u64 + 1);
            if i % 2 == 0 { amount } else { -amount }
        })
        .sum();
    assert_eq!(view.balance, expected);
    assert_eq!(view.balance, dec!(-50));
    assert_eq!(view.lines.len(), NUM_TRANSACTIONS);

    let again = gl.running_balance(cash.id, date(2024, 12, 31)).unwrap();
    assert_eq!(again, view);
}
