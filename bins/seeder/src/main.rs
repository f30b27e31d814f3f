//! Development seeder for Ledgerline.
//!
//! Builds an in-memory ledger, seeds a chart of accounts and one fiscal
//! year, posts demo transactions from several source modules at once, and
//! prints the resulting reports as JSON on stdout. Logs go to stderr.
//!
//! Usage: cargo run --bin seeder

use std::sync::Arc;

use anyhow::Context;
use chrono::{Datelike, NaiveDate};
use futures::future::join_all;
use ledgerline_core::GeneralLedger;
use ledgerline_core::accounts::{AccountType, NewAccount};
use ledgerline_core::fiscal::FiscalPeriod;
use ledgerline_core::ledger::{PostingLine, PostingRequest, ReversalRequest};
use ledgerline_core::reports::{
    AccountSummaryLine, DateRange, IntegrityReport, RunningBalanceView, TrialBalanceReport,
};
use ledgerline_shared::{AppConfig, LoggingConfig};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Serialize;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Fiscal year the demo data is booked in.
const SEED_YEAR: i32 = 2024;

/// Months of activity posted by the source modules.
const ACTIVE_MONTHS: usize = 3;

/// (code, name, type, parent code)
const CHART: [(&str, &str, AccountType, Option<&str>); 10] = [
    ("1000", "Assets", AccountType::Asset, None),
    ("1100", "Cash", AccountType::Asset, Some("1000")),
    ("1200", "Accounts Receivable", AccountType::Asset, Some("1000")),
    ("2000", "Liabilities", AccountType::Liability, None),
    ("2100", "Accrued Salaries", AccountType::Liability, Some("2000")),
    ("3000", "Owner's Equity", AccountType::Equity, None),
    ("4000", "Revenue", AccountType::Revenue, None),
    ("4100", "Product Sales", AccountType::Revenue, Some("4000")),
    ("5000", "Expenses", AccountType::Expense, None),
    ("5100", "Salaries", AccountType::Expense, Some("5000")),
];

/// Everything printed at the end of a run.
#[derive(Debug, Serialize)]
struct SeedReport {
    periods: Vec<FiscalPeriod>,
    trial_balance: TrialBalanceReport,
    account_summary: Vec<AccountSummaryLine>,
    cash: RunningBalanceView,
    integrity: IntegrityReport,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    let config = AppConfig::load().context("Failed to load configuration")?;
    init_tracing(&config.logging);

    let ledger = Arc::new(GeneralLedger::new(config.ledger));

    seed_chart(&ledger)?;
    let periods = ledger.open_fiscal_year(SEED_YEAR)?;
    info!(year = SEED_YEAR, periods = periods.len(), "Fiscal year seeded");

    let first = periods.first().context("Fiscal year has no periods")?;
    post_opening_balance(&ledger, first)?;

    let active: Vec<FiscalPeriod> = periods.iter().take(ACTIVE_MONTHS).cloned().collect();
    post_module_activity(&ledger, &active).await?;
    correct_duplicate_invoice(&ledger, first)?;
    reject_unbalanced_entry(&ledger, first)?;

    ledger.close_period(first.key)?;

    let last_active = active.last().context("No active periods")?;
    let report = SeedReport {
        periods: ledger.periods().list(),
        trial_balance: ledger.trial_balance(&DateRange::all())?,
        account_summary: ledger.account_summary(&DateRange::all())?,
        cash: ledger.running_balance(
            ledger.account_by_code("1100")?.id,
            last_active.end_date,
        )?,
        integrity: ledger.assert_integrity()?,
    };

    println!("{}", serde_json::to_string_pretty(&report)?);
    info!(
        total_debits = %report.trial_balance.totals.total_debits,
        is_balanced = report.trial_balance.totals.is_balanced,
        "Seeding complete"
    );
    Ok(())
}

fn init_tracing(logging: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.filter));
    let registry = tracing_subscriber::registry().with(filter);

    if logging.json {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

/// Creates the demo chart. Parents always precede their children in `CHART`.
fn seed_chart(ledger: &GeneralLedger) -> anyhow::Result<()> {
    for (code, name, account_type, parent) in CHART {
        let mut input = NewAccount::new(code, name, account_type);
        if let Some(parent_code) = parent {
            input = input.with_parent(ledger.account_by_code(parent_code)?.id);
        }
        ledger.create_account(input)?;
    }
    info!(accounts = CHART.len(), "Chart of accounts seeded");
    Ok(())
}

fn mid_month(period: &FiscalPeriod) -> anyhow::Result<NaiveDate> {
    period
        .start_date
        .with_day(15)
        .with_context(|| format!("Period {} has no 15th", period.key))
}

fn post_opening_balance(ledger: &GeneralLedger, period: &FiscalPeriod) -> anyhow::Result<()> {
    let mut request = PostingRequest::new(
        "general_ledger",
        "opening_balance",
        period.start_date,
        vec![
            PostingLine::debit("1100", dec!(50_000)),
            PostingLine::credit("3000", dec!(50_000)),
        ],
    );
    request.description = Some("Owner capital contribution".to_string());
    ledger.post(request)?;
    Ok(())
}

/// Invoicing and payroll post the same months at the same time.
async fn post_module_activity(
    ledger: &Arc<GeneralLedger>,
    periods: &[FiscalPeriod],
) -> anyhow::Result<()> {
    let mut handles = Vec::new();
    for (month, period) in (1u32..).zip(periods) {
        let on = mid_month(period)?;
        let step = Decimal::from(month) * dec!(250);

        let invoice = PostingRequest::new(
            "invoicing",
            "invoice",
            on,
            vec![
                PostingLine::debit("1200", dec!(12_500) + step),
                PostingLine::credit("4100", dec!(12_500) + step),
            ],
        );
        let payroll = PostingRequest::new(
            "payroll",
            "payroll_run",
            period.end_date,
            vec![
                PostingLine::debit("5100", dec!(8_000) + step),
                PostingLine::credit("1100", dec!(8_000) + step),
            ],
        );

        for request in [invoice, payroll] {
            let ledger = Arc::clone(ledger);
            handles.push(tokio::task::spawn_blocking(move || ledger.post(request)));
        }
    }

    let results = join_all(handles).await;
    for result in results {
        let receipt = result??;
        info!(
            transaction_id = %receipt.transaction_id,
            period = %receipt.period,
            "Module posting committed"
        );
    }
    Ok(())
}

/// Posts an invoice twice, then reverses the duplicate.
fn correct_duplicate_invoice(ledger: &GeneralLedger, period: &FiscalPeriod) -> anyhow::Result<()> {
    let on = mid_month(period)?;
    let duplicate = ledger.post(PostingRequest::new(
        "invoicing",
        "invoice",
        on,
        vec![
            PostingLine::debit("1200", dec!(12_750)),
            PostingLine::credit("4100", dec!(12_750)),
        ],
    ))?;

    let reversal = ledger.reverse(
        duplicate.transaction_id,
        &ReversalRequest {
            reversal_date: period.end_date,
            reason: Some("Invoice entered twice".to_string()),
            created_by: Some("seeder".to_string()),
        },
    )?;
    info!(
        original = %duplicate.transaction_id,
        reversal = %reversal.transaction_id,
        "Duplicate invoice reversed"
    );
    Ok(())
}

/// An unbalanced posting must be refused and leave nothing behind.
fn reject_unbalanced_entry(ledger: &GeneralLedger, period: &FiscalPeriod) -> anyhow::Result<()> {
    let before = ledger.entries().len();
    let result = ledger.post(PostingRequest::new(
        "procurement",
        "purchase_order",
        mid_month(period)?,
        vec![
            PostingLine::debit("5100", dec!(100)),
            PostingLine::credit("1100", dec!(90)),
        ],
    ));

    match result {
        Err(err) => {
            warn!(code = err.error_code(), "Unbalanced demo posting refused");
            anyhow::ensure!(
                ledger.entries().len() == before,
                "Rejected posting left entries behind"
            );
            Ok(())
        }
        Ok(receipt) => anyhow::bail!(
            "Unbalanced posting {} was accepted",
            receipt.transaction_id
        ),
    }
}
