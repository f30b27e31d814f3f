//! Fiscal period types.

use std::fmt;

use chrono::{DateTime, Datelike, Months, NaiveDate, Utc};
use ledgerline_shared::types::FiscalPeriodId;
use serde::{Deserialize, Serialize};

use super::error::FiscalError;

/// Identifies a fiscal period: the fiscal year plus the period's index
/// within it (1-based).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PeriodKey {
    /// Fiscal year.
    pub year: i32,
    /// Period index within the year, starting at 1.
    pub period_index: u32,
}

impl PeriodKey {
    /// Creates a new period key.
    #[must_use]
    pub const fn new(year: i32, period_index: u32) -> Self {
        Self { year, period_index }
    }
}

impl fmt::Display for PeriodKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-P{:02}", self.year, self.period_index)
    }
}

/// Status of a fiscal period. `Open -> Closed` is the only transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PeriodStatus {
    /// Period accepts postings.
    Open,
    /// Period is closed, no new postings allowed.
    Closed,
}

/// A fiscal period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FiscalPeriod {
    /// Unique identifier.
    pub id: FiscalPeriodId,
    /// Year and index of the period.
    pub key: PeriodKey,
    /// Period name (e.g., "March 2024").
    pub name: String,
    /// First day of the period.
    pub start_date: NaiveDate,
    /// Last day of the period (inclusive).
    pub end_date: NaiveDate,
    /// Current status.
    pub status: PeriodStatus,
    /// When the period was closed.
    pub closed_at: Option<DateTime<Utc>>,
}

impl FiscalPeriod {
    /// Returns true if transactions can be posted to this period.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.status == PeriodStatus::Open
    }

    /// Returns true if the given date falls within this period.
    #[must_use]
    pub fn contains_date(&self, date: NaiveDate) -> bool {
        date >= self.start_date && date <= self.end_date
    }

    /// Returns true if the two periods share at least one day.
    #[must_use]
    pub fn overlaps(&self, start: NaiveDate, end: NaiveDate) -> bool {
        start <= self.end_date && end >= self.start_date
    }
}

/// Input for opening a fiscal period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewPeriod {
    /// Year and index of the period.
    pub key: PeriodKey,
    /// Period name.
    pub name: String,
    /// First day of the period.
    pub start_date: NaiveDate,
    /// Last day of the period (inclusive).
    pub end_date: NaiveDate,
}

/// Generates twelve monthly periods for a fiscal year starting on the first
/// day of `start_month` in `year`.
///
/// # Errors
///
/// Returns `InvalidStartMonth` if `start_month` is not in `1..=12`.
pub fn generate_monthly_periods(
    year: i32,
    start_month: u32,
) -> Result<Vec<NewPeriod>, FiscalError> {
    let first_day = NaiveDate::from_ymd_opt(year, start_month, 1)
        .ok_or(FiscalError::InvalidStartMonth(start_month))?;

    let mut periods = Vec::with_capacity(12);
    for index in 0..12u32 {
        let start = first_day
            .checked_add_months(Months::new(index))
            .ok_or(FiscalError::InvalidStartMonth(start_month))?;
        let end = last_day_of_month(start).ok_or(FiscalError::InvalidStartMonth(start_month))?;

        periods.push(NewPeriod {
            key: PeriodKey::new(year, index + 1),
            name: format!("{} {}", month_name(start.month()), start.year()),
            start_date: start,
            end_date: end,
        });
    }

    Ok(periods)
}

/// Returns the last day of the month `date` falls in.
fn last_day_of_month(date: NaiveDate) -> Option<NaiveDate> {
    date.with_day(1)?
        .checked_add_months(Months::new(1))?
        .pred_opt()
}

fn month_name(month: u32) -> &'static str {
    match month {
        1 => "January",
        2 => "February",
        3 => "March",
        4 => "April",
        5 => "May",
        6 => "June",
        7 => "July",
        8 => "August",
        9 => "September",
        10 => "October",
        11 => "November",
        12 => "December",
        _ => "Unknown",
    }
}
