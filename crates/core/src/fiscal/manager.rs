//! Period Manager.
//!
//! Owns the fiscal calendar. Periods are keyed by `PeriodKey`, never
//! overlap, and move from `Open` to `Closed` exactly once.

use std::collections::BTreeMap;

use chrono::{NaiveDate, Utc};
use ledgerline_shared::types::FiscalPeriodId;
use parking_lot::RwLock;
use tracing::{info, warn};

use super::error::FiscalError;
use super::period::{FiscalPeriod, NewPeriod, PeriodKey, PeriodStatus, generate_monthly_periods};

/// Period Manager.
#[derive(Debug, Default)]
pub struct PeriodManager {
    periods: RwLock<BTreeMap<PeriodKey, FiscalPeriod>>,
}

impl PeriodManager {
    /// Creates an empty fiscal calendar.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens a new period.
    ///
    /// # Errors
    ///
    /// - `InvalidDateRange` if start is after end
    /// - `DuplicatePeriod` if the key is taken
    /// - `OverlappingPeriod` if the dates collide with another period
    pub(crate) fn open_period(&self, input: NewPeriod) -> Result<FiscalPeriod, FiscalError> {
        let mut periods = self.periods.write();
        check_new_period(&periods, &input)?;

        let period = into_period(input);
        periods.insert(period.key, period.clone());
        info!(
            period = %period.key,
            start_date = %period.start_date,
            end_date = %period.end_date,
            "Fiscal period opened"
        );
        Ok(period)
    }

    /// Opens the twelve monthly periods of a fiscal year. Either every
    /// period is opened or none is.
    ///
    /// # Errors
    ///
    /// - `InvalidStartMonth` if `start_month` is not 1-12
    /// - any error `open_period` would return for one of the months
    pub(crate) fn open_fiscal_year(
        &self,
        year: i32,
        start_month: u32,
    ) -> Result<Vec<FiscalPeriod>, FiscalError> {
        let inputs = generate_monthly_periods(year, start_month)?;

        let mut periods = self.periods.write();
        for input in &inputs {
            check_new_period(&periods, input)?;
        }

        let opened: Vec<FiscalPeriod> = inputs.into_iter().map(into_period).collect();
        for period in &opened {
            periods.insert(period.key, period.clone());
        }
        info!(year, start_month, periods = opened.len(), "Fiscal year opened");
        Ok(opened)
    }

    /// Closes a period without any pre-close check.
    ///
    /// # Errors
    ///
    /// - `PeriodNotFound` / `AlreadyClosed`
    pub(crate) fn close(&self, key: PeriodKey) -> Result<FiscalPeriod, FiscalError> {
        self.close_with(key, |_| Ok(()))
    }

    /// Closes a period once `check` accepts it.
    ///
    /// `check` runs while the calendar is write-locked, so no other close
    /// or open can interleave with it.
    ///
    /// # Errors
    ///
    /// - `PeriodNotFound` / `AlreadyClosed`
    /// - whatever `check` returns
    pub(crate) fn close_with<C>(&self, key: PeriodKey, check: C) -> Result<FiscalPeriod, FiscalError>
    where
        C: FnOnce(&FiscalPeriod) -> Result<(), FiscalError>,
    {
        let mut periods = self.periods.write();
        let period = periods.get_mut(&key).ok_or(FiscalError::PeriodNotFound(key))?;
        if period.status == PeriodStatus::Closed {
            return Err(FiscalError::AlreadyClosed(key));
        }

        if let Err(err) = check(period) {
            warn!(period = %key, error = %err, "Fiscal period close rejected");
            return Err(err);
        }

        period.status = PeriodStatus::Closed;
        period.closed_at = Some(Utc::now());
        info!(period = %key, "Fiscal period closed");
        Ok(period.clone())
    }

    /// Looks up a period by key.
    ///
    /// # Errors
    ///
    /// Returns `PeriodNotFound` if the key is unknown.
    pub fn get(&self, key: PeriodKey) -> Result<FiscalPeriod, FiscalError> {
        self.periods
            .read()
            .get(&key)
            .cloned()
            .ok_or(FiscalError::PeriodNotFound(key))
    }

    /// Finds the period whose date range contains `date`.
    #[must_use]
    pub fn resolve_date(&self, date: NaiveDate) -> Option<FiscalPeriod> {
        self.periods
            .read()
            .values()
            .find(|p| p.contains_date(date))
            .cloned()
    }

    /// All periods ordered by key.
    #[must_use]
    pub fn list(&self) -> Vec<FiscalPeriod> {
        self.periods.read().values().cloned().collect()
    }
}

fn check_new_period(
    periods: &BTreeMap<PeriodKey, FiscalPeriod>,
    input: &NewPeriod,
) -> Result<(), FiscalError> {
    if input.start_date > input.end_date {
        return Err(FiscalError::InvalidDateRange {
            start: input.start_date,
            end: input.end_date,
        });
    }
    if periods.contains_key(&input.key) {
        return Err(FiscalError::DuplicatePeriod(input.key));
    }
    if let Some(existing) = periods
        .values()
        .find(|p| p.overlaps(input.start_date, input.end_date))
    {
        return Err(FiscalError::OverlappingPeriod {
            requested: input.key,
            existing: existing.key,
        });
    }
    Ok(())
}

fn into_period(input: NewPeriod) -> FiscalPeriod {
    FiscalPeriod {
        id: FiscalPeriodId::new(),
        key: input.key,
        name: input.name,
        start_date: input.start_date,
        end_date: input.end_date,
        status: PeriodStatus::Open,
        closed_at: None,
    }
}
