//! Fiscal calendar: periods and their open/closed lifecycle.

pub mod error;
pub mod manager;
pub mod period;

pub use error::FiscalError;
pub use manager::PeriodManager;
pub use period::{FiscalPeriod, NewPeriod, PeriodKey, PeriodStatus, generate_monthly_periods};
