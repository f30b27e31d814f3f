//! Account balance calculations.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// The side on which an account type normally carries its balance.
///
/// - Asset/Expense: balance += debit - credit (debit-normal)
/// - Liability/Equity/Revenue: balance += credit - debit (credit-normal)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NormalBalance {
    /// Debit-normal accounts (Asset, Expense).
    Debit,
    /// Credit-normal accounts (Liability, Equity, Revenue).
    Credit,
}

impl NormalBalance {
    /// Calculates the balance change for an entry.
    #[must_use]
    pub fn calculate_balance_change(self, debit: Decimal, credit: Decimal) -> Decimal {
        match self {
            Self::Debit => debit - credit,
            Self::Credit => credit - debit,
        }
    }
}

/// Debit/credit totals for one account.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountTotals {
    /// Total debit amount.
    pub debit_total: Decimal,
    /// Total credit amount.
    pub credit_total: Decimal,
    /// Number of entries folded in.
    pub entry_count: u64,
}

impl AccountTotals {
    /// Folds one entry's amounts into the totals.
    ///
    /// Returns `None` if either column would leave the `Decimal` range.
    #[must_use]
    pub fn checked_add(self, debit: Decimal, credit: Decimal) -> Option<Self> {
        Some(Self {
            debit_total: self.debit_total.checked_add(debit)?,
            credit_total: self.credit_total.checked_add(credit)?,
            entry_count: self.entry_count + 1,
        })
    }

    /// Net balance on the account's normal side.
    #[must_use]
    pub fn net(&self, normal: NormalBalance) -> Decimal {
        normal.calculate_balance_change(self.debit_total, self.credit_total)
    }
}

/// Running balance information for a ledger entry.
///
/// - `position`: 1-based, increases by one per entry
/// - `previous_balance`: balance before this entry
/// - `current_balance`: balance after this entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunningBalance {
    /// Position of the entry in the account's history.
    pub position: u64,
    /// Balance before this entry.
    pub previous_balance: Decimal,
    /// Balance after this entry.
    pub current_balance: Decimal,
}

impl RunningBalance {
    /// Creates a running balance for the first entry on an account.
    #[must_use]
    pub fn first_entry(balance_change: Decimal) -> Self {
        Self {
            position: 1,
            previous_balance: Decimal::ZERO,
            current_balance: balance_change,
        }
    }

    /// Creates a running balance based on the previous entry.
    ///
    /// - current_balance[N] = previous_balance[N] + balance_change
    /// - previous_balance[N] = current_balance[N-1]
    ///
    /// Returns `None` if the new balance overflows.
    #[must_use]
    pub fn next_entry(previous: &Self, balance_change: Decimal) -> Option<Self> {
        Some(Self {
            position: previous.position + 1,
            previous_balance: previous.current_balance,
            current_balance: previous.current_balance.checked_add(balance_change)?,
        })
    }

    /// Continues from `previous`, or starts a new chain.
    #[must_use]
    pub fn after(previous: Option<&Self>, balance_change: Decimal) -> Option<Self> {
        match previous {
            Some(previous) => Self::next_entry(previous, balance_change),
            None => Some(Self::first_entry(balance_change)),
        }
    }
}
