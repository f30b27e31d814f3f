//! Chart of Accounts domain types.

use chrono::{DateTime, Utc};
use ledgerline_shared::types::AccountId;
use serde::{Deserialize, Serialize};

use crate::ledger::balance::NormalBalance;

/// Account classification driving report grouping and sign conventions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountType {
    /// Resources owned.
    Asset,
    /// Obligations owed.
    Liability,
    /// Owners' residual interest.
    Equity,
    /// Income earned.
    Revenue,
    /// Costs incurred.
    Expense,
}

impl AccountType {
    /// Every account type, in reporting order.
    pub const ALL: [Self; 5] = [
        Self::Asset,
        Self::Liability,
        Self::Equity,
        Self::Revenue,
        Self::Expense,
    ];

    /// Side on which this account type's balance grows.
    ///
    /// Asset/Expense are debit-normal; Liability/Equity/Revenue are credit-normal.
    #[must_use]
    pub const fn normal_balance(self) -> NormalBalance {
        match self {
            Self::Asset | Self::Expense => NormalBalance::Debit,
            Self::Liability | Self::Equity | Self::Revenue => NormalBalance::Credit,
        }
    }

    /// Lowercase name as used on the wire.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Asset => "asset",
            Self::Liability => "liability",
            Self::Equity => "equity",
            Self::Revenue => "revenue",
            Self::Expense => "expense",
        }
    }
}

impl std::fmt::Display for AccountType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A Chart of Accounts node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// Stable identifier, never reused.
    pub id: AccountId,
    /// Human-assigned code, unique across the chart (e.g. "1000").
    pub code: String,
    /// Display name.
    pub name: String,
    /// Account classification.
    pub account_type: AccountType,
    /// Free classification tag.
    pub category: Option<String>,
    /// IFRS classification tag.
    pub ifrs_category: Option<String>,
    /// Parent account, `None` for roots.
    pub parent_id: Option<AccountId>,
    /// Depth in the hierarchy; roots are level 0.
    pub level: u32,
    /// Inactive accounts reject new postings but stay queryable.
    pub is_active: bool,
    /// Optimistic concurrency counter, bumped on every mutation.
    pub version: i64,
    /// When the account was created.
    pub created_at: DateTime<Utc>,
    /// When the account was last mutated.
    pub updated_at: DateTime<Utc>,
}

impl Account {
    /// Returns true if this account has no parent.
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }

    pub(crate) fn touch(&mut self, now: DateTime<Utc>) {
        self.version += 1;
        self.updated_at = now;
    }
}

/// Input for creating an account.
#[derive(Debug, Clone)]
pub struct NewAccount {
    /// Account code (must be unique).
    pub code: String,
    /// Account name.
    pub name: String,
    /// Account type.
    pub account_type: AccountType,
    /// Free classification tag.
    pub category: Option<String>,
    /// IFRS classification tag.
    pub ifrs_category: Option<String>,
    /// Parent account ID for hierarchical structure.
    pub parent_id: Option<AccountId>,
}

impl NewAccount {
    /// Creates a root account input with no classification tags.
    #[must_use]
    pub fn new(code: impl Into<String>, name: impl Into<String>, account_type: AccountType) -> Self {
        Self {
            code: code.into(),
            name: name.into(),
            account_type,
            category: None,
            ifrs_category: None,
            parent_id: None,
        }
    }

    /// Places the account under `parent_id`.
    #[must_use]
    pub fn with_parent(mut self, parent_id: AccountId) -> Self {
        self.parent_id = Some(parent_id);
        self
    }

    /// Sets the classification tags.
    #[must_use]
    pub fn with_categories(
        mut self,
        category: impl Into<String>,
        ifrs_category: impl Into<String>,
    ) -> Self {
        self.category = Some(category.into());
        self.ifrs_category = Some(ifrs_category.into());
        self
    }
}

/// Partial update for an account. `None` leaves a field untouched.
#[derive(Debug, Clone, Default)]
pub struct AccountPatch {
    /// New account code.
    pub code: Option<String>,
    /// New account name.
    pub name: Option<String>,
    /// New account type (only if no ledger entries reference the account).
    pub account_type: Option<AccountType>,
    /// New category tag.
    pub category: Option<Option<String>>,
    /// New IFRS category tag.
    pub ifrs_category: Option<Option<String>>,
    /// New parent (`Some(None)` makes the account a root).
    pub parent_id: Option<Option<AccountId>>,
}

/// Filter options for listing accounts.
#[derive(Debug, Clone, Default)]
pub struct AccountFilter {
    /// Filter by account type.
    pub account_type: Option<AccountType>,
    /// Filter by active status.
    pub is_active: Option<bool>,
    /// Filter by parent ID (`Some(None)` = root accounts only).
    pub parent_id: Option<Option<AccountId>>,
}

impl AccountFilter {
    pub(crate) fn matches(&self, account: &Account) -> bool {
        self.account_type.is_none_or(|t| t == account.account_type)
            && self.is_active.is_none_or(|a| a == account.is_active)
            && self.parent_id.is_none_or(|p| p == account.parent_id)
    }
}
