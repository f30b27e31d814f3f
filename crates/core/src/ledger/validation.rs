//! Posting validation.
//!
//! The validator is a pure function of the proposed transaction and the
//! lookups it is handed. It never mutates anything, so the posting service
//! can run it under the write gate against the same state it appends to.

use chrono::NaiveDate;
use rust_decimal::Decimal;

use super::error::LedgerError;
use super::types::{
    AccountInfo, AccountRef, PeriodInfo, PostingLine, ProposedTransaction, ResolvedLine,
    TransactionTotals, ValidatedTransaction,
};
use crate::fiscal::PeriodKey;

/// Posting Validator.
pub struct PostingValidator;

impl PostingValidator {
    /// Validates a proposed transaction.
    ///
    /// Checks run in this order and the first failure wins:
    /// 1. at least one line
    /// 2. per line: amounts non-negative, not both sides, account exists,
    ///    account active
    /// 3. fiscal period exists (by explicit key, else by date), contains
    ///    the date, and is open
    /// 4. both column totals fit in a `Decimal`, and total debits equal
    ///    total credits, exactly
    ///
    /// # Arguments
    ///
    /// * `transaction` - The proposed transaction
    /// * `account_lookup` - Resolves an account by id or code
    /// * `period_by_key` - Resolves an explicitly requested period
    /// * `period_by_date` - Resolves the period containing a date
    ///
    /// # Errors
    ///
    /// Returns the first `LedgerError` encountered.
    pub fn validate<A, K, D>(
        transaction: ProposedTransaction,
        account_lookup: A,
        period_by_key: K,
        period_by_date: D,
    ) -> Result<ValidatedTransaction, LedgerError>
    where
        A: Fn(&AccountRef) -> Option<AccountInfo>,
        K: Fn(PeriodKey) -> Option<PeriodInfo>,
        D: Fn(NaiveDate) -> Option<PeriodInfo>,
    {
        if transaction.lines.is_empty() {
            return Err(LedgerError::EmptyTransaction);
        }

        let mut lines = Vec::with_capacity(transaction.lines.len());
        for (line, entry) in transaction.lines.into_iter().enumerate() {
            lines.push(Self::validate_line(line, entry, &account_lookup)?);
        }

        let period = Self::resolve_period(
            transaction.transaction_date,
            transaction.fiscal_period,
            &period_by_key,
            &period_by_date,
        )?;

        let totals = TransactionTotals::checked_of(&lines).ok_or(LedgerError::AmountOverflow)?;
        if !totals.is_balanced {
            return Err(LedgerError::Unbalanced {
                debit: totals.debit,
                credit: totals.credit,
            });
        }

        Ok(ValidatedTransaction {
            lines,
            period: period.key,
            totals,
        })
    }

    fn validate_line<A>(
        line: usize,
        entry: PostingLine,
        account_lookup: &A,
    ) -> Result<ResolvedLine, LedgerError>
    where
        A: Fn(&AccountRef) -> Option<AccountInfo>,
    {
        if entry.debit < Decimal::ZERO || entry.credit < Decimal::ZERO {
            return Err(LedgerError::NegativeAmount { line });
        }
        if !entry.debit.is_zero() && !entry.credit.is_zero() {
            return Err(LedgerError::BothSidesNonZero { line });
        }

        let Some(account) = account_lookup(&entry.account) else {
            return Err(LedgerError::UnknownAccount(entry.account));
        };
        if !account.is_active {
            return Err(LedgerError::InactiveAccount(account.id));
        }
        Ok(ResolvedLine {
            account_id: account.id,
            debit: entry.debit,
            credit: entry.credit,
            description: entry.description,
        })
    }

    fn resolve_period<K, D>(
        date: NaiveDate,
        requested: Option<PeriodKey>,
        period_by_key: &K,
        period_by_date: &D,
    ) -> Result<PeriodInfo, LedgerError>
    where
        K: Fn(PeriodKey) -> Option<PeriodInfo>,
        D: Fn(NaiveDate) -> Option<PeriodInfo>,
    {
        let period = match requested {
            Some(key) => {
                let period = period_by_key(key).ok_or(LedgerError::UnknownPeriod(key))?;
                if date < period.start_date || date > period.end_date {
                    return Err(LedgerError::DateOutsidePeriod { date, period: key });
                }
                period
            }
            None => period_by_date(date).ok_or(LedgerError::NoFiscalPeriod(date))?,
        };

        if !period.is_open {
            return Err(LedgerError::PeriodClosed(period.key));
        }
        Ok(period)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ledgerline_shared::types::AccountId;
    use rust_decimal_macros::dec;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn march(is_open: bool) -> PeriodInfo {
        PeriodInfo {
            key: PeriodKey::new(2024, 3),
            start_date: date(2024, 3, 1),
            end_date: date(2024, 3, 31),
            is_open,
        }
    }

    fn line(account_id: AccountId, debit: Decimal, credit: Decimal) -> PostingLine {
        PostingLine {
            account: AccountRef::Id(account_id),
            debit,
            credit,
            description: None,
        }
    }

    fn proposed(lines: Vec<PostingLine>) -> ProposedTransaction {
        ProposedTransaction {
            lines,
            transaction_date: date(2024, 3, 15),
            fiscal_period: None,
        }
    }

    fn active(account: &AccountRef) -> Option<AccountInfo> {
        match account {
            AccountRef::Id(id) => Some(AccountInfo {
                id: *id,
                is_active: true,
            }),
            AccountRef::Code(_) => None,
        }
    }

    fn validate_open(transaction: ProposedTransaction) -> Result<ValidatedTransaction, LedgerError> {
        PostingValidator::validate(transaction, active, |_| Some(march(true)), |_| Some(march(true)))
    }

    #[test]
    fn test_balanced_transaction_accepted() {
        let cash = AccountId::new();
        let sales = AccountId::new();
        let result = validate_open(proposed(vec![
            line(cash, dec!(100), Decimal::ZERO),
            line(sales, Decimal::ZERO, dec!(100)),
        ]))
        .unwrap();

        assert_eq!(result.period, PeriodKey::new(2024, 3));
        assert_eq!(result.totals, TransactionTotals::new(dec!(100), dec!(100)));
        assert_eq!(result.lines.len(), 2);
    }

    #[test]
    fn test_unbalanced_reports_totals() {
        let result = validate_open(proposed(vec![
            line(AccountId::new(), dec!(100), Decimal::ZERO),
            line(AccountId::new(), Decimal::ZERO, dec!(90)),
        ]));
        assert_eq!(
            result,
            Err(LedgerError::Unbalanced {
                debit: dec!(100),
                credit: dec!(90),
            })
        );
    }

    #[test]
    fn test_empty_transaction() {
        assert_eq!(validate_open(proposed(vec![])), Err(LedgerError::EmptyTransaction));
    }

    #[test]
    fn test_zero_amount_lines_are_allowed() {
        let result = validate_open(proposed(vec![line(AccountId::new(), Decimal::ZERO, Decimal::ZERO)]));
        assert!(result.is_ok());
    }

    #[test]
    fn test_both_sides_rejected() {
        let result = validate_open(proposed(vec![
            line(AccountId::new(), dec!(5), Decimal::ZERO),
            line(AccountId::new(), dec!(5), dec!(10)),
        ]));
        assert_eq!(result, Err(LedgerError::BothSidesNonZero { line: 1 }));
    }

    #[test]
    fn test_unknown_account() {
        let ghost = AccountId::new();
        let result = PostingValidator::validate(
            proposed(vec![line(ghost, dec!(1), Decimal::ZERO)]),
            |_| None,
            |_| Some(march(true)),
            |_| Some(march(true)),
        );
        assert_eq!(result, Err(LedgerError::UnknownAccount(AccountRef::Id(ghost))));
    }

    #[test]
    fn test_inactive_account() {
        let dormant = AccountId::new();
        let result = PostingValidator::validate(
            proposed(vec![line(dormant, dec!(1), Decimal::ZERO)]),
            |_| Some(AccountInfo { id: dormant, is_active: false }),
            |_| Some(march(true)),
            |_| Some(march(true)),
        );
        assert_eq!(result, Err(LedgerError::InactiveAccount(dormant)));
    }

    #[test]
    fn test_no_fiscal_period_for_date() {
        let result = PostingValidator::validate(
            proposed(vec![line(AccountId::new(), dec!(1), dec!(0))]),
            active,
            |_| None,
            |_| None,
        );
        assert_eq!(result, Err(LedgerError::NoFiscalPeriod(date(2024, 3, 15))));
    }

    #[test]
    fn test_closed_period() {
        let result = PostingValidator::validate(
            proposed(vec![line(AccountId::new(), dec!(1), dec!(0))]),
            active,
            |_| Some(march(false)),
            |_| Some(march(false)),
        );
        assert_eq!(result, Err(LedgerError::PeriodClosed(PeriodKey::new(2024, 3))));
    }

    #[test]
    fn test_explicit_period_must_contain_date() {
        let mut transaction = proposed(vec![line(AccountId::new(), dec!(1), dec!(1))]);
        transaction.fiscal_period = Some(PeriodKey::new(2024, 3));
        transaction.transaction_date = date(2024, 4, 2);

        let result = PostingValidator::validate(transaction, active, |_| Some(march(true)), |_| None);
        assert_eq!(
            result,
            Err(LedgerError::DateOutsidePeriod {
                date: date(2024, 4, 2),
                period: PeriodKey::new(2024, 3),
            })
        );
    }

    #[test]
    fn test_explicit_unknown_period() {
        let mut transaction = proposed(vec![line(AccountId::new(), dec!(1), dec!(1))]);
        transaction.fiscal_period = Some(PeriodKey::new(2030, 1));

        let result = PostingValidator::validate(transaction, active, |_| None, |_| Some(march(true)));
        assert_eq!(result, Err(LedgerError::UnknownPeriod(PeriodKey::new(2030, 1))));
    }

    #[test]
    fn test_unknown_code_is_reported_by_code() {
        let mut by_code = line(AccountId::new(), dec!(1), Decimal::ZERO);
        by_code.account = AccountRef::Code("9999".to_string());

        let result = validate_open(proposed(vec![by_code]));
        assert_eq!(
            result,
            Err(LedgerError::UnknownAccount(AccountRef::Code("9999".to_string())))
        );
    }

    #[test]
    fn test_resolved_lines_carry_account_ids() {
        let cash = AccountId::new();
        let validated = validate_open(proposed(vec![
            line(cash, dec!(3), Decimal::ZERO).with_description("Till"),
            line(AccountId::new(), Decimal::ZERO, dec!(3)),
        ]))
        .unwrap();

        assert_eq!(validated.lines[0].account_id, cash);
        assert_eq!(validated.lines[0].description.as_deref(), Some("Till"));
    }

    #[test]
    fn test_line_errors_win_over_period_errors() {
        // Negative amount on a closed period still reports the line.
        let result = PostingValidator::validate(
            proposed(vec![line(AccountId::new(), dec!(-1), Decimal::ZERO)]),
            active,
            |_| Some(march(false)),
            |_| Some(march(false)),
        );
        assert_eq!(result, Err(LedgerError::NegativeAmount { line: 0 }));
    }

    #[test]
    fn test_column_overflow_is_an_error() {
        let result = validate_open(proposed(vec![
            line(AccountId::new(), Decimal::MAX, Decimal::ZERO),
            line(AccountId::new(), Decimal::MAX, Decimal::ZERO),
            line(AccountId::new(), Decimal::ZERO, Decimal::MAX),
        ]));
        assert_eq!(result, Err(LedgerError::AmountOverflow));
    }

    #[test]
    fn test_decimal_max_on_both_sides_balances() {
        let validated = validate_open(proposed(vec![
            line(AccountId::new(), Decimal::MAX, Decimal::ZERO),
            line(AccountId::new(), Decimal::ZERO, Decimal::MAX),
        ]))
        .unwrap();
        assert_eq!(validated.totals, TransactionTotals::new(Decimal::MAX, Decimal::MAX));
    }
}
