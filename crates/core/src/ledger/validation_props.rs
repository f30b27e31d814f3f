//! Property-based tests for posting validation rules.

use chrono::NaiveDate;
use ledgerline_shared::types::AccountId;
use proptest::prelude::*;
use rust_decimal::Decimal;

use super::error::LedgerError;
use super::types::{
    AccountInfo, AccountRef, PeriodInfo, PostingLine, ProposedTransaction, ValidatedTransaction,
};
use super::validation::PostingValidator;
use crate::fiscal::PeriodKey;

/// Strategy to generate a valid positive amount (> 0).
fn positive_amount() -> impl Strategy<Value = Decimal> {
    // 0.01 to 1,000,000.00
    (1i64..100_000_000i64).prop_map(|cents| Decimal::new(cents, 2))
}

/// Strategy to generate a negative amount.
fn negative_amount() -> impl Strategy<Value = Decimal> {
    (1i64..100_000_000i64).prop_map(|cents| Decimal::new(-cents, 2))
}

/// Strategy for whole amounts in the top quarter of the `Decimal` range.
fn huge_amount() -> impl Strategy<Value = Decimal> {
    let floor = (Decimal::MAX * Decimal::new(3, 1)).trunc();
    (0u64..=u64::MAX).prop_map(move |n| floor + Decimal::from(n))
}

fn open_period() -> PeriodInfo {
    PeriodInfo {
        key: PeriodKey::new(2024, 1),
        start_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        end_date: NaiveDate::from_ymd_opt(2024, 1, 31).unwrap(),
        is_open: true,
    }
}

fn debit(amount: Decimal) -> PostingLine {
    PostingLine::debit(AccountId::new(), amount)
}

fn credit(amount: Decimal) -> PostingLine {
    PostingLine::credit(AccountId::new(), amount)
}

fn validate(lines: Vec<PostingLine>) -> Result<ValidatedTransaction, LedgerError> {
    PostingValidator::validate(
        ProposedTransaction {
            lines,
            transaction_date: NaiveDate::from_ymd_opt(2024, 1, 10).unwrap(),
            fiscal_period: None,
        },
        |account| match account {
            AccountRef::Id(id) => Some(AccountInfo { id: *id, is_active: true }),
            AccountRef::Code(_) => None,
        },
        |_| Some(open_period()),
        |_| Some(open_period()),
    )
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Any negative amount is rejected with its line index.
    #[test]
    fn prop_negative_amount_rejected(
        neg_amount in negative_amount(),
        other_amount in positive_amount(),
        on_debit_side in any::<bool>(),
    ) {
        let lines = if on_debit_side {
            vec![credit(other_amount), debit(neg_amount)]
        } else {
            vec![debit(other_amount), credit(neg_amount)]
        };

        prop_assert_eq!(validate(lines), Err(LedgerError::NegativeAmount { line: 1 }));
    }

    /// A line with both sides set is rejected even when the totals balance.
    #[test]
    fn prop_both_sides_rejected(amount in positive_amount()) {
        let mut both = debit(amount);
        both.credit = amount;

        prop_assert_eq!(validate(vec![both]), Err(LedgerError::BothSidesNonZero { line: 0 }));
    }

    /// Balanced multi-line transactions are accepted and their totals match.
    #[test]
    fn prop_balanced_transaction_accepted(
        debits in prop::collection::vec(positive_amount(), 1..8),
    ) {
        let total: Decimal = debits.iter().copied().sum();
        let mut lines: Vec<PostingLine> = debits.into_iter().map(debit).collect();
        lines.push(credit(total));

        let validated = validate(lines);
        prop_assert!(validated.is_ok(), "got {:?}", validated);
        let validated = validated.unwrap();
        prop_assert_eq!(validated.totals.debit, total);
        prop_assert_eq!(validated.totals.credit, total);
    }

    /// Debit columns that overflow are reported as such; columns that fit
    /// are validated as usual. Validation never panics on large amounts.
    #[test]
    fn prop_huge_amounts_never_panic(
        debits in prop::collection::vec(huge_amount(), 1..5),
        credit_amount in huge_amount(),
    ) {
        let fits = debits
            .iter()
            .try_fold(Decimal::ZERO, |sum, amount| sum.checked_add(*amount))
            .is_some();
        let mut lines: Vec<PostingLine> = debits.iter().copied().map(debit).collect();
        lines.push(credit(credit_amount));

        match validate(lines) {
            Err(LedgerError::AmountOverflow) => prop_assert!(!fits),
            Ok(validated) => {
                prop_assert!(fits);
                prop_assert_eq!(validated.totals.credit, credit_amount);
            }
            Err(LedgerError::Unbalanced { credit, .. }) => {
                prop_assert!(fits);
                prop_assert_eq!(credit, credit_amount);
            }
            Err(other) => prop_assert!(false, "unexpected error {:?}", other),
        }
    }

    /// Any imbalance, however small, is rejected with the exact totals.
    #[test]
    fn prop_unbalanced_rejected(
        amount in positive_amount(),
        skew in positive_amount(),
    ) {
        let result = validate(vec![debit(amount + skew), credit(amount)]);
        prop_assert_eq!(
            result,
            Err(LedgerError::Unbalanced { debit: amount + skew, credit: amount })
        );
    }
}

#[cfg(test)]
mod unit_tests {
    use super::*;

    /// One cent off still fails.
    #[test]
    fn test_one_cent_imbalance() {
        let result = validate(vec![
            debit(Decimal::new(10001, 2)),
            credit(Decimal::new(10000, 2)),
        ]);
        assert!(matches!(result, Err(LedgerError::Unbalanced { .. })));
    }

    /// Both columns can carry `Decimal::MAX`, but not a cent more.
    #[test]
    fn test_decimal_max_column_limit() {
        let full = validate(vec![debit(Decimal::MAX), credit(Decimal::MAX)]).unwrap();
        assert!(full.totals.is_balanced);

        let over = validate(vec![
            debit(Decimal::MAX),
            debit(Decimal::ONE),
            credit(Decimal::MAX),
        ]);
        assert_eq!(over, Err(LedgerError::AmountOverflow));

        let credit_over = validate(vec![
            debit(Decimal::MAX),
            credit(Decimal::MAX),
            credit(Decimal::ONE),
        ]);
        assert_eq!(credit_over, Err(LedgerError::AmountOverflow));
    }

    /// Different scales of the same value balance exactly.
    #[test]
    fn test_scale_insensitive_equality() {
        let result = validate(vec![debit(Decimal::new(100, 0)), credit(Decimal::new(10000, 2))]);
        assert!(result.is_ok());
    }
}
