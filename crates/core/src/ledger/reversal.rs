//! Reversing entries for committed transactions.
//!
//! A committed transaction is never edited. It is corrected by posting a
//! second transaction with every debit and credit swapped.

use std::sync::Arc;

use ledgerline_shared::types::TransactionId;

use super::entry::GlEntry;
use super::types::{AccountRef, PostingLine, PostingRequest, ReversalRequest};

/// Builds the posting request that offsets `original`.
///
/// For each original entry:
/// - Debits become credits and credits become debits
/// - The account is preserved
/// - The memo is prefixed with "Reversal: "
#[must_use]
pub fn reversing_request(
    original_id: TransactionId,
    original: &[Arc<GlEntry>],
    request: &ReversalRequest,
    module_source: &str,
) -> PostingRequest {
    let entries = original
        .iter()
        .map(|entry| PostingLine {
            account: AccountRef::Id(entry.account_id),
            debit: entry.credit,
            credit: entry.debit,
            description: Some(format!(
                "Reversal: {}",
                entry.description.clone().unwrap_or_default()
            )),
        })
        .collect();

    let description = match &request.reason {
        Some(reason) => format!("Reversal of transaction {original_id}. Reason: {reason}"),
        None => format!("Reversal of transaction {original_id}"),
    };

    PostingRequest {
        transaction_id: None,
        entries,
        module_source: module_source.to_string(),
        reference_type: "reversal".to_string(),
        transaction_date: request.reversal_date,
        fiscal_period: None,
        description: Some(description),
        approval_status: original
            .first()
            .map(|e| e.approval_status)
            .unwrap_or_default(),
        created_by: request.created_by.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fiscal::PeriodKey;
    use crate::ledger::entry::ApprovalStatus;
    use chrono::{NaiveDate, Utc};
    use ledgerline_shared::types::{AccountId, LedgerEntryId};
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn committed(
        tx: TransactionId,
        debit: Decimal,
        credit: Decimal,
        memo: Option<&str>,
    ) -> Arc<GlEntry> {
        Arc::new(GlEntry {
            id: LedgerEntryId::new(),
            transaction_id: tx,
            sequence: 1,
            account_id: AccountId::new(),
            debit,
            credit,
            transaction_date: NaiveDate::from_ymd_opt(2024, 3, 15).unwrap(),
            fiscal_period: PeriodKey::new(2024, 3),
            module_source: "sales".to_string(),
            reference_type: "invoice".to_string(),
            description: memo.map(str::to_string),
            approval_status: ApprovalStatus::Approved,
            created_by: None,
            created_at: Utc::now(),
            reversal_of: None,
        })
    }

    #[test]
    fn test_reversal_swaps_sides() {
        let tx = TransactionId::new();
        let original = vec![
            committed(tx, dec!(100), Decimal::ZERO, Some("Cash sale")),
            committed(tx, Decimal::ZERO, dec!(100), None),
        ];
        let request = ReversalRequest {
            reversal_date: NaiveDate::from_ymd_opt(2024, 3, 20).unwrap(),
            reason: Some("Duplicate invoice".to_string()),
            created_by: Some("auditor".to_string()),
        };

        let posting = reversing_request(tx, &original, &request, "general_ledger");

        assert_eq!(posting.entries.len(), 2);
        assert_eq!(posting.entries[0].debit, Decimal::ZERO);
        assert_eq!(posting.entries[0].credit, dec!(100));
        assert_eq!(posting.entries[1].debit, dec!(100));
        assert_eq!(
            posting.entries[0].description.as_deref(),
            Some("Reversal: Cash sale")
        );
        assert_eq!(posting.entries[0].account, AccountRef::Id(original[0].account_id));
        assert_eq!(posting.transaction_date, request.reversal_date);
        assert_eq!(posting.module_source, "general_ledger");
        assert_eq!(
            posting.description,
            Some(format!("Reversal of transaction {tx}. Reason: Duplicate invoice"))
        );
        assert_eq!(posting.created_by.as_deref(), Some("auditor"));
    }
}
