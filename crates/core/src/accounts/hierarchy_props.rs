//! Property-based tests for the account hierarchy.
//!
//! For any sequence of create/update calls no account becomes its own
//! ancestor, levels always equal `parent.level + 1`, and a rejected
//! re-parent leaves the store untouched.

use ledgerline_shared::types::AccountId;
use proptest::prelude::*;

use super::error::AccountError;
use super::store::{AccountArena, AccountStore};
use super::types::{AccountPatch, AccountType, NewAccount};

#[derive(Debug, Clone)]
enum Op {
    /// Create an account under the n-th existing account (or as root).
    Create { parent: Option<usize> },
    /// Move the n-th account under the m-th account (or to root).
    Reparent { target: usize, parent: Option<usize> },
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        proptest::option::of(0usize..32).prop_map(|parent| Op::Create { parent }),
        (0usize..32, proptest::option::of(0usize..32))
            .prop_map(|(target, parent)| Op::Reparent { target, parent }),
    ]
}

fn no_postings(_: AccountId) -> bool {
    false
}

fn assert_forest(arena: &AccountArena) -> Result<(), TestCaseError> {
    for account in arena.iter() {
        let ancestors = arena.ancestors_of(account.id);
        prop_assert!(
            ancestors.iter().all(|a| a.id != account.id),
            "account {} is its own ancestor",
            account.code
        );
        prop_assert!(ancestors.len() < arena.len() || arena.len() == 0);
        let expected_level = match account.parent_id {
            Some(parent_id) => {
                let parent = arena.get(parent_id);
                prop_assert!(parent.is_some(), "dangling parent reference");
                parent.map_or(0, |p| p.level + 1)
            }
            None => 0,
        };
        prop_assert_eq!(account.level, expected_level);
    }
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Any interleaving of creates and re-parents keeps the chart a forest.
    #[test]
    fn prop_hierarchy_stays_acyclic(ops in prop::collection::vec(op_strategy(), 1..60)) {
        let store = AccountStore::new();
        let mut ids: Vec<AccountId> = Vec::new();

        for (n, op) in ops.into_iter().enumerate() {
            match op {
                Op::Create { parent } => {
                    let mut input = NewAccount::new(format!("{n:04}"), format!("Account {n}"), AccountType::Asset);
                    input.parent_id = parent.and_then(|i| ids.get(i % ids.len().max(1)).copied());
                    if let Ok(account) = store.create_account(input) {
                        ids.push(account.id);
                    }
                }
                Op::Reparent { target, parent } => {
                    if ids.is_empty() {
                        continue;
                    }
                    let target_id = ids[target % ids.len()];
                    let parent_id = parent.map(|i| ids[i % ids.len()]);
                    let before = store.snapshot();
                    let version = store.resolve(target_id).map(|a| a.version).unwrap_or_default();
                    let patch = AccountPatch { parent_id: Some(parent_id), ..Default::default() };

                    if let Err(AccountError::CycleDetected { .. }) =
                        store.update_account(target_id, patch, version, &no_postings)
                    {
                        let after = store.snapshot();
                        for account in before.iter() {
                            prop_assert_eq!(after.get(account.id), Some(account));
                        }
                        let parent_id = parent_id.unwrap_or(target_id);
                        prop_assert!(
                            parent_id == target_id
                                || before.ancestors_of(parent_id).iter().any(|a| a.id == target_id)
                        );
                    }
                }
            }
            assert_forest(&store.snapshot())?;
        }
    }

    /// Re-parenting an account under any of its own descendants always fails.
    #[test]
    fn prop_reparent_under_descendant_rejected(depth in 1usize..12, pick in 0usize..12) {
        let store = AccountStore::new();
        let mut chain = Vec::new();
        let mut parent = None;
        for n in 0..=depth {
            let mut input = NewAccount::new(format!("{n:04}"), "Chain", AccountType::Expense);
            input.parent_id = parent;
            let account = store.create_account(input).unwrap();
            parent = Some(account.id);
            chain.push(account.id);
        }

        let root = chain[0];
        let descendant = chain[1 + pick % depth];
        let patch = AccountPatch { parent_id: Some(Some(descendant)), ..Default::default() };
        let result = store.update_account(root, patch, 1, &no_postings);

        prop_assert_eq!(
            result,
            Err(AccountError::CycleDetected { account_id: root, parent_id: descendant })
        );
        prop_assert_eq!(store.resolve(root).unwrap().parent_id, None);
    }
}
