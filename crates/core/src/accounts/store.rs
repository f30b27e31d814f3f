//! Account Hierarchy Store.
//!
//! The store owns every `Account` record. Reads hand out an immutable
//! `Arc<AccountArena>` snapshot; writes validate against the current arena
//! first and only then copy-on-write, so a rejected mutation never touches
//! stored state.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use ledgerline_shared::types::AccountId;
use parking_lot::RwLock;
use tracing::{debug, info};

use super::error::AccountError;
use super::types::{Account, AccountFilter, AccountPatch, NewAccount};

/// Answers whether ledger entries reference an account.
///
/// Implemented by the entry store; closures work too, which keeps store
/// tests free of a ledger.
pub trait PostingIndex {
    /// Returns true if at least one committed entry references `account_id`.
    fn has_postings(&self, account_id: AccountId) -> bool;
}

impl<F> PostingIndex for F
where
    F: Fn(AccountId) -> bool,
{
    fn has_postings(&self, account_id: AccountId) -> bool {
        self(account_id)
    }
}

/// Immutable view of the chart of accounts.
#[derive(Debug, Clone, Default)]
pub struct AccountArena {
    accounts: HashMap<AccountId, Account>,
    by_code: HashMap<String, AccountId>,
    children: HashMap<AccountId, Vec<AccountId>>,
}

impl AccountArena {
    /// Looks up an account by id.
    #[must_use]
    pub fn get(&self, id: AccountId) -> Option<&Account> {
        self.accounts.get(&id)
    }

    /// Looks up an account by code.
    #[must_use]
    pub fn get_by_code(&self, code: &str) -> Option<&Account> {
        self.by_code.get(code).and_then(|id| self.accounts.get(id))
    }

    /// Number of accounts.
    #[must_use]
    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    /// Returns true if the chart is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }

    /// All accounts, unordered.
    pub fn iter(&self) -> impl Iterator<Item = &Account> {
        self.accounts.values()
    }

    /// Direct children of `id`, ordered by code.
    #[must_use]
    pub fn children_of(&self, id: AccountId) -> Vec<&Account> {
        let mut kids: Vec<&Account> = self
            .children
            .get(&id)
            .into_iter()
            .flatten()
            .filter_map(|child| self.accounts.get(child))
            .collect();
        kids.sort_by(|a, b| a.code.cmp(&b.code));
        kids
    }

    /// Ancestors of `id`, nearest first. Stops after `len()` steps so a
    /// corrupted chain cannot loop forever.
    #[must_use]
    pub fn ancestors_of(&self, id: AccountId) -> Vec<&Account> {
        let mut chain = Vec::new();
        let mut cursor = self.get(id).and_then(|a| a.parent_id);
        while let Some(parent_id) = cursor {
            let Some(parent) = self.get(parent_id) else {
                break;
            };
            chain.push(parent);
            if chain.len() > self.accounts.len() {
                break;
            }
            cursor = parent.parent_id;
        }
        chain
    }

    /// Returns true if making `candidate_parent` the parent of `id` would
    /// make `id` its own ancestor.
    ///
    /// Walks the candidate's ancestor chain upward looking for `id`.
    #[must_use]
    pub fn would_create_cycle(&self, id: AccountId, candidate_parent: AccountId) -> bool {
        if id == candidate_parent {
            return true;
        }
        let mut cursor = Some(candidate_parent);
        let mut steps = 0usize;
        while let Some(current) = cursor {
            if current == id {
                return true;
            }
            steps += 1;
            if steps > self.accounts.len() {
                // Existing chain already loops; refuse to extend it.
                return true;
            }
            cursor = self.get(current).and_then(|a| a.parent_id);
        }
        false
    }

    fn ensure_unique_code(&self, code: &str, except: Option<AccountId>) -> Result<(), AccountError> {
        match self.by_code.get(code) {
            Some(owner) if Some(*owner) != except => Err(AccountError::DuplicateCode(code.to_string())),
            _ => Ok(()),
        }
    }

    fn active_parent(&self, parent_id: AccountId) -> Result<&Account, AccountError> {
        self.get(parent_id)
            .filter(|p| p.is_active)
            .ok_or(AccountError::InvalidParent(parent_id))
    }

    fn require(&self, id: AccountId) -> Result<&Account, AccountError> {
        self.get(id).ok_or(AccountError::AccountNotFound(id))
    }

    fn detach(&mut self, child: AccountId, parent: Option<AccountId>) {
        if let Some(parent) = parent
            && let Some(siblings) = self.children.get_mut(&parent)
        {
            siblings.retain(|id| *id != child);
            if siblings.is_empty() {
                self.children.remove(&parent);
            }
        }
    }

    fn attach(&mut self, child: AccountId, parent: Option<AccountId>) {
        if let Some(parent) = parent {
            self.children.entry(parent).or_default().push(child);
        }
    }

    /// Recomputes `level` for every descendant of `root` top-down, bumping
    /// the version of each account whose level moved.
    fn relevel_subtree(&mut self, root: AccountId) {
        let now = Utc::now();
        let mut stack = vec![root];
        while let Some(parent_id) = stack.pop() {
            let Some(parent_level) = self.accounts.get(&parent_id).map(|a| a.level) else {
                continue;
            };
            let kids = self.children.get(&parent_id).cloned().unwrap_or_default();
            for child_id in kids {
                if let Some(child) = self.accounts.get_mut(&child_id)
                    && child.level != parent_level + 1
                {
                    child.level = parent_level + 1;
                    child.touch(now);
                }
                stack.push(child_id);
            }
        }
    }
}

/// Lazy depth-first (pre-order) walk over the descendants of an account.
///
/// The walk runs over the snapshot taken when it was created, so it is
/// finite even while writers keep mutating the store. Clone it to restart.
#[derive(Debug, Clone)]
pub struct Descendants {
    arena: Arc<AccountArena>,
    stack: Vec<AccountId>,
}

impl Descendants {
    fn new(arena: Arc<AccountArena>, root: AccountId) -> Self {
        let stack = arena.children_of(root).iter().rev().map(|a| a.id).collect();
        Self { arena, stack }
    }
}

impl Iterator for Descendants {
    type Item = Account;

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.stack.pop()?;
        let account = self.arena.get(id)?.clone();
        self.stack
            .extend(self.arena.children_of(id).iter().rev().map(|a| a.id));
        Some(account)
    }
}

/// Account Hierarchy Store.
#[derive(Debug, Default)]
pub struct AccountStore {
    arena: RwLock<Arc<AccountArena>>,
}

impl AccountStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a consistent snapshot of the whole chart.
    #[must_use]
    pub fn snapshot(&self) -> Arc<AccountArena> {
        Arc::clone(&self.arena.read())
    }

    /// Creates a new account.
    ///
    /// # Errors
    ///
    /// - `InvalidCode` if the code is blank
    /// - `DuplicateCode` if the code is taken
    /// - `InvalidParent` if the parent does not exist or is inactive
    pub(crate) fn create_account(&self, input: NewAccount) -> Result<Account, AccountError> {
        let code = input.code.trim().to_string();
        if code.is_empty() {
            return Err(AccountError::InvalidCode);
        }

        let mut guard = self.arena.write();
        guard.ensure_unique_code(&code, None)?;
        let level = match input.parent_id {
            Some(parent_id) => guard.active_parent(parent_id)?.level + 1,
            None => 0,
        };

        let now = Utc::now();
        let account = Account {
            id: AccountId::new(),
            code,
            name: input.name,
            account_type: input.account_type,
            category: input.category,
            ifrs_category: input.ifrs_category,
            parent_id: input.parent_id,
            level,
            is_active: true,
            version: 1,
            created_at: now,
            updated_at: now,
        };

        let arena = Arc::make_mut(&mut guard);
        arena.by_code.insert(account.code.clone(), account.id);
        arena.attach(account.id, account.parent_id);
        arena.accounts.insert(account.id, account.clone());

        info!(
            account_id = %account.id,
            code = %account.code,
            account_type = %account.account_type,
            level = account.level,
            "Account created"
        );
        Ok(account)
    }

    /// Applies `patch` to an account if `expected_version` is current.
    ///
    /// A parent change re-validates the hierarchy and re-levels the moved
    /// subtree.
    ///
    /// # Errors
    ///
    /// - `AccountNotFound` / `VersionConflict`
    /// - `InvalidCode` / `DuplicateCode` on a code change
    /// - `InvalidParent` / `CycleDetected` on a parent change
    /// - `TypeChangeWithPostings` when changing the type of a posted account
    pub(crate) fn update_account(
        &self,
        id: AccountId,
        patch: AccountPatch,
        expected_version: i64,
        postings: &impl PostingIndex,
    ) -> Result<Account, AccountError> {
        let mut guard = self.arena.write();
        let current = guard.require(id)?;

        if current.version != expected_version {
            return Err(AccountError::VersionConflict {
                account_id: id,
                expected: expected_version,
                actual: current.version,
            });
        }

        let new_code = match &patch.code {
            Some(code) => {
                let code = code.trim().to_string();
                if code.is_empty() {
                    return Err(AccountError::InvalidCode);
                }
                guard.ensure_unique_code(&code, Some(id))?;
                Some(code)
            }
            None => None,
        };

        if let Some(new_type) = patch.account_type
            && new_type != current.account_type
            && postings.has_postings(id)
        {
            return Err(AccountError::TypeChangeWithPostings(id));
        }

        let reparent = match patch.parent_id {
            Some(new_parent) if new_parent != current.parent_id => {
                let level = match new_parent {
                    Some(parent_id) => {
                        if guard.would_create_cycle(id, parent_id) {
                            return Err(AccountError::CycleDetected {
                                account_id: id,
                                parent_id,
                            });
                        }
                        guard.active_parent(parent_id)?.level + 1
                    }
                    None => 0,
                };
                Some((current.parent_id, new_parent, level))
            }
            _ => None,
        };

        // Everything validated; mutate.
        let arena = Arc::make_mut(&mut guard);
        if let Some(code) = &new_code {
            let old_code = arena.accounts.get(&id).map(|a| a.code.clone());
            if let Some(old_code) = old_code {
                arena.by_code.remove(&old_code);
            }
            arena.by_code.insert(code.clone(), id);
        }
        if let Some((old_parent, new_parent, _)) = reparent {
            arena.detach(id, old_parent);
            arena.attach(id, new_parent);
        }

        let now = Utc::now();
        let updated = {
            let account = arena
                .accounts
                .get_mut(&id)
                .ok_or(AccountError::AccountNotFound(id))?;
            if let Some(code) = new_code {
                account.code = code;
            }
            if let Some(name) = patch.name {
                account.name = name;
            }
            if let Some(account_type) = patch.account_type {
                account.account_type = account_type;
            }
            if let Some(category) = patch.category {
                account.category = category;
            }
            if let Some(ifrs_category) = patch.ifrs_category {
                account.ifrs_category = ifrs_category;
            }
            if let Some((_, new_parent, level)) = reparent {
                account.parent_id = new_parent;
                account.level = level;
            }
            account.touch(now);
            account.clone()
        };

        if reparent.is_some() {
            arena.relevel_subtree(id);
        }

        info!(
            account_id = %id,
            version = updated.version,
            reparented = reparent.is_some(),
            "Account updated"
        );
        Ok(updated)
    }

    /// Marks an account inactive so it rejects new postings.
    ///
    /// # Errors
    ///
    /// - `AccountNotFound`
    /// - `HasActivePostings` if any entry references the account
    /// - `HasChildren` if it has active children
    pub(crate) fn deactivate(
        &self,
        id: AccountId,
        postings: &impl PostingIndex,
    ) -> Result<Account, AccountError> {
        let mut guard = self.arena.write();
        let current = guard.require(id)?;
        if !current.is_active {
            return Ok(current.clone());
        }
        if postings.has_postings(id) {
            return Err(AccountError::HasActivePostings(id));
        }
        if guard.children_of(id).iter().any(|c| c.is_active) {
            return Err(AccountError::HasChildren(id));
        }

        let arena = Arc::make_mut(&mut guard);
        let account = arena
            .accounts
            .get_mut(&id)
            .ok_or(AccountError::AccountNotFound(id))?;
        account.is_active = false;
        account.touch(Utc::now());
        info!(account_id = %id, code = %account.code, "Account deactivated");
        Ok(account.clone())
    }

    /// Re-enables posting to an inactive account.
    ///
    /// # Errors
    ///
    /// - `AccountNotFound`
    /// - `InvalidParent` if the parent is inactive
    pub(crate) fn reactivate(&self, id: AccountId) -> Result<Account, AccountError> {
        let mut guard = self.arena.write();
        let current = guard.require(id)?;
        if current.is_active {
            return Ok(current.clone());
        }
        if let Some(parent_id) = current.parent_id {
            guard.active_parent(parent_id)?;
        }

        let arena = Arc::make_mut(&mut guard);
        let account = arena
            .accounts
            .get_mut(&id)
            .ok_or(AccountError::AccountNotFound(id))?;
        account.is_active = true;
        account.touch(Utc::now());
        info!(account_id = %id, code = %account.code, "Account reactivated");
        Ok(account.clone())
    }

    /// Removes an account that nothing references.
    ///
    /// # Errors
    ///
    /// - `AccountNotFound`
    /// - `HasActivePostings` if any entry references the account
    /// - `HasChildren` if it has any children
    pub(crate) fn delete_account(
        &self,
        id: AccountId,
        postings: &impl PostingIndex,
    ) -> Result<Account, AccountError> {
        let mut guard = self.arena.write();
        guard.require(id)?;
        if postings.has_postings(id) {
            return Err(AccountError::HasActivePostings(id));
        }
        if guard.children.contains_key(&id) {
            return Err(AccountError::HasChildren(id));
        }

        let arena = Arc::make_mut(&mut guard);
        let removed = arena
            .accounts
            .remove(&id)
            .ok_or(AccountError::AccountNotFound(id))?;
        arena.by_code.remove(&removed.code);
        arena.detach(id, removed.parent_id);
        info!(account_id = %id, code = %removed.code, "Account deleted");
        Ok(removed)
    }

    /// Resolves an account by id.
    ///
    /// # Errors
    ///
    /// Returns `AccountNotFound` if no such account exists.
    pub fn resolve(&self, id: AccountId) -> Result<Account, AccountError> {
        self.arena.read().require(id).cloned()
    }

    /// Resolves an account by its code.
    ///
    /// # Errors
    ///
    /// Returns `CodeNotFound` if no account carries the code.
    pub fn resolve_code(&self, code: &str) -> Result<Account, AccountError> {
        self.arena
            .read()
            .get_by_code(code)
            .cloned()
            .ok_or_else(|| AccountError::CodeNotFound(code.to_string()))
    }

    /// Direct children of an account, ordered by code.
    ///
    /// # Errors
    ///
    /// Returns `AccountNotFound` if no such account exists.
    pub fn children(&self, id: AccountId) -> Result<Vec<Account>, AccountError> {
        let arena = self.arena.read();
        arena.require(id)?;
        Ok(arena.children_of(id).into_iter().cloned().collect())
    }

    /// Ancestors of an account, nearest first.
    ///
    /// # Errors
    ///
    /// Returns `AccountNotFound` if no such account exists.
    pub fn ancestors(&self, id: AccountId) -> Result<Vec<Account>, AccountError> {
        let arena = self.arena.read();
        arena.require(id)?;
        Ok(arena.ancestors_of(id).into_iter().cloned().collect())
    }

    /// Lazily walks every descendant of `id`.
    ///
    /// # Errors
    ///
    /// Returns `AccountNotFound` if no such account exists.
    pub fn list_descendants(&self, id: AccountId) -> Result<Descendants, AccountError> {
        let arena = self.snapshot();
        arena.require(id)?;
        debug!(account_id = %id, "Listing descendants");
        Ok(Descendants::new(arena, id))
    }

    /// Lists accounts matching `filter`, ordered by code.
    #[must_use]
    pub fn list(&self, filter: &AccountFilter) -> Vec<Account> {
        let arena = self.arena.read();
        let mut accounts: Vec<Account> = arena.iter().filter(|a| filter.matches(a)).cloned().collect();
        accounts.sort_by(|a, b| a.code.cmp(&b.code));
        accounts
    }
}
