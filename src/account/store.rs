//! Account store capability and the in-memory implementation

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use super::types::{Account, AccountId, AccountUpdate, NewAccount};
use crate::error::StoreError;

/// Storage operations over account records in the primary store
#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Get an account by id
    async fn get_by_id(&self, id: AccountId) -> Result<Option<Account>, StoreError>;

    /// Get an account by its unique email
    async fn get_by_email(&self, email: &str) -> Result<Option<Account>, StoreError>;

    /// List all accounts ordered by id
    async fn list(&self) -> Result<Vec<Account>, StoreError>;

    /// Persist a new account. Fails with `DuplicateKey` when the email is taken.
    async fn create(&self, account: NewAccount) -> Result<Account, StoreError>;

    /// Change name and email. Fails with `NotFound` for an unknown id and
    /// `DuplicateKey` when the new email belongs to another account.
    async fn update(&self, update: AccountUpdate) -> Result<Account, StoreError>;

    /// Delete an account, returning the number of removed records
    async fn delete(&self, id: AccountId) -> Result<u64, StoreError>;
}

#[derive(Default)]
struct Inner {
    next_id: AccountId,
    accounts: BTreeMap<AccountId, Account>,
}

/// Substitutable account store kept entirely in memory
#[derive(Default)]
pub struct InMemoryAccountStore {
    inner: Mutex<Inner>,
}

impl InMemoryAccountStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Inner>, StoreError> {
        self.inner
            .lock()
            .map_err(|e| StoreError::Backend(format!("account store poisoned: {}", e)))
    }
}

fn email_taken(accounts: &BTreeMap<AccountId, Account>, email: &str, except: Option<AccountId>) -> bool {
    accounts
        .values()
        .any(|a| a.email == email && Some(a.id) != except)
}

#[async_trait]
impl AccountStore for InMemoryAccountStore {
    async fn get_by_id(&self, id: AccountId) -> Result<Option<Account>, StoreError> {
        Ok(self.lock()?.accounts.get(&id).cloned())
    }

    async fn get_by_email(&self, email: &str) -> Result<Option<Account>, StoreError> {
        Ok(self
            .lock()?
            .accounts
            .values()
            .find(|a| a.email == email)
            .cloned())
    }

    async fn list(&self) -> Result<Vec<Account>, StoreError> {
        Ok(self.lock()?.accounts.values().cloned().collect())
    }

    async fn create(&self, account: NewAccount) -> Result<Account, StoreError> {
        let mut inner = self.lock()?;
        if email_taken(&inner.accounts, &account.email, None) {
            return Err(StoreError::DuplicateKey);
        }

        inner.next_id += 1;
        let created = Account::from_new(inner.next_id, account);
        inner.accounts.insert(created.id, created.clone());
        Ok(created)
    }

    async fn update(&self, update: AccountUpdate) -> Result<Account, StoreError> {
        let mut inner = self.lock()?;
        if !inner.accounts.contains_key(&update.id) {
            return Err(StoreError::NotFound);
        }
        if email_taken(&inner.accounts, &update.email, Some(update.id)) {
            return Err(StoreError::DuplicateKey);
        }

        let account = inner
            .accounts
            .get_mut(&update.id)
            .ok_or(StoreError::NotFound)?;
        account.apply(&update);
        Ok(account.clone())
    }

    async fn delete(&self, id: AccountId) -> Result<u64, StoreError> {
        Ok(self.lock()?.accounts.remove(&id).map_or(0, |_| 1))
    }
}
