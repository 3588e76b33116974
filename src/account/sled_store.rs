//! sled-backed account store
//!
//! Records live in the `accounts` tree keyed by big-endian id, with a unique
//! `accounts_by_email` index. Both trees change inside one sled transaction so the
//! index never points at a missing record. sled calls block, so every trait method
//! runs its body on the blocking pool.

use async_trait::async_trait;
use sled::transaction::{
    ConflictableTransactionError, ConflictableTransactionResult, TransactionError, Transactional,
};
use std::path::Path;

use super::store::AccountStore;
use super::types::{Account, AccountId, AccountUpdate, NewAccount};
use crate::error::{blocking, StoreError};

const ACCOUNTS_TREE: &str = "accounts";
const EMAIL_INDEX_TREE: &str = "accounts_by_email";

/// Handles are reference counted by sled, so clones share one database.
#[derive(Clone)]
pub struct SledAccountStore {
    db: sled::Db,
    accounts: sled::Tree,
    emails: sled::Tree,
}

impl SledAccountStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        Self::from_db(sled::open(path)?)
    }

    pub fn from_db(db: sled::Db) -> Result<Self, StoreError> {
        let accounts = db.open_tree(ACCOUNTS_TREE)?;
        let emails = db.open_tree(EMAIL_INDEX_TREE)?;
        Ok(Self { db, accounts, emails })
    }

    fn read(&self, id: AccountId) -> Result<Option<Account>, StoreError> {
        match self.accounts.get(id_key(id))? {
            Some(bytes) => Ok(Some(decode(&bytes)?)),
            None => Ok(None),
        }
    }

    fn read_by_email(&self, email: &str) -> Result<Option<Account>, StoreError> {
        match self.emails.get(email.as_bytes())? {
            Some(id) => self.read(id_from_bytes(&id)?),
            None => Ok(None),
        }
    }

    fn read_all(&self) -> Result<Vec<Account>, StoreError> {
        self.accounts
            .iter()
            .values()
            .map(|v| decode(&v?))
            .collect()
    }

    fn write_new(&self, account: NewAccount) -> Result<Account, StoreError> {
        // generate_id starts at 0; keep 0 free as "no account"
        let id = self.db.generate_id()? + 1;
        let account = Account::from_new(id, account);
        let encoded = bincode::serialize(&account)?;
        let key = id_key(id);

        let result = (&self.accounts, &self.emails).transaction(
            |(accounts, emails)| -> ConflictableTransactionResult<(), StoreError> {
                if emails.get(account.email.as_bytes())?.is_some() {
                    return abort(StoreError::DuplicateKey);
                }
                emails.insert(account.email.as_bytes(), &key[..])?;
                accounts.insert(&key[..], encoded.as_slice())?;
                Ok(())
            },
        );
        unwrap_tx(result)?;
        self.db.flush()?;

        Ok(account)
    }

    fn write_update(&self, update: AccountUpdate) -> Result<Account, StoreError> {
        let key = id_key(update.id);

        let result = (&self.accounts, &self.emails).transaction(
            |(accounts, emails)| -> ConflictableTransactionResult<Account, StoreError> {
                let mut account = match accounts.get(&key[..])? {
                    Some(bytes) => match decode(&bytes) {
                        Ok(account) => account,
                        Err(e) => return abort(e),
                    },
                    None => return abort(StoreError::NotFound),
                };

                if account.email != update.email {
                    if let Some(owner) = emails.get(update.email.as_bytes())? {
                        if &owner[..] != &key[..] {
                            return abort(StoreError::DuplicateKey);
                        }
                    }
                    emails.remove(account.email.as_bytes())?;
                    emails.insert(update.email.as_bytes(), &key[..])?;
                }

                account.apply(&update);
                let encoded = match bincode::serialize(&account) {
                    Ok(encoded) => encoded,
                    Err(e) => return abort(e),
                };
                accounts.insert(&key[..], encoded)?;
                Ok(account)
            },
        );
        let account = unwrap_tx(result)?;
        self.db.flush()?;

        Ok(account)
    }

    fn remove(&self, id: AccountId) -> Result<u64, StoreError> {
        let key = id_key(id);

        let result = (&self.accounts, &self.emails).transaction(
            |(accounts, emails)| -> ConflictableTransactionResult<u64, StoreError> {
                let account = match accounts.remove(&key[..])? {
                    Some(bytes) => match decode(&bytes) {
                        Ok(account) => account,
                        Err(e) => return abort(e),
                    },
                    None => return Ok(0),
                };
                emails.remove(account.email.as_bytes())?;
                Ok(1)
            },
        );
        let removed = unwrap_tx(result)?;
        if removed > 0 {
            self.db.flush()?;
        }

        Ok(removed)
    }
}

fn id_key(id: AccountId) -> [u8; 8] {
    id.to_be_bytes()
}

fn id_from_bytes(bytes: &[u8]) -> Result<AccountId, StoreError> {
    let raw: [u8; 8] = bytes
        .try_into()
        .map_err(|_| StoreError::Backend("corrupt email index entry".to_string()))?;
    Ok(AccountId::from_be_bytes(raw))
}

fn decode(bytes: &[u8]) -> Result<Account, StoreError> {
    Ok(bincode::deserialize(bytes)?)
}

fn abort<T>(err: impl Into<StoreError>) -> ConflictableTransactionResult<T, StoreError> {
    Err(ConflictableTransactionError::Abort(err.into()))
}

fn unwrap_tx<T>(result: Result<T, TransactionError<StoreError>>) -> Result<T, StoreError> {
    result.map_err(|e| match e {
        TransactionError::Abort(e) => e,
        TransactionError::Storage(e) => e.into(),
    })
}

#[async_trait]
impl AccountStore for SledAccountStore {
    async fn get_by_id(&self, id: AccountId) -> Result<Option<Account>, StoreError> {
        let store = self.clone();
        blocking(move || store.read(id)).await
    }

    async fn get_by_email(&self, email: &str) -> Result<Option<Account>, StoreError> {
        let store = self.clone();
        let email = email.to_string();
        blocking(move || store.read_by_email(&email)).await
    }

    async fn list(&self) -> Result<Vec<Account>, StoreError> {
        let store = self.clone();
        blocking(move || store.read_all()).await
    }

    async fn create(&self, account: NewAccount) -> Result<Account, StoreError> {
        let store = self.clone();
        blocking(move || store.write_new(account)).await
    }

    async fn update(&self, update: AccountUpdate) -> Result<Account, StoreError> {
        let store = self.clone();
        blocking(move || store.write_update(update)).await
    }

    async fn delete(&self, id: AccountId) -> Result<u64, StoreError> {
        let store = self.clone();
        blocking(move || store.remove(id)).await
    }
}
