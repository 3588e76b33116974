//! Account type definitions

use serde::{Deserialize, Serialize};

/// Store-assigned account identifier
pub type AccountId = u64;

/// Persisted account record
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Account {
    pub id: AccountId,
    pub name: String,
    pub email: String,
    /// Argon2id PHC string, never exposed outside the service
    pub password_hash: String,
}

/// Account fields supplied at creation; the store assigns the id
#[derive(Clone, Debug, PartialEq)]
pub struct NewAccount {
    pub name: String,
    pub email: String,
    pub password_hash: String,
}

/// Profile mutation. Only name and email can change after creation.
#[derive(Clone, Debug, PartialEq)]
pub struct AccountUpdate {
    pub id: AccountId,
    pub name: String,
    pub email: String,
}

/// Public projection of an account
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct AccountSummary {
    pub id: AccountId,
    pub name: String,
    pub email: String,
}

impl Account {
    pub fn from_new(id: AccountId, new: NewAccount) -> Self {
        Self {
            id,
            name: new.name,
            email: new.email,
            password_hash: new.password_hash,
        }
    }

    /// Apply a profile update, keeping the id and password hash
    pub fn apply(&mut self, update: &AccountUpdate) {
        self.name = update.name.clone();
        self.email = update.email.clone();
    }

    pub fn summary(&self) -> AccountSummary {
        AccountSummary {
            id: self.id,
            name: self.name.clone(),
            email: self.email.clone(),
        }
    }
}

impl From<&Account> for AccountSummary {
    fn from(account: &Account) -> Self {
        account.summary()
    }
}
