use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use super::deadline::Deadline;
use crate::account::{
    hash_password, verify_password, AccountId, AccountStore, AccountSummary, AccountUpdate, AuthError,
    NewAccount,
};
use crate::auth::{TokenPair, TokenService};
use crate::error::{ServiceError, StoreError};
use crate::events::{LifecycleEvent, LifecycleNotifier};

/// Registration, login and profile management
pub struct AccountService {
    accounts: Arc<dyn AccountStore>,
    tokens: Arc<TokenService>,
    notifier: LifecycleNotifier,
    timeout: Duration,
}

fn missing_account(err: StoreError) -> ServiceError {
    match err {
        StoreError::NotFound => ServiceError::AccountNotFound,
        other => other.into(),
    }
}

impl AccountService {
    pub fn new(
        accounts: Arc<dyn AccountStore>,
        tokens: Arc<TokenService>,
        notifier: LifecycleNotifier,
        timeout: Duration,
    ) -> Self {
        Self {
            accounts,
            tokens,
            notifier,
            timeout,
        }
    }

    fn issue_tokens(&self, id: AccountId) -> Result<TokenPair, ServiceError> {
        self.tokens
            .issue_pair(id)
            .map_err(|e| ServiceError::Internal(e.to_string()))
    }

    pub async fn list_accounts(&self, deadline: Deadline) -> Result<Vec<AccountSummary>, ServiceError> {
        let deadline = deadline.bounded(self.timeout);
        let accounts = deadline.run(self.accounts.list()).await?;
        Ok(accounts.iter().map(AccountSummary::from).collect())
    }

    /// Register a new account and sign it in.
    ///
    /// A taken email fails with `EmailAlreadyExists` before anything is published or
    /// issued. A failed `AccountCreated` publication does not fail the registration.
    pub async fn create_account(
        &self,
        deadline: Deadline,
        name: String,
        email: String,
        password: String,
    ) -> Result<TokenPair, ServiceError> {
        let deadline = deadline.bounded(self.timeout);

        let password_hash = deadline.run(hash_in_background(password)).await?;
        let account = deadline
            .run(self.accounts.create(NewAccount {
                name,
                email,
                password_hash,
            }))
            .await?;
        info!("Registered account {}", account.id);

        self.notifier
            .notify(LifecycleEvent::AccountCreated {
                email: account.email.clone(),
                name: account.name.clone(),
            })
            .await;

        self.issue_tokens(account.id)
    }

    /// Unknown email and wrong password both fail with `InvalidCredentials`.
    pub async fn login(
        &self,
        deadline: Deadline,
        email: &str,
        password: String,
    ) -> Result<TokenPair, ServiceError> {
        let deadline = deadline.bounded(self.timeout);

        let account = deadline
            .run(self.accounts.get_by_email(email))
            .await?
            .ok_or(ServiceError::InvalidCredentials)?;

        let stored = account.password_hash.clone();
        let checked = deadline
            .run(async move {
                tokio::task::spawn_blocking(move || verify_password(&password, &stored))
                    .await
                    .map_err(|e| ServiceError::Internal(e.to_string()))
            })
            .await?;

        match checked {
            Ok(()) => self.issue_tokens(account.id),
            Err(AuthError::MalformedHash) => {
                warn!("Account {} has an unreadable password hash", account.id);
                Err(ServiceError::InvalidCredentials)
            }
            Err(_) => Err(ServiceError::InvalidCredentials),
        }
    }

    pub async fn update_account(
        &self,
        deadline: Deadline,
        update: AccountUpdate,
    ) -> Result<AccountSummary, ServiceError> {
        let deadline = deadline.bounded(self.timeout);

        let account = deadline
            .run(async { self.accounts.update(update).await.map_err(missing_account) })
            .await?;
        info!("Updated account {}", account.id);

        self.notifier
            .notify(LifecycleEvent::AccountUpdated {
                id: account.id,
                email: account.email.clone(),
                name: account.name.clone(),
            })
            .await;

        Ok(account.summary())
    }

    /// Delete an account. Its attachments are left in place.
    pub async fn delete_account(&self, deadline: Deadline, id: AccountId) -> Result<(), ServiceError> {
        let deadline = deadline.bounded(self.timeout);

        let removed = deadline.run(self.accounts.delete(id)).await?;
        if removed == 0 {
            return Err(ServiceError::AccountNotFound);
        }
        info!("Deleted account {}", id);

        self.notifier.notify(LifecycleEvent::AccountDeleted { id }).await;
        Ok(())
    }
}

async fn hash_in_background(password: String) -> Result<String, ServiceError> {
    tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|e| ServiceError::Internal(e.to_string()))?
        .map_err(|e| ServiceError::Internal(e.to_string()))
}
