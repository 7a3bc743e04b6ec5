//! In-process account store.
//!
//! Mirrors the PostgreSQL store's semantics: both uniqueness constraints are
//! checked and the record inserted under a single write lock, listing is by
//! descending creation time, and mutations that match nothing report
//! `NotFound`.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{AccountStore, StoreError};
use crate::models::account::{Account, NewAccount};
use crate::uuid::uuidv7;

#[derive(Debug, Default)]
pub struct MemoryAccountStore {
    accounts: RwLock<HashMap<Uuid, Account>>,
}

impl MemoryAccountStore {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Returns the conflicting constraint, ignoring the record `except` itself.
fn conflict(
    accounts: &HashMap<Uuid, Account>,
    email: &str,
    username: &str,
    except: Option<Uuid>,
) -> Option<StoreError> {
    let others = accounts.values().filter(|a| Some(a.id) != except);
    for other in others {
        if other.email == email {
            return Some(StoreError::EmailTaken);
        }
        if other.username == username {
            return Some(StoreError::UsernameTaken);
        }
    }
    None
}

#[async_trait]
impl AccountStore for MemoryAccountStore {
    async fn create(&self, account: NewAccount) -> Result<Account, StoreError> {
        let mut accounts = self.accounts.write().await;
        if let Some(err) = conflict(&accounts, &account.email, &account.username, None) {
            return Err(err);
        }
        let account = account.into_account(uuidv7(), Utc::now());
        accounts.insert(account.id, account.clone());
        Ok(account)
    }

    async fn get_by_id(&self, id: Uuid) -> Result<Account, StoreError> {
        self.accounts
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn get_by_email(&self, email: &str) -> Result<Account, StoreError> {
        self.accounts
            .read()
            .await
            .values()
            .find(|a| a.email == email)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn get_by_username(&self, username: &str) -> Result<Account, StoreError> {
        self.accounts
            .read()
            .await
            .values()
            .find(|a| a.username == username)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn get_all(&self, limit: i64, offset: i64) -> Result<Vec<Account>, StoreError> {
        let accounts = self.accounts.read().await;
        let mut all: Vec<Account> = accounts.values().cloned().collect();
        all.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        let offset = usize::try_from(offset).unwrap_or(0);
        let limit = usize::try_from(limit).unwrap_or(0);
        Ok(all.into_iter().skip(offset).take(limit).collect())
    }

    async fn update(&self, id: Uuid, account: &Account) -> Result<(), StoreError> {
        let mut accounts = self.accounts.write().await;
        if !accounts.contains_key(&id) {
            return Err(StoreError::NotFound);
        }
        if let Some(err) = conflict(&accounts, &account.email, &account.username, Some(id)) {
            return Err(err);
        }
        let Some(stored) = accounts.get_mut(&id) else {
            return Err(StoreError::NotFound);
        };
        stored.email = account.email.clone();
        stored.username = account.username.clone();
        stored.password_hash = account.password_hash.clone();
        stored.first_name = account.first_name.clone();
        stored.last_name = account.last_name.clone();
        stored.is_active = account.is_active;
        stored.role = account.role;
        stored.updated_at = account.updated_at;
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> Result<(), StoreError> {
        self.accounts
            .write()
            .await
            .remove(&id)
            .map(|_| ())
            .ok_or(StoreError::NotFound)
    }

    async fn count(&self) -> Result<i64, StoreError> {
        Ok(self.accounts.read().await.len() as i64)
    }
}
