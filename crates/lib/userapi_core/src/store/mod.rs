//! Account persistence.
//!
//! [`AccountStore`] is the only way account records are read or written.
//! Uniqueness of email and username is enforced by the store itself at write
//! time, never by a separate read.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::models::account::{Account, NewAccount};

pub use memory::MemoryAccountStore;
pub use postgres::PgAccountStore;

/// Store errors.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("account not found")]
    NotFound,

    #[error("email already exists")]
    EmailTaken,

    #[error("username already exists")]
    UsernameTaken,

    #[error("store operation timed out")]
    Timeout,

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Persistence abstraction over account records.
#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Insert a new record. Id and timestamps are assigned by the store.
    async fn create(&self, account: NewAccount) -> Result<Account, StoreError>;

    async fn get_by_id(&self, id: Uuid) -> Result<Account, StoreError>;

    async fn get_by_email(&self, email: &str) -> Result<Account, StoreError>;

    async fn get_by_username(&self, username: &str) -> Result<Account, StoreError>;

    /// Records ordered by creation time, most recent first. Bounds are passed
    /// through unchecked.
    async fn get_all(&self, limit: i64, offset: i64) -> Result<Vec<Account>, StoreError>;

    /// Replace the mutable fields of the record with id `id`.
    async fn update(&self, id: Uuid, account: &Account) -> Result<(), StoreError>;

    async fn delete(&self, id: Uuid) -> Result<(), StoreError>;

    async fn count(&self) -> Result<i64, StoreError>;
}
