//! PostgreSQL-backed account store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::warn;
use uuid::Uuid;

use super::{AccountStore, StoreError};
use crate::models::account::{Account, NewAccount, Role};
use crate::uuid::uuidv7;

/// Unique constraint on `users.email` (see migrations).
const EMAIL_CONSTRAINT: &str = "users_email_key";

/// Unique constraint on `users.username` (see migrations).
const USERNAME_CONSTRAINT: &str = "users_username_key";

const SELECT_COLUMNS: &str = "SELECT id, email, username, password_hash, first_name, last_name, \
     is_active, role, created_at, updated_at FROM users";

#[derive(Debug, sqlx::FromRow)]
struct AccountRow {
    id: Uuid,
    email: String,
    username: String,
    password_hash: String,
    first_name: String,
    last_name: String,
    is_active: bool,
    role: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<AccountRow> for Account {
    type Error = StoreError;

    fn try_from(row: AccountRow) -> Result<Self, Self::Error> {
        let role: Role = row.role.parse().map_err(|e| {
            warn!(id = %row.id, error = %e, "stored account has unknown role");
            StoreError::Database(sqlx::Error::Decode(Box::new(e)))
        })?;
        Ok(Account {
            id: row.id,
            email: row.email,
            username: row.username,
            password_hash: row.password_hash,
            first_name: row.first_name,
            last_name: row.last_name,
            is_active: row.is_active,
            role,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Translate a unique-constraint violation into the matching store error.
fn map_write_error(e: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db) = &e
        && db.is_unique_violation()
    {
        match db.constraint() {
            Some(EMAIL_CONSTRAINT) => return StoreError::EmailTaken,
            Some(USERNAME_CONSTRAINT) => return StoreError::UsernameTaken,
            _ => {}
        }
    }
    StoreError::Database(e)
}

fn not_found_on_missing(row: Option<AccountRow>) -> Result<Account, StoreError> {
    row.ok_or(StoreError::NotFound)?.try_into()
}

/// Account store over a shared `PgPool`.
#[derive(Debug, Clone)]
pub struct PgAccountStore {
    pool: PgPool,
}

impl PgAccountStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn fetch_one_where(&self, column: &str, value: &str) -> Result<Account, StoreError> {
        let sql = format!("{SELECT_COLUMNS} WHERE {column} = $1");
        let row = sqlx::query_as::<_, AccountRow>(&sql)
            .bind(value)
            .fetch_optional(&self.pool)
            .await?;
        not_found_on_missing(row)
    }
}

#[async_trait]
impl AccountStore for PgAccountStore {
    async fn create(&self, account: NewAccount) -> Result<Account, StoreError> {
        let row = sqlx::query_as::<_, AccountRow>(
            "INSERT INTO users \
               (id, email, username, password_hash, first_name, last_name, is_active, role, \
                created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, now(), now()) \
             RETURNING id, email, username, password_hash, first_name, last_name, \
                       is_active, role, created_at, updated_at",
        )
        .bind(uuidv7())
        .bind(&account.email)
        .bind(&account.username)
        .bind(&account.password_hash)
        .bind(&account.first_name)
        .bind(&account.last_name)
        .bind(account.is_active)
        .bind(account.role.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(map_write_error)?;
        row.try_into()
    }

    async fn get_by_id(&self, id: Uuid) -> Result<Account, StoreError> {
        let sql = format!("{SELECT_COLUMNS} WHERE id = $1");
        let row = sqlx::query_as::<_, AccountRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        not_found_on_missing(row)
    }

    async fn get_by_email(&self, email: &str) -> Result<Account, StoreError> {
        self.fetch_one_where("email", email).await
    }

    async fn get_by_username(&self, username: &str) -> Result<Account, StoreError> {
        self.fetch_one_where("username", username).await
    }

    async fn get_all(&self, limit: i64, offset: i64) -> Result<Vec<Account>, StoreError> {
        let sql = format!("{SELECT_COLUMNS} ORDER BY created_at DESC, id DESC LIMIT $1 OFFSET $2");
        let rows = sqlx::query_as::<_, AccountRow>(&sql)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(Account::try_from).collect()
    }

    async fn update(&self, id: Uuid, account: &Account) -> Result<(), StoreError> {
        let result = sqlx::query(
            "UPDATE users SET email = $2, username = $3, password_hash = $4, first_name = $5, \
               last_name = $6, is_active = $7, role = $8, updated_at = $9 \
             WHERE id = $1",
        )
        .bind(id)
        .bind(&account.email)
        .bind(&account.username)
        .bind(&account.password_hash)
        .bind(&account.first_name)
        .bind(&account.last_name)
        .bind(account.is_active)
        .bind(account.role.as_str())
        .bind(account.updated_at)
        .execute(&self.pool)
        .await
        .map_err(map_write_error)?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn count(&self) -> Result<i64, StoreError> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}
