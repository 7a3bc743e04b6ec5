//! Account service: sign-up, sign-in and profile operations.
//!
//! Composes the password hasher, token manager and account store. Every store
//! call is bounded by the configured operation timeout; a timed-out call is
//! reported as an internal error and must be treated as not applied.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use thiserror::Error;
use tracing::{debug, info};

use crate::auth::AuthError;
use crate::auth::jwt::TokenManager;
use crate::auth::password::PasswordHasher;
use crate::models::account::{Account, NewAccount, Role};
use crate::models::auth::Identity;
use crate::store::{AccountStore, StoreError};
use crate::uuid::parse_id;

/// Default bound for a single store operation.
pub const DEFAULT_STORE_TIMEOUT: Duration = Duration::from_secs(10);

/// Page size used when the caller asks for zero or fewer records.
pub const DEFAULT_PAGE_LIMIT: i64 = 10;

/// Largest page size served.
pub const MAX_PAGE_LIMIT: i64 = 100;

/// Account-level errors.
#[derive(Debug, Error)]
pub enum AccountError {
    #[error("user not found")]
    NotFound,

    #[error("user already exists")]
    EmailTaken,

    #[error("username already exists")]
    UsernameTaken,

    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("user account is inactive")]
    Inactive,

    #[error("invalid user ID")]
    InvalidId,

    #[error("invalid token")]
    InvalidToken,

    #[error("{0}")]
    Forbidden(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<StoreError> for AccountError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound => AccountError::NotFound,
            StoreError::EmailTaken => AccountError::EmailTaken,
            StoreError::UsernameTaken => AccountError::UsernameTaken,
            StoreError::Timeout => AccountError::Internal("store operation timed out".into()),
            StoreError::Database(e) => AccountError::Internal(e.to_string()),
        }
    }
}

impl From<AuthError> for AccountError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::CredentialError => AccountError::InvalidCredentials,
            AuthError::InvalidToken => AccountError::InvalidToken,
            AuthError::TokenError(msg) | AuthError::Internal(msg) => AccountError::Internal(msg),
        }
    }
}

pub type AccountResult<T> = Result<T, AccountError>;

/// Sign-up input, already validated for shape.
#[derive(Debug, Clone)]
pub struct SignUp {
    pub email: String,
    pub username: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
}

/// Profile fields that may be changed; `None` leaves the field untouched.
#[derive(Debug, Clone, Default)]
pub struct AccountPatch {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub username: Option<String>,
}

/// A freshly issued token together with the account it identifies.
#[derive(Debug, Clone)]
pub struct AuthOutcome {
    pub token: String,
    pub account: Account,
}

/// Normalised pagination bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub limit: i64,
    pub offset: i64,
}

impl Page {
    /// `limit` ends up in `1..=100` (10 when `<= 0`); `offset` is at least 0.
    pub fn new(limit: i64, offset: i64) -> Self {
        let limit = if limit <= 0 {
            DEFAULT_PAGE_LIMIT
        } else {
            limit.min(MAX_PAGE_LIMIT)
        };
        Self {
            limit,
            offset: offset.max(0),
        }
    }
}

impl Default for Page {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_LIMIT, 0)
    }
}

/// Rejection returned when a non-admin updates someone else's account.
pub const UPDATE_FORBIDDEN: &str = "You can only update your own profile";

/// Rejection returned when a non-admin deletes someone else's account.
pub const DELETE_FORBIDDEN: &str = "You can only delete your own profile";

/// Self-or-admin rule for mutating `target_id`; `denied` becomes the
/// `Forbidden` message.
///
/// The acting user id is compared to the raw target id by exact string
/// equality.
pub fn authorize_mutation(actor: &Identity, target_id: &str, denied: &str) -> AccountResult<()> {
    if actor.user_id == target_id || actor.is_admin() {
        Ok(())
    } else {
        Err(AccountError::Forbidden(denied.to_string()))
    }
}

pub struct AccountService {
    store: Arc<dyn AccountStore>,
    hasher: PasswordHasher,
    tokens: TokenManager,
    store_timeout: Duration,
}

impl AccountService {
    pub fn new(store: Arc<dyn AccountStore>, hasher: PasswordHasher, tokens: TokenManager) -> Self {
        Self {
            store,
            hasher,
            tokens,
            store_timeout: DEFAULT_STORE_TIMEOUT,
        }
    }

    pub fn with_store_timeout(mut self, timeout: Duration) -> Self {
        self.store_timeout = timeout;
        self
    }

    pub fn tokens(&self) -> &TokenManager {
        &self.tokens
    }

    async fn bounded<T>(
        &self,
        op: impl Future<Output = Result<T, StoreError>>,
    ) -> Result<T, StoreError> {
        tokio::time::timeout(self.store_timeout, op)
            .await
            .map_err(|_| StoreError::Timeout)?
    }

    async fn hash_password(&self, password: String) -> AccountResult<String> {
        let hasher = self.hasher;
        tokio::task::spawn_blocking(move || hasher.hash(&password))
            .await
            .map_err(|e| AccountError::Internal(format!("hash task: {e}")))?
            .map_err(AccountError::from)
    }

    async fn verify_password(&self, hash: String, password: String) -> AccountResult<()> {
        let hasher = self.hasher;
        tokio::task::spawn_blocking(move || hasher.verify(&hash, &password))
            .await
            .map_err(|e| AccountError::Internal(format!("verify task: {e}")))?
            .map_err(AccountError::from)
    }

    /// Look up an existing record; `NotFound` means the key is free.
    async fn is_taken(
        &self,
        lookup: impl Future<Output = Result<Account, StoreError>>,
    ) -> AccountResult<Option<Account>> {
        match self.bounded(lookup).await {
            Ok(account) => Ok(Some(account)),
            Err(StoreError::NotFound) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Create an account with role `user` and return it with a token.
    ///
    /// The email/username lookups only give early, specific errors; the store's
    /// unique constraints decide concurrent races.
    pub async fn sign_up(&self, req: SignUp) -> AccountResult<AuthOutcome> {
        if self.is_taken(self.store.get_by_email(&req.email)).await?.is_some() {
            return Err(AccountError::EmailTaken);
        }
        if self
            .is_taken(self.store.get_by_username(&req.username))
            .await?
            .is_some()
        {
            return Err(AccountError::UsernameTaken);
        }

        let password_hash = self.hash_password(req.password).await?;
        let account = self
            .bounded(self.store.create(NewAccount {
                email: req.email,
                username: req.username,
                password_hash,
                first_name: req.first_name,
                last_name: req.last_name,
                is_active: true,
                role: Role::User,
            }))
            .await?;

        let token = self.tokens.issue(&account)?;
        info!(user_id = %account.id, "account created");
        Ok(AuthOutcome { token, account })
    }

    /// Authenticate with email + password.
    ///
    /// Unknown email and wrong password produce the same error.
    pub async fn sign_in(&self, email: &str, password: &str) -> AccountResult<AuthOutcome> {
        let account = match self.bounded(self.store.get_by_email(email)).await {
            Ok(account) => account,
            Err(StoreError::NotFound) => return Err(AccountError::InvalidCredentials),
            Err(e) => return Err(e.into()),
        };

        self.verify_password(account.password_hash.clone(), password.to_string())
            .await?;

        if !account.is_active {
            return Err(AccountError::Inactive);
        }

        let token = self.tokens.issue(&account)?;
        info!(user_id = %account.id, "signed in");
        Ok(AuthOutcome { token, account })
    }

    /// Fetch an account by its textual id.
    pub async fn get_account(&self, id: &str) -> AccountResult<Account> {
        let id = parse_id(id).ok_or(AccountError::InvalidId)?;
        Ok(self.bounded(self.store.get_by_id(id)).await?)
    }

    /// One page of accounts, newest first, plus the total record count.
    pub async fn list_accounts(&self, page: Page) -> AccountResult<(Vec<Account>, i64)> {
        let accounts = self
            .bounded(self.store.get_all(page.limit, page.offset))
            .await?;
        let total = self.bounded(self.store.count()).await?;
        Ok((accounts, total))
    }

    /// Apply `patch` to the account `id` on behalf of `actor`.
    pub async fn update_account(
        &self,
        actor: &Identity,
        id: &str,
        patch: AccountPatch,
    ) -> AccountResult<Account> {
        authorize_mutation(actor, id, UPDATE_FORBIDDEN)?;
        let id = parse_id(id).ok_or(AccountError::InvalidId)?;

        let mut account = self.bounded(self.store.get_by_id(id)).await?;

        if let Some(first_name) = patch.first_name {
            account.first_name = first_name;
        }
        if let Some(last_name) = patch.last_name {
            account.last_name = last_name;
        }
        if let Some(username) = patch.username {
            if let Some(owner) = self.is_taken(self.store.get_by_username(&username)).await?
                && owner.id != id
            {
                return Err(AccountError::UsernameTaken);
            }
            account.username = username;
        }
        account.updated_at = Utc::now();

        self.bounded(self.store.update(id, &account)).await?;
        info!(user_id = %id, actor = %actor.user_id, "account updated");
        Ok(account)
    }

    /// Delete the account `id` on behalf of `actor`.
    pub async fn delete_account(&self, actor: &Identity, id: &str) -> AccountResult<()> {
        authorize_mutation(actor, id, DELETE_FORBIDDEN)?;
        let id = parse_id(id).ok_or(AccountError::InvalidId)?;

        self.bounded(self.store.delete(id)).await?;
        info!(user_id = %id, actor = %actor.user_id, "account deleted");
        Ok(())
    }

    /// Validate a bearer token and derive the request identity.
    pub fn authenticate(&self, token: &str) -> AccountResult<Identity> {
        let claims = self.tokens.validate(token)?;
        debug!(user_id = %claims.sub, "token accepted");
        Ok(claims.into())
    }
}
