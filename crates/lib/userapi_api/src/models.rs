//! API request and response models.
//!
//! Request bodies default missing fields to empty so that every problem is
//! reported by validation, field by field, instead of by the JSON decoder.

use std::borrow::Cow;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use userapi_core::accounts::{AccountPatch, AuthOutcome, SignUp};
use userapi_core::models::account::Account;
use validator::{Validate, ValidateEmail, ValidationError, ValidationErrors};

fn invalid(code: &'static str, message: &'static str) -> ValidationError {
    let mut err = ValidationError::new(code);
    err.message = Some(Cow::Borrowed(message));
    err
}

fn valid_email(value: &str) -> Result<(), ValidationError> {
    if value.is_empty() {
        return Err(invalid("required", "email is required"));
    }
    if !value.validate_email() {
        return Err(invalid("email", "email must be a valid email address"));
    }
    Ok(())
}

/// 3 to 20 ASCII letters or digits.
fn valid_username(value: &str) -> Result<(), ValidationError> {
    let len = value.chars().count();
    if !(3..=20).contains(&len) {
        return Err(invalid(
            "length",
            "username must be between 3 and 20 characters long",
        ));
    }
    if !value.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(invalid(
            "alphanumeric",
            "username must contain only alphanumeric characters",
        ));
    }
    Ok(())
}

/// One human-readable message per failing field, ordered by field name.
pub fn validation_messages(errors: &ValidationErrors) -> Vec<String> {
    let mut fields: Vec<_> = errors.field_errors().into_iter().collect();
    fields.sort_by(|a, b| a.0.cmp(&b.0));
    fields
        .into_iter()
        .filter_map(|(field, errs)| {
            errs.first().map(|e| match &e.message {
                Some(message) => message.to_string(),
                None => format!("{field} is invalid"),
            })
        })
        .collect()
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, Validate)]
#[serde(default)]
pub struct SignUpRequest {
    #[validate(custom(function = "valid_email"))]
    pub email: String,

    #[validate(custom(function = "valid_username"))]
    pub username: String,

    #[validate(length(
        min = 8,
        max = 100,
        message = "password must be between 8 and 100 characters long"
    ))]
    pub password: String,

    #[validate(length(
        min = 1,
        max = 50,
        message = "first_name must be between 1 and 50 characters long"
    ))]
    pub first_name: String,

    #[validate(length(
        min = 1,
        max = 50,
        message = "last_name must be between 1 and 50 characters long"
    ))]
    pub last_name: String,
}

impl From<SignUpRequest> for SignUp {
    fn from(req: SignUpRequest) -> Self {
        Self {
            email: req.email,
            username: req.username,
            password: req.password,
            first_name: req.first_name,
            last_name: req.last_name,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, Validate)]
#[serde(default)]
pub struct SignInRequest {
    #[validate(custom(function = "valid_email"))]
    pub email: String,

    #[validate(length(min = 1, message = "password is required"))]
    pub password: String,
}

/// Partial profile update. Email and password are not updatable here.
#[derive(Debug, Clone, Default, Deserialize, Serialize, Validate)]
#[serde(default)]
pub struct UpdateUserRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(
        min = 1,
        max = 50,
        message = "first_name must be between 1 and 50 characters long"
    ))]
    pub first_name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(
        min = 1,
        max = 50,
        message = "last_name must be between 1 and 50 characters long"
    ))]
    pub last_name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(custom(function = "valid_username"))]
    pub username: Option<String>,
}

impl From<UpdateUserRequest> for AccountPatch {
    fn from(req: UpdateUserRequest) -> Self {
        Self {
            first_name: req.first_name,
            last_name: req.last_name,
            username: req.username,
        }
    }
}

/// Public view of an account. Never includes the password hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserResponse {
    pub id: String,
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub is_active: bool,
    pub role: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Account> for UserResponse {
    fn from(a: Account) -> Self {
        Self {
            id: a.id.to_string(),
            email: a.email,
            username: a.username,
            first_name: a.first_name,
            last_name: a.last_name,
            is_active: a.is_active,
            role: a.role.to_string(),
            created_at: a.created_at,
            updated_at: a.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: UserResponse,
}

impl From<AuthOutcome> for AuthResponse {
    fn from(out: AuthOutcome) -> Self {
        Self {
            token: out.token,
            user: out.account.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserListResponse {
    pub users: Vec<UserResponse>,
    pub limit: i64,
    pub offset: i64,
    pub total: i64,
}

/// Raw pagination query. Unparseable values fall back to the defaults.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListUsersQuery {
    pub limit: Option<String>,
    pub offset: Option<String>,
}

impl ListUsersQuery {
    fn parse(raw: Option<&str>) -> i64 {
        raw.and_then(|v| v.trim().parse().ok()).unwrap_or(0)
    }

    pub fn limit(&self) -> i64 {
        Self::parse(self.limit.as_deref())
    }

    pub fn offset(&self) -> i64 {
        Self::parse(self.offset.as_deref())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: Cow<'static, str>,
    pub timestamp: i64,
}
