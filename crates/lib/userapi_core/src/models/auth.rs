//! Authentication domain models.

use serde::{Deserialize, Serialize};

use super::account::Role;

/// JWT claims embedded in identity tokens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Subject: account ID.
    pub sub: String,
    /// Account email.
    pub email: String,
    /// Account username.
    pub username: String,
    /// Account role (`user` or `admin`).
    pub role: String,
    /// Issuer tag.
    pub iss: String,
    /// Issued at (unix timestamp).
    pub iat: i64,
    /// Not before (unix timestamp).
    pub nbf: i64,
    /// Expiry (unix timestamp).
    pub exp: i64,
}

/// Request-scoped identity derived from a validated token.
///
/// Lives for exactly one request and is never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: String,
    pub email: String,
    pub role: String,
}

impl Identity {
    /// Whether the identity carries the literal `admin` role.
    pub fn is_admin(&self) -> bool {
        self.role == Role::ADMIN
    }
}

impl From<TokenClaims> for Identity {
    fn from(claims: TokenClaims) -> Self {
        Self {
            user_id: claims.sub,
            email: claims.email,
            role: claims.role,
        }
    }
}
