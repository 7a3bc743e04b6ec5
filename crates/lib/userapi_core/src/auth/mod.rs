//! Authentication primitives.
//!
//! Provides password hashing and identity-token management. Neither touches
//! storage; the account service composes them with the account store.

pub mod jwt;
pub mod password;

use thiserror::Error;

/// Authentication errors.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Password did not match, or the stored hash could not be checked.
    #[error("Invalid credentials")]
    CredentialError,

    /// Any parse, signature, algorithm, issuer or time-window failure.
    #[error("Invalid token")]
    InvalidToken,

    /// Token could not be signed (e.g. missing secret).
    #[error("Token error: {0}")]
    TokenError(String),

    #[error("Internal error: {0}")]
    Internal(String),
}
