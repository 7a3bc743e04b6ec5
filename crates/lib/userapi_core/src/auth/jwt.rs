//! Identity token issuance and validation.
//!
//! Tokens are HMAC-signed JWTs. Validation accepts only the HMAC family
//! (HS256/HS384/HS512) and reports every failure as the same
//! [`AuthError::InvalidToken`].

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use tracing::debug;

use super::AuthError;
use crate::models::account::Account;
use crate::models::auth::TokenClaims;

/// Issuer tag stamped into every token.
pub const ISSUER: &str = "userapi";

/// Default token lifetime: 24 hours.
pub const DEFAULT_TOKEN_LIFETIME_HOURS: i64 = 24;

/// Algorithm used when signing.
const SIGNING_ALGORITHM: Algorithm = Algorithm::HS256;

/// Issues and validates signed, time-bounded identity tokens.
#[derive(Clone)]
pub struct TokenManager {
    encoding: EncodingKey,
    decoding: DecodingKey,
    has_secret: bool,
    lifetime: Duration,
}

impl fmt::Debug for TokenManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenManager")
            .field("lifetime", &self.lifetime)
            .finish_non_exhaustive()
    }
}

impl TokenManager {
    pub fn new(secret: &[u8], lifetime: Duration) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            has_secret: !secret.is_empty(),
            lifetime,
        }
    }

    pub fn lifetime(&self) -> Duration {
        self.lifetime
    }

    /// Issue a token for `account`, valid from now for the configured lifetime.
    pub fn issue(&self, account: &Account) -> Result<String, AuthError> {
        self.issue_at(account, Utc::now())
    }

    /// Issue a token as if the current time were `now`.
    pub fn issue_at(&self, account: &Account, now: DateTime<Utc>) -> Result<String, AuthError> {
        if !self.has_secret {
            return Err(AuthError::TokenError("signing secret is empty".into()));
        }
        let expires = now
            .checked_add_signed(self.lifetime)
            .ok_or_else(|| AuthError::TokenError("token expiry out of range".into()))?;
        let issued = now.timestamp();
        let claims = TokenClaims {
            sub: account.id.to_string(),
            email: account.email.clone(),
            username: account.username.clone(),
            role: account.role.as_str().to_string(),
            iss: ISSUER.to_string(),
            iat: issued,
            nbf: issued,
            exp: expires.timestamp(),
        };
        encode(&Header::new(SIGNING_ALGORITHM), &claims, &self.encoding)
            .map_err(|e| AuthError::TokenError(format!("jwt encode: {e}")))
    }

    /// Validate a token against the current time.
    pub fn validate(&self, token: &str) -> Result<TokenClaims, AuthError> {
        self.validate_at(token, Utc::now().timestamp())
    }

    /// Validate a token against `now` (unix seconds).
    ///
    /// Valid iff the signature verifies with an HMAC algorithm, the issuer
    /// matches, and `nbf <= now <= exp`.
    pub fn validate_at(&self, token: &str, now: i64) -> Result<TokenClaims, AuthError> {
        let data = decode::<TokenClaims>(token, &self.decoding, &validation()).map_err(|e| {
            debug!(error = %e, "token rejected");
            AuthError::InvalidToken
        })?;
        let claims = data.claims;
        if now < claims.nbf || now > claims.exp {
            debug!(now, nbf = claims.nbf, exp = claims.exp, "token outside validity window");
            return Err(AuthError::InvalidToken);
        }
        Ok(claims)
    }
}

/// Signature, algorithm and issuer checks; the time window is checked by hand
/// so that it can be evaluated against an explicit clock.
fn validation() -> Validation {
    let mut validation = Validation::new(SIGNING_ALGORITHM);
    validation.algorithms = vec![Algorithm::HS256, Algorithm::HS384, Algorithm::HS512];
    validation.validate_exp = false;
    validation.validate_nbf = false;
    validation.set_issuer(&[ISSUER]);
    validation.set_required_spec_claims(&["exp", "nbf", "iat", "iss", "sub"]);
    validation
}
