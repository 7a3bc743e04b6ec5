//! API server configuration.
//!
//! Built once at startup and passed by value into [`crate::AppState::new`].
//! Nothing below this layer reads the process environment.

use std::ops::RangeInclusive;
use std::time::Duration;

use thiserror::Error;
use userapi_core::auth::jwt::DEFAULT_TOKEN_LIFETIME_HOURS;
use userapi_core::auth::password::DEFAULT_BCRYPT_COST;

/// Secret used when none is configured. Only acceptable for development.
pub const DEFAULT_JWT_SECRET: &str = "your-secret-key-change-this";

/// Accepted identity token lifetimes, in hours (up to ten years).
pub const TOKEN_LIFETIME_HOURS: RangeInclusive<i64> = 1..=87_600;

/// Work factors bcrypt accepts.
pub const BCRYPT_COSTS: RangeInclusive<u32> = 4..=31;

/// A configuration value outside its accepted range.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("JWT_EXPIRY_HOURS must be between 1 and 87600, got {0}")]
    TokenLifetime(i64),

    #[error("BCRYPT_COST must be between 4 and 31, got {0}")]
    BcryptCost(u32),
}

/// Configuration for the API server.
#[derive(Clone, Debug)]
pub struct ApiConfig {
    /// Deployment environment name (e.g. "development", "production").
    pub environment: String,
    /// TCP port for the HTTP listener.
    pub port: u16,
    /// PostgreSQL connection URL.
    pub database_url: String,
    /// Database name, overriding the one in `database_url`.
    pub database_name: String,
    /// JWT signing secret.
    pub jwt_secret: String,
    /// Identity token lifetime in hours.
    pub jwt_expiry_hours: i64,
    /// Log filter used when `RUST_LOG` is unset.
    pub log_level: String,
    /// Requests per minute. Accepted but not enforced.
    pub rate_limit_rpm: u32,
    /// bcrypt work factor.
    pub bcrypt_cost: u32,
    /// Maximum pooled database connections.
    pub db_max_connections: u32,
    /// Bound on a single store operation, in seconds.
    pub db_timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            environment: "development".into(),
            port: 8080,
            database_url: "postgres://localhost:5432/userapi".into(),
            database_name: "userapi".into(),
            jwt_secret: DEFAULT_JWT_SECRET.into(),
            jwt_expiry_hours: DEFAULT_TOKEN_LIFETIME_HOURS,
            log_level: "info".into(),
            rate_limit_rpm: 60,
            bcrypt_cost: DEFAULT_BCRYPT_COST,
            db_max_connections: 10,
            db_timeout_secs: 10,
        }
    }
}

impl ApiConfig {
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    /// Address to bind the HTTP listener on all interfaces.
    pub fn bind_addr(&self) -> String {
        format!("0.0.0.0:{}", self.port)
    }

    /// Reject values that would only fail later, at request time.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !TOKEN_LIFETIME_HOURS.contains(&self.jwt_expiry_hours) {
            return Err(ConfigError::TokenLifetime(self.jwt_expiry_hours));
        }
        if !BCRYPT_COSTS.contains(&self.bcrypt_cost) {
            return Err(ConfigError::BcryptCost(self.bcrypt_cost));
        }
        Ok(())
    }

    /// Token lifetime; saturates for hour counts chrono cannot represent, in
    /// which case issuing fails with an error.
    pub fn token_lifetime(&self) -> chrono::Duration {
        chrono::Duration::try_hours(self.jwt_expiry_hours).unwrap_or(chrono::Duration::MAX)
    }

    pub fn store_timeout(&self) -> Duration {
        Duration::from_secs(self.db_timeout_secs)
    }

    /// Whether the built-in development secret is still in use.
    pub fn uses_default_secret(&self) -> bool {
        self.jwt_secret == DEFAULT_JWT_SECRET
    }
}
