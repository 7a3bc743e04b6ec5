//! # userapi_core
//!
//! Core account domain logic for userapi: credential hashing, identity tokens,
//! account persistence, and the account service that composes them.

pub mod accounts;
pub mod auth;
pub mod migrate;
pub mod models;
pub mod store;
pub mod uuid;

/// Returns the crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
