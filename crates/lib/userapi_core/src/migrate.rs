//! Database migration support.
//!
//! Embeds the SQL migrations from `userapi_core/migrations/`. They create the
//! `users` table with its unique email and username constraints and are run
//! once at startup.

use sqlx::PgPool;

/// Run all embedded database migrations against the given pool.
pub async fn migrate(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}
