//! userapi HTTP server binary.
//!
//! Connects to PostgreSQL (or, with `--memory-store`, keeps accounts in
//! memory), applies migrations and serves the REST API until SIGINT or SIGTERM.

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use userapi_api::config::{ApiConfig, DEFAULT_JWT_SECRET, TOKEN_LIFETIME_HOURS};
use userapi_core::store::{AccountStore, MemoryAccountStore, PgAccountStore};

/// CLI arguments. Every flag can also be set from the environment.
#[derive(Parser, Debug)]
#[command(name = "userapi_server", about = "User account REST API server")]
struct Args {
    /// Deployment environment name.
    #[arg(long, env = "ENVIRONMENT", default_value = "development")]
    environment: String,

    /// Port to listen on.
    #[arg(long, env = "PORT", default_value_t = 8080)]
    port: u16,

    /// PostgreSQL connection URL.
    #[arg(
        long,
        env = "DATABASE_URL",
        default_value = "postgres://localhost:5432/userapi"
    )]
    database_url: String,

    /// Database name; overrides the one in the URL.
    #[arg(long, env = "DATABASE_NAME", default_value = "userapi")]
    database_name: String,

    /// HMAC secret for identity tokens.
    #[arg(long, env = "JWT_SECRET", default_value = DEFAULT_JWT_SECRET, hide_env_values = true)]
    jwt_secret: String,

    /// Identity token lifetime in hours.
    #[arg(
        long,
        env = "JWT_EXPIRY_HOURS",
        default_value_t = 24,
        value_parser = clap::value_parser!(i64).range(TOKEN_LIFETIME_HOURS)
    )]
    jwt_expiry_hours: i64,

    /// Log filter used when `RUST_LOG` is unset.
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Requests per minute per client. Accepted but not enforced.
    #[arg(long, env = "RATE_LIMIT_RPM", default_value_t = 60)]
    rate_limit_rpm: u32,

    /// bcrypt work factor (4..=31).
    #[arg(
        long,
        env = "BCRYPT_COST",
        default_value_t = 12,
        value_parser = clap::value_parser!(u32).range(4..=31)
    )]
    bcrypt_cost: u32,

    /// Maximum number of database connections in the pool.
    #[arg(long, env = "DB_MAX_CONNECTIONS", default_value_t = 10)]
    db_max_connections: u32,

    /// Bound on connection acquisition and each store operation, in seconds.
    #[arg(long, env = "DB_TIMEOUT_SECS", default_value_t = 10)]
    db_timeout_secs: u64,

    /// Keep accounts in process memory instead of PostgreSQL. Data is lost on
    /// exit.
    #[arg(long, env = "MEMORY_STORE", default_value_t = false)]
    memory_store: bool,
}

impl From<Args> for ApiConfig {
    fn from(args: Args) -> Self {
        Self {
            environment: args.environment,
            port: args.port,
            database_url: args.database_url,
            database_name: args.database_name,
            jwt_secret: args.jwt_secret,
            jwt_expiry_hours: args.jwt_expiry_hours,
            log_level: args.log_level,
            rate_limit_rpm: args.rate_limit_rpm,
            bcrypt_cost: args.bcrypt_cost,
            db_max_connections: args.db_max_connections,
            db_timeout_secs: args.db_timeout_secs,
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    let args = Args::parse();
    let memory_store = args.memory_store;
    let config = ApiConfig::from(args);
    config.validate()?;

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!(
        environment = %config.environment,
        port = config.port,
        database = %config.database_name,
        "starting userapi_server"
    );

    if config.uses_default_secret() && config.environment != "development" {
        warn!("JWT_SECRET is not set; using the built-in development secret");
    }

    let (store, pool) = if memory_store {
        warn!("using the in-memory account store; accounts are not persisted");
        (Arc::new(MemoryAccountStore::new()) as Arc<dyn AccountStore>, None)
    } else {
        let connect = config
            .database_url
            .parse::<PgConnectOptions>()?
            .database(&config.database_name);

        let pool = PgPoolOptions::new()
            .max_connections(config.db_max_connections)
            .acquire_timeout(Duration::from_secs(config.db_timeout_secs))
            .connect_with(connect)
            .await?;

        info!("running database migrations");
        userapi_core::migrate::migrate(&pool).await?;

        (Arc::new(PgAccountStore::new(pool.clone())) as Arc<dyn AccountStore>, Some(pool))
    };

    let bind_addr = config.bind_addr();
    let app = userapi_api::router(userapi_api::AppState::new(store, config));

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!(addr = %listener.local_addr()?, "REST API listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(pool) = pool {
        pool.close().await;
    }
    info!("shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("shutdown signal received, draining connections");
}
