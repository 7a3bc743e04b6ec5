//! # userapi_api
//!
//! HTTP API library for userapi.

pub mod config;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod response;

use std::any::Any as PanicPayload;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::extract::Request;
use axum::http::{HeaderName, Method, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;
use userapi_core::accounts::AccountService;
use userapi_core::auth::jwt::TokenManager;
use userapi_core::auth::password::PasswordHasher;
use userapi_core::store::AccountStore;

use crate::config::ApiConfig;
use crate::error::AppError;
use crate::handlers::{auth, health, users};

/// Header carrying the per-request id, set when the client sends none.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Shared application state passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Account operations, backed by the configured store.
    pub service: Arc<AccountService>,
    /// API configuration.
    pub config: ApiConfig,
}

impl AppState {
    /// Wire the account service from `config` over `store`.
    pub fn new(store: Arc<dyn AccountStore>, config: ApiConfig) -> Self {
        let hasher = PasswordHasher::new(config.bcrypt_cost);
        let tokens = TokenManager::new(config.jwt_secret.as_bytes(), config.token_lifetime());
        let service = AccountService::new(store, hasher, tokens)
            .with_store_timeout(config.store_timeout());
        Self {
            service: Arc::new(service),
            config,
        }
    }
}

/// Builds the Axum router with all routes and shared state.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            header::ORIGIN,
            header::CONTENT_TYPE,
            header::CONTENT_LENGTH,
            header::AUTHORIZATION,
        ])
        .expose_headers([
            HeaderName::from_static("content-length"),
            HeaderName::from_static(REQUEST_ID_HEADER),
        ])
        .max_age(Duration::from_secs(12 * 60 * 60));

    // Public routes (no auth required)
    let public = Router::new()
        .route("/health", get(health::health_handler))
        .route("/api/v1/auth/signup", post(auth::sign_up_handler))
        .route("/api/v1/auth/signin", post(auth::sign_in_handler));

    // Admin routes: role check runs inside the auth layer below.
    let admin = Router::new()
        .route("/api/v1/admin/users", get(users::list_users_handler))
        .route_layer(axum::middleware::from_fn(middleware::auth::require_admin));

    // Protected routes (require auth)
    let protected = Router::new()
        .route("/api/v1/profile", get(users::profile_handler))
        .route(
            "/api/v1/users/{id}",
            get(users::get_user_handler)
                .put(users::update_user_handler)
                .delete(users::delete_user_handler),
        )
        .merge(admin)
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::require_auth,
        ));

    Router::new()
        .merge(public)
        .merge(protected)
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::rate_limit::rate_limit,
        ))
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TraceLayer::new_for_http().make_span_with(request_span))
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(cors)
        .with_state(state)
}

fn request_span(request: &Request) -> tracing::Span {
    let request_id = request
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    tracing::info_span!(
        "request",
        method = %request.method(),
        uri = %request.uri(),
        request_id,
    )
}

/// A panicking handler becomes the generic 500 envelope.
fn panic_response(payload: Box<dyn PanicPayload + Send + 'static>) -> Response {
    let detail = payload
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| payload.downcast_ref::<&str>().copied())
        .unwrap_or("handler panicked");
    AppError::Internal(format!("panic: {detail}")).into_response()
}
