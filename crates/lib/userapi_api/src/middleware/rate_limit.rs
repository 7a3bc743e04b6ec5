//! Rate limiting placeholder.
//!
//! The configured requests-per-minute value is accepted and carried on every
//! request but nothing is throttled yet.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use tracing::trace;

use crate::AppState;

/// Pass-through middleware.
pub async fn rate_limit(State(state): State<AppState>, request: Request, next: Next) -> Response {
    trace!(
        rpm = state.config.rate_limit_rpm,
        path = %request.uri().path(),
        "rate limit not enforced"
    );
    next.run(request).await
}
