//! Liveness endpoint.

use chrono::Utc;

use crate::models::HealthResponse;
use crate::response::ApiResponse;

/// `GET /health`: always `ok` while the process is serving.
pub async fn health_handler() -> ApiResponse<HealthResponse> {
    ApiResponse::ok(HealthResponse {
        status: "ok".into(),
        timestamp: Utc::now().timestamp(),
    })
}
