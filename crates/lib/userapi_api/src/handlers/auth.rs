//! Sign-up and sign-in handlers.

use axum::extract::State;

use crate::AppState;
use crate::error::AppResult;
use crate::extract::ValidJson;
use crate::models::{AuthResponse, SignInRequest, SignUpRequest};
use crate::response::ApiResponse;

/// `POST /api/v1/auth/signup`: create an account and return a token.
pub async fn sign_up_handler(
    State(state): State<AppState>,
    ValidJson(body): ValidJson<SignUpRequest>,
) -> AppResult<ApiResponse<AuthResponse>> {
    let outcome = state.service.sign_up(body.into()).await?;
    Ok(ApiResponse::created(outcome.into()))
}

/// `POST /api/v1/auth/signin`: authenticate with email + password.
pub async fn sign_in_handler(
    State(state): State<AppState>,
    ValidJson(body): ValidJson<SignInRequest>,
) -> AppResult<ApiResponse<AuthResponse>> {
    let outcome = state.service.sign_in(&body.email, &body.password).await?;
    Ok(ApiResponse::ok(outcome.into()))
}
