//! Profile and user management handlers.

use axum::Extension;
use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use userapi_core::accounts::{Page, UPDATE_FORBIDDEN, authorize_mutation};

use crate::AppState;
use crate::error::AppResult;
use crate::extract::parse_valid;
use crate::middleware::auth::AuthenticatedUser;
use crate::models::{ListUsersQuery, UpdateUserRequest, UserListResponse, UserResponse};
use crate::response::ApiResponse;

/// `GET /api/v1/profile`: the caller's own record.
pub async fn profile_handler(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
) -> AppResult<ApiResponse<UserResponse>> {
    let account = state.service.get_account(&user.0.user_id).await?;
    Ok(ApiResponse::ok(account.into()))
}

/// `GET /api/v1/users/{id}`: any record by id.
pub async fn get_user_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<UserResponse>> {
    let account = state.service.get_account(&id).await?;
    Ok(ApiResponse::ok(account.into()))
}

/// `PUT /api/v1/users/{id}`: partial profile update, self or admin only.
///
/// The caller is checked before the body is read, so a caller without
/// permission gets 403 whatever the body holds.
pub async fn update_user_handler(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<String>,
    body: Bytes,
) -> AppResult<ApiResponse<UserResponse>> {
    authorize_mutation(&user.0, &id, UPDATE_FORBIDDEN)?;
    let body: UpdateUserRequest = parse_valid(&body)?;
    let account = state
        .service
        .update_account(&user.0, &id, body.into())
        .await?;
    Ok(ApiResponse::ok(account.into()))
}

/// `DELETE /api/v1/users/{id}`: self or admin only.
pub async fn delete_user_handler(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<()>> {
    state.service.delete_account(&user.0, &id).await?;
    Ok(ApiResponse::message("User deleted successfully"))
}

/// `GET /api/v1/admin/users?limit=&offset=`: newest first, admin only.
pub async fn list_users_handler(
    State(state): State<AppState>,
    Query(query): Query<ListUsersQuery>,
) -> AppResult<ApiResponse<UserListResponse>> {
    let page = Page::new(query.limit(), query.offset());
    let (accounts, total) = state.service.list_accounts(page).await?;
    Ok(ApiResponse::ok(UserListResponse {
        users: accounts.into_iter().map(UserResponse::from).collect(),
        limit: page.limit,
        offset: page.offset,
        total,
    }))
}
