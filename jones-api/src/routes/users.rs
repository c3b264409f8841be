use axum::extract::{Query, State};
use axum::Json;

use jones_shared::errors::AppResult;
use jones_shared::types::auth::AuthUser;
use jones_shared::types::{ApiResponse, Paginated, PaginationParams};

use crate::models::UserProfile;
use crate::AppState;

use super::blocking;

/// GET /api/v1/users - candidates the caller has not swiped yet
pub async fn feed(
    user: AuthUser,
    State(state): State<AppState>,
    Query(params): Query<PaginationParams>,
) -> AppResult<Json<ApiResponse<Paginated<UserProfile>>>> {
    let accounts = state.accounts.clone();
    let page = blocking(move || accounts.feed(user.id, &params)).await?;
    Ok(Json(ApiResponse::ok(page)))
}

pub async fn me(user: AuthUser, State(state): State<AppState>) -> AppResult<Json<ApiResponse<UserProfile>>> {
    let accounts = state.accounts.clone();
    let profile = blocking(move || accounts.profile(user.id)).await?;
    Ok(Json(ApiResponse::ok(profile)))
}
