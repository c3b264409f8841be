use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;

use jones_shared::errors::{AppError, AppResult, ErrorCode};
use jones_shared::types::auth::AuthUser;
use jones_shared::types::ApiResponse;

use crate::models::{Reaction, ReactionType};
use crate::AppState;

use super::blocking;

/// The actor always comes from the token, never from the body.
#[derive(Debug, Deserialize)]
pub struct SwipeRequest {
    pub matched_user_id: Uuid,
    #[serde(rename = "type")]
    pub reaction_type: ReactionType,
}

pub async fn swipe(
    user: AuthUser,
    State(state): State<AppState>,
    Json(req): Json<SwipeRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<Reaction>>)> {
    if req.matched_user_id == user.id {
        return Err(AppError::new(ErrorCode::CannotSwipeSelf, "cannot swipe on yourself"));
    }

    let matching = state.matching.clone();
    let reaction = blocking(move || matching.swipe(user.id, req.matched_user_id, req.reaction_type)).await?;

    let message = if reaction.is_matched() { "it's a match" } else { "swipe recorded" };
    Ok((StatusCode::CREATED, Json(ApiResponse::ok_with_message(reaction, message))))
}

/// GET /api/v1/reactions/likes - who liked the caller (see_likes plans only)
pub async fn likes(user: AuthUser, State(state): State<AppState>) -> AppResult<Json<ApiResponse<Vec<Reaction>>>> {
    let matching = state.matching.clone();
    let likes = blocking(move || matching.see_likes(user.id)).await?;
    Ok(Json(ApiResponse::ok(likes)))
}
