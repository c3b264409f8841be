use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

use jones_shared::errors::AppResult;
use jones_shared::types::auth::AuthUser;
use jones_shared::types::ApiResponse;

use crate::models::SubscriptionPlan;
use crate::services::subscription_service::SubscribeOutcome;
use crate::AppState;

use super::blocking;

#[derive(Debug, Deserialize)]
pub struct SubscribeRequest {
    pub plan_id: i32,
}

#[derive(Debug, Serialize)]
pub struct PortalResponse {
    pub portal_url: String,
}

pub async fn list_plans(State(state): State<AppState>) -> AppResult<Json<ApiResponse<Vec<SubscriptionPlan>>>> {
    let subscriptions = state.subscriptions.clone();
    let plans = blocking(move || subscriptions.list_plans()).await?;
    Ok(Json(ApiResponse::ok(plans)))
}

pub async fn subscribe(
    user: AuthUser,
    State(state): State<AppState>,
    Json(req): Json<SubscribeRequest>,
) -> AppResult<Json<ApiResponse<SubscribeOutcome>>> {
    let outcome = state.subscriptions.subscribe(user.id, req.plan_id).await?;
    Ok(Json(ApiResponse::ok(outcome)))
}

pub async fn portal(user: AuthUser, State(state): State<AppState>) -> AppResult<Json<ApiResponse<PortalResponse>>> {
    let portal_url = state.subscriptions.customer_portal(user.id).await?;
    Ok(Json(ApiResponse::ok(PortalResponse { portal_url })))
}
