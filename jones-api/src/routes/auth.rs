use axum::extract::State;
use axum::Json;
use chrono::NaiveDate;
use serde::Deserialize;
use validator::Validate;

use jones_shared::errors::{AppError, AppResult, ErrorCode};
use jones_shared::types::auth::TokenPair;
use jones_shared::types::ApiResponse;

use crate::models::{Gender, Preference};
use crate::services::account_service::{NewAccount, Session};
use crate::AppState;

use super::blocking;

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 1, max = 100, message = "name is required"))]
    pub name: String,
    #[validate(email(message = "invalid email format"), length(max = 100))]
    pub email: String,
    #[validate(length(max = 100))]
    pub password: String,
    #[serde(default)]
    #[validate(length(max = 500, message = "bio must be at most 500 characters"))]
    pub bio: String,
    pub gender: Gender,
    pub preference: Preference,
    pub date_of_birth: NaiveDate,
    #[validate(length(min = 1, max = 5, message = "between 1 and 5 images are required"))]
    pub images: Vec<String>,
}

impl From<RegisterRequest> for NewAccount {
    fn from(req: RegisterRequest) -> Self {
        Self {
            name: req.name,
            email: req.email,
            password: req.password,
            bio: req.bio,
            gender: req.gender,
            preference: req.preference,
            birth_date: req.date_of_birth,
            images: req.images,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

fn validation_error(e: validator::ValidationErrors) -> AppError {
    AppError::new(ErrorCode::ValidationError, e.to_string())
}

pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> AppResult<Json<ApiResponse<Session>>> {
    req.validate().map_err(validation_error)?;

    let accounts = state.accounts.clone();
    let session = blocking(move || accounts.register(req.into())).await?;
    Ok(Json(ApiResponse::ok_with_message(session, "registered")))
}

pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> AppResult<Json<ApiResponse<Session>>> {
    let accounts = state.accounts.clone();
    let session = blocking(move || accounts.login(&req.email, &req.password)).await?;
    Ok(Json(ApiResponse::ok(session)))
}

pub async fn refresh(
    State(state): State<AppState>,
    Json(req): Json<RefreshRequest>,
) -> AppResult<Json<ApiResponse<TokenPair>>> {
    let accounts = state.accounts.clone();
    let tokens = blocking(move || accounts.refresh(&req.refresh_token)).await?;
    Ok(Json(ApiResponse::ok(tokens)))
}
