use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::{AppError, Result};
use crate::middleware::auth::CurrentUser;
use crate::models::UserPublic;
use crate::services::auth_service::AuthService;
use crate::state::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 3, max = 64))]
    pub username: String,
    #[validate(length(min = 8, max = 128))]
    pub password: String,
    #[validate(length(min = 40, max = 4096))]
    pub public_key: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1))]
    pub username: String,
    #[validate(length(min = 1))]
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: &'static str,
    /// Token lifetime in minutes.
    pub expires_in: i64,
}

pub fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
}

pub fn protected_routes() -> Router<AppState> {
    Router::new().route("/me", get(me))
}

async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<UserPublic>)> {
    payload
        .validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let user = AuthService::register(&state.db, &payload.username, &payload.password).await?;

    if let Some(public_key) = payload.public_key.as_deref().map(str::trim) {
        sqlx::query("UPDATE users SET public_key = $1 WHERE id = $2")
            .bind(public_key)
            .bind(user.id)
            .execute(&state.db.pg)
            .await?;
    }

    tracing::info!(user_id = user.id, username = %user.username, "new account registered");

    Ok((StatusCode::CREATED, Json(UserPublic::from(&user))))
}

async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<TokenResponse>> {
    payload
        .validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let token = AuthService::authenticate(
        &state.db,
        &state.config,
        &payload.username,
        &payload.password,
    )
    .await?;

    Ok(Json(TokenResponse {
        access_token: token,
        token_type: "bearer",
        expires_in: state.config.jwt.expiry_minutes,
    }))
}

async fn me(Extension(current): Extension<CurrentUser>) -> Json<UserPublic> {
    Json(UserPublic {
        id: current.id,
        username: current.username,
        is_admin: current.is_admin,
    })
}
