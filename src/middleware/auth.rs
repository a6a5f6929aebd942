use std::net::SocketAddr;

use axum::extract::{ConnectInfo, Request, State};
use axum::http::header::AUTHORIZATION;
use axum::middleware::Next;
use axum::response::Response;
use axum::Extension;
use jsonwebtoken::{decode, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::services::presence;
use crate::state::AppState;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User id, as a string.
    pub sub: String,
    pub username: String,
    pub token_version: i32,
    pub iat: i64,
    pub exp: i64,
}

/// The authenticated caller, attached as a request extension by
/// [`require_auth`].
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub id: i64,
    pub username: String,
    pub is_admin: bool,
}

/// Validate the bearer token, load the account, and record the caller as
/// seen. Tokens issued before the account's current `token_version` are
/// rejected, which is how logout-everywhere and admin revocation work.
pub async fn require_auth(
    State(state): State<AppState>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .ok_or(AppError::Unauthorized)?;

    let claims = decode::<Claims>(
        token,
        &DecodingKey::from_secret(state.config.jwt.secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|_| AppError::Unauthorized)?
    .claims;

    let user_id: i64 = claims.sub.parse().map_err(|_| AppError::Unauthorized)?;

    let row: Option<(String, bool, i32)> = sqlx::query_as(
        "SELECT username, is_admin, token_version FROM users WHERE id = $1",
    )
    .bind(user_id)
    .fetch_optional(&state.db.pg)
    .await?;

    let (username, is_admin, token_version) = row.ok_or(AppError::Unauthorized)?;
    if claims.token_version != token_version {
        return Err(AppError::Unauthorized);
    }

    let address = connect_info
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string());
    if let Err(e) = presence::touch_connection(&state.db, user_id, "http", &address).await {
        tracing::warn!(user_id, error = %e, "failed to record connection");
    }

    request.extensions_mut().insert(CurrentUser {
        id: user_id,
        username,
        is_admin,
    });

    Ok(next.run(request).await)
}

/// Reject non-admin callers. Must run after [`require_auth`].
pub async fn require_admin(
    Extension(current): Extension<CurrentUser>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    if !current.is_admin {
        return Err(AppError::Forbidden);
    }
    Ok(next.run(request).await)
}
