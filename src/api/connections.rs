use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use serde::Deserialize;
use validator::Validate;

use crate::error::{AppError, Result};
use crate::middleware::auth::CurrentUser;
use crate::models::Connection;
use crate::services::presence;
use crate::state::AppState;

const DEFAULT_WINDOW_MINUTES: i64 = 10;
const MAX_WINDOW_MINUTES: i64 = 1440;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/upsert", post(upsert))
        .route("/", get(list))
}

#[derive(Debug, Deserialize, Validate)]
struct UpsertRequest {
    peer_id: Option<i64>,
    #[validate(length(min = 1, max = 32))]
    transport: String,
    #[validate(length(min = 1, max = 128))]
    address: String,
    last_seen_ms: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct ListQuery {
    minutes: Option<i64>,
}

/// Clients report their own links (mesh peers, relays) here.
async fn upsert(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Json(payload): Json<UpsertRequest>,
) -> Result<StatusCode> {
    payload
        .validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    presence::upsert_connection(
        &state.db,
        current.id,
        payload.peer_id,
        &payload.transport,
        &payload.address,
        payload.last_seen_ms,
    )
    .await?;

    Ok(StatusCode::NO_CONTENT)
}

/// Recently active connections across all users. Admin only.
async fn list(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<Connection>>> {
    if !current.is_admin {
        return Err(AppError::Forbidden);
    }

    let minutes = query
        .minutes
        .unwrap_or(DEFAULT_WINDOW_MINUTES)
        .clamp(1, MAX_WINDOW_MINUTES);
    let connections = presence::list_connections(&state.db, minutes).await?;

    Ok(Json(connections))
}
