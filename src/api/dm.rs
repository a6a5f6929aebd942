use axum::extract::State;
use axum::routing::post;
use axum::{Extension, Json, Router};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::middleware::auth::CurrentUser;
use crate::rooms::canonical_dm_by_id;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new().route("/open", post(open_dm))
}

#[derive(Debug, Deserialize)]
struct OpenDmRequest {
    peer_id: i64,
}

#[derive(Debug, Serialize)]
struct OpenDmResponse {
    room_id: String,
}

/// Resolve the canonical DM room with a peer. Opening the same pair from
/// either side yields the same room id.
async fn open_dm(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Json(payload): Json<OpenDmRequest>,
) -> Result<Json<OpenDmResponse>> {
    let exists: Option<(i64,)> = sqlx::query_as("SELECT id FROM users WHERE id = $1")
        .bind(payload.peer_id)
        .fetch_optional(&state.db.pg)
        .await?;
    if exists.is_none() {
        return Err(AppError::NotFound("peer not found".into()));
    }

    let room_id = canonical_dm_by_id(current.id, payload.peer_id)?;

    Ok(Json(OpenDmResponse { room_id }))
}
