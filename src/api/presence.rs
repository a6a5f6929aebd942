use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;

use crate::error::Result;
use crate::services::presence::{self, PresenceEntry};
use crate::state::AppState;

const DEFAULT_WINDOW_MINUTES: i64 = 5;
const MAX_WINDOW_MINUTES: i64 = 1440;

pub fn routes() -> Router<AppState> {
    Router::new().route("/", get(board))
}

#[derive(Debug, Deserialize)]
struct PresenceQuery {
    /// Activity window: users seen within this many minutes count as online.
    minutes: Option<i64>,
}

async fn board(
    State(state): State<AppState>,
    Query(query): Query<PresenceQuery>,
) -> Result<Json<Vec<PresenceEntry>>> {
    let minutes = query
        .minutes
        .unwrap_or(DEFAULT_WINDOW_MINUTES)
        .clamp(1, MAX_WINDOW_MINUTES);

    Ok(Json(presence::presence(&state.db, minutes).await?))
}
