use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Extension, Json, Router};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::{AppError, Result};
use crate::middleware::auth::CurrentUser;
use crate::services::message_service::{MessageService, MessageView};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/my-rooms", get(my_rooms))
        .route("/:room_id/messages", get(list_messages).post(post_message))
}

#[derive(Debug, Deserialize, Validate)]
struct PostMessageRequest {
    #[validate(length(min = 1, max = 8192))]
    content: String,
}

#[derive(Debug, Deserialize)]
struct ListMessagesQuery {
    /// Only messages strictly newer than this unix-millisecond timestamp.
    since_ms: Option<i64>,
    limit: Option<i64>,
}

#[derive(Debug, Serialize)]
struct RoomList {
    rooms: Vec<String>,
}

async fn my_rooms(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
) -> Result<Json<RoomList>> {
    let rooms = MessageService::rooms_for_user(&state.db, current.id, &current.username).await?;
    Ok(Json(RoomList { rooms }))
}

async fn post_message(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(room_id): Path<String>,
    Json(payload): Json<PostMessageRequest>,
) -> Result<(StatusCode, Json<MessageView>)> {
    payload
        .validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let message = MessageService::post_message(
        &state.db,
        &state.encryption,
        &room_id,
        current.id,
        &current.username,
        &payload.content,
    )
    .await?;

    Ok((StatusCode::CREATED, Json(message)))
}

async fn list_messages(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(room_id): Path<String>,
    Query(query): Query<ListMessagesQuery>,
) -> Result<Json<Vec<MessageView>>> {
    let messages = MessageService::list_messages(
        &state.db,
        &state.encryption,
        &room_id,
        current.id,
        &current.username,
        query.since_ms,
        query.limit,
    )
    .await?;

    Ok(Json(messages))
}
