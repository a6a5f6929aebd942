use axum::extract::{Path, Query, State};
use axum::http::header::{CACHE_CONTROL, ETAG, IF_NONE_MATCH};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, put};
use axum::{Extension, Json, Router};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use sqlx::FromRow;
use validator::Validate;

use crate::error::{AppError, Result};
use crate::middleware::auth::CurrentUser;
use crate::models::UserPublic;
use crate::state::AppState;

const DEFAULT_LIST_LIMIT: i64 = 20;
const MAX_LIST_LIMIT: i64 = 100;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_users))
        .route("/directory", get(directory))
        .route("/me/public_key", put(set_my_public_key).get(get_my_public_key))
        .route("/:id/public_key", get(get_public_key))
}

#[derive(Debug, Deserialize, Validate)]
struct PublicKeyRequest {
    #[validate(length(min = 40, max = 4096))]
    public_key: String,
}

#[derive(Debug, Serialize)]
struct PublicKeyResponse {
    user_id: i64,
    public_key: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ListQuery {
    q: Option<String>,
    limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct DirectoryQuery {
    q: Option<String>,
    #[serde(default)]
    only_with_key: bool,
    limit: Option<i64>,
}

#[derive(Debug, Serialize, FromRow)]
struct DirectoryEntry {
    id: i64,
    username: String,
    public_key: Option<String>,
}

async fn set_my_public_key(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Json(payload): Json<PublicKeyRequest>,
) -> Result<Json<PublicKeyResponse>> {
    let key = payload.public_key.trim().to_string();
    let trimmed = PublicKeyRequest { public_key: key };
    trimmed
        .validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    sqlx::query("UPDATE users SET public_key = $1 WHERE id = $2")
        .bind(&trimmed.public_key)
        .bind(current.id)
        .execute(&state.db.pg)
        .await?;

    Ok(Json(PublicKeyResponse {
        user_id: current.id,
        public_key: Some(trimmed.public_key),
    }))
}

async fn get_my_public_key(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
) -> Result<Json<PublicKeyResponse>> {
    let (public_key,): (Option<String>,) =
        sqlx::query_as("SELECT public_key FROM users WHERE id = $1")
            .bind(current.id)
            .fetch_one(&state.db.pg)
            .await?;

    Ok(Json(PublicKeyResponse {
        user_id: current.id,
        public_key,
    }))
}

async fn get_public_key(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
) -> Result<Json<PublicKeyResponse>> {
    let row: Option<(Option<String>,)> =
        sqlx::query_as("SELECT public_key FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_optional(&state.db.pg)
            .await?;

    let (public_key,) = row.ok_or_else(|| AppError::NotFound("user not found".into()))?;

    Ok(Json(PublicKeyResponse {
        user_id,
        public_key,
    }))
}

/// Other users, optionally filtered by a username fragment.
async fn list_users(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<UserPublic>>> {
    let limit = query
        .limit
        .unwrap_or(DEFAULT_LIST_LIMIT)
        .clamp(1, MAX_LIST_LIMIT);
    let pattern = query
        .q
        .map(|q| format!("%{}%", q.trim()))
        .unwrap_or_else(|| "%".to_string());

    let users = sqlx::query_as::<_, UserPublic>(
        r#"
        SELECT id, username, is_admin FROM users
        WHERE id <> $1 AND username ILIKE $2
        ORDER BY username
        LIMIT $3
        "#,
    )
    .bind(current.id)
    .bind(pattern)
    .bind(limit)
    .fetch_all(&state.db.pg)
    .await?;

    Ok(Json(users))
}

/// Full user directory with public keys. The body is fingerprinted so
/// clients can poll cheaply with `If-None-Match`.
async fn directory(
    State(state): State<AppState>,
    Query(query): Query<DirectoryQuery>,
    headers: HeaderMap,
) -> Result<Response> {
    let limit = query
        .limit
        .unwrap_or(MAX_LIST_LIMIT)
        .clamp(1, MAX_LIST_LIMIT);
    let pattern = query
        .q
        .map(|q| format!("%{}%", q.trim()))
        .unwrap_or_else(|| "%".to_string());

    let entries = sqlx::query_as::<_, DirectoryEntry>(
        r#"
        SELECT id, username, public_key FROM users
        WHERE username ILIKE $1
          AND ($2 = FALSE OR public_key IS NOT NULL)
        ORDER BY username
        LIMIT $3
        "#,
    )
    .bind(pattern)
    .bind(query.only_with_key)
    .bind(limit)
    .fetch_all(&state.db.pg)
    .await?;

    let body = serde_json::to_string(&entries)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("directory serialization: {e}")))?;
    let etag = directory_etag(&body);

    if headers
        .get(IF_NONE_MATCH)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value == etag)
    {
        return Ok((
            StatusCode::NOT_MODIFIED,
            [(ETAG, etag), (CACHE_CONTROL, "private, max-age=60".into())],
        )
            .into_response());
    }

    Ok((
        [
            (ETAG, etag),
            (CACHE_CONTROL, "private, max-age=60".into()),
            (
                axum::http::header::CONTENT_TYPE,
                "application/json".into(),
            ),
        ],
        body,
    )
        .into_response())
}

/// Weak ETag over the response body.
fn directory_etag(body: &str) -> String {
    let digest = Sha256::digest(body.as_bytes());
    format!("W/\"{}\"", hex::encode(digest))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn etag_is_stable_for_equal_bodies() {
        let a = directory_etag(r#"[{"id":1}]"#);
        let b = directory_etag(r#"[{"id":1}]"#);
        assert_eq!(a, b);
        assert!(a.starts_with("W/\""));
        assert!(a.ends_with('"'));
    }

    #[test]
    fn etag_changes_with_the_body() {
        assert_ne!(directory_etag(r#"[{"id":1}]"#), directory_etag(r#"[{"id":2}]"#));
    }
}
