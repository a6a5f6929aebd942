use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::middleware::from_fn;
use axum::routing::{delete, get, post};
use axum::{Extension, Json, Router};

use crate::error::{AppError, Result};
use crate::middleware::auth::{require_admin, CurrentUser};
use crate::models::UserPublic;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/users", get(list_users))
        .route("/users/:id/promote", post(promote))
        .route("/users/:id/demote", post(demote))
        .route("/users/:id", delete(remove))
        .route_layer(from_fn(require_admin))
}

async fn list_users(State(state): State<AppState>) -> Result<Json<Vec<UserPublic>>> {
    let users = sqlx::query_as::<_, UserPublic>(
        "SELECT id, username, is_admin FROM users ORDER BY id",
    )
    .fetch_all(&state.db.pg)
    .await?;

    Ok(Json(users))
}

async fn promote(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
) -> Result<StatusCode> {
    let result = sqlx::query("UPDATE users SET is_admin = TRUE WHERE id = $1")
        .bind(user_id)
        .execute(&state.db.pg)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("user not found".into()));
    }

    tracing::info!(user_id, "user promoted to admin");
    Ok(StatusCode::NO_CONTENT)
}

/// Demotion also bumps `token_version` so outstanding admin tokens die
/// immediately rather than at expiry.
async fn demote(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(user_id): Path<i64>,
) -> Result<StatusCode> {
    if user_id == current.id {
        return Err(AppError::BadRequest(
            "admins cannot demote themselves".into(),
        ));
    }

    let result = sqlx::query(
        "UPDATE users SET is_admin = FALSE, token_version = token_version + 1 WHERE id = $1",
    )
    .bind(user_id)
    .execute(&state.db.pg)
    .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("user not found".into()));
    }

    tracing::info!(user_id, "user demoted from admin");
    Ok(StatusCode::NO_CONTENT)
}

async fn remove(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(user_id): Path<i64>,
) -> Result<StatusCode> {
    if user_id == current.id {
        return Err(AppError::BadRequest(
            "admins cannot delete themselves".into(),
        ));
    }

    let result = sqlx::query("DELETE FROM users WHERE id = $1")
        .bind(user_id)
        .execute(&state.db.pg)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("user not found".into()));
    }

    tracing::info!(user_id, "user deleted");
    Ok(StatusCode::NO_CONTENT)
}
