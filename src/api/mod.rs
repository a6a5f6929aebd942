pub mod admin;
pub mod auth;
pub mod connections;
pub mod dm;
pub mod messages;
pub mod presence;
pub mod users;

use axum::middleware::from_fn_with_state;
use axum::Router;

use crate::middleware::auth::require_auth;
use crate::state::AppState;

/// The full API surface. Everything except registration, login and the
/// health probe sits behind the bearer-token middleware.
pub fn routes(state: AppState) -> Router<AppState> {
    let protected = Router::new()
        .nest("/auth", auth::protected_routes())
        .nest("/users", users::routes())
        .nest("/rooms", messages::routes())
        .nest("/dm", dm::routes())
        .nest("/connections", connections::routes())
        .nest("/presence", presence::routes())
        .nest("/admin", admin::routes())
        .route_layer(from_fn_with_state(state, require_auth));

    Router::new()
        .nest("/auth", auth::public_routes())
        .merge(protected)
}
