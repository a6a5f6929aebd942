use std::net::SocketAddr;
use std::path::Path;

use axum::routing::get;
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use offcom_api::api;
use offcom_api::config::Config;
use offcom_api::db::Database;
use offcom_api::services::encryption::{load_or_generate_key, EncryptionService};
use offcom_api::state::AppState;
use offcom_api::tasks;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "offcom_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load()?;

    let key = load_or_generate_key(Path::new(&config.encryption.key_file))?;
    let encryption = EncryptionService::new(&key);

    let db = Database::connect(&config).await?;
    db.run_migrations().await?;

    let state = AppState::new(db.clone(), config.clone(), encryption);

    tasks::spawn_message_purge(db, config.messages.ttl_minutes);

    let mut app = Router::new()
        .route("/health", get(health))
        .merge(api::routes(state.clone()));

    if Path::new(&config.ui.dir).is_dir() {
        tracing::info!(dir = %config.ui.dir, "serving static UI at /ui");
        app = app.nest_service("/ui", ServeDir::new(&config.ui.dir));
    }

    let app = app
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    tracing::info!("listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}

async fn health() -> &'static str {
    "ok"
}
