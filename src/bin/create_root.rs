//! One-shot bootstrap: ensure the `root` admin account exists.
//!
//! Run after migrations on a fresh database. Idempotent.

use sqlx::postgres::PgPoolOptions;

use offcom_api::services::auth_service::AuthService;

const ROOT_USERNAME: &str = "root";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();

    let database_url = std::env::var("DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE__URL"))
        .map_err(|_| anyhow::anyhow!("DATABASE_URL is not set"))?;

    let pool = PgPoolOptions::new()
        .max_connections(1)
        .connect(&database_url)
        .await?;
    sqlx::migrate!("./migrations").run(&pool).await?;

    let existing: Option<(i64, bool)> =
        sqlx::query_as("SELECT id, is_admin FROM users WHERE username = $1")
            .bind(ROOT_USERNAME)
            .fetch_optional(&pool)
            .await?;

    match existing {
        Some((id, true)) => {
            println!("root account already exists (id {id})");
        }
        Some((id, false)) => {
            sqlx::query("UPDATE users SET is_admin = TRUE WHERE id = $1")
                .bind(id)
                .execute(&pool)
                .await?;
            println!("existing root account (id {id}) granted admin");
        }
        None => {
            let password =
                std::env::var("ROOT_PASSWORD").unwrap_or_else(|_| "rootazerty".to_string());
            let hash = AuthService::hash_password(&password)?;

            let (id,): (i64,) = sqlx::query_as(
                r#"
                INSERT INTO users (username, password_hash, is_admin)
                VALUES ($1, $2, TRUE)
                RETURNING id
                "#,
            )
            .bind(ROOT_USERNAME)
            .bind(hash)
            .fetch_one(&pool)
            .await?;

            println!("root account created (id {id})");
            if std::env::var("ROOT_PASSWORD").is_err() {
                println!("warning: using the default password, change it");
            }
        }
    }

    Ok(())
}
