use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use chrono::{Duration, Utc};
use jsonwebtoken::{encode, EncodingKey, Header};

use crate::config::Config;
use crate::db::Database;
use crate::error::AppError;
use crate::middleware::auth::Claims;
use crate::models::User;

pub struct AuthService;

impl AuthService {
    /// Create a new account with a hashed password. Duplicate usernames
    /// surface as a conflict.
    pub async fn register(
        db: &Database,
        username: &str,
        password: &str,
    ) -> Result<User, AppError> {
        let password_hash = Self::hash_password(password)?;

        let result = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (username, password_hash)
            VALUES ($1, $2)
            RETURNING id, username, password_hash, is_admin, token_version, public_key, created_at
            "#,
        )
        .bind(username)
        .bind(password_hash)
        .fetch_one(&db.pg)
        .await;

        match result {
            Ok(user) => Ok(user),
            Err(e) if is_unique_violation(&e) => {
                Err(AppError::Conflict("username already taken".into()))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Check credentials and mint an access token.
    pub async fn authenticate(
        db: &Database,
        config: &Config,
        username: &str,
        password: &str,
    ) -> Result<String, AppError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, password_hash, is_admin, token_version, public_key, created_at
            FROM users WHERE username = $1
            "#,
        )
        .bind(username)
        .fetch_optional(&db.pg)
        .await?
        .ok_or(AppError::Unauthorized)?;

        if !Self::verify_password(password, &user.password_hash)? {
            return Err(AppError::Unauthorized);
        }

        Self::generate_access_token(config, &user)
    }

    pub fn hash_password(password: &str) -> Result<String, AppError> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("password hashing failed: {e}")))?;
        Ok(hash.to_string())
    }

    pub fn verify_password(password: &str, hash: &str) -> Result<bool, AppError> {
        let parsed = PasswordHash::new(hash)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("stored hash is invalid: {e}")))?;
        Ok(Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok())
    }

    pub fn generate_access_token(config: &Config, user: &User) -> Result<String, AppError> {
        let now = Utc::now();
        let claims = Claims {
            sub: user.id.to_string(),
            username: user.username.clone(),
            token_version: user.token_version,
            iat: now.timestamp(),
            exp: (now + Duration::minutes(config.jwt.expiry_minutes)).timestamp(),
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(config.jwt.secret.as_bytes()),
        )
        .map_err(|e| AppError::Internal(anyhow::anyhow!("token signing failed: {e}")))
    }
}

fn is_unique_violation(error: &sqlx::Error) -> bool {
    matches!(
        error,
        sqlx::Error::Database(db_err) if db_err.code().as_deref() == Some("23505")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{decode, DecodingKey, Validation};

    fn test_config() -> Config {
        use crate::config::*;
        Config {
            server: ServerConfig {
                host: "127.0.0.1".into(),
                port: 0,
            },
            database: DatabaseConfig {
                url: "postgres://localhost/test".into(),
                max_connections: 1,
            },
            jwt: JwtConfig {
                secret: "test-secret".into(),
                expiry_minutes: 60,
            },
            encryption: EncryptionConfig {
                key_file: "data/message.key".into(),
            },
            messages: MessagesConfig { ttl_minutes: 0 },
            ui: UiConfig { dir: "web".into() },
        }
    }

    fn test_user() -> User {
        User {
            id: 42,
            username: "alice".into(),
            password_hash: String::new(),
            is_admin: false,
            token_version: 3,
            public_key: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn password_hash_verifies() {
        let hash = AuthService::hash_password("hunter2").unwrap();
        assert!(AuthService::verify_password("hunter2", &hash).unwrap());
        assert!(!AuthService::verify_password("hunter3", &hash).unwrap());
    }

    #[test]
    fn hashes_are_salted() {
        let a = AuthService::hash_password("hunter2").unwrap();
        let b = AuthService::hash_password("hunter2").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn token_carries_identity_and_version() {
        let config = test_config();
        let token = AuthService::generate_access_token(&config, &test_user()).unwrap();

        let claims = decode::<Claims>(
            &token,
            &DecodingKey::from_secret(config.jwt.secret.as_bytes()),
            &Validation::default(),
        )
        .unwrap()
        .claims;

        assert_eq!(claims.sub, "42");
        assert_eq!(claims.username, "alice");
        assert_eq!(claims.token_version, 3);
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn token_from_other_secret_is_rejected() {
        let config = test_config();
        let token = AuthService::generate_access_token(&config, &test_user()).unwrap();

        let result = decode::<Claims>(
            &token,
            &DecodingKey::from_secret(b"different-secret"),
            &Validation::default(),
        );
        assert!(result.is_err());
    }
}
