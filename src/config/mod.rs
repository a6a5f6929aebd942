use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub jwt: JwtConfig,
    pub encryption: EncryptionConfig,
    pub messages: MessagesConfig,
    pub ui: UiConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    /// Access-token lifetime in minutes (also reported as `expires_in`).
    #[serde(default = "default_expiry_minutes")]
    pub expiry_minutes: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EncryptionConfig {
    /// Path of the message key file. Generated on first start if absent.
    #[serde(default = "default_key_file")]
    pub key_file: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MessagesConfig {
    /// Messages older than this many minutes are purged hourly. 0 disables.
    #[serde(default)]
    pub ttl_minutes: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UiConfig {
    /// Directory served at /ui when it exists.
    #[serde(default = "default_ui_dir")]
    pub dir: String,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_max_connections() -> u32 {
    10
}

fn default_expiry_minutes() -> i64 {
    60
}

fn default_key_file() -> String {
    "data/message.key".to_string()
}

fn default_ui_dir() -> String {
    "web".to_string()
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(config::Environment::default().separator("__"))
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8080)?
            .set_default("database.url", "postgres://localhost/offcom")?
            .set_default("database.max_connections", 10)?
            .set_default("jwt.secret", "development-secret-change-in-production")?
            .set_default("jwt.expiry_minutes", 60)?
            .set_default("encryption.key_file", "data/message.key")?
            .set_default("messages.ttl_minutes", 0)?
            .set_default("ui.dir", "web")?
            .build()?;

        Ok(config.try_deserialize()?)
    }
}
