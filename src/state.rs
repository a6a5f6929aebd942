use std::sync::Arc;

use crate::config::Config;
use crate::db::Database;
use crate::services::encryption::EncryptionService;

/// Shared application state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub config: Arc<Config>,
    pub encryption: Arc<EncryptionService>,
}

impl AppState {
    pub fn new(db: Database, config: Config, encryption: EncryptionService) -> Self {
        Self {
            db,
            config: Arc::new(config),
            encryption: Arc::new(encryption),
        }
    }
}
