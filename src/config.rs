use crate::error::StoreError;

/// Connection settings for the duel store.
///
/// Always passed explicitly to [`crate::store::SqliteStore::connect`];
/// there is no process-wide configuration singleton.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Database URL, e.g. `sqlite://arena.db`.
    pub database_url: String,
    /// Upper bound on pooled connections.
    pub max_connections: u32,
}

impl StoreConfig {
    pub fn new(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            max_connections: 5,
        }
    }

    /// Builds the configuration from the `DATABASE_URL` environment
    /// variable, reading a `.env` file first in debug builds.
    pub fn from_env() -> Result<Self, StoreError> {
        #[cfg(debug_assertions)]
        dotenv::dotenv().ok();

        match std::env::var("DATABASE_URL") {
            Ok(url) => Ok(Self::new(url)),
            Err(_) => Err(StoreError::Connection(
                "DATABASE_URL environment variable not found".to_string(),
            )),
        }
    }
}
