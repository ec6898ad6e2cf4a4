mod repository;

use std::time::Duration;

pub use repository::*;

/// SQL migration for the accounts table
pub const MIGRATION_001_ACCOUNTS: &str = include_str!("migrations/001_accounts.sql");

/// Connection settings for the ledger database.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Path of the SQLite database file (created if missing).
    pub database_path: String,
    /// Upper bound on pooled connections.
    pub max_connections: u32,
    /// How long a statement waits on a locked database before failing.
    pub busy_timeout: Duration,
    /// Id candidates tried by account creation before giving up.
    pub max_id_attempts: usize,
}

impl StoreConfig {
    pub fn new(database_path: impl Into<String>) -> Self {
        Self {
            database_path: database_path.into(),
            ..Self::default()
        }
    }

    pub fn with_max_connections(mut self, max_connections: u32) -> Self {
        self.max_connections = max_connections.max(1);
        self
    }

    pub fn with_busy_timeout(mut self, busy_timeout: Duration) -> Self {
        self.busy_timeout = busy_timeout;
        self
    }

    pub fn with_max_id_attempts(mut self, attempts: usize) -> Self {
        self.max_id_attempts = attempts.max(1);
        self
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            database_path: "custodia.db".to_string(),
            max_connections: 8,
            busy_timeout: Duration::from_secs(5),
            max_id_attempts: 1000,
        }
    }
}
