use std::path::PathBuf;

use rusqlite::Connection;

use crate::config;
use crate::db::{open_database, DatabaseError};

/// Shared command state: just the database path. Every command opens its
/// own connection, so there is no shared mutable state to guard.
pub struct AppState {
    pub db_path: PathBuf,
}

impl AppState {
    pub fn new() -> Self {
        let db_path = config::database_path();
        if let Some(parent) = db_path.parent() {
            if let Err(e) = std::fs::create_dir_all(parent) {
                tracing::error!("Failed to create app data dir {}: {e}", parent.display());
            }
        }
        Self { db_path }
    }

    pub fn connect(&self) -> Result<Connection, DatabaseError> {
        open_database(&self.db_path)
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

#[tauri::command]
pub fn health_check() -> String {
    format!("{} {}", config::APP_NAME, config::APP_VERSION)
}
