//! Shared application state.
//!
//! `CoreState` owns the single store connection. It is wrapped in `Arc`
//! at startup and handed to the router; handlers borrow the connection
//! through [`CoreState::with_db`] for the duration of one repository call.

use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use rusqlite::Connection;

use crate::db::{self, DatabaseError};

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Internal lock poisoned")]
    LockPoisoned,
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),
}

pub struct CoreState {
    /// The store connection. `rusqlite::Connection` is `!Sync`, so every
    /// access is serialized here; guards never live across an `.await`.
    db: Mutex<Connection>,
    /// On-disk location, `None` for in-memory stores.
    database_path: Option<PathBuf>,
    started_at: Instant,
}

impl CoreState {
    /// Wrap an already-migrated connection.
    pub fn new(conn: Connection) -> Self {
        Self {
            db: Mutex::new(conn),
            database_path: None,
            started_at: Instant::now(),
        }
    }

    /// Open (or create) the store file, creating its directory if needed.
    pub fn open(path: &Path) -> Result<Self, CoreError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                DatabaseError::ConstraintViolation(format!(
                    "cannot create data directory {}: {e}",
                    parent.display()
                ))
            })?;
        }
        let conn = db::open_database(path)?;
        tracing::info!(path = %path.display(), "Store opened");
        Ok(Self {
            db: Mutex::new(conn),
            database_path: Some(path.to_path_buf()),
            started_at: Instant::now(),
        })
    }

    /// In-memory store with all migrations applied.
    pub fn in_memory() -> Result<Self, CoreError> {
        Ok(Self::new(db::open_memory_database()?))
    }

    /// Run `f` against the store connection.
    pub fn with_db<T, F>(&self, f: F) -> Result<T, CoreError>
    where
        F: FnOnce(&Connection) -> Result<T, DatabaseError>,
    {
        let conn = self.db.lock().map_err(|_| CoreError::LockPoisoned)?;
        f(&conn).map_err(CoreError::Database)
    }

    /// Whether the store currently answers queries.
    pub fn store_connected(&self) -> bool {
        match self.with_db(db::ping) {
            Ok(_) => true,
            Err(e) => {
                tracing::warn!(error = %e, "Store ping failed");
                false
            }
        }
    }

    pub fn database_path(&self) -> Option<&Path> {
        self.database_path.as_deref()
    }

    pub fn uptime(&self) -> Duration {
        self.started_at.elapsed()
    }
}
