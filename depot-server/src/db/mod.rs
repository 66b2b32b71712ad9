//! SQLite persistence for crate metadata, authors, owners and API tokens.
//!
//! The connection sits behind a mutex. Handlers that mutate the registry hold
//! that lock for the whole operation, which also serialises index writes.

pub mod authors;
pub mod crates;
pub mod migrations;
pub mod models;

pub use models::*;

use std::fs;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use rusqlite::Connection;
use tracing::info;

use crate::error::AppResult;

pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open (and migrate) the database at `url`, or an in-memory one for `:memory:`.
    pub fn open(url: &str) -> AppResult<Self> {
        if url == ":memory:" {
            return Self::open_in_memory();
        }

        if let Some(parent) = Path::new(url).parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(depot_core::Error::from)?;
            }
        }

        let conn = Connection::open(url)?;
        info!(path = %url, "Opened database");
        Self::init(conn)
    }

    pub fn open_in_memory() -> AppResult<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> AppResult<Self> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        migrations::run_migrations(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Lock the connection. A panic in another holder does not make it unusable.
    pub fn lock(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Name used for uniqueness checks and lookups: lowercase, `_` folded into `-`.
pub fn canonical_name(name: &str) -> String {
    name.to_ascii_lowercase().replace('_', "-")
}
