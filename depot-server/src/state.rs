//! # Application State Management
//!
//! [`AppState`] is created once at startup and cloned into every handler. It
//! holds the configuration, the database and the two registry strategies.
//!
//! The strategies are blocking, so handlers reach them through
//! [`AppState::blocking`], which runs a closure on Tokio's blocking pool.

use std::sync::Arc;

use depot_core::{Index, Storage};
use serde::Serialize;

use crate::config::Config;
use crate::db::Database;
use crate::error::AppResult;

/// Application state containing shared configuration and resources.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<Config>,
    /// Crate metadata, authors and tokens
    pub db: Arc<Database>,
    /// Index management strategy
    pub index: Arc<Index>,
    /// Crate storage strategy
    pub storage: Arc<Storage>,
}

impl AppState {
    /// Open the database and wire up the strategies named in `config`.
    pub fn new(config: Config) -> AppResult<Self> {
        let db = Database::open(&config.database.url)?;
        Ok(Self {
            index: Arc::new(config.index.clone()),
            storage: Arc::new(config.storage.clone()),
            db: Arc::new(db),
            config: Arc::new(config),
        })
    }

    /// Run blocking registry work off the async runtime.
    pub async fn blocking<F, T>(&self, f: F) -> AppResult<T>
    where
        F: FnOnce(&AppState) -> AppResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let state = self.clone();
        tokio::task::spawn_blocking(move || f(&state)).await?
    }
}

/// `{"ok": true}` with an optional message, as Cargo expects from mutating endpoints.
#[derive(Serialize, Debug)]
pub struct OkResponse {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub msg: Option<String>,
}

impl OkResponse {
    pub fn ok() -> Self {
        Self { ok: true, msg: None }
    }

    pub fn with_msg(msg: impl Into<String>) -> Self {
        Self {
            ok: true,
            msg: Some(msg.into()),
        }
    }
}
