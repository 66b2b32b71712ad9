//! # depot-server
//!
//! The HTTP side of the depot crate registry: the Cargo registry API, a
//! sparse index, the internal API used by peer instances and a small
//! server-rendered frontend.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use depot_server::{run_server, Config};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = Config::load("depot.toml")?;
//! config.validate()?;
//! run_server(config).await?;
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod auth;
pub mod config;
pub mod crypto;
pub mod db;
pub mod error;
pub mod frontend;
pub mod internal;
pub mod server;
pub mod sparse;
pub mod state;

pub use config::{Config, ConfigError};
pub use error::{AppError, AppResult, ErrorCode};
pub use server::{build_router, run_server};
pub use state::AppState;

/// Default location of the configuration file
pub const DEFAULT_CONFIG_PATH: &str = "depot.toml";
