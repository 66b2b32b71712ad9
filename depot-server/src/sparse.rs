//! Sparse HTTP index.
//!
//! Serves `config.json` and the newline-delimited records of each crate under
//! `/index/`, following Cargo's index layout.

use axum::{
    extract::{Path, State},
    http::header,
    middleware,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use depot_core::index::tree::index_path;
use depot_core::Indexer;
use serde::Serialize;
use tracing::debug;

use crate::auth;
use crate::error::{AppError, AppResult};
use crate::state::AppState;

/// The sparse index `config.json`.
#[derive(Debug, Serialize)]
pub struct SparseConfig {
    pub dl: String,
    pub api: String,
    #[serde(rename = "auth-required", skip_serializing_if = "std::ops::Not::not")]
    pub auth_required: bool,
}

impl SparseConfig {
    pub fn from_state(state: &AppState) -> Self {
        let public_url = state.config.public_url();
        Self {
            dl: format!("{public_url}/api/v1/crates"),
            api: public_url.to_string(),
            auth_required: state.config.general.auth_required,
        }
    }
}

pub fn routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/index/{*path}", get(index_file))
        .route_layer(middleware::from_fn_with_state(state, auth::require_token))
}

async fn index_file(
    State(state): State<AppState>,
    Path(path): Path<String>,
) -> AppResult<Response> {
    let path = path.trim_start_matches('/').to_string();
    if path == "config.json" {
        return Ok(Json(SparseConfig::from_state(&state)).into_response());
    }

    let not_found = || AppError::NotFound(format!("no index file at '{path}'"));
    let name = path
        .rsplit('/')
        .next()
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .ok_or_else(not_found)?;

    // The directories must be the ones the layout assigns to this name
    let expected = index_path(&name).map_err(|_| not_found())?;
    if expected != path.to_ascii_lowercase() {
        return Err(not_found());
    }

    debug!(name = %name, path = %path, "Sparse index request");
    let records = state
        .blocking(move |state| Ok(state.index.all_records(&name)?))
        .await?;

    let mut body = String::new();
    for record in &records {
        body.push_str(&serde_json::to_string(record)?);
        body.push('\n');
    }

    Ok(([(header::CONTENT_TYPE, "text/plain; charset=utf-8")], body).into_response())
}
