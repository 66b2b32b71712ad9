//! # Internal Management API
//!
//! Exposes this instance's index and storage to peer instances configured with
//! the `remote` strategies. Every route requires `Authorization: Bearer
//! {internal.token}`.

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    middleware,
    response::{IntoResponse, Response},
    routing::{delete, get, post, put},
    Json, Router,
};
use bytes::Bytes;
use depot_core::{validation, CrateVersion, IndexConfig, Indexer, Store};
use semver::Version;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::auth;
use crate::error::{AppError, AppResult};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct UrlResponse {
    pub url: String,
}

#[derive(Debug, Deserialize)]
pub struct CommitRequest {
    pub message: String,
}

/// Kind of stored object addressed by a storage route.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ObjectKind {
    Crate,
    Readme,
}

impl ObjectKind {
    fn parse(kind: &str) -> AppResult<Self> {
        match kind {
            "crates" => Ok(Self::Crate),
            "readmes" => Ok(Self::Readme),
            other => Err(AppError::NotFound(format!("unknown object kind '{other}'"))),
        }
    }
}

pub fn routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/internal/index/url", get(index_url))
        .route("/internal/index/refresh", post(refresh))
        .route("/internal/index/config", get(configuration))
        .route("/internal/index/crates", post(add_record))
        .route("/internal/index/crates/{name}", get(all_records))
        .route("/internal/index/crates/{name}/{version}", put(replace_record))
        .route("/internal/index/commit", post(commit))
        .route("/internal/index/rollback", post(rollback))
        .route(
            "/internal/storage/{kind}/{name}/{version}",
            get(get_object).put(put_object),
        )
        .route("/internal/storage/{name}/{version}", delete(delete_version))
        .route_layer(middleware::from_fn_with_state(
            state,
            auth::internal_auth_middleware,
        ))
}

async fn index_url(State(state): State<AppState>) -> AppResult<Json<UrlResponse>> {
    let url = state.blocking(|state| Ok(state.index.url()?)).await?;
    Ok(Json(UrlResponse { url }))
}

async fn refresh(State(state): State<AppState>) -> AppResult<StatusCode> {
    state.blocking(|state| Ok(state.index.refresh()?)).await?;
    info!("Index refreshed on behalf of a peer");
    Ok(StatusCode::NO_CONTENT)
}

async fn configuration(State(state): State<AppState>) -> AppResult<Json<IndexConfig>> {
    let config = state
        .blocking(|state| Ok(state.index.configuration()?))
        .await?;
    Ok(Json(config))
}

async fn all_records(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> AppResult<Json<Vec<CrateVersion>>> {
    let records = state
        .blocking(move |state| Ok(state.index.all_records(&name)?))
        .await?;
    Ok(Json(records))
}

async fn add_record(
    State(state): State<AppState>,
    Json(record): Json<CrateVersion>,
) -> AppResult<StatusCode> {
    debug!(name = %record.name, vers = %record.vers, "Peer adds index record");
    state
        .blocking(move |state| {
            // Index writes serialise on the database lock
            let _conn = state.db.lock();
            Ok(state.index.add_record(record)?)
        })
        .await?;
    Ok(StatusCode::CREATED)
}

async fn replace_record(
    State(state): State<AppState>,
    Path((name, version)): Path<(String, String)>,
    Json(record): Json<CrateVersion>,
) -> AppResult<StatusCode> {
    let version: Version = validation::validate_version(&version)?;
    if record.vers != version || !record.name.eq_ignore_ascii_case(&name) {
        return Err(AppError::BadRequest(format!(
            "record {}#{} does not match {name}#{version}",
            record.name, record.vers
        )));
    }

    state
        .blocking(move |state| {
            let _conn = state.db.lock();
            Ok(state
                .index
                .alter_record(&name, version, move |current| *current = record)?)
        })
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn commit(
    State(state): State<AppState>,
    Json(request): Json<CommitRequest>,
) -> AppResult<StatusCode> {
    state
        .blocking(move |state| {
            let _conn = state.db.lock();
            Ok(state.index.commit_and_push(&request.message)?)
        })
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn rollback(State(state): State<AppState>) -> AppResult<StatusCode> {
    state
        .blocking(|state| {
            let _conn = state.db.lock();
            Ok(state.index.rollback()?)
        })
        .await?;
    info!("Index rolled back on behalf of a peer");
    Ok(StatusCode::NO_CONTENT)
}

async fn get_object(
    State(state): State<AppState>,
    Path((kind, name, version)): Path<(String, String, String)>,
) -> AppResult<Response> {
    let kind = ObjectKind::parse(&kind)?;
    let version = validation::validate_version(&version)?;

    let response = state
        .blocking(move |state| {
            Ok(match kind {
                ObjectKind::Crate => (
                    [(header::CONTENT_TYPE, "application/x-tar")],
                    state.storage.get_crate(&name, &version)?,
                )
                    .into_response(),
                ObjectKind::Readme => (
                    [(header::CONTENT_TYPE, "text/markdown; charset=utf-8")],
                    state.storage.get_readme(&name, &version)?,
                )
                    .into_response(),
            })
        })
        .await?;
    Ok(response)
}

async fn put_object(
    State(state): State<AppState>,
    Path((kind, name, version)): Path<(String, String, String)>,
    body: Bytes,
) -> AppResult<StatusCode> {
    let kind = ObjectKind::parse(&kind)?;
    let version = validation::validate_version(&version)?;

    state
        .blocking(move |state| {
            match kind {
                ObjectKind::Crate => state.storage.store_crate(&name, &version, &body)?,
                ObjectKind::Readme => {
                    let text = std::str::from_utf8(&body).map_err(|e| {
                        AppError::BadRequest(format!("README is not valid UTF-8: {e}"))
                    })?;
                    state.storage.store_readme(&name, &version, text)?
                }
            }
            debug!(name = %name, version = %version, ?kind, "Peer stored object");
            Ok(())
        })
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn delete_version(
    State(state): State<AppState>,
    Path((name, version)): Path<(String, String)>,
) -> AppResult<StatusCode> {
    let version = validation::validate_version(&version)?;
    state
        .blocking(move |state| Ok(state.storage.delete_version(&name, &version)?))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_kind() {
        assert_eq!(ObjectKind::parse("crates").unwrap(), ObjectKind::Crate);
        assert_eq!(ObjectKind::parse("readmes").unwrap(), ObjectKind::Readme);
        assert!(ObjectKind::parse("docs").is_err());
    }
}
