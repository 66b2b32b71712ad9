use axum::{
    extract::{Path, Query, State},
    http::header,
    response::IntoResponse,
    Json,
};
use depot_core::{validation, Indexer, RegistryError, Store};
use semver::Version;
use tracing::{debug, error, info};

use super::models::{SearchMeta, SearchParams, SearchResponse, SearchResult};
use crate::auth::AuthenticatedAuthor;
use crate::db::{crates, Author, CrateRecord};
use crate::error::AppResult;
use crate::state::{AppState, OkResponse};

const DEFAULT_PER_PAGE: u32 = 10;
const MAX_PER_PAGE: u32 = 100;

/// `GET /api/v1/crates?q=&page=&per_page=`
pub async fn search(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> AppResult<Json<SearchResponse>> {
    let query = params
        .q
        .filter(|q| !q.trim().is_empty())
        .ok_or(RegistryError::MissingQueryParams {
            missing_params: &["q"],
        })?;
    let per_page = params
        .per_page
        .unwrap_or(DEFAULT_PER_PAGE)
        .clamp(1, MAX_PER_PAGE);
    let page = params.page.unwrap_or(1).max(1);
    debug!(query = %query, page, per_page, "Searching crates");

    let response = state
        .blocking(move |state| {
            let (found, total) = {
                let conn = state.db.lock();
                crates::search(
                    &conn,
                    query.trim(),
                    i64::from(per_page),
                    i64::from(page - 1) * i64::from(per_page),
                )?
            };

            let crates = found
                .into_iter()
                .map(|krate| {
                    let max_version = state.index.latest_record(&krate.name)?.vers.to_string();
                    Ok(SearchResult {
                        name: krate.name,
                        max_version,
                        description: krate.description,
                        downloads: krate.downloads,
                    })
                })
                .collect::<AppResult<Vec<_>>>()?;

            Ok(SearchResponse {
                crates,
                meta: SearchMeta { total },
            })
        })
        .await?;

    Ok(Json(response))
}

fn parse_target(name: &str, version: &str) -> AppResult<(String, Version)> {
    Ok((
        validation::validate_crate_name(name)?,
        validation::validate_version(version)?,
    ))
}

/// The crate named `name`, or `CrateNotFound`.
pub(crate) fn require_crate(conn: &rusqlite::Connection, name: &str) -> AppResult<CrateRecord> {
    crates::find_by_canon_name(conn, name)?.ok_or_else(|| {
        RegistryError::CrateNotFound {
            name: name.to_string(),
        }
        .into()
    })
}

/// The crate named `name`, provided `author` owns it.
pub(crate) fn require_owned_crate(
    conn: &rusqlite::Connection,
    name: &str,
    author: &Author,
) -> AppResult<CrateRecord> {
    let krate = require_crate(conn, name)?;
    if !crates::is_owner(conn, krate.id, author.id)? {
        return Err(RegistryError::CrateNotOwned {
            name: krate.name,
            author: author.email.clone(),
        }
        .into());
    }
    Ok(krate)
}

/// `GET /api/v1/crates/{name}/{version}/download`
pub async fn download(
    State(state): State<AppState>,
    Path((name, version)): Path<(String, String)>,
) -> AppResult<impl IntoResponse> {
    let (name, version) = parse_target(&name, &version)?;

    let data = state
        .blocking(move |state| {
            let krate = require_crate(&state.db.lock(), &name)?;
            let data = state.storage.get_crate(&krate.name, &version)?;
            crates::increment_downloads(&state.db.lock(), krate.id)?;
            debug!(name = %krate.name, version = %version, size = data.len(), "Serving crate archive");
            Ok(data)
        })
        .await?;

    Ok(([(header::CONTENT_TYPE, "application/x-tar")], data))
}

async fn set_yanked(
    state: AppState,
    author: Author,
    name: String,
    version: String,
    yanked: bool,
) -> AppResult<Json<OkResponse>> {
    let (name, version) = parse_target(&name, &version)?;

    state
        .blocking(move |state| {
            let conn = state.db.lock();
            let krate = require_owned_crate(&conn, &name, &author)?;

            if let Err(err) = write_yank_state(state, &krate.name, &version, yanked) {
                if let Err(e) = state.index.rollback() {
                    error!(name = %krate.name, version = %version, error = %e, "Failed to roll back the crate index");
                }
                return Err(err);
            }

            info!(author = %author.email, name = %krate.name, version = %version, yanked, "Changed yank state");
            Ok(())
        })
        .await?;

    Ok(Json(OkResponse::ok()))
}

fn write_yank_state(
    state: &AppState,
    name: &str,
    version: &Version,
    yanked: bool,
) -> AppResult<()> {
    let message = if yanked {
        state.index.yank_record(name, version.clone())?;
        format!("Yanking crate `{name}#{version}`")
    } else {
        state.index.unyank_record(name, version.clone())?;
        format!("Unyanking crate `{name}#{version}`")
    };
    state.index.commit_and_push(&message)?;
    Ok(())
}

/// `DELETE /api/v1/crates/{name}/{version}/yank`
pub async fn yank(
    State(state): State<AppState>,
    AuthenticatedAuthor(author): AuthenticatedAuthor,
    Path((name, version)): Path<(String, String)>,
) -> AppResult<Json<OkResponse>> {
    set_yanked(state, author, name, version, true).await
}

/// `PUT /api/v1/crates/{name}/{version}/unyank`
pub async fn unyank(
    State(state): State<AppState>,
    AuthenticatedAuthor(author): AuthenticatedAuthor,
    Path((name, version)): Path<(String, String)>,
) -> AppResult<Json<OkResponse>> {
    set_yanked(state, author, name, version, false).await
}
