use axum::{extract::State, Json};
use bytes::Bytes;
use chrono::Utc;
use depot_core::index::select_latest;
use depot_core::{validation, CrateVersion, Indexer, RegistryError, Store};
use semver::Version;
use tracing::{error, info};

use super::models::{PublishMetadata, PublishResponse};
use super::payload::parse_publish_payload;
use crate::auth::AuthenticatedAuthor;
use crate::db::{crates, Author};
use crate::error::AppResult;
use crate::state::AppState;

/// `PUT /api/v1/crates/new`
pub async fn publish(
    State(state): State<AppState>,
    AuthenticatedAuthor(author): AuthenticatedAuthor,
    body: Bytes,
) -> AppResult<Json<PublishResponse>> {
    let (metadata, crate_data) = parse_publish_payload(&body, state.config.max_crate_size_bytes())?;
    info!(author = %author.email, name = %metadata.name, vers = %metadata.vers, "Publishing crate");

    state
        .blocking(move |state| publish_crate(state, &author, metadata, crate_data))
        .await?;
    Ok(Json(PublishResponse::default()))
}

/// Publish one crate version.
///
/// The database lock is held throughout, so concurrent publishes never
/// interleave their index writes. Database changes only become visible once
/// the archive is stored and the index commit went through; if either fails,
/// the index and the store are put back the way they were.
fn publish_crate(
    state: &AppState,
    author: &Author,
    metadata: PublishMetadata,
    crate_data: Vec<u8>,
) -> AppResult<()> {
    let name = validation::validate_crate_name(&metadata.name)?;
    let vers = validation::validate_version(&metadata.vers)?;

    let mut conn = state.db.lock();
    let tx = conn.transaction()?;
    let now = Utc::now();

    let hosted = match state.index.all_records(&name) {
        Ok(records) => records,
        Err(e) if e.is_not_found() => Vec::new(),
        Err(e) => return Err(e.into()),
    };

    let crate_id = match crates::find_by_canon_name(&tx, &name)? {
        Some(existing) => {
            if existing.name != name {
                return Err(RegistryError::InvalidPayload {
                    reason: format!(
                        "'{name}' was previously published as '{}'",
                        existing.name
                    ),
                }
                .into());
            }

            if !crates::is_owner(&tx, existing.id, author.id)? {
                return Err(RegistryError::CrateNotOwned {
                    name,
                    author: author.email.clone(),
                }
                .into());
            }

            if let Ok(latest) = select_latest(&name, hosted.clone()) {
                if vers <= latest.vers {
                    return Err(RegistryError::VersionTooLow {
                        krate: name,
                        hosted: latest.vers,
                        published: vers,
                    }
                    .into());
                }
            }

            crates::update_metadata(&tx, existing.id, &metadata.crate_metadata(), now)?;
            existing.id
        }
        None => {
            let id = crates::insert(&tx, &name, &metadata.crate_metadata(), now)?;
            crates::add_owner(&tx, id, author.id)?;
            id
        }
    };

    // A yanked version above the latest one still occupies its number
    if let Some(existing) = hosted.iter().find(|r| r.vers == vers) {
        return Err(RegistryError::VersionTooLow {
            krate: name,
            hosted: existing.vers.clone(),
            published: vers,
        }
        .into());
    }

    crates::set_keywords(&tx, crate_id, &metadata.keywords)?;
    crates::set_categories(&tx, crate_id, &metadata.categories)?;

    let cksum = depot_core::sha256_hash(&crate_data);
    let readme = metadata.readme.clone();
    let record = metadata.into_record(vers.clone(), cksum)?;

    if let Err(err) = write_version(state, record, &crate_data, readme.as_deref()) {
        discard_version(state, &name, &vers);
        return Err(err);
    }

    tx.commit()?;
    info!(name = %name, vers = %vers, size = crate_data.len(), "Crate published");
    Ok(())
}

/// Store the archive and README, then add the record to the index and push it.
fn write_version(
    state: &AppState,
    record: CrateVersion,
    crate_data: &[u8],
    readme: Option<&str>,
) -> AppResult<()> {
    let name = record.name.clone();
    let vers = record.vers.clone();

    state.storage.store_crate(&name, &vers, crate_data)?;
    if let Some(readme) = readme {
        state.storage.store_readme(&name, &vers, readme)?;
    }

    state.index.add_record(record)?;
    state
        .index
        .commit_and_push(&format!("Updating crate `{name}#{vers}`"))?;
    Ok(())
}

/// Undo a partially written version. Failures here are only logged, the
/// original error is what the client sees.
fn discard_version(state: &AppState, name: &str, vers: &Version) {
    if let Err(e) = state.index.rollback() {
        error!(name = %name, vers = %vers, error = %e, "Failed to roll back the crate index");
    }
    if let Err(e) = state.storage.delete_version(name, vers) {
        error!(name = %name, vers = %vers, error = %e, "Failed to remove stored files");
    }
}
