use axum::{
    extract::{Path, State},
    Json,
};
use depot_core::RegistryError;
use tracing::info;

use super::crates::{require_crate, require_owned_crate};
use super::models::{OwnerUser, OwnersRequest, OwnersResponse};
use crate::auth::AuthenticatedAuthor;
use crate::db::{authors, crates, Author};
use crate::error::{AppError, AppResult};
use crate::state::{AppState, OkResponse};

/// `GET /api/v1/crates/{name}/owners`
pub async fn list(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> AppResult<Json<OwnersResponse>> {
    let owners = state
        .blocking(move |state| {
            let conn = state.db.lock();
            let krate = require_crate(&conn, &name)?;
            crates::owners(&conn, krate.id)
        })
        .await?;

    Ok(Json(OwnersResponse {
        users: owners.into_iter().map(OwnerUser::from).collect(),
    }))
}

fn resolve_logins(conn: &rusqlite::Connection, logins: &[String]) -> AppResult<Vec<Author>> {
    if logins.is_empty() {
        return Err(AppError::BadRequest("no users given".to_string()));
    }
    logins
        .iter()
        .map(|login| {
            authors::find_by_email(conn, login)?.ok_or_else(|| {
                RegistryError::UserNotFound {
                    login: login.clone(),
                }
                .into()
            })
        })
        .collect()
}

/// `PUT /api/v1/crates/{name}/owners`
pub async fn add(
    State(state): State<AppState>,
    AuthenticatedAuthor(author): AuthenticatedAuthor,
    Path(name): Path<String>,
    Json(request): Json<OwnersRequest>,
) -> AppResult<Json<OkResponse>> {
    let msg = state
        .blocking(move |state| {
            let mut conn = state.db.lock();
            let tx = conn.transaction()?;
            let krate = require_owned_crate(&tx, &name, &author)?;

            let added = resolve_logins(&tx, &request.users)?;
            for owner in &added {
                crates::add_owner(&tx, krate.id, owner.id)?;
            }
            tx.commit()?;

            let logins: Vec<&str> = added.iter().map(|a| a.email.as_str()).collect();
            info!(name = %krate.name, by = %author.email, owners = ?logins, "Added owners");
            Ok(format!(
                "user(s) {} added as owner(s) of crate {}",
                logins.join(", "),
                krate.name
            ))
        })
        .await?;

    Ok(Json(OkResponse::with_msg(msg)))
}

/// `DELETE /api/v1/crates/{name}/owners`
pub async fn remove(
    State(state): State<AppState>,
    AuthenticatedAuthor(author): AuthenticatedAuthor,
    Path(name): Path<String>,
    Json(request): Json<OwnersRequest>,
) -> AppResult<Json<OkResponse>> {
    let msg = state
        .blocking(move |state| {
            let mut conn = state.db.lock();
            let tx = conn.transaction()?;
            let krate = require_owned_crate(&tx, &name, &author)?;

            let removed = resolve_logins(&tx, &request.users)?;
            for owner in &removed {
                crates::remove_owner(&tx, krate.id, owner.id)?;
            }
            if crates::owners(&tx, krate.id)?.is_empty() {
                return Err(RegistryError::LastOwner { name: krate.name }.into());
            }
            tx.commit()?;

            let logins: Vec<&str> = removed.iter().map(|a| a.email.as_str()).collect();
            info!(name = %krate.name, by = %author.email, owners = ?logins, "Removed owners");
            Ok(format!(
                "user(s) {} removed from the owners of crate {}",
                logins.join(", "),
                krate.name
            ))
        })
        .await?;

    Ok(Json(OkResponse::with_msg(msg)))
}
