//! # Cargo Registry Web API
//!
//! The endpoints `cargo publish`, `cargo yank`, `cargo owner`, `cargo search`
//! and crate downloads rely on, plus account management.
//!
//! Mutating endpoints authenticate through [`AuthenticatedAuthor`]. Read
//! endpoints only require a token when `general.auth_required` is set.
//!
//! [`AuthenticatedAuthor`]: crate::auth::AuthenticatedAuthor

pub mod account;
pub mod crates;
pub mod models;
pub mod owners;
pub mod payload;
pub mod publish;

use axum::{
    middleware,
    routing::{delete, get, post, put},
    Router,
};

use crate::auth;
use crate::state::AppState;

/// Routes under `/api/v1`.
pub fn routes(state: AppState) -> Router<AppState> {
    let require_token = middleware::from_fn_with_state(state, auth::require_token);

    let reads = Router::new()
        .route("/api/v1/crates", get(crates::search))
        .route(
            "/api/v1/crates/{name}/{version}/download",
            get(crates::download),
        )
        .route_layer(require_token.clone());

    let writes = Router::new()
        .route("/api/v1/crates/new", put(publish::publish))
        .route("/api/v1/crates/{name}/{version}/yank", delete(crates::yank))
        .route("/api/v1/crates/{name}/{version}/unyank", put(crates::unyank))
        .route(
            "/api/v1/crates/{name}/owners",
            get(owners::list)
                .route_layer(require_token)
                .put(owners::add)
                .delete(owners::remove),
        )
        .route("/api/v1/account/register", post(account::register))
        .route("/api/v1/account/login", post(account::login))
        .route(
            "/api/v1/account/tokens",
            post(account::create_token).delete(account::revoke_token),
        );

    reads.merge(writes)
}
