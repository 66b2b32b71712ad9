use axum::{extract::State, Json};

use super::models::{
    LoginRequest, RegisterRequest, RevokeResponse, TokenRequest, TokenResponse,
};
use crate::auth::AuthenticatedAuthor;
use crate::crypto::PasswordHash;
use crate::db::authors;
use crate::error::{AppError, AppResult};
use crate::state::AppState;

fn require_field(value: &str, field: &str) -> AppResult<()> {
    if value.trim().is_empty() {
        return Err(AppError::BadRequest(format!("'{field}' must not be empty")));
    }
    Ok(())
}

/// `POST /api/v1/account/register`
pub async fn register(
    State(state): State<AppState>,
    Json(request): Json<RegisterRequest>,
) -> AppResult<Json<TokenResponse>> {
    require_field(&request.email, "email")?;
    require_field(&request.name, "name")?;
    require_field(&request.passwd, "passwd")?;

    let token = state
        .blocking(move |state| {
            let password = PasswordHash::new(&request.passwd);
            let mut conn = state.db.lock();
            let tx = conn.transaction()?;
            let author = authors::create_author(&tx, &request.email, &request.name, &password)?;
            let token = authors::create_token(&tx, author.id, "default")?;
            tx.commit()?;
            Ok(token)
        })
        .await?;

    Ok(Json(TokenResponse { token }))
}

/// `POST /api/v1/account/login`
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> AppResult<Json<TokenResponse>> {
    let token = state
        .blocking(move |state| {
            let stored = authors::find_credentials(&state.db.lock(), &request.email)?;
            let author = authors::verify_credentials(stored, &request.passwd)?;
            authors::create_token(&state.db.lock(), author.id, "login")
        })
        .await?;

    Ok(Json(TokenResponse { token }))
}

/// `POST /api/v1/account/tokens`
pub async fn create_token(
    State(state): State<AppState>,
    AuthenticatedAuthor(author): AuthenticatedAuthor,
    Json(request): Json<TokenRequest>,
) -> AppResult<Json<TokenResponse>> {
    require_field(&request.name, "name")?;
    let token = state
        .blocking(move |state| authors::create_token(&state.db.lock(), author.id, &request.name))
        .await?;

    Ok(Json(TokenResponse { token }))
}

/// `DELETE /api/v1/account/tokens`
pub async fn revoke_token(
    State(state): State<AppState>,
    AuthenticatedAuthor(author): AuthenticatedAuthor,
    Json(request): Json<TokenRequest>,
) -> AppResult<Json<RevokeResponse>> {
    let revoked = state
        .blocking(move |state| authors::revoke_token(&state.db.lock(), author.id, &request.name))
        .await?;

    Ok(Json(RevokeResponse { revoked }))
}
