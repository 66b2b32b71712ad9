//! Token authentication.
//!
//! Cargo sends its registry token verbatim in the `Authorization` header; other
//! clients may prefix it with `Bearer `. Both forms are accepted.

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderMap},
    middleware::Next,
    response::Response,
};
use depot_core::RegistryError;

use crate::db::{authors, Author};
use crate::error::{AppError, AppResult};
use crate::state::AppState;

/// Extract the token from the Authorization header
fn extract_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.strip_prefix("Bearer ").unwrap_or(value).trim())
        .filter(|token| !token.is_empty())
        .map(str::to_string)
}

async fn lookup_author(state: &AppState, headers: &HeaderMap) -> AppResult<Author> {
    let token = extract_token(headers).ok_or(RegistryError::InvalidToken)?;
    state
        .blocking(move |state| authors::find_by_token(&state.db.lock(), &token))
        .await?
        .ok_or_else(|| RegistryError::InvalidToken.into())
}

/// The author owning the request's API token.
#[derive(Debug, Clone)]
pub struct AuthenticatedAuthor(pub Author);

impl FromRequestParts<AppState> for AuthenticatedAuthor {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> AppResult<Self> {
        let author = lookup_author(state, &parts.headers).await?;
        tracing::debug!(author = %author.email, "Authenticated request");
        Ok(Self(author))
    }
}

/// Middleware guarding reads when `general.auth_required` is set.
pub async fn require_token(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    if state.config.general.auth_required {
        lookup_author(&state, req.headers()).await?;
    }
    Ok(next.run(req).await)
}

/// Middleware guarding the internal management API with the shared peer token.
pub async fn internal_auth_middleware(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .ok_or_else(|| {
            AppError::Unauthorized("Missing or invalid Authorization header".to_string())
        })?;

    let expected = &state.config.internal.token;
    if expected.is_empty() || token != expected {
        return Err(AppError::Unauthorized("Invalid internal token".to_string()));
    }

    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn test_extract_token() {
        assert_eq!(extract_token(&headers("abc123")).as_deref(), Some("abc123"));
        assert_eq!(
            extract_token(&headers("Bearer abc123")).as_deref(),
            Some("abc123")
        );
        assert_eq!(extract_token(&headers("Bearer ")), None);
        assert_eq!(extract_token(&HeaderMap::new()), None);
    }
}
