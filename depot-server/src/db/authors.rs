//! Author accounts and API tokens.

use depot_core::RegistryError;
use rusqlite::{params, Connection, OptionalExtension};
use tracing::info;

use super::Author;
use crate::crypto::{self, PasswordHash};
use crate::error::AppResult;

/// Register a new author. Fails with `AccountExists` when the email is taken.
pub fn create_author(
    conn: &Connection,
    email: &str,
    name: &str,
    password: &PasswordHash,
) -> AppResult<Author> {
    if find_by_email(conn, email)?.is_some() {
        return Err(RegistryError::AccountExists {
            email: email.to_string(),
        }
        .into());
    }

    conn.execute(
        "INSERT INTO authors (email, name, passwd, salt) VALUES (?1, ?2, ?3, ?4)",
        params![email, name, password.hash, password.salt],
    )?;

    info!(email = %email, "Registered author");
    Ok(Author {
        id: conn.last_insert_rowid(),
        email: email.to_string(),
        name: name.to_string(),
    })
}

pub fn find_by_email(conn: &Connection, email: &str) -> AppResult<Option<Author>> {
    Ok(conn
        .query_row(
            "SELECT id, email, name FROM authors WHERE email = ?1",
            [email],
            Author::from_row,
        )
        .optional()?)
}

/// The author registered under `email` with their stored password hash.
pub fn find_credentials(
    conn: &Connection,
    email: &str,
) -> AppResult<Option<(Author, PasswordHash)>> {
    Ok(conn
        .query_row(
            "SELECT id, email, name, passwd, salt FROM authors WHERE email = ?1",
            [email],
            |row| {
                Ok((
                    Author::from_row(row)?,
                    PasswordHash {
                        hash: row.get(3)?,
                        salt: row.get(4)?,
                    },
                ))
            },
        )
        .optional()?)
}

/// The author of `credentials` if `passwd` matches, `InvalidCredentials` otherwise.
pub fn verify_credentials(
    credentials: Option<(Author, PasswordHash)>,
    passwd: &str,
) -> AppResult<Author> {
    match credentials {
        Some((author, password)) if password.verify(passwd) => Ok(author),
        _ => Err(RegistryError::InvalidCredentials.into()),
    }
}

/// Issue a new token for an author and return its plaintext.
pub fn create_token(conn: &Connection, author_id: i64, name: &str) -> AppResult<String> {
    let token = crypto::generate_token();
    conn.execute(
        "INSERT INTO author_tokens (name, token_hash, author_id) VALUES (?1, ?2, ?3)",
        params![name, crypto::hash_token(&token), author_id],
    )?;
    Ok(token)
}

pub fn find_by_token(conn: &Connection, token: &str) -> AppResult<Option<Author>> {
    Ok(conn
        .query_row(
            "SELECT a.id, a.email, a.name FROM authors a \
             JOIN author_tokens t ON t.author_id = a.id \
             WHERE t.token_hash = ?1",
            [crypto::hash_token(token)],
            Author::from_row,
        )
        .optional()?)
}

/// Revoke every token of the author with the given name. Returns whether any existed.
pub fn revoke_token(conn: &Connection, author_id: i64, name: &str) -> AppResult<bool> {
    let removed = conn.execute(
        "DELETE FROM author_tokens WHERE author_id = ?1 AND name = ?2",
        params![author_id, name],
    )?;
    Ok(removed > 0)
}
