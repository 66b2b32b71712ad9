//! Queries on crates, their keywords, categories and owners.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use super::{canonical_name, Author, CrateMetadata, CrateRecord};
use crate::error::AppResult;

/// Look a crate up by name, ignoring case and `-`/`_` differences.
pub fn find_by_canon_name(conn: &Connection, name: &str) -> AppResult<Option<CrateRecord>> {
    let sql = format!(
        "SELECT {} FROM crates WHERE canon_name = ?1",
        CrateRecord::COLUMNS
    );
    Ok(conn
        .query_row(&sql, [canonical_name(name)], CrateRecord::from_row)
        .optional()?)
}

/// Insert a new crate and return its id.
pub fn insert(
    conn: &Connection,
    name: &str,
    metadata: &CrateMetadata,
    now: DateTime<Utc>,
) -> AppResult<i64> {
    conn.execute(
        "INSERT INTO crates (name, canon_name, description, documentation, homepage, repository, \
         created_at, updated_at, downloads) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7, 0)",
        params![
            name,
            canonical_name(name),
            metadata.description,
            metadata.documentation,
            metadata.homepage,
            metadata.repository,
            now,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Replace the descriptive metadata of a crate and bump `updated_at`.
pub fn update_metadata(
    conn: &Connection,
    crate_id: i64,
    metadata: &CrateMetadata,
    now: DateTime<Utc>,
) -> AppResult<()> {
    conn.execute(
        "UPDATE crates SET description = ?2, documentation = ?3, homepage = ?4, \
         repository = ?5, updated_at = ?6 WHERE id = ?1",
        params![
            crate_id,
            metadata.description,
            metadata.documentation,
            metadata.homepage,
            metadata.repository,
            now,
        ],
    )?;
    Ok(())
}

pub fn set_keywords(conn: &Connection, crate_id: i64, keywords: &[String]) -> AppResult<()> {
    conn.execute("DELETE FROM crate_keywords WHERE crate_id = ?1", [crate_id])?;
    for keyword in keywords {
        conn.execute(
            "INSERT OR IGNORE INTO keywords (name) VALUES (?1)",
            [keyword],
        )?;
        conn.execute(
            "INSERT OR IGNORE INTO crate_keywords (crate_id, keyword_id) \
             SELECT ?1, id FROM keywords WHERE name = ?2",
            params![crate_id, keyword],
        )?;
    }
    Ok(())
}

pub fn get_keywords(conn: &Connection, crate_id: i64) -> AppResult<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT k.name FROM keywords k \
         JOIN crate_keywords ck ON ck.keyword_id = k.id \
         WHERE ck.crate_id = ?1 ORDER BY k.name",
    )?;
    let keywords = stmt
        .query_map([crate_id], |row| row.get(0))?
        .collect::<rusqlite::Result<_>>()?;
    Ok(keywords)
}

pub fn set_categories(conn: &Connection, crate_id: i64, categories: &[String]) -> AppResult<()> {
    conn.execute("DELETE FROM crate_categories WHERE crate_id = ?1", [crate_id])?;
    for category in categories {
        conn.execute(
            "INSERT OR IGNORE INTO crate_categories (crate_id, category) VALUES (?1, ?2)",
            params![crate_id, category],
        )?;
    }
    Ok(())
}

pub fn get_categories(conn: &Connection, crate_id: i64) -> AppResult<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT category FROM crate_categories WHERE crate_id = ?1 ORDER BY category",
    )?;
    let categories = stmt
        .query_map([crate_id], |row| row.get(0))?
        .collect::<rusqlite::Result<_>>()?;
    Ok(categories)
}

pub fn increment_downloads(conn: &Connection, crate_id: i64) -> AppResult<()> {
    conn.execute(
        "UPDATE crates SET downloads = downloads + 1 WHERE id = ?1",
        [crate_id],
    )?;
    Ok(())
}

pub fn count(conn: &Connection) -> AppResult<i64> {
    Ok(conn.query_row("SELECT COUNT(*) FROM crates", [], |row| row.get(0))?)
}

pub fn total_downloads(conn: &Connection) -> AppResult<i64> {
    Ok(conn.query_row(
        "SELECT COALESCE(SUM(downloads), 0) FROM crates",
        [],
        |row| row.get(0),
    )?)
}

fn list(conn: &Connection, order_by: &str, limit: i64, offset: i64) -> AppResult<Vec<CrateRecord>> {
    let sql = format!(
        "SELECT {} FROM crates ORDER BY {order_by} LIMIT ?1 OFFSET ?2",
        CrateRecord::COLUMNS
    );
    let mut stmt = conn.prepare(&sql)?;
    let crates = stmt
        .query_map(params![limit, offset], CrateRecord::from_row)?
        .collect::<rusqlite::Result<_>>()?;
    Ok(crates)
}

pub fn most_downloaded(conn: &Connection, limit: i64, offset: i64) -> AppResult<Vec<CrateRecord>> {
    list(conn, "downloads DESC, canon_name ASC", limit, offset)
}

pub fn recently_updated(conn: &Connection, limit: i64) -> AppResult<Vec<CrateRecord>> {
    list(conn, "updated_at DESC, canon_name ASC", limit, 0)
}

fn like_pattern(query: &str) -> String {
    let escaped = canonical_name(query)
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

/// Crates whose canonical name contains `query`, with the total match count.
pub fn search(
    conn: &Connection,
    query: &str,
    limit: i64,
    offset: i64,
) -> AppResult<(Vec<CrateRecord>, i64)> {
    let pattern = like_pattern(query);

    let total: i64 = conn.query_row(
        "SELECT COUNT(*) FROM crates WHERE canon_name LIKE ?1 ESCAPE '\\'",
        [&pattern],
        |row| row.get(0),
    )?;

    let sql = format!(
        "SELECT {} FROM crates WHERE canon_name LIKE ?1 ESCAPE '\\' \
         ORDER BY canon_name ASC LIMIT ?2 OFFSET ?3",
        CrateRecord::COLUMNS
    );
    let mut stmt = conn.prepare(&sql)?;
    let crates = stmt
        .query_map(params![pattern, limit, offset], CrateRecord::from_row)?
        .collect::<rusqlite::Result<_>>()?;

    Ok((crates, total))
}

pub fn owners(conn: &Connection, crate_id: i64) -> AppResult<Vec<Author>> {
    let mut stmt = conn.prepare(
        "SELECT a.id, a.email, a.name FROM authors a \
         JOIN crate_authors ca ON ca.author_id = a.id \
         WHERE ca.crate_id = ?1 ORDER BY a.id",
    )?;
    let owners = stmt
        .query_map([crate_id], Author::from_row)?
        .collect::<rusqlite::Result<_>>()?;
    Ok(owners)
}

pub fn is_owner(conn: &Connection, crate_id: i64, author_id: i64) -> AppResult<bool> {
    Ok(conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM crate_authors WHERE crate_id = ?1 AND author_id = ?2)",
        params![crate_id, author_id],
        |row| row.get(0),
    )?)
}

pub fn add_owner(conn: &Connection, crate_id: i64, author_id: i64) -> AppResult<()> {
    conn.execute(
        "INSERT OR IGNORE INTO crate_authors (crate_id, author_id) VALUES (?1, ?2)",
        params![crate_id, author_id],
    )?;
    Ok(())
}

pub fn remove_owner(conn: &Connection, crate_id: i64, author_id: i64) -> AppResult<()> {
    conn.execute(
        "DELETE FROM crate_authors WHERE crate_id = ?1 AND author_id = ?2",
        params![crate_id, author_id],
    )?;
    Ok(())
}
