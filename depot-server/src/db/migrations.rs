use rusqlite::{Connection, Result};

/// Current schema version - increment this when adding new migrations
pub const CURRENT_VERSION: i32 = 1;

/// Run all pending migrations
pub fn run_migrations(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );
        "#,
    )?;

    let current_version = get_current_version(conn)?;

    if current_version < 1 {
        migrate_v1(conn)?;
        set_version(conn, 1)?;
    }

    Ok(())
}

/// Get the current schema version
pub fn get_current_version(conn: &Connection) -> Result<i32> {
    conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
        [],
        |row| row.get(0),
    )
}

fn set_version(conn: &Connection, version: i32) -> Result<()> {
    conn.execute(
        "INSERT INTO schema_migrations (version) VALUES (?1)",
        [version],
    )?;
    Ok(())
}

/// Migration v1: initial registry schema
fn migrate_v1(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS crates (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE,
            canon_name TEXT NOT NULL UNIQUE,
            description TEXT,
            documentation TEXT,
            homepage TEXT,
            repository TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            downloads INTEGER NOT NULL DEFAULT 0
        );

        CREATE TABLE IF NOT EXISTS authors (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            email TEXT NOT NULL UNIQUE,
            name TEXT NOT NULL,
            passwd TEXT NOT NULL,
            salt TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS author_tokens (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            token_hash TEXT NOT NULL UNIQUE,
            author_id INTEGER NOT NULL REFERENCES authors(id) ON DELETE CASCADE
        );

        CREATE TABLE IF NOT EXISTS crate_authors (
            crate_id INTEGER NOT NULL REFERENCES crates(id) ON DELETE CASCADE,
            author_id INTEGER NOT NULL REFERENCES authors(id) ON DELETE CASCADE,
            PRIMARY KEY (crate_id, author_id)
        );

        CREATE TABLE IF NOT EXISTS keywords (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE
        );

        CREATE TABLE IF NOT EXISTS crate_keywords (
            crate_id INTEGER NOT NULL REFERENCES crates(id) ON DELETE CASCADE,
            keyword_id INTEGER NOT NULL REFERENCES keywords(id) ON DELETE CASCADE,
            PRIMARY KEY (crate_id, keyword_id)
        );

        CREATE TABLE IF NOT EXISTS crate_categories (
            crate_id INTEGER NOT NULL REFERENCES crates(id) ON DELETE CASCADE,
            category TEXT NOT NULL,
            PRIMARY KEY (crate_id, category)
        );

        CREATE INDEX IF NOT EXISTS idx_crates_downloads ON crates(downloads DESC);
        CREATE INDEX IF NOT EXISTS idx_crates_updated_at ON crates(updated_at DESC);
        CREATE INDEX IF NOT EXISTS idx_author_tokens_author ON author_tokens(author_id);
        "#,
    )
}
