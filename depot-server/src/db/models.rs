use chrono::{DateTime, Utc};
use rusqlite::Row;
use serde::Serialize;

/// A row of the `crates` table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CrateRecord {
    pub id: i64,
    pub name: String,
    pub canon_name: String,
    pub description: Option<String>,
    pub documentation: Option<String>,
    pub homepage: Option<String>,
    pub repository: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub downloads: i64,
}

impl CrateRecord {
    pub(crate) const COLUMNS: &'static str = "id, name, canon_name, description, documentation, \
         homepage, repository, created_at, updated_at, downloads";

    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            name: row.get(1)?,
            canon_name: row.get(2)?,
            description: row.get(3)?,
            documentation: row.get(4)?,
            homepage: row.get(5)?,
            repository: row.get(6)?,
            created_at: row.get(7)?,
            updated_at: row.get(8)?,
            downloads: row.get(9)?,
        })
    }
}

/// Descriptive metadata sent with each publish.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CrateMetadata {
    pub description: Option<String>,
    pub documentation: Option<String>,
    pub homepage: Option<String>,
    pub repository: Option<String>,
}

/// A registered author. The email doubles as the login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Author {
    pub id: i64,
    pub email: String,
    pub name: String,
}

impl Author {
    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            email: row.get(1)?,
            name: row.get(2)?,
        })
    }
}
