//! On-disk crate index tree
//!
//! Path calculation and newline-delimited JSON file handling shared by the
//! index strategies that work on a local checkout of the index.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use semver::Version;
use tracing::debug;

use crate::error::{Error, RegistryError, Result};
use crate::index::{CrateVersion, IndexConfig};
use crate::validation;

/// Calculate the index path of a crate according to Cargo's index layout.
///
/// Names are organized in directories: `1/a`, `2/ab`, `3/a/abc`, `ab/cd/abcd`.
///
/// # Security
/// The crate name is validated before any path is built, so the result
/// cannot escape the index root.
pub fn index_path(name: &str) -> Result<String> {
    let name = validation::validate_crate_name(name)?.to_lowercase();

    let path = match name.len() {
        1 => format!("1/{name}"),
        2 => format!("2/{name}"),
        3 => format!("3/{}/{name}", &name[..1]),
        _ => format!("{}/{}/{name}", &name[..2], &name[2..4]),
    };

    validation::validate_safe_path(&path)?;
    Ok(path)
}

/// A local crate index directory.
#[derive(Debug, Clone, Copy)]
pub struct Tree<'a> {
    root: &'a Path,
}

impl<'a> Tree<'a> {
    pub fn new(root: &'a Path) -> Self {
        Self { root }
    }

    /// Absolute path of the index file of the given crate.
    pub fn crate_path(&self, name: &str) -> Result<PathBuf> {
        Ok(self.root.join(index_path(name)?))
    }

    /// Read the index's `config.json`.
    pub fn configuration(&self) -> Result<IndexConfig> {
        let content = fs::read_to_string(self.root.join("config.json"))?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Read every record of a crate, in file order.
    pub fn all_records(&self, name: &str) -> Result<Vec<CrateVersion>> {
        let path = self.crate_path(name)?;
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(RegistryError::CrateNotFound {
                    name: name.to_string(),
                }
                .into());
            }
            Err(e) => return Err(e.into()),
        };

        parse_records(&content)
    }

    /// Append a record to the crate's index file, creating it if needed.
    pub fn add_record(&self, record: &CrateVersion) -> Result<()> {
        let path = self.crate_path(&record.name)?;

        match self.all_records(&record.name) {
            Ok(records) => {
                if let Some(hosted) = records.iter().map(|r| &r.vers).max() {
                    if records.iter().any(|r| r.vers == record.vers) {
                        return Err(RegistryError::VersionTooLow {
                            krate: record.name.clone(),
                            hosted: hosted.clone(),
                            published: record.vers.clone(),
                        }
                        .into());
                    }
                }
            }
            Err(e) if e.is_not_found() => {}
            Err(e) => return Err(e),
        }

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let line = serde_json::to_string(record)?;
        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)?;
        writeln!(file, "{line}")?;

        debug!(path = %path.display(), version = %record.vers, "Appended index record");
        Ok(())
    }

    /// Rewrite the crate's index file with `func` applied to the record of `version`.
    pub fn alter_record<F>(&self, name: &str, version: &Version, func: F) -> Result<()>
    where
        F: FnOnce(&mut CrateVersion),
    {
        let path = self.crate_path(name)?;
        let mut records = self.all_records(name)?;

        let record = records
            .iter_mut()
            .find(|r| &r.vers == version)
            .ok_or_else(|| RegistryError::VersionNotFound {
                name: name.to_string(),
                version: version.to_string(),
            })?;
        func(record);

        let mut content = String::new();
        for record in &records {
            content.push_str(&serde_json::to_string(record)?);
            content.push('\n');
        }

        write_atomic(&path, content.as_bytes())?;
        debug!(path = %path.display(), version = %version, "Rewrote index record");
        Ok(())
    }
}

/// Parse newline-delimited index records, skipping blank lines.
pub fn parse_records(content: &str) -> Result<Vec<CrateVersion>> {
    content
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| serde_json::from_str(line).map_err(Error::from))
        .collect()
}

/// Write `content` to a sibling temporary file, then rename it over `path`.
pub(crate) fn write_atomic(path: &Path, content: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    fs::write(&tmp, content)?;
    fs::rename(&tmp, path)?;
    Ok(())
}
