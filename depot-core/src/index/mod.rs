//! Crate index management.
//!
//! The [`Indexer`] trait describes what the registry needs from a crate index,
//! and [`Index`] selects one of the available strategies from configuration.

use semver::{Version, VersionReq};
use serde::{Deserialize, Serialize};

/// Index management through `git` shell command invocations.
pub mod cli;
/// Index management through libgit2.
pub mod git;
mod models;
/// Index management delegated to another registry instance over HTTP.
pub mod remote;
pub mod tree;

pub use models::*;

use crate::error::{RegistryError, Result};
use crate::index::cli::CommandLineIndex;
use crate::index::git::Git2Index;
use crate::index::remote::RemoteIndex;

/// The crate index management strategy type.
///
/// It represents which index management strategy is currently used.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Index {
    /// Manages the crate index through the invocation of the "git" shell command.
    #[serde(rename = "command-line")]
    CommandLine(CommandLineIndex),
    /// Manages the crate index through libgit2.
    #[serde(rename = "git2")]
    Git2(Git2Index),
    /// Manages the crate index through the internal API of another instance.
    #[serde(rename = "remote")]
    Remote(RemoteIndex),
}

impl Index {
    /// Short name of the strategy, as written in configuration.
    pub fn kind(&self) -> &'static str {
        match self {
            Index::CommandLine(_) => "command-line",
            Index::Git2(_) => "git2",
            Index::Remote(_) => "remote",
        }
    }
}

/// The required trait that any crate index management type must implement.
pub trait Indexer {
    /// Gives back the URL of the managed crate index.
    fn url(&self) -> Result<String>;
    /// Refreshes the managed crate index (in case another instance made modification to it).
    fn refresh(&self) -> Result<()>;
    /// Reads the index's `config.json`.
    fn configuration(&self) -> Result<IndexConfig>;
    /// Retrieves all the version records of a crate.
    fn all_records(&self, name: &str) -> Result<Vec<CrateVersion>>;
    /// Retrieves the latest version record of a crate.
    fn latest_record(&self, name: &str) -> Result<CrateVersion> {
        let records = self.all_records(name)?;
        select_latest(name, records)
    }
    /// Retrieves the latest crate version record that matches the given name and version requirement.
    fn match_record(&self, name: &str, req: VersionReq) -> Result<CrateVersion> {
        let records = self.all_records(name)?;
        select_matching(name, records, &req)
    }
    /// Commits and pushes changes upstream.
    fn commit_and_push(&self, msg: &str) -> Result<()>;
    /// Discards every local change that has not reached upstream yet.
    fn rollback(&self) -> Result<()>;
    /// Adds a new crate record into the index.
    fn add_record(&self, record: CrateVersion) -> Result<()>;
    /// Alters an index's crate version record with the passed-in function.
    fn alter_record<F>(&self, name: &str, version: Version, func: F) -> Result<()>
    where
        F: FnOnce(&mut CrateVersion);
    /// Yanks a crate version.
    fn yank_record(&self, name: &str, version: Version) -> Result<()> {
        self.alter_record(name, version, |krate| krate.yanked = true)
    }
    /// Un-yanks a crate version.
    fn unyank_record(&self, name: &str, version: Version) -> Result<()> {
        self.alter_record(name, version, |krate| krate.yanked = false)
    }
}

/// Pick the highest non-yanked version, or the highest version if all are yanked.
pub fn select_latest(name: &str, records: Vec<CrateVersion>) -> Result<CrateVersion> {
    let (available, yanked): (Vec<_>, Vec<_>) = records.into_iter().partition(|r| !r.yanked);

    available
        .into_iter()
        .max_by(|a, b| a.vers.cmp(&b.vers))
        .or_else(|| yanked.into_iter().max_by(|a, b| a.vers.cmp(&b.vers)))
        .ok_or_else(|| {
            RegistryError::CrateNotFound {
                name: name.to_string(),
            }
            .into()
        })
}

/// Pick the highest non-yanked version matching `req`.
pub fn select_matching(
    name: &str,
    records: Vec<CrateVersion>,
    req: &VersionReq,
) -> Result<CrateVersion> {
    records
        .into_iter()
        .filter(|r| !r.yanked && req.matches(&r.vers))
        .max_by(|a, b| a.vers.cmp(&b.vers))
        .ok_or_else(|| {
            RegistryError::VersionNotFound {
                name: name.to_string(),
                version: req.to_string(),
            }
            .into()
        })
}

impl Indexer for Index {
    fn url(&self) -> Result<String> {
        match self {
            Index::CommandLine(idx) => idx.url(),
            Index::Git2(idx) => idx.url(),
            Index::Remote(idx) => idx.url(),
        }
    }

    fn refresh(&self) -> Result<()> {
        match self {
            Index::CommandLine(idx) => idx.refresh(),
            Index::Git2(idx) => idx.refresh(),
            Index::Remote(idx) => idx.refresh(),
        }
    }

    fn configuration(&self) -> Result<IndexConfig> {
        match self {
            Index::CommandLine(idx) => idx.configuration(),
            Index::Git2(idx) => idx.configuration(),
            Index::Remote(idx) => idx.configuration(),
        }
    }

    fn all_records(&self, name: &str) -> Result<Vec<CrateVersion>> {
        match self {
            Index::CommandLine(idx) => idx.all_records(name),
            Index::Git2(idx) => idx.all_records(name),
            Index::Remote(idx) => idx.all_records(name),
        }
    }

    fn latest_record(&self, name: &str) -> Result<CrateVersion> {
        match self {
            Index::CommandLine(idx) => idx.latest_record(name),
            Index::Git2(idx) => idx.latest_record(name),
            Index::Remote(idx) => idx.latest_record(name),
        }
    }

    fn match_record(&self, name: &str, req: VersionReq) -> Result<CrateVersion> {
        match self {
            Index::CommandLine(idx) => idx.match_record(name, req),
            Index::Git2(idx) => idx.match_record(name, req),
            Index::Remote(idx) => idx.match_record(name, req),
        }
    }

    fn commit_and_push(&self, msg: &str) -> Result<()> {
        match self {
            Index::CommandLine(idx) => idx.commit_and_push(msg),
            Index::Git2(idx) => idx.commit_and_push(msg),
            Index::Remote(idx) => idx.commit_and_push(msg),
        }
    }

    fn rollback(&self) -> Result<()> {
        match self {
            Index::CommandLine(idx) => idx.rollback(),
            Index::Git2(idx) => idx.rollback(),
            Index::Remote(idx) => idx.rollback(),
        }
    }

    fn add_record(&self, record: CrateVersion) -> Result<()> {
        match self {
            Index::CommandLine(idx) => idx.add_record(record),
            Index::Git2(idx) => idx.add_record(record),
            Index::Remote(idx) => idx.add_record(record),
        }
    }

    fn alter_record<F>(&self, name: &str, version: Version, func: F) -> Result<()>
    where
        F: FnOnce(&mut CrateVersion),
    {
        match self {
            Index::CommandLine(idx) => idx.alter_record(name, version, func),
            Index::Git2(idx) => idx.alter_record(name, version, func),
            Index::Remote(idx) => idx.alter_record(name, version, func),
        }
    }
}
