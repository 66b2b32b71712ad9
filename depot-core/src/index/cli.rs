use std::path::PathBuf;

use semver::Version;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::index::tree::Tree;
use crate::index::{CrateVersion, IndexConfig, Indexer};

/// The 'command-line' crate index management strategy type.
///
/// It manages the crate index through the invocation of "git" shell commands.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandLineIndex {
    /// The path of the crate index's local checkout.
    pub path: PathBuf,
    /// Author name used for index commits, overriding the git configuration.
    #[serde(default)]
    pub commit_name: Option<String>,
    /// Author email used for index commits, overriding the git configuration.
    #[serde(default)]
    pub commit_email: Option<String>,
}

impl CommandLineIndex {
    /// Create a CommandLineIndex instance with the given path.
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self {
            path: path.into(),
            commit_name: None,
            commit_email: None,
        }
    }

    fn tree(&self) -> Tree<'_> {
        Tree::new(&self.path)
    }

    /// Run `git` inside the index checkout and return its trimmed output.
    fn git(&self, args: &[&str]) -> Result<String> {
        let mut full_args = Vec::with_capacity(args.len() + 4);
        if let Some(name) = &self.commit_name {
            full_args.push("-c".to_string());
            full_args.push(format!("user.name={name}"));
        }
        if let Some(email) = &self.commit_email {
            full_args.push("-c".to_string());
            full_args.push(format!("user.email={email}"));
        }
        full_args.extend(args.iter().map(|arg| arg.to_string()));

        debug!(path = %self.path.display(), args = ?args, "Running git");
        let output = duct::cmd("git", &full_args)
            .dir(&self.path)
            .stderr_to_stdout()
            .stdout_capture()
            .unchecked()
            .run()?;

        let text = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if !output.status.success() {
            return Err(Error::Command {
                command: format!("git {}", args.join(" ")),
                output: text,
            });
        }

        Ok(text)
    }
}

impl Indexer for CommandLineIndex {
    fn url(&self) -> Result<String> {
        self.git(&["remote", "get-url", "origin"])
    }

    fn refresh(&self) -> Result<()> {
        self.git(&["pull", "--ff-only"])?;
        info!(path = %self.path.display(), "Refreshed crate index");
        Ok(())
    }

    fn configuration(&self) -> Result<IndexConfig> {
        self.tree().configuration()
    }

    fn all_records(&self, name: &str) -> Result<Vec<CrateVersion>> {
        self.tree().all_records(name)
    }

    fn commit_and_push(&self, msg: &str) -> Result<()> {
        self.git(&["add", "--all"])?;

        if self.git(&["status", "--porcelain"])?.is_empty() {
            debug!(message = %msg, "Index unchanged, nothing to commit");
            return Ok(());
        }

        self.git(&["commit", "-m", msg])?;
        self.git(&["push", "origin", "HEAD"])?;
        info!(message = %msg, "Pushed index commit");
        Ok(())
    }

    fn rollback(&self) -> Result<()> {
        let target = self
            .git(&["rev-parse", "--verify", "--quiet", "@{upstream}"])
            .unwrap_or_else(|_| "HEAD".to_string());
        self.git(&["reset", "--hard", &target])?;
        self.git(&["clean", "-fd"])?;
        warn!(path = %self.path.display(), target = %target, "Rolled back crate index");
        Ok(())
    }

    fn add_record(&self, record: CrateVersion) -> Result<()> {
        self.tree().add_record(&record)
    }

    fn alter_record<F>(&self, name: &str, version: Version, func: F) -> Result<()>
    where
        F: FnOnce(&mut CrateVersion),
    {
        self.tree().alter_record(name, &version, func)
    }
}
