use std::fs;
use std::path::{Path, PathBuf};

use git2::build::CheckoutBuilder;
use git2::{
    Cred, CredentialType, FetchOptions, IndexAddOption, ObjectType, PushOptions, RemoteCallbacks,
    Repository, ResetType, Signature,
};
use semver::Version;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::index::tree::Tree;
use crate::index::{CrateVersion, IndexConfig, Indexer};

const DEFAULT_COMMIT_NAME: &str = "depot";
const DEFAULT_COMMIT_EMAIL: &str = "depot@localhost";
const MAX_CREDENTIAL_ATTEMPTS: usize = 3;

/// The 'git2' crate index management strategy type.
///
/// It manages the crate index through libgit2, without requiring a `git`
/// executable on the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Git2Index {
    /// The path of the crate index's local checkout.
    pub path: PathBuf,
    /// Author name used for index commits.
    #[serde(default)]
    pub commit_name: Option<String>,
    /// Author email used for index commits.
    #[serde(default)]
    pub commit_email: Option<String>,
}

impl Git2Index {
    /// Create a Git2Index instance with the given path.
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self {
            path: path.into(),
            commit_name: None,
            commit_email: None,
        }
    }

    fn repository(&self) -> Result<Repository> {
        Ok(Repository::open(&self.path)?)
    }

    fn tree(&self) -> Tree<'_> {
        Tree::new(&self.path)
    }

    fn push(&self, repo: &Repository, branch: &str) -> Result<()> {
        let mut remote = repo.find_remote("origin")?;
        let refspec = format!("refs/heads/{branch}:refs/heads/{branch}");

        let mut rejected: Option<String> = None;
        {
            let mut callbacks = remote_callbacks();
            callbacks.push_update_reference(|refname, status| {
                if let Some(status) = status {
                    rejected = Some(format!("{refname}: {status}"));
                }
                Ok(())
            });
            let mut options = PushOptions::new();
            options.remote_callbacks(callbacks);
            remote.push(&[refspec.as_str()], Some(&mut options))?;
        }

        match rejected {
            Some(reason) => Err(Error::Git(git2::Error::from_str(&format!(
                "push rejected by origin: {reason}"
            )))),
            None => Ok(()),
        }
    }
}

impl Indexer for Git2Index {
    fn url(&self) -> Result<String> {
        let repo = self.repository()?;
        let remote = repo.find_remote("origin")?;
        let url = remote
            .url()
            .ok_or_else(|| git2::Error::from_str("the 'origin' remote has no valid URL"))?;
        Ok(url.to_string())
    }

    fn refresh(&self) -> Result<()> {
        let repo = self.repository()?;
        let branch = current_branch(&repo)?;

        let tracking = tracking_ref(&branch);
        let refspec = format!("+refs/heads/{branch}:{tracking}");
        let mut remote = repo.find_remote("origin")?;
        let mut options = FetchOptions::new();
        options.remote_callbacks(remote_callbacks());
        remote.fetch(&[refspec.as_str()], Some(&mut options), None)?;

        let upstream = repo.find_reference(&tracking)?;
        let fetch_commit = repo.reference_to_annotated_commit(&upstream)?;
        let (analysis, _) = repo.merge_analysis(&[&fetch_commit])?;

        if analysis.is_up_to_date() {
            debug!(branch = %branch, "Crate index already up to date");
            return Ok(());
        }

        if !analysis.is_fast_forward() {
            warn!(branch = %branch, "Crate index has diverged from origin");
            return Err(Error::Git(git2::Error::from_str(&format!(
                "local branch '{branch}' cannot be fast-forwarded to origin"
            ))));
        }

        let refname = format!("refs/heads/{branch}");
        match repo.find_reference(&refname) {
            Ok(mut reference) => {
                reference.set_target(fetch_commit.id(), "depot: fast-forward")?;
            }
            Err(_) => {
                repo.reference(&refname, fetch_commit.id(), true, "depot: fast-forward")?;
            }
        }
        repo.set_head(&refname)?;
        repo.checkout_head(Some(CheckoutBuilder::default().force()))?;

        info!(branch = %branch, commit = %fetch_commit.id(), "Refreshed crate index");
        Ok(())
    }

    fn configuration(&self) -> Result<IndexConfig> {
        self.tree().configuration()
    }

    fn all_records(&self, name: &str) -> Result<Vec<CrateVersion>> {
        self.tree().all_records(name)
    }

    fn commit_and_push(&self, msg: &str) -> Result<()> {
        let repo = self.repository()?;
        let branch = current_branch(&repo)?;

        let mut index = repo.index()?;
        index.add_all(["*"].iter(), IndexAddOption::DEFAULT, None)?;
        index.update_all(["*"].iter(), None)?;
        index.write()?;
        let tree_id = index.write_tree()?;

        let parent = repo.head().ok().and_then(|head| head.peel_to_commit().ok());
        if parent.as_ref().is_some_and(|p| p.tree_id() == tree_id) {
            debug!(message = %msg, "Index unchanged, nothing to commit");
            return Ok(());
        }

        let tree = repo.find_tree(tree_id)?;
        let signature = signature(
            &repo,
            self.commit_name.as_deref(),
            self.commit_email.as_deref(),
        )?;
        let parents: Vec<&git2::Commit> = parent.iter().collect();
        let commit = repo.commit(Some("HEAD"), &signature, &signature, msg, &tree, &parents)?;
        debug!(commit = %commit, message = %msg, "Committed index changes");

        self.push(&repo, &branch)?;
        info!(branch = %branch, message = %msg, "Pushed index commit");
        Ok(())
    }

    fn rollback(&self) -> Result<()> {
        let repo = self.repository()?;
        let branch = current_branch(&repo)?;

        let target = match repo.find_reference(&tracking_ref(&branch)) {
            Ok(upstream) => upstream.peel(ObjectType::Commit)?,
            Err(_) => repo.head()?.peel(ObjectType::Commit)?,
        };
        let mut checkout = CheckoutBuilder::new();
        checkout.force().remove_untracked(true);
        repo.reset(&target, ResetType::Hard, Some(&mut checkout))?;

        warn!(branch = %branch, commit = %target.id(), "Rolled back crate index");
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

/// Create a new index repository at `path` holding `config` as its `config.json`.
///
/// The configuration is committed on the default branch, ready to be pushed
/// to the repository the registry will use as its origin.
pub fn init_index_repository(path: &Path, config: &IndexConfig) -> Result<()> {
    fs::create_dir_all(path)?;
    let repo = Repository::init(path)?;

    let content = serde_json::to_string_pretty(config)?;
    fs::write(path.join("config.json"), format!("{content}\n"))?;

    let mut index = repo.index()?;
    index.add_path(Path::new("config.json"))?;
    index.write()?;
    let tree = repo.find_tree(index.write_tree()?)?;

    let signature = signature(&repo, None, None)?;
    repo.commit(
        Some("HEAD"),
        &signature,
        &signature,
        "Initial index configuration",
        &tree,
        &[],
    )?;

    info!(path = %path.display(), dl = %config.dl, "Initialized crate index repository");
    Ok(())
}

/// Remote-tracking reference of `branch` on origin.
fn tracking_ref(branch: &str) -> String {
    format!("refs/remotes/origin/{branch}")
}

/// Name of the branch `HEAD` points to, even if it has no commits yet.
fn current_branch(repo: &Repository) -> Result<String> {
    let head = repo.find_reference("HEAD")?;
    let target = head
        .symbolic_target()
        .ok_or_else(|| git2::Error::from_str("HEAD is detached"))?;
    Ok(target.trim_start_matches("refs/heads/").to_string())
}

/// Commit signature from explicit values, then the repository configuration,
/// then built-in defaults.
fn signature(
    repo: &Repository,
    name: Option<&str>,
    email: Option<&str>,
) -> Result<Signature<'static>> {
    let config = repo.config()?;
    let name = name
        .map(str::to_string)
        .or_else(|| config.get_string("user.name").ok())
        .unwrap_or_else(|| DEFAULT_COMMIT_NAME.to_string());
    let email = email
        .map(str::to_string)
        .or_else(|| config.get_string("user.email").ok())
        .unwrap_or_else(|| DEFAULT_COMMIT_EMAIL.to_string());
    Ok(Signature::now(&name, &email)?)
}

/// Authentication for fetch and push: SSH agent, then default credentials,
/// then the configured git credential helper.
fn remote_callbacks<'a>() -> RemoteCallbacks<'a> {
    let mut attempts = 0;
    let mut callbacks = RemoteCallbacks::new();
    callbacks.credentials(move |url, username, allowed| {
        attempts += 1;
        if attempts > MAX_CREDENTIAL_ATTEMPTS {
            return Err(git2::Error::from_str("authentication failed for origin"));
        }

        if allowed.contains(CredentialType::SSH_KEY) {
            if let Some(username) = username {
                return Cred::ssh_key_from_agent(username);
            }
        }
        if allowed.contains(CredentialType::DEFAULT) {
            return Cred::default();
        }
        let config = git2::Config::open_default()?;
        Cred::credential_helper(&config, url, username)
    });
    callbacks
}
