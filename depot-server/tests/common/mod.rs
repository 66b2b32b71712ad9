//! Common test utilities and helpers
//!
//! Every test registry gets its own temporary directory holding a bare origin
//! repository, a `git2` checkout of it and a disk store, plus an in-memory
//! database.

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use axum::body::Bytes;
use axum::http::{header, HeaderValue};
use axum_test::{TestResponse, TestServer};
use depot_core::index::git::{init_index_repository, Git2Index};
use depot_core::storage::disk::DiskStorage;
use depot_core::{Index, IndexConfig, Storage};
use depot_server::api::payload::encode_publish_payload;
use depot_server::{build_router, AppState, Config};
use git2::Repository;
use serde_json::{json, Value};
use tempfile::TempDir;

pub const PUBLIC_URL: &str = "http://registry.test";
pub const INTERNAL_TOKEN: &str = "peer-secret";

pub struct TestRegistry {
    pub dir: TempDir,
    pub origin: PathBuf,
    pub state: AppState,
    pub server: TestServer,
}

/// Create an index repository, push it to a bare origin and clone it.
pub fn init_git_index(dir: &Path) -> (PathBuf, Git2Index) {
    let seed = dir.join("seed");
    let origin_path = dir.join("origin.git");
    let config = IndexConfig {
        dl: format!("{PUBLIC_URL}/api/v1/crates"),
        api: Some(PUBLIC_URL.to_string()),
    };
    init_index_repository(&seed, &config).unwrap();

    let origin = Repository::init_bare(&origin_path).unwrap();
    let seed_repo = Repository::open(&seed).unwrap();
    let branch = seed_repo.head().unwrap().shorthand().unwrap().to_string();
    let mut remote = seed_repo
        .remote("origin", origin_path.to_str().unwrap())
        .unwrap();
    let refspec = format!("refs/heads/{branch}:refs/heads/{branch}");
    remote.push(&[refspec.as_str()], None).unwrap();
    origin.set_head(&format!("refs/heads/{branch}")).unwrap();

    let checkout = dir.join("crate-index");
    Repository::clone(origin_path.to_str().unwrap(), &checkout).unwrap();
    let index = Git2Index {
        path: checkout,
        commit_name: Some("depot test".to_string()),
        commit_email: Some("test@depot.local".to_string()),
    };
    (origin_path, index)
}

/// Configuration for a registry living entirely inside `dir`.
pub fn test_config(dir: &Path, index: Git2Index) -> Config {
    let mut config = Config {
        index: Index::Git2(index),
        storage: Storage::Disk(DiskStorage::new(dir.join("crate-storage"))),
        ..Config::default()
    };
    config.general.public_url = PUBLIC_URL.to_string();
    config.database.url = ":memory:".to_string();
    config
}

/// Spin up a registry, letting `customize` adjust the configuration first.
pub fn registry_with(customize: impl FnOnce(&mut Config)) -> TestRegistry {
    let dir = TempDir::new().unwrap();
    let (origin, index) = init_git_index(dir.path());
    let mut config = test_config(dir.path(), index);
    customize(&mut config);

    let state = AppState::new(config).unwrap();
    let server = TestServer::new(build_router(state.clone())).unwrap();
    TestRegistry {
        dir,
        origin,
        state,
        server,
    }
}

pub fn registry() -> TestRegistry {
    registry_with(|_| {})
}

/// Keeps the origin repository out of reach until dropped, so pushes fail.
pub struct OfflineOrigin {
    origin: PathBuf,
    moved: PathBuf,
}

impl OfflineOrigin {
    pub fn new(origin: &Path) -> Self {
        let moved = origin.with_extension("offline");
        fs::rename(origin, &moved).unwrap();
        Self {
            origin: origin.to_path_buf(),
            moved,
        }
    }
}

impl Drop for OfflineOrigin {
    fn drop(&mut self) {
        fs::rename(&self.moved, &self.origin).unwrap();
    }
}

/// Commit message at the tip of the origin repository.
pub fn origin_head_message(origin: &Path) -> String {
    let repo = Repository::open_bare(origin).unwrap();
    let commit = repo.head().unwrap().peel_to_commit().unwrap();
    commit.message().unwrap().to_string()
}

pub fn auth(token: &str) -> HeaderValue {
    HeaderValue::from_str(token).unwrap()
}

/// Register an account and return its API token.
pub async fn register(server: &TestServer, email: &str) -> String {
    let response = server
        .post("/api/v1/account/register")
        .json(&json!({ "email": email, "name": email.split('@').next().unwrap(), "passwd": "hunter22" }))
        .await;
    response.assert_status_ok();
    response.json::<Value>()["token"]
        .as_str()
        .unwrap()
        .to_string()
}

/// Publish metadata as `cargo publish` sends it.
pub fn metadata(name: &str, vers: &str) -> Value {
    json!({
        "name": name,
        "vers": vers,
        "deps": [],
        "features": {},
        "authors": ["Test Author <test@depot.local>"],
        "description": format!("The {name} crate"),
        "documentation": null,
        "homepage": null,
        "readme": format!("# {name}\n\nVersion {vers}."),
        "readme_file": "README.md",
        "keywords": ["test"],
        "categories": ["development-tools"],
        "license": "MIT",
        "license_file": null,
        "repository": null,
        "links": null
    })
}

/// Bytes standing in for the `.crate` archive of `name#vers`.
pub fn crate_archive(name: &str, vers: &str) -> Vec<u8> {
    format!("{name}-{vers}.crate contents").into_bytes()
}

pub fn publish_body(metadata: &Value, archive: &[u8]) -> Bytes {
    let metadata = serde_json::to_vec(metadata).unwrap();
    Bytes::from(encode_publish_payload(&metadata, archive))
}

pub async fn publish_metadata(server: &TestServer, token: &str, metadata: &Value) -> TestResponse {
    let name = metadata["name"].as_str().unwrap();
    let vers = metadata["vers"].as_str().unwrap();
    server
        .put("/api/v1/crates/new")
        .add_header(header::AUTHORIZATION, auth(token))
        .bytes(publish_body(metadata, &crate_archive(name, vers)))
        .await
}

pub async fn publish(server: &TestServer, token: &str, name: &str, vers: &str) -> TestResponse {
    publish_metadata(server, token, &metadata(name, vers)).await
}

/// First error detail of a Cargo-style error body.
pub fn error_detail(response: &TestResponse) -> String {
    response.json::<Value>()["errors"][0]["detail"]
        .as_str()
        .unwrap_or_default()
        .to_string()
}
