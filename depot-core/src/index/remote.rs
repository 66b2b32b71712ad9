use reqwest::Method;
use semver::Version;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;

use crate::error::{RegistryError, Result};
use crate::index::{CrateVersion, IndexConfig, Indexer};
use crate::peer::{not_found_as, send, PeerConnection};
use crate::validation;

/// The 'remote' crate index management strategy type.
///
/// Every operation is forwarded to the internal index API of another depot
/// instance, which owns the actual index repository.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteIndex {
    #[serde(flatten)]
    pub peer: PeerConnection,
}

#[derive(Deserialize)]
struct UrlResponse {
    url: String,
}

impl RemoteIndex {
    pub fn new(url: impl Into<String>, token: Option<String>) -> Self {
        Self {
            peer: PeerConnection::new(url, token),
        }
    }
}

impl Indexer for RemoteIndex {
    fn url(&self) -> Result<String> {
        let response = send(self.peer.request(Method::GET, "index/url")?)?;
        Ok(response.json::<UrlResponse>()?.url)
    }

    fn refresh(&self) -> Result<()> {
        send(self.peer.request(Method::POST, "index/refresh")?)?;
        Ok(())
    }

    fn configuration(&self) -> Result<IndexConfig> {
        let response = send(self.peer.request(Method::GET, "index/config")?)?;
        Ok(response.json()?)
    }

    fn all_records(&self, name: &str) -> Result<Vec<CrateVersion>> {
        let name = validation::validate_crate_name(name)?;
        let request = self
            .peer
            .request(Method::GET, &format!("index/crates/{name}"))?;
        let response = not_found_as(send(request), || RegistryError::CrateNotFound {
            name: name.clone(),
        })?;
        Ok(response.json()?)
    }

    fn commit_and_push(&self, msg: &str) -> Result<()> {
        let request = self
            .peer
            .request(Method::POST, "index/commit")?
            .json(&json!({ "message": msg }));
        send(request)?;
        info!(url = %self.peer.url, message = %msg, "Committed remote index");
        Ok(())
    }

    fn rollback(&self) -> Result<()> {
        send(self.peer.request(Method::POST, "index/rollback")?)?;
        info!(url = %self.peer.url, "Rolled back remote index");
        Ok(())
    }

    fn add_record(&self, record: CrateVersion) -> Result<()> {
        match self.all_records(&record.name) {
            Ok(records) => {
                if records.iter().any(|r| r.vers == record.vers) {
                    let hosted = records
                        .iter()
                        .map(|r| r.vers.clone())
                        .max()
                        .unwrap_or_else(|| record.vers.clone());
                    return Err(RegistryError::VersionTooLow {
                        krate: record.name.clone(),
                        hosted,
                        published: record.vers.clone(),
                    }
                    .into());
                }
            }
            Err(e) if e.is_not_found() => {}
            Err(e) => return Err(e),
        }

        let request = self
            .peer
            .request(Method::POST, "index/crates")?
            .json(&record);
        send(request)?;
        Ok(())
    }

    fn alter_record<F>(&self, name: &str, version: Version, func: F) -> Result<()>
    where
        F: FnOnce(&mut CrateVersion),
    {
        let mut record = self
            .all_records(name)?
            .into_iter()
            .find(|r| r.vers == version)
            .ok_or_else(|| RegistryError::VersionNotFound {
                name: name.to_string(),
                version: version.to_string(),
            })?;
        func(&mut record);

        let request = self
            .peer
            .request(Method::PUT, &format!("index/crates/{}/{version}", record.name))?
            .json(&record);
        not_found_as(send(request), || RegistryError::VersionNotFound {
            name: name.to_string(),
            version: version.to_string(),
        })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::spawn_peer;
    use axum::{
        extract::{Path, State},
        http::{HeaderMap, StatusCode},
        routing::{get, post, put},
        Json, Router,
    };
    use std::collections::BTreeMap;
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct Peer {
        records: Mutex<Vec<CrateVersion>>,
        commits: Mutex<Vec<String>>,
        rollbacks: Mutex<usize>,
    }

    fn authorized(headers: &HeaderMap) -> bool {
        headers.get("authorization").and_then(|v| v.to_str().ok()) == Some("Bearer secret")
    }

    fn router(peer: Arc<Peer>) -> Router {
        Router::new()
            .route(
                "/internal/index/url",
                get(|headers: HeaderMap| async move {
                    if !authorized(&headers) {
                        return Err(StatusCode::UNAUTHORIZED);
                    }
                    Ok(Json(json!({ "url": "https://git.example.com/index.git" })))
                }),
            )
            .route(
                "/internal/index/config",
                get(|| async {
                    Json(IndexConfig {
                        dl: "http://peer/api/v1/crates".to_string(),
                        api: None,
                    })
                }),
            )
            .route(
                "/internal/index/crates/{name}",
                get(
                    |State(peer): State<Arc<Peer>>, Path(name): Path<String>| async move {
                        let records: Vec<_> = peer
                            .records
                            .lock()
                            .unwrap()
                            .iter()
                            .filter(|r| r.name == name)
                            .cloned()
                            .collect();
                        if records.is_empty() {
                            return Err(StatusCode::NOT_FOUND);
                        }
                        Ok(Json(records))
                    },
                ),
            )
            .route(
                "/internal/index/crates",
                post(
                    |State(peer): State<Arc<Peer>>, Json(record): Json<CrateVersion>| async move {
                        peer.records.lock().unwrap().push(record);
                        StatusCode::CREATED
                    },
                ),
            )
            .route(
                "/internal/index/crates/{name}/{version}",
                put(
                    |State(peer): State<Arc<Peer>>,
                     Path((name, version)): Path<(String, String)>,
                     Json(record): Json<CrateVersion>| async move {
                        let mut records = peer.records.lock().unwrap();
                        match records
                            .iter_mut()
                            .find(|r| r.name == name && r.vers.to_string() == version)
                        {
                            Some(existing) => {
                                *existing = record;
                                StatusCode::NO_CONTENT
                            }
                            None => StatusCode::NOT_FOUND,
                        }
                    },
                ),
            )
            .route(
                "/internal/index/commit",
                post(
                    |State(peer): State<Arc<Peer>>, Json(body): Json<serde_json::Value>| async move {
                        let message = body["message"].as_str().unwrap_or_default().to_string();
                        peer.commits.lock().unwrap().push(message);
                        StatusCode::NO_CONTENT
                    },
                ),
            )
            .route("/internal/index/refresh", post(|| async { StatusCode::NO_CONTENT }))
            .route(
                "/internal/index/rollback",
                post(|State(peer): State<Arc<Peer>>| async move {
                    *peer.rollbacks.lock().unwrap() += 1;
                    StatusCode::NO_CONTENT
                }),
            )
            .with_state(peer)
    }

    fn record(vers: &str) -> CrateVersion {
        CrateVersion {
            name: "remote-crate".to_string(),
            vers: Version::parse(vers).unwrap(),
            deps: vec![],
            cksum: "b".repeat(64),
            features: BTreeMap::new(),
            yanked: false,
            links: None,
        }
    }

    #[test]
    fn test_url_and_configuration() {
        let peer = Arc::new(Peer::default());
        let (_rt, base) = spawn_peer(router(peer));

        let index = RemoteIndex::new(&base, Some("secret".to_string()));
        assert_eq!(index.url().unwrap(), "https://git.example.com/index.git");
        assert_eq!(
            index.configuration().unwrap().dl,
            "http://peer/api/v1/crates"
        );
        index.refresh().unwrap();

        let unauthorized = RemoteIndex::new(&base, Some("wrong".to_string()));
        assert!(matches!(
            unauthorized.url(),
            Err(crate::Error::Remote { status: 401, .. })
        ));
    }

    #[test]
    fn test_records_round_trip() {
        let peer = Arc::new(Peer::default());
        let (_rt, base) = spawn_peer(router(peer.clone()));
        let index = RemoteIndex::new(&base, Some("secret".to_string()));

        assert!(index.all_records("remote-crate").unwrap_err().is_not_found());

        index.add_record(record("0.1.0")).unwrap();
        index.add_record(record("0.2.0")).unwrap();
        assert!(matches!(
            index.add_record(record("0.2.0")).unwrap_err().registry(),
            Some(RegistryError::VersionTooLow { .. })
        ));

        index
            .yank_record("remote-crate", Version::new(0, 2, 0))
            .unwrap();
        assert_eq!(
            index.latest_record("remote-crate").unwrap().vers,
            Version::new(0, 1, 0)
        );

        let err = index
            .yank_record("remote-crate", Version::new(3, 0, 0))
            .unwrap_err();
        assert!(matches!(
            err.registry(),
            Some(RegistryError::VersionNotFound { .. })
        ));

        index
            .commit_and_push("Yanking crate `remote-crate#0.2.0`")
            .unwrap();
        assert_eq!(
            peer.commits.lock().unwrap().as_slice(),
            ["Yanking crate `remote-crate#0.2.0`".to_string()]
        );

        index.rollback().unwrap();
        assert_eq!(*peer.rollbacks.lock().unwrap(), 1);
    }

    #[test]
    fn test_invalid_name_never_reaches_peer() {
        let index = RemoteIndex::new("http://127.0.0.1:9", None);
        assert!(matches!(
            index.all_records("../../etc"),
            Err(crate::Error::Validation(_))
        ));
    }
}
