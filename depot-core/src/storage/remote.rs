use std::io::Read;

use reqwest::Method;
use semver::Version;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{RegistryError, Result};
use crate::peer::{not_found_as, send, PeerConnection};
use crate::storage::Store;
use crate::validation;

/// The 'remote' storage strategy.
///
/// Archives and READMEs live on another depot instance and are exchanged
/// through its internal storage API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteStorage {
    #[serde(flatten)]
    pub peer: PeerConnection,
}

impl RemoteStorage {
    pub fn new(url: impl Into<String>, token: Option<String>) -> Self {
        Self {
            peer: PeerConnection::new(url, token),
        }
    }

    fn path(kind: &str, name: &str, version: &Version) -> Result<String> {
        let name = validation::validate_crate_name(name)?;
        Ok(format!("storage/{kind}/{name}/{version}"))
    }

    fn fetch(
        &self,
        kind: &str,
        name: &str,
        version: &Version,
    ) -> Result<reqwest::blocking::Response> {
        let request = self
            .peer
            .request(Method::GET, &Self::path(kind, name, version)?)?;
        not_found_as(send(request), || RegistryError::VersionNotFound {
            name: name.to_string(),
            version: version.to_string(),
        })
    }

    fn upload(&self, kind: &str, name: &str, version: &Version, body: Vec<u8>) -> Result<()> {
        let request = self
            .peer
            .request(Method::PUT, &Self::path(kind, name, version)?)?
            .body(body);
        send(request)?;
        Ok(())
    }
}

impl Store for RemoteStorage {
    fn get_crate(&self, name: &str, version: &Version) -> Result<Vec<u8>> {
        Ok(self.fetch("crates", name, version)?.bytes()?.to_vec())
    }

    fn read_crate(&self, name: &str, version: &Version) -> Result<Box<dyn Read + Send>> {
        Ok(Box::new(self.fetch("crates", name, version)?))
    }

    fn store_crate(&self, name: &str, version: &Version, data: &[u8]) -> Result<()> {
        self.upload("crates", name, version, data.to_vec())?;
        info!(url = %self.peer.url, name = %name, version = %version, "Stored crate archive on peer");
        Ok(())
    }

    fn get_readme(&self, name: &str, version: &Version) -> Result<String> {
        Ok(self.fetch("readmes", name, version)?.text()?)
    }

    fn read_readme(&self, name: &str, version: &Version) -> Result<Box<dyn Read + Send>> {
        Ok(Box::new(self.fetch("readmes", name, version)?))
    }

    fn store_readme(&self, name: &str, version: &Version, data: &str) -> Result<()> {
        self.upload("readmes", name, version, data.as_bytes().to_vec())
    }

    fn delete_version(&self, name: &str, version: &Version) -> Result<()> {
        let name = validation::validate_crate_name(name)?;
        let request = self
            .peer
            .request(Method::DELETE, &format!("storage/{name}/{version}"))?;
        send(request)?;
        info!(url = %self.peer.url, name = %name, version = %version, "Deleted objects on peer");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::spawn_peer;
    use axum::{
        body::Bytes,
        extract::{Path, State},
        http::{HeaderMap, StatusCode},
        routing::{delete, get},
        Router,
    };
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    type Objects = Arc<Mutex<HashMap<String, Vec<u8>>>>;

    fn router(objects: Objects) -> Router {
        Router::new()
            .route(
                "/internal/storage/{kind}/{name}/{version}",
                get(
                    |State(objects): State<Objects>,
                     headers: HeaderMap,
                     Path((kind, name, version)): Path<(String, String, String)>| async move {
                        if headers.get("authorization").is_none() {
                            return Err(StatusCode::UNAUTHORIZED);
                        }
                        objects
                            .lock()
                            .unwrap()
                            .get(&format!("{kind}/{name}/{version}"))
                            .cloned()
                            .ok_or(StatusCode::NOT_FOUND)
                    },
                )
                .put(
                    |State(objects): State<Objects>,
                     Path((kind, name, version)): Path<(String, String, String)>,
                     body: Bytes| async move {
                        objects
                            .lock()
                            .unwrap()
                            .insert(format!("{kind}/{name}/{version}"), body.to_vec());
                        StatusCode::NO_CONTENT
                    },
                ),
            )
            .route(
                "/internal/storage/{name}/{version}",
                delete(
                    |State(objects): State<Objects>,
                     Path((name, version)): Path<(String, String)>| async move {
                        let mut objects = objects.lock().unwrap();
                        for kind in ["crates", "readmes"] {
                            objects.remove(&format!("{kind}/{name}/{version}"));
                        }
                        StatusCode::NO_CONTENT
                    },
                ),
            )
            .with_state(objects)
    }

    #[test]
    fn test_store_and_fetch() {
        let objects = Objects::default();
        let (_rt, base) = spawn_peer(router(objects.clone()));
        let storage = RemoteStorage::new(base, Some("secret".to_string()));
        let version = Version::new(0, 3, 1);

        storage.store_crate("widget", &version, b"archive").unwrap();
        storage.store_readme("widget", &version, "# Widget").unwrap();

        assert!(objects
            .lock()
            .unwrap()
            .contains_key("crates/widget/0.3.1"));
        assert_eq!(storage.get_crate("widget", &version).unwrap(), b"archive");
        assert_eq!(storage.get_readme("widget", &version).unwrap(), "# Widget");
        assert!(storage.crate_exists("widget", &version));

        let mut text = String::new();
        storage
            .read_readme("widget", &version)
            .unwrap()
            .read_to_string(&mut text)
            .unwrap();
        assert_eq!(text, "# Widget");

        storage.delete_version("widget", &version).unwrap();
        assert!(objects.lock().unwrap().is_empty());
        assert!(!storage.crate_exists("widget", &version));
    }

    #[test]
    fn test_missing_object_is_version_not_found() {
        let (_rt, base) = spawn_peer(router(Objects::default()));
        let storage = RemoteStorage::new(base, Some("secret".to_string()));

        let err = storage
            .get_crate("widget", &Version::new(1, 0, 0))
            .unwrap_err();
        assert!(matches!(
            err.registry(),
            Some(RegistryError::VersionNotFound { .. })
        ));
        assert!(!storage.crate_exists("widget", &Version::new(1, 0, 0)));
    }

    #[test]
    fn test_missing_token_is_rejected() {
        let (_rt, base) = spawn_peer(router(Objects::default()));
        let storage = RemoteStorage::new(base, None);
        assert!(matches!(
            storage.get_crate("widget", &Version::new(1, 0, 0)),
            Err(crate::Error::Remote { status: 401, .. })
        ));
    }
}
