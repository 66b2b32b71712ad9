//! Request and response bodies of the Cargo registry web API.

use std::collections::BTreeMap;

use depot_core::{CrateDependency, CrateVersion, DependencyKind, RegistryError};
use semver::{Version, VersionReq};
use serde::{Deserialize, Serialize};

use crate::db::{Author, CrateMetadata};

/// JSON metadata section of a publish payload, as sent by `cargo publish`.
#[derive(Debug, Clone, Deserialize)]
pub struct PublishMetadata {
    pub name: String,
    pub vers: String,
    #[serde(default)]
    pub deps: Vec<PublishDependency>,
    #[serde(default)]
    pub features: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    pub authors: Vec<String>,
    pub description: Option<String>,
    pub documentation: Option<String>,
    pub homepage: Option<String>,
    /// README contents, when the package has one
    pub readme: Option<String>,
    pub readme_file: Option<String>,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub categories: Vec<String>,
    pub license: Option<String>,
    pub license_file: Option<String>,
    pub repository: Option<String>,
    pub links: Option<String>,
}

/// A dependency as described in a publish payload.
#[derive(Debug, Clone, Deserialize)]
pub struct PublishDependency {
    /// Name of the package the dependency points to
    pub name: String,
    pub version_req: String,
    #[serde(default)]
    pub features: Vec<String>,
    #[serde(default)]
    pub optional: bool,
    #[serde(default = "default_true")]
    pub default_features: bool,
    pub target: Option<String>,
    #[serde(default)]
    pub kind: DependencyKind,
    pub registry: Option<String>,
    /// Name the dependency is imported under, when renamed in `Cargo.toml`
    pub explicit_name_in_toml: Option<String>,
}

fn default_true() -> bool {
    true
}

impl PublishDependency {
    /// The index form of this dependency. Renamed dependencies keep their
    /// real package name in `package`.
    pub fn into_index_dependency(self) -> Result<CrateDependency, RegistryError> {
        let req = VersionReq::parse(&self.version_req).map_err(|e| {
            RegistryError::InvalidPayload {
                reason: format!(
                    "dependency '{}' has an invalid version requirement '{}': {e}",
                    self.name, self.version_req
                ),
            }
        })?;

        let (name, package) = match self.explicit_name_in_toml {
            Some(explicit) => (explicit, Some(self.name)),
            None => (self.name, None),
        };

        Ok(CrateDependency {
            name,
            req,
            features: self.features,
            optional: self.optional,
            default_features: self.default_features,
            target: self.target,
            kind: self.kind,
            registry: self.registry,
            package,
        })
    }
}

impl PublishMetadata {
    /// Descriptive fields stored in the database.
    pub fn crate_metadata(&self) -> CrateMetadata {
        CrateMetadata {
            description: self.description.clone(),
            documentation: self.documentation.clone(),
            homepage: self.homepage.clone(),
            repository: self.repository.clone(),
        }
    }

    /// The index record for this publish.
    pub fn into_record(self, vers: Version, cksum: String) -> Result<CrateVersion, RegistryError> {
        let deps = self
            .deps
            .into_iter()
            .map(PublishDependency::into_index_dependency)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(CrateVersion {
            name: self.name,
            vers,
            deps,
            cksum,
            features: self.features,
            yanked: false,
            links: self.links,
        })
    }
}

#[derive(Debug, Serialize, Default)]
pub struct PublishWarnings {
    pub invalid_categories: Vec<String>,
    pub invalid_badges: Vec<String>,
    pub other: Vec<String>,
}

#[derive(Debug, Serialize, Default)]
pub struct PublishResponse {
    pub warnings: PublishWarnings,
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub q: Option<String>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct SearchResult {
    pub name: String,
    pub max_version: String,
    pub description: Option<String>,
    pub downloads: i64,
}

#[derive(Debug, Serialize)]
pub struct SearchMeta {
    pub total: i64,
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub crates: Vec<SearchResult>,
    pub meta: SearchMeta,
}

#[derive(Debug, Serialize)]
pub struct OwnerUser {
    pub id: i64,
    pub login: String,
    pub name: Option<String>,
}

impl From<Author> for OwnerUser {
    fn from(author: Author) -> Self {
        Self {
            id: author.id,
            login: author.email,
            name: Some(author.name),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct OwnersResponse {
    pub users: Vec<OwnerUser>,
}

#[derive(Debug, Deserialize)]
pub struct OwnersRequest {
    pub users: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub name: String,
    pub passwd: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub passwd: String,
}

#[derive(Debug, Deserialize)]
pub struct TokenRequest {
    pub name: String,
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub token: String,
}

#[derive(Debug, Serialize)]
pub struct RevokeResponse {
    pub revoked: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_renamed_dependency_keeps_package_name() {
        let dep: PublishDependency = serde_json::from_value(json!({
            "name": "serde_json",
            "version_req": "^1.0",
            "features": [],
            "optional": false,
            "default_features": true,
            "target": null,
            "kind": "normal",
            "registry": null,
            "explicit_name_in_toml": "json"
        }))
        .unwrap();

        let dep = dep.into_index_dependency().unwrap();
        assert_eq!(dep.name, "json");
        assert_eq!(dep.package.as_deref(), Some("serde_json"));
        assert_eq!(dep.req, VersionReq::parse("^1.0").unwrap());
    }

    #[test]
    fn test_plain_dependency_has_no_package() {
        let dep: PublishDependency = serde_json::from_value(json!({
            "name": "rand",
            "version_req": "0.9",
            "kind": "dev"
        }))
        .unwrap();

        let dep = dep.into_index_dependency().unwrap();
        assert_eq!(dep.name, "rand");
        assert_eq!(dep.package, None);
        assert_eq!(dep.kind, DependencyKind::Dev);
        assert!(dep.default_features);
    }

    #[test]
    fn test_invalid_requirement() {
        let dep: PublishDependency = serde_json::from_value(json!({
            "name": "rand",
            "version_req": "not a req"
        }))
        .unwrap();
        assert!(matches!(
            dep.into_index_dependency(),
            Err(RegistryError::InvalidPayload { .. })
        ));
    }
}
