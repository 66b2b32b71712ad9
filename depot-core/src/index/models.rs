use std::collections::BTreeMap;

use semver::{Version, VersionReq};
use serde::{Deserialize, Serialize};

/// Represents a single crate version record, as stored in the crate index.
///
/// Each record is one line of newline-delimited JSON in the crate's index file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrateVersion {
    /// The name of the crate.
    pub name: String,
    /// The version of the crate.
    pub vers: Version,
    /// The dependencies of the crate.
    pub deps: Vec<CrateDependency>,
    /// The SHA256 checksum of the crate archive.
    pub cksum: String,
    /// The crate's features, mapping each feature to the features or dependencies it enables.
    pub features: BTreeMap<String, Vec<String>>,
    /// Whether this version was yanked.
    #[serde(default)]
    pub yanked: bool,
    /// The `links` value from the crate's manifest.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub links: Option<String>,
}

/// Represents a crate dependency, as found in an index record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrateDependency {
    /// Name of the dependency.
    ///
    /// If the dependency is renamed in the manifest, this is the new name.
    /// The original package name is stored in the `package` field.
    pub name: String,
    /// The semver requirement for this dependency.
    pub req: VersionReq,
    /// Array of features (as strings) enabled for this dependency.
    pub features: Vec<String>,
    /// Boolean of whether or not this is an optional dependency.
    pub optional: bool,
    /// Boolean of whether or not default features are enabled.
    pub default_features: bool,
    /// The target platform for the dependency.
    ///
    /// `None` if not a target dependency.
    /// Otherwise, a string such as `cfg(windows)`.
    #[serde(default)]
    pub target: Option<String>,
    /// The dependency kind.
    #[serde(default)]
    pub kind: DependencyKind,
    /// The URL of the index of the registry where this dependency is from.
    ///
    /// If not specified or `None`, it is assumed the dependency is in the current registry.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registry: Option<String>,
    /// If the dependency is renamed, this is the actual package name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub package: Option<String>,
}

/// Represents the kind of a crate dependency.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DependencyKind {
    /// A normal dependency.
    #[default]
    Normal,
    /// A dev-only dependency (tests, examples and benchmarks).
    Dev,
    /// A build dependency (build scripts).
    Build,
}

/// The `config.json` file found at the root of a crate index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexConfig {
    /// Download URL template for crate archives.
    pub dl: String,
    /// Root URL of the registry's web API.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api: Option<String>,
}
