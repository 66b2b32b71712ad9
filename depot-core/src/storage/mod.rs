//! Crate archive and README storage.
//!
//! The [`Store`] trait describes how the registry persists published crates;
//! [`Storage`] selects one of the available strategies from configuration.

use std::io::{Cursor, Read};

use semver::Version;
use serde::{Deserialize, Serialize};

/// Local filesystem storage.
pub mod disk;
/// Storage delegated to another registry instance over HTTP.
pub mod remote;
/// S3-compatible object storage.
pub mod s3;
pub mod sigv4;

use crate::error::Result;
use crate::storage::disk::DiskStorage;
use crate::storage::remote::RemoteStorage;
use crate::storage::s3::S3Storage;

/// The crate storage strategy type.
///
/// It represents which storage strategy is currently used.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Storage {
    /// Stores crates and READMEs in a local directory.
    #[serde(rename = "disk")]
    Disk(DiskStorage),
    /// Stores crates and READMEs through the internal API of another instance.
    #[serde(rename = "remote")]
    Remote(RemoteStorage),
    /// Stores crates and READMEs in an S3-compatible bucket.
    #[serde(rename = "s3")]
    S3(S3Storage),
}

impl Storage {
    /// Short name of the strategy, as written in configuration.
    pub fn kind(&self) -> &'static str {
        match self {
            Storage::Disk(_) => "disk",
            Storage::Remote(_) => "remote",
            Storage::S3(_) => "s3",
        }
    }
}

/// The required trait that any storage type must implement.
pub trait Store {
    /// Retrieves a crate tarball from the store.
    fn get_crate(&self, name: &str, version: &Version) -> Result<Vec<u8>>;
    /// Reads a crate tarball from the store.
    fn read_crate(&self, name: &str, version: &Version) -> Result<Box<dyn Read + Send>> {
        Ok(Box::new(Cursor::new(self.get_crate(name, version)?)))
    }
    /// Stores a crate tarball.
    fn store_crate(&self, name: &str, version: &Version, data: &[u8]) -> Result<()>;
    /// Retrieves a rendered README from the store.
    fn get_readme(&self, name: &str, version: &Version) -> Result<String>;
    /// Reads a rendered README from the store.
    fn read_readme(&self, name: &str, version: &Version) -> Result<Box<dyn Read + Send>> {
        Ok(Box::new(Cursor::new(
            self.get_readme(name, version)?.into_bytes(),
        )))
    }
    /// Stores a rendered README.
    fn store_readme(&self, name: &str, version: &Version, data: &str) -> Result<()>;
    /// Whether the crate tarball of this version is present.
    fn crate_exists(&self, name: &str, version: &Version) -> bool {
        self.get_crate(name, version).is_ok()
    }
    /// Removes the tarball and README of a version. Missing objects are not an error.
    fn delete_version(&self, name: &str, version: &Version) -> Result<()>;
}

impl Store for Storage {
    fn get_crate(&self, name: &str, version: &Version) -> Result<Vec<u8>> {
        match self {
            Storage::Disk(storage) => storage.get_crate(name, version),
            Storage::Remote(storage) => storage.get_crate(name, version),
            Storage::S3(storage) => storage.get_crate(name, version),
        }
    }

    fn read_crate(&self, name: &str, version: &Version) -> Result<Box<dyn Read + Send>> {
        match self {
            Storage::Disk(storage) => storage.read_crate(name, version),
            Storage::Remote(storage) => storage.read_crate(name, version),
            Storage::S3(storage) => storage.read_crate(name, version),
        }
    }

    fn store_crate(&self, name: &str, version: &Version, data: &[u8]) -> Result<()> {
        match self {
            Storage::Disk(storage) => storage.store_crate(name, version, data),
            Storage::Remote(storage) => storage.store_crate(name, version, data),
            Storage::S3(storage) => storage.store_crate(name, version, data),
        }
    }

    fn get_readme(&self, name: &str, version: &Version) -> Result<String> {
        match self {
            Storage::Disk(storage) => storage.get_readme(name, version),
            Storage::Remote(storage) => storage.get_readme(name, version),
            Storage::S3(storage) => storage.get_readme(name, version),
        }
    }

    fn read_readme(&self, name: &str, version: &Version) -> Result<Box<dyn Read + Send>> {
        match self {
            Storage::Disk(storage) => storage.read_readme(name, version),
            Storage::Remote(storage) => storage.read_readme(name, version),
            Storage::S3(storage) => storage.read_readme(name, version),
        }
    }

    fn store_readme(&self, name: &str, version: &Version, data: &str) -> Result<()> {
        match self {
            Storage::Disk(storage) => storage.store_readme(name, version, data),
            Storage::Remote(storage) => storage.store_readme(name, version, data),
            Storage::S3(storage) => storage.store_readme(name, version, data),
        }
    }

    fn crate_exists(&self, name: &str, version: &Version) -> bool {
        match self {
            Storage::Disk(storage) => storage.crate_exists(name, version),
            Storage::Remote(storage) => storage.crate_exists(name, version),
            Storage::S3(storage) => storage.crate_exists(name, version),
        }
    }

    fn delete_version(&self, name: &str, version: &Version) -> Result<()> {
        match self {
            Storage::Disk(storage) => storage.delete_version(name, version),
            Storage::Remote(storage) => storage.delete_version(name, version),
            Storage::S3(storage) => storage.delete_version(name, version),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_deserializes_from_tagged_config() {
        let storage: Storage =
            serde_json::from_str(r#"{"type":"disk","path":"crate-storage"}"#).unwrap();
        assert_eq!(storage.kind(), "disk");

        let storage: Storage =
            serde_json::from_str(r#"{"type":"remote","url":"http://peer","token":"t"}"#).unwrap();
        assert_eq!(storage.kind(), "remote");

        let storage: Storage = serde_json::from_str(
            r#"{"type":"s3","bucket":"crates","region":"eu-west-1"}"#,
        )
        .unwrap();
        assert_eq!(storage.kind(), "s3");

        assert!(serde_json::from_str::<Storage>(r#"{"type":"ftp"}"#).is_err());
    }
}
