use std::fs::{self, File};
use std::io::{self, Read};
use std::path::PathBuf;

use semver::Version;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{RegistryError, Result};
use crate::index::tree::write_atomic;
use crate::storage::Store;
use crate::validation;

/// The local disk storage strategy.
///
/// Layout: `{path}/crates/{name}-{version}.crate` and
/// `{path}/readmes/{name}-{version}.md`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiskStorage {
    /// The root directory of the storage.
    pub path: PathBuf,
}

impl DiskStorage {
    /// Instantiate a new disk storage at the given path.
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }

    fn crate_path(&self, name: &str, version: &Version) -> Result<PathBuf> {
        let name = validation::validate_crate_name(name)?;
        Ok(self
            .path
            .join("crates")
            .join(format!("{name}-{version}.crate")))
    }

    fn readme_path(&self, name: &str, version: &Version) -> Result<PathBuf> {
        let name = validation::validate_crate_name(name)?;
        Ok(self
            .path
            .join("readmes")
            .join(format!("{name}-{version}.md")))
    }

    fn open(path: PathBuf, name: &str, version: &Version) -> Result<File> {
        File::open(&path).map_err(|e| not_found_as_version(e, name, version))
    }
}

fn not_found_as_version(err: io::Error, name: &str, version: &Version) -> crate::Error {
    if err.kind() == io::ErrorKind::NotFound {
        RegistryError::VersionNotFound {
            name: name.to_string(),
            version: version.to_string(),
        }
        .into()
    } else {
        err.into()
    }
}

impl Store for DiskStorage {
    fn get_crate(&self, name: &str, version: &Version) -> Result<Vec<u8>> {
        let mut data = Vec::new();
        self.read_crate(name, version)?.read_to_end(&mut data)?;
        Ok(data)
    }

    fn read_crate(&self, name: &str, version: &Version) -> Result<Box<dyn Read + Send>> {
        let path = self.crate_path(name, version)?;
        Ok(Box::new(Self::open(path, name, version)?))
    }

    fn store_crate(&self, name: &str, version: &Version, data: &[u8]) -> Result<()> {
        let path = self.crate_path(name, version)?;
        write_atomic(&path, data)?;
        info!(path = %path.display(), size = data.len(), "Stored crate archive");
        Ok(())
    }

    fn get_readme(&self, name: &str, version: &Version) -> Result<String> {
        let mut text = String::new();
        self.read_readme(name, version)?.read_to_string(&mut text)?;
        Ok(text)
    }

    fn read_readme(&self, name: &str, version: &Version) -> Result<Box<dyn Read + Send>> {
        let path = self.readme_path(name, version)?;
        Ok(Box::new(Self::open(path, name, version)?))
    }

    fn store_readme(&self, name: &str, version: &Version, data: &str) -> Result<()> {
        let path = self.readme_path(name, version)?;
        write_atomic(&path, data.as_bytes())?;
        debug!(path = %path.display(), "Stored README");
        Ok(())
    }

    fn crate_exists(&self, name: &str, version: &Version) -> bool {
        self.crate_path(name, version)
            .map(|path| fs::metadata(path).is_ok_and(|m| m.is_file()))
            .unwrap_or(false)
    }

    fn delete_version(&self, name: &str, version: &Version) -> Result<()> {
        for path in [
            self.crate_path(name, version)?,
            self.readme_path(name, version)?,
        ] {
            match fs::remove_file(&path) {
                Ok(()) => debug!(path = %path.display(), "Removed stored object"),
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }
}
