//! # depot-core
//!
//! Building blocks of the depot crate registry, independent of any HTTP layer.
//!
//! ## Key Modules
//!
//! - [`index`]: the crate index record model and the index management strategies
//!   (`command-line`, `git2`, `remote`) behind the [`Indexer`] trait
//! - [`storage`]: crate archive and README persistence strategies
//!   (`disk`, `remote`, `s3`) behind the [`Store`] trait
//! - [`validation`]: crate name, version, path and size checks
//! - [`peer`]: the HTTP connection shared by the `remote` strategies
//! - [`error`]: the [`Error`] and [`RegistryError`] types shared by everything above
//!
//! Every operation exposed here is blocking. Async callers are expected to run
//! them on a blocking thread pool.

pub mod error;
pub mod index;
pub mod peer;
pub mod storage;
pub mod validation;

pub use error::{Error, RegistryError, Result};
pub use index::{CrateDependency, CrateVersion, DependencyKind, Index, IndexConfig, Indexer};
pub use storage::{Storage, Store};

/// Calculate the SHA-256 digest of `data` as lowercase hex.
///
/// This is the checksum format Cargo expects in the `cksum` field of index records.
///
/// ```
/// # use depot_core::sha256_hash;
/// let hash = sha256_hash(b"hello world");
/// assert_eq!(hash.len(), 64);
/// ```
pub fn sha256_hash(data: &[u8]) -> String {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(data);
    format!("{:x}", hasher.finalize())
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sha256_hash_known_value() {
        assert_eq!(
            sha256_hash(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
        assert_eq!(
            sha256_hash(b"hello world"),
            "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9"
        );
    }
}
