//! # Input Validation Utilities
//!
//! Security-focused checks applied to everything that ends up in a filesystem
//! path, an index file or an object key: crate names, versions, relative paths
//! and upload sizes.
//!
//! ```rust
//! use depot_core::validation::{validate_crate_name, validate_safe_path};
//!
//! assert!(validate_crate_name("serde_json").is_ok());
//! assert!(validate_crate_name("../etc").is_err());
//! assert!(validate_safe_path("se/rd/serde").is_ok());
//! ```

pub mod error;
pub mod limits;
pub mod manifests;
pub mod paths;

pub use self::{
    error::ValidationError,
    limits::{
        MAX_CRATE_NAME_LENGTH, MAX_CRATE_SIZE, MAX_METADATA_SIZE, MAX_PATH_DEPTH,
        MAX_VERSION_LENGTH,
    },
    manifests::{validate_crate_name, validate_publish_structure, validate_version},
    paths::validate_safe_path,
};

/// Result type for validation operations
pub type ValidationResult<T> = Result<T, ValidationError>;
