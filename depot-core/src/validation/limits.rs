//! # Input Validation: Size Limits
//!
//! Default limits applied to publish payloads. The server may lower or raise
//! the crate size limit through its configuration.

/// Default maximum size of a `.crate` archive (10 MiB, same as crates.io)
pub const MAX_CRATE_SIZE: u64 = 10 * 1024 * 1024;

/// Maximum size of the JSON metadata section of a publish payload (1 MiB)
pub const MAX_METADATA_SIZE: usize = 1024 * 1024;

/// Maximum crate name length accepted by Cargo
pub const MAX_CRATE_NAME_LENGTH: usize = 64;

/// Maximum version string length
pub const MAX_VERSION_LENGTH: usize = 128;

/// Maximum depth of a relative path (index paths are at most 3 deep)
pub const MAX_PATH_DEPTH: usize = 10;
