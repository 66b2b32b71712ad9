//! # Input Validation: Crate Manifests
//!
//! Validation of the identity of a published crate (name and version) and of
//! the framing of Cargo's binary publish payload.

use semver::Version;

use super::limits::{MAX_CRATE_NAME_LENGTH, MAX_METADATA_SIZE, MAX_VERSION_LENGTH};
use super::{ValidationError, ValidationResult};

/// Reject empty, oversized or control-character-laden input.
fn check_text(field: &'static str, value: &str, max: usize) -> ValidationResult<()> {
    if value.is_empty() {
        return Err(ValidationError::Empty { field });
    }
    if value.len() > max {
        return Err(ValidationError::TooLong {
            field,
            length: value.len(),
            max,
        });
    }
    if value.chars().any(char::is_control) {
        return Err(ValidationError::ControlCharacters { field });
    }
    Ok(())
}

/// Validate a crate name according to Cargo's rules.
///
/// Names are 1 to 64 ASCII characters made of letters, digits, `-` and `_`,
/// and must start with a letter.
pub fn validate_crate_name(name: &str) -> ValidationResult<String> {
    check_text("crate name", name, MAX_CRATE_NAME_LENGTH)?;

    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ValidationError::InvalidCharacters {
            input: name.to_string(),
        });
    }
    if !name.starts_with(|c: char| c.is_ascii_alphabetic()) {
        return Err(ValidationError::InvalidFormat {
            field: "crate name",
            reason: format!("'{name}' does not start with a letter"),
        });
    }

    Ok(name.to_string())
}

/// Validate a version string and parse it as a semantic version.
pub fn validate_version(version: &str) -> ValidationResult<Version> {
    check_text("version", version, MAX_VERSION_LENGTH)?;

    Version::parse(version).map_err(|e| ValidationError::InvalidFormat {
        field: "version",
        reason: format!("'{version}' is not a semantic version: {e}"),
    })
}

/// Validate the framing of a publish payload.
///
/// The payload is `u32` metadata length, metadata, `u32` crate length, crate
/// archive; `payload_size` must cover both sections and their headers.
pub fn validate_publish_structure(
    payload_size: usize,
    metadata_size: usize,
    crate_size: usize,
    max_crate_size: u64,
) -> ValidationResult<()> {
    if metadata_size > MAX_METADATA_SIZE {
        return Err(ValidationError::FileTooLarge {
            what: "metadata section",
            size: metadata_size as u64,
            max: MAX_METADATA_SIZE as u64,
        });
    }

    if crate_size as u64 > max_crate_size {
        return Err(ValidationError::FileTooLarge {
            what: "crate archive",
            size: crate_size as u64,
            max: max_crate_size,
        });
    }

    let expected_min_size = metadata_size + crate_size + 8;
    if payload_size < expected_min_size {
        return Err(ValidationError::InvalidFormat {
            field: "publish payload",
            reason: format!("{payload_size} bytes cannot hold {expected_min_size} bytes of sections"),
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::MAX_CRATE_SIZE;

    #[test]
    fn test_validate_crate_name() {
        assert!(validate_crate_name("serde").is_ok());
        assert!(validate_crate_name("serde_json").is_ok());
        assert!(validate_crate_name("tokio-util").is_ok());
        assert!(validate_crate_name("Inflector").is_ok());

        assert_eq!(
            validate_crate_name(""),
            Err(ValidationError::Empty {
                field: "crate name"
            })
        );
        assert!(validate_crate_name("123invalid").is_err());
        assert!(validate_crate_name("_private").is_err());
        assert!(validate_crate_name("has space").is_err());
        assert!(validate_crate_name("dotted.name").is_err());
        assert!(validate_crate_name("../escape").is_err());
        assert!(validate_crate_name(&"a".repeat(MAX_CRATE_NAME_LENGTH + 1)).is_err());
    }

    #[test]
    fn test_validate_version() {
        assert_eq!(validate_version("1.0.0").unwrap(), Version::new(1, 0, 0));
        assert!(validate_version("2.1.0-beta.1").is_ok());
        assert!(validate_version("0.1.0+build.5").is_ok());

        assert!(validate_version("").is_err());
        assert!(validate_version("1.0").is_err());
        assert!(validate_version("latest").is_err());
        assert_eq!(
            validate_version("1.0.0\0"),
            Err(ValidationError::ControlCharacters { field: "version" })
        );
    }

    #[test]
    fn test_validate_publish_structure() {
        let metadata_size = 1024;
        let crate_size = 4096;
        let payload_size = metadata_size + crate_size + 8;
        assert!(
            validate_publish_structure(payload_size, metadata_size, crate_size, MAX_CRATE_SIZE)
                .is_ok()
        );

        // Truncated payload
        assert!(validate_publish_structure(100, 1024, 1024, MAX_CRATE_SIZE).is_err());

        // Metadata too large
        assert!(validate_publish_structure(
            MAX_METADATA_SIZE + 16,
            MAX_METADATA_SIZE + 1,
            1,
            MAX_CRATE_SIZE
        )
        .is_err());

        // Crate over the configured limit
        assert!(validate_publish_structure(2048 + 8 + 10, 10, 2048, 1024).is_err());
    }
}
