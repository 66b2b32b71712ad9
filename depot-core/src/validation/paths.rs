//! # Input Validation: Path Validation
//!
//! Relative paths are checked before they are joined onto an index root, a
//! storage directory or an object key prefix.

use std::path::{Component, Path, PathBuf};

use super::limits::MAX_PATH_DEPTH;
use super::{ValidationError, ValidationResult};

/// Characters with a meaning to shells, globs or URL templates.
const RESERVED_CHARS: &[char] = &[
    '\\', '~', '$', '`', '|', '&', ';', '<', '>', '(', ')', '{', '}', '[', ']', '*', '?',
];

/// Validate that a path is relative, shallow and stays below its root.
pub fn validate_safe_path<P: AsRef<Path>>(path: P) -> ValidationResult<PathBuf> {
    let path = path.as_ref();
    let display = path.to_string_lossy();

    if display.chars().any(char::is_control) {
        return Err(ValidationError::ControlCharacters { field: "path" });
    }
    if path.has_root() || display.starts_with('\\') {
        return Err(ValidationError::AbsolutePath {
            path: display.into_owned(),
        });
    }

    let mut depth = 0;
    for component in path.components() {
        match component {
            Component::Normal(_) => depth += 1,
            Component::CurDir => {}
            _ => {
                return Err(ValidationError::PathTraversal {
                    path: display.into_owned(),
                })
            }
        }
    }
    if depth > MAX_PATH_DEPTH {
        return Err(ValidationError::PathTooDeep {
            path: display.into_owned(),
            depth,
            max: MAX_PATH_DEPTH,
        });
    }

    if display.contains("//") || display.contains(RESERVED_CHARS) {
        return Err(ValidationError::InvalidCharacters {
            input: display.into_owned(),
        });
    }

    Ok(path.to_path_buf())
}
