/// Why a crate name, version, path or upload was rejected.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("{field} must not be empty")]
    Empty { field: &'static str },

    #[error("{field} is {length} characters long (max: {max})")]
    TooLong {
        field: &'static str,
        length: usize,
        max: usize,
    },

    /// Null bytes or other control characters.
    #[error("{field} contains control characters")]
    ControlCharacters { field: &'static str },

    #[error("'{input}' may only contain ASCII letters, digits, '-' and '_'")]
    InvalidCharacters { input: String },

    #[error("path '{path}' leaves its root directory")]
    PathTraversal { path: String },

    #[error("path '{path}' is not relative")]
    AbsolutePath { path: String },

    #[error("path '{path}' is {depth} levels deep (max: {max})")]
    PathTooDeep {
        path: String,
        depth: usize,
        max: usize,
    },

    #[error("{what} is {size} bytes (max: {max} bytes)")]
    FileTooLarge {
        what: &'static str,
        size: u64,
        max: u64,
    },

    #[error("invalid {field}: {reason}")]
    InvalidFormat { field: &'static str, reason: String },
}
