//! # Error Types
//!
//! [`Error`] covers every failure the index and storage strategies can hit,
//! from I/O to git and HTTP transport errors. [`RegistryError`] is the subset
//! that carries registry semantics (unknown crate, ownership, version ordering)
//! and is surfaced to Cargo clients as-is.

use semver::Version;

use crate::validation::ValidationError;

/// The error type for registry operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("semver error: {0}")]
    Semver(#[from] semver::Error),

    #[error("git error: {0}")]
    Git(#[from] git2::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),

    /// A `git` invocation exited with a non-zero status.
    #[error("command `{command}` failed: {output}")]
    Command { command: String, output: String },

    /// A peer registry or object store answered with an unexpected status.
    #[error("remote responded with status {status}: {body}")]
    Remote { status: u16, body: String },

    /// A strategy is missing a setting it needs at runtime.
    #[error("configuration error: {0}")]
    Config(String),

    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Registry(#[from] RegistryError),
}

impl Error {
    /// The registry error carried by this error, if any.
    pub fn registry(&self) -> Option<&RegistryError> {
        match self {
            Error::Registry(err) => Some(err),
            _ => None,
        }
    }

    /// Whether this error means the requested crate or version does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self.registry(),
            Some(RegistryError::CrateNotFound { .. } | RegistryError::VersionNotFound { .. })
        )
    }
}

/// Registry-level errors: the ones a Cargo user can act on.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RegistryError {
    /// The requested crate cannot be found.
    #[error("no crate named '{name}' found")]
    CrateNotFound { name: String },

    /// The requested version of a crate cannot be found.
    #[error("no version {version} of crate '{name}' found")]
    VersionNotFound { name: String, version: String },

    /// The crate is not owned by the user.
    #[error("you are not an owner of '{name}'")]
    CrateNotOwned { name: String, author: String },

    /// The published crate version is not greater than the current hosted version.
    #[error("the published version is too low (hosted version is {hosted}, and thus {published} <= {hosted})")]
    VersionTooLow {
        krate: String,
        hosted: Version,
        published: Version,
    },

    /// The token used to access the registry is invalid.
    #[error("invalid token")]
    InvalidToken,

    #[error("invalid email or password")]
    InvalidCredentials,

    #[error("an account for '{email}' already exists")]
    AccountExists { email: String },

    #[error("no user '{login}' found")]
    UserNotFound { login: String },

    /// Removing the requested owners would leave the crate without any.
    #[error("cannot remove every owner of '{name}'")]
    LastOwner { name: String },

    /// The request is invalid because of a required query parameter.
    #[error("missing query parameters: {missing_params:?}")]
    MissingQueryParams {
        missing_params: &'static [&'static str],
    },

    #[error("invalid publish payload: {reason}")]
    InvalidPayload { reason: String },
}

/// Convenient result type for registry operations.
pub type Result<T> = std::result::Result<T, Error>;
