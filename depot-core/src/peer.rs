//! HTTP connection to the internal API of another depot instance.
//!
//! Shared by the `remote` index and storage strategies.

use std::sync::OnceLock;
use std::time::Duration;

use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::Method;
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use crate::error::{Error, RegistryError, Result};

pub(crate) fn default_timeout_secs() -> u64 {
    30
}

/// The blocking HTTP client stored in `cell`, built on first use.
pub(crate) fn lazy_client(cell: &OnceLock<Client>, timeout_secs: u64) -> Result<&Client> {
    if let Some(client) = cell.get() {
        return Ok(client);
    }
    let client = Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .user_agent(concat!("depot/", env!("CARGO_PKG_VERSION")))
        .build()?;
    Ok(cell.get_or_init(|| client))
}

/// Connection settings for a peer instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeerConnection {
    /// Base URL of the peer instance (e.g. `http://registry.internal:3000`).
    pub url: String,
    /// Bearer token matching the peer's `internal.token`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    /// Request timeout, in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(skip)]
    client: OnceLock<Client>,
}

impl PeerConnection {
    pub fn new(url: impl Into<String>, token: Option<String>) -> Self {
        Self {
            url: url.into(),
            token,
            timeout_secs: default_timeout_secs(),
            client: OnceLock::new(),
        }
    }

    /// Absolute URL of an internal API endpoint.
    pub(crate) fn endpoint(&self, path: &str) -> Result<Url> {
        let url = format!(
            "{}/internal/{}",
            self.url.trim_end_matches('/'),
            path.trim_start_matches('/')
        );
        Ok(Url::parse(&url)?)
    }

    /// Start an authenticated request to an internal API endpoint.
    pub(crate) fn request(&self, method: Method, path: &str) -> Result<RequestBuilder> {
        let url = self.endpoint(path)?;
        debug!(method = %method, url = %url, "Calling peer instance");
        let request = lazy_client(&self.client, self.timeout_secs)?.request(method, url);
        Ok(match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        })
    }
}

/// Send a request, turning any non-success status into [`Error::Remote`].
pub(crate) fn send(request: RequestBuilder) -> Result<Response> {
    let response = request.send()?;
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().unwrap_or_default();
    Err(Error::Remote {
        status: status.as_u16(),
        body,
    })
}

/// Replace a `404 Not Found` from the peer with the given registry error.
pub(crate) fn not_found_as<T>(
    result: Result<T>,
    err: impl FnOnce() -> RegistryError,
) -> Result<T> {
    match result {
        Err(Error::Remote { status: 404, .. }) => Err(err().into()),
        other => other,
    }
}
