use std::collections::BTreeMap;
use std::io::Read;
use std::sync::OnceLock;

use chrono::Utc;
use reqwest::blocking::{Client, Response};
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::Method;
use semver::Version;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use url::Url;

use crate::error::{Error, RegistryError, Result};
use crate::peer::{default_timeout_secs, lazy_client, not_found_as, send};
use crate::storage::sigv4::{self, Credentials, SignableRequest};
use crate::storage::Store;
use crate::validation;

/// The S3 storage strategy.
///
/// Objects are addressed path-style (`{endpoint}/{bucket}/{key}`) so that
/// S3-compatible services such as MinIO work without DNS setup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct S3Storage {
    /// Name of the bucket.
    pub bucket: String,
    /// Region of the bucket, used for request signing.
    pub region: String,
    /// Service endpoint; defaults to `https://s3.{region}.amazonaws.com`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    /// Prefix prepended to every object key (e.g. `depot/`).
    #[serde(default)]
    pub key_prefix: String,
    /// Falls back to `AWS_ACCESS_KEY_ID`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_key_id: Option<String>,
    /// Falls back to `AWS_SECRET_ACCESS_KEY`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret_access_key: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(skip)]
    client: OnceLock<Client>,
}

impl S3Storage {
    pub fn new(bucket: impl Into<String>, region: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            region: region.into(),
            endpoint: None,
            key_prefix: String::new(),
            access_key_id: None,
            secret_access_key: None,
            timeout_secs: default_timeout_secs(),
            client: OnceLock::new(),
        }
    }

    fn crate_key(&self, name: &str, version: &Version) -> Result<String> {
        let name = validation::validate_crate_name(name)?;
        Ok(format!(
            "{}crates/{name}/{name}-{version}.crate",
            self.key_prefix
        ))
    }

    fn readme_key(&self, name: &str, version: &Version) -> Result<String> {
        let name = validation::validate_crate_name(name)?;
        Ok(format!("{}readmes/{name}/{name}-{version}.md", self.key_prefix))
    }

    fn object_url(&self, key: &str) -> Result<Url> {
        let endpoint = match &self.endpoint {
            Some(endpoint) => endpoint.trim_end_matches('/').to_string(),
            None => format!("https://s3.{}.amazonaws.com", self.region),
        };
        let url = format!(
            "{endpoint}/{}/{}",
            sigv4::uri_encode(&self.bucket, true),
            sigv4::uri_encode(key, false)
        );
        Ok(Url::parse(&url)?)
    }

    fn credentials(&self) -> Result<Credentials> {
        let access_key_id = self
            .access_key_id
            .clone()
            .or_else(|| std::env::var("AWS_ACCESS_KEY_ID").ok())
            .ok_or_else(|| Error::Config("no S3 access key id configured".to_string()))?;
        let secret_access_key = self
            .secret_access_key
            .clone()
            .or_else(|| std::env::var("AWS_SECRET_ACCESS_KEY").ok())
            .ok_or_else(|| Error::Config("no S3 secret access key configured".to_string()))?;
        Ok(Credentials {
            access_key_id,
            secret_access_key,
        })
    }

    /// Sign and send a request for the object at `key`.
    fn execute(
        &self,
        method: Method,
        key: &str,
        body: Option<(Vec<u8>, &'static str)>,
    ) -> Result<Response> {
        let url = self.object_url(key)?;
        let credentials = self.credentials()?;
        let now = Utc::now();

        let payload_sha256 = match &body {
            Some((data, _)) => sigv4::sha256_hex(data),
            None => sigv4::EMPTY_PAYLOAD_SHA256.to_string(),
        };

        let host = match (url.host_str(), url.port()) {
            (Some(host), Some(port)) => format!("{host}:{port}"),
            (Some(host), None) => host.to_string(),
            (None, _) => return Err(Error::Config(format!("S3 endpoint '{url}' has no host"))),
        };

        let mut headers = BTreeMap::new();
        headers.insert("host".to_string(), host);
        headers.insert("x-amz-content-sha256".to_string(), payload_sha256.clone());
        headers.insert("x-amz-date".to_string(), sigv4::amz_date(now));

        let authorization = sigv4::authorization(
            &SignableRequest {
                method: method.as_str(),
                canonical_uri: url.path(),
                headers: &headers,
                payload_sha256: &payload_sha256,
            },
            &credentials,
            &self.region,
            "s3",
            now,
        );

        debug!(method = %method, bucket = %self.bucket, key = %key, "Sending S3 request");
        let mut request = lazy_client(&self.client, self.timeout_secs)?
            .request(method, url.clone())
            .header(AUTHORIZATION, authorization);
        for (name, value) in headers.iter().filter(|(name, _)| name.as_str() != "host") {
            request = request.header(name.as_str(), value.as_str());
        }
        if let Some((data, content_type)) = body {
            request = request.header(CONTENT_TYPE, content_type).body(data);
        }

        send(request)
    }

    fn get_object(&self, key: &str, name: &str, version: &Version) -> Result<Response> {
        not_found_as(self.execute(Method::GET, key, None), || {
            RegistryError::VersionNotFound {
                name: name.to_string(),
                version: version.to_string(),
            }
        })
    }
}

impl Store for S3Storage {
    fn get_crate(&self, name: &str, version: &Version) -> Result<Vec<u8>> {
        let key = self.crate_key(name, version)?;
        Ok(self.get_object(&key, name, version)?.bytes()?.to_vec())
    }

    fn read_crate(&self, name: &str, version: &Version) -> Result<Box<dyn Read + Send>> {
        let key = self.crate_key(name, version)?;
        Ok(Box::new(self.get_object(&key, name, version)?))
    }

    fn store_crate(&self, name: &str, version: &Version, data: &[u8]) -> Result<()> {
        let key = self.crate_key(name, version)?;
        self.execute(
            Method::PUT,
            &key,
            Some((data.to_vec(), "application/x-tar")),
        )?;
        info!(bucket = %self.bucket, key = %key, size = data.len(), "Stored crate archive");
        Ok(())
    }

    fn get_readme(&self, name: &str, version: &Version) -> Result<String> {
        let key = self.readme_key(name, version)?;
        Ok(self.get_object(&key, name, version)?.text()?)
    }

    fn read_readme(&self, name: &str, version: &Version) -> Result<Box<dyn Read + Send>> {
        let key = self.readme_key(name, version)?;
        Ok(Box::new(self.get_object(&key, name, version)?))
    }

    fn store_readme(&self, name: &str, version: &Version, data: &str) -> Result<()> {
        let key = self.readme_key(name, version)?;
        self.execute(
            Method::PUT,
            &key,
            Some((data.as_bytes().to_vec(), "text/markdown; charset=utf-8")),
        )?;
        Ok(())
    }

    fn delete_version(&self, name: &str, version: &Version) -> Result<()> {
        for key in [
            self.crate_key(name, version)?,
            self.readme_key(name, version)?,
        ] {
            match self.execute(Method::DELETE, &key, None) {
                Ok(_) | Err(Error::Remote { status: 404, .. }) => {}
                Err(e) => return Err(e),
            }
        }
        info!(bucket = %self.bucket, name = %name, version = %version, "Deleted stored objects");
        Ok(())
    }
}
