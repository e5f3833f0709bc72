// Shared transport configuration for building reqwest::Client instances.
//
// Owns the base URL, request deadline and TLS knobs so the client and
// its tests build HTTP clients the same way.

use std::path::PathBuf;
use std::time::Duration;

use reqwest::header::{ACCEPT, CONTENT_TYPE, HeaderMap, HeaderValue};
use url::Url;

use crate::error::Error;

/// Default service root, including the `/api/v1` prefix.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8000/api/v1";

/// Default per-request deadline.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

const USER_AGENT: &str = concat!("shardeck/", env!("CARGO_PKG_VERSION"));

/// Transport configuration for the sharding service client.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Service root, e.g. `http://localhost:8000/api/v1`.
    pub base_url: Url,
    /// Deadline applied to every request.
    pub timeout: Duration,
    /// Accept self-signed certificates.
    pub accept_invalid_certs: bool,
    /// Extra root certificate (PEM).
    pub ca_cert: Option<PathBuf>,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            base_url: Url::parse(DEFAULT_BASE_URL).expect("default base URL is valid"),
            timeout: DEFAULT_TIMEOUT,
            accept_invalid_certs: false,
            ca_cert: None,
        }
    }
}

impl TransportConfig {
    /// Config pointing at `base_url` with default deadline and TLS settings.
    pub fn new(base_url: Url) -> Self {
        Self {
            base_url,
            ..Self::default()
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Build a `reqwest::Client` from this config.
    ///
    /// Every request carries JSON content negotiation headers.
    pub fn build_client(&self) -> Result<reqwest::Client, Error> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let mut builder = reqwest::Client::builder()
            .timeout(self.timeout)
            .user_agent(USER_AGENT)
            .default_headers(headers);

        if let Some(path) = &self.ca_cert {
            let cert_pem = std::fs::read(path)
                .map_err(|e| Error::Tls(format!("failed to read CA cert: {e}")))?;
            let cert = reqwest::Certificate::from_pem(&cert_pem)
                .map_err(|e| Error::Tls(format!("invalid CA cert: {e}")))?;
            builder = builder.add_root_certificate(cert);
        }

        if self.accept_invalid_certs {
            builder = builder.danger_accept_invalid_certs(true);
        }

        builder
            .build()
            .map_err(|e| Error::Tls(format!("failed to build HTTP client: {e}")))
    }
}
