// Sharding service HTTP client
//
// Wraps `reqwest::Client` with URL construction against the service root,
// low-level failure mapping, and JSON body decoding. Endpoint groups
// (health, shards, users, ...) live in sibling files as inherent methods
// so this module stays focused on transport mechanics.

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, trace};
use url::Url;

use crate::error::Error;
use crate::models::ErrorBody;
use crate::transport::TransportConfig;

/// Raw HTTP client for the sharding service `/api/v1` contract.
///
/// All methods return decoded payloads. Failures are mapped to
/// [`Error`] variants at this boundary and nowhere else.
#[derive(Debug, Clone)]
pub struct ShardClient {
    http: reqwest::Client,
    base_url: Url,
    timeout_secs: u64,
}

impl ShardClient {
    /// Create a new client from a `TransportConfig`.
    pub fn new(transport: &TransportConfig) -> Result<Self, Error> {
        let http = transport.build_client()?;
        Ok(Self {
            http,
            base_url: transport.base_url.clone(),
            timeout_secs: transport.timeout.as_secs(),
        })
    }

    /// Create a client with a pre-built `reqwest::Client`.
    pub fn with_client(http: reqwest::Client, base_url: Url) -> Self {
        Self {
            http,
            base_url,
            timeout_secs: 0,
        }
    }

    /// The service root URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    // ── URL builders ─────────────────────────────────────────────────

    /// Build a full URL for a service path: `{base}/{path}`.
    ///
    /// Each segment is percent-encoded, so user-supplied shard keys
    /// cannot escape their path position.
    pub(crate) fn url(&self, segments: &[&str]) -> Result<Url, Error> {
        let mut url = self.base_url.clone();
        {
            let mut parts = url
                .path_segments_mut()
                .map_err(|()| Error::InvalidUrl(url::ParseError::RelativeUrlWithCannotBeABaseBase))?;
            parts.pop_if_empty();
            parts.extend(segments);
        }
        Ok(url)
    }

    // ── Request helpers ──────────────────────────────────────────────

    /// Send a GET request and decode the JSON body.
    pub(crate) async fn get<T: DeserializeOwned>(&self, url: Url) -> Result<T, Error> {
        debug!("GET {}", url);
        let resp = self
            .http
            .get(url.clone())
            .send()
            .await
            .map_err(|e| self.map_send_error(&url, e))?;
        self.decode(&url, resp).await
    }

    /// Send a POST request with JSON body and decode the JSON response.
    pub(crate) async fn post<T: DeserializeOwned>(
        &self,
        url: Url,
        body: &(impl Serialize + Sync),
    ) -> Result<T, Error> {
        debug!("POST {}", url);
        let resp = self
            .http
            .post(url.clone())
            .json(body)
            .send()
            .await
            .map_err(|e| self.map_send_error(&url, e))?;
        self.decode(&url, resp).await
    }

    /// Send a bodiless PUT request and decode the JSON response.
    pub(crate) async fn put<T: DeserializeOwned>(&self, url: Url) -> Result<T, Error> {
        debug!("PUT {}", url);
        let resp = self
            .http
            .put(url.clone())
            .send()
            .await
            .map_err(|e| self.map_send_error(&url, e))?;
        self.decode(&url, resp).await
    }

    /// Map a send-time `reqwest` failure onto the transport variants.
    fn map_send_error(&self, url: &Url, err: reqwest::Error) -> Error {
        if err.is_timeout() {
            Error::Timeout {
                timeout_secs: self.timeout_secs,
            }
        } else if err.is_connect() {
            Error::Connect {
                url: url.to_string(),
                reason: root_cause(&err),
            }
        } else {
            Error::Transport(err)
        }
    }

    /// Check the status, then decode the body as `T`.
    ///
    /// 404 wins over any payload. Other failures prefer the structured
    /// `{"detail": ...}` payload and fall back to the raw body.
    async fn decode<T: DeserializeOwned>(&self, url: &Url, resp: reqwest::Response) -> Result<T, Error> {
        let status = resp.status();
        trace!(%status, "response received");

        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(Error::NotFound {
                path: url.path().to_owned(),
            });
        }

        let body = resp.text().await.map_err(|e| {
            if e.is_timeout() {
                Error::Timeout {
                    timeout_secs: self.timeout_secs,
                }
            } else {
                Error::Transport(e)
            }
        })?;

        if !status.is_success() {
            if let Some(detail) = serde_json::from_str::<ErrorBody>(&body)
                .ok()
                .and_then(ErrorBody::into_detail)
            {
                return Err(Error::Server {
                    status: status.as_u16(),
                    detail,
                });
            }
            return Err(Error::Http {
                status: status.as_u16(),
                body: body.chars().take(200).collect(),
            });
        }

        serde_json::from_str(&body).map_err(|e| {
            let preview: String = body.chars().take(200).collect();
            Error::Deserialization {
                message: format!("{e} (body preview: {preview:?})"),
                body: body.clone(),
            }
        })
    }
}

/// Innermost error message, e.g. "Connection refused (os error 111)".
fn root_cause(err: &(dyn std::error::Error + 'static)) -> String {
    let mut current = err;
    while let Some(next) = current.source() {
        current = next;
    }
    current.to_string()
}
