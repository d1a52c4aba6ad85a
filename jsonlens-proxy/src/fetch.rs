//! Authenticated upstream fetcher.
//!
//! Opens a single GET request against an already-vetted upstream URL and
//! hands the response body back as a byte stream. The fetcher owns the
//! outbound policy: Basic credentials when configured, a JSON-preferring
//! `Accept` header, a wall-clock deadline covering the whole transfer, and
//! early rejection of bodies whose declared length exceeds the size cap.
//!
//! # Error Classification
//!
//! Transport failures are folded into the retrieval taxonomy:
//! - timeout → `UpstreamTimeout`
//! - connect failure or any other transport error → `TransportFailure`
//! - non-2xx upstream status → `UpstreamHttpError`
//!
//! No automatic retry: a retrieval either streams or fails once.

use std::pin::Pin;
use std::time::Duration;

use bytes::Bytes;
use futures_util::{Stream, TryStreamExt};
use reqwest::Client;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use tracing::{debug, warn};
use url::Url;

use jsonlens_core::{ProxyConfig, RetrievalError};

/// `Accept` header sent upstream: prefer JSON, tolerate anything.
pub const ACCEPT_JSON: &str = "application/json,*/*";

/// TCP + TLS handshake deadline, separate from the overall transfer deadline.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Errors carried inside the relayed byte stream.
pub type BoxStreamError = Box<dyn std::error::Error + Send + Sync>;

/// Byte stream handed from the fetcher to the relay.
pub type BoxByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, BoxStreamError>> + Send>>;

/// An open upstream response: status, the headers the relay mirrors, and
/// the body as an unconsumed stream.
pub struct UpstreamResponse {
    pub status: reqwest::StatusCode,
    /// Declared body length, when the upstream sent `Content-Length`.
    pub content_length: Option<u64>,
    /// Upstream `Content-Type`, verbatim.
    pub content_type: Option<String>,
    pub stream: BoxByteStream,
}

/// Abstraction over the upstream fetch, so handler tests can script
/// responses without network I/O.
#[async_trait::async_trait]
pub trait Fetch: Send + Sync {
    /// Open a GET request against `url` and return the response stream.
    async fn fetch(&self, url: &Url) -> Result<UpstreamResponse, RetrievalError>;
}

/// Real HTTP fetcher backed by a pooled reqwest client.
///
/// Holds the slice of [`ProxyConfig`] the outbound path needs; the client
/// itself is cheap to clone and pools connections internally.
#[derive(Clone)]
pub struct UpstreamClient {
    client: Client,
    username: Option<String>,
    password: Option<String>,
    timeout: Duration,
    max_response_bytes: u64,
}

impl UpstreamClient {
    /// Build a fetcher from the proxy configuration.
    ///
    /// # Errors
    ///
    /// Returns `TransportFailure` if the underlying HTTP client cannot be
    /// constructed (TLS backend initialization, mainly).
    pub fn new(config: &ProxyConfig) -> Result<Self, RetrievalError> {
        let client = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .tcp_nodelay(true)
            .build()
            .map_err(|e| RetrievalError::TransportFailure {
                detail: format!("failed to build HTTP client: {e}"),
            })?;

        Ok(Self {
            client,
            username: config.username.clone(),
            password: config.password.clone(),
            timeout: config.timeout,
            max_response_bytes: config.max_response_bytes,
        })
    }

    /// Classify a reqwest error into the retrieval taxonomy.
    fn classify_error(&self, error: &reqwest::Error) -> RetrievalError {
        if error.is_timeout() {
            warn!(
                timeout_ms = self.timeout.as_millis() as u64,
                "upstream request timed out"
            );
            RetrievalError::UpstreamTimeout {
                timeout_ms: self.timeout.as_millis() as u64,
            }
        } else if error.is_connect() {
            warn!(error = %error, "failed to connect to upstream");
            RetrievalError::TransportFailure {
                detail: error.to_string(),
            }
        } else {
            warn!(error = %error, "upstream request failed");
            RetrievalError::TransportFailure {
                detail: error.to_string(),
            }
        }
    }
}

#[async_trait::async_trait]
impl Fetch for UpstreamClient {
    async fn fetch(&self, url: &Url) -> Result<UpstreamResponse, RetrievalError> {
        // The per-request timeout is a wall-clock deadline over the whole
        // exchange, body included; a stalled read trips it mid-stream.
        let mut request = self
            .client
            .get(url.clone())
            .header(ACCEPT, ACCEPT_JSON)
            .timeout(self.timeout);

        if let (Some(user), Some(pass)) = (&self.username, &self.password) {
            request = request.basic_auth(user, Some(pass));
        }

        let response = request
            .send()
            .await
            .map_err(|e| self.classify_error(&e))?;

        let status = response.status();
        if !status.is_success() {
            warn!(url = %url, status = %status, "upstream returned error status");
            return Err(RetrievalError::UpstreamHttpError {
                status: status.as_u16(),
                detail: status
                    .canonical_reason()
                    .map_or_else(|| status.to_string(), str::to_string),
            });
        }

        let content_length = response.content_length();
        if let Some(declared) = content_length {
            if declared > self.max_response_bytes {
                warn!(
                    url = %url,
                    content_length = declared,
                    limit = self.max_response_bytes,
                    "upstream declared an oversized body"
                );
                return Err(RetrievalError::UpstreamTooLarge {
                    limit_bytes: self.max_response_bytes,
                });
            }
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        debug!(
            url = %url,
            status = %status,
            content_length = ?content_length,
            "upstream stream open"
        );

        Ok(UpstreamResponse {
            status,
            content_length,
            content_type,
            stream: Box::pin(
                response
                    .bytes_stream()
                    .map_err(|e| Box::new(e) as BoxStreamError),
            ),
        })
    }
}
