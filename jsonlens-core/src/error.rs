//! Error taxonomy for the retrieval pipeline.
//!
//! Every failure the pipeline can produce, on either side of the proxy, is a
//! variant of [`RetrievalError`]. The server-facing variants know how to
//! render themselves as the wire error body; the client reconstructs a
//! variant from that body when a proxy response comes back non-2xx.

use serde::{Deserialize, Serialize};

/// Headline used for every upstream failure reported over the wire.
pub const UPSTREAM_FETCH_FAILED: &str = "Upstream fetch failed";

/// A failure at some stage of retrieving and parsing a remote JSON document.
///
/// The first two variants are rejected before any network I/O and carry
/// fixed, documented messages. The `Upstream*` and `Transport*` variants
/// originate server-side; `StreamInterrupted` and `ParseFailure` originate
/// client-side and never cross the wire.
#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum RetrievalError {
    /// The request did not name a target URL.
    #[error("Missing 'url' query parameter")]
    InvalidRequest,

    /// The target host is not on the configured allow-list.
    #[error("Upstream host is not allowed")]
    Forbidden,

    /// The upstream call exceeded the end-to-end wall-clock timeout.
    #[error("upstream request timed out after {timeout_ms} ms")]
    UpstreamTimeout {
        /// The configured timeout in milliseconds.
        timeout_ms: u64,
    },

    /// The upstream body, declared or actually transferred, exceeds the
    /// configured maximum response size.
    #[error("upstream response exceeds the {limit_bytes} byte limit")]
    UpstreamTooLarge {
        /// The configured limit in bytes.
        limit_bytes: u64,
    },

    /// Upstream answered with a non-2xx status.
    #[error("upstream returned HTTP {status}: {detail}")]
    UpstreamHttpError {
        /// The upstream HTTP status code, propagated to the client.
        status: u16,
        /// The status reason phrase, or the proxy's error detail.
        detail: String,
    },

    /// Upstream could not be reached at all (DNS, refused, TLS, ...).
    #[error("failed to reach upstream: {detail}")]
    TransportFailure {
        /// The underlying transport error message.
        detail: String,
    },

    /// The connection dropped while the body was being transferred.
    #[error("stream interrupted mid-transfer: {detail}")]
    StreamInterrupted {
        /// The underlying read error message.
        detail: String,
    },

    /// The fully received text is not valid JSON.
    #[error("document is not valid JSON: {detail}")]
    ParseFailure {
        /// The parser diagnostic, including position information.
        detail: String,
    },
}

impl RetrievalError {
    /// The HTTP status the proxy reports for this failure.
    ///
    /// Upstream HTTP statuses are propagated verbatim; every other failure
    /// that reaches the wire is a generic 500. The pre-flight rejections
    /// keep their documented 400/403.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self {
            Self::InvalidRequest => 400,
            Self::Forbidden => 403,
            Self::UpstreamHttpError { status, .. } => *status,
            _ => 500,
        }
    }

    /// The JSON body the proxy writes for this failure.
    ///
    /// Pre-flight rejections carry only their fixed headline; upstream
    /// failures carry the shared headline plus a detail string.
    #[must_use]
    pub fn wire_body(&self) -> ErrorBody {
        match self {
            Self::InvalidRequest | Self::Forbidden => ErrorBody {
                error: self.to_string(),
                detail: None,
            },
            Self::UpstreamHttpError { detail, .. } => ErrorBody {
                error: UPSTREAM_FETCH_FAILED.to_string(),
                detail: Some(detail.clone()),
            },
            other => ErrorBody {
                error: UPSTREAM_FETCH_FAILED.to_string(),
                detail: Some(other.to_string()),
            },
        }
    }

    /// Reconstruct a failure from a non-2xx proxy response.
    ///
    /// Prefers the body's `detail`, then its headline, then a bare
    /// `HTTP <status>` marker. Always an `UpstreamHttpError`: from the
    /// consuming side, the proxy's own rejections and relayed upstream
    /// failures are indistinguishable and are surfaced the same way.
    #[must_use]
    pub fn from_wire(status: u16, body: Option<ErrorBody>) -> Self {
        let detail = body
            .and_then(|b| b.detail.or(Some(b.error)))
            .filter(|d| !d.is_empty())
            .unwrap_or_else(|| format!("HTTP {status}"));
        Self::UpstreamHttpError { status, detail }
    }
}

/// The wire shape of a proxy error response.
///
/// `detail` is omitted from serialization when absent, so the pre-flight
/// rejections serialize as a bare `{"error": "..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Short headline describing the failure class.
    pub error: String,
    /// Human-readable detail, present for upstream failures.
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(default)]
    pub detail: Option<String>,
}
