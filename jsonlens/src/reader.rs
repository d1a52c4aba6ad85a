//! Chunked download of a proxied document.
//!
//! The reader pulls the response body chunk by chunk, feeds each chunk
//! through the incremental UTF-8 decoder, and reports progress after
//! every chunk. Nothing is parsed here; the document is handed off as
//! text once the final byte has arrived.

use tracing::{debug, warn};

use jsonlens_core::{ErrorBody, RetrievalError};

use crate::decode::Utf8Accumulator;

/// Download progress: bytes received against the declared total, if any.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetrievalProgress {
    pub received: u64,
    /// `Content-Length` of the response, when one was declared.
    pub total: Option<u64>,
}

impl RetrievalProgress {
    /// Percentage for a determinate progress bar, clamped to 100.
    ///
    /// `None` when no total was declared; the bar shows indeterminate
    /// motion instead of a made-up number.
    pub fn percent(&self) -> Option<u8> {
        let total = self.total?;
        if total == 0 {
            return Some(100);
        }
        Some((self.received.saturating_mul(100) / total).min(100) as u8)
    }
}

/// Fetch `target` through the proxy at `proxy_base` and decode the body
/// incrementally. `on_progress` fires once per received chunk.
///
/// # Errors
///
/// - `TransportFailure` when the proxy itself cannot be reached
/// - `UpstreamHttpError` for any non-2xx proxy response, carrying the
///   proxy's JSON error detail when one was sent
/// - `StreamInterrupted` when the body dies mid-transfer (which is also
///   how the proxy signals a size-cap abort)
pub async fn fetch_document<F>(
    client: &reqwest::Client,
    proxy_base: &str,
    target: &str,
    on_progress: F,
) -> Result<String, RetrievalError>
where
    F: FnMut(RetrievalProgress),
{
    let endpoint = format!("{}/api/fetch", proxy_base.trim_end_matches('/'));
    let response = client
        .get(endpoint)
        .query(&[("url", target)])
        .send()
        .await
        .map_err(|e| RetrievalError::TransportFailure {
            detail: e.to_string(),
        })?;

    let status = response.status();
    if !status.is_success() {
        return Err(read_error_body(response).await);
    }
    read_body(response, on_progress).await
}

/// Decode an error response from the proxy into a retrieval error.
///
/// The proxy sends `{"error": ..., "detail": ...}`; if the body is
/// missing or not that shape, the status code alone has to do.
async fn read_error_body(response: reqwest::Response) -> RetrievalError {
    let status = response.status().as_u16();
    let body = match response.text().await {
        Ok(text) => serde_json::from_str::<ErrorBody>(&text).ok(),
        Err(_) => None,
    };
    RetrievalError::from_wire(status, body)
}

/// Read a successful response body to completion.
pub async fn read_body<F>(
    mut response: reqwest::Response,
    mut on_progress: F,
) -> Result<String, RetrievalError>
where
    F: FnMut(RetrievalProgress),
{
    let total = response.content_length();
    let mut received = 0u64;
    let mut decoder = Utf8Accumulator::new();

    loop {
        match response.chunk().await {
            Ok(Some(chunk)) => {
                received += chunk.len() as u64;
                decoder.push(&chunk);
                on_progress(RetrievalProgress { received, total });
            }
            Ok(None) => break,
            Err(e) => {
                warn!(received, error = %e, "document stream interrupted");
                return Err(RetrievalError::StreamInterrupted {
                    detail: e.to_string(),
                });
            }
        }
    }

    debug!(received, "document received");
    Ok(decoder.finish())
}
