//! Streaming relay from upstream to the requesting client.
//!
//! The relay never buffers the document. Upstream chunks flow through a
//! size-enforcing wrapper straight into the response body, so the first
//! byte reaches the client while the rest is still in flight. Two things
//! can stop a relay mid-body:
//!
//! - the running byte count crosses the configured cap, or
//! - the upstream stream itself fails.
//!
//! Either way the wrapper yields an error, which aborts the client
//! connection. Response headers have already gone out by then; a truncated
//! body is the only honest signal left, and clients treat the broken read
//! as a failed retrieval.

use std::pin::Pin;
use std::task::{Context, Poll};

use axum::body::Body;
use axum::http::header::{CACHE_CONTROL, CONTENT_LENGTH, CONTENT_TYPE};
use axum::http::{HeaderValue, Response};
use bytes::Bytes;
use futures_util::Stream;
use tracing::{debug, warn};

use crate::fetch::{BoxByteStream, UpstreamResponse};

/// `Content-Type` used when the upstream did not send one.
pub const DEFAULT_CONTENT_TYPE: &str = "application/json";

/// Failure inside a relayed body.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    /// Running total crossed the size cap mid-stream.
    #[error("upstream response exceeded the {limit_bytes} byte limit")]
    TooLarge { limit_bytes: u64 },
    /// The upstream byte stream itself failed.
    #[error("upstream stream failed: {detail}")]
    Upstream { detail: String },
}

/// Byte stream that aborts once a size cap is crossed.
///
/// Chunks pass through untouched while the running total stays at or
/// under the cap. The first chunk that pushes the total over yields an
/// error instead, and the stream fuses shut.
pub struct LimitedStream {
    inner: BoxByteStream,
    limit: u64,
    transferred: u64,
    done: bool,
}

impl LimitedStream {
    pub fn new(inner: BoxByteStream, limit: u64) -> Self {
        Self {
            inner,
            limit,
            transferred: 0,
            done: false,
        }
    }
}

impl Stream for LimitedStream {
    type Item = Result<Bytes, RelayError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        if this.done {
            return Poll::Ready(None);
        }

        match this.inner.as_mut().poll_next(cx) {
            Poll::Ready(Some(Ok(chunk))) => {
                this.transferred += chunk.len() as u64;
                if this.transferred > this.limit {
                    this.done = true;
                    warn!(
                        transferred = this.transferred,
                        limit = this.limit,
                        "aborting relay: size cap crossed mid-stream"
                    );
                    return Poll::Ready(Some(Err(RelayError::TooLarge {
                        limit_bytes: this.limit,
                    })));
                }
                Poll::Ready(Some(Ok(chunk)))
            }
            Poll::Ready(Some(Err(e))) => {
                this.done = true;
                warn!(error = %e, "upstream stream failed mid-relay");
                Poll::Ready(Some(Err(RelayError::Upstream {
                    detail: e.to_string(),
                })))
            }
            Poll::Ready(None) => {
                this.done = true;
                debug!(bytes = this.transferred, "relay complete");
                Poll::Ready(None)
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

/// Turn an open upstream response into the streamed client response.
///
/// Mirrors the upstream status and `Content-Type` (defaulting to JSON),
/// mirrors `Content-Length` when the upstream declared one, and marks the
/// payload `Cache-Control: no-store` so transient documents are never
/// cached between retrievals.
pub fn relay_response(upstream: UpstreamResponse, max_response_bytes: u64) -> Response<Body> {
    let UpstreamResponse {
        status,
        content_length,
        content_type,
        stream,
    } = upstream;

    let limited = LimitedStream::new(stream, max_response_bytes);
    let mut response = Response::new(Body::from_stream(limited));
    *response.status_mut() = status;

    let headers = response.headers_mut();
    headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-store"));

    let content_type = content_type
        .as_deref()
        .and_then(|v| HeaderValue::from_str(v).ok())
        .unwrap_or_else(|| HeaderValue::from_static(DEFAULT_CONTENT_TYPE));
    headers.insert(CONTENT_TYPE, content_type);

    if let Some(declared) = content_length {
        headers.insert(CONTENT_LENGTH, HeaderValue::from(declared));
    }

    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::{StreamExt, stream};
    use http_body_util::BodyExt;

    use crate::fetch::BoxStreamError;

    fn byte_stream(chunks: Vec<&'static [u8]>) -> BoxByteStream {
        Box::pin(stream::iter(
            chunks
                .into_iter()
                .map(|c| Ok::<_, BoxStreamError>(Bytes::from_static(c))),
        ))
    }

    fn failing_stream(chunks: Vec<&'static [u8]>, message: &'static str) -> BoxByteStream {
        let ok = chunks
            .into_iter()
            .map(|c| Ok::<_, BoxStreamError>(Bytes::from_static(c)));
        let tail = std::iter::once(Err::<Bytes, _>(
            Box::new(std::io::Error::other(message)) as BoxStreamError,
        ));
        Box::pin(stream::iter(ok.chain(tail)))
    }

    async fn drain(mut stream: LimitedStream) -> Vec<Result<Bytes, RelayError>> {
        let mut items = Vec::new();
        while let Some(item) = stream.next().await {
            items.push(item);
        }
        items
    }

    #[tokio::test]
    async fn test_under_limit_passes_through() {
        let limited = LimitedStream::new(byte_stream(vec![b"{\"a\":", b"1}"]), 1024);
        let items = drain(limited).await;

        let bytes: Vec<u8> = items
            .into_iter()
            .flat_map(|item| item.expect("chunk should pass through").to_vec())
            .collect();
        assert_eq!(bytes, b"{\"a\":1}");
    }

    #[tokio::test]
    async fn test_exactly_at_limit_passes_through() {
        let limited = LimitedStream::new(byte_stream(vec![b"abcd", b"efgh"]), 8);
        let items = drain(limited).await;
        assert_eq!(items.len(), 2);
        assert!(items.iter().all(Result::is_ok));
    }

    #[tokio::test]
    async fn test_crossing_limit_yields_error_and_fuses() {
        let limited = LimitedStream::new(byte_stream(vec![b"aaaa", b"bbbb", b"cccc"]), 10);
        let items = drain(limited).await;

        // Two chunks through, the third trips the cap, nothing after.
        assert_eq!(items.len(), 3);
        assert!(items[0].is_ok());
        assert!(items[1].is_ok());
        assert!(matches!(
            items[2],
            Err(RelayError::TooLarge { limit_bytes: 10 })
        ));
    }

    #[tokio::test]
    async fn test_upstream_failure_surfaces_as_relay_error() {
        let limited = LimitedStream::new(failing_stream(vec![b"partial"], "connection reset"), 1024);
        let items = drain(limited).await;

        assert_eq!(items.len(), 2);
        assert!(items[0].is_ok());
        match &items[1] {
            Err(RelayError::Upstream { detail }) => {
                assert!(detail.contains("connection reset"));
            }
            other => panic!("expected upstream relay error, got: {other:?}"),
        }
    }

    fn upstream_response(
        content_length: Option<u64>,
        content_type: Option<&str>,
        chunks: Vec<&'static [u8]>,
    ) -> UpstreamResponse {
        UpstreamResponse {
            status: reqwest::StatusCode::OK,
            content_length,
            content_type: content_type.map(str::to_string),
            stream: byte_stream(chunks),
        }
    }

    #[tokio::test]
    async fn test_relay_mirrors_upstream_headers() {
        let upstream = upstream_response(
            Some(7),
            Some("application/json; charset=utf-8"),
            vec![b"{\"a\":1}"],
        );
        let response = relay_response(upstream, 1024);

        assert_eq!(response.status(), axum::http::StatusCode::OK);
        assert_eq!(
            response.headers().get(CONTENT_TYPE).map(HeaderValue::as_bytes),
            Some(b"application/json; charset=utf-8".as_slice())
        );
        assert_eq!(
            response.headers().get(CACHE_CONTROL).map(HeaderValue::as_bytes),
            Some(b"no-store".as_slice())
        );
        assert_eq!(
            response.headers().get(CONTENT_LENGTH).map(HeaderValue::as_bytes),
            Some(b"7".as_slice())
        );

        let body = response
            .into_body()
            .collect()
            .await
            .expect("body should stream")
            .to_bytes();
        assert_eq!(&body[..], b"{\"a\":1}");
    }

    #[tokio::test]
    async fn test_relay_defaults_content_type_and_omits_length() {
        let upstream = upstream_response(None, None, vec![b"[1,2]"]);
        let response = relay_response(upstream, 1024);

        assert_eq!(
            response.headers().get(CONTENT_TYPE).map(HeaderValue::as_bytes),
            Some(b"application/json".as_slice())
        );
        assert!(response.headers().get(CONTENT_LENGTH).is_none());
    }

    #[tokio::test]
    async fn test_relay_body_errors_after_cap() {
        let upstream = upstream_response(None, None, vec![b"aaaaaaaa", b"bbbbbbbb"]);
        let response = relay_response(upstream, 10);

        let collected = response.into_body().collect().await;
        assert!(collected.is_err());
    }
}
