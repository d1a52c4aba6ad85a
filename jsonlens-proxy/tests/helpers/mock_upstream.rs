//! Mock upstream document host for integration testing.
//!
//! Serves preconfigured documents by path, with optional per-path delays
//! and error statuses, and records the headers each request arrived with
//! so tests can assert on credential injection.

#![allow(dead_code)]

use std::collections::HashMap;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::extract::State;
use axum::http::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use axum::http::{HeaderMap, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use bytes::Bytes;
use serde_json::Value;
use tokio::net::TcpListener;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;

/// A document the mock serves, either as one sized body or as a chunked
/// stream with no declared length.
#[derive(Debug, Clone)]
struct MockDocument {
    chunks: Vec<Bytes>,
    content_type: String,
    declare_length: bool,
}

/// Builder for the mock upstream host.
#[derive(Debug, Clone, Default)]
pub struct MockUpstream {
    documents: HashMap<String, MockDocument>,
    statuses: HashMap<String, u16>,
    delays: HashMap<String, Duration>,
}

/// One recorded inbound request.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub path: String,
    pub authorization: Option<String>,
    pub accept: Option<String>,
}

#[derive(Debug)]
struct MockState {
    documents: HashMap<String, MockDocument>,
    statuses: HashMap<String, u16>,
    delays: HashMap<String, Duration>,
    requests: RwLock<Vec<RecordedRequest>>,
}

impl MockUpstream {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve a JSON document with `Content-Length` declared.
    #[must_use]
    pub fn with_json(mut self, path: &str, document: &Value) -> Self {
        self.documents.insert(
            path.to_string(),
            MockDocument {
                chunks: vec![Bytes::from(document.to_string())],
                content_type: "application/json".to_string(),
                declare_length: true,
            },
        );
        self
    }

    /// Serve a raw body with `Content-Length` declared.
    #[must_use]
    pub fn with_text(mut self, path: &str, body: &str, content_type: &str) -> Self {
        self.documents.insert(
            path.to_string(),
            MockDocument {
                chunks: vec![Bytes::from(body.to_string())],
                content_type: content_type.to_string(),
                declare_length: true,
            },
        );
        self
    }

    /// Serve a chunked body with no `Content-Length`.
    #[must_use]
    pub fn with_chunked(mut self, path: &str, chunks: Vec<String>) -> Self {
        self.documents.insert(
            path.to_string(),
            MockDocument {
                chunks: chunks.into_iter().map(Bytes::from).collect(),
                content_type: "application/json".to_string(),
                declare_length: false,
            },
        );
        self
    }

    /// Answer a path with a bare status code.
    #[must_use]
    pub fn with_status(mut self, path: &str, status: u16) -> Self {
        self.statuses.insert(path.to_string(), status);
        self
    }

    /// Delay the response for a path.
    #[must_use]
    pub fn with_delay(mut self, path: &str, delay: Duration) -> Self {
        self.delays.insert(path.to_string(), delay);
        self
    }

    /// Start the mock host and return its address and handle.
    pub async fn start(self) -> (SocketAddr, MockUpstreamHandle) {
        let state = Arc::new(MockState {
            documents: self.documents,
            statuses: self.statuses,
            delays: self.delays,
            requests: RwLock::new(Vec::new()),
        });

        let app = Router::new()
            .fallback(get(serve_document))
            .with_state(state.clone());

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        (
            addr,
            MockUpstreamHandle {
                state,
                _handle: handle,
            },
        )
    }
}

/// Handle to the running mock host.
pub struct MockUpstreamHandle {
    state: Arc<MockState>,
    _handle: JoinHandle<()>,
}

impl MockUpstreamHandle {
    pub async fn request_count(&self) -> usize {
        self.state.requests.read().await.len()
    }

    pub async fn last_request(&self) -> Option<RecordedRequest> {
        self.state.requests.read().await.last().cloned()
    }
}

async fn serve_document(
    State(state): State<Arc<MockState>>,
    uri: Uri,
    headers: HeaderMap,
) -> Response {
    let path = uri.path().to_string();

    {
        let mut requests = state.requests.write().await;
        requests.push(RecordedRequest {
            path: path.clone(),
            authorization: header_string(&headers, AUTHORIZATION.as_str()),
            accept: header_string(&headers, ACCEPT.as_str()),
        });
    }

    if let Some(delay) = state.delays.get(&path) {
        tokio::time::sleep(*delay).await;
    }

    if let Some(status) = state.statuses.get(&path) {
        return StatusCode::from_u16(*status)
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
            .into_response();
    }

    match state.documents.get(&path) {
        Some(doc) if doc.declare_length => {
            let body: Bytes = doc.chunks.concat().into();
            ([(CONTENT_TYPE, doc.content_type.clone())], body).into_response()
        }
        Some(doc) => {
            let chunks: Vec<Result<Bytes, Infallible>> =
                doc.chunks.iter().cloned().map(Ok).collect();
            Response::builder()
                .header(CONTENT_TYPE, doc.content_type.clone())
                .body(Body::from_stream(futures_util::stream::iter(chunks)))
                .unwrap()
        }
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

fn header_string(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}
