//! HTTP surface of the proxy.
//!
//! Two routes:
//!
//! - `GET /api/fetch?url=...` — vet the target against the allow-list,
//!   fetch it with injected credentials, and stream the body back.
//! - `GET /api/health` — liveness probe, `{"ok": true}`.
//!
//! Preflight rejections (missing parameter, disallowed host) and fetch
//! failures are reported as JSON error bodies; a body that dies mid-relay
//! aborts the client connection instead, because the status line has
//! already been sent.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use url::Url;

use jsonlens_core::{HostAllowlist, ProxyConfig, RetrievalError};

use crate::fetch::{Fetch, UpstreamClient};
use crate::relay::relay_response;

/// Shared state behind the router.
pub struct AppState {
    pub fetcher: Arc<dyn Fetch>,
    pub allowlist: HostAllowlist,
    pub max_response_bytes: u64,
}

#[derive(Debug, Deserialize)]
struct FetchParams {
    url: Option<String>,
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    ok: bool,
}

/// Build the proxy router.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/fetch", get(fetch_handler))
        .route("/api/health", get(health_handler))
        .with_state(state)
}

async fn fetch_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<FetchParams>,
) -> Response {
    let Some(raw_url) = params.url else {
        return error_response(&RetrievalError::InvalidRequest);
    };

    // A target that does not even parse as a URL can never match an
    // allow-list entry, so it gets the same refusal.
    let target = match Url::parse(&raw_url) {
        Ok(url) => url,
        Err(_) => {
            warn!(url = %raw_url, "rejected malformed target URL");
            return error_response(&RetrievalError::Forbidden);
        }
    };

    if !state.allowlist.permits(&target) {
        warn!(
            host = target.host_str().unwrap_or("<none>"),
            "rejected target outside the allow-list"
        );
        return error_response(&RetrievalError::Forbidden);
    }

    match state.fetcher.fetch(&target).await {
        Ok(upstream) => {
            info!(
                host = target.host_str().unwrap_or("<none>"),
                status = %upstream.status,
                content_length = ?upstream.content_length,
                "relaying upstream response"
            );
            relay_response(upstream, state.max_response_bytes)
        }
        Err(err) => {
            warn!(
                host = target.host_str().unwrap_or("<none>"),
                error = %err,
                "upstream fetch failed"
            );
            error_response(&err)
        }
    }
}

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse { ok: true })
}

/// Render a retrieval error as its wire status and JSON body.
fn error_response(error: &RetrievalError) -> Response {
    let status = StatusCode::from_u16(error.status_code())
        .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(error.wire_body())).into_response()
}

/// Bind and serve the proxy until SIGINT or SIGTERM.
///
/// # Errors
///
/// Returns an I/O error if the listener cannot bind or the HTTP client
/// cannot be constructed.
pub async fn run(config: ProxyConfig) -> std::io::Result<()> {
    let fetcher =
        UpstreamClient::new(&config).map_err(|e| std::io::Error::other(e.to_string()))?;
    let state = Arc::new(AppState {
        fetcher: Arc::new(fetcher),
        allowlist: config.allowlist.clone(),
        max_response_bytes: config.max_response_bytes,
    });

    let listener = TcpListener::bind(config.bind_addr()).await?;
    info!(
        addr = %listener.local_addr()?,
        allowed_hosts = config.allowlist.len(),
        timeout_ms = config.timeout.as_millis() as u64,
        max_response_bytes = config.max_response_bytes,
        "proxy listening"
    );

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
}

/// Resolves when the process receives SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "failed to install SIGINT handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("received SIGINT, shutting down"),
        () = terminate => info!("received SIGTERM, shutting down"),
    }
}
