//! Proxy configuration, read once from the environment at startup.

use std::fmt;
use std::time::Duration;

use crate::allowlist::HostAllowlist;

const DEFAULT_BIND_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 4000;
const DEFAULT_TIMEOUT_MS: u64 = 180_000;
const DEFAULT_MAX_RESPONSE_MB: u64 = 500;

/// Process-wide proxy configuration.
///
/// Loaded once at startup and never mutated afterwards; the allow-list and
/// credentials are shared read-only across request handlers.
#[derive(Clone)]
pub struct ProxyConfig {
    /// Address the server binds to.
    pub bind_host: String,
    /// Port the server binds to.
    pub port: u16,
    /// Permitted upstream host suffixes.
    pub allowlist: HostAllowlist,
    /// Basic-auth username injected into upstream calls.
    pub username: Option<String>,
    /// Basic-auth password injected into upstream calls.
    pub password: Option<String>,
    /// End-to-end wall-clock timeout for one upstream call.
    pub timeout: Duration,
    /// Maximum upstream response body size in bytes.
    pub max_response_bytes: u64,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            bind_host: DEFAULT_BIND_HOST.to_string(),
            port: DEFAULT_PORT,
            allowlist: HostAllowlist::default(),
            username: None,
            password: None,
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
            max_response_bytes: DEFAULT_MAX_RESPONSE_MB * 1024 * 1024,
        }
    }
}

impl ProxyConfig {
    /// Load configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `JSONLENS_BIND_HOST` (default: `0.0.0.0`)
    /// - `JSONLENS_PORT` (default: `4000`)
    /// - `JSONLENS_ALLOWED_UPSTREAM` — `|`-delimited host suffixes
    ///   (default: empty, which permits nothing)
    /// - `JSONLENS_UPSTREAM_USERNAME` / `JSONLENS_UPSTREAM_PASSWORD` —
    ///   Basic-auth credentials for upstream calls (default: unset)
    /// - `JSONLENS_REQUEST_TIMEOUT_MS` (default: `180000`)
    /// - `JSONLENS_MAX_RESPONSE_MB` (default: `500`)
    ///
    /// Unset, empty, or unparsable values fall back to the defaults.
    #[must_use]
    pub fn from_env() -> Self {
        let bind_host = std::env::var("JSONLENS_BIND_HOST")
            .ok()
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| DEFAULT_BIND_HOST.to_string());

        let port: u16 = std::env::var("JSONLENS_PORT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_PORT);

        let allowlist = HostAllowlist::from_delimited(
            &std::env::var("JSONLENS_ALLOWED_UPSTREAM").unwrap_or_default(),
        );

        let username = std::env::var("JSONLENS_UPSTREAM_USERNAME")
            .ok()
            .filter(|v| !v.is_empty());
        let password = std::env::var("JSONLENS_UPSTREAM_PASSWORD")
            .ok()
            .filter(|v| !v.is_empty());

        let timeout_ms: u64 = std::env::var("JSONLENS_REQUEST_TIMEOUT_MS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_TIMEOUT_MS);

        let max_response_mb: u64 = std::env::var("JSONLENS_MAX_RESPONSE_MB")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_MAX_RESPONSE_MB);

        Self {
            bind_host,
            port,
            allowlist,
            username,
            password,
            timeout: Duration::from_millis(timeout_ms),
            max_response_bytes: max_response_mb * 1024 * 1024,
        }
    }

    /// The `host:port` address to bind.
    #[must_use]
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.bind_host, self.port)
    }

    /// The Basic-auth credential pair, present only when BOTH username and
    /// password are configured. A lone username or password injects nothing.
    #[must_use]
    pub fn credentials(&self) -> Option<(&str, &str)> {
        match (&self.username, &self.password) {
            (Some(user), Some(pass)) => Some((user.as_str(), pass.as_str())),
            _ => None,
        }
    }
}

impl fmt::Debug for ProxyConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProxyConfig")
            .field("bind_host", &self.bind_host)
            .field("port", &self.port)
            .field("allowlist", &self.allowlist)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("timeout", &self.timeout)
            .field("max_response_bytes", &self.max_response_bytes)
            .finish()
    }
}
