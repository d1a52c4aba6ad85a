//! Shared building blocks for the jsonlens retrieval pipeline.
//!
//! This crate carries everything both sides of the proxy agree on: the
//! error taxonomy with its wire representation, the upstream host
//! allow-list, and the process-wide proxy configuration. It performs no
//! I/O of its own beyond reading environment variables at startup.

pub mod allowlist;
pub mod config;
pub mod error;

pub use allowlist::HostAllowlist;
pub use config::ProxyConfig;
pub use error::{ErrorBody, RetrievalError};
