//! Server side of the jsonlens pipeline.
//!
//! A small HTTP proxy that fetches JSON documents from allow-listed
//! upstream hosts, injecting credentials the browser-side viewer never
//! sees, and relays the body back as a bounded stream.
//!
//! Module layout:
//!
//! - [`fetch`] — outbound GET with Basic auth, Accept negotiation, and
//!   the transfer deadline
//! - [`relay`] — size-capped streaming of the upstream body into the
//!   client response
//! - [`server`] — the axum router, `/api/fetch` and `/api/health`

pub mod fetch;
pub mod relay;
pub mod server;
