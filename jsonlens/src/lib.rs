//! Client side of the jsonlens pipeline.
//!
//! Retrieves a JSON document through the jsonlens proxy and shows it:
//! the body is decoded incrementally as chunks arrive, parsed off the
//! interactive thread once complete, and rendered as a tree, with raw
//! text as the fallback for documents that turn out not to be JSON.
//!
//! Module layout:
//!
//! - [`decode`] — incremental UTF-8 decoding across chunk boundaries
//! - [`reader`] — chunked download with progress reporting
//! - [`parser`] — one-shot parse on a dedicated worker thread
//! - [`session`] — retrieval identity and supersession
//! - [`surface`] — rendering seam (terminal implementation included)

pub mod decode;
pub mod parser;
pub mod reader;
pub mod session;
pub mod surface;
