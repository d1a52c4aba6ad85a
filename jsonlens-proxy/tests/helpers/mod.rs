//! Test helpers for proxy integration tests.

#![allow(unused_imports)] // Re-exports may not be used by all test files

pub mod mock_upstream;

pub use mock_upstream::*;
