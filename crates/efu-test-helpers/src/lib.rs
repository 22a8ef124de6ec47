//! Shared test utilities for EFU.
//!
//! # Modules
//!
//! - [`mod@must`] - Unwrap helpers with good error messages and `#[track_caller]`
//! - [`fixtures`] - Temporary artifact files and package documents
//! - [`prelude`] - Convenience re-exports
//!
//! # Usage
//!
//! ```toml
//! [dev-dependencies]
//! efu-test-helpers = { path = "crates/efu-test-helpers" }
//! ```
//!
//! ```rust,ignore
//! use efu_test_helpers::prelude::*;
//! ```

#![deny(unsafe_op_in_unsafe_fn)]
#![allow(clippy::unwrap_used, clippy::panic)]

pub mod fixtures;
pub mod must;
pub mod prelude;

pub use must::*;
