//! Convenience re-exports for tests

pub use crate::fixtures::{Fixtures, file_entry, gzip_bytes, json_map};
pub use crate::must::{must, must_some, must_with};
