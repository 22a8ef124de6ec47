//! Temporary artifacts and package documents.
//!
//! A [`Fixtures`] owns a temporary directory; everything it creates is
//! removed when it is dropped.

use std::io::Write;
use std::path::{Path, PathBuf};

use flate2::Compression;
use flate2::write::GzEncoder;
use serde_json::{Map, Value, json};
use tempfile::TempDir;

/// Scratch directory for artifact files and package documents
#[derive(Debug)]
pub struct Fixtures {
    dir: TempDir,
}

impl Fixtures {
    /// Create an empty scratch directory
    ///
    /// # Panics
    ///
    /// Panics if the temporary directory cannot be created.
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().unwrap(),
        }
    }

    /// Root of the scratch directory
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Write `bytes` to `name` inside the scratch directory
    ///
    /// # Panics
    ///
    /// Panics if the file cannot be written.
    pub fn create_file(&self, name: &str, bytes: &[u8]) -> PathBuf {
        let path = self.dir.path().join(name);
        std::fs::write(&path, bytes).unwrap();
        path
    }

    /// Write `n` distinct small artifacts named `file-0` .. `file-{n-1}`
    pub fn create_files(&self, n: usize) -> Vec<PathBuf> {
        (0..n)
            .map(|i| self.create_file(&format!("file-{i}"), format!("content {i}\n").as_bytes()))
            .collect()
    }

    /// Write a package description document listing `files`
    ///
    /// Each entry is a file template; plain paths can be passed through
    /// [`file_entry`].
    pub fn create_package_file(&self, product: Value, version: &str, files: Vec<Value>) -> PathBuf {
        let document = json!({
            "product": product,
            "version": version,
            "files": files,
        });
        self.create_file(".efu", document.to_string().as_bytes())
    }
}

impl Default for Fixtures {
    fn default() -> Self {
        Self::new()
    }
}

/// Minimal file template for `path`
pub fn file_entry(path: &Path) -> Value {
    json!({"filename": path.to_string_lossy()})
}

/// Unwrap a JSON object literal into its map; non-objects give an empty map
pub fn json_map(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

/// Gzip-compress `data` in memory
///
/// # Panics
///
/// Panics if the encoder fails.
pub fn gzip_bytes(data: &[u8]) -> Vec<u8> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_files_are_distinct() {
        let fixtures = Fixtures::new();
        let files = fixtures.create_files(3);
        assert_eq!(files.len(), 3);
        let contents: Vec<_> = files.iter().map(|f| std::fs::read(f).unwrap()).collect();
        assert_ne!(contents[0], contents[1]);
    }

    #[test]
    fn test_gzip_magic() {
        let bytes = gzip_bytes(b"abc");
        assert_eq!(bytes.get(..2), Some(&[0x1f, 0x8b][..]));
    }
}
