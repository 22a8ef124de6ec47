//! Content inspection for volatile option values
//!
//! Everything an object derives from its file (size, digest, compression) is
//! produced here by a scoped read of the file. Nothing is cached: each call
//! reflects the file as it is now.

use std::fs::File;
use std::io::{self, BufRead, BufReader, Read};
use std::path::Path;

use flate2::read::MultiGzDecoder;
use serde_json::Value;
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use crate::error::EfuError;
use crate::option::{COMPRESSED, REQUIRED_UNCOMPRESSED_SIZE, SHA256SUM, SIZE};

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Values derived from an artifact's bytes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentInfo {
    /// Length in bytes
    pub size: u64,
    /// Lowercase hex SHA-256 digest
    pub sha256sum: String,
    /// Decompressed length when the content is gzip compressed
    pub uncompressed_size: Option<u64>,
}

impl ContentInfo {
    /// Read `path` once and derive its content values
    ///
    /// Gzip content is decompressed from the same pass that hashes it.
    ///
    /// # Errors
    ///
    /// Returns [`EfuError::Io`] carrying `path` when the file cannot be opened or read.
    pub fn inspect(path: &Path) -> Result<Self, EfuError> {
        let file = File::open(path).map_err(|e| EfuError::io(path, e))?;
        let mut reader = BufReader::new(file);
        let is_gzip = reader
            .fill_buf()
            .map_err(|e| EfuError::io(path, e))?
            .starts_with(&GZIP_MAGIC);

        let mut hashing = HashingReader::new(reader);
        let uncompressed_size = if is_gzip {
            gzip_uncompressed_size(&mut hashing, path)
        } else {
            None
        };
        // whatever the decoder left unread still counts towards size and digest
        io::copy(&mut hashing, &mut io::sink()).map_err(|e| EfuError::io(path, e))?;
        let (size, sha256sum) = hashing.finish();

        debug!(path = ?path, size, compressed = uncompressed_size.is_some(), "Inspected content");
        Ok(Self {
            size,
            sha256sum,
            uncompressed_size,
        })
    }

    /// Whether the content is compressed
    pub fn is_compressed(&self) -> bool {
        self.uncompressed_size.is_some()
    }

    /// Value of a volatile option, `Null` when it does not apply to this content
    pub fn volatile_value(&self, key: &str) -> Value {
        if key == SIZE.key {
            Value::from(self.size)
        } else if key == SHA256SUM.key {
            Value::from(self.sha256sum.as_str())
        } else if key == COMPRESSED.key {
            if self.is_compressed() {
                Value::Bool(true)
            } else {
                Value::Null
            }
        } else if key == REQUIRED_UNCOMPRESSED_SIZE.key {
            self.uncompressed_size.map_or(Value::Null, Value::from)
        } else {
            Value::Null
        }
    }
}

/// Reader that hashes and counts every byte passing through it
struct HashingReader<R> {
    inner: R,
    hasher: Sha256,
    size: u64,
}

impl<R: Read> HashingReader<R> {
    fn new(inner: R) -> Self {
        Self {
            inner,
            hasher: Sha256::new(),
            size: 0,
        }
    }

    fn finish(self) -> (u64, String) {
        (self.size, hex::encode(self.hasher.finalize()))
    }
}

impl<R: Read> Read for HashingReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let bytes_read = self.inner.read(buf)?;
        self.hasher.update(buf.get(..bytes_read).unwrap_or_default());
        self.size = self.size.saturating_add(bytes_read as u64);
        Ok(bytes_read)
    }
}

/// Decompressed length of every gzip member, `None` if the stream is not valid gzip
fn gzip_uncompressed_size<R: Read>(reader: &mut R, path: &Path) -> Option<u64> {
    let mut decoder = MultiGzDecoder::new(reader);
    match io::copy(&mut decoder, &mut io::sink()) {
        Ok(len) => Some(len),
        Err(e) => {
            warn!(path = ?path, error = %e, "Content has a gzip header but does not decompress");
            None
        }
    }
}

/// Compute the SHA-256 of a byte slice
pub fn compute_data_hash(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}
