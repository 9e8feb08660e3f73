//! SHA-256 file hasher with streaming support.
//!
//! # Overview
//!
//! This module provides the [`ExactHasher`] collaborator trait and its
//! default implementation [`Sha256Hasher`], which streams file contents
//! through a fixed-size buffer so memory use stays flat regardless of
//! file size.

use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use sha2::{Digest, Sha256};

use super::HashError;

/// SHA-256 digest of a file's content.
pub type Hash = [u8; 32];

/// Read buffer size for streaming hashes.
const BUFFER_SIZE: usize = 64 * 1024;

/// Computes a content digest for a file.
///
/// Implementations must be safe to call concurrently for different paths.
pub trait ExactHasher: Send + Sync {
    /// Hash the full content of the file at `path`.
    ///
    /// # Errors
    ///
    /// Returns a recoverable `HashError` if the file cannot be read.
    fn hash_file(&self, path: &Path) -> Result<Hash, HashError>;
}

/// Streaming SHA-256 hasher.
#[derive(Debug, Clone)]
pub struct Sha256Hasher {
    buffer_size: usize,
}

impl Sha256Hasher {
    /// Create a hasher with the default 64 KiB read buffer.
    #[must_use]
    pub fn new() -> Self {
        Self {
            buffer_size: BUFFER_SIZE,
        }
    }

    /// Use a custom read buffer size (minimum 1 byte).
    #[must_use]
    pub fn with_buffer_size(mut self, size: usize) -> Self {
        self.buffer_size = size.max(1);
        self
    }

    /// Hash an in-memory byte slice.
    #[must_use]
    pub fn hash_bytes(data: &[u8]) -> Hash {
        Sha256::digest(data).into()
    }
}

impl Default for Sha256Hasher {
    fn default() -> Self {
        Self::new()
    }
}

impl ExactHasher for Sha256Hasher {
    fn hash_file(&self, path: &Path) -> Result<Hash, HashError> {
        let map_err = |e: io::Error| match e.kind() {
            io::ErrorKind::NotFound => HashError::NotFound(path.to_path_buf()),
            io::ErrorKind::PermissionDenied => HashError::PermissionDenied(path.to_path_buf()),
            _ => HashError::Io {
                path: path.to_path_buf(),
                source: e,
            },
        };

        let mut file = File::open(path).map_err(map_err)?;
        let mut hasher = Sha256::new();
        let mut buffer = vec![0u8; self.buffer_size];

        loop {
            let read = match file.read(&mut buffer) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(map_err(e)),
            };
            hasher.update(&buffer[..read]);
        }

        log::trace!("Hashed {}", path.display());
        Ok(hasher.finalize().into())
    }
}

/// Format a hash as lowercase hexadecimal.
#[must_use]
pub fn hash_to_hex(hash: &Hash) -> String {
    hash.iter().map(|b| format!("{b:02x}")).collect()
}
