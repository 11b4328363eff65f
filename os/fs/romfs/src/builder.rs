//! Host-side image construction.
//!
//! Records are written in insertion order, which is also the order in which
//! directory listings return them.

use crate::config::HEADER_LEN;
use crate::hash::{self, Djb2, PathHasher};
use crate::record::RecordHeader;
use alloc::collections::BTreeMap;
use alloc::string::{String, ToString};
use alloc::vec::Vec;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BuildError {
    #[error("path {0:?} has no file name")]
    EmptyName(String),
    #[error("path {0:?} contains a NUL byte")]
    NameContainsNul(String),
    #[error("{0:?} does not fit in a record")]
    TooLarge(String),
    #[error("path {0:?} hashes to zero and would read as the end of the image")]
    ZeroHash(String),
    #[error("path {0:?} was already added")]
    Duplicate(String),
    #[error("paths {path:?} and {existing:?} share the hash {hash:#010x}")]
    HashCollision {
        path: String,
        existing: String,
        hash: u32,
    },
}

/// Accumulates records and emits a sentinel-terminated image.
#[derive(Debug, Default)]
pub struct ImageBuilder<H = Djb2> {
    hasher: H,
    out: Vec<u8>,
    paths: BTreeMap<u32, String>,
}

impl ImageBuilder<Djb2> {
    #[must_use]
    pub const fn new() -> Self {
        Self::with_hasher(Djb2)
    }
}

impl<H: PathHasher> ImageBuilder<H> {
    #[must_use]
    pub const fn with_hasher(hasher: H) -> Self {
        Self {
            hasher,
            out: Vec::new(),
            paths: BTreeMap::new(),
        }
    }

    /// Adds a file at `path` (relative to the mount point).
    ///
    /// The record's name is the last path component; its directory hash is
    /// the hash of the parent path.
    ///
    /// # Errors
    /// See [`BuildError`].
    pub fn add_file(&mut self, path: &str, content: &[u8]) -> Result<&mut Self, BuildError> {
        let path = hash::normalize(path);
        let name = hash::file_name(path);
        if name.is_empty() {
            return Err(BuildError::EmptyName(path.to_string()));
        }
        if path.contains('\0') {
            return Err(BuildError::NameContainsNul(path.to_string()));
        }

        let file_hash = self.hasher.hash_path(path);
        if file_hash == 0 {
            return Err(BuildError::ZeroHash(path.to_string()));
        }
        if let Some(existing) = self.paths.get(&file_hash) {
            return Err(if existing == path {
                BuildError::Duplicate(path.to_string())
            } else {
                BuildError::HashCollision {
                    path: path.to_string(),
                    existing: existing.clone(),
                    hash: file_hash,
                }
            });
        }

        let body_len = name
            .len()
            .checked_add(1 + content.len())
            .and_then(|n| u32::try_from(n).ok())
            .ok_or_else(|| BuildError::TooLarge(path.to_string()))?;

        let header = RecordHeader {
            file_hash,
            body_len,
            dir_hash: self.hasher.hash_parent(path),
        };
        self.out.extend_from_slice(&header.to_bytes());
        self.out.extend_from_slice(name.as_bytes());
        self.out.push(0);
        self.out.extend_from_slice(content);
        self.paths.insert(file_hash, path.to_string());
        Ok(self)
    }

    /// Adds an empty record for the directory at `path` so that it shows up
    /// when its parent is listed.
    ///
    /// # Errors
    /// See [`BuildError`].
    pub fn add_dir(&mut self, path: &str) -> Result<&mut Self, BuildError> {
        self.add_file(path, &[])
    }

    /// Number of records added so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.paths.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Appends the sentinel and returns the image.
    #[must_use]
    pub fn finish(mut self) -> Vec<u8> {
        self.out.extend_from_slice(&[0; HEADER_LEN]);
        self.out
    }
}
