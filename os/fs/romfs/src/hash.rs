//! Path hashing.
//!
//! Records are keyed by a 32-bit hash of their path instead of the path
//! string. The same hasher must be used to build and to read an image.

use crate::config::HASH_INIT;

/// A deterministic, order-sensitive 32-bit hash over a byte string.
///
/// Equal inputs must always hash equal. Collisions are not resolved; an
/// image must not contain two paths with the same hash.
pub trait PathHasher {
    fn hash(&self, bytes: &[u8]) -> u32;

    /// Hashes `path` after [`normalize`] has stripped its slashes.
    fn hash_path(&self, path: &str) -> u32 {
        self.hash(normalize(path).as_bytes())
    }

    /// Hashes the parent directory of `path`; root-level entries get the
    /// hash of the empty string.
    fn hash_parent(&self, path: &str) -> u32 {
        self.hash(parent(path).as_bytes())
    }
}

/// Bernstein's djb2: `h = h * 33 + byte`, seeded with 5381.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct Djb2;

impl Djb2 {
    #[must_use]
    #[allow(clippy::cast_lossless)]
    pub const fn digest(bytes: &[u8]) -> u32 {
        let mut h = HASH_INIT;
        let mut i = 0;
        while i < bytes.len() {
            h = h.wrapping_mul(33).wrapping_add(bytes[i] as u32);
            i += 1;
        }
        h
    }
}

impl PathHasher for Djb2 {
    #[inline]
    fn hash(&self, bytes: &[u8]) -> u32 {
        Self::digest(bytes)
    }
}

/// Strips leading and trailing `/` so `"/a/b/"` and `"a/b"` hash alike.
#[must_use]
pub fn normalize(path: &str) -> &str {
    path.trim_matches('/')
}

/// Returns the normalized parent of `path`, or `""` at the root.
#[must_use]
pub fn parent(path: &str) -> &str {
    let path = normalize(path);
    path.rfind('/').map_or("", |i| path[..i].trim_end_matches('/'))
}

/// Returns the last component of `path`.
#[must_use]
pub fn file_name(path: &str) -> &str {
    let path = normalize(path);
    path.rfind('/').map_or(path, |i| &path[i + 1..])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn djb2_known_values() {
        assert_eq!(Djb2::digest(b""), 5381);
        assert_eq!(Djb2::digest(b"a"), 5381 * 33 + u32::from(b'a'));
        // "hello" is a common reference vector for the additive variant.
        assert_eq!(Djb2::digest(b"hello"), 261_238_937);
    }

    #[test]
    fn djb2_is_order_sensitive() {
        assert_ne!(Djb2::digest(b"ab"), Djb2::digest(b"ba"));
    }

    #[test]
    fn slashes_do_not_change_the_hash() {
        let h = Djb2;
        assert_eq!(h.hash_path("/etc/motd"), h.hash_path("etc/motd"));
        assert_eq!(h.hash_path("etc/motd/"), h.hash_path("etc/motd"));
        assert_eq!(h.hash_path("/"), Djb2::digest(b""));
    }

    #[test]
    fn parent_and_file_name() {
        assert_eq!(parent("/etc/init.d/rc"), "etc/init.d");
        assert_eq!(parent("motd"), "");
        assert_eq!(parent("/motd"), "");
        assert_eq!(file_name("/etc/init.d/rc"), "rc");
        assert_eq!(file_name("motd"), "motd");
    }

    #[test]
    fn hash_parent_matches_hash_path_of_directory() {
        let h = Djb2;
        assert_eq!(h.hash_parent("etc/motd"), h.hash_path("/etc/"));
        assert_eq!(h.hash_parent("motd"), h.hash_path(""));
    }
}
