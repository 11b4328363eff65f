//! Compile-time sizing of the ROMFS tables.
//!
//! Every table is a fixed array sized here; nothing is allocated at runtime.

/// Number of files that can be open at the same time.
pub const MAX_FDS: usize = 32;

/// Number of directory handles.
///
/// Only one traversal can be in flight at a time (the snapshot table is
/// shared), so this bounds handle slots rather than parallel listings.
pub const MAX_DIRS: usize = 4;

/// Capacity of the shared directory snapshot table, in entries.
pub const DIR_LEN: usize = 128;

/// Size of one snapshot name slot, including the NUL terminator.
pub const FILE_NAME_LEN: usize = 128;

/// Size of a record header in bytes.
pub const HEADER_LEN: usize = 12;

/// Initial value of the djb2 hash.
pub const HASH_INIT: u32 = 5381;
