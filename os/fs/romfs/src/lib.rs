//! # Hash-indexed read-only filesystem (ROMFS)
//!
//! A flat, read-only filesystem that lives as one contiguous blob in
//! firmware or ROM. Files are located by hashing their path and scanning
//! the blob record by record; there is no index beyond the image itself.
//!
//! ## Image Layout
//!
//! The image is a sequence of records terminated by a sentinel. All fields
//! are little-endian `u32`:
//!
//! ```text
//! +-----------+----------+----------+----------------+-----------------+
//! | file_hash | body_len | dir_hash | name ... \0    | content ...     |
//! +-----------+----------+----------+----------------+-----------------+
//! ^ record    ^ +4       ^ +8       ^ +12            ^ +12 + name + 1
//! ```
//!
//! - `file_hash` is the hash of the record's full path (relative to the mount).
//! - `body_len` covers name, terminator and content.
//! - `dir_hash` is the hash of the parent directory path.
//! - The next record starts at `record + 12 + body_len`.
//! - A record with `file_hash == 0` **or** `body_len == 0` ends the table.
//!
//! ## Components
//!
//! | Module | Role |
//! |--------|------|
//! | [`record`] | Header decoding, bounded record walk, `find_file` / `find_all_in_dir` |
//! | [`pool`] | Fixed-capacity handle pools |
//! | [`file`] | Open file cursors backing `read` / `seek` |
//! | [`dir`] | The shared directory snapshot table and directory cursors |
//! | [`fs`] | [`RomFs`], binding an image to the tables |
//! | [`vfs`] | VFS hook traits, mount registration and path dispatch |
//! | [`builder`] | Host-side [`ImageBuilder`](builder::ImageBuilder) (feature `builder`) |
//!
//! ## Typical Usage
//!
//! ```rust
//! # use romfs::{RomFs, Whence, builder::ImageBuilder};
//! let mut b = ImageBuilder::new();
//! b.add_file("etc/motd", b"hello, world\n").unwrap();
//! let image = b.finish();
//!
//! let fs = RomFs::new(&image);
//! let fd = fs.open("/etc/motd", 0, 0).unwrap();
//! let mut buf = [0u8; 5];
//! assert_eq!(fs.read(fd, &mut buf).unwrap(), 5);
//! assert_eq!(&buf, b"hello");
//! assert_eq!(fs.seek(fd, -1, Whence::End).unwrap(), 12);
//! fs.close(fd).unwrap();
//!
//! let dir = fs.opendir("etc").unwrap();
//! let mut name = [0u8; 16];
//! assert_eq!(fs.readdir(dir, &mut name).unwrap(), Some(4));
//! assert_eq!(&name[..5], b"motd\0");
//! assert_eq!(fs.readdir(dir, &mut name).unwrap(), None);
//! fs.closedir(dir).unwrap();
//! ```
//!
//! ## Directory Traversals
//!
//! All directory listings share one snapshot table that is always filled
//! from index zero. Only one traversal can be open at a time; a second
//! [`RomFs::opendir`] before [`RomFs::closedir`] fails with
//! [`RomFsError::DirectoryBusy`].

#![cfg_attr(not(any(test, doctest)), no_std)]

#[cfg(feature = "builder")]
extern crate alloc;

#[cfg(feature = "builder")]
pub mod builder;
pub mod config;
pub mod dir;
mod error;
pub mod file;
pub mod fs;
pub mod hash;
pub mod pool;
pub mod record;
pub mod vfs;

pub use dir::{DirEntry, DirHandle};
pub use error::RomFsError;
pub use file::{FileHandle, Whence};
pub use fs::RomFs;
pub use hash::{Djb2, PathHasher};
pub use vfs::{DirOps, FileOps, FileSystem, MountError, MountRegistry, MountTable, register_romfs};
