//! Directory snapshots.
//!
//! `opendir` scans the whole image once and copies every matching name into
//! the shared [`SnapshotTable`]; `readdir` then drains that table through a
//! per-handle cursor. The table is always filled from index zero, so only
//! one traversal may be open at a time. The table tracks that with an
//! in-use flag and refuses a second `opendir` with
//! [`RomFsError::DirectoryBusy`].
//!
//! ```text
//!  SnapshotTable (DIR_LEN entries)
//! +-----+-----+-----+-----+-----+- - -+
//! |  1  |  2  |  3  |  0  |  0  |     |   ordinal (0 = free)
//! | a.c | b.c | x.h |     |     |     |   name
//! +-----+-----+-----+-----+-----+- - -+
//!   ^start      ^start+cursor   ^end
//! ```

use crate::config::{DIR_LEN, FILE_NAME_LEN, MAX_DIRS};
use crate::pool::HandlePool;
use crate::record::Image;
use crate::RomFsError;
use log::debug;

/// One slot of the snapshot table.
#[derive(Debug, Clone)]
pub struct SnapshotEntry {
    ordinal: u32,
    name: [u8; FILE_NAME_LEN],
}

impl SnapshotEntry {
    pub const EMPTY: Self = Self {
        ordinal: 0,
        name: [0; FILE_NAME_LEN],
    };

    /// Stores `name`, truncated to leave room for the terminator.
    pub(crate) fn set(&mut self, ordinal: u32, name: &[u8]) {
        let n = name.len().min(FILE_NAME_LEN - 1);
        self.name[..n].copy_from_slice(&name[..n]);
        self.name[n..].fill(0);
        self.ordinal = ordinal;
    }

    pub(crate) fn clear(&mut self) {
        self.ordinal = 0;
        self.name.fill(0);
    }

    /// 1-based position within the listing; 0 for a free slot.
    #[must_use]
    pub const fn ordinal(&self) -> u32 {
        self.ordinal
    }

    /// The stored name without its terminator.
    #[must_use]
    pub fn name(&self) -> &[u8] {
        let len = self.name.iter().position(|&b| b == 0).unwrap_or(FILE_NAME_LEN);
        &self.name[..len]
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.ordinal == 0
    }
}

/// An owned copy of one directory entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    ordinal: u32,
    name: [u8; FILE_NAME_LEN],
    len: usize,
}

impl DirEntry {
    fn from_snapshot(entry: &SnapshotEntry) -> Self {
        let name = entry.name();
        let mut out = [0; FILE_NAME_LEN];
        out[..name.len()].copy_from_slice(name);
        Self {
            ordinal: entry.ordinal,
            name: out,
            len: name.len(),
        }
    }

    #[must_use]
    pub const fn ordinal(&self) -> u32 {
        self.ordinal
    }

    #[must_use]
    pub fn name(&self) -> &[u8] {
        &self.name[..self.len]
    }

    /// The name as UTF-8, if it is.
    #[must_use]
    pub fn name_str(&self) -> Option<&str> {
        core::str::from_utf8(self.name()).ok()
    }
}

/// Handle to an open directory traversal.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct DirHandle(u32);

impl DirHandle {
    #[must_use]
    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    #[must_use]
    pub const fn as_raw(self) -> u32 {
        self.0
    }

    const fn index(self) -> usize {
        self.0 as usize
    }
}

/// `[start, end)` window into the snapshot table plus a read cursor
/// relative to `start`.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct DirCursor {
    pub start: usize,
    pub cursor: usize,
    pub end: usize,
}

impl DirCursor {
    const fn current(&self) -> Option<usize> {
        let at = self.start + self.cursor;
        if at >= self.end { None } else { Some(at) }
    }
}

/// The shared name table filled by `opendir`.
#[derive(Debug)]
pub struct SnapshotTable {
    entries: [SnapshotEntry; DIR_LEN],
    in_use: bool,
}

impl Default for SnapshotTable {
    fn default() -> Self {
        Self::new()
    }
}

impl SnapshotTable {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: [const { SnapshotEntry::EMPTY }; DIR_LEN],
            in_use: false,
        }
    }

    #[must_use]
    pub const fn in_use(&self) -> bool {
        self.in_use
    }

    #[must_use]
    pub fn entries(&self) -> &[SnapshotEntry] {
        &self.entries
    }
}

/// The snapshot table together with the directory handle pool.
#[derive(Debug, Default)]
pub struct DirTables {
    snapshot: SnapshotTable,
    handles: HandlePool<DirCursor, MAX_DIRS>,
}

impl DirTables {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            snapshot: SnapshotTable::new(),
            handles: HandlePool::new(),
        }
    }

    #[must_use]
    pub const fn snapshot(&self) -> &SnapshotTable {
        &self.snapshot
    }

    /// Snapshots every entry whose parent hashes to `dir_hash`.
    ///
    /// # Errors
    /// - [`RomFsError::DirectoryBusy`] if a traversal is still open.
    /// - [`RomFsError::NoHandles`] if the handle pool is exhausted.
    /// - [`RomFsError::NotADirectoryOrEmpty`] if nothing matches.
    /// - [`RomFsError::CapacityExceeded`] if the matches do not fit.
    /// - [`RomFsError::CorruptImage`] if the scan runs off the image.
    pub fn open(&mut self, image: &Image<'_>, dir_hash: u32) -> Result<DirHandle, RomFsError> {
        if self.snapshot.in_use {
            return Err(RomFsError::DirectoryBusy);
        }
        if self.handles.is_full() {
            return Err(RomFsError::NoHandles);
        }

        let start = 0;
        let matched = image.find_all_in_dir(dir_hash, &mut self.snapshot.entries, start)?;
        if matched == 0 {
            return Err(RomFsError::NotADirectoryOrEmpty);
        }

        let index = self.handles.insert(DirCursor {
            start,
            cursor: 0,
            end: start + matched,
        })?;
        self.snapshot.in_use = true;
        debug!("snapshot of {dir_hash:#010x}: {matched} entries, handle {index}");

        // the pool never holds more than MAX_DIRS entries
        #[allow(clippy::cast_possible_truncation)]
        Ok(DirHandle(index as u32))
    }

    /// Copies the next name into `buf`, truncated to `buf.len() - 1` bytes
    /// and NUL-terminated, and returns the number of name bytes written.
    ///
    /// `Ok(None)` marks the end of the directory. An empty `buf` receives
    /// nothing and does not consume the entry.
    ///
    /// # Errors
    /// [`RomFsError::BadHandle`] for a closed or unknown handle.
    pub fn read(&mut self, handle: DirHandle, buf: &mut [u8]) -> Result<Option<usize>, RomFsError> {
        let cursor = self.handles.get_mut(handle.index())?;
        let Some(at) = cursor.current() else {
            return Ok(None);
        };
        if buf.is_empty() {
            return Ok(Some(0));
        }

        let name = self.snapshot.entries[at].name();
        let n = name.len().min(buf.len() - 1);
        buf[..n].copy_from_slice(&name[..n]);
        buf[n] = 0;
        cursor.cursor += 1;
        Ok(Some(n))
    }

    /// Returns an owned copy of the next entry, or `None` at the end.
    ///
    /// # Errors
    /// [`RomFsError::BadHandle`] for a closed or unknown handle.
    pub fn next_entry(&mut self, handle: DirHandle) -> Result<Option<DirEntry>, RomFsError> {
        let cursor = self.handles.get_mut(handle.index())?;
        let Some(at) = cursor.current() else {
            return Ok(None);
        };
        cursor.cursor += 1;
        Ok(Some(DirEntry::from_snapshot(&self.snapshot.entries[at])))
    }

    /// Clears the handle's window of the snapshot table and releases it.
    ///
    /// # Errors
    /// [`RomFsError::BadHandle`] for a closed or unknown handle.
    pub fn close(&mut self, handle: DirHandle) -> Result<(), RomFsError> {
        let DirCursor { start, end, .. } = self.handles.remove(handle.index())?;
        for entry in &mut self.snapshot.entries[start..end] {
            entry.clear();
        }
        self.snapshot.in_use = false;
        debug!("closed directory handle {}", handle.0);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HEADER_LEN;
    use crate::record::RecordHeader;

    fn image(entries: &[(u32, &str)]) -> Vec<u8> {
        let mut img = Vec::new();
        for (i, (dir_hash, name)) in entries.iter().enumerate() {
            let header = RecordHeader {
                file_hash: 0x100 + u32::try_from(i).unwrap(),
                body_len: u32::try_from(name.len() + 1).unwrap(),
                dir_hash: *dir_hash,
            };
            img.extend_from_slice(&header.to_bytes());
            img.extend_from_slice(name.as_bytes());
            img.push(0);
        }
        img.extend_from_slice(&[0; HEADER_LEN]);
        img
    }

    #[test]
    fn lists_in_image_order_then_ends() {
        let img = image(&[(7, "a.txt"), (9, "zzz"), (7, "b.txt")]);
        let mut tables = DirTables::new();
        let h = tables.open(&Image::new(&img), 7).unwrap();

        let mut buf = [0xFFu8; 16];
        assert_eq!(tables.read(h, &mut buf).unwrap(), Some(5));
        assert_eq!(&buf[..6], b"a.txt\0");
        assert_eq!(tables.read(h, &mut buf).unwrap(), Some(5));
        assert_eq!(&buf[..6], b"b.txt\0");
        assert_eq!(tables.read(h, &mut buf).unwrap(), None);
        assert_eq!(tables.read(h, &mut buf).unwrap(), None);
    }

    #[test]
    fn small_buffers_truncate_but_stay_terminated() {
        let img = image(&[(7, "abcdef")]);
        let mut tables = DirTables::new();
        let h = tables.open(&Image::new(&img), 7).unwrap();

        let mut buf = [0xFFu8; 4];
        assert_eq!(tables.read(h, &mut buf).unwrap(), Some(3));
        assert_eq!(&buf, b"abc\0");
    }

    #[test]
    fn empty_buffer_does_not_consume() {
        let img = image(&[(7, "a")]);
        let mut tables = DirTables::new();
        let h = tables.open(&Image::new(&img), 7).unwrap();
        assert_eq!(tables.read(h, &mut []).unwrap(), Some(0));
        let entry = tables.next_entry(h).unwrap().unwrap();
        assert_eq!(entry.name(), b"a");
        assert_eq!(entry.ordinal(), 1);
        assert!(tables.next_entry(h).unwrap().is_none());
    }

    #[test]
    fn second_open_is_busy_until_closed() {
        let img = image(&[(7, "a"), (8, "b")]);
        let image = Image::new(&img);
        let mut tables = DirTables::new();
        let h = tables.open(&image, 7).unwrap();
        assert_eq!(tables.open(&image, 8).unwrap_err(), RomFsError::DirectoryBusy);

        tables.close(h).unwrap();
        assert!(!tables.snapshot().in_use());
        assert!(tables.snapshot().entries().iter().all(SnapshotEntry::is_empty));

        let h = tables.open(&image, 8).unwrap();
        assert_eq!(tables.next_entry(h).unwrap().unwrap().name_str(), Some("b"));
        assert!(tables.next_entry(h).unwrap().is_none());
    }

    #[test]
    fn no_match_yields_no_handle() {
        let img = image(&[(7, "a")]);
        let mut tables = DirTables::new();
        assert_eq!(
            tables.open(&Image::new(&img), 99).unwrap_err(),
            RomFsError::NotADirectoryOrEmpty
        );
        assert!(!tables.snapshot().in_use());
    }

    #[test]
    fn closed_handle_is_stale() {
        let img = image(&[(7, "a")]);
        let mut tables = DirTables::new();
        let h = tables.open(&Image::new(&img), 7).unwrap();
        tables.close(h).unwrap();
        assert_eq!(tables.close(h).unwrap_err(), RomFsError::BadHandle);
        assert_eq!(tables.read(h, &mut [0; 4]).unwrap_err(), RomFsError::BadHandle);
    }

    #[test]
    fn overflow_is_reported() {
        let names: Vec<String> = (0..=DIR_LEN).map(|i| format!("f{i}")).collect();
        let entries: Vec<(u32, &str)> = names.iter().map(|n| (7, n.as_str())).collect();
        let img = image(&entries);
        let mut tables = DirTables::new();
        assert_eq!(
            tables.open(&Image::new(&img), 7).unwrap_err(),
            RomFsError::CapacityExceeded { capacity: DIR_LEN }
        );
        assert!(!tables.snapshot().in_use());
        assert!(tables.snapshot().entries().iter().all(SnapshotEntry::is_empty));
    }
}
