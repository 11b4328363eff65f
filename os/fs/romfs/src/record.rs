//! Record decoding and the image scanner.
//!
//! The scanner never trusts the image: every header and body is checked
//! against the image length before it is touched, and running off the end
//! before a sentinel is reported as [`RomFsError::CorruptImage`].

use crate::RomFsError;
use crate::config::HEADER_LEN;
use crate::dir::SnapshotEntry;
use log::{trace, warn};

/// The fixed 12-byte header in front of every record.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct RecordHeader {
    /// Hash of the record's full path.
    pub file_hash: u32,
    /// Length of name, terminator and content.
    pub body_len: u32,
    /// Hash of the parent directory path.
    pub dir_hash: u32,
}

impl RecordHeader {
    /// Either field being zero terminates the record table.
    #[must_use]
    pub const fn is_sentinel(file_hash: u32, body_len: u32) -> bool {
        file_hash == 0 || body_len == 0
    }

    /// Little-endian wire form.
    #[must_use]
    pub fn to_bytes(&self) -> [u8; HEADER_LEN] {
        let mut out = [0u8; HEADER_LEN];
        out[0..4].copy_from_slice(&self.file_hash.to_le_bytes());
        out[4..8].copy_from_slice(&self.body_len.to_le_bytes());
        out[8..12].copy_from_slice(&self.dir_hash.to_le_bytes());
        out
    }
}

/// One record borrowed from the image.
///
/// [`body`](Self::body) starts at the name, not at the content; use
/// [`split`](Self::split) to separate the two.
#[derive(Debug, Copy, Clone)]
pub struct Record<'a> {
    offset: usize,
    header: RecordHeader,
    body: &'a [u8],
}

impl<'a> Record<'a> {
    /// Byte offset of the header within the image.
    #[must_use]
    pub const fn offset(&self) -> usize {
        self.offset
    }

    #[must_use]
    pub const fn header(&self) -> RecordHeader {
        self.header
    }

    /// Name, terminator and content; `body_len` bytes.
    #[must_use]
    pub const fn body(&self) -> &'a [u8] {
        self.body
    }

    /// Splits the body into `(name, content)`.
    ///
    /// # Errors
    /// [`RomFsError::CorruptImage`] if the body holds no NUL terminator.
    pub fn split(&self) -> Result<(&'a [u8], &'a [u8]), RomFsError> {
        split_content(self.body).ok_or(RomFsError::CorruptImage {
            offset: self.offset + HEADER_LEN,
        })
    }

    /// The file name without its terminator.
    ///
    /// # Errors
    /// See [`split`](Self::split).
    pub fn name(&self) -> Result<&'a [u8], RomFsError> {
        self.split().map(|(name, _)| name)
    }

    /// The file content.
    ///
    /// # Errors
    /// See [`split`](Self::split).
    pub fn content(&self) -> Result<&'a [u8], RomFsError> {
        self.split().map(|(_, content)| content)
    }
}

/// Skips the NUL-terminated name at the start of `body`.
///
/// Returns `None` if `body` has no terminator.
#[must_use]
pub fn split_content(body: &[u8]) -> Option<(&[u8], &[u8])> {
    let nul = body.iter().position(|&b| b == 0)?;
    Some((&body[..nul], &body[nul + 1..]))
}

#[inline]
fn read_u32_le(buf: &[u8], off: usize) -> Result<u32, RomFsError> {
    let corrupt = RomFsError::CorruptImage { offset: off };
    let end = off.checked_add(4).ok_or(corrupt)?;
    let s = buf.get(off..end).ok_or(corrupt)?;
    Ok(u32::from_le_bytes([s[0], s[1], s[2], s[3]]))
}

/// Read-only view over a ROMFS image.
#[derive(Debug, Copy, Clone)]
pub struct Image<'a> {
    bytes: &'a [u8],
}

impl<'a> Image<'a> {
    #[must_use]
    pub const fn new(bytes: &'a [u8]) -> Self {
        Self { bytes }
    }

    #[must_use]
    pub const fn as_bytes(&self) -> &'a [u8] {
        self.bytes
    }

    /// Walks the records in image order up to the sentinel.
    ///
    /// A corrupt record is yielded once as an error, after which the
    /// iterator is exhausted.
    #[must_use]
    pub const fn records(&self) -> Records<'a> {
        Records {
            image: self.bytes,
            offset: 0,
            done: false,
        }
    }

    /// Finds the first record whose `file_hash` equals `hash`.
    ///
    /// The returned record's body still begins with the name.
    ///
    /// # Errors
    /// [`RomFsError::NotFound`] if no record matches, or
    /// [`RomFsError::CorruptImage`] if the scan runs off the image.
    pub fn find_file(&self, hash: u32) -> Result<Record<'a>, RomFsError> {
        for record in self.records() {
            let record = record?;
            if record.header.file_hash == hash {
                return Ok(record);
            }
        }
        Err(RomFsError::NotFound)
    }

    /// Copies the name of every record whose `dir_hash` equals `hash` into
    /// `dest[start..]`, numbering them from 1 in image order.
    ///
    /// Returns the number of matches. If the matches do not fit, every
    /// entry written by this call is cleared again.
    ///
    /// # Errors
    /// [`RomFsError::CapacityExceeded`] if `dest` is too small, or
    /// [`RomFsError::CorruptImage`] if the scan runs off the image.
    pub fn find_all_in_dir(
        &self,
        hash: u32,
        dest: &mut [SnapshotEntry],
        start: usize,
    ) -> Result<usize, RomFsError> {
        let mut count = 0usize;
        for record in self.records() {
            let record = match record {
                Ok(record) => record,
                Err(e) => {
                    clear(dest, start, count);
                    return Err(e);
                }
            };

            if record.header.dir_hash != hash {
                continue;
            }

            let name = match record.name() {
                Ok(name) => name,
                Err(e) => {
                    clear(dest, start, count);
                    return Err(e);
                }
            };

            let Some(slot) = dest.get_mut(start + count) else {
                warn!(
                    "directory {hash:#010x} exceeds snapshot capacity of {}",
                    dest.len()
                );
                clear(dest, start, count);
                return Err(RomFsError::CapacityExceeded {
                    capacity: dest.len(),
                });
            };

            count += 1;
            // ordinals are 1-based; the table never holds u32::MAX entries
            #[allow(clippy::cast_possible_truncation)]
            slot.set(count as u32, name);
        }
        Ok(count)
    }
}

fn clear(dest: &mut [SnapshotEntry], start: usize, count: usize) {
    for entry in dest.iter_mut().skip(start).take(count) {
        entry.clear();
    }
}

/// Iterator over the records of an [`Image`].
#[derive(Debug, Clone)]
pub struct Records<'a> {
    image: &'a [u8],
    offset: usize,
    done: bool,
}

impl<'a> Records<'a> {
    fn step(&mut self) -> Result<Option<Record<'a>>, RomFsError> {
        let at = self.offset;
        let file_hash = read_u32_le(self.image, at)?;
        let body_len = read_u32_le(self.image, at + 4)?;
        if RecordHeader::is_sentinel(file_hash, body_len) {
            trace!("sentinel at {at:#x}");
            return Ok(None);
        }

        let dir_hash = read_u32_le(self.image, at + 8)?;
        let body_start = at + HEADER_LEN;
        let body_end = body_start
            .checked_add(body_len as usize)
            .ok_or(RomFsError::CorruptImage { offset: at })?;
        let body = self
            .image
            .get(body_start..body_end)
            .ok_or(RomFsError::CorruptImage { offset: at })?;

        trace!("record at {at:#x}: file={file_hash:#010x} dir={dir_hash:#010x} len={body_len}");
        self.offset = body_end;
        Ok(Some(Record {
            offset: at,
            header: RecordHeader {
                file_hash,
                body_len,
                dir_hash,
            },
            body,
        }))
    }
}

impl<'a> Iterator for Records<'a> {
    type Item = Result<Record<'a>, RomFsError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.step() {
            Ok(Some(record)) => Some(Ok(record)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                warn!("{e}");
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

impl core::iter::FusedIterator for Records<'_> {}
