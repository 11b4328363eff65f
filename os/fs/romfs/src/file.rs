//! Open file state backing `read` and `seek`.

use crate::RomFsError;

/// Access-mode and creation flags understood by [`RomFs::open`](crate::RomFs::open).
///
/// Values follow the Linux ABI. Anything that asks for write access is
/// refused with [`RomFsError::ReadOnly`].
pub mod flags {
    pub const O_RDONLY: i32 = 0o0;
    pub const O_WRONLY: i32 = 0o1;
    pub const O_RDWR: i32 = 0o2;
    pub const O_ACCMODE: i32 = 0o3;
    pub const O_CREAT: i32 = 0o100;
    pub const O_TRUNC: i32 = 0o1000;
    pub const O_APPEND: i32 = 0o2000;

    /// Returns `true` if `flags` would modify the filesystem.
    #[must_use]
    pub const fn wants_write(flags: i32) -> bool {
        (flags & O_ACCMODE) != O_RDONLY || (flags & (O_CREAT | O_TRUNC | O_APPEND)) != 0
    }
}

/// Handle to an open file.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct FileHandle(u32);

impl FileHandle {
    #[must_use]
    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    #[must_use]
    pub const fn as_raw(self) -> u32 {
        self.0
    }

    pub(crate) const fn index(self) -> usize {
        self.0 as usize
    }
}

/// Origin of a seek.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[repr(i32)]
pub enum Whence {
    /// `SEEK_SET`: from the start of the content.
    Start = 0,
    /// `SEEK_CUR`: from the current cursor.
    Current = 1,
    /// `SEEK_END`: from the end of the content.
    End = 2,
}

impl TryFrom<i32> for Whence {
    type Error = RomFsError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Start),
            1 => Ok(Self::Current),
            2 => Ok(Self::End),
            other => Err(RomFsError::InvalidWhence(other)),
        }
    }
}

/// Cursor over a file's content inside the image.
///
/// The content slice is a view into the image; its length is the file size
/// and never changes.
#[derive(Debug, Clone)]
pub struct OpenFile<'a> {
    content: &'a [u8],
    cursor: usize,
}

impl<'a> OpenFile<'a> {
    #[must_use]
    pub const fn new(content: &'a [u8]) -> Self {
        Self { content, cursor: 0 }
    }

    #[must_use]
    pub const fn size(&self) -> usize {
        self.content.len()
    }

    #[must_use]
    pub const fn position(&self) -> usize {
        self.cursor
    }

    /// Copies up to `buf.len()` bytes from the cursor and advances it.
    ///
    /// Returns 0 at or past the end of the content.
    pub fn read(&mut self, buf: &mut [u8]) -> usize {
        let remaining = self.content.get(self.cursor..).unwrap_or_default();
        let n = buf.len().min(remaining.len());
        buf[..n].copy_from_slice(&remaining[..n]);
        self.cursor += n;
        n
    }

    /// Moves the cursor to `origin + offset`, clamped to the file size.
    ///
    /// # Errors
    /// [`RomFsError::InvalidOffset`] if the target lies before the start.
    pub fn seek(&mut self, offset: i64, whence: Whence) -> Result<usize, RomFsError> {
        let size = self.size();
        let origin = match whence {
            Whence::Start => 0,
            Whence::Current => self.cursor,
            Whence::End => size,
        };

        let origin = i64::try_from(origin).unwrap_or(i64::MAX);
        let target = match origin.checked_add(offset) {
            Some(target) if target < 0 => return Err(RomFsError::InvalidOffset),
            Some(target) => usize::try_from(target).unwrap_or(usize::MAX),
            None if offset < 0 => return Err(RomFsError::InvalidOffset),
            None => usize::MAX,
        };

        self.cursor = target.min(size);
        Ok(self.cursor)
    }
}
