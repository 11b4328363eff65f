//! The mounted filesystem: an image plus its descriptor and directory tables.

use crate::config::MAX_FDS;
use crate::dir::{DirEntry, DirHandle, DirTables};
use crate::file::{FileHandle, OpenFile, Whence, flags};
use crate::hash::{Djb2, PathHasher};
use crate::pool::HandlePool;
use crate::record::Image;
use crate::RomFsError;
use log::debug;
use spin::Mutex;

/// A ROMFS instance bound to one image.
///
/// The image is borrowed for `'a` and never copied; open files hand out
/// views into it. The tables sit behind spin locks so an instance can live
/// in a `static` and be shared.
pub struct RomFs<'a, H = Djb2> {
    image: Image<'a>,
    hasher: H,
    files: Mutex<HandlePool<OpenFile<'a>, MAX_FDS>>,
    dirs: Mutex<DirTables>,
}

impl<'a> RomFs<'a, Djb2> {
    /// Binds `image` using the djb2 path hash.
    #[must_use]
    pub const fn new(image: &'a [u8]) -> Self {
        Self::with_hasher(image, Djb2)
    }
}

impl<'a, H: PathHasher> RomFs<'a, H> {
    #[must_use]
    pub const fn with_hasher(image: &'a [u8], hasher: H) -> Self {
        Self {
            image: Image::new(image),
            hasher,
            files: Mutex::new(HandlePool::new()),
            dirs: Mutex::new(DirTables::new()),
        }
    }

    #[must_use]
    pub const fn image(&self) -> Image<'a> {
        self.image
    }

    /// Opens the file at `path` for reading.
    ///
    /// `mode` is accepted for VFS compatibility and ignored.
    ///
    /// # Errors
    /// - [`RomFsError::ReadOnly`] if `flags` ask for write access.
    /// - [`RomFsError::NotFound`] if no record carries the path's hash.
    /// - [`RomFsError::NoHandles`] if all `MAX_FDS` descriptors are open.
    /// - [`RomFsError::CorruptImage`] if the image is malformed.
    pub fn open(&self, path: &str, flags: i32, _mode: i32) -> Result<FileHandle, RomFsError> {
        if flags::wants_write(flags) {
            return Err(RomFsError::ReadOnly);
        }

        let hash = self.hasher.hash_path(path);
        let record = self.image.find_file(hash).inspect_err(|e| {
            debug!("open {path:?} ({hash:#010x}): {e}");
        })?;
        let (_, content) = record.split()?;

        let index = self.files.lock().insert(OpenFile::new(content))?;
        debug!("open {path:?}: fd {index}, {} bytes", content.len());

        // MAX_FDS is far below u32::MAX
        #[allow(clippy::cast_possible_truncation)]
        Ok(FileHandle::from_raw(index as u32))
    }

    /// Reads from the cursor into `buf`; returns 0 at end of file.
    ///
    /// # Errors
    /// [`RomFsError::BadHandle`] for a closed or unknown handle.
    pub fn read(&self, fd: FileHandle, buf: &mut [u8]) -> Result<usize, RomFsError> {
        Ok(self.files.lock().get_mut(fd.index())?.read(buf))
    }

    /// Moves the cursor; targets past the end clamp to the file size.
    ///
    /// # Errors
    /// [`RomFsError::InvalidOffset`] for a target before the start, or
    /// [`RomFsError::BadHandle`].
    pub fn seek(&self, fd: FileHandle, offset: i64, whence: Whence) -> Result<usize, RomFsError> {
        self.files.lock().get_mut(fd.index())?.seek(offset, whence)
    }

    /// # Errors
    /// [`RomFsError::BadHandle`] for a closed or unknown handle.
    pub fn close(&self, fd: FileHandle) -> Result<(), RomFsError> {
        self.files.lock().remove(fd.index()).map(drop)
    }

    /// Size of the open file's content.
    ///
    /// # Errors
    /// [`RomFsError::BadHandle`] for a closed or unknown handle.
    pub fn size(&self, fd: FileHandle) -> Result<usize, RomFsError> {
        Ok(self.files.lock().get(fd.index())?.size())
    }

    /// # Errors
    /// [`RomFsError::BadHandle`] for a closed or unknown handle.
    pub fn position(&self, fd: FileHandle) -> Result<usize, RomFsError> {
        Ok(self.files.lock().get(fd.index())?.position())
    }

    /// Snapshots the entries whose parent is `path`.
    ///
    /// # Errors
    /// See [`DirTables::open`].
    pub fn opendir(&self, path: &str) -> Result<DirHandle, RomFsError> {
        let hash = self.hasher.hash_path(path);
        self.dirs.lock().open(&self.image, hash).inspect_err(|e| {
            debug!("opendir {path:?} ({hash:#010x}): {e}");
        })
    }

    /// Copies the next entry name into `buf`, NUL-terminated.
    ///
    /// # Errors
    /// See [`DirTables::read`].
    pub fn readdir(&self, dh: DirHandle, buf: &mut [u8]) -> Result<Option<usize>, RomFsError> {
        self.dirs.lock().read(dh, buf)
    }

    /// # Errors
    /// See [`DirTables::next_entry`].
    pub fn next_entry(&self, dh: DirHandle) -> Result<Option<DirEntry>, RomFsError> {
        self.dirs.lock().next_entry(dh)
    }

    /// Ends the traversal and wipes its snapshot entries.
    ///
    /// # Errors
    /// See [`DirTables::close`].
    pub fn closedir(&self, dh: DirHandle) -> Result<(), RomFsError> {
        self.dirs.lock().close(dh)
    }
}
