//! VFS hooks and mount dispatch.
//!
//! The surrounding system sees a filesystem only through the traits in this
//! module: [`FileSystem`] resolves paths to handles, [`FileOps`] and
//! [`DirOps`] operate on those handles. [`register_romfs`] binds a
//! [`RomFs`] into any [`MountRegistry`]; [`MountTable`] is a fixed-size
//! registry that routes absolute paths to the mounted filesystem.

use crate::dir::DirHandle;
use crate::file::{FileHandle, Whence};
use crate::hash::{PathHasher, normalize};
use crate::{RomFs, RomFsError};
use log::info;

/// Operations on an open file.
pub trait FileOps {
    /// Returns the number of bytes copied; 0 at end of file.
    ///
    /// # Errors
    /// Implementation-defined.
    fn read(&self, fd: FileHandle, buf: &mut [u8]) -> Result<usize, RomFsError>;

    /// `whence` is the raw `SEEK_SET`/`SEEK_CUR`/`SEEK_END` value.
    ///
    /// # Errors
    /// Implementation-defined.
    fn seek(&self, fd: FileHandle, offset: i64, whence: i32) -> Result<usize, RomFsError>;

    /// # Errors
    /// Implementation-defined.
    fn close(&self, fd: FileHandle) -> Result<(), RomFsError>;
}

/// Operations on an open directory traversal.
pub trait DirOps {
    /// Copies the next NUL-terminated name into `buf` and returns the number
    /// of name bytes written; 0 signals the end of the directory.
    ///
    /// # Errors
    /// Implementation-defined.
    fn readdir_next(&self, dh: DirHandle, buf: &mut [u8]) -> Result<usize, RomFsError>;

    /// # Errors
    /// Implementation-defined.
    fn closedir(&self, dh: DirHandle) -> Result<(), RomFsError>;
}

/// Entry points a mounted filesystem registers with the VFS.
pub trait FileSystem: FileOps + DirOps + Sync {
    /// # Errors
    /// Implementation-defined.
    fn open(&self, path: &str, flags: i32, mode: i32) -> Result<FileHandle, RomFsError>;

    /// # Errors
    /// Implementation-defined.
    fn opendir(&self, path: &str) -> Result<DirHandle, RomFsError>;
}

impl<H: PathHasher + Sync> FileOps for RomFs<'_, H> {
    fn read(&self, fd: FileHandle, buf: &mut [u8]) -> Result<usize, RomFsError> {
        Self::read(self, fd, buf)
    }

    fn seek(&self, fd: FileHandle, offset: i64, whence: i32) -> Result<usize, RomFsError> {
        Self::seek(self, fd, offset, Whence::try_from(whence)?)
    }

    fn close(&self, fd: FileHandle) -> Result<(), RomFsError> {
        Self::close(self, fd)
    }
}

impl<H: PathHasher + Sync> DirOps for RomFs<'_, H> {
    fn readdir_next(&self, dh: DirHandle, buf: &mut [u8]) -> Result<usize, RomFsError> {
        Ok(self.readdir(dh, buf)?.unwrap_or(0))
    }

    fn closedir(&self, dh: DirHandle) -> Result<(), RomFsError> {
        Self::closedir(self, dh)
    }
}

impl<H: PathHasher + Sync> FileSystem for RomFs<'_, H> {
    fn open(&self, path: &str, flags: i32, mode: i32) -> Result<FileHandle, RomFsError> {
        Self::open(self, path, flags, mode)
    }

    fn opendir(&self, path: &str) -> Result<DirHandle, RomFsError> {
        Self::opendir(self, path)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MountError {
    #[error("mount table is full")]
    MountTableFull,
    #[error("mount point is already in use")]
    AlreadyMounted,
    #[error("no filesystem is mounted for this path")]
    NoSuchMount,
    #[error(transparent)]
    Fs(#[from] RomFsError),
}

/// The VFS registration point.
pub trait MountRegistry<'a> {
    /// # Errors
    /// Implementation-defined; [`MountTable`] reports [`MountError`].
    fn register_fs(&mut self, mount_point: &'a str, fs: &'a dyn FileSystem) -> Result<(), MountError>;
}

/// Registers `fs` under `mount_point`; the image bound to `fs` becomes the
/// context of every call routed there.
///
/// # Errors
/// Whatever the registry reports.
pub fn register_romfs<'a, R, H>(
    registry: &mut R,
    mount_point: &'a str,
    fs: &'a RomFs<'a, H>,
) -> Result<(), MountError>
where
    R: MountRegistry<'a> + ?Sized,
    H: PathHasher + Sync + 'a,
{
    info!(
        "registering romfs at {mount_point:?} ({} bytes)",
        fs.image().as_bytes().len()
    );
    registry.register_fs(mount_point, fs)
}

/// A file opened through a [`MountTable`], bound to its filesystem.
#[derive(Clone, Copy)]
pub struct VfsFile<'a> {
    fs: &'a dyn FileSystem,
    fd: FileHandle,
}

impl VfsFile<'_> {
    #[must_use]
    pub const fn handle(&self) -> FileHandle {
        self.fd
    }

    /// # Errors
    /// See [`FileOps::read`].
    pub fn read(&self, buf: &mut [u8]) -> Result<usize, RomFsError> {
        self.fs.read(self.fd, buf)
    }

    /// # Errors
    /// See [`FileOps::seek`].
    pub fn seek(&self, offset: i64, whence: i32) -> Result<usize, RomFsError> {
        self.fs.seek(self.fd, offset, whence)
    }

    /// # Errors
    /// See [`FileOps::close`].
    pub fn close(self) -> Result<(), RomFsError> {
        self.fs.close(self.fd)
    }
}

/// A directory traversal opened through a [`MountTable`].
#[derive(Clone, Copy)]
pub struct VfsDir<'a> {
    fs: &'a dyn FileSystem,
    dh: DirHandle,
}

impl VfsDir<'_> {
    #[must_use]
    pub const fn handle(&self) -> DirHandle {
        self.dh
    }

    /// # Errors
    /// See [`DirOps::readdir_next`].
    pub fn next_name(&self, buf: &mut [u8]) -> Result<usize, RomFsError> {
        self.fs.readdir_next(self.dh, buf)
    }

    /// # Errors
    /// See [`DirOps::closedir`].
    pub fn close(self) -> Result<(), RomFsError> {
        self.fs.closedir(self.dh)
    }
}

/// Fixed-capacity mount table routing paths by longest mount-point prefix.
pub struct MountTable<'a, const N: usize> {
    mounts: [Option<(&'a str, &'a dyn FileSystem)>; N],
}

impl<const N: usize> Default for MountTable<'_, N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a, const N: usize> MountTable<'a, N> {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            mounts: [None; N],
        }
    }

    /// Finds the filesystem responsible for `path` and the path relative
    /// to its mount point.
    ///
    /// # Errors
    /// [`MountError::NoSuchMount`] if no mount point covers `path`.
    pub fn resolve<'p>(&self, path: &'p str) -> Result<(&'a dyn FileSystem, &'p str), MountError> {
        let path = normalize(path);
        self.mounts
            .iter()
            .flatten()
            .filter_map(|&(mount, fs)| strip_mount(path, mount).map(|rest| (mount.len(), fs, rest)))
            .max_by_key(|&(len, _, _)| len)
            .map(|(_, fs, rest)| (fs, rest))
            .ok_or(MountError::NoSuchMount)
    }

    /// # Errors
    /// [`MountError::NoSuchMount`] or the filesystem's error.
    pub fn open(&self, path: &str, flags: i32, mode: i32) -> Result<VfsFile<'a>, MountError> {
        let (fs, rest) = self.resolve(path)?;
        let fd = fs.open(rest, flags, mode)?;
        Ok(VfsFile { fs, fd })
    }

    /// # Errors
    /// [`MountError::NoSuchMount`] or the filesystem's error.
    pub fn opendir(&self, path: &str) -> Result<VfsDir<'a>, MountError> {
        let (fs, rest) = self.resolve(path)?;
        let dh = fs.opendir(rest)?;
        Ok(VfsDir { fs, dh })
    }
}

impl<'a, const N: usize> MountRegistry<'a> for MountTable<'a, N> {
    fn register_fs(&mut self, mount_point: &'a str, fs: &'a dyn FileSystem) -> Result<(), MountError> {
        let mount_point = normalize(mount_point);
        if self.mounts.iter().flatten().any(|&(m, _)| m == mount_point) {
            return Err(MountError::AlreadyMounted);
        }
        let slot = self
            .mounts
            .iter_mut()
            .find(|slot| slot.is_none())
            .ok_or(MountError::MountTableFull)?;
        *slot = Some((mount_point, fs));
        Ok(())
    }
}

/// Returns the remainder of `path` below `mount`, if `mount` covers it.
fn strip_mount<'p>(path: &'p str, mount: &str) -> Option<&'p str> {
    if mount.is_empty() {
        return Some(path);
    }
    let rest = path.strip_prefix(mount)?;
    if rest.is_empty() {
        Some(rest)
    } else {
        rest.strip_prefix('/')
    }
}
