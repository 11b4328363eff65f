/// Errors reported by ROMFS operations.
///
/// End of directory is not an error; [`RomFs::readdir`](crate::RomFs::readdir)
/// reports it as `Ok(None)`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RomFsError {
    #[error("no record matches the requested path")]
    NotFound,
    #[error("handle pool exhausted")]
    NoHandles,
    #[error("seek before start of file")]
    InvalidOffset,
    #[error("invalid seek origin {0}")]
    InvalidWhence(i32),
    #[error("directory has more entries than the snapshot table holds ({capacity})")]
    CapacityExceeded { capacity: usize },
    #[error("corrupt image at byte offset {offset:#x}")]
    CorruptImage { offset: usize },
    #[error("not a directory or empty directory")]
    NotADirectoryOrEmpty,
    #[error("another directory traversal is still open")]
    DirectoryBusy,
    #[error("stale or unknown handle")]
    BadHandle,
    #[error("filesystem is read-only")]
    ReadOnly,
}
