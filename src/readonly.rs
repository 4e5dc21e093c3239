//! # Read-Only Views
//!
//! [`ReadOnlyFileSystem`] passes reads and watching through to a delegate
//! and refuses every mutation with [`VfsError::AccessDenied`]. Useful as
//! the outermost layer of a composition handed to untrusted consumers.

use std::io::Read;
use std::sync::Arc;
use std::time::SystemTime;

use crate::error::VfsError;
use crate::filter::FilterPattern;
use crate::path::UPath;
use crate::traits::{
    FileStream, FsRead, FsWatch, FsWrite, PathIter, forward_fs_read, forward_fs_watch,
};
use crate::types::{FileAccess, FileAttributes, FileShare, OpenMode, SearchTarget};
use crate::watcher::Watcher;

/// A wrapper that exposes its delegate read-only.
///
/// The delegate is owned when `B` is a plain backend and shared when `B`
/// is an `Arc`. The wrapper still implements the full [`Vfs`](crate::Vfs)
/// protocol so it can stand in wherever a read/write backend is expected;
/// mutators fail at runtime. [`open_file`](FsWrite::open_file) is the one
/// nuance: it succeeds for [`FileAccess::Read`] and is refused for any
/// write access.
pub struct ReadOnlyFileSystem<B> {
    inner: B,
}

impl<B> ReadOnlyFileSystem<B> {
    /// Wrap `delegate` read-only.
    pub fn new(delegate: B) -> Self {
        Self { inner: delegate }
    }

    /// The wrapped backend.
    pub fn delegate(&self) -> &B {
        &self.inner
    }

    /// Unwrap, returning the delegate.
    pub fn into_delegate(self) -> B {
        self.inner
    }
}

fn deny(path: &UPath, operation: &'static str) -> VfsError {
    VfsError::AccessDenied { path: path.clone(), operation }
}

impl<B: FsRead> FsRead for ReadOnlyFileSystem<B> {
    forward_fs_read!(self, self.inner);
}

impl<B: FsWatch> FsWatch for ReadOnlyFileSystem<B> {
    forward_fs_watch!(self, self.inner);
}

impl<B: FsWrite> FsWrite for ReadOnlyFileSystem<B> {
    fn create_directory_impl(&self, path: &UPath) -> Result<(), VfsError> {
        Err(deny(path, "create_directory"))
    }

    fn move_directory_impl(&self, src: &UPath, _dest: &UPath) -> Result<(), VfsError> {
        Err(deny(src, "move_directory"))
    }

    fn delete_directory_impl(&self, path: &UPath, _recursive: bool) -> Result<(), VfsError> {
        Err(deny(path, "delete_directory"))
    }

    fn copy_file_impl(&self, _src: &UPath, dest: &UPath, _overwrite: bool) -> Result<(), VfsError> {
        Err(deny(dest, "copy_file"))
    }

    fn replace_file_impl(
        &self,
        _src: &UPath,
        dest: &UPath,
        _backup: Option<&UPath>,
        _ignore_metadata_errors: bool,
    ) -> Result<(), VfsError> {
        Err(deny(dest, "replace_file"))
    }

    fn move_file_impl(&self, src: &UPath, _dest: &UPath) -> Result<(), VfsError> {
        Err(deny(src, "move_file"))
    }

    fn delete_file_impl(&self, path: &UPath) -> Result<(), VfsError> {
        Err(deny(path, "delete_file"))
    }

    fn open_file_impl(
        &self,
        path: &UPath,
        mode: OpenMode,
        access: FileAccess,
        share: FileShare,
    ) -> Result<Box<dyn FileStream>, VfsError> {
        if access.can_write() || !matches!(mode, OpenMode::Open) {
            return Err(deny(path, "open_file"));
        }
        self.inner.open_file_impl(path, mode, access, share)
    }

    fn set_attributes_impl(
        &self,
        path: &UPath,
        _attributes: FileAttributes,
    ) -> Result<(), VfsError> {
        Err(deny(path, "set_attributes"))
    }

    fn set_creation_time_impl(&self, path: &UPath, _time: SystemTime) -> Result<(), VfsError> {
        Err(deny(path, "set_creation_time"))
    }

    fn set_last_access_time_impl(&self, path: &UPath, _time: SystemTime) -> Result<(), VfsError> {
        Err(deny(path, "set_last_access_time"))
    }

    fn set_last_write_time_impl(&self, path: &UPath, _time: SystemTime) -> Result<(), VfsError> {
        Err(deny(path, "set_last_write_time"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ext::VfsExt;
    use crate::memory::MemoryFileSystem;

    fn backing() -> MemoryFileSystem {
        let fs = MemoryFileSystem::new();
        fs.create_directory(&UPath::new("/dir")).unwrap();
        fs.write_all_bytes(&UPath::new("/dir/f.txt"), b"data").unwrap();
        fs
    }

    #[test]
    fn reads_pass_through() {
        let ro = ReadOnlyFileSystem::new(backing());
        assert!(ro.file_exists(&UPath::new("/dir/f.txt")).unwrap());
        assert_eq!(ro.file_length(&UPath::new("/dir/f.txt")).unwrap(), 4);
    }

    #[test]
    fn mutators_are_denied() {
        let ro = ReadOnlyFileSystem::new(backing());
        let p = UPath::new("/dir/f.txt");
        assert!(matches!(ro.delete_file(&p), Err(VfsError::AccessDenied { .. })));
        assert!(matches!(
            ro.create_directory(&UPath::new("/new")),
            Err(VfsError::AccessDenied { .. })
        ));
        assert!(matches!(
            ro.move_file(&p, &UPath::new("/dir/g.txt")),
            Err(VfsError::AccessDenied { .. })
        ));
    }

    #[test]
    fn open_file_allows_plain_read_only() {
        let ro = ReadOnlyFileSystem::new(backing());
        let p = UPath::new("/dir/f.txt");
        assert!(ro.open_file(&p, OpenMode::Open, FileAccess::Read, FileShare::READ).is_ok());
        assert!(matches!(
            ro.open_file(&p, OpenMode::Open, FileAccess::ReadWrite, FileShare::NONE),
            Err(VfsError::AccessDenied { .. })
        ));
        assert!(matches!(
            ro.open_file(&p, OpenMode::OpenOrCreate, FileAccess::Read, FileShare::NONE),
            Err(VfsError::AccessDenied { .. })
        ));
    }

    #[test]
    fn shared_delegate_stays_usable() {
        let fs = Arc::new(backing());
        let ro = ReadOnlyFileSystem::new(Arc::clone(&fs));
        assert!(ro.file_exists(&UPath::new("/dir/f.txt")).unwrap());
        fs.write_all_bytes(&UPath::new("/dir/new.txt"), b"x").unwrap();
        assert!(ro.file_exists(&UPath::new("/dir/new.txt")).unwrap());
    }
}
