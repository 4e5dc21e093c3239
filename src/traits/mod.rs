//! # Filesystem Traits
//!
//! The capability contracts every backend honors.
//!
//! | Trait | Contract |
//! |-------|----------|
//! | [`FsRead`] | Read-only protocol: existence, lengths, streams, attributes, times, enumeration, native path conversion |
//! | [`FsWrite`] | Read/write protocol: directories, copy/move/replace/delete, open with mode/access/share, metadata setters |
//! | [`FsWatch`] | Change notification: `can_watch` / `watch` |
//! | [`Vfs`] | Composite of all three, implemented automatically |
//!
//! Each trait pairs public validated entry points (provided methods) with a
//! required `*_impl` backend surface; backends implement only the `*_impl`
//! methods and inherit validation. The composite [`Vfs`] has a blanket
//! implementation, so implementing the three component traits is all a
//! backend ever does:
//!
//! ```rust
//! use unifs::{MemoryFileSystem, Vfs};
//!
//! fn takes_any_backend(_fs: &dyn Vfs) {}
//! takes_any_backend(&MemoryFileSystem::new());
//! ```
//!
//! `Arc<B>` and `Box<B>` forward the whole backend surface, so shared and
//! owned delegates compose interchangeably (a wrapper over `Arc<B>` borrows
//! its delegate; a wrapper over `B` owns it).

mod fs_read;
mod fs_watch;
mod fs_write;

pub use fs_read::{FsRead, PathIter};
pub use fs_watch::FsWatch;
pub use fs_write::{FileStream, FsWrite};

use std::io::Read;
use std::sync::Arc;
use std::time::SystemTime;

use crate::error::VfsError;
use crate::filter::FilterPattern;
use crate::path::UPath;
use crate::types::{FileAccess, FileAttributes, FileShare, OpenMode, SearchTarget};
use crate::watcher::Watcher;

/// A full virtual filesystem: readable, writable and watchable.
///
/// Automatically implemented for any type implementing the three component
/// traits. Use it as a bound (`B: Vfs`) or a trait object
/// (`Arc<dyn Vfs>`) when a consumer needs the whole protocol.
pub trait Vfs: FsWrite + FsWatch {}

impl<T: FsWrite + FsWatch + ?Sized> Vfs for T {}

macro_rules! forward_fs_read {
    ($self:ident, $($inner:tt)+) => {
        fn directory_exists_impl(&$self, path: &UPath) -> Result<bool, VfsError> {
            $($inner)+.directory_exists_impl(path)
        }

        fn file_exists_impl(&$self, path: &UPath) -> Result<bool, VfsError> {
            $($inner)+.file_exists_impl(path)
        }

        fn file_length_impl(&$self, path: &UPath) -> Result<u64, VfsError> {
            $($inner)+.file_length_impl(path)
        }

        fn open_read_impl(&$self, path: &UPath) -> Result<Box<dyn Read + Send>, VfsError> {
            $($inner)+.open_read_impl(path)
        }

        fn attributes_impl(&$self, path: &UPath) -> Result<FileAttributes, VfsError> {
            $($inner)+.attributes_impl(path)
        }

        fn creation_time_impl(&$self, path: &UPath) -> Result<SystemTime, VfsError> {
            $($inner)+.creation_time_impl(path)
        }

        fn last_access_time_impl(&$self, path: &UPath) -> Result<SystemTime, VfsError> {
            $($inner)+.last_access_time_impl(path)
        }

        fn last_write_time_impl(&$self, path: &UPath) -> Result<SystemTime, VfsError> {
            $($inner)+.last_write_time_impl(path)
        }

        fn enumerate_impl(
            &$self,
            path: &UPath,
            filter: FilterPattern,
            recursive: bool,
            target: SearchTarget,
        ) -> Result<PathIter, VfsError> {
            $($inner)+.enumerate_impl(path, filter, recursive, target)
        }

        fn to_internal_path_impl(&$self, path: &UPath) -> Result<String, VfsError> {
            $($inner)+.to_internal_path_impl(path)
        }

        fn from_internal_path_impl(&$self, internal: &str) -> Result<UPath, VfsError> {
            $($inner)+.from_internal_path_impl(internal)
        }
    };
}

macro_rules! forward_fs_write {
    ($self:ident, $($inner:tt)+) => {
        fn create_directory_impl(&$self, path: &UPath) -> Result<(), VfsError> {
            $($inner)+.create_directory_impl(path)
        }

        fn move_directory_impl(&$self, src: &UPath, dest: &UPath) -> Result<(), VfsError> {
            $($inner)+.move_directory_impl(src, dest)
        }

        fn delete_directory_impl(&$self, path: &UPath, recursive: bool) -> Result<(), VfsError> {
            $($inner)+.delete_directory_impl(path, recursive)
        }

        fn copy_file_impl(
            &$self,
            src: &UPath,
            dest: &UPath,
            overwrite: bool,
        ) -> Result<(), VfsError> {
            $($inner)+.copy_file_impl(src, dest, overwrite)
        }

        fn replace_file_impl(
            &$self,
            src: &UPath,
            dest: &UPath,
            backup: Option<&UPath>,
            ignore_metadata_errors: bool,
        ) -> Result<(), VfsError> {
            $($inner)+.replace_file_impl(src, dest, backup, ignore_metadata_errors)
        }

        fn move_file_impl(&$self, src: &UPath, dest: &UPath) -> Result<(), VfsError> {
            $($inner)+.move_file_impl(src, dest)
        }

        fn delete_file_impl(&$self, path: &UPath) -> Result<(), VfsError> {
            $($inner)+.delete_file_impl(path)
        }

        fn open_file_impl(
            &$self,
            path: &UPath,
            mode: OpenMode,
            access: FileAccess,
            share: FileShare,
        ) -> Result<Box<dyn FileStream>, VfsError> {
            $($inner)+.open_file_impl(path, mode, access, share)
        }

        fn set_attributes_impl(
            &$self,
            path: &UPath,
            attributes: FileAttributes,
        ) -> Result<(), VfsError> {
            $($inner)+.set_attributes_impl(path, attributes)
        }

        fn set_creation_time_impl(&$self, path: &UPath, time: SystemTime) -> Result<(), VfsError> {
            $($inner)+.set_creation_time_impl(path, time)
        }

        fn set_last_access_time_impl(
            &$self,
            path: &UPath,
            time: SystemTime,
        ) -> Result<(), VfsError> {
            $($inner)+.set_last_access_time_impl(path, time)
        }

        fn set_last_write_time_impl(&$self, path: &UPath, time: SystemTime) -> Result<(), VfsError> {
            $($inner)+.set_last_write_time_impl(path, time)
        }
    };
}

macro_rules! forward_fs_watch {
    ($self:ident, $($inner:tt)+) => {
        fn can_watch_impl(&$self, path: &UPath) -> bool {
            $($inner)+.can_watch_impl(path)
        }

        fn watch_impl(&$self, path: &UPath) -> Result<Arc<dyn Watcher>, VfsError> {
            $($inner)+.watch_impl(path)
        }
    };
}

pub(crate) use {forward_fs_read, forward_fs_watch, forward_fs_write};

impl<T: FsRead + ?Sized> FsRead for Arc<T> {
    forward_fs_read!(self, (**self));
}

impl<T: FsWrite + ?Sized> FsWrite for Arc<T> {
    forward_fs_write!(self, (**self));
}

impl<T: FsWatch + ?Sized> FsWatch for Arc<T> {
    forward_fs_watch!(self, (**self));
}

impl<T: FsRead + ?Sized> FsRead for Box<T> {
    forward_fs_read!(self, (**self));
}

impl<T: FsWrite + ?Sized> FsWrite for Box<T> {
    forward_fs_write!(self, (**self));
}

impl<T: FsWatch + ?Sized> FsWatch for Box<T> {
    forward_fs_watch!(self, (**self));
}
