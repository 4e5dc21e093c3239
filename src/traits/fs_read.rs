//! Read operations for virtual filesystems.

use std::io::Read;
use std::time::SystemTime;

use crate::error::VfsError;
use crate::filter::FilterPattern;
use crate::path::UPath;
use crate::types::{FileAttributes, SearchTarget};

/// Read operations for a virtual filesystem.
///
/// The trait splits into two layers:
///
/// - The **public entry points** (`directory_exists`, `open_read`, …) are
///   provided methods. They validate the caller's input — every path must
///   be absolute, every filter must compile — and then dispatch to the
///   backend surface. Callers use these.
/// - The **backend surface** (`*_impl`) is the set of required methods an
///   implementation provides. It is never invoked with a relative path or
///   an uncompiled filter, so backends skip re-validation.
///
/// # Thread Safety
///
/// All implementations must be `Send + Sync`. Methods take `&self`;
/// backends use interior mutability for their own state.
///
/// # Object Safety
///
/// This trait is object-safe and can be used as `dyn FsRead`.
pub trait FsRead: Send + Sync {
    /// Check whether `path` exists and is a directory.
    fn directory_exists(&self, path: &UPath) -> Result<bool, VfsError> {
        path.assert_absolute()?;
        self.directory_exists_impl(path)
    }

    /// Check whether `path` exists and is a file.
    fn file_exists(&self, path: &UPath) -> Result<bool, VfsError> {
        path.assert_absolute()?;
        self.file_exists_impl(path)
    }

    /// The length of the file at `path`, in bytes.
    ///
    /// # Errors
    ///
    /// - [`VfsError::NotFound`] if no file exists at `path`
    fn file_length(&self, path: &UPath) -> Result<u64, VfsError> {
        path.assert_absolute()?;
        self.file_length_impl(path)
    }

    /// Open the file at `path` for reading.
    ///
    /// The returned stream holds backend resources until dropped.
    ///
    /// # Errors
    ///
    /// - [`VfsError::NotFound`] if no file exists at `path`
    /// - [`VfsError::IsDirectory`] if `path` is a directory
    /// - [`VfsError::AccessDenied`] if the backend refuses read access
    fn open_read(&self, path: &UPath) -> Result<Box<dyn Read + Send>, VfsError> {
        path.assert_absolute()?;
        self.open_read_impl(path)
    }

    /// The attribute bitfield of the entry at `path`.
    ///
    /// # Errors
    ///
    /// - [`VfsError::NotFound`] if nothing exists at `path`
    fn attributes(&self, path: &UPath) -> Result<FileAttributes, VfsError> {
        path.assert_absolute()?;
        self.attributes_impl(path)
    }

    /// The creation time of the entry at `path`.
    ///
    /// Returns [`default_file_time`](crate::default_file_time) when the
    /// entry is missing or the backend does not record this time.
    fn creation_time(&self, path: &UPath) -> Result<SystemTime, VfsError> {
        path.assert_absolute()?;
        self.creation_time_impl(path)
    }

    /// The last-access time of the entry at `path`.
    ///
    /// Returns [`default_file_time`](crate::default_file_time) when absent.
    fn last_access_time(&self, path: &UPath) -> Result<SystemTime, VfsError> {
        path.assert_absolute()?;
        self.last_access_time_impl(path)
    }

    /// The last-write time of the entry at `path`.
    ///
    /// Returns [`default_file_time`](crate::default_file_time) when absent.
    fn last_write_time(&self, path: &UPath) -> Result<SystemTime, VfsError> {
        path.assert_absolute()?;
        self.last_write_time_impl(path)
    }

    /// Enumerate entries under the directory at `path`.
    ///
    /// `pattern` is a name glob (see [`FilterPattern`]); it is matched
    /// against each entry's final name. The returned sequence is lazy; very
    /// large trees are never materialized by the protocol itself.
    ///
    /// # Errors
    ///
    /// - [`VfsError::NotFound`] if no directory exists at `path`
    /// - [`VfsError::InvalidFilter`] if `pattern` contains a separator
    fn enumerate(
        &self,
        path: &UPath,
        pattern: &str,
        recursive: bool,
        target: SearchTarget,
    ) -> Result<PathIter, VfsError> {
        path.assert_absolute()?;
        let filter = FilterPattern::parse(pattern)?;
        self.enumerate_impl(path, filter, recursive, target)
    }

    /// Convert `path` into the backend's native representation.
    ///
    /// # Errors
    ///
    /// - [`VfsError::InvalidPath`] if `path` has no native representation
    fn to_internal_path(&self, path: &UPath) -> Result<String, VfsError> {
        path.assert_absolute()?;
        self.to_internal_path_impl(path)
    }

    /// Convert a native backend path into a [`UPath`].
    ///
    /// # Errors
    ///
    /// - [`VfsError::InvalidPath`] if `internal` does not map into this
    ///   backend's namespace
    fn from_internal_path(&self, internal: &str) -> Result<UPath, VfsError> {
        self.from_internal_path_impl(internal)
    }

    // --- backend surface -------------------------------------------------

    /// Backend hook for [`directory_exists`](Self::directory_exists).
    fn directory_exists_impl(&self, path: &UPath) -> Result<bool, VfsError>;

    /// Backend hook for [`file_exists`](Self::file_exists).
    fn file_exists_impl(&self, path: &UPath) -> Result<bool, VfsError>;

    /// Backend hook for [`file_length`](Self::file_length).
    fn file_length_impl(&self, path: &UPath) -> Result<u64, VfsError>;

    /// Backend hook for [`open_read`](Self::open_read).
    fn open_read_impl(&self, path: &UPath) -> Result<Box<dyn Read + Send>, VfsError>;

    /// Backend hook for [`attributes`](Self::attributes).
    fn attributes_impl(&self, path: &UPath) -> Result<FileAttributes, VfsError>;

    /// Backend hook for [`creation_time`](Self::creation_time).
    fn creation_time_impl(&self, path: &UPath) -> Result<SystemTime, VfsError>;

    /// Backend hook for [`last_access_time`](Self::last_access_time).
    fn last_access_time_impl(&self, path: &UPath) -> Result<SystemTime, VfsError>;

    /// Backend hook for [`last_write_time`](Self::last_write_time).
    fn last_write_time_impl(&self, path: &UPath) -> Result<SystemTime, VfsError>;

    /// Backend hook for [`enumerate`](Self::enumerate).
    fn enumerate_impl(
        &self,
        path: &UPath,
        filter: FilterPattern,
        recursive: bool,
        target: SearchTarget,
    ) -> Result<PathIter, VfsError>;

    /// Backend hook for [`to_internal_path`](Self::to_internal_path).
    fn to_internal_path_impl(&self, path: &UPath) -> Result<String, VfsError>;

    /// Backend hook for [`from_internal_path`](Self::from_internal_path).
    fn from_internal_path_impl(&self, internal: &str) -> Result<UPath, VfsError>;
}

/// Lazy sequence of absolute paths produced by
/// [`FsRead::enumerate`].
///
/// Wraps a boxed iterator so enumeration stays lazy across composition
/// wrappers; each wrapper maps paths element-wise instead of collecting.
pub struct PathIter(Box<dyn Iterator<Item = Result<UPath, VfsError>> + Send + 'static>);

impl PathIter {
    /// Create from any compatible iterator.
    pub fn new<I>(iter: I) -> Self
    where
        I: Iterator<Item = Result<UPath, VfsError>> + Send + 'static,
    {
        Self(Box::new(iter))
    }

    /// Create from a pre-collected vector.
    pub fn from_vec(paths: Vec<Result<UPath, VfsError>>) -> Self {
        Self(Box::new(paths.into_iter()))
    }

    /// Collect all paths, short-circuiting on the first error.
    pub fn collect_all(self) -> Result<Vec<UPath>, VfsError> {
        self.collect()
    }
}

impl Iterator for PathIter {
    type Item = Result<UPath, VfsError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.0.next()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fs_read_is_object_safe() {
        fn _check(_: &dyn FsRead) {}
    }

    #[test]
    fn path_iter_collect_all_success() {
        let iter = PathIter::from_vec(vec![Ok(UPath::new("/a")), Ok(UPath::new("/b"))]);
        let paths = iter.collect_all().unwrap();
        assert_eq!(paths, vec![UPath::new("/a"), UPath::new("/b")]);
    }

    #[test]
    fn path_iter_collect_all_error() {
        let iter = PathIter::from_vec(vec![
            Ok(UPath::new("/a")),
            Err(VfsError::NotFound { path: UPath::new("/b") }),
        ]);
        assert!(iter.collect_all().is_err());
    }

    #[test]
    fn path_iter_is_send() {
        fn assert_send<T: Send>() {}
        assert_send::<PathIter>();
    }
}
