//! Write operations for virtual filesystems.

use std::io::{Read, Seek, Write};
use std::time::SystemTime;

use crate::error::VfsError;
use crate::path::UPath;
use crate::traits::FsRead;
use crate::types::{FileAccess, FileAttributes, FileShare, OpenMode};

/// Write operations for a virtual filesystem.
///
/// Extends [`FsRead`] with mutation. The layering mirrors the read side:
/// public entry points validate (every mutator rejects relative paths with
/// [`VfsError::InvalidPath`]) and dispatch to the required `*_impl`
/// backend surface.
///
/// # Object Safety
///
/// This trait is object-safe and can be used as `dyn FsWrite`.
pub trait FsWrite: FsRead {
    /// Create the directory at `path`, and any missing parents.
    ///
    /// Idempotent: succeeds when the directory already exists.
    ///
    /// # Errors
    ///
    /// - [`VfsError::NotADirectory`] if a component exists as a file
    fn create_directory(&self, path: &UPath) -> Result<(), VfsError> {
        path.assert_absolute()?;
        self.create_directory_impl(path)
    }

    /// Move the directory at `src` to `dest`.
    ///
    /// # Errors
    ///
    /// - [`VfsError::NotFound`] if `src` does not exist
    /// - [`VfsError::NotADirectory`] if `src` is not a directory
    /// - [`VfsError::DestinationExists`] if `dest` already exists
    fn move_directory(&self, src: &UPath, dest: &UPath) -> Result<(), VfsError> {
        src.assert_absolute()?;
        dest.assert_absolute()?;
        self.move_directory_impl(src, dest)
    }

    /// Delete the directory at `path`.
    ///
    /// # Errors
    ///
    /// - [`VfsError::NotFound`] if `path` does not exist
    /// - [`VfsError::NotADirectory`] if `path` is not a directory
    /// - [`VfsError::DirectoryNotEmpty`] if `recursive` is `false` and the
    ///   directory has children
    fn delete_directory(&self, path: &UPath, recursive: bool) -> Result<(), VfsError> {
        path.assert_absolute()?;
        self.delete_directory_impl(path, recursive)
    }

    /// Copy the file at `src` to `dest`.
    ///
    /// # Errors
    ///
    /// - [`VfsError::NotFound`] if `src` does not exist
    /// - [`VfsError::DestinationExists`] if `dest` exists and `overwrite`
    ///   is `false`
    fn copy_file(&self, src: &UPath, dest: &UPath, overwrite: bool) -> Result<(), VfsError> {
        src.assert_absolute()?;
        dest.assert_absolute()?;
        self.copy_file_impl(src, dest, overwrite)
    }

    /// Replace the file at `dest` with the file at `src`.
    ///
    /// When `backup` is given, the previous `dest` is moved there instead
    /// of being discarded. Metadata of the replaced file is preserved on a
    /// best-effort basis; with `ignore_metadata_errors`, metadata failures
    /// do not fail the replace.
    ///
    /// # Errors
    ///
    /// - [`VfsError::NotFound`] if `src` or `dest` does not exist
    fn replace_file(
        &self,
        src: &UPath,
        dest: &UPath,
        backup: Option<&UPath>,
        ignore_metadata_errors: bool,
    ) -> Result<(), VfsError> {
        src.assert_absolute()?;
        dest.assert_absolute()?;
        if let Some(backup) = backup {
            backup.assert_absolute()?;
        }
        self.replace_file_impl(src, dest, backup, ignore_metadata_errors)
    }

    /// Move the file at `src` to `dest`.
    ///
    /// # Errors
    ///
    /// - [`VfsError::NotFound`] if `src` does not exist
    /// - [`VfsError::DestinationExists`] if `dest` exists as a file or a
    ///   directory
    fn move_file(&self, src: &UPath, dest: &UPath) -> Result<(), VfsError> {
        src.assert_absolute()?;
        dest.assert_absolute()?;
        self.move_file_impl(src, dest)
    }

    /// Delete the file at `path`.
    ///
    /// # Errors
    ///
    /// - [`VfsError::NotFound`] if `path` does not exist
    /// - [`VfsError::IsDirectory`] if `path` is a directory
    fn delete_file(&self, path: &UPath) -> Result<(), VfsError> {
        path.assert_absolute()?;
        self.delete_file_impl(path)
    }

    /// Open a file with explicit mode, access and sharing.
    ///
    /// `Append` positions writes at the end of an existing file;
    /// `Truncate` requires the file to exist and empties it; `CreateNew`
    /// fails when the file exists. The returned stream holds backend
    /// resources until dropped.
    ///
    /// # Errors
    ///
    /// - [`VfsError::NotFound`] for `Open`/`Truncate` on a missing file
    /// - [`VfsError::AlreadyExists`] for `CreateNew` on an existing file
    /// - [`VfsError::IsDirectory`] if `path` is a directory
    fn open_file(
        &self,
        path: &UPath,
        mode: OpenMode,
        access: FileAccess,
        share: FileShare,
    ) -> Result<Box<dyn FileStream>, VfsError> {
        path.assert_absolute()?;
        self.open_file_impl(path, mode, access, share)
    }

    /// Set the attribute bitfield of the entry at `path`.
    ///
    /// Backends may ignore bits they cannot store, but must not fail on
    /// them.
    ///
    /// # Errors
    ///
    /// - [`VfsError::NotFound`] if nothing exists at `path`
    fn set_attributes(&self, path: &UPath, attributes: FileAttributes) -> Result<(), VfsError> {
        path.assert_absolute()?;
        self.set_attributes_impl(path, attributes)
    }

    /// Set the creation time of the entry at `path`.
    ///
    /// # Errors
    ///
    /// - [`VfsError::NotFound`] if nothing exists at `path`
    fn set_creation_time(&self, path: &UPath, time: SystemTime) -> Result<(), VfsError> {
        path.assert_absolute()?;
        self.set_creation_time_impl(path, time)
    }

    /// Set the last-access time of the entry at `path`.
    ///
    /// # Errors
    ///
    /// - [`VfsError::NotFound`] if nothing exists at `path`
    fn set_last_access_time(&self, path: &UPath, time: SystemTime) -> Result<(), VfsError> {
        path.assert_absolute()?;
        self.set_last_access_time_impl(path, time)
    }

    /// Set the last-write time of the entry at `path`.
    ///
    /// # Errors
    ///
    /// - [`VfsError::NotFound`] if nothing exists at `path`
    fn set_last_write_time(&self, path: &UPath, time: SystemTime) -> Result<(), VfsError> {
        path.assert_absolute()?;
        self.set_last_write_time_impl(path, time)
    }

    // --- backend surface -------------------------------------------------

    /// Backend hook for [`create_directory`](Self::create_directory).
    fn create_directory_impl(&self, path: &UPath) -> Result<(), VfsError>;

    /// Backend hook for [`move_directory`](Self::move_directory).
    fn move_directory_impl(&self, src: &UPath, dest: &UPath) -> Result<(), VfsError>;

    /// Backend hook for [`delete_directory`](Self::delete_directory).
    fn delete_directory_impl(&self, path: &UPath, recursive: bool) -> Result<(), VfsError>;

    /// Backend hook for [`copy_file`](Self::copy_file).
    fn copy_file_impl(&self, src: &UPath, dest: &UPath, overwrite: bool) -> Result<(), VfsError>;

    /// Backend hook for [`replace_file`](Self::replace_file).
    ///
    /// The default composes the other hooks: move `dest` aside to `backup`
    /// (or delete it), then move `src` into place, then restore timestamps
    /// best-effort.
    fn replace_file_impl(
        &self,
        src: &UPath,
        dest: &UPath,
        backup: Option<&UPath>,
        ignore_metadata_errors: bool,
    ) -> Result<(), VfsError> {
        if !self.file_exists_impl(src)? {
            return Err(VfsError::NotFound { path: src.clone() });
        }
        if !self.file_exists_impl(dest)? {
            return Err(VfsError::NotFound { path: dest.clone() });
        }
        let dest_write_time = self.last_write_time_impl(dest);
        match backup {
            Some(backup) => {
                if self.file_exists_impl(backup)? {
                    self.delete_file_impl(backup)?;
                }
                self.move_file_impl(dest, backup)?;
            }
            None => self.delete_file_impl(dest)?,
        }
        self.move_file_impl(src, dest)?;
        match dest_write_time {
            Ok(time) => {
                let restored = self.set_last_write_time_impl(dest, time);
                if let Err(err) = restored {
                    if !ignore_metadata_errors {
                        return Err(err);
                    }
                    tracing::debug!(%dest, %err, "replace_file could not restore metadata");
                }
            }
            Err(err) if !ignore_metadata_errors => return Err(err),
            Err(_) => {}
        }
        Ok(())
    }

    /// Backend hook for [`move_file`](Self::move_file).
    fn move_file_impl(&self, src: &UPath, dest: &UPath) -> Result<(), VfsError>;

    /// Backend hook for [`delete_file`](Self::delete_file).
    fn delete_file_impl(&self, path: &UPath) -> Result<(), VfsError>;

    /// Backend hook for [`open_file`](Self::open_file).
    fn open_file_impl(
        &self,
        path: &UPath,
        mode: OpenMode,
        access: FileAccess,
        share: FileShare,
    ) -> Result<Box<dyn FileStream>, VfsError>;

    /// Backend hook for [`set_attributes`](Self::set_attributes).
    fn set_attributes_impl(&self, path: &UPath, attributes: FileAttributes)
    -> Result<(), VfsError>;

    /// Backend hook for [`set_creation_time`](Self::set_creation_time).
    fn set_creation_time_impl(&self, path: &UPath, time: SystemTime) -> Result<(), VfsError>;

    /// Backend hook for [`set_last_access_time`](Self::set_last_access_time).
    fn set_last_access_time_impl(&self, path: &UPath, time: SystemTime) -> Result<(), VfsError>;

    /// Backend hook for [`set_last_write_time`](Self::set_last_write_time).
    fn set_last_write_time_impl(&self, path: &UPath, time: SystemTime) -> Result<(), VfsError>;
}

/// A readable, writable, seekable open file handle.
///
/// Every stream returned by [`FsWrite::open_file`] must be dropped by the
/// caller; it holds backend resources while open.
pub trait FileStream: Read + Write + Seek + Send {}

impl<T: Read + Write + Seek + Send> FileStream for T {}
