//! # Entry Values
//!
//! [`FileEntry`] and [`DirectoryEntry`] are thin path-plus-backend handles:
//! a [`UPath`] paired with a shared, non-owning reference to the backend it
//! lives on. They carry no state of their own — every accessor goes back to
//! the backend — so a stale entry simply reports that its path no longer
//! exists.

use std::io::Read;
use std::sync::Arc;

use crate::error::VfsError;
use crate::ext::VfsExt;
use crate::path::UPath;
use crate::traits::{FsRead, FsWrite, PathIter, Vfs};
use crate::types::SearchTarget;

/// A handle to a file path on a backend.
#[derive(Clone)]
pub struct FileEntry {
    fs: Arc<dyn Vfs>,
    path: UPath,
}

impl FileEntry {
    /// Create a handle for `path` on `fs`.
    ///
    /// # Errors
    ///
    /// - [`VfsError::InvalidPath`] if `path` is not absolute
    pub fn new(fs: Arc<dyn Vfs>, path: impl AsRef<str>) -> Result<Self, VfsError> {
        let path = UPath::new(path);
        path.assert_absolute()?;
        Ok(Self { fs, path })
    }

    /// The entry's path.
    pub fn path(&self) -> &UPath {
        &self.path
    }

    /// The final name segment.
    pub fn name(&self) -> &str {
        self.path.name()
    }

    /// The backend the entry points into.
    pub fn filesystem(&self) -> &Arc<dyn Vfs> {
        &self.fs
    }

    /// Whether the file currently exists.
    pub fn exists(&self) -> Result<bool, VfsError> {
        self.fs.file_exists(&self.path)
    }

    /// The file's length in bytes.
    pub fn length(&self) -> Result<u64, VfsError> {
        self.fs.file_length(&self.path)
    }

    /// Open the file for reading.
    pub fn open_read(&self) -> Result<Box<dyn Read + Send>, VfsError> {
        self.fs.open_read(&self.path)
    }

    /// Read the whole file.
    pub fn read_all_bytes(&self) -> Result<Vec<u8>, VfsError> {
        self.fs.read_all_bytes(&self.path)
    }

    /// Read the whole file as UTF-8 text.
    pub fn read_all_text(&self) -> Result<String, VfsError> {
        self.fs.read_all_text(&self.path)
    }

    /// Create or truncate the file with `bytes`.
    pub fn write_all_bytes(&self, bytes: &[u8]) -> Result<(), VfsError> {
        self.fs.write_all_bytes(&self.path, bytes)
    }

    /// Delete the file.
    pub fn delete(&self) -> Result<(), VfsError> {
        self.fs.delete_file(&self.path)
    }

    /// The directory containing this file.
    pub fn parent(&self) -> Option<DirectoryEntry> {
        self.path
            .parent()
            .map(|path| DirectoryEntry { fs: Arc::clone(&self.fs), path })
    }
}

impl std::fmt::Debug for FileEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileEntry").field("path", &self.path).finish_non_exhaustive()
    }
}

/// A handle to a directory path on a backend.
#[derive(Clone)]
pub struct DirectoryEntry {
    fs: Arc<dyn Vfs>,
    path: UPath,
}

impl DirectoryEntry {
    /// Create a handle for `path` on `fs`.
    ///
    /// # Errors
    ///
    /// - [`VfsError::InvalidPath`] if `path` is not absolute
    pub fn new(fs: Arc<dyn Vfs>, path: impl AsRef<str>) -> Result<Self, VfsError> {
        let path = UPath::new(path);
        path.assert_absolute()?;
        Ok(Self { fs, path })
    }

    /// The entry's path.
    pub fn path(&self) -> &UPath {
        &self.path
    }

    /// The final name segment.
    pub fn name(&self) -> &str {
        self.path.name()
    }

    /// The backend the entry points into.
    pub fn filesystem(&self) -> &Arc<dyn Vfs> {
        &self.fs
    }

    /// Whether the directory currently exists.
    pub fn exists(&self) -> Result<bool, VfsError> {
        self.fs.directory_exists(&self.path)
    }

    /// Create the directory (and any missing parents).
    pub fn create(&self) -> Result<(), VfsError> {
        self.fs.create_directory(&self.path)
    }

    /// Delete the directory.
    pub fn delete(&self, recursive: bool) -> Result<(), VfsError> {
        self.fs.delete_directory(&self.path, recursive)
    }

    /// Enumerate entries under this directory.
    pub fn entries(
        &self,
        pattern: &str,
        recursive: bool,
        target: SearchTarget,
    ) -> Result<PathIter, VfsError> {
        self.fs.enumerate(&self.path, pattern, recursive, target)
    }
}

impl std::fmt::Debug for DirectoryEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DirectoryEntry").field("path", &self.path).finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryFileSystem;

    fn shared_fs() -> Arc<dyn Vfs> {
        Arc::new(MemoryFileSystem::new())
    }

    #[test]
    fn relative_paths_are_rejected() {
        assert!(matches!(
            FileEntry::new(shared_fs(), "relative.txt"),
            Err(VfsError::InvalidPath { .. })
        ));
        assert!(matches!(
            DirectoryEntry::new(shared_fs(), "relative"),
            Err(VfsError::InvalidPath { .. })
        ));
    }

    #[test]
    fn file_entry_round_trip() {
        let fs = shared_fs();
        let entry = FileEntry::new(Arc::clone(&fs), "/notes.txt").unwrap();
        assert!(!entry.exists().unwrap());

        entry.write_all_bytes(b"remember").unwrap();
        assert!(entry.exists().unwrap());
        assert_eq!(entry.length().unwrap(), 8);
        assert_eq!(entry.read_all_text().unwrap(), "remember");
        assert_eq!(entry.name(), "notes.txt");

        entry.delete().unwrap();
        assert!(!entry.exists().unwrap());
    }

    #[test]
    fn directory_entry_lists_children() {
        let fs = shared_fs();
        let dir = DirectoryEntry::new(Arc::clone(&fs), "/work").unwrap();
        dir.create().unwrap();
        FileEntry::new(Arc::clone(&fs), "/work/a.txt")
            .unwrap()
            .write_all_bytes(b"a")
            .unwrap();

        let children = dir.entries("*", false, SearchTarget::Both).unwrap();
        assert_eq!(children.collect_all().unwrap(), vec![UPath::new("/work/a.txt")]);
    }

    #[test]
    fn parent_walks_up() {
        let fs = shared_fs();
        let entry = FileEntry::new(fs, "/a/b/c.txt").unwrap();
        let parent = entry.parent().unwrap();
        assert_eq!(parent.path().as_str(), "/a/b");
    }
}
