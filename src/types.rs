//! # Core Types
//!
//! Value types shared by every backend.
//!
//! | Type | Purpose |
//! |------|---------|
//! | [`FileAttributes`] | Attribute bitfield (read-only, hidden, directory, …) |
//! | [`NotifyFilters`] | Which change kinds a watcher reports |
//! | [`OpenMode`] | How `open_file` treats existing/missing files |
//! | [`FileAccess`] | Requested read/write access |
//! | [`FileShare`] | Access other handles may hold concurrently |
//! | [`SearchTarget`] | Whether enumeration yields files, directories, or both |
//! | [`default_file_time`] | Sentinel timestamp for absent metadata |

use std::time::{Duration, SystemTime, UNIX_EPOCH};

bitflags::bitflags! {
    /// Attribute bitfield of a file or directory.
    ///
    /// Backends may ignore bits they cannot store, but must never fail on
    /// them. [`NORMAL`](FileAttributes::NORMAL) is only valid alone.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct FileAttributes: u32 {
        /// Writes are refused.
        const READ_ONLY = 0x0001;
        /// Hidden from normal listings.
        const HIDDEN = 0x0002;
        /// Operating system file.
        const SYSTEM = 0x0004;
        /// The entry is a directory.
        const DIRECTORY = 0x0010;
        /// Candidate for backup or removal.
        const ARCHIVE = 0x0020;
        /// Reserved for device files.
        const DEVICE = 0x0040;
        /// No other attributes set.
        const NORMAL = 0x0080;
        /// Temporary storage.
        const TEMPORARY = 0x0100;
        /// Sparse file.
        const SPARSE_FILE = 0x0200;
        /// Reparse point / symbolic link.
        const REPARSE_POINT = 0x0400;
        /// Transparently compressed.
        const COMPRESSED = 0x0800;
        /// Content not immediately available.
        const OFFLINE = 0x1000;
        /// Excluded from content indexing.
        const NOT_CONTENT_INDEXED = 0x2000;
        /// Transparently encrypted.
        const ENCRYPTED = 0x4000;
    }
}

bitflags::bitflags! {
    /// Which kinds of change a watcher reports.
    ///
    /// Stored per watcher and propagated through wrappers; leaf backends
    /// that bridge an operating-system watcher hand it down.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct NotifyFilters: u32 {
        /// File name changes (create, delete, rename).
        const FILE_NAME = 0x0001;
        /// Directory name changes.
        const DIRECTORY_NAME = 0x0002;
        /// Attribute changes.
        const ATTRIBUTES = 0x0004;
        /// Size changes.
        const SIZE = 0x0008;
        /// Last-write time changes.
        const LAST_WRITE = 0x0010;
        /// Last-access time changes.
        const LAST_ACCESS = 0x0020;
        /// Creation time changes.
        const CREATION_TIME = 0x0040;
        /// Security/permission changes.
        const SECURITY = 0x0100;
    }
}

impl Default for NotifyFilters {
    /// `LAST_WRITE | FILE_NAME | DIRECTORY_NAME`.
    fn default() -> Self {
        NotifyFilters::LAST_WRITE | NotifyFilters::FILE_NAME | NotifyFilters::DIRECTORY_NAME
    }
}

/// How [`open_file`](crate::FsWrite::open_file) treats existing and missing
/// files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum OpenMode {
    /// Create a new file; fail if it already exists.
    CreateNew,
    /// Create a new file, truncating any existing one.
    Create,
    /// Open an existing file; fail if it is missing.
    Open,
    /// Open an existing file or create an empty one.
    OpenOrCreate,
    /// Open an existing file and empty it; fail if it is missing.
    Truncate,
    /// Open or create, positioning writes at the end.
    Append,
}

/// Requested access for an open file handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum FileAccess {
    /// Read only.
    Read,
    /// Write only.
    Write,
    /// Read and write.
    ReadWrite,
}

impl FileAccess {
    /// Whether reads are permitted.
    #[inline]
    pub fn can_read(self) -> bool {
        matches!(self, FileAccess::Read | FileAccess::ReadWrite)
    }

    /// Whether writes are permitted.
    #[inline]
    pub fn can_write(self) -> bool {
        matches!(self, FileAccess::Write | FileAccess::ReadWrite)
    }
}

bitflags::bitflags! {
    /// Access other handles may hold on the same file concurrently.
    ///
    /// Single-process backends may accept and ignore these.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct FileShare: u32 {
        /// Others may read.
        const READ = 0x1;
        /// Others may write.
        const WRITE = 0x2;
        /// Others may delete.
        const DELETE = 0x4;
    }
}

impl FileShare {
    /// No concurrent access.
    pub const NONE: FileShare = FileShare::empty();
    /// Concurrent read and write.
    pub const READ_WRITE: FileShare = FileShare::READ.union(FileShare::WRITE);
}

/// What kind of entries an enumeration yields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SearchTarget {
    /// Files and directories.
    #[default]
    Both,
    /// Files only.
    File,
    /// Directories only.
    Directory,
}

impl SearchTarget {
    /// Whether directory entries are included.
    #[inline]
    pub fn wants_directories(self) -> bool {
        matches!(self, SearchTarget::Both | SearchTarget::Directory)
    }

    /// Whether file entries are included.
    #[inline]
    pub fn wants_files(self) -> bool {
        matches!(self, SearchTarget::Both | SearchTarget::File)
    }
}

/// Seconds between 1601-01-01 and the Unix epoch.
const SENTINEL_OFFSET_SECS: u64 = 11_644_473_600;

/// The sentinel timestamp returned when a backend has no value to report:
/// midnight, January 1st 1601.
///
/// Timestamp getters return this instead of failing when the path is
/// missing or the backend does not record the requested time.
pub fn default_file_time() -> SystemTime {
    UNIX_EPOCH
        .checked_sub(Duration::from_secs(SENTINEL_OFFSET_SECS))
        .unwrap_or(UNIX_EPOCH)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn notify_filters_default() {
        let d = NotifyFilters::default();
        assert!(d.contains(NotifyFilters::LAST_WRITE));
        assert!(d.contains(NotifyFilters::FILE_NAME));
        assert!(d.contains(NotifyFilters::DIRECTORY_NAME));
        assert!(!d.contains(NotifyFilters::SIZE));
    }

    #[test]
    fn file_access_capabilities() {
        assert!(FileAccess::Read.can_read());
        assert!(!FileAccess::Read.can_write());
        assert!(FileAccess::Write.can_write());
        assert!(!FileAccess::Write.can_read());
        assert!(FileAccess::ReadWrite.can_read());
        assert!(FileAccess::ReadWrite.can_write());
    }

    #[test]
    fn file_share_combinations() {
        assert!(FileShare::NONE.is_empty());
        assert!(FileShare::READ_WRITE.contains(FileShare::READ));
        assert!(FileShare::READ_WRITE.contains(FileShare::WRITE));
        assert!(!FileShare::READ_WRITE.contains(FileShare::DELETE));
    }

    #[test]
    fn search_target_selection() {
        assert!(SearchTarget::Both.wants_files());
        assert!(SearchTarget::Both.wants_directories());
        assert!(SearchTarget::File.wants_files());
        assert!(!SearchTarget::File.wants_directories());
        assert!(!SearchTarget::Directory.wants_files());
        assert!(SearchTarget::Directory.wants_directories());
    }

    #[test]
    fn default_file_time_predates_unix_epoch() {
        assert!(default_file_time() < UNIX_EPOCH);
    }

    #[test]
    fn attributes_compose() {
        let attrs = FileAttributes::READ_ONLY | FileAttributes::HIDDEN;
        assert!(attrs.contains(FileAttributes::READ_ONLY));
        assert!(!attrs.contains(FileAttributes::DIRECTORY));
    }
}
