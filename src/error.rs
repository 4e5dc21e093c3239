//! # Error Types
//!
//! The canonical failure taxonomy for filesystem operations.
//!
//! All unifs operations return `Result<T, VfsError>`. Backends map their
//! native failures into these variants so callers can match on behavior
//! rather than on backend-specific error text:
//!
//! | Category | Variants |
//! |----------|----------|
//! | Existence | [`NotFound`](VfsError::NotFound), [`AlreadyExists`](VfsError::AlreadyExists), [`DestinationExists`](VfsError::DestinationExists) |
//! | Kind mismatch | [`IsDirectory`](VfsError::IsDirectory), [`NotADirectory`](VfsError::NotADirectory) |
//! | Structure | [`DirectoryNotEmpty`](VfsError::DirectoryNotEmpty) |
//! | Input | [`InvalidPath`](VfsError::InvalidPath), [`InvalidFilter`](VfsError::InvalidFilter) |
//! | Backend | [`AccessDenied`](VfsError::AccessDenied), [`Io`](VfsError::Io), [`Disposed`](VfsError::Disposed) |
//! | Internal | [`InvariantViolation`](VfsError::InvariantViolation) |
//!
//! ## Propagation policy
//!
//! Operation failures propagate synchronously to the caller. Failures inside
//! watcher callbacks never reach the event producer; the dispatcher captures
//! them and republishes them through the watcher's error stream (see
//! [`WatchEvent::Error`](crate::WatchEvent::Error)).
//!
//! ## Conversion from std::io::Error
//!
//! [`VfsError`] implements `From<std::io::Error>`, mapping common
//! `io::ErrorKind`s onto specific variants:
//!
//! ```rust
//! use unifs::VfsError;
//! use std::io::{Error, ErrorKind};
//!
//! let io_err = Error::new(ErrorKind::NotFound, "file not found");
//! let vfs_err: VfsError = io_err.into();
//! assert!(matches!(vfs_err, VfsError::NotFound { .. }));
//! ```

use crate::path::UPath;

/// Canonical filesystem error type.
///
/// Each variant carries the context needed to act on the failure (usually
/// the path involved). New variants may be added in future versions, so the
/// enum is `#[non_exhaustive]`; always include a wildcard arm when matching.
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum VfsError {
    /// File or directory does not exist.
    #[error("not found: {path}")]
    NotFound {
        /// The path that was not found.
        path: UPath,
    },

    /// Path already exists where a new entry was to be created.
    #[error("{operation}: already exists: {path}")]
    AlreadyExists {
        /// The path that already exists.
        path: UPath,
        /// The operation that failed.
        operation: &'static str,
    },

    /// A copy or move destination is already occupied.
    #[error("{operation}: destination exists: {path}")]
    DestinationExists {
        /// The occupied destination path.
        path: UPath,
        /// The operation that failed.
        operation: &'static str,
    },

    /// Expected a file but found a directory.
    #[error("is a directory: {path}")]
    IsDirectory {
        /// The path that is a directory.
        path: UPath,
    },

    /// Expected a directory but found something else.
    #[error("not a directory: {path}")]
    NotADirectory {
        /// The path that is not a directory.
        path: UPath,
    },

    /// Non-recursive delete of a populated directory.
    #[error("directory not empty: {path}")]
    DirectoryNotEmpty {
        /// The non-empty directory.
        path: UPath,
    },

    /// The backend refused the operation.
    #[error("{operation}: access denied: {path}")]
    AccessDenied {
        /// The path where access was denied.
        path: UPath,
        /// The operation that was denied.
        operation: &'static str,
    },

    /// A relative path was given where an absolute one is required, or the
    /// path contains forbidden characters.
    #[error("invalid path `{path}`: {reason}")]
    InvalidPath {
        /// The offending path text.
        path: String,
        /// Why the path was rejected.
        reason: &'static str,
    },

    /// A search filter contains a directory separator.
    #[error("invalid filter `{filter}`: {reason}")]
    InvalidFilter {
        /// The offending filter text.
        filter: String,
        /// Why the filter was rejected.
        reason: &'static str,
    },

    /// A delegate backend returned a path outside its declared root.
    ///
    /// This indicates a bug in a backend implementation, not caller error.
    #[error("invariant violation: delegate returned `{path}` outside `{root}`")]
    InvariantViolation {
        /// The path the delegate returned.
        path: UPath,
        /// The root the path was required to be under.
        root: UPath,
    },

    /// Operation on a disposed backend or watcher.
    #[error("{operation}: already disposed")]
    Disposed {
        /// The operation that was attempted.
        operation: &'static str,
    },

    /// Generic backend failure.
    #[error("i/o error: {0}")]
    Io(#[source] std::io::Error),
}

impl From<std::io::Error> for VfsError {
    fn from(error: std::io::Error) -> Self {
        match error.kind() {
            std::io::ErrorKind::NotFound => VfsError::NotFound { path: UPath::empty() },
            std::io::ErrorKind::PermissionDenied => VfsError::AccessDenied {
                path: UPath::empty(),
                operation: "io",
            },
            std::io::ErrorKind::AlreadyExists => VfsError::AlreadyExists {
                path: UPath::empty(),
                operation: "io",
            },
            _ => VfsError::Io(error),
        }
    }
}

impl From<VfsError> for std::io::Error {
    fn from(error: VfsError) -> Self {
        let kind = match &error {
            VfsError::NotFound { .. } => std::io::ErrorKind::NotFound,
            VfsError::AlreadyExists { .. } | VfsError::DestinationExists { .. } => {
                std::io::ErrorKind::AlreadyExists
            }
            VfsError::AccessDenied { .. } => std::io::ErrorKind::PermissionDenied,
            VfsError::InvalidPath { .. } | VfsError::InvalidFilter { .. } => {
                std::io::ErrorKind::InvalidInput
            }
            _ => std::io::ErrorKind::Other,
        };
        std::io::Error::new(kind, error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_display() {
        let err = VfsError::NotFound { path: UPath::new("/missing") };
        assert_eq!(err.to_string(), "not found: /missing");
    }

    #[test]
    fn destination_exists_display() {
        let err = VfsError::DestinationExists {
            path: UPath::new("/target"),
            operation: "move_file",
        };
        assert_eq!(err.to_string(), "move_file: destination exists: /target");
    }

    #[test]
    fn invariant_violation_display() {
        let err = VfsError::InvariantViolation {
            path: UPath::new("/outside"),
            root: UPath::new("/root"),
        };
        assert!(err.to_string().contains("/outside"));
        assert!(err.to_string().contains("/root"));
    }

    #[test]
    fn from_io_not_found() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "test");
        assert!(matches!(VfsError::from(io_err), VfsError::NotFound { .. }));
    }

    #[test]
    fn from_io_permission_denied() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "test");
        assert!(matches!(VfsError::from(io_err), VfsError::AccessDenied { .. }));
    }

    #[test]
    fn from_io_other() {
        let io_err = std::io::Error::new(std::io::ErrorKind::Other, "test");
        assert!(matches!(VfsError::from(io_err), VfsError::Io(_)));
    }

    #[test]
    fn into_io_round_trips_kind() {
        let err = VfsError::NotFound { path: UPath::new("/x") };
        let io_err: std::io::Error = err.into();
        assert_eq!(io_err.kind(), std::io::ErrorKind::NotFound);
    }
}
