//! # Change Events
//!
//! The records a [`Watcher`](crate::Watcher) delivers. Events are cheap to
//! clone so they can fan out through wrapping and aggregating watchers; the
//! error payload is reference-counted for the same reason.

use std::sync::Arc;

use crate::error::VfsError;
use crate::path::UPath;

/// The kind of change an event reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ChangeKind {
    /// A file or directory was created.
    Created,
    /// A file or directory was deleted.
    Deleted,
    /// Contents or metadata changed.
    Changed,
    /// A file or directory was renamed.
    Renamed,
}

/// A single change notification.
///
/// `Renamed` carries both the new and the old full path. `Error` reports a
/// failure on the event stream itself (for example a panicking subscriber
/// or an overflowing native watch buffer); its path may be absent.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub enum WatchEvent {
    /// A file or directory was created.
    Created {
        /// Full path of the new entry.
        path: UPath,
    },
    /// A file or directory was deleted.
    Deleted {
        /// Full path of the removed entry.
        path: UPath,
    },
    /// Contents or metadata of an entry changed.
    Changed {
        /// Full path of the changed entry.
        path: UPath,
    },
    /// An entry was renamed.
    Renamed {
        /// Full path after the rename.
        path: UPath,
        /// Full path before the rename.
        old_path: UPath,
    },
    /// A failure on the event stream.
    Error {
        /// What went wrong.
        error: Arc<VfsError>,
        /// The path involved, when known.
        path: Option<UPath>,
    },
}

impl WatchEvent {
    /// The change kind, or `None` for error events.
    pub fn kind(&self) -> Option<ChangeKind> {
        match self {
            WatchEvent::Created { .. } => Some(ChangeKind::Created),
            WatchEvent::Deleted { .. } => Some(ChangeKind::Deleted),
            WatchEvent::Changed { .. } => Some(ChangeKind::Changed),
            WatchEvent::Renamed { .. } => Some(ChangeKind::Renamed),
            WatchEvent::Error { .. } => None,
        }
    }

    /// The full path the event refers to, when present.
    ///
    /// For renames this is the new path.
    pub fn path(&self) -> Option<&UPath> {
        match self {
            WatchEvent::Created { path }
            | WatchEvent::Deleted { path }
            | WatchEvent::Changed { path }
            | WatchEvent::Renamed { path, .. } => Some(path),
            WatchEvent::Error { path, .. } => path.as_ref(),
        }
    }

    /// The final name segment of the event path, when present.
    pub fn name(&self) -> Option<&str> {
        self.path().map(UPath::name)
    }

    /// Returns `true` for [`WatchEvent::Error`].
    pub fn is_error(&self) -> bool {
        matches!(self, WatchEvent::Error { .. })
    }

    /// Rebuild this event with every path run through `convert`.
    ///
    /// Returns `None` when any required path fails to convert, which tells
    /// a forwarding watcher to drop the event. Error events without a path
    /// pass through unchanged.
    pub fn map_paths(&self, mut convert: impl FnMut(&UPath) -> Option<UPath>) -> Option<WatchEvent> {
        match self {
            WatchEvent::Created { path } => Some(WatchEvent::Created { path: convert(path)? }),
            WatchEvent::Deleted { path } => Some(WatchEvent::Deleted { path: convert(path)? }),
            WatchEvent::Changed { path } => Some(WatchEvent::Changed { path: convert(path)? }),
            WatchEvent::Renamed { path, old_path } => Some(WatchEvent::Renamed {
                path: convert(path)?,
                old_path: convert(old_path)?,
            }),
            WatchEvent::Error { error, path } => {
                let path = match path {
                    Some(p) => Some(convert(p)?),
                    None => None,
                };
                Some(WatchEvent::Error { error: Arc::clone(error), path })
            }
        }
    }
}

/// Pointer-identity token of a backend.
///
/// Backends mint one at construction and stamp it onto every watcher they
/// create, so an [`AggregateWatcher`](crate::AggregateWatcher) can remove
/// exactly the children that came from a given backend. Clones share the
/// same identity.
#[derive(Debug, Clone)]
pub struct BackendId(Arc<()>);

impl BackendId {
    /// Mint a fresh identity.
    pub fn new() -> Self {
        Self(Arc::new(()))
    }

    /// Whether two tokens denote the same backend.
    pub fn same(a: &BackendId, b: &BackendId) -> bool {
        Arc::ptr_eq(&a.0, &b.0)
    }
}

impl Default for BackendId {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for BackendId {
    fn eq(&self, other: &Self) -> bool {
        BackendId::same(self, other)
    }
}

impl Eq for BackendId {}
