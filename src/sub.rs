//! # Sub-Filesystems
//!
//! [`SubFileSystem`] exposes a fixed subtree of a delegate backend as a
//! whole filesystem: a view rooted at `/a` presents the delegate's
//! `/a/b/c.txt` as `/b/c.txt`, for reads, writes and watching alike.

use std::io::Read;
use std::sync::Arc;
use std::time::SystemTime;

use crate::compose::{Mapped, PathMap};
use crate::error::VfsError;
use crate::filter::FilterPattern;
use crate::path::UPath;
use crate::traits::{
    FileStream, FsRead, FsWatch, FsWrite, PathIter, forward_fs_read, forward_fs_watch,
    forward_fs_write,
};
use crate::types::{FileAccess, FileAttributes, FileShare, OpenMode, SearchTarget};
use crate::watcher::Watcher;

/// Reroots a view's namespace under a fixed delegate prefix.
#[derive(Debug, Clone)]
pub struct SubRoot {
    root: UPath,
}

impl PathMap for SubRoot {
    fn to_delegate(&self, path: &UPath) -> Result<UPath, VfsError> {
        Ok(self.root.join(path.to_relative()))
    }

    fn from_delegate(&self, path: &UPath) -> Result<UPath, VfsError> {
        match self.try_from_delegate(path) {
            Some(view_path) => Ok(view_path),
            None => Err(VfsError::InvariantViolation {
                path: path.clone(),
                root: self.root.clone(),
            }),
        }
    }

    fn try_from_delegate(&self, path: &UPath) -> Option<UPath> {
        if path == &self.root {
            return Some(UPath::root());
        }
        if self.root.is_root() {
            return path.is_absolute().then(|| path.clone());
        }
        let rest = path.as_str().strip_prefix(self.root.as_str())?;
        if !rest.starts_with('/') {
            return None;
        }
        Some(UPath::new_unchecked(rest.to_string()))
    }
}

/// A filesystem presenting a subtree of a delegate as its root.
///
/// Construction requires the subtree root to exist as a directory on the
/// delegate. The delegate is owned when `B` is a plain backend and shared
/// when `B` is an `Arc`.
///
/// Watchers on a sub view forward the delegate's events with paths
/// rerooted; delegate events outside the subtree are never forwarded. A
/// delegate *operation* returning an out-of-root path is reported as
/// [`VfsError::InvariantViolation`] — that signals a backend bug, not
/// caller error.
///
/// ```rust
/// use unifs::{FsRead, FsWrite, MemoryFileSystem, SubFileSystem, UPath, VfsExt};
///
/// let fs = MemoryFileSystem::new();
/// fs.create_directory(&UPath::new("/a/b"))?;
/// fs.write_all_bytes(&UPath::new("/a/b/c.txt"), b"hi")?;
///
/// let sub = SubFileSystem::new(fs, "/a")?;
/// assert!(sub.file_exists(&UPath::new("/b/c.txt"))?);
/// # Ok::<(), unifs::VfsError>(())
/// ```
pub struct SubFileSystem<B> {
    inner: Mapped<B, SubRoot>,
}

impl<B: FsRead> SubFileSystem<B> {
    /// Create a view of `delegate` rooted at `root`.
    ///
    /// # Errors
    ///
    /// - [`VfsError::InvalidPath`] if `root` is not absolute
    /// - [`VfsError::NotFound`] if `root` is not an existing directory on
    ///   the delegate
    pub fn new(delegate: B, root: impl AsRef<str>) -> Result<Self, VfsError> {
        let root = UPath::new(root);
        root.assert_absolute()?;
        if !delegate.directory_exists(&root)? {
            return Err(VfsError::NotFound { path: root });
        }
        Ok(Self { inner: Mapped::new(delegate, SubRoot { root }) })
    }

    /// The subtree root inside the delegate.
    pub fn sub_path(&self) -> &UPath {
        &self.inner.path_map().root
    }

    /// The wrapped backend.
    pub fn delegate(&self) -> &B {
        self.inner.delegate()
    }

    /// Unwrap, returning the delegate.
    pub fn into_delegate(self) -> B {
        self.inner.into_delegate()
    }
}

impl<B: FsRead> FsRead for SubFileSystem<B> {
    forward_fs_read!(self, self.inner);
}

impl<B: FsWrite> FsWrite for SubFileSystem<B> {
    forward_fs_write!(self, self.inner);
}

impl<B: FsWatch> FsWatch for SubFileSystem<B> {
    forward_fs_watch!(self, self.inner);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(root: &str) -> SubRoot {
        SubRoot { root: UPath::new(root) }
    }

    #[test]
    fn to_delegate_prefixes_the_root() {
        let m = map("/a");
        assert_eq!(m.to_delegate(&UPath::new("/b/c.txt")).unwrap(), "/a/b/c.txt");
        assert_eq!(m.to_delegate(&UPath::root()).unwrap(), "/a");
    }

    #[test]
    fn from_delegate_strips_the_root() {
        let m = map("/a");
        assert_eq!(m.from_delegate(&UPath::new("/a/b.txt")).unwrap(), "/b.txt");
        assert_eq!(m.from_delegate(&UPath::new("/a")).unwrap(), "/");
    }

    #[test]
    fn from_delegate_outside_root_is_invariant_violation() {
        let m = map("/a");
        for outside in ["/b", "/ab", "/ab/c.txt"] {
            assert!(
                matches!(
                    m.from_delegate(&UPath::new(outside)),
                    Err(VfsError::InvariantViolation { .. })
                ),
                "path {outside:?}"
            );
            assert_eq!(m.try_from_delegate(&UPath::new(outside)), None);
        }
    }

    #[test]
    fn root_rooted_view_is_the_identity() {
        let m = map("/");
        assert_eq!(m.to_delegate(&UPath::new("/x/y")).unwrap(), "/x/y");
        assert_eq!(m.from_delegate(&UPath::new("/x/y")).unwrap(), "/x/y");
        assert_eq!(m.from_delegate(&UPath::root()).unwrap(), "/");
    }

    #[test]
    fn round_trip_through_the_delegate_namespace() {
        let m = map("/mnt/data");
        for view in ["/", "/x", "/x/y/z.bin"] {
            let view = UPath::new(view);
            let delegate = m.to_delegate(&view).unwrap();
            assert!(delegate.is_in_directory(&UPath::new("/mnt/data"), true));
            assert_eq!(m.from_delegate(&delegate).unwrap(), view);
        }
    }
}
