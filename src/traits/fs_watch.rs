//! Change-watching capability for virtual filesystems.

use std::sync::Arc;

use crate::error::VfsError;
use crate::path::UPath;
use crate::traits::FsRead;
use crate::watcher::Watcher;

/// Change-watching capability of a virtual filesystem.
///
/// A backend that can report changes hands out [`Watcher`]s. Composition
/// backends forward watching to their delegate, translating event paths on
/// the way back out, so a composed filesystem is watchable as if it were
/// flat.
///
/// # Object Safety
///
/// This trait is object-safe and can be used as `dyn FsWatch`.
pub trait FsWatch: FsRead {
    /// Whether `path` can be watched on this backend.
    ///
    /// Relative paths are never watchable.
    fn can_watch(&self, path: &UPath) -> bool {
        path.is_absolute() && self.can_watch_impl(path)
    }

    /// Create a watcher rooted at `path`.
    ///
    /// The watcher starts disabled (see
    /// [`Watcher::set_enabled`](crate::Watcher::set_enabled)); it is
    /// released by dropping the returned handle.
    ///
    /// # Errors
    ///
    /// - [`VfsError::NotFound`] if `path` cannot be watched
    fn watch(&self, path: &UPath) -> Result<Arc<dyn Watcher>, VfsError> {
        path.assert_absolute()?;
        self.watch_impl(path)
    }

    // --- backend surface -------------------------------------------------

    /// Backend hook for [`can_watch`](Self::can_watch).
    fn can_watch_impl(&self, path: &UPath) -> bool;

    /// Backend hook for [`watch`](Self::watch).
    fn watch_impl(&self, path: &UPath) -> Result<Arc<dyn Watcher>, VfsError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fs_watch_is_object_safe() {
        fn _check(_: &dyn FsWatch) {}
    }
}
