//! # Composition
//!
//! The building blocks for layered filesystems.
//!
//! [`Mapped`] is the decorator every composition backend is built from: it
//! owns a delegate backend and a [`PathMap`] — two pure translations
//! between the caller's namespace and the delegate's namespace. Operations
//! translate the incoming path, invoke the delegate, and translate any
//! returned paths back; enumeration maps lazily, element-wise.
//!
//! [`WrapWatcher`] is the event-side counterpart: it subscribes to a
//! delegate watcher and republishes each event with its paths translated,
//! silently dropping events whose paths do not convert. Translated events
//! go through the normal [`WatcherCore`] policy, so the wrapper's own
//! filter still applies.
//!
//! Ownership follows the type: `Mapped<B, M>` owns its delegate, while
//! `Mapped<Arc<B>, M>` shares it with other holders.

use std::io::Read;
use std::sync::{Arc, Weak};
use std::time::SystemTime;

use crate::error::VfsError;
use crate::event::BackendId;
use crate::filter::FilterPattern;
use crate::path::UPath;
use crate::traits::{FileStream, FsRead, FsWatch, FsWrite, PathIter};
use crate::types::{FileAccess, FileAttributes, FileShare, NotifyFilters, OpenMode, SearchTarget};
use crate::watcher::{Watcher, WatcherCore};

/// A pair of pure path translations between a wrapper's namespace and its
/// delegate's namespace.
pub trait PathMap: Send + Sync + 'static {
    /// Translate a caller path into the delegate's namespace.
    ///
    /// # Errors
    ///
    /// - [`VfsError::InvalidPath`] if `path` has no delegate counterpart
    fn to_delegate(&self, path: &UPath) -> Result<UPath, VfsError>;

    /// Translate a delegate path back into the wrapper's namespace.
    ///
    /// # Errors
    ///
    /// - [`VfsError::InvariantViolation`] if the delegate produced a path
    ///   outside the namespace this wrapper exposes
    fn from_delegate(&self, path: &UPath) -> Result<UPath, VfsError>;

    /// Like [`from_delegate`](Self::from_delegate), but `None` on failure.
    ///
    /// Event forwarding uses this form: an inconvertible path means the
    /// event is not visible in the wrapper's namespace and is dropped.
    fn try_from_delegate(&self, path: &UPath) -> Option<UPath> {
        self.from_delegate(path).ok()
    }
}

/// The identity translation.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityMap;

impl PathMap for IdentityMap {
    fn to_delegate(&self, path: &UPath) -> Result<UPath, VfsError> {
        Ok(path.clone())
    }

    fn from_delegate(&self, path: &UPath) -> Result<UPath, VfsError> {
        Ok(path.clone())
    }
}

/// A path-translating wrapper over another backend.
///
/// Implements each capability trait whenever the delegate does, so a
/// `Mapped` over a read-only backend is itself read-only and a `Mapped`
/// over a watchable one is watchable. [`SubFileSystem`](crate::SubFileSystem)
/// is this type instantiated with a prefix-rerooting map.
pub struct Mapped<B, M> {
    delegate: B,
    map: Arc<M>,
    id: BackendId,
}

impl<B, M: PathMap> Mapped<B, M> {
    /// Wrap `delegate` behind the translation `map`.
    pub fn new(delegate: B, map: M) -> Self {
        Self { delegate, map: Arc::new(map), id: BackendId::new() }
    }

    /// The wrapped backend.
    pub fn delegate(&self) -> &B {
        &self.delegate
    }

    /// Unwrap, returning the delegate.
    pub fn into_delegate(self) -> B {
        self.delegate
    }

    /// The translation in use.
    pub fn path_map(&self) -> &M {
        &self.map
    }

    /// Identity token of this wrapper.
    pub fn id(&self) -> &BackendId {
        &self.id
    }
}

impl<B: FsRead, M: PathMap> FsRead for Mapped<B, M> {
    fn directory_exists_impl(&self, path: &UPath) -> Result<bool, VfsError> {
        self.delegate.directory_exists_impl(&self.map.to_delegate(path)?)
    }

    fn file_exists_impl(&self, path: &UPath) -> Result<bool, VfsError> {
        self.delegate.file_exists_impl(&self.map.to_delegate(path)?)
    }

    fn file_length_impl(&self, path: &UPath) -> Result<u64, VfsError> {
        self.delegate.file_length_impl(&self.map.to_delegate(path)?)
    }

    fn open_read_impl(&self, path: &UPath) -> Result<Box<dyn Read + Send>, VfsError> {
        self.delegate.open_read_impl(&self.map.to_delegate(path)?)
    }

    fn attributes_impl(&self, path: &UPath) -> Result<FileAttributes, VfsError> {
        self.delegate.attributes_impl(&self.map.to_delegate(path)?)
    }

    fn creation_time_impl(&self, path: &UPath) -> Result<SystemTime, VfsError> {
        self.delegate.creation_time_impl(&self.map.to_delegate(path)?)
    }

    fn last_access_time_impl(&self, path: &UPath) -> Result<SystemTime, VfsError> {
        self.delegate.last_access_time_impl(&self.map.to_delegate(path)?)
    }

    fn last_write_time_impl(&self, path: &UPath) -> Result<SystemTime, VfsError> {
        self.delegate.last_write_time_impl(&self.map.to_delegate(path)?)
    }

    fn enumerate_impl(
        &self,
        path: &UPath,
        filter: FilterPattern,
        recursive: bool,
        target: SearchTarget,
    ) -> Result<PathIter, VfsError> {
        let inner =
            self.delegate
                .enumerate_impl(&self.map.to_delegate(path)?, filter, recursive, target)?;
        let map = Arc::clone(&self.map);
        Ok(PathIter::new(
            inner.map(move |result| result.and_then(|p| map.from_delegate(&p))),
        ))
    }

    fn to_internal_path_impl(&self, path: &UPath) -> Result<String, VfsError> {
        self.delegate.to_internal_path_impl(&self.map.to_delegate(path)?)
    }

    fn from_internal_path_impl(&self, internal: &str) -> Result<UPath, VfsError> {
        let delegate_path = self.delegate.from_internal_path_impl(internal)?;
        self.map.from_delegate(&delegate_path)
    }
}

impl<B: FsWrite, M: PathMap> FsWrite for Mapped<B, M> {
    fn create_directory_impl(&self, path: &UPath) -> Result<(), VfsError> {
        self.delegate.create_directory_impl(&self.map.to_delegate(path)?)
    }

    fn move_directory_impl(&self, src: &UPath, dest: &UPath) -> Result<(), VfsError> {
        self.delegate
            .move_directory_impl(&self.map.to_delegate(src)?, &self.map.to_delegate(dest)?)
    }

    fn delete_directory_impl(&self, path: &UPath, recursive: bool) -> Result<(), VfsError> {
        self.delegate.delete_directory_impl(&self.map.to_delegate(path)?, recursive)
    }

    fn copy_file_impl(&self, src: &UPath, dest: &UPath, overwrite: bool) -> Result<(), VfsError> {
        self.delegate.copy_file_impl(
            &self.map.to_delegate(src)?,
            &self.map.to_delegate(dest)?,
            overwrite,
        )
    }

    fn replace_file_impl(
        &self,
        src: &UPath,
        dest: &UPath,
        backup: Option<&UPath>,
        ignore_metadata_errors: bool,
    ) -> Result<(), VfsError> {
        let backup = backup.map(|b| self.map.to_delegate(b)).transpose()?;
        self.delegate.replace_file_impl(
            &self.map.to_delegate(src)?,
            &self.map.to_delegate(dest)?,
            backup.as_ref(),
            ignore_metadata_errors,
        )
    }

    fn move_file_impl(&self, src: &UPath, dest: &UPath) -> Result<(), VfsError> {
        self.delegate
            .move_file_impl(&self.map.to_delegate(src)?, &self.map.to_delegate(dest)?)
    }

    fn delete_file_impl(&self, path: &UPath) -> Result<(), VfsError> {
        self.delegate.delete_file_impl(&self.map.to_delegate(path)?)
    }

    fn open_file_impl(
        &self,
        path: &UPath,
        mode: OpenMode,
        access: FileAccess,
        share: FileShare,
    ) -> Result<Box<dyn FileStream>, VfsError> {
        self.delegate.open_file_impl(&self.map.to_delegate(path)?, mode, access, share)
    }

    fn set_attributes_impl(
        &self,
        path: &UPath,
        attributes: FileAttributes,
    ) -> Result<(), VfsError> {
        self.delegate.set_attributes_impl(&self.map.to_delegate(path)?, attributes)
    }

    fn set_creation_time_impl(&self, path: &UPath, time: SystemTime) -> Result<(), VfsError> {
        self.delegate.set_creation_time_impl(&self.map.to_delegate(path)?, time)
    }

    fn set_last_access_time_impl(&self, path: &UPath, time: SystemTime) -> Result<(), VfsError> {
        self.delegate.set_last_access_time_impl(&self.map.to_delegate(path)?, time)
    }

    fn set_last_write_time_impl(&self, path: &UPath, time: SystemTime) -> Result<(), VfsError> {
        self.delegate.set_last_write_time_impl(&self.map.to_delegate(path)?, time)
    }
}

impl<B: FsWatch, M: PathMap> FsWatch for Mapped<B, M> {
    fn can_watch_impl(&self, path: &UPath) -> bool {
        match self.map.to_delegate(path) {
            Ok(delegate_path) => self.delegate.can_watch_impl(&delegate_path),
            Err(_) => false,
        }
    }

    fn watch_impl(&self, path: &UPath) -> Result<Arc<dyn Watcher>, VfsError> {
        let inner = self.delegate.watch_impl(&self.map.to_delegate(path)?)?;
        let map = Arc::clone(&self.map);
        Ok(WrapWatcher::new(inner, self.id.clone(), path.clone(), move |p| {
            map.try_from_delegate(p)
        }))
    }
}

/// Forwards a delegate watcher's events with translated paths.
///
/// Mirrors the delegate's configuration (reads and writes pass through) and
/// republishes each incoming event through its own [`WatcherCore`] after
/// converting every involved path. Events with any inconvertible path are
/// dropped.
pub struct WrapWatcher {
    core: Arc<WatcherCore>,
    inner: Arc<dyn Watcher>,
}

impl WrapWatcher {
    /// Wrap `inner`, republishing its events under `path` in the outer
    /// namespace with `convert` applied to every event path.
    pub fn new(
        inner: Arc<dyn Watcher>,
        source: BackendId,
        path: UPath,
        convert: impl Fn(&UPath) -> Option<UPath> + Send + Sync + 'static,
    ) -> Arc<Self> {
        let core = Arc::new(WatcherCore::new(source, path));
        // The forwarder holds the core weakly: once the wrapper is dropped,
        // a still-live delegate watcher stops feeding a dead core.
        let forward_to: Weak<WatcherCore> = Arc::downgrade(&core);
        inner.subscribe(Arc::new(move |event: &crate::event::WatchEvent| {
            let Some(core) = forward_to.upgrade() else {
                return;
            };
            match event.map_paths(&convert) {
                Some(translated) => core.raise(translated),
                None => tracing::trace!("event path not convertible; dropped"),
            }
        }));
        Arc::new(Self { core, inner })
    }

    /// The wrapped delegate watcher.
    pub fn inner(&self) -> &Arc<dyn Watcher> {
        &self.inner
    }
}

impl Watcher for WrapWatcher {
    fn core(&self) -> &WatcherCore {
        &self.core
    }

    fn filter(&self) -> String {
        self.inner.filter()
    }

    fn set_filter(&self, filter: &str) -> Result<(), VfsError> {
        self.inner.set_filter(filter)?;
        self.core.set_filter(filter)
    }

    fn notify_filters(&self) -> NotifyFilters {
        self.inner.notify_filters()
    }

    fn set_notify_filters(&self, notify: NotifyFilters) {
        self.inner.set_notify_filters(notify);
        self.core.set_notify_filters(notify);
    }

    fn enabled(&self) -> bool {
        self.inner.enabled()
    }

    fn set_enabled(&self, enabled: bool) {
        self.inner.set_enabled(enabled);
        self.core.set_enabled(enabled);
    }

    fn include_subdirectories(&self) -> bool {
        self.inner.include_subdirectories()
    }

    fn set_include_subdirectories(&self, recursive: bool) {
        self.inner.set_include_subdirectories(recursive);
        self.core.set_include_subdirectories(recursive);
    }

    fn buffer_size(&self) -> usize {
        self.inner.buffer_size()
    }

    fn set_buffer_size(&self, buffer_size: usize) {
        self.inner.set_buffer_size(buffer_size);
        self.core.set_buffer_size(buffer_size);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::WatchEvent;
    use crate::watcher::WatcherCore;
    use std::time::Duration;

    struct PlainWatcher {
        core: WatcherCore,
    }

    impl Watcher for PlainWatcher {
        fn core(&self) -> &WatcherCore {
            &self.core
        }
    }

    fn leaf_watcher(path: &str) -> Arc<PlainWatcher> {
        Arc::new(PlainWatcher { core: WatcherCore::new(BackendId::new(), UPath::new(path)) })
    }

    #[test]
    fn config_passes_through_to_inner() {
        let inner = leaf_watcher("/");
        let wrap = WrapWatcher::new(
            Arc::clone(&inner) as Arc<dyn Watcher>,
            BackendId::new(),
            UPath::root(),
            |p| Some(p.clone()),
        );
        wrap.set_filter("*.log").unwrap();
        wrap.set_enabled(true);
        wrap.set_include_subdirectories(true);
        assert_eq!(inner.filter(), "*.log");
        assert!(inner.enabled());
        assert!(inner.include_subdirectories());
        assert_eq!(wrap.filter(), "*.log");
    }

    #[test]
    fn events_are_translated_and_refiltered() {
        let inner = leaf_watcher("/");
        let wrap = WrapWatcher::new(
            Arc::clone(&inner) as Arc<dyn Watcher>,
            BackendId::new(),
            UPath::root(),
            |p| p.as_str().strip_prefix("/mnt").map(UPath::new),
        );
        wrap.set_enabled(true);
        wrap.set_include_subdirectories(true);
        let rx = wrap.events();

        inner.core.raise(WatchEvent::Created { path: UPath::new("/mnt/a.txt") });
        let ev = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(ev.path().unwrap().as_str(), "/a.txt");

        // A path outside the mapped namespace is dropped.
        inner.core.raise(WatchEvent::Created { path: UPath::new("/other/b.txt") });
        assert!(rx.recv_timeout(Duration::from_millis(300)).is_err());
    }

    #[test]
    fn identity_map_round_trips() {
        let map = IdentityMap;
        let p = UPath::new("/a/b");
        assert_eq!(map.to_delegate(&p).unwrap(), p);
        assert_eq!(map.from_delegate(&p).unwrap(), p);
        assert_eq!(map.try_from_delegate(&p), Some(p));
    }
}
