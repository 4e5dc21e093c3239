//! # Aggregation
//!
//! Fan-in for both halves of the protocol:
//!
//! - [`AggregateWatcher`] republishes the events of any number of child
//!   watchers through a single delivery policy and dispatcher, so a
//!   subscriber sees one stream regardless of how many backends feed it.
//! - [`AggregateFileSystem`] is a read-only union over an ordered set of
//!   backends. Later-added backends take precedence on conflicting paths;
//!   enumeration yields the union with first-seen deduplication; watching
//!   fans every child's events into one aggregate watcher.

use std::collections::HashSet;
use std::io::Read;
use std::sync::{Arc, Weak};
use std::time::SystemTime;

use parking_lot::Mutex;

use crate::error::VfsError;
use crate::event::BackendId;
use crate::filter::FilterPattern;
use crate::path::UPath;
use crate::traits::{FileStream, FsRead, FsWatch, FsWrite, PathIter, Vfs};
use crate::types::{
    FileAccess, FileAttributes, FileShare, NotifyFilters, OpenMode, SearchTarget,
    default_file_time,
};
use crate::watcher::{Watcher, WatcherCore};

/// Fans events from N child watchers into one stream.
///
/// Adding a child applies the aggregate's current configuration to it and
/// registers a forwarder; every event a child delivers is republished
/// through the aggregate's own policy and dispatcher. Setting any
/// configuration field propagates the new value to every child under the
/// list lock before updating the cached local value; unchanged values are
/// a no-op. Removed children are dropped, which disposes them.
pub struct AggregateWatcher {
    core: Arc<WatcherCore>,
    children: Mutex<Vec<Arc<dyn Watcher>>>,
}

impl AggregateWatcher {
    /// Create an empty aggregate on `path`, stamped with the identity of
    /// the backend that produced it.
    pub fn new(source: BackendId, path: UPath) -> Arc<Self> {
        Arc::new(Self {
            core: Arc::new(WatcherCore::new(source, path)),
            children: Mutex::new(Vec::new()),
        })
    }

    /// Add a child, configure it like the aggregate, and forward its
    /// events.
    pub fn add(&self, child: Arc<dyn Watcher>) {
        // The aggregate's filter was validated when it was set, so the
        // child cannot reject it.
        let _ = child.set_filter(&self.filter());
        child.set_notify_filters(self.notify_filters());
        child.set_include_subdirectories(self.include_subdirectories());
        child.set_buffer_size(self.buffer_size());
        child.set_enabled(self.enabled());

        let forward_to: Weak<WatcherCore> = Arc::downgrade(&self.core);
        child.subscribe(Arc::new(move |event: &crate::event::WatchEvent| {
            if let Some(core) = forward_to.upgrade() {
                core.raise(event.clone());
            }
        }));
        self.children.lock().push(child);
    }

    /// Remove (and dispose) every child that came from `source`.
    ///
    /// Returns the number of children removed.
    pub fn remove_source(&self, source: &BackendId) -> usize {
        let mut children = self.children.lock();
        let before = children.len();
        children.retain(|child| !BackendId::same(child.source(), source));
        before - children.len()
    }

    /// Remove (and dispose) all children, optionally keeping those from
    /// one backend.
    pub fn clear(&self, exclude: Option<&BackendId>) {
        self.children.lock().retain(|child| {
            exclude.is_some_and(|keep| BackendId::same(child.source(), keep))
        });
    }

    /// The current number of children.
    pub fn child_count(&self) -> usize {
        self.children.lock().len()
    }
}

impl Watcher for AggregateWatcher {
    fn core(&self) -> &WatcherCore {
        &self.core
    }

    fn set_filter(&self, filter: &str) -> Result<(), VfsError> {
        if self.core.filter() == filter {
            return Ok(());
        }
        // Validate before touching any child so a bad filter is atomic.
        FilterPattern::parse(filter)?;
        let children = self.children.lock();
        for child in children.iter() {
            child.set_filter(filter)?;
        }
        drop(children);
        self.core.set_filter(filter)
    }

    fn set_notify_filters(&self, notify: NotifyFilters) {
        if self.core.notify_filters() == notify {
            return;
        }
        let children = self.children.lock();
        for child in children.iter() {
            child.set_notify_filters(notify);
        }
        drop(children);
        self.core.set_notify_filters(notify);
    }

    fn set_enabled(&self, enabled: bool) {
        if self.core.enabled() == enabled {
            return;
        }
        let children = self.children.lock();
        for child in children.iter() {
            child.set_enabled(enabled);
        }
        drop(children);
        self.core.set_enabled(enabled);
    }

    fn set_include_subdirectories(&self, recursive: bool) {
        if self.core.include_subdirectories() == recursive {
            return;
        }
        let children = self.children.lock();
        for child in children.iter() {
            child.set_include_subdirectories(recursive);
        }
        drop(children);
        self.core.set_include_subdirectories(recursive);
    }

    fn set_buffer_size(&self, buffer_size: usize) {
        if self.core.buffer_size() == buffer_size {
            return;
        }
        let children = self.children.lock();
        for child in children.iter() {
            child.set_buffer_size(buffer_size);
        }
        drop(children);
        self.core.set_buffer_size(buffer_size);
    }
}

struct Child {
    fs: Arc<dyn Vfs>,
    // Learned from the first watcher this child produces; used to detach
    // its watchers when the child is removed.
    id: Option<BackendId>,
}

/// A read-only union over an ordered set of watchable backends.
///
/// Lookups consult children from last-added to first-added, so a backend
/// added later shadows earlier ones on conflicting paths. Mutations fail
/// with [`VfsError::AccessDenied`]. Watching returns an
/// [`AggregateWatcher`] fed by every child that can watch the path; adding
/// or removing a backend updates all outstanding aggregate watchers.
pub struct AggregateFileSystem {
    id: BackendId,
    children: Mutex<Vec<Child>>,
    watchers: Mutex<Vec<Weak<AggregateWatcher>>>,
}

impl AggregateFileSystem {
    /// Create an empty aggregate.
    pub fn new() -> Self {
        Self {
            id: BackendId::new(),
            children: Mutex::new(Vec::new()),
            watchers: Mutex::new(Vec::new()),
        }
    }

    /// Create an aggregate over `filesystems`, in ascending priority order.
    pub fn with_filesystems(filesystems: Vec<Arc<dyn Vfs>>) -> Self {
        let aggregate = Self::new();
        for fs in filesystems {
            aggregate.add_filesystem(fs);
        }
        aggregate
    }

    /// Add a backend with the highest priority.
    ///
    /// Outstanding aggregate watchers gain a child watcher on the new
    /// backend when it can watch their path.
    pub fn add_filesystem(&self, fs: Arc<dyn Vfs>) {
        let mut child = Child { fs, id: None };
        for watcher in self.live_watchers() {
            if let Ok(child_watcher) = attach(&mut child, watcher.path()) {
                watcher.add(child_watcher);
            }
        }
        self.children.lock().push(child);
    }

    /// Remove a backend by identity.
    ///
    /// Its watchers are detached (and disposed) from every outstanding
    /// aggregate watcher. Returns `false` when `fs` was not a child.
    pub fn remove_filesystem(&self, fs: &Arc<dyn Vfs>) -> bool {
        let removed = {
            let mut children = self.children.lock();
            // Compare data addresses only: vtable pointers of equal trait
            // objects are not guaranteed unique across casts.
            let position = children
                .iter()
                .position(|c| std::ptr::addr_eq(Arc::as_ptr(&c.fs), Arc::as_ptr(fs)));
            position.map(|i| children.remove(i))
        };
        let Some(removed) = removed else {
            return false;
        };
        if let Some(id) = removed.id {
            for watcher in self.live_watchers() {
                watcher.remove_source(&id);
            }
        }
        true
    }

    /// The current children, in ascending priority order.
    pub fn filesystems(&self) -> Vec<Arc<dyn Vfs>> {
        self.children.lock().iter().map(|c| Arc::clone(&c.fs)).collect()
    }

    /// Children in lookup order: highest priority first.
    fn lookup_order(&self) -> Vec<Arc<dyn Vfs>> {
        self.children.lock().iter().rev().map(|c| Arc::clone(&c.fs)).collect()
    }

    /// The first child, by priority, containing `path` as a file.
    fn find_file(&self, path: &UPath) -> Result<Option<Arc<dyn Vfs>>, VfsError> {
        for child in self.lookup_order() {
            if child.file_exists_impl(path)? {
                return Ok(Some(child));
            }
        }
        Ok(None)
    }

    /// The first child, by priority, containing `path` at all.
    fn find_entry(&self, path: &UPath) -> Result<Option<Arc<dyn Vfs>>, VfsError> {
        for child in self.lookup_order() {
            if child.file_exists_impl(path)? || child.directory_exists_impl(path)? {
                return Ok(Some(child));
            }
        }
        Ok(None)
    }

    fn live_watchers(&self) -> Vec<Arc<AggregateWatcher>> {
        let mut watchers = self.watchers.lock();
        watchers.retain(|w| w.strong_count() > 0);
        watchers.iter().filter_map(Weak::upgrade).collect()
    }
}

impl Default for AggregateFileSystem {
    fn default() -> Self {
        Self::new()
    }
}

/// Create a watcher on `child` for `path` and record the child's identity.
fn attach(child: &mut Child, path: &UPath) -> Result<Arc<dyn Watcher>, VfsError> {
    if !child.fs.can_watch_impl(path) {
        return Err(VfsError::NotFound { path: path.clone() });
    }
    let watcher = child.fs.watch_impl(path)?;
    child.id.get_or_insert_with(|| watcher.source().clone());
    Ok(watcher)
}

fn deny(path: &UPath, operation: &'static str) -> VfsError {
    VfsError::AccessDenied { path: path.clone(), operation }
}

impl FsRead for AggregateFileSystem {
    fn directory_exists_impl(&self, path: &UPath) -> Result<bool, VfsError> {
        for child in self.lookup_order() {
            if child.directory_exists_impl(path)? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn file_exists_impl(&self, path: &UPath) -> Result<bool, VfsError> {
        Ok(self.find_file(path)?.is_some())
    }

    fn file_length_impl(&self, path: &UPath) -> Result<u64, VfsError> {
        match self.find_file(path)? {
            Some(child) => child.file_length_impl(path),
            None => Err(VfsError::NotFound { path: path.clone() }),
        }
    }

    fn open_read_impl(&self, path: &UPath) -> Result<Box<dyn Read + Send>, VfsError> {
        match self.find_file(path)? {
            Some(child) => child.open_read_impl(path),
            None => {
                if self.directory_exists_impl(path)? {
                    Err(VfsError::IsDirectory { path: path.clone() })
                } else {
                    Err(VfsError::NotFound { path: path.clone() })
                }
            }
        }
    }

    fn attributes_impl(&self, path: &UPath) -> Result<FileAttributes, VfsError> {
        match self.find_entry(path)? {
            Some(child) => {
                // The union itself is immutable, whatever the child says.
                Ok(child.attributes_impl(path)? | FileAttributes::READ_ONLY)
            }
            None => Err(VfsError::NotFound { path: path.clone() }),
        }
    }

    fn creation_time_impl(&self, path: &UPath) -> Result<SystemTime, VfsError> {
        match self.find_entry(path)? {
            Some(child) => child.creation_time_impl(path),
            None => Ok(default_file_time()),
        }
    }

    fn last_access_time_impl(&self, path: &UPath) -> Result<SystemTime, VfsError> {
        match self.find_entry(path)? {
            Some(child) => child.last_access_time_impl(path),
            None => Ok(default_file_time()),
        }
    }

    fn last_write_time_impl(&self, path: &UPath) -> Result<SystemTime, VfsError> {
        match self.find_entry(path)? {
            Some(child) => child.last_write_time_impl(path),
            None => Ok(default_file_time()),
        }
    }

    fn enumerate_impl(
        &self,
        path: &UPath,
        filter: FilterPattern,
        recursive: bool,
        target: SearchTarget,
    ) -> Result<PathIter, VfsError> {
        let mut iterators = Vec::new();
        for child in self.lookup_order() {
            if child.directory_exists_impl(path)? {
                iterators.push(child.enumerate_impl(path, filter.clone(), recursive, target)?);
            }
        }
        if iterators.is_empty() {
            return Err(VfsError::NotFound { path: path.clone() });
        }
        let mut seen: HashSet<UPath> = HashSet::new();
        Ok(PathIter::new(iterators.into_iter().flatten().filter(
            move |result| match result {
                Ok(path) => seen.insert(path.clone()),
                Err(_) => true,
            },
        )))
    }

    fn to_internal_path_impl(&self, path: &UPath) -> Result<String, VfsError> {
        match self.find_entry(path)? {
            Some(child) => child.to_internal_path_impl(path),
            None => Err(VfsError::NotFound { path: path.clone() }),
        }
    }

    fn from_internal_path_impl(&self, internal: &str) -> Result<UPath, VfsError> {
        for child in self.lookup_order() {
            if let Ok(path) = child.from_internal_path_impl(internal) {
                return Ok(path);
            }
        }
        Err(VfsError::InvalidPath {
            path: internal.to_string(),
            reason: "no aggregated backend recognizes this native path",
        })
    }
}

impl FsWrite for AggregateFileSystem {
    fn create_directory_impl(&self, path: &UPath) -> Result<(), VfsError> {
        Err(deny(path, "create_directory"))
    }

    fn move_directory_impl(&self, src: &UPath, _dest: &UPath) -> Result<(), VfsError> {
        Err(deny(src, "move_directory"))
    }

    fn delete_directory_impl(&self, path: &UPath, _recursive: bool) -> Result<(), VfsError> {
        Err(deny(path, "delete_directory"))
    }

    fn copy_file_impl(&self, _src: &UPath, dest: &UPath, _overwrite: bool) -> Result<(), VfsError> {
        Err(deny(dest, "copy_file"))
    }

    fn replace_file_impl(
        &self,
        _src: &UPath,
        dest: &UPath,
        _backup: Option<&UPath>,
        _ignore_metadata_errors: bool,
    ) -> Result<(), VfsError> {
        Err(deny(dest, "replace_file"))
    }

    fn move_file_impl(&self, src: &UPath, _dest: &UPath) -> Result<(), VfsError> {
        Err(deny(src, "move_file"))
    }

    fn delete_file_impl(&self, path: &UPath) -> Result<(), VfsError> {
        Err(deny(path, "delete_file"))
    }

    fn open_file_impl(
        &self,
        path: &UPath,
        mode: OpenMode,
        access: FileAccess,
        share: FileShare,
    ) -> Result<Box<dyn FileStream>, VfsError> {
        if access.can_write() || !matches!(mode, OpenMode::Open) {
            return Err(deny(path, "open_file"));
        }
        match self.find_file(path)? {
            Some(child) => child.open_file_impl(path, mode, access, share),
            None => Err(VfsError::NotFound { path: path.clone() }),
        }
    }

    fn set_attributes_impl(
        &self,
        path: &UPath,
        _attributes: FileAttributes,
    ) -> Result<(), VfsError> {
        Err(deny(path, "set_attributes"))
    }

    fn set_creation_time_impl(&self, path: &UPath, _time: SystemTime) -> Result<(), VfsError> {
        Err(deny(path, "set_creation_time"))
    }

    fn set_last_access_time_impl(&self, path: &UPath, _time: SystemTime) -> Result<(), VfsError> {
        Err(deny(path, "set_last_access_time"))
    }

    fn set_last_write_time_impl(&self, path: &UPath, _time: SystemTime) -> Result<(), VfsError> {
        Err(deny(path, "set_last_write_time"))
    }
}

impl FsWatch for AggregateFileSystem {
    fn can_watch_impl(&self, path: &UPath) -> bool {
        self.children.lock().iter().any(|c| c.fs.can_watch_impl(path))
    }

    fn watch_impl(&self, path: &UPath) -> Result<Arc<dyn Watcher>, VfsError> {
        let aggregate = AggregateWatcher::new(self.id.clone(), path.clone());
        {
            let mut children = self.children.lock();
            for child in children.iter_mut() {
                if let Ok(watcher) = attach(child, path) {
                    aggregate.add(watcher);
                }
            }
        }
        self.watchers.lock().push(Arc::downgrade(&aggregate));
        Ok(aggregate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::WatchEvent;
    use std::time::Duration;

    struct PlainWatcher {
        core: WatcherCore,
    }

    impl Watcher for PlainWatcher {
        fn core(&self) -> &WatcherCore {
            &self.core
        }
    }

    fn leaf(source: &BackendId) -> Arc<PlainWatcher> {
        Arc::new(PlainWatcher { core: WatcherCore::new(source.clone(), UPath::root()) })
    }

    #[test]
    fn add_applies_aggregate_config() {
        let aggregate = AggregateWatcher::new(BackendId::new(), UPath::root());
        aggregate.set_filter("*.log").unwrap();
        aggregate.set_enabled(true);
        aggregate.set_include_subdirectories(true);

        let child = leaf(&BackendId::new());
        aggregate.add(Arc::clone(&child) as Arc<dyn Watcher>);
        assert_eq!(child.filter(), "*.log");
        assert!(child.enabled());
        assert!(child.include_subdirectories());
    }

    #[test]
    fn config_propagates_to_existing_children() {
        let aggregate = AggregateWatcher::new(BackendId::new(), UPath::root());
        let child = leaf(&BackendId::new());
        aggregate.add(Arc::clone(&child) as Arc<dyn Watcher>);

        aggregate.set_enabled(true);
        aggregate.set_filter("*.rs").unwrap();
        assert!(child.enabled());
        assert_eq!(child.filter(), "*.rs");
    }

    #[test]
    fn events_from_all_children_fan_in() {
        let aggregate = AggregateWatcher::new(BackendId::new(), UPath::root());
        let a = leaf(&BackendId::new());
        let b = leaf(&BackendId::new());
        aggregate.add(Arc::clone(&a) as Arc<dyn Watcher>);
        aggregate.add(Arc::clone(&b) as Arc<dyn Watcher>);
        aggregate.set_enabled(true);
        let rx = aggregate.events();

        a.core.raise(WatchEvent::Created { path: UPath::new("/x") });
        b.core.raise(WatchEvent::Created { path: UPath::new("/y") });

        let mut names: Vec<String> = (0..2)
            .map(|_| {
                rx.recv_timeout(Duration::from_secs(5))
                    .expect("both events should arrive")
                    .path()
                    .unwrap()
                    .to_string()
            })
            .collect();
        names.sort();
        assert_eq!(names, ["/x", "/y"]);
    }

    #[test]
    fn remove_source_detaches_only_that_backend() {
        let aggregate = AggregateWatcher::new(BackendId::new(), UPath::root());
        let id_a = BackendId::new();
        let id_b = BackendId::new();
        let a = leaf(&id_a);
        let b = leaf(&id_b);
        aggregate.add(Arc::clone(&a) as Arc<dyn Watcher>);
        aggregate.add(Arc::clone(&b) as Arc<dyn Watcher>);
        aggregate.set_enabled(true);

        assert_eq!(aggregate.remove_source(&id_a), 1);
        assert_eq!(aggregate.child_count(), 1);

        let rx = aggregate.events();
        a.core.raise(WatchEvent::Created { path: UPath::new("/from-a") });
        b.core.raise(WatchEvent::Created { path: UPath::new("/from-b") });
        let ev = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(ev.path().unwrap().as_str(), "/from-b");
        assert!(rx.recv_timeout(Duration::from_millis(300)).is_err());
    }

    #[test]
    fn clear_can_exclude_one_backend() {
        let aggregate = AggregateWatcher::new(BackendId::new(), UPath::root());
        let keep = BackendId::new();
        aggregate.add(leaf(&keep) as Arc<dyn Watcher>);
        aggregate.add(leaf(&BackendId::new()) as Arc<dyn Watcher>);
        aggregate.add(leaf(&BackendId::new()) as Arc<dyn Watcher>);

        aggregate.clear(Some(&keep));
        assert_eq!(aggregate.child_count(), 1);

        aggregate.clear(None);
        assert_eq!(aggregate.child_count(), 0);
    }
}
