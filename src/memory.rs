//! # In-Memory Filesystem
//!
//! [`MemoryFileSystem`] is a thread-safe leaf backend holding its whole
//! tree in memory. It implements the full protocol including watching, so
//! it backs tests, scratch storage, and composition roots without touching
//! the disk.
//!
//! Nodes live in an ordered map keyed by canonical [`UPath`]; file bodies
//! are reference-counted so open handles stay valid across renames.
//! Mutations raise change events to every live watcher after the tree lock
//! is released.

use std::collections::BTreeMap;
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::sync::{Arc, Weak};
use std::time::SystemTime;

use parking_lot::{Mutex, RwLock};

use crate::error::VfsError;
use crate::event::{BackendId, WatchEvent};
use crate::filter::FilterPattern;
use crate::path::UPath;
use crate::traits::{FileStream, FsRead, FsWatch, FsWrite, PathIter};
use crate::types::{
    FileAccess, FileAttributes, FileShare, OpenMode, SearchTarget, default_file_time,
};
use crate::watcher::{Watcher, WatcherCore};

#[derive(Debug, Clone, Copy)]
struct Times {
    created: SystemTime,
    accessed: SystemTime,
    written: SystemTime,
}

impl Times {
    fn now() -> Self {
        let now = SystemTime::now();
        Self { created: now, accessed: now, written: now }
    }
}

struct FileData {
    bytes: Vec<u8>,
    attributes: FileAttributes,
    times: Times,
}

enum Node {
    Directory { attributes: FileAttributes, times: Times },
    File { data: Arc<RwLock<FileData>> },
}

impl Node {
    fn new_directory() -> Self {
        Node::Directory { attributes: FileAttributes::DIRECTORY, times: Times::now() }
    }

    fn new_file(bytes: Vec<u8>) -> Self {
        Node::File {
            data: Arc::new(RwLock::new(FileData {
                bytes,
                attributes: FileAttributes::ARCHIVE,
                times: Times::now(),
            })),
        }
    }

    fn is_directory(&self) -> bool {
        matches!(self, Node::Directory { .. })
    }
}

/// Watcher list shared between the filesystem and its open file handles,
/// so a handle can report changes on drop without a reference to the
/// filesystem itself.
struct WatcherRegistry {
    watchers: Mutex<Vec<Weak<MemoryWatcher>>>,
}

impl WatcherRegistry {
    fn new() -> Self {
        Self { watchers: Mutex::new(Vec::new()) }
    }

    fn register(&self, watcher: &Arc<MemoryWatcher>) {
        let mut watchers = self.watchers.lock();
        watchers.retain(|w| w.strong_count() > 0);
        watchers.push(Arc::downgrade(watcher));
    }

    /// Deliver `events` to every live watcher. Callers must not hold the
    /// tree lock: raising can block on a full dispatcher queue, and the
    /// dispatcher's subscribers may call back into the filesystem.
    fn notify(&self, events: Vec<WatchEvent>) {
        if events.is_empty() {
            return;
        }
        let live: Vec<Arc<MemoryWatcher>> = {
            let mut watchers = self.watchers.lock();
            watchers.retain(|w| w.strong_count() > 0);
            watchers.iter().filter_map(Weak::upgrade).collect()
        };
        for event in events {
            for watcher in &live {
                watcher.core.raise(event.clone());
            }
        }
    }
}

/// A watcher over a [`MemoryFileSystem`] path.
struct MemoryWatcher {
    core: WatcherCore,
}

impl Watcher for MemoryWatcher {
    fn core(&self) -> &WatcherCore {
        &self.core
    }
}

/// A thread-safe in-memory filesystem.
///
/// ```rust
/// use unifs::{FsRead, FsWrite, MemoryFileSystem, UPath, VfsExt};
///
/// let fs = MemoryFileSystem::new();
/// fs.create_directory(&UPath::new("/logs"))?;
/// fs.write_all_text(&UPath::new("/logs/app.log"), "started\n")?;
/// assert_eq!(fs.read_all_text(&UPath::new("/logs/app.log"))?, "started\n");
/// # Ok::<(), unifs::VfsError>(())
/// ```
///
/// Structural mutations are serialized by an internal lock; callers need
/// no external synchronization for consistency, though interleaving of
/// concurrent mutations is unspecified. Share modes on
/// [`open_file`](FsWrite::open_file) are accepted and ignored — there is
/// no cross-process access to guard.
pub struct MemoryFileSystem {
    id: BackendId,
    nodes: RwLock<BTreeMap<UPath, Node>>,
    registry: Arc<WatcherRegistry>,
}

impl MemoryFileSystem {
    /// Create an empty filesystem containing only the root directory.
    pub fn new() -> Self {
        let mut nodes = BTreeMap::new();
        nodes.insert(UPath::root(), Node::new_directory());
        Self {
            id: BackendId::new(),
            nodes: RwLock::new(nodes),
            registry: Arc::new(WatcherRegistry::new()),
        }
    }

    /// Identity token of this backend.
    pub fn id(&self) -> &BackendId {
        &self.id
    }

    fn exists_any(nodes: &BTreeMap<UPath, Node>, path: &UPath) -> bool {
        nodes.contains_key(path)
    }

    fn is_directory(nodes: &BTreeMap<UPath, Node>, path: &UPath) -> bool {
        nodes.get(path).is_some_and(Node::is_directory)
    }

    fn file_data(
        nodes: &BTreeMap<UPath, Node>,
        path: &UPath,
    ) -> Result<Arc<RwLock<FileData>>, VfsError> {
        match nodes.get(path) {
            Some(Node::File { data }) => Ok(Arc::clone(data)),
            Some(Node::Directory { .. }) => Err(VfsError::IsDirectory { path: path.clone() }),
            None => Err(VfsError::NotFound { path: path.clone() }),
        }
    }

    fn require_parent(nodes: &BTreeMap<UPath, Node>, path: &UPath) -> Result<(), VfsError> {
        let Some(parent) = path.parent() else {
            return Err(VfsError::InvalidPath {
                path: path.to_string(),
                reason: "the root cannot be a file",
            });
        };
        if Self::is_directory(nodes, &parent) {
            Ok(())
        } else {
            Err(VfsError::NotFound { path: parent })
        }
    }

    fn descendant_keys(nodes: &BTreeMap<UPath, Node>, path: &UPath) -> Vec<UPath> {
        nodes
            .keys()
            .filter(|key| *key != path && key.is_in_directory(path, true))
            .cloned()
            .collect()
    }
}

impl Default for MemoryFileSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl FsRead for MemoryFileSystem {
    fn directory_exists_impl(&self, path: &UPath) -> Result<bool, VfsError> {
        Ok(Self::is_directory(&self.nodes.read(), path))
    }

    fn file_exists_impl(&self, path: &UPath) -> Result<bool, VfsError> {
        Ok(matches!(self.nodes.read().get(path), Some(Node::File { .. })))
    }

    fn file_length_impl(&self, path: &UPath) -> Result<u64, VfsError> {
        let data = Self::file_data(&self.nodes.read(), path)?;
        let len = data.read().bytes.len() as u64;
        Ok(len)
    }

    fn open_read_impl(&self, path: &UPath) -> Result<Box<dyn Read + Send>, VfsError> {
        let data = Self::file_data(&self.nodes.read(), path)?;
        data.write().times.accessed = SystemTime::now();
        Ok(Box::new(MemoryFile {
            path: path.clone(),
            data,
            registry: Arc::clone(&self.registry),
            position: 0,
            access: FileAccess::Read,
            append: false,
            dirty: false,
        }))
    }

    fn attributes_impl(&self, path: &UPath) -> Result<FileAttributes, VfsError> {
        match self.nodes.read().get(path) {
            Some(Node::Directory { attributes, .. }) => Ok(*attributes),
            Some(Node::File { data }) => Ok(data.read().attributes),
            None => Err(VfsError::NotFound { path: path.clone() }),
        }
    }

    fn creation_time_impl(&self, path: &UPath) -> Result<SystemTime, VfsError> {
        Ok(self.read_times(path).map_or_else(default_file_time, |t| t.created))
    }

    fn last_access_time_impl(&self, path: &UPath) -> Result<SystemTime, VfsError> {
        Ok(self.read_times(path).map_or_else(default_file_time, |t| t.accessed))
    }

    fn last_write_time_impl(&self, path: &UPath) -> Result<SystemTime, VfsError> {
        Ok(self.read_times(path).map_or_else(default_file_time, |t| t.written))
    }

    fn enumerate_impl(
        &self,
        path: &UPath,
        filter: FilterPattern,
        recursive: bool,
        target: SearchTarget,
    ) -> Result<PathIter, VfsError> {
        let nodes = self.nodes.read();
        if !Self::is_directory(&nodes, path) {
            return Err(VfsError::NotFound { path: path.clone() });
        }
        // Snapshot under the read lock; the returned iterator must not
        // keep the tree locked.
        let matches: Vec<Result<UPath, VfsError>> = nodes
            .iter()
            .filter(|(key, _)| *key != path && key.is_in_directory(path, recursive))
            .filter(|(_, node)| match node {
                Node::Directory { .. } => target.wants_directories(),
                Node::File { .. } => target.wants_files(),
            })
            .filter(|(key, _)| filter.matches(key.name()))
            .map(|(key, _)| Ok(key.clone()))
            .collect();
        Ok(PathIter::from_vec(matches))
    }

    fn to_internal_path_impl(&self, path: &UPath) -> Result<String, VfsError> {
        Ok(path.to_string())
    }

    fn from_internal_path_impl(&self, internal: &str) -> Result<UPath, VfsError> {
        let path = UPath::new(internal);
        if path.is_absolute() {
            Ok(path)
        } else {
            Err(VfsError::InvalidPath {
                path: internal.to_string(),
                reason: "native paths of a memory filesystem are absolute",
            })
        }
    }
}

impl MemoryFileSystem {
    fn read_times(&self, path: &UPath) -> Option<Times> {
        match self.nodes.read().get(path) {
            Some(Node::Directory { times, .. }) => Some(*times),
            Some(Node::File { data }) => Some(data.read().times),
            None => None,
        }
    }

    fn with_times(&self, path: &UPath, apply: impl FnOnce(&mut Times)) -> Result<(), VfsError> {
        {
            let mut nodes = self.nodes.write();
            match nodes.get_mut(path) {
                Some(Node::Directory { times, .. }) => apply(times),
                Some(Node::File { data }) => apply(&mut data.write().times),
                None => return Err(VfsError::NotFound { path: path.clone() }),
            }
        }
        self.registry.notify(vec![WatchEvent::Changed { path: path.clone() }]);
        Ok(())
    }
}

impl FsWrite for MemoryFileSystem {
    fn create_directory_impl(&self, path: &UPath) -> Result<(), VfsError> {
        let mut created = Vec::new();
        {
            let mut nodes = self.nodes.write();
            // Walk from the root down so parents come first.
            let mut ancestors: Vec<UPath> = std::iter::successors(Some(path.clone()), UPath::parent)
                .collect();
            ancestors.reverse();
            for ancestor in ancestors {
                match nodes.get(&ancestor) {
                    Some(Node::Directory { .. }) => {}
                    Some(Node::File { .. }) => {
                        return Err(VfsError::NotADirectory { path: ancestor });
                    }
                    None => {
                        nodes.insert(ancestor.clone(), Node::new_directory());
                        created.push(WatchEvent::Created { path: ancestor });
                    }
                }
            }
        }
        self.registry.notify(created);
        Ok(())
    }

    fn move_directory_impl(&self, src: &UPath, dest: &UPath) -> Result<(), VfsError> {
        {
            let mut nodes = self.nodes.write();
            match nodes.get(src) {
                Some(Node::Directory { .. }) => {}
                Some(Node::File { .. }) => {
                    return Err(VfsError::NotADirectory { path: src.clone() });
                }
                None => return Err(VfsError::NotFound { path: src.clone() }),
            }
            if src.is_root() {
                return Err(VfsError::AccessDenied {
                    path: src.clone(),
                    operation: "move_directory",
                });
            }
            if dest.is_in_directory(src, true) {
                return Err(VfsError::InvalidPath {
                    path: dest.to_string(),
                    reason: "destination lies inside the source directory",
                });
            }
            if Self::exists_any(&nodes, dest) {
                return Err(VfsError::DestinationExists {
                    path: dest.clone(),
                    operation: "move_directory",
                });
            }
            Self::require_parent(&nodes, dest)?;

            let mut moving = Self::descendant_keys(&nodes, src);
            moving.push(src.clone());
            for key in moving {
                let target = if &key == src {
                    dest.clone()
                } else {
                    UPath::new_unchecked(format!("{}{}", dest, &key.as_str()[src.as_str().len()..]))
                };
                if let Some(node) = nodes.remove(&key) {
                    nodes.insert(target, node);
                }
            }
        }
        self.registry.notify(vec![WatchEvent::Renamed {
            path: dest.clone(),
            old_path: src.clone(),
        }]);
        Ok(())
    }

    fn delete_directory_impl(&self, path: &UPath, recursive: bool) -> Result<(), VfsError> {
        let mut deleted = Vec::new();
        {
            let mut nodes = self.nodes.write();
            match nodes.get(path) {
                Some(Node::Directory { .. }) => {}
                Some(Node::File { .. }) => {
                    return Err(VfsError::NotADirectory { path: path.clone() });
                }
                None => return Err(VfsError::NotFound { path: path.clone() }),
            }
            if path.is_root() {
                return Err(VfsError::AccessDenied {
                    path: path.clone(),
                    operation: "delete_directory",
                });
            }
            let children = Self::descendant_keys(&nodes, path);
            if !children.is_empty() && !recursive {
                return Err(VfsError::DirectoryNotEmpty { path: path.clone() });
            }
            // Deepest first, directory itself last.
            for key in children.into_iter().rev() {
                nodes.remove(&key);
                deleted.push(WatchEvent::Deleted { path: key });
            }
            nodes.remove(path);
            deleted.push(WatchEvent::Deleted { path: path.clone() });
        }
        self.registry.notify(deleted);
        Ok(())
    }

    fn copy_file_impl(&self, src: &UPath, dest: &UPath, overwrite: bool) -> Result<(), VfsError> {
        let event;
        {
            let mut nodes = self.nodes.write();
            let src_data = Self::file_data(&nodes, src)?;
            match nodes.get(dest) {
                Some(Node::Directory { .. }) => {
                    return Err(VfsError::DestinationExists {
                        path: dest.clone(),
                        operation: "copy_file",
                    });
                }
                Some(Node::File { .. }) if !overwrite => {
                    return Err(VfsError::DestinationExists {
                        path: dest.clone(),
                        operation: "copy_file",
                    });
                }
                _ => {}
            }
            Self::require_parent(&nodes, dest)?;
            let replaced = nodes.contains_key(dest);
            let copied = {
                let src_data = src_data.read();
                let now = SystemTime::now();
                FileData {
                    bytes: src_data.bytes.clone(),
                    attributes: src_data.attributes,
                    times: Times { created: now, accessed: now, written: src_data.times.written },
                }
            };
            nodes.insert(dest.clone(), Node::File { data: Arc::new(RwLock::new(copied)) });
            event = if replaced {
                WatchEvent::Changed { path: dest.clone() }
            } else {
                WatchEvent::Created { path: dest.clone() }
            };
        }
        self.registry.notify(vec![event]);
        Ok(())
    }

    fn move_file_impl(&self, src: &UPath, dest: &UPath) -> Result<(), VfsError> {
        {
            let mut nodes = self.nodes.write();
            // Probe the source before the destination so a missing source
            // is reported even when the destination is also bad.
            Self::file_data(&nodes, src)?;
            if Self::exists_any(&nodes, dest) {
                return Err(VfsError::DestinationExists {
                    path: dest.clone(),
                    operation: "move_file",
                });
            }
            Self::require_parent(&nodes, dest)?;
            if let Some(node) = nodes.remove(src) {
                nodes.insert(dest.clone(), node);
            }
        }
        self.registry.notify(vec![WatchEvent::Renamed {
            path: dest.clone(),
            old_path: src.clone(),
        }]);
        Ok(())
    }

    fn delete_file_impl(&self, path: &UPath) -> Result<(), VfsError> {
        {
            let mut nodes = self.nodes.write();
            Self::file_data(&nodes, path)?;
            nodes.remove(path);
        }
        self.registry.notify(vec![WatchEvent::Deleted { path: path.clone() }]);
        Ok(())
    }

    fn open_file_impl(
        &self,
        path: &UPath,
        mode: OpenMode,
        access: FileAccess,
        _share: FileShare,
    ) -> Result<Box<dyn FileStream>, VfsError> {
        if matches!(mode, OpenMode::Append) && access.can_read() {
            return Err(VfsError::AccessDenied { path: path.clone(), operation: "open_file" });
        }
        let mut events = Vec::new();
        let (data, position, dirty) = {
            let mut nodes = self.nodes.write();
            if Self::is_directory(&nodes, path) {
                return Err(VfsError::IsDirectory { path: path.clone() });
            }
            let existing = nodes.get(path).is_some();
            let create_missing = match mode {
                OpenMode::CreateNew => {
                    if existing {
                        return Err(VfsError::AlreadyExists {
                            path: path.clone(),
                            operation: "open_file",
                        });
                    }
                    true
                }
                OpenMode::Create | OpenMode::OpenOrCreate | OpenMode::Append => !existing,
                OpenMode::Open | OpenMode::Truncate => {
                    if !existing {
                        return Err(VfsError::NotFound { path: path.clone() });
                    }
                    false
                }
            };
            if create_missing {
                Self::require_parent(&nodes, path)?;
                nodes.insert(path.clone(), Node::new_file(Vec::new()));
                events.push(WatchEvent::Created { path: path.clone() });
            }
            let data = Self::file_data(&nodes, path)?;
            let truncate = matches!(mode, OpenMode::Create | OpenMode::Truncate) && existing;
            if truncate {
                data.write().bytes.clear();
            }
            let position = if matches!(mode, OpenMode::Append) {
                data.read().bytes.len() as u64
            } else {
                0
            };
            (data, position, truncate)
        };
        self.registry.notify(events);
        Ok(Box::new(MemoryFile {
            path: path.clone(),
            data,
            registry: Arc::clone(&self.registry),
            position,
            access,
            append: matches!(mode, OpenMode::Append),
            dirty,
        }))
    }

    fn set_attributes_impl(
        &self,
        path: &UPath,
        new_attributes: FileAttributes,
    ) -> Result<(), VfsError> {
        {
            let mut nodes = self.nodes.write();
            match nodes.get_mut(path) {
                Some(Node::Directory { attributes, .. }) => {
                    *attributes = new_attributes | FileAttributes::DIRECTORY;
                }
                Some(Node::File { data }) => {
                    data.write().attributes = new_attributes & !FileAttributes::DIRECTORY;
                }
                None => return Err(VfsError::NotFound { path: path.clone() }),
            }
        }
        self.registry.notify(vec![WatchEvent::Changed { path: path.clone() }]);
        Ok(())
    }

    fn set_creation_time_impl(&self, path: &UPath, time: SystemTime) -> Result<(), VfsError> {
        self.with_times(path, |times| times.created = time)
    }

    fn set_last_access_time_impl(&self, path: &UPath, time: SystemTime) -> Result<(), VfsError> {
        self.with_times(path, |times| times.accessed = time)
    }

    fn set_last_write_time_impl(&self, path: &UPath, time: SystemTime) -> Result<(), VfsError> {
        self.with_times(path, |times| times.written = time)
    }
}

impl FsWatch for MemoryFileSystem {
    fn can_watch_impl(&self, _path: &UPath) -> bool {
        true
    }

    fn watch_impl(&self, path: &UPath) -> Result<Arc<dyn Watcher>, VfsError> {
        if !Self::exists_any(&self.nodes.read(), path) {
            return Err(VfsError::NotFound { path: path.clone() });
        }
        let watcher =
            Arc::new(MemoryWatcher { core: WatcherCore::new(self.id.clone(), path.clone()) });
        self.registry.register(&watcher);
        Ok(watcher)
    }
}

/// An open handle into a memory file.
///
/// Reads and writes go straight to the shared file body, so they are
/// visible to other handles immediately; the Changed notification for a
/// written handle is raised when the handle is dropped.
struct MemoryFile {
    path: UPath,
    data: Arc<RwLock<FileData>>,
    registry: Arc<WatcherRegistry>,
    position: u64,
    access: FileAccess,
    append: bool,
    dirty: bool,
}

impl Read for MemoryFile {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if !self.access.can_read() {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                "handle is not open for reading",
            ));
        }
        let data = self.data.read();
        let start = (self.position as usize).min(data.bytes.len());
        let n = (data.bytes.len() - start).min(buf.len());
        buf[..n].copy_from_slice(&data.bytes[start..start + n]);
        drop(data);
        self.position += n as u64;
        Ok(n)
    }
}

impl Write for MemoryFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if !self.access.can_write() {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                "handle is not open for writing",
            ));
        }
        let mut data = self.data.write();
        if self.append {
            self.position = data.bytes.len() as u64;
        }
        let start = self.position as usize;
        let end = start + buf.len();
        if data.bytes.len() < end {
            data.bytes.resize(end, 0);
        }
        data.bytes[start..end].copy_from_slice(buf);
        drop(data);
        self.position = end as u64;
        self.dirty = true;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Seek for MemoryFile {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let len = self.data.read().bytes.len() as i64;
        let target = match pos {
            SeekFrom::Start(offset) => offset as i64,
            SeekFrom::End(offset) => len + offset,
            SeekFrom::Current(offset) => self.position as i64 + offset,
        };
        if target < 0 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "seek before the start of the file",
            ));
        }
        self.position = target as u64;
        Ok(self.position)
    }
}

impl Drop for MemoryFile {
    fn drop(&mut self) {
        if self.dirty {
            self.data.write().times.written = SystemTime::now();
            self.registry.notify(vec![WatchEvent::Changed { path: self.path.clone() }]);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ext::VfsExt;
    use std::time::Duration;

    fn p(path: &str) -> UPath {
        UPath::new(path)
    }

    #[test]
    fn root_exists_from_the_start() {
        let fs = MemoryFileSystem::new();
        assert!(fs.directory_exists(&UPath::root()).unwrap());
        assert!(!fs.file_exists(&UPath::root()).unwrap());
    }

    #[test]
    fn create_directory_is_idempotent_and_creates_parents() {
        let fs = MemoryFileSystem::new();
        fs.create_directory(&p("/a/b/c")).unwrap();
        assert!(fs.directory_exists(&p("/a")).unwrap());
        assert!(fs.directory_exists(&p("/a/b")).unwrap());
        assert!(fs.directory_exists(&p("/a/b/c")).unwrap());
        fs.create_directory(&p("/a/b/c")).unwrap();
    }

    #[test]
    fn create_directory_through_a_file_fails() {
        let fs = MemoryFileSystem::new();
        fs.write_all_bytes(&p("/f"), b"x").unwrap();
        assert!(matches!(
            fs.create_directory(&p("/f/sub")),
            Err(VfsError::NotADirectory { .. })
        ));
    }

    #[test]
    fn write_then_read_round_trips() {
        let fs = MemoryFileSystem::new();
        fs.write_all_bytes(&p("/data.bin"), &[1, 2, 3]).unwrap();
        assert_eq!(fs.read_all_bytes(&p("/data.bin")).unwrap(), vec![1, 2, 3]);
        assert_eq!(fs.file_length(&p("/data.bin")).unwrap(), 3);
    }

    #[test]
    fn open_missing_file_fails() {
        let fs = MemoryFileSystem::new();
        assert!(matches!(
            fs.open_file(&p("/nope"), OpenMode::Open, FileAccess::Read, FileShare::NONE),
            Err(VfsError::NotFound { .. })
        ));
        assert!(matches!(
            fs.open_read(&p("/nope")),
            Err(VfsError::NotFound { .. })
        ));
    }

    #[test]
    fn create_new_refuses_existing() {
        let fs = MemoryFileSystem::new();
        fs.write_all_bytes(&p("/f"), b"x").unwrap();
        assert!(matches!(
            fs.open_file(&p("/f"), OpenMode::CreateNew, FileAccess::Write, FileShare::NONE),
            Err(VfsError::AlreadyExists { .. })
        ));
    }

    #[test]
    fn truncate_requires_existing_and_empties() {
        let fs = MemoryFileSystem::new();
        assert!(matches!(
            fs.open_file(&p("/f"), OpenMode::Truncate, FileAccess::Write, FileShare::NONE),
            Err(VfsError::NotFound { .. })
        ));
        fs.write_all_bytes(&p("/f"), b"content").unwrap();
        drop(fs.open_file(&p("/f"), OpenMode::Truncate, FileAccess::Write, FileShare::NONE).unwrap());
        assert_eq!(fs.file_length(&p("/f")).unwrap(), 0);
    }

    #[test]
    fn append_seeks_to_end() {
        let fs = MemoryFileSystem::new();
        fs.write_all_bytes(&p("/log"), b"one").unwrap();
        {
            let mut f = fs
                .open_file(&p("/log"), OpenMode::Append, FileAccess::Write, FileShare::NONE)
                .unwrap();
            f.write_all(b"+two").unwrap();
        }
        assert_eq!(fs.read_all_bytes(&p("/log")).unwrap(), b"one+two");
    }

    #[test]
    fn open_directory_as_file_fails() {
        let fs = MemoryFileSystem::new();
        fs.create_directory(&p("/d")).unwrap();
        assert!(matches!(
            fs.open_read(&p("/d")),
            Err(VfsError::IsDirectory { .. })
        ));
    }

    #[test]
    fn move_file_refuses_occupied_destination() {
        let fs = MemoryFileSystem::new();
        fs.write_all_bytes(&p("/a"), b"a").unwrap();
        fs.write_all_bytes(&p("/b"), b"b").unwrap();
        fs.create_directory(&p("/d")).unwrap();
        assert!(matches!(
            fs.move_file(&p("/a"), &p("/b")),
            Err(VfsError::DestinationExists { .. })
        ));
        assert!(matches!(
            fs.move_file(&p("/a"), &p("/d")),
            Err(VfsError::DestinationExists { .. })
        ));
        fs.move_file(&p("/a"), &p("/c")).unwrap();
        assert!(!fs.file_exists(&p("/a")).unwrap());
        assert!(fs.file_exists(&p("/c")).unwrap());
    }

    #[test]
    fn copy_file_overwrite_guard() {
        let fs = MemoryFileSystem::new();
        fs.write_all_bytes(&p("/x"), b"xx").unwrap();
        fs.write_all_bytes(&p("/y"), b"yy").unwrap();
        assert!(matches!(
            fs.copy_file(&p("/x"), &p("/y"), false),
            Err(VfsError::DestinationExists { .. })
        ));
        fs.copy_file(&p("/x"), &p("/y"), true).unwrap();
        assert_eq!(fs.read_all_bytes(&p("/y")).unwrap(), b"xx");
    }

    #[test]
    fn delete_directory_recursion_guard() {
        let fs = MemoryFileSystem::new();
        fs.create_directory(&p("/d")).unwrap();
        fs.write_all_bytes(&p("/d/e.txt"), b"e").unwrap();
        assert!(matches!(
            fs.delete_directory(&p("/d"), false),
            Err(VfsError::DirectoryNotEmpty { .. })
        ));
        fs.delete_directory(&p("/d"), true).unwrap();
        assert!(!fs.directory_exists(&p("/d")).unwrap());
        assert!(!fs.file_exists(&p("/d/e.txt")).unwrap());
    }

    #[test]
    fn move_directory_moves_the_subtree() {
        let fs = MemoryFileSystem::new();
        fs.create_directory(&p("/src/deep")).unwrap();
        fs.write_all_bytes(&p("/src/deep/f.txt"), b"f").unwrap();
        fs.move_directory(&p("/src"), &p("/dst")).unwrap();
        assert!(!fs.directory_exists(&p("/src")).unwrap());
        assert!(fs.file_exists(&p("/dst/deep/f.txt")).unwrap());
    }

    #[test]
    fn move_directory_into_itself_fails() {
        let fs = MemoryFileSystem::new();
        fs.create_directory(&p("/src")).unwrap();
        assert!(matches!(
            fs.move_directory(&p("/src"), &p("/src/inner")),
            Err(VfsError::InvalidPath { .. })
        ));
    }

    #[test]
    fn replace_file_swaps_contents_with_backup() {
        let fs = MemoryFileSystem::new();
        fs.write_all_bytes(&p("/new"), b"new").unwrap();
        fs.write_all_bytes(&p("/target"), b"old").unwrap();
        fs.replace_file(&p("/new"), &p("/target"), Some(&p("/backup")), true).unwrap();
        assert_eq!(fs.read_all_bytes(&p("/target")).unwrap(), b"new");
        assert_eq!(fs.read_all_bytes(&p("/backup")).unwrap(), b"old");
        assert!(!fs.file_exists(&p("/new")).unwrap());
    }

    #[test]
    fn enumerate_filters_by_pattern_target_and_depth() {
        let fs = MemoryFileSystem::new();
        fs.create_directory(&p("/d/sub")).unwrap();
        fs.write_all_bytes(&p("/d/a.txt"), b"").unwrap();
        fs.write_all_bytes(&p("/d/b.log"), b"").unwrap();
        fs.write_all_bytes(&p("/d/sub/c.txt"), b"").unwrap();

        let direct = fs.enumerate(&p("/d"), "*.txt", false, SearchTarget::File).unwrap();
        assert_eq!(direct.collect_all().unwrap(), vec![p("/d/a.txt")]);

        let deep = fs.enumerate(&p("/d"), "*.txt", true, SearchTarget::File).unwrap();
        assert_eq!(deep.collect_all().unwrap(), vec![p("/d/a.txt"), p("/d/sub/c.txt")]);

        let dirs = fs.enumerate(&p("/d"), "*", false, SearchTarget::Directory).unwrap();
        assert_eq!(dirs.collect_all().unwrap(), vec![p("/d/sub")]);

        assert!(matches!(
            fs.enumerate(&p("/missing"), "*", false, SearchTarget::Both),
            Err(VfsError::NotFound { .. })
        ));
    }

    #[test]
    fn timestamps_use_sentinel_when_absent() {
        let fs = MemoryFileSystem::new();
        assert_eq!(fs.creation_time(&p("/missing")).unwrap(), default_file_time());
        fs.write_all_bytes(&p("/f"), b"x").unwrap();
        assert!(fs.last_write_time(&p("/f")).unwrap() > default_file_time());
    }

    #[test]
    fn set_times_round_trip() {
        let fs = MemoryFileSystem::new();
        fs.write_all_bytes(&p("/f"), b"x").unwrap();
        let stamp = SystemTime::UNIX_EPOCH + Duration::from_secs(1_000_000);
        fs.set_creation_time(&p("/f"), stamp).unwrap();
        fs.set_last_access_time(&p("/f"), stamp).unwrap();
        fs.set_last_write_time(&p("/f"), stamp).unwrap();
        assert_eq!(fs.creation_time(&p("/f")).unwrap(), stamp);
        assert_eq!(fs.last_access_time(&p("/f")).unwrap(), stamp);
        assert_eq!(fs.last_write_time(&p("/f")).unwrap(), stamp);
    }

    #[test]
    fn attributes_keep_the_directory_bit() {
        let fs = MemoryFileSystem::new();
        fs.create_directory(&p("/d")).unwrap();
        fs.set_attributes(&p("/d"), FileAttributes::READ_ONLY).unwrap();
        let attrs = fs.attributes(&p("/d")).unwrap();
        assert!(attrs.contains(FileAttributes::DIRECTORY));
        assert!(attrs.contains(FileAttributes::READ_ONLY));
    }

    #[test]
    fn relative_paths_are_rejected_at_the_entry_point() {
        let fs = MemoryFileSystem::new();
        assert!(matches!(
            fs.create_directory(&p("relative")),
            Err(VfsError::InvalidPath { .. })
        ));
        assert!(matches!(fs.file_exists(&p("x")), Err(VfsError::InvalidPath { .. })));
    }

    #[test]
    fn watcher_sees_creations_deletions_and_renames() {
        let fs = MemoryFileSystem::new();
        let watcher = fs.watch(&UPath::root()).unwrap();
        watcher.set_include_subdirectories(true);
        watcher.set_enabled(true);
        let rx = watcher.events();

        fs.write_all_bytes(&p("/a.txt"), b"1").unwrap();
        let ev = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert!(matches!(ev, WatchEvent::Created { .. }));
        assert_eq!(ev.path().unwrap().as_str(), "/a.txt");

        fs.move_file(&p("/a.txt"), &p("/b.txt")).unwrap();
        let renamed = loop {
            let ev = rx.recv_timeout(Duration::from_secs(5)).unwrap();
            if matches!(ev, WatchEvent::Renamed { .. }) {
                break ev;
            }
        };
        match renamed {
            WatchEvent::Renamed { path, old_path } => {
                assert_eq!(path, "/b.txt");
                assert_eq!(old_path, "/a.txt");
            }
            _ => unreachable!(),
        }

        fs.delete_file(&p("/b.txt")).unwrap();
        let deleted = loop {
            let ev = rx.recv_timeout(Duration::from_secs(5)).unwrap();
            if matches!(ev, WatchEvent::Deleted { .. }) {
                break ev;
            }
        };
        assert_eq!(deleted.path().unwrap().as_str(), "/b.txt");
    }

    #[test]
    fn dropped_watcher_stops_receiving() {
        let fs = MemoryFileSystem::new();
        let watcher = fs.watch(&UPath::root()).unwrap();
        watcher.set_enabled(true);
        drop(watcher);
        // The registry prunes the dead watcher on the next notification.
        fs.write_all_bytes(&p("/x"), b"1").unwrap();
        assert!(fs.registry.watchers.lock().iter().all(|w| w.strong_count() == 0));
    }

    #[test]
    fn open_handles_survive_renames() {
        let fs = MemoryFileSystem::new();
        fs.write_all_bytes(&p("/f"), b"abc").unwrap();
        let mut handle = fs.open_read(&p("/f")).unwrap();
        fs.move_file(&p("/f"), &p("/g")).unwrap();
        let mut out = String::new();
        handle.read_to_string(&mut out).unwrap();
        assert_eq!(out, "abc");
    }
}
