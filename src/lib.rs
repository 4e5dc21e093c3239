//! # unifs
//!
//! A **composable virtual filesystem**: one protocol for hierarchical file
//! and directory storage, whatever actually holds the bytes, plus the
//! machinery to layer backends into storage topologies and watch them as
//! if they were flat.
//!
//! ---
//!
//! ## Quick Start
//!
//! ```rust
//! use unifs::{FsRead, FsWrite, MemoryFileSystem, SubFileSystem, UPath, VfsExt};
//!
//! let fs = MemoryFileSystem::new();
//! fs.create_directory(&UPath::new("/projects/demo"))?;
//! fs.write_all_text(&UPath::new("/projects/demo/readme.md"), "# demo\n")?;
//!
//! // Present /projects as a filesystem of its own.
//! let view = SubFileSystem::new(fs, "/projects")?;
//! assert_eq!(view.read_all_text(&UPath::new("/demo/readme.md"))?, "# demo\n");
//! # Ok::<(), unifs::VfsError>(())
//! ```
//!
//! ---
//!
//! ## Core Types
//!
//! | Type | Purpose |
//! |------|---------|
//! | [`UPath`] | Immutable normalized forward-slash path |
//! | [`FsRead`] / [`FsWrite`] / [`FsWatch`] | The capability contracts backends implement |
//! | [`Vfs`] | Composite of all three, implemented automatically |
//! | [`VfsError`] | Canonical failure taxonomy |
//! | [`VfsExt`] | Whole-file and cross-backend convenience helpers |
//! | [`MemoryFileSystem`] | Thread-safe in-memory leaf backend |
//! | [`SubFileSystem`] | A subtree of another backend, rerooted at `/` |
//! | [`ReadOnlyFileSystem`] | Pass-through reads, refused writes |
//! | [`AggregateFileSystem`] | Ordered read-only union of backends |
//! | [`Watcher`] | Change-notification stream with filtering |
//!
//! ---
//!
//! ## Composition
//!
//! Backends nest. A [`SubFileSystem`] rerooted under an
//! [`AggregateFileSystem`] wrapped in a [`ReadOnlyFileSystem`] is still
//! just a value implementing the same traits, and a watcher created
//! anywhere in the stack delivers events in the namespace of the layer it
//! was created on — each wrapper translates paths on the way through
//! ([`Mapped`] and [`WrapWatcher`] are the reusable pieces).
//!
//! Ownership of a delegate follows the type: wrapping a backend by value
//! transfers ownership; wrapping an `Arc` shares it.
//!
//! ---
//!
//! ## Events
//!
//! Every watcher delivers events **asynchronously** on its own dispatcher
//! thread (see [`EventDispatcher`]), so producers never run subscriber
//! code while holding backend locks. Delivery per watcher is serialized
//! and FIFO; there is no ordering across watchers. Subscriber panics are
//! captured and republished as [`WatchEvent::Error`] instead of unwinding
//! into the producer.
//!
//! ---
//!
//! ## Errors
//!
//! All operations return `Result<T, VfsError>` with the canonical taxonomy
//! of [`VfsError`]; backends map their native failures into it.

mod aggregate;
mod compose;
mod dispatcher;
mod entry;
mod error;
mod event;
mod ext;
mod filter;
mod memory;
mod path;
mod readonly;
mod sub;
mod traits;
mod types;
mod watcher;

pub use aggregate::{AggregateFileSystem, AggregateWatcher};
pub use compose::{IdentityMap, Mapped, PathMap, WrapWatcher};
pub use dispatcher::{EventCallback, EventDispatcher};
pub use entry::{DirectoryEntry, FileEntry};
pub use error::VfsError;
pub use event::{BackendId, ChangeKind, WatchEvent};
pub use ext::VfsExt;
pub use filter::FilterPattern;
pub use memory::MemoryFileSystem;
pub use path::{SEPARATOR, UPath};
pub use readonly::ReadOnlyFileSystem;
pub use sub::{SubFileSystem, SubRoot};
pub use traits::{FileStream, FsRead, FsWatch, FsWrite, PathIter, Vfs};
pub use types::{
    FileAccess, FileAttributes, FileShare, NotifyFilters, OpenMode, SearchTarget,
    default_file_time,
};
pub use watcher::{Watcher, WatcherCore};
