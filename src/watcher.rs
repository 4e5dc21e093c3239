//! # Watchers
//!
//! A [`Watcher`] is an event source attached to a backend and a path. All
//! watchers share one delivery policy, implemented once in
//! [`WatcherCore`]: an event is delivered iff
//!
//! 1. the watcher is enabled, and
//! 2. the compiled filter matches the path's final name, and
//! 3. the path lies under the watched path (directly, or anywhere below it
//!    when `include_subdirectories` is set).
//!
//! Error events bypass the filter; only the enabled flag gates them.
//!
//! Concrete watchers embed a `WatcherCore` and feed it through
//! [`WatcherCore::raise`], which applies the policy and hands accepted
//! events to the embedded [`EventDispatcher`] for background delivery.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::dispatcher::{EventCallback, EventDispatcher};
use crate::error::VfsError;
use crate::event::{BackendId, WatchEvent};
use crate::filter::FilterPattern;
use crate::path::UPath;
use crate::types::NotifyFilters;

/// Default size hint for a backend's internal event buffer.
const DEFAULT_BUFFER_SIZE: usize = 8192;

/// Mutable per-watcher configuration.
struct WatcherConfig {
    filter: String,
    pattern: FilterPattern,
    notify: NotifyFilters,
    enabled: bool,
    recursive: bool,
    buffer_size: usize,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            filter: "*.*".to_string(),
            pattern: FilterPattern::default(),
            notify: NotifyFilters::default(),
            enabled: false,
            recursive: false,
            buffer_size: DEFAULT_BUFFER_SIZE,
        }
    }
}

/// Shared state and delivery policy of a watcher.
///
/// Holds the watched path, the configuration (with the filter kept
/// compiled), and the dispatcher. [`raise`](WatcherCore::raise) and
/// [`raise_error`](WatcherCore::raise_error) are the only entry points for
/// emitting events.
pub struct WatcherCore {
    source: BackendId,
    path: UPath,
    config: Mutex<WatcherConfig>,
    dispatcher: EventDispatcher,
}

impl WatcherCore {
    /// Create a core for a watcher on `path`, stamped with the identity of
    /// the backend that produced it.
    ///
    /// Watchers start disabled with filter `*.*`, the default notify
    /// filters, and no subdirectory recursion.
    pub fn new(source: BackendId, path: UPath) -> Self {
        Self {
            source,
            path,
            config: Mutex::new(WatcherConfig::default()),
            dispatcher: EventDispatcher::new(),
        }
    }

    /// The watched path.
    pub fn path(&self) -> &UPath {
        &self.path
    }

    /// Identity of the backend this watcher came from.
    pub fn source(&self) -> &BackendId {
        &self.source
    }

    /// The current filter glob.
    pub fn filter(&self) -> String {
        self.config.lock().filter.clone()
    }

    /// Set the filter glob, recompiling the matcher.
    ///
    /// # Errors
    ///
    /// - [`VfsError::InvalidFilter`] if `filter` contains a separator; the
    ///   previous filter stays in effect
    pub fn set_filter(&self, filter: &str) -> Result<(), VfsError> {
        let mut config = self.config.lock();
        if config.filter == filter {
            return Ok(());
        }
        config.pattern = FilterPattern::parse(filter)?;
        config.filter = filter.to_string();
        Ok(())
    }

    /// The notify-filter bitfield.
    pub fn notify_filters(&self) -> NotifyFilters {
        self.config.lock().notify
    }

    /// Set the notify-filter bitfield.
    pub fn set_notify_filters(&self, notify: NotifyFilters) {
        self.config.lock().notify = notify;
    }

    /// Whether events are being raised.
    pub fn enabled(&self) -> bool {
        self.config.lock().enabled
    }

    /// Enable or disable event raising.
    pub fn set_enabled(&self, enabled: bool) {
        self.config.lock().enabled = enabled;
    }

    /// Whether events below direct children are delivered.
    pub fn include_subdirectories(&self) -> bool {
        self.config.lock().recursive
    }

    /// Enable or disable subdirectory recursion.
    pub fn set_include_subdirectories(&self, recursive: bool) {
        self.config.lock().recursive = recursive;
    }

    /// Size hint for the backend's internal event buffer.
    pub fn buffer_size(&self) -> usize {
        self.config.lock().buffer_size
    }

    /// Set the internal buffer size hint.
    pub fn set_buffer_size(&self, buffer_size: usize) {
        self.config.lock().buffer_size = buffer_size;
    }

    /// Register a callback for delivered events.
    pub fn subscribe(&self, callback: EventCallback) {
        self.dispatcher.subscribe(callback);
    }

    /// Apply the delivery policy to `event` and queue it if it passes.
    pub fn raise(&self, event: WatchEvent) {
        if event.is_error() {
            if self.config.lock().enabled {
                self.dispatcher.dispatch(event, false);
            }
            return;
        }
        let deliver = {
            let config = self.config.lock();
            config.enabled
                && event.name().is_some_and(|name| config.pattern.matches(name))
                && event
                    .path()
                    .is_some_and(|path| path.is_in_directory(&self.path, config.recursive))
        };
        if deliver {
            self.dispatcher.dispatch(event, true);
        }
    }

    /// Queue an error event, bypassing the filter.
    pub fn raise_error(&self, error: VfsError, path: Option<UPath>) {
        self.raise(WatchEvent::Error { error: Arc::new(error), path });
    }
}

/// The event-source contract.
///
/// Configuration accessors have default implementations over
/// [`core`](Watcher::core); wrapping watchers override the ones they
/// mirror or propagate.
pub trait Watcher: Send + Sync {
    /// The shared core carrying configuration and the dispatcher.
    #[doc(hidden)]
    fn core(&self) -> &WatcherCore;

    /// The watched path.
    fn path(&self) -> &UPath {
        self.core().path()
    }

    /// Identity of the backend this watcher came from.
    fn source(&self) -> &BackendId {
        self.core().source()
    }

    /// The current filter glob. Defaults to `*.*`.
    fn filter(&self) -> String {
        self.core().filter()
    }

    /// Set the filter glob.
    ///
    /// # Errors
    ///
    /// - [`VfsError::InvalidFilter`] if `filter` contains a separator
    fn set_filter(&self, filter: &str) -> Result<(), VfsError> {
        self.core().set_filter(filter)
    }

    /// The notify-filter bitfield.
    fn notify_filters(&self) -> NotifyFilters {
        self.core().notify_filters()
    }

    /// Set the notify-filter bitfield.
    fn set_notify_filters(&self, notify: NotifyFilters) {
        self.core().set_notify_filters(notify);
    }

    /// Whether events are being raised. Defaults to `false`.
    fn enabled(&self) -> bool {
        self.core().enabled()
    }

    /// Enable or disable event raising.
    fn set_enabled(&self, enabled: bool) {
        self.core().set_enabled(enabled);
    }

    /// Whether events below direct children are delivered. Defaults to
    /// `false`.
    fn include_subdirectories(&self) -> bool {
        self.core().include_subdirectories()
    }

    /// Enable or disable subdirectory recursion.
    fn set_include_subdirectories(&self, recursive: bool) {
        self.core().set_include_subdirectories(recursive);
    }

    /// Size hint for the backend's internal event buffer.
    fn buffer_size(&self) -> usize {
        self.core().buffer_size()
    }

    /// Set the internal buffer size hint.
    fn set_buffer_size(&self, buffer_size: usize) {
        self.core().set_buffer_size(buffer_size);
    }

    /// Register a callback for delivered events.
    ///
    /// Callbacks run on the watcher's dispatcher thread, serialized per
    /// watcher.
    fn subscribe(&self, callback: EventCallback) {
        self.core().subscribe(callback);
    }

    /// Receive delivered events through a channel.
    ///
    /// Convenience over [`subscribe`](Watcher::subscribe); events are
    /// cloned into an unbounded channel.
    fn events(&self) -> crossbeam_channel::Receiver<WatchEvent> {
        let (tx, rx) = crossbeam_channel::unbounded();
        self.subscribe(Arc::new(move |event: &WatchEvent| {
            let _ = tx.send(event.clone());
        }));
        rx
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    struct TestWatcher {
        core: WatcherCore,
    }

    impl Watcher for TestWatcher {
        fn core(&self) -> &WatcherCore {
            &self.core
        }
    }

    fn watcher_on(path: &str) -> TestWatcher {
        TestWatcher { core: WatcherCore::new(BackendId::new(), UPath::new(path)) }
    }

    fn created(path: &str) -> WatchEvent {
        WatchEvent::Created { path: UPath::new(path) }
    }

    fn try_recv(
        rx: &crossbeam_channel::Receiver<WatchEvent>,
    ) -> Result<WatchEvent, crossbeam_channel::RecvTimeoutError> {
        rx.recv_timeout(Duration::from_millis(300))
    }

    #[test]
    fn defaults_match_contract() {
        let w = watcher_on("/");
        assert_eq!(w.filter(), "*.*");
        assert!(!w.enabled());
        assert!(!w.include_subdirectories());
        assert_eq!(w.notify_filters(), NotifyFilters::default());
    }

    #[test]
    fn disabled_watcher_raises_nothing() {
        let w = watcher_on("/");
        let rx = w.events();
        w.core.raise(created("/a.txt"));
        assert!(try_recv(&rx).is_err());
    }

    #[test]
    fn filter_gates_by_final_name() {
        let w = watcher_on("/");
        w.set_enabled(true);
        w.set_filter("*.log").unwrap();
        let rx = w.events();
        w.core.raise(created("/a.log"));
        w.core.raise(created("/a.txt"));
        let ev = try_recv(&rx).unwrap();
        assert_eq!(ev.path().unwrap().as_str(), "/a.log");
        assert!(try_recv(&rx).is_err(), "non-matching name must be dropped");
    }

    #[test]
    fn subdirectory_events_need_recursion() {
        let w = watcher_on("/");
        w.set_enabled(true);
        let rx = w.events();
        w.core.raise(created("/sub/a.log"));
        assert!(try_recv(&rx).is_err());

        w.set_include_subdirectories(true);
        w.core.raise(created("/sub/a.log"));
        assert!(try_recv(&rx).is_ok());
    }

    #[test]
    fn error_events_bypass_filter_but_not_enabled() {
        let w = watcher_on("/");
        w.set_filter("*.log").unwrap();
        let rx = w.events();

        w.core.raise_error(VfsError::Disposed { operation: "watch" }, None);
        assert!(try_recv(&rx).is_err(), "disabled watcher must not emit errors");

        w.set_enabled(true);
        w.core.raise_error(VfsError::Disposed { operation: "watch" }, None);
        assert!(try_recv(&rx).unwrap().is_error());
    }

    #[test]
    fn invalid_filter_is_rejected_and_previous_kept() {
        let w = watcher_on("/");
        w.set_filter("*.log").unwrap();
        assert!(matches!(w.set_filter("a/b"), Err(VfsError::InvalidFilter { .. })));
        assert_eq!(w.filter(), "*.log");
    }

    #[test]
    fn rename_filter_applies_to_new_name() {
        let w = watcher_on("/");
        w.set_enabled(true);
        w.set_filter("*.log").unwrap();
        let rx = w.events();
        w.core.raise(WatchEvent::Renamed {
            path: UPath::new("/b.log"),
            old_path: UPath::new("/a.txt"),
        });
        assert!(matches!(try_recv(&rx).unwrap(), WatchEvent::Renamed { .. }));
    }
}
