//! # Event Dispatcher
//!
//! [`EventDispatcher`] decouples event producers from subscriber callbacks.
//! Producers may raise events while holding backend-internal locks, so
//! callbacks must never run on the producing thread: every raise enqueues a
//! work item onto a bounded queue drained by one dedicated worker thread
//! per dispatcher.
//!
//! The safety property that matters is **snapshot-then-run**: a raise takes
//! a snapshot of the subscriber list under the lock, releases the lock, and
//! only then enqueues the closure that iterates the snapshot. The worker
//! therefore never holds the subscriber-list lock while running user code,
//! and callbacks are free to subscribe, unsubscribe, or call back into the
//! filesystem.
//!
//! Delivery is FIFO per dispatcher; there is no ordering across
//! dispatchers.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;
use std::time::Duration;

use crossbeam_channel::{RecvTimeoutError, Sender, bounded};
use parking_lot::Mutex;

use crate::error::VfsError;
use crate::event::WatchEvent;

/// A subscriber callback. Runs on the dispatcher's worker thread.
pub type EventCallback = Arc<dyn Fn(&WatchEvent) + Send + Sync>;

type Job = Box<dyn FnOnce() + Send>;

/// Work items the producer may have in flight before it blocks.
const QUEUE_CAPACITY: usize = 16;

/// How often the worker re-checks the shutdown flag while idle. Bounds the
/// time a dispose waits for the join.
const SHUTDOWN_POLL: Duration = Duration::from_millis(50);

/// Background delivery of [`WatchEvent`]s to subscribers.
///
/// Owned by an event-producing watcher. Raising is non-blocking from the
/// producer's perspective unless the queue is at capacity. Dropping the
/// dispatcher cancels the worker, joins it, and discards undrained items.
pub struct EventDispatcher {
    shared: Arc<Shared>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

struct Shared {
    subscribers: Mutex<Vec<EventCallback>>,
    queue: Sender<Job>,
    shutdown: AtomicBool,
}

impl EventDispatcher {
    /// Create a dispatcher and start its worker thread.
    pub fn new() -> Self {
        let (tx, rx) = bounded::<Job>(QUEUE_CAPACITY);
        let shared = Arc::new(Shared {
            subscribers: Mutex::new(Vec::new()),
            queue: tx,
            shutdown: AtomicBool::new(false),
        });
        let worker_shared = Arc::clone(&shared);
        let worker = std::thread::Builder::new()
            .name("unifs-dispatcher".into())
            .spawn(move || {
                loop {
                    if worker_shared.shutdown.load(Ordering::Acquire) {
                        break;
                    }
                    match rx.recv_timeout(SHUTDOWN_POLL) {
                        Ok(job) => {
                            if worker_shared.shutdown.load(Ordering::Acquire) {
                                break;
                            }
                            job();
                        }
                        Err(RecvTimeoutError::Timeout) => {}
                        Err(RecvTimeoutError::Disconnected) => break,
                    }
                }
            })
            .expect("dispatcher worker should spawn");
        Self { shared, worker: Mutex::new(Some(worker)) }
    }

    /// Register a callback for every delivered event.
    pub fn subscribe(&self, callback: EventCallback) {
        self.shared.subscribers.lock().push(callback);
    }

    /// The number of registered callbacks.
    pub fn subscriber_count(&self) -> usize {
        self.shared.subscribers.lock().len()
    }

    /// Queue `event` for delivery to the current subscribers.
    ///
    /// With `capture_errors`, a panicking callback is caught and republished
    /// as a [`WatchEvent::Error`] through this same dispatcher; the error
    /// delivery itself runs with `capture_errors` off, so a panicking error
    /// subscriber cannot recurse.
    pub fn dispatch(&self, event: WatchEvent, capture_errors: bool) {
        self.shared.enqueue(event, capture_errors, true);
    }
}

impl Default for EventDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for EventDispatcher {
    fn drop(&mut self) {
        self.shared.shutdown.store(true, Ordering::Release);
        if let Some(worker) = self.worker.lock().take() {
            if worker.join().is_err() {
                tracing::warn!("dispatcher worker panicked during shutdown");
            }
        }
    }
}

impl Shared {
    fn enqueue(self: &Arc<Self>, event: WatchEvent, capture_errors: bool, blocking: bool) {
        if self.shutdown.load(Ordering::Acquire) {
            tracing::trace!("dispatcher disposed; event discarded");
            return;
        }
        // Snapshot under the lock, run outside it.
        let snapshot: Vec<EventCallback> = self.subscribers.lock().clone();
        if snapshot.is_empty() {
            return;
        }
        let shared = Arc::clone(self);
        let job: Job = Box::new(move || {
            for callback in &snapshot {
                let outcome = catch_unwind(AssertUnwindSafe(|| callback(&event)));
                if let Err(payload) = outcome {
                    let message = panic_message(payload);
                    if capture_errors {
                        let error = WatchEvent::Error {
                            error: Arc::new(VfsError::Io(std::io::Error::other(message))),
                            path: event.path().cloned(),
                        };
                        // Non-blocking: the worker is the sender here and
                        // must not wait on its own full queue.
                        shared.enqueue(error, false, false);
                    } else {
                        tracing::warn!(message, "error-stream subscriber panicked");
                    }
                }
            }
        });
        let rejected = if blocking {
            self.queue.send(job).is_err()
        } else {
            self.queue.try_send(job).is_err()
        };
        if rejected {
            tracing::trace!("dispatcher queue unavailable; event discarded");
        }
    }
}

fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "subscriber panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path::UPath;
    use std::time::Duration;

    fn created(path: &str) -> WatchEvent {
        WatchEvent::Created { path: UPath::new(path) }
    }

    fn recv_kinds(rx: &crossbeam_channel::Receiver<WatchEvent>, n: usize) -> Vec<WatchEvent> {
        (0..n)
            .map(|_| rx.recv_timeout(Duration::from_secs(5)).expect("event should arrive"))
            .collect()
    }

    #[test]
    fn delivers_in_fifo_order() {
        let dispatcher = EventDispatcher::new();
        let (tx, rx) = crossbeam_channel::unbounded();
        dispatcher.subscribe(Arc::new(move |ev: &WatchEvent| {
            tx.send(ev.clone()).unwrap();
        }));
        for i in 0..32 {
            dispatcher.dispatch(created(&format!("/f{i}")), true);
        }
        let received = recv_kinds(&rx, 32);
        for (i, ev) in received.iter().enumerate() {
            assert_eq!(ev.path().unwrap().as_str(), format!("/f{i}"));
        }
    }

    #[test]
    fn snapshot_excludes_later_subscribers() {
        let dispatcher = EventDispatcher::new();
        let (tx, rx) = crossbeam_channel::unbounded();
        dispatcher.dispatch(created("/before-any-subscriber"), true);
        dispatcher.subscribe(Arc::new(move |ev: &WatchEvent| {
            tx.send(ev.clone()).unwrap();
        }));
        dispatcher.dispatch(created("/after"), true);
        let ev = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(ev.path().unwrap().as_str(), "/after");
    }

    #[test]
    fn panicking_subscriber_yields_error_event_and_delivery_continues() {
        let dispatcher = EventDispatcher::new();
        let (tx, rx) = crossbeam_channel::unbounded();
        dispatcher.subscribe(Arc::new(|ev: &WatchEvent| {
            if matches!(ev, WatchEvent::Created { .. }) {
                panic!("boom");
            }
        }));
        dispatcher.subscribe(Arc::new(move |ev: &WatchEvent| {
            tx.send(ev.clone()).unwrap();
        }));

        dispatcher.dispatch(created("/a"), true);
        let events = recv_kinds(&rx, 2);
        assert!(matches!(events[0], WatchEvent::Created { .. }));
        assert!(events[1].is_error(), "panic should surface as an error event");

        // A later event on the healthy subscriber still arrives.
        dispatcher.dispatch(WatchEvent::Changed { path: UPath::new("/b") }, true);
        let ev = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(ev.path().unwrap().as_str(), "/b");
    }

    #[test]
    fn drop_with_queued_events_terminates() {
        let dispatcher = EventDispatcher::new();
        let (tx, rx) = crossbeam_channel::unbounded();
        dispatcher.subscribe(Arc::new(move |_ev: &WatchEvent| {
            tx.send(()).unwrap();
            std::thread::sleep(Duration::from_millis(20));
        }));
        for i in 0..8 {
            dispatcher.dispatch(created(&format!("/f{i}")), true);
        }
        // Wait for the worker to pick up the first item, then dispose with
        // the rest still queued; drop must join within bounded time.
        rx.recv_timeout(Duration::from_secs(5)).unwrap();
        drop(dispatcher);
    }

    #[test]
    fn dispatch_after_shutdown_is_silent() {
        let dispatcher = EventDispatcher::new();
        dispatcher.shared.shutdown.store(true, Ordering::Release);
        dispatcher.dispatch(created("/ignored"), true);
    }
}
