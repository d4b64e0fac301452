//! Named-event publish/subscribe.
//!
//! The dispatcher holds callbacks weakly: a subscriber keeps its own `Arc`
//! alive for as long as it wants to be called, and dropping that `Arc` is as
//! good as calling [`EventDispatcher::off`].
//!
//! `dispatch` snapshots the callback list and releases the lock before
//! invoking anything, so callbacks may register or unregister (themselves
//! or others) without affecting the dispatch already under way.
//!
//! A callback that panics is logged and skipped; the remaining callbacks
//! still run and the dispatcher stays usable. This relies on unwinding: in
//! a `panic = "abort"` build a panicking callback still takes the process
//! down, so callbacks must not panic.
//!
//! # Example
//!
//! ```
//! use airlink_session::{Callback, EventDispatcher};
//! use std::sync::Arc;
//! use std::sync::atomic::{AtomicI64, Ordering};
//!
//! let dispatcher = EventDispatcher::<i64>::new();
//! let total = Arc::new(AtomicI64::new(0));
//!
//! let sink = Arc::clone(&total);
//! let callback: Arc<Callback<i64>> = Arc::new(move |value: &i64| {
//!     sink.fetch_add(*value, Ordering::SeqCst);
//! });
//!
//! dispatcher.on("reading", &callback);
//! dispatcher.dispatch("reading", &5);
//! dispatcher.off("reading", &callback);
//! dispatcher.dispatch("reading", &5);
//!
//! assert_eq!(total.load(Ordering::SeqCst), 5);
//! ```

use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use tracing::error;

/// Callback signature for events carrying a `P`.
pub type Callback<P> = dyn Fn(&P) + Send + Sync;

type Listeners<P> = HashMap<String, Vec<Weak<Callback<P>>>>;

/// Registry of weakly held callbacks keyed by event name.
pub struct EventDispatcher<P> {
    listeners: Mutex<Listeners<P>>,
}

impl<P> EventDispatcher<P> {
    pub fn new() -> Self {
        Self {
            listeners: Mutex::new(HashMap::new()),
        }
    }

    // A panicking callback never runs under the lock, so a poisoned map is
    // still consistent.
    fn lock(&self) -> MutexGuard<'_, Listeners<P>> {
        self.listeners.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register `callback` for `event`.
    ///
    /// Registering the same callback twice makes it fire twice per dispatch.
    pub fn on(&self, event: &str, callback: &Arc<Callback<P>>) {
        let mut listeners = self.lock();
        let entry = listeners.entry(event.to_string()).or_default();
        entry.retain(|weak| weak.strong_count() > 0);
        entry.push(Arc::downgrade(callback));
    }

    /// Remove one registration of `callback` for `event`.
    ///
    /// Unknown events and callbacks are ignored.
    pub fn off(&self, event: &str, callback: &Arc<Callback<P>>) {
        let mut listeners = self.lock();
        let Some(entry) = listeners.get_mut(event) else {
            return;
        };

        let target = Arc::downgrade(callback);
        if let Some(index) = entry.iter().position(|weak| weak.ptr_eq(&target)) {
            entry.remove(index);
        }
        entry.retain(|weak| weak.strong_count() > 0);

        if entry.is_empty() {
            listeners.remove(event);
        }
    }

    /// Invoke every callback registered for `event` at the time of the call.
    ///
    /// Returns how many callbacks completed. A panicking callback is
    /// logged and not counted.
    pub fn dispatch(&self, event: &str, payload: &P) -> usize {
        let snapshot = match self.lock().get(event) {
            Some(entry) => entry.clone(),
            None => return 0,
        };

        let mut delivered = 0;
        for callback in snapshot.iter().filter_map(Weak::upgrade) {
            match panic::catch_unwind(AssertUnwindSafe(|| callback(payload))) {
                Ok(()) => delivered += 1,
                Err(_) => error!(event, "Event callback panicked"),
            }
        }
        delivered
    }

    /// Number of live registrations for `event`.
    pub fn listener_count(&self, event: &str) -> usize {
        self.lock()
            .get(event)
            .map_or(0, |entry| entry.iter().filter(|w| w.strong_count() > 0).count())
    }
}

impl<P> Default for EventDispatcher<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P> std::fmt::Debug for EventDispatcher<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let listeners = self.lock();
        f.debug_map()
            .entries(listeners.iter().map(|(event, entry)| (event, entry.len())))
            .finish()
    }
}
