//! Typed event publication for update observers.
//!
//! An [`EventSite`] is a synchronous publication point: handlers are
//! invoked in registration order, on the thread that calls
//! [`EventSite::notify`]. The site itself is not synchronized: the
//! updater only notifies from its own driving thread, and handlers that
//! need another execution context marshal the event themselves.

use std::fmt;
use std::panic::{self, AssertUnwindSafe};

use tracing::warn;

/// Token returned by [`EventSite::subscribe`], used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// A typed publish–subscribe site.
pub struct EventSite<T> {
    handlers: Vec<(SubscriptionId, Box<dyn Fn(&T) + Send>)>,
    next_id: u64,
}

impl<T> EventSite<T> {
    /// Create a site with no subscribers.
    pub fn new() -> Self {
        Self {
            handlers: Vec::new(),
            next_id: 0,
        }
    }

    /// Register a handler. Handlers run synchronously inside `notify`, in
    /// registration order.
    pub fn subscribe(&mut self, handler: impl Fn(&T) + Send + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.handlers.push((id, Box::new(handler)));
        id
    }

    /// Remove a previously registered handler. Returns whether it was
    /// still registered.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.handlers.len();
        self.handlers.retain(|(handler_id, _)| *handler_id != id);
        self.handlers.len() != before
    }

    /// Remove all handlers.
    pub fn clear(&mut self) {
        self.handlers.clear();
    }

    /// Invoke every current handler with `value`.
    ///
    /// Handlers are expected not to panic; a panicking handler is caught
    /// and logged so it cannot abort the update in progress.
    pub fn notify(&self, value: &T) {
        for (_, handler) in &self.handlers {
            if panic::catch_unwind(AssertUnwindSafe(|| handler(value))).is_err() {
                warn!("event handler panicked");
            }
        }
    }

    /// Number of registered handlers.
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// Whether no handlers are registered.
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl<T> Default for EventSite<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for EventSite<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventSite")
            .field("handlers", &self.handlers.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    #[test]
    fn test_notify_runs_handlers_in_registration_order() {
        let order = Arc::new(Mutex::new(Vec::new()));
        let mut site = EventSite::new();

        for tag in ["first", "second", "third"] {
            let order = Arc::clone(&order);
            site.subscribe(move |_: &u32| order.lock().unwrap().push(tag));
        }

        site.notify(&1);
        assert_eq!(*order.lock().unwrap(), vec!["first", "second", "third"]);
    }

    #[test]
    fn test_unsubscribe_removes_only_that_handler() {
        let count = Arc::new(AtomicUsize::new(0));
        let mut site = EventSite::new();

        let keep = Arc::clone(&count);
        site.subscribe(move |_: &u32| {
            keep.fetch_add(1, Ordering::SeqCst);
        });
        let removed_count = Arc::clone(&count);
        let id = site.subscribe(move |_: &u32| {
            removed_count.fetch_add(100, Ordering::SeqCst);
        });

        assert!(site.unsubscribe(id));
        assert!(!site.unsubscribe(id));

        site.notify(&1);
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_clear_removes_all_handlers() {
        let mut site = EventSite::new();
        site.subscribe(|_: &u32| {});
        site.subscribe(|_: &u32| {});
        assert_eq!(site.len(), 2);

        site.clear();
        assert!(site.is_empty());
    }

    #[test]
    fn test_panicking_handler_does_not_stop_dispatch() {
        let count = Arc::new(AtomicUsize::new(0));
        let mut site = EventSite::new();

        site.subscribe(|_: &u32| panic!("misbehaving handler"));
        let count_clone = Arc::clone(&count);
        site.subscribe(move |_: &u32| {
            count_clone.fetch_add(1, Ordering::SeqCst);
        });

        site.notify(&1);
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_notify_passes_value() {
        let seen = Arc::new(Mutex::new(None));
        let mut site = EventSite::new();
        let seen_clone = Arc::clone(&seen);
        site.subscribe(move |value: &String| {
            *seen_clone.lock().unwrap() = Some(value.clone());
        });

        site.notify(&"payload".to_string());
        assert_eq!(seen.lock().unwrap().as_deref(), Some("payload"));
    }
}
