//! Session invalidation channel.
//!
//! Explicit observer wiring: whoever needs to know that the session is gone
//! subscribes with an [`InvalidationListener`] and keeps the returned
//! [`Subscription`] alive for as long as it wants to be notified.

use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tracing::debug;

/// Receives "the session is no longer valid" notifications.
pub trait InvalidationListener: Send + Sync {
    fn on_session_invalidated(&self);
}

impl<F> InvalidationListener for F
where
    F: Fn() + Send + Sync,
{
    fn on_session_invalidated(&self) {
        self()
    }
}

struct ChannelInner {
    next_id: AtomicU64,
    emitted: AtomicU64,
    listeners: RwLock<Vec<(u64, Arc<dyn InvalidationListener>)>>,
}

/// Broadcast point for session invalidation. Cheap to clone; clones share
/// the same listener set.
#[derive(Clone)]
pub struct InvalidationChannel {
    inner: Arc<ChannelInner>,
}

impl Default for InvalidationChannel {
    fn default() -> Self {
        Self::new()
    }
}

impl InvalidationChannel {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(ChannelInner {
                next_id: AtomicU64::new(1),
                emitted: AtomicU64::new(0),
                listeners: RwLock::new(Vec::new()),
            }),
        }
    }

    /// Register a listener. It stays registered until the returned
    /// [`Subscription`] is dropped or cancelled.
    #[must_use = "dropping the Subscription unsubscribes immediately"]
    pub fn subscribe(&self, listener: Arc<dyn InvalidationListener>) -> Subscription {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        self.inner.listeners.write().push((id, listener));
        debug!(subscription = id, "Invalidation listener subscribed");
        Subscription {
            id,
            channel: Arc::downgrade(&self.inner),
        }
    }

    /// Notify every current listener.
    ///
    /// Listeners run on the caller's task, outside the channel lock, so a
    /// listener may subscribe or unsubscribe without deadlocking.
    pub fn emit(&self) {
        let listeners: Vec<_> = self
            .inner
            .listeners
            .read()
            .iter()
            .map(|(_, l)| Arc::clone(l))
            .collect();
        let count = self.inner.emitted.fetch_add(1, Ordering::SeqCst) + 1;
        debug!(listeners = listeners.len(), emitted = count, "Session invalidated");
        for listener in listeners {
            listener.on_session_invalidated();
        }
    }

    /// Number of currently registered listeners.
    pub fn listener_count(&self) -> usize {
        self.inner.listeners.read().len()
    }

    /// How many times [`emit`](Self::emit) has been called.
    pub fn emitted(&self) -> u64 {
        self.inner.emitted.load(Ordering::SeqCst)
    }
}

impl std::fmt::Debug for InvalidationChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InvalidationChannel")
            .field("listeners", &self.listener_count())
            .field("emitted", &self.emitted())
            .finish()
    }
}

/// Keeps a listener registered. Unsubscribes on drop.
#[derive(Debug)]
pub struct Subscription {
    id: u64,
    channel: Weak<ChannelInner>,
}

impl Subscription {
    /// Unsubscribe now. Same as dropping.
    pub fn cancel(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(inner) = self.channel.upgrade() {
            inner.listeners.write().retain(|(id, _)| *id != self.id);
            debug!(subscription = self.id, "Invalidation listener unsubscribed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn counter() -> (Arc<AtomicUsize>, Arc<dyn InvalidationListener>) {
        let hits = Arc::new(AtomicUsize::new(0));
        let h = Arc::clone(&hits);
        let listener: Arc<dyn InvalidationListener> = Arc::new(move || {
            h.fetch_add(1, Ordering::SeqCst);
        });
        (hits, listener)
    }

    #[test]
    fn test_emit_reaches_all_subscribers() {
        let channel = InvalidationChannel::new();
        let (a, la) = counter();
        let (b, lb) = counter();
        let _sa = channel.subscribe(la);
        let _sb = channel.subscribe(lb);

        channel.emit();
        assert_eq!(a.load(Ordering::SeqCst), 1);
        assert_eq!(b.load(Ordering::SeqCst), 1);
        assert_eq!(channel.emitted(), 1);
    }

    #[test]
    fn test_drop_unsubscribes() {
        let channel = InvalidationChannel::new();
        let (hits, listener) = counter();
        let sub = channel.subscribe(listener);
        assert_eq!(channel.listener_count(), 1);

        sub.cancel();
        assert_eq!(channel.listener_count(), 0);
        channel.emit();
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_subscription_outliving_channel() {
        let (_, listener) = counter();
        let sub = {
            let channel = InvalidationChannel::new();
            channel.subscribe(listener)
        };
        drop(sub);
    }

    #[test]
    fn test_listener_may_unsubscribe_during_emit() {
        let channel = InvalidationChannel::new();
        let slot: Arc<parking_lot::Mutex<Option<Subscription>>> = Arc::default();
        let s = Arc::clone(&slot);
        let listener: Arc<dyn InvalidationListener> = Arc::new(move || {
            s.lock().take();
        });
        *slot.lock() = Some(channel.subscribe(listener));

        channel.emit();
        assert_eq!(channel.listener_count(), 0);
    }
}
