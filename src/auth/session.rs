//! In-memory authentication state.
//!
//! [`SessionStore`] is the single source of truth for "who is logged in".
//! It is seeded once from [`UserStorage`], mutated by login and logout, and
//! cleared whenever the [`InvalidationChannel`] fires.

use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use super::invalidation::{InvalidationChannel, InvalidationListener, Subscription};
use super::reporting::{ErrorContext, ErrorReporter, TracingReporter};
use crate::cache::ResourceCache;
use crate::error::{Error, StorageError};
use crate::models::{AuthResponse, StoredUser};
use crate::storage::UserStorage;

/// Snapshot of the authentication state.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub user: Option<StoredUser>,
    pub is_loading: bool,
    /// Last persistence problem, for optional user notification.
    pub storage_error: Option<StorageError>,
}

impl Session {
    fn loading() -> Self {
        Self {
            user: None,
            is_loading: true,
            storage_error: None,
        }
    }

    /// Derived from `user`; never stored on its own.
    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }
}

/// Owns the [`Session`] and publishes every change to subscribers.
pub struct SessionStore {
    storage: UserStorage,
    cache: ResourceCache,
    reporter: Arc<dyn ErrorReporter>,
    state: watch::Sender<Session>,
    initialized: AtomicBool,
    subscription: Mutex<Option<Subscription>>,
}

impl SessionStore {
    pub fn new(storage: UserStorage, cache: ResourceCache) -> Self {
        let (state, _) = watch::channel(Session::loading());
        Self {
            storage,
            cache,
            reporter: Arc::new(TracingReporter),
            state,
            initialized: AtomicBool::new(false),
            subscription: Mutex::new(None),
        }
    }

    pub fn with_reporter(mut self, reporter: Arc<dyn ErrorReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    /// Load the persisted user. Runs once; later calls are no-ops.
    ///
    /// A storage failure leaves the session unauthenticated with
    /// `storage_error` set. Loading always finishes.
    pub fn initialize(&self) {
        if self.initialized.swap(true, Ordering::SeqCst) {
            return;
        }

        let (user, storage_error) = match self.storage.load() {
            Ok(user) => (user, None),
            Err(e) => {
                warn!(error = %e, "Stored session discarded");
                (None, Some(e))
            }
        };
        debug!(authenticated = user.is_some(), "Session initialized");

        self.state.send_modify(|session| {
            session.user = user;
            session.storage_error = storage_error;
            session.is_loading = false;
        });
    }

    /// Subscribe to the invalidation channel for the lifetime of the store.
    ///
    /// The listener holds the store weakly, so the channel never keeps a
    /// torn-down store alive. Attaching again replaces the old subscription.
    pub fn attach(self: &Arc<Self>, channel: &InvalidationChannel) {
        let handler = InvalidationHandler {
            store: Arc::downgrade(self),
        };
        let subscription = channel.subscribe(Arc::new(handler));
        *self.subscription.lock() = Some(subscription);
    }

    /// Unsubscribe from the invalidation channel.
    pub fn teardown(&self) {
        if self.subscription.lock().take().is_some() {
            debug!("Session store detached from invalidation channel");
        }
    }

    pub fn is_attached(&self) -> bool {
        self.subscription.lock().is_some()
    }

    /// Record a successful login.
    ///
    /// Only the profile list is kept. If persisting it fails the user is
    /// still authenticated for this process and `storage_error` is set.
    pub fn set_auth_user(&self, response: &AuthResponse) -> Session {
        let user = StoredUser::from(response);
        let storage_error = match self.storage.save(&user) {
            Ok(()) => None,
            Err(e) => {
                self.reporter.report(
                    &Error::Storage(e.clone()),
                    &ErrorContext::new(
                        "session_store",
                        "Failed to persist session, continuing in memory",
                    ),
                );
                Some(e)
            }
        };

        info!(profiles = user.profiles.len(), "Session established");
        self.state.send_modify(|session| {
            session.user = Some(user);
            session.storage_error = storage_error;
            session.is_loading = false;
        });
        self.snapshot()
    }

    /// Forget the current user: persisted blob, in-memory state, and every
    /// cached or in-flight protected resource. Idempotent.
    pub fn clear_auth_state(&self) {
        self.storage.clear();
        let eviction = self.cache.clear_protected();

        let changed = self.state.send_if_modified(|session| {
            let changed = session.user.is_some() || session.storage_error.is_some();
            session.user = None;
            session.storage_error = None;
            session.is_loading = false;
            changed
        });
        if changed {
            info!(
                evicted = eviction.evicted,
                cancelled = eviction.cancelled,
                "Session cleared"
            );
        }
    }

    pub fn clear_storage_error(&self) {
        self.state.send_if_modified(|session| session.storage_error.take().is_some());
    }

    pub fn snapshot(&self) -> Session {
        self.state.borrow().clone()
    }

    /// Receiver that observes every session change.
    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.state.subscribe()
    }

    pub fn user(&self) -> Option<StoredUser> {
        self.state.borrow().user.clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.state.borrow().is_authenticated()
    }

    pub fn is_loading(&self) -> bool {
        self.state.borrow().is_loading
    }

    pub fn storage_error(&self) -> Option<StorageError> {
        self.state.borrow().storage_error.clone()
    }

    pub fn cache(&self) -> &ResourceCache {
        &self.cache
    }
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore")
            .field("session", &*self.state.borrow())
            .field("storage", &self.storage)
            .field("attached", &self.is_attached())
            .finish()
    }
}

struct InvalidationHandler {
    store: Weak<SessionStore>,
}

impl InvalidationListener for InvalidationHandler {
    fn on_session_invalidated(&self) {
        if let Some(store) = self.store.upgrade() {
            store.clear_auth_state();
        }
    }
}
