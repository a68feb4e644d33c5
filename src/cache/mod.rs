pub mod key;
mod store;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::error::{Error, Result};
use crate::transport::ApiResponse;

pub use self::key::{ResourceKey, PUBLIC_ROOTS};
pub use self::store::{CacheStats, CacheStatsSnapshot, Eviction};
use self::store::CacheStore;

/// How long a cached response is served before it is fetched again.
pub const DEFAULT_TTL: Duration = Duration::from_secs(60);

// ---------------------------------------------------------------------------
// ResourceCache -- public facade
// ---------------------------------------------------------------------------

/// Response cache keyed by [`ResourceKey`].
///
/// Data under a public root (see [`PUBLIC_ROOTS`]) is shared by every user of
/// the process. Everything else belongs to the current session and is
/// dropped by [`clear_protected`](Self::clear_protected), including fetches
/// still in flight, which resolve to [`Error::Cancelled`].
///
/// Entries go stale after [`DEFAULT_TTL`] unless another TTL is given.
///
/// Clones share the same entries.
#[derive(Clone)]
pub struct ResourceCache {
    inner: Arc<CacheInner>,
}

struct CacheInner {
    store: CacheStore,
    public_roots: Vec<String>,
    stats: CacheStats,
}

impl Default for ResourceCache {
    fn default() -> Self {
        Self::new()
    }
}

impl ResourceCache {
    pub fn new() -> Self {
        Self::with_public_roots(PUBLIC_ROOTS.iter().copied())
    }

    /// Cache with a custom public allow-list.
    pub fn with_public_roots<I, S>(roots: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::from_parts(roots.into_iter().map(Into::into).collect(), Some(DEFAULT_TTL))
    }

    /// Cache with the default allow-list and a custom TTL. `None` never
    /// expires entries.
    pub fn with_ttl(ttl: Option<Duration>) -> Self {
        Self::from_parts(PUBLIC_ROOTS.iter().map(|r| r.to_string()).collect(), ttl)
    }

    fn from_parts(public_roots: Vec<String>, ttl: Option<Duration>) -> Self {
        Self {
            inner: Arc::new(CacheInner {
                store: CacheStore::new(ttl),
                public_roots,
                stats: CacheStats::default(),
            }),
        }
    }

    pub fn ttl(&self) -> Option<Duration> {
        self.inner.store.ttl()
    }

    pub fn is_public(&self, key: &ResourceKey) -> bool {
        key.is_public_in(self.inner.public_roots.as_slice())
    }

    /// Serve `key` from cache, or run `fetch` and cache a successful result.
    ///
    /// Failed fetches are never cached. Dropping the returned future
    /// abandons the fetch and leaves nothing in flight.
    pub async fn fetch<F>(&self, key: ResourceKey, fetch: F) -> Result<ApiResponse>
    where
        F: Future<Output = Result<ApiResponse>>,
    {
        if let Some(hit) = self.inner.store.get(&key) {
            self.inner.stats.record_hit();
            debug!(key = %key, "Resource cache hit");
            return Ok(hit);
        }
        self.inner.stats.record_miss();

        let ticket = self.inner.store.begin(&key);
        let token = ticket.token().clone();
        let outcome = tokio::select! {
            biased;
            _ = token.cancelled() => Err(Error::Cancelled),
            outcome = fetch => outcome,
        };

        if !self.inner.store.complete(ticket, outcome.as_ref().ok()) {
            self.inner.stats.record_cancelled();
            debug!(key = %key, "Resource fetch cancelled by session clear");
            return Err(Error::Cancelled);
        }
        outcome
    }

    /// Cached response for `key`, if any.
    pub fn get(&self, key: &ResourceKey) -> Option<ApiResponse> {
        self.inner.store.get(key)
    }

    /// Drop the cached response for `key`.
    pub fn invalidate(&self, key: &ResourceKey) -> bool {
        self.inner.store.remove(key)
    }

    /// Evict every protected entry and cancel every protected in-flight
    /// fetch. Public entries are kept. Safe to call repeatedly.
    pub fn clear_protected(&self) -> Eviction {
        let roots = self.inner.public_roots.as_slice();
        let eviction = self
            .inner
            .store
            .evict(|key| !key.is_public_in(roots));
        debug!(
            evicted = eviction.evicted,
            cancelled = eviction.cancelled,
            "Protected resources cleared"
        );
        eviction
    }

    /// Evict everything, public entries included.
    pub fn clear(&self) -> Eviction {
        self.inner.store.evict(|_| true)
    }

    pub fn len(&self) -> usize {
        self.inner.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Fetches currently running through the cache.
    pub fn in_flight(&self) -> usize {
        self.inner.store.in_flight()
    }

    pub fn stats(&self) -> CacheStatsSnapshot {
        self.inner.stats.snapshot()
    }
}

impl std::fmt::Debug for ResourceCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceCache")
            .field("entries", &self.len())
            .field("in_flight", &self.in_flight())
            .field("public_roots", &self.inner.public_roots)
            .field("ttl", &self.ttl())
            .finish()
    }
}
