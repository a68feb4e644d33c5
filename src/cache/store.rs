use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

use super::key::ResourceKey;
use crate::transport::ApiResponse;

// ---------------------------------------------------------------------------
// Entries
// ---------------------------------------------------------------------------

struct InFlight {
    key: ResourceKey,
    token: CancellationToken,
}

struct Ready {
    response: ApiResponse,
    stored_at: Instant,
}

#[derive(Default)]
struct Entries {
    ready: HashMap<ResourceKey, Ready>,
    in_flight: HashMap<u64, InFlight>,
    next_id: u64,
}

/// Handle for one in-flight fetch. Resolve it with [`CacheStore::complete`].
///
/// Dropping an unresolved ticket (the caller's future was dropped) removes
/// its in-flight entry.
pub(crate) struct FetchTicket<'a> {
    store: &'a CacheStore,
    id: u64,
    key: ResourceKey,
    token: CancellationToken,
    settled: bool,
}

impl FetchTicket<'_> {
    pub(crate) fn token(&self) -> &CancellationToken {
        &self.token
    }
}

impl Drop for FetchTicket<'_> {
    fn drop(&mut self) {
        if !self.settled {
            self.store.entries.lock().in_flight.remove(&self.id);
        }
    }
}

/// What [`CacheStore::evict`] removed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Eviction {
    pub evicted: usize,
    pub cancelled: usize,
}

/// Synchronous half of the cache: ready entries plus in-flight tokens,
/// guarded by one lock so eviction and completion cannot interleave.
///
/// Ready entries older than `ttl` are stale: `get` drops them and reports a
/// miss. `None` keeps entries until they are evicted.
pub(crate) struct CacheStore {
    entries: Mutex<Entries>,
    ttl: Option<Duration>,
}

impl CacheStore {
    pub(crate) fn new(ttl: Option<Duration>) -> Self {
        Self {
            entries: Mutex::new(Entries::default()),
            ttl,
        }
    }

    pub(crate) fn ttl(&self) -> Option<Duration> {
        self.ttl
    }

    pub(crate) fn get(&self, key: &ResourceKey) -> Option<ApiResponse> {
        let mut entries = self.entries.lock();
        let entry = entries.ready.get(key)?;
        if self.ttl.is_some_and(|ttl| entry.stored_at.elapsed() >= ttl) {
            entries.ready.remove(key);
            return None;
        }
        Some(entry.response.clone())
    }

    pub(crate) fn begin(&self, key: &ResourceKey) -> FetchTicket<'_> {
        let mut entries = self.entries.lock();
        entries.next_id += 1;
        let id = entries.next_id;
        let token = CancellationToken::new();
        entries.in_flight.insert(
            id,
            InFlight {
                key: key.clone(),
                token: token.clone(),
            },
        );
        FetchTicket {
            store: self,
            id,
            key: key.clone(),
            token,
            settled: false,
        }
    }

    /// Finish a fetch. Returns `false` if it was cancelled in the meantime,
    /// in which case nothing is stored.
    pub(crate) fn complete(
        &self,
        mut ticket: FetchTicket<'_>,
        response: Option<&ApiResponse>,
    ) -> bool {
        ticket.settled = true;
        let mut entries = self.entries.lock();
        entries.in_flight.remove(&ticket.id);
        if ticket.token.is_cancelled() {
            return false;
        }
        if let Some(response) = response {
            entries.ready.insert(
                ticket.key.clone(),
                Ready {
                    response: response.clone(),
                    stored_at: Instant::now(),
                },
            );
        }
        true
    }

    pub(crate) fn remove(&self, key: &ResourceKey) -> bool {
        self.entries.lock().ready.remove(key).is_some()
    }

    /// Drop ready entries and cancel in-flight fetches whose key matches.
    pub(crate) fn evict(&self, mut matches: impl FnMut(&ResourceKey) -> bool) -> Eviction {
        let mut entries = self.entries.lock();

        let before = entries.ready.len();
        entries.ready.retain(|key, _| !matches(key));
        let evicted = before - entries.ready.len();

        let mut cancelled = 0;
        entries.in_flight.retain(|_, fetch| {
            if matches(&fetch.key) {
                fetch.token.cancel();
                cancelled += 1;
                false
            } else {
                true
            }
        });

        Eviction { evicted, cancelled }
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.lock().ready.len()
    }

    pub(crate) fn in_flight(&self) -> usize {
        self.entries.lock().in_flight.len()
    }
}

// ---------------------------------------------------------------------------
// Stats
// ---------------------------------------------------------------------------

/// Hit/miss/cancel counters for the resource cache.
#[derive(Debug, Default)]
pub struct CacheStats {
    pub hits: AtomicU64,
    pub misses: AtomicU64,
    pub cancelled: AtomicU64,
}

impl CacheStats {
    pub fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_cancelled(&self) {
        self.cancelled.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> CacheStatsSnapshot {
        CacheStatsSnapshot {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            cancelled: self.cancelled.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStatsSnapshot {
    pub hits: u64,
    pub misses: u64,
    pub cancelled: u64,
}
