//! Single-flight session refresh.
//!
//! Every response passes through [`RefreshCoordinator::intercept`]. A 401 on
//! a request that has not been replayed yet parks the request in a queue; the
//! first such 401 also starts the one and only refresh call for the burst.
//! When the refresh settles, the whole queue is replayed (success) or
//! rejected (failure), and the coordinator is back to idle.
//!
//! ```text
//!   Idle ──401 (not retried)──▶ Refreshing ──refresh settles──▶ Idle
//!                                   │
//!                                   └─ further 401s are queued, not refreshed
//! ```
//!
//! State is a mutex-guarded [`RefreshState`] that is only touched at the two
//! transition points and never held across an `.await`. The refresh itself
//! runs on its own task, so a caller that gives up cannot leave the
//! coordinator stuck in `Refreshing`.

use futures::stream::{self, StreamExt};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use super::invalidation::InvalidationChannel;
use super::reporting::{ErrorContext, ErrorReporter, TracingReporter};
use crate::error::{Error, ErrorKind, Result};
use crate::transport::{ApiRequest, ApiResponse, Transport};

/// Endpoint that renews the session cookie.
pub const REFRESH_PATH: &str = "/auth/refresh";

/// Upper bound on replays in flight at once after a successful refresh.
pub const DEFAULT_MAX_CONCURRENT_REPLAYS: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshPhase {
    Idle,
    Refreshing,
}

/// A request waiting for the in-flight refresh, plus the means to settle
/// its caller.
struct PendingRequest {
    request: ApiRequest,
    settle: oneshot::Sender<Result<ApiResponse>>,
}

/// Invariant: `phase == Idle` implies `queue.is_empty()`.
struct RefreshState {
    phase: RefreshPhase,
    queue: Vec<PendingRequest>,
}

/// Coordinates session refresh for one client instance.
pub struct RefreshCoordinator {
    state: Mutex<RefreshState>,
    /// Re-issues queued requests. Same transport the client sends through.
    replay: Arc<dyn Transport>,
    /// Issues the refresh call. Must not be routed back through `intercept`.
    refresh: Arc<dyn Transport>,
    refresh_request: ApiRequest,
    invalidation: InvalidationChannel,
    reporter: Arc<dyn ErrorReporter>,
    max_concurrent_replays: usize,
    refresh_count: AtomicU64,
}

impl RefreshCoordinator {
    pub fn new(
        replay: Arc<dyn Transport>,
        refresh: Arc<dyn Transport>,
        invalidation: InvalidationChannel,
    ) -> Self {
        Self {
            state: Mutex::new(RefreshState {
                phase: RefreshPhase::Idle,
                queue: Vec::new(),
            }),
            replay,
            refresh,
            refresh_request: ApiRequest::post(REFRESH_PATH),
            invalidation,
            reporter: Arc::new(TracingReporter),
            max_concurrent_replays: DEFAULT_MAX_CONCURRENT_REPLAYS,
            refresh_count: AtomicU64::new(0),
        }
    }

    pub fn with_reporter(mut self, reporter: Arc<dyn ErrorReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    pub fn with_refresh_request(mut self, request: ApiRequest) -> Self {
        self.refresh_request = request;
        self
    }

    pub fn with_max_concurrent_replays(mut self, max: usize) -> Self {
        self.max_concurrent_replays = max.max(1);
        self
    }

    pub fn phase(&self) -> RefreshPhase {
        self.state.lock().phase
    }

    /// Requests currently waiting on the refresh.
    pub fn pending(&self) -> usize {
        self.state.lock().queue.len()
    }

    /// Refresh calls issued so far.
    pub fn refresh_count(&self) -> u64 {
        self.refresh_count.load(Ordering::SeqCst)
    }

    pub fn invalidation(&self) -> &InvalidationChannel {
        &self.invalidation
    }

    /// Inspect the outcome of `request` before it reaches the caller.
    ///
    /// Anything other than a 401 passes through untouched. A 401 on a
    /// request that was already replayed once also passes through; that is
    /// what stops a permanently rejected request from looping.
    pub async fn intercept(
        self: &Arc<Self>,
        request: ApiRequest,
        outcome: Result<ApiResponse>,
    ) -> Result<ApiResponse> {
        match outcome {
            Err(Error::Api {
                kind: ErrorKind::Unauthorized,
                ..
            }) if !request.is_retried() => self.enqueue(request.mark_retried()).await,
            Err(err @ Error::Api {
                kind: ErrorKind::Unauthorized,
                ..
            }) => {
                debug!(
                    path = request.path(),
                    "401 on an already replayed request, passing through"
                );
                Err(err)
            }
            other => other,
        }
    }

    async fn enqueue(self: &Arc<Self>, request: ApiRequest) -> Result<ApiResponse> {
        let path = request.path().to_string();
        let (settle, settled) = oneshot::channel();

        let start_refresh = {
            let mut state = self.state.lock();
            state.queue.push(PendingRequest { request, settle });
            match state.phase {
                RefreshPhase::Refreshing => false,
                RefreshPhase::Idle => {
                    state.phase = RefreshPhase::Refreshing;
                    true
                }
            }
        };

        if start_refresh {
            debug!(path = %path, "401 received, starting session refresh");
            let this = Arc::clone(self);
            tokio::spawn(async move { this.run_refresh().await });
        } else {
            debug!(path = %path, "Refresh in flight, request queued");
        }

        settled.await.unwrap_or_else(|_| Err(Error::Cancelled))
    }

    async fn run_refresh(&self) {
        let mut guard = PhaseGuard {
            state: &self.state,
            armed: true,
        };

        let attempt = self.refresh_count.fetch_add(1, Ordering::SeqCst) + 1;
        let outcome = self.refresh.send(&self.refresh_request).await;

        let queue = guard.settle();
        match outcome {
            Ok(_) => {
                info!(attempt, queued = queue.len(), "Session refreshed, replaying requests");
                self.replay_all(queue).await;
            }
            Err(err) => self.reject_all(queue, err),
        }
    }

    /// Replay concurrently, settle strictly in queue order.
    async fn replay_all(&self, queue: Vec<PendingRequest>) {
        let replays = queue.into_iter().map(|pending| {
            let transport = Arc::clone(&self.replay);
            let PendingRequest { request, settle } = pending;
            async move {
                let outcome = transport.send(&request).await;
                (request, settle, outcome)
            }
        });

        let mut settled = stream::iter(replays).buffered(self.max_concurrent_replays);
        while let Some((request, settle, outcome)) = settled.next().await {
            if let Err(err) = &outcome {
                debug!(path = request.path(), error = %err, "Replayed request failed");
            }
            if settle.send(outcome).is_err() {
                debug!(path = request.path(), "Caller went away before its replay settled");
            }
        }
    }

    fn reject_all(&self, queue: Vec<PendingRequest>, cause: Error) {
        let err = Error::RefreshFailed(Box::new(cause));
        warn!(queued = queue.len(), error = %err, "Session refresh failed");
        self.reporter.report(
            &err,
            &ErrorContext::for_error(
                "refresh_coordinator",
                format!("Session refresh failed, rejecting {} request(s)", queue.len()),
                &err,
            ),
        );

        // Invalidate before waking callers so they observe a cleared session.
        self.invalidation.emit();

        for pending in queue {
            let _ = pending.settle.send(Err(err.clone()));
        }
    }
}

impl std::fmt::Debug for RefreshCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("RefreshCoordinator")
            .field("phase", &state.phase)
            .field("pending", &state.queue.len())
            .field("refresh_count", &self.refresh_count())
            .field("refresh", &self.refresh.name())
            .finish()
    }
}

/// Returns the coordinator to `Idle` exactly once per refresh. If the
/// refresh task is torn down before it settles, dropping the guard resets
/// the phase and drops the queue, which settles every waiter with
/// [`Error::Cancelled`].
struct PhaseGuard<'a> {
    state: &'a Mutex<RefreshState>,
    armed: bool,
}

impl PhaseGuard<'_> {
    fn settle(&mut self) -> Vec<PendingRequest> {
        self.armed = false;
        let mut state = self.state.lock();
        state.phase = RefreshPhase::Idle;
        std::mem::take(&mut state.queue)
    }
}

impl Drop for PhaseGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            let queue = self.settle();
            warn!(dropped = queue.len(), "Refresh task aborted, releasing queued requests");
        }
    }
}
