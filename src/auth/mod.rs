//! Session lifecycle: refresh coordination, the session store, and the
//! login/logout flows built on them.
//!
//! ```text
//! AuthOperations ──▶ ApiClient ──▶ RefreshCoordinator (401s)
//!        │                               │ refresh failed
//!        ▼                               ▼
//!   SessionStore ◀──────────── InvalidationChannel
//! ```

pub mod coordinator;
pub mod invalidation;
pub mod operations;
pub mod reporting;
pub mod session;

pub use coordinator::{RefreshCoordinator, RefreshPhase, REFRESH_PATH};
pub use invalidation::{InvalidationChannel, InvalidationListener, Subscription};
pub use operations::{AuthOperations, LogoutOptions, Navigator, NoopNavigator};
pub use reporting::{ErrorContext, ErrorReporter, TracingReporter};
pub use session::{Session, SessionStore};
