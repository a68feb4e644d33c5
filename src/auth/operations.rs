//! Login and fail-safe logout.
//!
//! Logout always succeeds locally. The server call is attempted first, but
//! whatever it returns the session is cleared and the redirect (if any) is
//! followed; a server failure is reported and handed back to the caller
//! only after local state is gone. The server session expires on its own.

use std::sync::Arc;
use tracing::{debug, info};

use super::reporting::{ErrorContext, ErrorReporter, TracingReporter};
use super::session::{Session, SessionStore};
use crate::api;
use crate::client::ApiClient;
use crate::error::Result;
use crate::models::AuthRequest;

/// Moves the user somewhere after an auth transition.
pub trait Navigator: Send + Sync {
    fn navigate(&self, to: &str);
}

impl<F> Navigator for F
where
    F: Fn(&str) + Send + Sync,
{
    fn navigate(&self, to: &str) {
        self(to)
    }
}

/// Navigator for headless use. Logs and does nothing else.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopNavigator;

impl Navigator for NoopNavigator {
    fn navigate(&self, to: &str) {
        debug!(to, "Navigation requested");
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogoutOptions {
    /// Where to send the user once local state is cleared.
    pub redirect_to: Option<String>,
}

impl LogoutOptions {
    pub fn redirect(to: impl Into<String>) -> Self {
        Self {
            redirect_to: Some(to.into()),
        }
    }
}

/// Auth flows the UI calls.
#[derive(Clone)]
pub struct AuthOperations {
    client: ApiClient,
    session: Arc<SessionStore>,
    navigator: Arc<dyn Navigator>,
    reporter: Arc<dyn ErrorReporter>,
}

impl AuthOperations {
    pub fn new(client: ApiClient, session: Arc<SessionStore>) -> Self {
        Self {
            client,
            session,
            navigator: Arc::new(NoopNavigator),
            reporter: Arc::new(TracingReporter),
        }
    }

    pub fn with_navigator(mut self, navigator: Arc<dyn Navigator>) -> Self {
        self.navigator = navigator;
        self
    }

    pub fn with_reporter(mut self, reporter: Arc<dyn ErrorReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    /// Log in and record the returned profiles.
    ///
    /// On failure the session is left as it was.
    pub async fn login(&self, credentials: &AuthRequest) -> Result<Session> {
        let response = api::auth::login(&self.client, credentials).await?;
        let session = self.session.set_auth_user(&response);
        info!(
            profiles = response.profiles.len(),
            persisted = session.storage_error.is_none(),
            "Logged in"
        );
        Ok(session)
    }

    /// Log out. Local state is cleared and the redirect followed no matter
    /// what the server says; the server's error, if any, is returned after.
    pub async fn logout(&self, options: LogoutOptions) -> Result<()> {
        let outcome = api::auth::logout(&self.client).await;

        if let Err(err) = &outcome {
            self.reporter.report(
                err,
                &ErrorContext::for_error(
                    "logout",
                    "Logout API failed, proceeding with local logout",
                    err,
                ),
            );
        }

        self.session.clear_auth_state();
        if let Some(to) = options.redirect_to.as_deref() {
            self.navigator.navigate(to);
        }

        if outcome.is_ok() {
            info!("Logged out");
        }
        outcome
    }

    pub fn session(&self) -> &Arc<SessionStore> {
        &self.session
    }
}

impl std::fmt::Debug for AuthOperations {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthOperations")
            .field("session", &self.session)
            .finish_non_exhaustive()
    }
}
