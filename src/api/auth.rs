//! `/auth/*` endpoints.

use tracing::instrument;

use super::require;
use crate::auth::coordinator::REFRESH_PATH;
use crate::client::ApiClient;
use crate::error::Result;
use crate::models::{AuthRequest, AuthResponse};
use crate::transport::{ApiRequest, Transport};

pub const LOGIN_PATH: &str = "/auth/login";
pub const LOGOUT_PATH: &str = "/auth/logout";

/// Exchange credentials for a session.
///
/// Goes through the interceptor like every session-bound call. A 401 from
/// bad credentials therefore costs one refresh attempt; if that refresh
/// fails the caller sees [`Error::RefreshFailed`](crate::Error::RefreshFailed)
/// wrapping a 401.
#[instrument(skip_all, fields(email = %credentials.email))]
pub async fn login(client: &ApiClient, credentials: &AuthRequest) -> Result<AuthResponse> {
    require("email", &credentials.email)?;
    require("password", &credentials.password)?;

    let request = ApiRequest::post(LOGIN_PATH).json(credentials)?;
    client.send(request).await?.json()
}

/// End the server session. Goes through the interceptor, so an expired
/// session is refreshed once before the logout is retried.
#[instrument(skip_all)]
pub async fn logout(client: &ApiClient) -> Result<()> {
    client.send(ApiRequest::post(LOGOUT_PATH)).await.map(|_| ())
}

/// Renew the session cookie.
///
/// Takes the bare transport on purpose: this is the call the refresh
/// coordinator makes, and it must never be intercepted itself.
#[instrument(skip_all, fields(transport = transport.name()))]
pub async fn refresh(transport: &dyn Transport) -> Result<()> {
    transport.send(&ApiRequest::post(REFRESH_PATH)).await.map(|_| ())
}
