//! reqwest-backed transport for the Buddy backend.

use async_trait::async_trait;
use reqwest::cookie::Jar;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use super::request::{ApiRequest, ApiResponse};
use super::Transport;
use crate::error::{Error, Result};

/// Default user agent.
pub const USER_AGENT: &str = concat!("buddy-client/", env!("CARGO_PKG_VERSION"));

/// Default connection timeout.
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default request timeout, applied uniformly to every request.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// HTTP transport.
///
/// The session is a server-managed http-only cookie, so every transport that
/// must see the same session shares one cookie [`Jar`]. Build the main
/// transport and the refresh transport from the same builder (or hand both
/// the same jar) and the refresh call will renew the cookie the main
/// transport sends.
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
    name: String,
}

impl HttpTransport {
    pub fn builder(base_url: impl Into<String>) -> HttpTransportBuilder {
        HttpTransportBuilder::new(base_url)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url_for(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: &ApiRequest) -> Result<ApiResponse> {
        let url = self.url_for(request.path());
        let mut builder = self.client.request(request.method().clone(), &url);
        if !request.query_params().is_empty() {
            builder = builder.query(request.query_params());
        }
        if let Some(body) = request.body() {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(|e| {
            warn!(
                transport = %self.name,
                method = %request.method(),
                path = request.path(),
                error = %e,
                "Request failed"
            );
            Error::from(e)
        })?;

        let status = response.status().as_u16();
        let body = response.bytes().await?;

        if response_is_success(status) {
            debug!(
                transport = %self.name,
                method = %request.method(),
                path = request.path(),
                status,
                "Request succeeded"
            );
            return Ok(ApiResponse::new(status, body));
        }

        let message = String::from_utf8_lossy(&body).into_owned();
        let err = Error::from_status(status, message);
        debug!(
            transport = %self.name,
            method = %request.method(),
            path = request.path(),
            status,
            kind = %err.kind(),
            "Request rejected"
        );
        Err(err)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

fn response_is_success(status: u16) -> bool {
    (200..300).contains(&status)
}

impl std::fmt::Debug for HttpTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpTransport")
            .field("name", &self.name)
            .field("base_url", &self.base_url)
            .finish()
    }
}

/// Builder for [`HttpTransport`].
#[derive(Clone)]
pub struct HttpTransportBuilder {
    base_url: String,
    user_agent: String,
    connect_timeout: Duration,
    request_timeout: Duration,
    cookie_jar: Arc<Jar>,
}

impl HttpTransportBuilder {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            user_agent: USER_AGENT.to_string(),
            connect_timeout: CONNECT_TIMEOUT,
            request_timeout: REQUEST_TIMEOUT,
            cookie_jar: Arc::new(Jar::default()),
        }
    }

    /// Set a custom user agent.
    pub fn user_agent(mut self, ua: impl Into<String>) -> Self {
        self.user_agent = ua.into();
        self
    }

    /// Set connection timeout.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set request timeout.
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Share an existing cookie jar.
    pub fn cookie_jar(mut self, jar: Arc<Jar>) -> Self {
        self.cookie_jar = jar;
        self
    }

    /// The cookie jar transports built from this builder will share.
    pub fn jar(&self) -> Arc<Jar> {
        Arc::clone(&self.cookie_jar)
    }

    /// Build a transport. `name` only shows up in logs.
    pub fn build(&self, name: impl Into<String>) -> Result<HttpTransport> {
        url::Url::parse(&self.base_url)
            .map_err(|e| Error::Config(format!("Invalid base URL '{}': {}", self.base_url, e)))?;

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .user_agent(self.user_agent.as_str())
            .connect_timeout(self.connect_timeout)
            .timeout(self.request_timeout)
            .default_headers(headers)
            .cookie_provider(Arc::clone(&self.cookie_jar))
            .build()
            .map_err(|e| Error::Config(format!("Failed to build HTTP client: {e}")))?;

        Ok(HttpTransport {
            client,
            base_url: self.base_url.clone(),
            name: name.into(),
        })
    }
}
