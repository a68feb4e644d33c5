//! HTTP client core and the top-level [`BuddyClient`] facade.

use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument};

use crate::api;
use crate::auth::{
    AuthOperations, ErrorReporter, InvalidationChannel, LogoutOptions, Navigator, NoopNavigator,
    RefreshCoordinator, Session, SessionStore, TracingReporter,
};
use crate::auth::coordinator::DEFAULT_MAX_CONCURRENT_REPLAYS;
use crate::cache::{ResourceCache, ResourceKey};
use crate::config::Config;
use crate::error::Result;
use crate::models::{
    AccountRequest, AuthRequest, ConfirmEmailRequest, Pet, PetPage, PetQuery,
    ResendVerificationRequest,
};
use crate::storage::{FileStorage, UserStorage};
use crate::transport::http::{CONNECT_TIMEOUT, REQUEST_TIMEOUT, USER_AGENT};
use crate::transport::{ApiRequest, ApiResponse, HttpTransport, Transport};

// ---------------------------------------------------------------------------
// ApiClient
// ---------------------------------------------------------------------------

/// Sends requests through the main transport, routing every outcome through
/// the [`RefreshCoordinator`]. Cheap to clone.
#[derive(Clone)]
pub struct ApiClient {
    transport: Arc<dyn Transport>,
    coordinator: Arc<RefreshCoordinator>,
    cache: ResourceCache,
}

impl ApiClient {
    pub fn new(transport: Arc<dyn Transport>, coordinator: Arc<RefreshCoordinator>) -> Self {
        Self {
            transport,
            coordinator,
            cache: ResourceCache::new(),
        }
    }

    /// Share `cache` with the session store so logout evicts what
    /// [`send_cached`](Self::send_cached) stored.
    pub fn with_cache(mut self, cache: ResourceCache) -> Self {
        self.cache = cache;
        self
    }

    /// Send a session-bound request. A 401 is recovered transparently
    /// (one refresh, one replay) unless the refresh itself fails.
    #[instrument(skip_all, fields(method = %request.method(), path = request.path()))]
    pub async fn send(&self, request: ApiRequest) -> Result<ApiResponse> {
        let outcome = self.transport.send(&request).await;
        self.coordinator.intercept(request, outcome).await
    }

    /// [`send`](Self::send) through the resource cache under `key`.
    ///
    /// Unless `key` has a public root, the response belongs to the session:
    /// it is evicted on logout or invalidation, and a fetch still running at
    /// that moment resolves to [`Error::Cancelled`](crate::Error::Cancelled).
    #[instrument(skip_all, fields(key = %key))]
    pub async fn send_cached(&self, key: ResourceKey, request: ApiRequest) -> Result<ApiResponse> {
        self.cache.fetch(key, self.send(request)).await
    }

    /// Send without the refresh interceptor.
    #[instrument(skip_all, fields(method = %request.method(), path = request.path()))]
    pub async fn send_direct(&self, request: ApiRequest) -> Result<ApiResponse> {
        self.transport.send(&request).await
    }

    /// [`send`](Self::send) and decode the JSON body.
    pub async fn send_json<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T> {
        self.send(request).await?.json()
    }

    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.send_json(ApiRequest::get(path)).await
    }

    pub fn coordinator(&self) -> &Arc<RefreshCoordinator> {
        &self.coordinator
    }

    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }

    pub fn cache(&self) -> &ResourceCache {
        &self.cache
    }
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("transport", &self.transport.name())
            .field("coordinator", &self.coordinator)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// BuddyClient
// ---------------------------------------------------------------------------

/// Everything a UI layer needs: auth flows, the session, and the endpoints.
///
/// Each instance owns its own refresh state, session store, cache, and
/// invalidation channel; two clients never share any of them.
pub struct BuddyClient {
    api: ApiClient,
    refresh_transport: Arc<dyn Transport>,
    session: Arc<SessionStore>,
    auth: AuthOperations,
    cache: ResourceCache,
    invalidation: InvalidationChannel,
}

impl BuddyClient {
    pub fn builder(base_url: impl Into<String>) -> BuddyClientBuilder {
        BuddyClientBuilder::new(base_url)
    }

    /// Build a client from loaded configuration, persisting the session
    /// under `storage.dir` unless storage is disabled.
    pub fn from_config(config: &Config) -> Result<Self> {
        let storage = if config.storage.enabled {
            UserStorage::new(Arc::new(FileStorage::new(&config.storage.dir)))
                .with_key(&config.storage.key)
        } else {
            UserStorage::unavailable().with_key(&config.storage.key)
        };
        Self::builder(&config.api.base_url)
            .user_agent(&config.api.user_agent)
            .request_timeout(config.api.timeout())
            .connect_timeout(config.api.connect_timeout())
            .storage(storage)
            .build()
    }

    pub async fn login(&self, credentials: &AuthRequest) -> Result<Session> {
        self.auth.login(credentials).await
    }

    pub async fn logout(&self, options: LogoutOptions) -> Result<()> {
        self.auth.logout(options).await
    }

    /// Renew the session cookie now, outside of any 401.
    pub async fn refresh_session(&self) -> Result<()> {
        api::auth::refresh(self.refresh_transport.as_ref()).await
    }

    pub async fn search_pets(&self, query: &PetQuery, page: u32, size: u32) -> Result<PetPage> {
        api::pets::search(&self.api, &self.cache, query, page, size).await
    }

    pub async fn pet(&self, id: &str) -> Result<Option<Pet>> {
        api::pets::by_id(&self.api, &self.cache, id).await
    }

    pub async fn register(&self, account: &AccountRequest) -> Result<()> {
        api::accounts::register(&self.api, account).await
    }

    pub async fn request_verification(&self, body: &ResendVerificationRequest) -> Result<()> {
        api::accounts::request_verification(&self.api, body).await
    }

    pub async fn confirm_verification(&self, body: &ConfirmEmailRequest) -> Result<()> {
        api::accounts::confirm_verification(&self.api, body).await
    }

    pub fn session(&self) -> &Arc<SessionStore> {
        &self.session
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    pub fn auth(&self) -> &AuthOperations {
        &self.auth
    }

    pub fn cache(&self) -> &ResourceCache {
        &self.cache
    }

    pub fn invalidation(&self) -> &InvalidationChannel {
        &self.invalidation
    }
}

impl std::fmt::Debug for BuddyClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BuddyClient")
            .field("api", &self.api)
            .field("session", &self.session)
            .field("cache", &self.cache)
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Builder for [`BuddyClient`].
pub struct BuddyClientBuilder {
    base_url: String,
    user_agent: String,
    connect_timeout: Duration,
    request_timeout: Duration,
    transport: Option<Arc<dyn Transport>>,
    refresh_transport: Option<Arc<dyn Transport>>,
    storage: UserStorage,
    cache: Option<ResourceCache>,
    reporter: Arc<dyn ErrorReporter>,
    navigator: Arc<dyn Navigator>,
    max_concurrent_replays: usize,
}

impl BuddyClientBuilder {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            user_agent: USER_AGENT.to_string(),
            connect_timeout: CONNECT_TIMEOUT,
            request_timeout: REQUEST_TIMEOUT,
            transport: None,
            refresh_transport: None,
            storage: UserStorage::unavailable(),
            cache: None,
            reporter: Arc::new(TracingReporter),
            navigator: Arc::new(NoopNavigator),
            max_concurrent_replays: DEFAULT_MAX_CONCURRENT_REPLAYS,
        }
    }

    pub fn user_agent(mut self, ua: impl Into<String>) -> Self {
        self.user_agent = ua.into();
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Use a custom main transport instead of HTTP.
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Use a custom refresh transport. It must not route back through
    /// the client's interceptor.
    pub fn refresh_transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.refresh_transport = Some(transport);
        self
    }

    /// Where the logged-in user is persisted. Defaults to no medium.
    pub fn storage(mut self, storage: UserStorage) -> Self {
        self.storage = storage;
        self
    }

    pub fn cache(mut self, cache: ResourceCache) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn reporter(mut self, reporter: Arc<dyn ErrorReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    pub fn navigator(mut self, navigator: Arc<dyn Navigator>) -> Self {
        self.navigator = navigator;
        self
    }

    pub fn max_concurrent_replays(mut self, max: usize) -> Self {
        self.max_concurrent_replays = max;
        self
    }

    /// Wire everything together and load the persisted session.
    pub fn build(self) -> Result<BuddyClient> {
        let (transport, refresh_transport) = self.transports()?;

        let invalidation = InvalidationChannel::new();
        let cache = self.cache.unwrap_or_default();

        let session = Arc::new(
            SessionStore::new(self.storage, cache.clone()).with_reporter(self.reporter.clone()),
        );
        session.attach(&invalidation);
        session.initialize();

        let coordinator = Arc::new(
            RefreshCoordinator::new(
                transport.clone(),
                refresh_transport.clone(),
                invalidation.clone(),
            )
            .with_reporter(self.reporter.clone())
            .with_max_concurrent_replays(self.max_concurrent_replays),
        );
        let api = ApiClient::new(transport, coordinator).with_cache(cache.clone());
        let auth = AuthOperations::new(api.clone(), session.clone())
            .with_navigator(self.navigator)
            .with_reporter(self.reporter);

        debug!(
            base_url = %self.base_url,
            authenticated = session.is_authenticated(),
            "Client ready"
        );

        Ok(BuddyClient {
            api,
            refresh_transport,
            session,
            auth,
            cache,
            invalidation,
        })
    }

    /// Main and refresh transports. Built-in HTTP transports share one
    /// cookie jar so both see the same session cookie.
    fn transports(&self) -> Result<(Arc<dyn Transport>, Arc<dyn Transport>)> {
        if let (Some(main), Some(refresh)) = (&self.transport, &self.refresh_transport) {
            return Ok((main.clone(), refresh.clone()));
        }

        let http = HttpTransport::builder(&self.base_url)
            .user_agent(&self.user_agent)
            .connect_timeout(self.connect_timeout)
            .request_timeout(self.request_timeout);

        let main: Arc<dyn Transport> = match &self.transport {
            Some(t) => t.clone(),
            None => Arc::new(http.build("main")?),
        };
        let refresh: Arc<dyn Transport> = match &self.refresh_transport {
            Some(t) => t.clone(),
            None => Arc::new(http.build("refresh")?),
        };
        Ok((main, refresh))
    }
}
