//! Transport layer: the only place that talks to the network.
//!
//! A [`Transport`] sends one [`ApiRequest`] and classifies the outcome.
//! Transports never retry and never intercept; session recovery lives one
//! layer up in [`crate::auth::RefreshCoordinator`].

pub mod http;
pub mod request;

use async_trait::async_trait;

pub use http::{HttpTransport, HttpTransportBuilder};
pub use request::{ApiRequest, ApiResponse};

use crate::error::Result;

/// Sends requests to the Buddy backend.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send a request.
    ///
    /// Returns `Ok` only for 2xx responses. Every other status is turned
    /// into [`Error::Api`](crate::Error::Api) with its
    /// [`ErrorKind`](crate::ErrorKind) already assigned.
    async fn send(&self, request: &ApiRequest) -> Result<ApiResponse>;

    /// Name of this transport, for logs.
    fn name(&self) -> &str {
        "unknown"
    }
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for std::sync::Arc<T> {
    async fn send(&self, request: &ApiRequest) -> Result<ApiResponse> {
        (**self).send(request).await
    }
    fn name(&self) -> &str {
        (**self).name()
    }
}
