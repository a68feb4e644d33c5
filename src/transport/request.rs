//! Replayable request and buffered response types.

use bytes::Bytes;
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{Error, Result};

/// A request that can be sent, and re-sent, by a [`Transport`](super::Transport).
///
/// Everything needed to replay the request after a session refresh is owned
/// here, including the single-retry marker.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    method: Method,
    path: String,
    query: Vec<(String, String)>,
    body: Option<serde_json::Value>,
    retried: bool,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
            retried: false,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    /// Attach a JSON body.
    pub fn json<T: Serialize + ?Sized>(mut self, body: &T) -> Result<Self> {
        let value = serde_json::to_value(body)
            .map_err(|e| Error::InvalidRequest(format!("Unserializable body: {e}")))?;
        self.body = Some(value);
        Ok(self)
    }

    /// Append a query parameter.
    pub fn query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((name.into(), value.into()));
        self
    }

    /// Append several query parameters.
    pub fn query_pairs<I, K, V>(mut self, pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.query
            .extend(pairs.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn query_params(&self) -> &[(String, String)] {
        &self.query
    }

    pub fn body(&self) -> Option<&serde_json::Value> {
        self.body.as_ref()
    }

    /// Whether this request has already been replayed after a refresh.
    pub fn is_retried(&self) -> bool {
        self.retried
    }

    /// Mark the request as replayed. A retried request is never retried again.
    pub fn mark_retried(mut self) -> Self {
        self.retried = true;
        self
    }
}

/// A successful response, fully buffered.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    status: u16,
    body: Bytes,
}

impl ApiResponse {
    pub fn new(status: u16, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn bytes(&self) -> &Bytes {
        &self.body
    }

    pub fn is_empty(&self) -> bool {
        self.body.is_empty()
    }

    /// Body as UTF-8 text (lossy).
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Decode the body as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_slice(&self.body).map_err(Error::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mark_retried_preserves_request() {
        let request = ApiRequest::post("/adoptions")
            .query("page", "2")
            .json(&serde_json::json!({"petId": "7"}))
            .unwrap();
        assert!(!request.is_retried());

        let retried = request.clone().mark_retried();
        assert!(retried.is_retried());
        assert_eq!(retried.path(), request.path());
        assert_eq!(retried.method(), request.method());
        assert_eq!(retried.body(), request.body());
        assert_eq!(retried.query_params(), request.query_params());
    }

    #[test]
    fn test_response_json() {
        let response = ApiResponse::new(200, r#"{"data":"result1"}"#);
        let value: serde_json::Value = response.json().unwrap();
        assert_eq!(value["data"], "result1");
        assert_eq!(response.text(), r#"{"data":"result1"}"#);

        let err = ApiResponse::new(200, "not json")
            .json::<serde_json::Value>()
            .unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::ValidationError);
    }
}
