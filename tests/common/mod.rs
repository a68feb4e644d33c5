#![allow(dead_code)]

use buddy_client::auth::{ErrorContext, ErrorReporter};
use buddy_client::models::{AuthResponse, Profile, ProfileType};
use buddy_client::storage::{MemoryStorage, UserStorage};
use buddy_client::{BuddyClient, Error};
use parking_lot::Mutex;
use std::sync::Arc;
use wiremock::{MockServer, Request, Respond, ResponseTemplate};

/// Replies 200 with `{"data": <request path>}` so each caller can check it
/// got its own response back.
pub struct EchoPath;

impl Respond for EchoPath {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_json(serde_json::json!({ "data": request.url.path() }))
    }
}

#[derive(Default)]
pub struct RecordingReporter {
    pub reports: Mutex<Vec<ErrorContext>>,
}

impl ErrorReporter for RecordingReporter {
    fn report(&self, _error: &Error, context: &ErrorContext) {
        self.reports.lock().push(context.clone());
    }
}

pub struct Harness {
    pub client: BuddyClient,
    pub medium: MemoryStorage,
    pub reporter: Arc<RecordingReporter>,
    pub visited: Arc<Mutex<Vec<String>>>,
}

pub fn harness(server: &MockServer) -> Harness {
    harness_with(server, MemoryStorage::new())
}

pub fn harness_with(server: &MockServer, medium: MemoryStorage) -> Harness {
    let reporter = Arc::new(RecordingReporter::default());
    let visited: Arc<Mutex<Vec<String>>> = Arc::default();
    let v = Arc::clone(&visited);

    let client = BuddyClient::builder(server.uri())
        .storage(UserStorage::new(Arc::new(medium.clone())))
        .reporter(reporter.clone())
        .navigator(Arc::new(move |to: &str| v.lock().push(to.to_string())))
        .build()
        .unwrap();

    Harness {
        client,
        medium,
        reporter,
        visited,
    }
}

pub fn login_body() -> serde_json::Value {
    let mut body = serde_json::to_value(AuthResponse::with_profiles(vec![Profile::new(
        "Shelter A",
        "d",
        ProfileType::Shelter,
    )]))
    .unwrap();
    body["accessToken"] = "header.payload.sig".into();
    body["refreshToken"] = "opaque".into();
    body
}

pub async fn requests_to(server: &MockServer, path: &str) -> usize {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|r| r.url.path() == path)
        .count()
}
