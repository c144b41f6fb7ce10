//! Integration tests for Review Desk.
//!
//! Tests drive the full router (middleware included) in-process with
//! `tower::ServiceExt::oneshot`, backed by the in-memory store, so no
//! database or network is needed.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p review-desk-integration-tests
//! ```

use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{HeaderMap, Method, Request, StatusCode, header},
};
use serde_json::Value;
use tower::ServiceExt;

use review_desk_core::ProfileName;
use review_desk_server::config::ServerConfig;
use review_desk_server::db::{MemoryStore, Store};
use review_desk_server::routes;
use review_desk_server::state::AppState;

/// Token secret used by every test server.
pub const TEST_TOKEN_SECRET: &str = "aB3$xY9!mK2@nL5#pQ7&rT0*uW4^zC6d";

/// A response reduced to what tests assert on.
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    /// JSON body, or the raw text as a JSON string if the body is not JSON.
    pub body: Value,
}

/// An in-process server with an empty in-memory store.
pub struct TestContext {
    pub state: AppState,
    pub store: MemoryStore,
    router: Router,
}

impl TestContext {
    /// Build a fresh server.
    ///
    /// # Panics
    ///
    /// Panics if the test configuration is rejected.
    #[must_use]
    pub fn new() -> Self {
        let config = ServerConfig::from_lookup(|key: &str| {
            (key == "REVIEWS_TOKEN_SECRET").then(|| TEST_TOKEN_SECRET.to_string())
        })
        .expect("test configuration is valid");

        let store = MemoryStore::new();
        let shared: Arc<dyn Store> = Arc::new(store.clone());
        let state = AppState::new(config, shared).expect("test token secret is valid");
        let router = routes::app(state.clone());

        Self {
            state,
            store,
            router,
        }
    }

    /// Create a user and return a bearer token for them.
    ///
    /// # Panics
    ///
    /// Panics if the profile name is invalid or already taken.
    pub async fn create_user(&self, profile_name: &str) -> String {
        let profile_name = ProfileName::parse(profile_name).expect("valid profile name");

        let mut tx = self.store.begin().await.expect("store is available");
        tx.create_user(&profile_name)
            .await
            .expect("profile name is free");
        tx.commit().await.expect("commit succeeds");

        self.state.tokens().issue(&profile_name)
    }

    /// Send a request through the router.
    ///
    /// # Panics
    ///
    /// Panics if the request cannot be built or the body cannot be read.
    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let body = match body {
            Some(json) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };

        self.send_request(builder.body(body).expect("request is valid"))
            .await
    }

    /// Send a prebuilt request through the router.
    ///
    /// # Panics
    ///
    /// Panics if the body cannot be read.
    pub async fn send_request(&self, request: Request<Body>) -> TestResponse {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible");

        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body is readable");
        let body = serde_json::from_slice(&bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()));

        TestResponse {
            status,
            headers,
            body,
        }
    }
}

impl Default for TestContext {
    fn default() -> Self {
        Self::new()
    }
}
