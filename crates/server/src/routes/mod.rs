//! HTTP route handlers.
//!
//! # Route Structure
//!
//! ```text
//! GET    /health                      - Liveness check
//! GET    /health/ready                - Readiness check (store reachable)
//!
//! # Reviews
//! GET    /reviews/most-used-words     - Word counts (?limit=N, default 1000)
//! POST   /reviews                     - Create review (bearer token)
//! PUT    /reviews/current-review      - Edit own review (bearer token)
//! DELETE /reviews/{id}                - Delete own review (bearer token)
//! ```
//!
//! Review routes answer with and without a trailing slash.

pub mod health;
pub mod reviews;

use std::time::Duration;

use axum::{
    Router,
    http::{Request, Response},
    middleware,
    routing::{delete, get, post, put},
};
use tower_http::trace::{DefaultOnResponse, OnResponse, TraceLayer};
use tracing::Span;

use crate::middleware::{request_id_middleware, security_headers_middleware};
use crate::state::AppState;

/// Create the review routes router.
pub fn review_routes() -> Router<AppState> {
    Router::new()
        .route("/reviews", post(reviews::add_review))
        .route("/reviews/", post(reviews::add_review))
        .route("/reviews/most-used-words", get(reviews::most_used_words))
        .route("/reviews/most-used-words/", get(reviews::most_used_words))
        .route("/reviews/current-review", put(reviews::edit_review))
        .route("/reviews/current-review/", put(reviews::edit_review))
        .route("/reviews/{id}", delete(reviews::delete_review))
}

/// Create all routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health::health))
        .route("/health/ready", get(health::readiness))
        .merge(review_routes())
}

/// Build the application router with its middleware stack and state.
pub fn app(state: AppState) -> Router {
    routes()
        .layer(middleware::from_fn(security_headers_middleware))
        .layer(middleware::from_fn(request_id_middleware))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &Request<_>| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        uri = %request.uri(),
                        request_id = tracing::field::Empty,
                        status = tracing::field::Empty,
                        latency_ms = tracing::field::Empty,
                    )
                })
                .on_response(|response: &Response<_>, latency: Duration, span: &Span| {
                    span.record("status", response.status().as_u16());
                    span.record(
                        "latency_ms",
                        u64::try_from(latency.as_millis()).unwrap_or(u64::MAX),
                    );
                    DefaultOnResponse::default().on_response(response, latency, span);
                }),
        )
        .with_state(state)
}
