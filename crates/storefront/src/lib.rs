//! MSgrocery Storefront library.
//!
//! JSON API for carts, orders, addresses and seller product listings, plus
//! the background consumer that persists placed orders. The binary in
//! `main.rs` wires these parts to `PostgreSQL` and the image CDN; tests wire
//! them to [`db::MemoryStore`].
//!
//! # Order flow
//!
//! ```text
//! POST /api/order/create
//!   -> PricingEngine (catalog lookup per item, 2% tax)
//!   -> EventBus::publish(order/created)      <- order accepted here
//!   -> CartStore::clear (best effort)
//!   -> 201 {amount}
//!
//! run_consumer(EventStream)
//!   -> batches of up to 5 events / 5 s
//!   -> OrderRepository::insert_many (idempotent on event_id)
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod events;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;

use std::time::Duration;

use axum::Router;
use tower_http::trace::{DefaultOnResponse, OnResponse, TraceLayer};
use tracing::Span;

use state::AppState;

/// Build the full application router with its middleware stack.
pub fn app(state: AppState) -> Router {
    Router::new()
        .merge(routes::routes())
        .layer(axum::middleware::from_fn(middleware::request_id_middleware))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &axum::http::Request<_>| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        uri = %request.uri(),
                        request_id = tracing::field::Empty,
                        user_id = tracing::field::Empty,
                        status = tracing::field::Empty,
                        latency_ms = tracing::field::Empty,
                    )
                })
                .on_response(
                    |response: &axum::http::Response<_>, latency: Duration, span: &Span| {
                        span.record("status", response.status().as_u16());
                        span.record(
                            "latency_ms",
                            u64::try_from(latency.as_millis()).unwrap_or(u64::MAX),
                        );
                        DefaultOnResponse::default().on_response(response, latency, span);
                    },
                ),
        )
        .with_state(state)
        // Sentry layers (outermost for full request coverage)
        .layer(sentry_tower::NewSentryLayer::new_from_top())
        .layer(sentry_tower::SentryHttpLayer::new().enable_transaction())
}
