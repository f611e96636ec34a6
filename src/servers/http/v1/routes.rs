//! HTTP tracker routes.
use std::sync::Arc;
use std::time::Duration;

use axum::http::{header, HeaderValue};
use axum::response::Response;
use axum::routing::get;
use axum::Router;
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::{DefaultMakeSpan, TraceLayer};
use tracing::Level;

use super::handlers::announce;
use crate::core::Tracker;
use crate::servers::http::SERVER_BANNER;

/// It builds the router for the HTTP tracker.
///
/// Only `/announce` is routed; axum's default fallback answers every other
/// path with a plain `404 Not Found`. Every response carries the
/// `Server: BitTorrent Tracker (<version>)` banner.
#[must_use]
pub fn router(tracker: Arc<Tracker>) -> Router {
    Router::new()
        .route("/announce", get(announce::handle).with_state(tracker))
        .layer(SetResponseHeaderLayer::overriding(
            header::SERVER,
            HeaderValue::from_static(SERVER_BANNER),
        ))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(|response: &Response, latency: Duration, _span: &tracing::Span| {
                    tracing::info!(status = %response.status(), latency_ms = %latency.as_millis(), "response");
                }),
        )
}
