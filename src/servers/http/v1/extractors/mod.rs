//! Axum extractors for the HTTP tracker requests.
pub mod announce_request;
