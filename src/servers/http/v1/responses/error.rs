//! `Error` response for the HTTP tracker.
//!
//! From [BEP 03. The `BitTorrent` Protocol Specification](https://www.bittorrent.org/beps/bep_0003.html):
//!
//! _"If a tracker response has a key failure reason, then that maps to a
//! human readable string which explains why the query failed, and no other
//! keys are required."_
//!
//! Error responses are bencoded and always have a `200 OK` status code;
//! `BitTorrent` clients do not look at the HTTP status for protocol-level
//! outcomes.
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use serde::Serialize;

/// `Error` response for the HTTP tracker.
#[derive(Serialize, Debug, PartialEq, Eq)]
pub struct Error {
    /// Human readable string which explains why the request failed.
    #[serde(rename = "failure reason")]
    pub failure_reason: String,
}

impl Error {
    /// Returns the bencoded representation of the error.
    ///
    /// ```rust
    /// use depot_tracker::servers::http::v1::responses::error::Error;
    ///
    /// let err = Error {
    ///    failure_reason: "error message".to_owned(),
    /// };
    ///
    /// assert_eq!(err.write(), "d14:failure reason13:error messagee");
    /// ```
    ///
    /// # Panics
    ///
    /// Never panics: a string-only struct always bencodes.
    #[must_use]
    pub fn write(&self) -> String {
        serde_bencode::to_string(&self).unwrap()
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain")],
            self.write(),
        )
            .into_response()
    }
}

impl From<crate::core::error::Error> for Error {
    fn from(err: crate::core::error::Error) -> Self {
        Error {
            failure_reason: format!("Tracker error: {err}"),
        }
    }
}
