//! Responses of the HTTP tracker protocol.
//!
//! Every response, success or failure, is a bencoded body served as
//! `text/plain` with HTTP status `200`.
pub mod announce;
pub mod error;
