//! Requests of the HTTP tracker protocol.
pub mod announce;
