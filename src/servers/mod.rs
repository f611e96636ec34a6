//! Delivery layer: the servers exposing the core tracker to peers.
pub mod http;
