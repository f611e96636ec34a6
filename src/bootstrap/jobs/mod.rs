//! Long-running jobs started by the application.
pub mod http_tracker;
pub mod peer_cleanup;
