//! Job that starts the HTTP tracker server.
use std::net::SocketAddr;
use std::sync::Arc;

use tracing::info;

use crate::core::Tracker;
use crate::servers::http::server::{Error, HttpServer, Running};

/// It starts the HTTP tracker server on the given address and returns the
/// running server controller.
///
/// # Errors
///
/// Returns an [`Error`] when the listener cannot be bound; startup failures
/// are for the operator to see, never swallowed.
pub async fn start_job(bind_to: SocketAddr, tracker: Arc<Tracker>) -> Result<HttpServer<Running>, Error> {
    let server = HttpServer::new(bind_to).start(tracker).await?;

    info!("HTTP tracker job started on {}", server.state.bind_addr);

    Ok(server)
}
