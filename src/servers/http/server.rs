//! The HTTP tracker server lifecycle.
//!
//! [`HttpServer`] is a state machine: a server in the
//! [`Stopped`] state can be started, which consumes it and yields one in
//! the [`Running`] state; stopping the running server yields a stopped one
//! again, with the same configuration.
//!
//! ```text
//! STOPPED --start()--> RUNNING --stop()--> STOPPED
//! ```
//!
//! Starting binds the listener (surfacing bind failures to the operator)
//! and stopping closes it gracefully: in-flight requests are allowed to
//! complete.
use std::net::SocketAddr;
use std::sync::Arc;

use futures::future::BoxFuture;
use thiserror::Error;
use tracing::info;

use super::v1::routes::router;
use crate::core::Tracker;

/// Error raised while starting up or shutting down the HTTP tracker.
#[derive(Error, Debug)]
pub enum Error {
    /// The listener could not be bound.
    #[error("could not bind http tracker to {addr}: {source}")]
    CouldNotBind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    /// The shutdown signal channel was already closed.
    #[error("the server task is already gone")]
    AlreadyStopped,
}

/// A stopped HTTP tracker server.
pub type StoppedHttpServer = HttpServer<Stopped>;

/// A running HTTP tracker server.
pub type RunningHttpServer = HttpServer<Running>;

/// The HTTP tracker server state machine. Holds the bind configuration and
/// the current state, `Stopped` or `Running`.
pub struct HttpServer<S> {
    /// The address the server binds to when started. Port `0` asks the OS
    /// for a random free port; the actually bound address is available in
    /// the running state.
    pub bind_to: SocketAddr,
    /// The state of the server: `running` or `stopped`.
    pub state: S,
}

/// A stopped HTTP server state.
pub struct Stopped;

/// A running HTTP server state.
pub struct Running {
    /// The address the listener is actually bound to.
    pub bind_addr: SocketAddr,
    halt_task: tokio::sync::oneshot::Sender<()>,
    task: tokio::task::JoinHandle<()>,
}

impl HttpServer<Stopped> {
    #[must_use]
    pub fn new(bind_to: SocketAddr) -> Self {
        Self {
            bind_to,
            state: Stopped,
        }
    }

    /// It starts the server, returning the controller in `running` state.
    ///
    /// # Errors
    ///
    /// Returns an [`Error`] when the listener cannot be bound. This is the
    /// startup failure surfaced to the operator.
    pub async fn start(self, tracker: Arc<Tracker>) -> Result<HttpServer<Running>, Error> {
        let listener = tokio::net::TcpListener::bind(self.bind_to)
            .await
            .map_err(|source| Error::CouldNotBind {
                addr: self.bind_to,
                source,
            })?;

        let bind_addr = listener.local_addr().map_err(|source| Error::CouldNotBind {
            addr: self.bind_to,
            source,
        })?;

        let (shutdown_sender, shutdown_receiver) = tokio::sync::oneshot::channel::<()>();

        let task = tokio::spawn(serve(listener, tracker, shutdown_receiver));

        info!("HTTP tracker bound to http://{bind_addr}/announce");

        Ok(HttpServer {
            bind_to: self.bind_to,
            state: Running {
                bind_addr,
                halt_task: shutdown_sender,
                task,
            },
        })
    }
}

impl HttpServer<Running> {
    /// It stops the server gracefully, returning the controller in
    /// `stopped` state. In-flight requests are allowed to complete.
    ///
    /// # Errors
    ///
    /// Returns an [`Error`] when the server task is already gone.
    pub async fn stop(self) -> Result<HttpServer<Stopped>, Error> {
        self.state.halt_task.send(()).map_err(|()| Error::AlreadyStopped)?;

        self.state.task.await.map_err(|_| Error::AlreadyStopped)?;

        info!("HTTP tracker on {} stopped", self.state.bind_addr);

        Ok(HttpServer {
            bind_to: self.bind_to,
            state: Stopped,
        })
    }
}

/// Serves the tracker routes on the bound listener until the shutdown
/// signal fires.
fn serve(
    listener: tokio::net::TcpListener,
    tracker: Arc<Tracker>,
    shutdown_receiver: tokio::sync::oneshot::Receiver<()>,
) -> BoxFuture<'static, ()> {
    let app = router(tracker);

    Box::pin(async move {
        axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
            .with_graceful_shutdown(async move {
                // Either an explicit stop or a dropped controller shuts
                // the server down.
                drop(shutdown_receiver.await);
            })
            .await
            .expect("the axum server should not fail");
    })
}
