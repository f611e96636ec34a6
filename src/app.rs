//! The tracker application: starts every service and tears them down
//! again.
//!
//! Jobs started:
//!
//! - The HTTP tracker server (the `announce` endpoint).
//! - The peer cleanup job (the reaper).
//!
//! On startup the application also admits the operator's torrents: every
//! `*.torrent` file found in the configured `torrents_dir` is parsed and
//! announced to the (closed) tracker. A file that fails to parse is logged
//! and skipped; it never takes the service down.
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use depot_metainfo::Metainfo;
use depot_tracker_configuration::Configuration;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::bootstrap::jobs::{http_tracker, peer_cleanup};
use crate::core::Tracker;
use crate::servers::http::server::{HttpServer, Running as RunningState};

/// The running application: the started services and their tracker.
pub struct Running {
    pub tracker: Arc<Tracker>,
    pub http_server: HttpServer<RunningState>,
    reaper: JoinHandle<()>,
    reaper_stop: tokio::sync::oneshot::Sender<()>,
}

impl Running {
    /// The address the announce endpoint is listening on.
    #[must_use]
    pub fn bind_addr(&self) -> std::net::SocketAddr {
        self.http_server.state.bind_addr
    }

    /// Stops every service: signals the reaper, closes the listener and
    /// waits for in-flight requests to complete.
    ///
    /// # Errors
    ///
    /// Returns an error when the HTTP server was already gone.
    pub async fn stop(self) -> anyhow::Result<()> {
        drop(self.reaper_stop.send(()));

        self.http_server.stop().await.context("failed to stop the HTTP tracker")?;
        drop(self.reaper.await);

        info!("tracker stopped");

        Ok(())
    }
}

/// Starts the whole application from its configuration.
///
/// # Errors
///
/// Returns an error when the bind address is invalid or the listener
/// cannot be bound.
pub async fn start(config: &Configuration) -> anyhow::Result<Running> {
    let tracker = Arc::new(Tracker::new(config));

    if let Some(torrents_dir) = &config.torrents_dir {
        admit_torrents_from_dir(&tracker, torrents_dir);
    }

    let (reaper_stop, reaper_stop_receiver) = tokio::sync::oneshot::channel();
    let reaper = peer_cleanup::start_job(
        Duration::from_secs(config.inactive_peer_cleanup_interval),
        &tracker,
        reaper_stop_receiver,
    );

    let bind_to = config.bind_address().context("invalid bind address")?;
    let http_server = http_tracker::start_job(bind_to, tracker.clone())
        .await
        .context("failed to start the HTTP tracker")?;

    Ok(Running {
        tracker,
        http_server,
        reaper,
        reaper_stop,
    })
}

/// Admits every `*.torrent` file found in the directory.
fn admit_torrents_from_dir(tracker: &Tracker, torrents_dir: &Path) {
    let entries = match std::fs::read_dir(torrents_dir) {
        Ok(entries) => entries,
        Err(err) => {
            warn!("cannot read torrents dir {}: {err}", torrents_dir.display());
            return;
        }
    };

    for entry in entries.flatten() {
        let path = entry.path();

        if path.extension().and_then(|ext| ext.to_str()) != Some("torrent") {
            continue;
        }

        match Metainfo::load(&path, true) {
            Ok(metainfo) => {
                let info_hash = metainfo.info_hash();
                let name = metainfo.name();
                if tracker.announce_torrent(metainfo) {
                    info!("tracking {name} ({info_hash})");
                }
            }
            Err(err) => warn!("skipping {}: {err}", path.display()),
        }
    }
}
