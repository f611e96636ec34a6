//! Job that sweeps the torrent registry on an interval to remove stale
//! peers.
//!
//! A peer is stale when it has not announced for more than the configured
//! `max_peer_timeout`. The sweep locks one torrent at a time, so announces
//! for other torrents are never blocked by it.
//!
//! The job exits promptly when a shutdown is signalled (ctrl-c, the stop
//! channel, or the task being aborted) or when the tracker itself has been
//! dropped.
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::task::JoinHandle;

use crate::core::Tracker;

/// It starts the peer cleanup job, sweeping every
/// `inactive_peer_cleanup_interval` seconds.
#[must_use]
pub fn start_job(interval: Duration, tracker: &Arc<Tracker>, stop: tokio::sync::oneshot::Receiver<()>) -> JoinHandle<()> {
    let weak_tracker = Arc::downgrade(tracker);

    tokio::spawn(async move {
        let mut interval = tokio::time::interval(interval);
        // The first tick fires immediately; skip it so a fresh start does
        // not sweep an empty registry.
        interval.tick().await;

        tokio::pin!(stop);

        loop {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("stopping peer cleanup job");
                    break;
                }
                _ = &mut stop => {
                    tracing::info!("stopping peer cleanup job");
                    break;
                }
                _ = interval.tick() => {
                    let Some(tracker) = weak_tracker.upgrade() else {
                        break;
                    };

                    let start_time = Utc::now().time();
                    tracker.cleanup_torrents();
                    tracing::debug!(
                        "cleaned up stale peers in {}ms",
                        (Utc::now().time() - start_time).num_milliseconds()
                    );
                }
            }
        }
    })
}
