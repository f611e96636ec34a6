//! Error returned by the core `Tracker`.
//!
//! This is a closed tracker: the registry only ever contains torrents the
//! operator admitted, so the one domain error is an announce for an unknown
//! info-hash.
use std::panic::Location;

use depot_tracker_primitives::info_hash::InfoHash;

/// Error returned by the core `Tracker`.
#[derive(thiserror::Error, Debug, Clone)]
pub enum Error {
    #[error("the torrent {info_hash} is not tracked by this tracker, {location}")]
    UnknownTorrent {
        info_hash: InfoHash,
        location: &'static Location<'static>,
    },
}
