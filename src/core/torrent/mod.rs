//! The torrent registry: every torrent this tracker accepts announces for.
//!
//! The registry is a lock-free ordered map so announce lookups never
//! contend with each other; each entry guards its own peer table with a
//! mutex, so mutations serialize per torrent and never across torrents.
//! Admission is serialized against itself with a dedicated lock.
pub mod entry;
pub mod peer_list;

use std::sync::{Arc, Mutex};

use crossbeam_skiplist::SkipMap;
use depot_metainfo::Metainfo;
use depot_tracker_primitives::info_hash::InfoHash;
use depot_tracker_primitives::DurationSinceUnixEpoch;

pub use self::entry::TrackedTorrent;

/// Shared handle to one tracked torrent.
pub type TrackedTorrentHandle = Arc<Mutex<TrackedTorrent>>;

/// Concurrent registry of tracked torrents, keyed by info-hash.
#[derive(Default)]
pub struct Torrents {
    torrents: SkipMap<InfoHash, TrackedTorrentHandle>,
    admission: Mutex<()>,
}

impl Torrents {
    /// Admits a torrent. Returns `false` when the info-hash was already
    /// tracked; the existing swarm is kept in that case.
    pub fn admit(&self, metainfo: Arc<Metainfo>) -> bool {
        let _admission = self.admission.lock().expect("the admission lock should not be poisoned");

        if self.torrents.contains_key(&metainfo.info_hash()) {
            return false;
        }

        let info_hash = metainfo.info_hash();
        self.torrents
            .insert(info_hash, Arc::new(Mutex::new(TrackedTorrent::new(metainfo))));

        true
    }

    #[must_use]
    pub fn get(&self, info_hash: &InfoHash) -> Option<TrackedTorrentHandle> {
        self.torrents.get(info_hash).map(|entry| entry.value().clone())
    }

    #[must_use]
    pub fn contains(&self, info_hash: &InfoHash) -> bool {
        self.torrents.contains_key(info_hash)
    }

    pub fn remove(&self, info_hash: &InfoHash) -> Option<TrackedTorrentHandle> {
        self.torrents.remove(info_hash).map(|entry| entry.value().clone())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.torrents.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.torrents.is_empty()
    }

    /// The info-hashes of every tracked torrent, in key order.
    #[must_use]
    pub fn info_hashes(&self) -> Vec<InfoHash> {
        self.torrents.iter().map(|entry| *entry.key()).collect()
    }

    /// Removes stale peers from every torrent. Each entry is locked only
    /// for its own sweep, so announces for other torrents are not blocked.
    pub fn remove_inactive_peers(&self, cutoff: DurationSinceUnixEpoch) {
        for entry in &self.torrents {
            entry
                .value()
                .lock()
                .expect("a torrent entry lock should not be poisoned")
                .remove_inactive_peers(cutoff);
        }
    }
}
