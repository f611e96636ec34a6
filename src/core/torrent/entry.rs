//! One torrent admitted to the tracker: its metainfo plus its swarm.
use std::net::SocketAddr;
use std::sync::Arc;

use depot_metainfo::Metainfo;
use depot_tracker_primitives::announce_event::AnnounceEvent;
use depot_tracker_primitives::swarm_metadata::SwarmMetadata;
use depot_tracker_primitives::{peer, DurationSinceUnixEpoch};

use super::peer_list::PeerList;

/// A torrent tracked by this tracker, owning the peer table for its swarm.
#[derive(Debug)]
pub struct TrackedTorrent {
    metainfo: Arc<Metainfo>,
    peers: PeerList,
}

impl TrackedTorrent {
    #[must_use]
    pub fn new(metainfo: Arc<Metainfo>) -> TrackedTorrent {
        TrackedTorrent {
            metainfo,
            peers: PeerList::default(),
        }
    }

    #[must_use]
    pub fn metainfo(&self) -> &Arc<Metainfo> {
        &self.metainfo
    }

    /// Applies one announce to the peer table.
    ///
    /// | Event     | Peer unknown            | Peer known                      |
    /// |-----------|-------------------------|---------------------------------|
    /// | started   | insert, state started   | update stats, state started     |
    /// | (none)    | insert, state started   | update stats, keep state        |
    /// | completed | insert, state completed | update stats, state completed   |
    /// | stopped   | ignore                  | remove peer                     |
    ///
    /// Every announce that keeps the peer in the table refreshes its
    /// last-announce timestamp (callers stamp `peer.updated` with "now").
    pub fn upsert_peer(&mut self, announcing_peer: &peer::Peer) {
        let mut stored = *announcing_peer;

        match announcing_peer.event {
            AnnounceEvent::Stopped => {
                drop(self.peers.remove(&announcing_peer.peer_id));
                return;
            }
            AnnounceEvent::Started | AnnounceEvent::Completed => {}
            AnnounceEvent::None => {
                // A regular interval announce keeps whatever state the peer
                // already reached; a peer first seen this way is a starter.
                stored.event = match self.peers.get(&announcing_peer.peer_id) {
                    Some(known) => known.event,
                    None => AnnounceEvent::Started,
                };
            }
        }

        drop(self.peers.upsert(Arc::new(stored)));
    }

    /// Peers with nothing left to download.
    #[must_use]
    pub fn seeders(&self) -> usize {
        self.peers.counts().0
    }

    /// Peers still downloading.
    #[must_use]
    pub fn leechers(&self) -> usize {
        self.peers.counts().1
    }

    /// Swarm statistics as one consistent snapshot.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn swarm_metadata(&self) -> SwarmMetadata {
        let (seeders, leechers) = self.peers.counts();

        SwarmMetadata {
            complete: seeders as u32,
            incomplete: leechers as u32,
        }
    }

    #[must_use]
    pub fn peers_len(&self) -> usize {
        self.peers.len()
    }

    /// The peer list for an announce response: everyone but the requester,
    /// capped at `limit`.
    #[must_use]
    pub fn peers_for_client(&self, client: &SocketAddr, limit: usize) -> Vec<Arc<peer::Peer>> {
        self.peers.excluding_addr(client, limit)
    }

    /// Removes peers whose last announce is at or before the cutoff.
    pub fn remove_inactive_peers(&mut self, cutoff: DurationSinceUnixEpoch) {
        self.peers.prune_stale(cutoff);
    }
}

#[cfg(test)]
mod tests {

    mod the_tracked_torrent {
        use std::sync::Arc;

        use depot_metainfo::Metainfo;
        use depot_tracker_primitives::announce_event::AnnounceEvent;
        use depot_tracker_primitives::peer::fixture::PeerBuilder;
        use depot_tracker_primitives::peer::{self};

        use crate::core::torrent::entry::TrackedTorrent;

        fn sample_metainfo() -> Arc<Metainfo> {
            let encoded =
                b"d4:infod6:lengthi1e4:name1:a12:piece lengthi16384e6:pieces20:aaaaaaaaaaaaaaaaaaaaee".to_vec();
            Arc::new(Metainfo::parse(encoded, true).unwrap())
        }

        fn peer_id(last: u8) -> peer::Id {
            let mut id = *b"-qB0000000000000000\0";
            id[19] = last;
            peer::Id(id)
        }

        #[test]
        fn should_insert_an_unknown_peer_that_starts() {
            let mut torrent = TrackedTorrent::new(sample_metainfo());

            torrent.upsert_peer(&PeerBuilder::leecher().with_event(AnnounceEvent::Started).build());

            assert_eq!(torrent.peers_len(), 1);
            assert_eq!(torrent.leechers(), 1);
        }

        #[test]
        fn should_insert_an_unknown_peer_announcing_without_an_event_as_a_starter() {
            let mut torrent = TrackedTorrent::new(sample_metainfo());

            let peer = PeerBuilder::leecher().with_event(AnnounceEvent::None).build();
            torrent.upsert_peer(&peer);

            // The stored state is started, not none.
            let stored = torrent.peers_for_client(&"10.0.0.9:1".parse().unwrap(), 50);
            assert_eq!(stored[0].event, AnnounceEvent::Started);
        }

        #[test]
        fn should_keep_the_known_state_on_an_interval_announce() {
            let mut torrent = TrackedTorrent::new(sample_metainfo());

            torrent.upsert_peer(&PeerBuilder::seeder().build());
            torrent.upsert_peer(
                &PeerBuilder::seeder().with_event(AnnounceEvent::None).build(),
            );

            let stored = torrent.peers_for_client(&"10.0.0.9:1".parse().unwrap(), 50);
            assert_eq!(stored[0].event, AnnounceEvent::Completed);
        }

        #[test]
        fn should_mark_a_peer_as_completed_when_it_finishes_downloading() {
            let mut torrent = TrackedTorrent::new(sample_metainfo());

            torrent.upsert_peer(&PeerBuilder::leecher().with_event(AnnounceEvent::Started).build());
            torrent.upsert_peer(
                &PeerBuilder::default()
                    .with_bytes_left(0)
                    .with_event(AnnounceEvent::Completed)
                    .build(),
            );

            assert_eq!(torrent.seeders(), 1);
            assert_eq!(torrent.leechers(), 0);
        }

        #[test]
        fn should_remove_a_peer_that_stops() {
            let mut torrent = TrackedTorrent::new(sample_metainfo());

            torrent.upsert_peer(&PeerBuilder::leecher().with_event(AnnounceEvent::Started).build());
            torrent.upsert_peer(&PeerBuilder::leecher().with_event(AnnounceEvent::Stopped).build());

            assert_eq!(torrent.peers_len(), 0);
        }

        #[test]
        fn should_ignore_a_stop_from_an_unknown_peer() {
            let mut torrent = TrackedTorrent::new(sample_metainfo());

            torrent.upsert_peer(&PeerBuilder::leecher().with_event(AnnounceEvent::Stopped).build());

            assert_eq!(torrent.peers_len(), 0);
        }

        #[test]
        fn should_count_seeders_and_leechers_per_announced_state() {
            let mut torrent = TrackedTorrent::new(sample_metainfo());

            for index in 0..3u8 {
                torrent.upsert_peer(&PeerBuilder::leecher().with_peer_id(&peer_id(b'0' + index)).build());
            }
            for index in 0..2u8 {
                torrent.upsert_peer(&PeerBuilder::seeder().with_peer_id(&peer_id(b'a' + index)).build());
            }

            assert_eq!(torrent.leechers(), 3);
            assert_eq!(torrent.seeders(), 2);

            let stats = torrent.swarm_metadata();
            assert_eq!(stats.complete, 2);
            assert_eq!(stats.incomplete, 3);
        }
    }
}
