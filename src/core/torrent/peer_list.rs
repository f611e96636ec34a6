//! The peer table of one tracked torrent.
use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::Arc;

use depot_tracker_primitives::{peer, DurationSinceUnixEpoch};

/// Peers of one swarm, keyed by peer id.
///
/// Two peers that differ only in their id are distinct entries; a peer that
/// re-announces under the same id replaces its previous entry.
#[derive(Clone, Debug, Default)]
pub struct PeerList {
    peers: BTreeMap<peer::Id, Arc<peer::Peer>>,
}

impl PeerList {
    #[must_use]
    pub fn len(&self) -> usize {
        self.peers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }

    pub fn upsert(&mut self, peer: Arc<peer::Peer>) -> Option<Arc<peer::Peer>> {
        self.peers.insert(peer.peer_id, peer)
    }

    pub fn remove(&mut self, peer_id: &peer::Id) -> Option<Arc<peer::Peer>> {
        self.peers.remove(peer_id)
    }

    #[must_use]
    pub fn get(&self, peer_id: &peer::Id) -> Option<&Arc<peer::Peer>> {
        self.peers.get(peer_id)
    }

    /// Removes every peer whose last announce is at or before the cutoff.
    pub fn prune_stale(&mut self, cutoff: DurationSinceUnixEpoch) {
        self.peers.retain(|_, peer| peer.updated > cutoff);
    }

    /// `(seeders, leechers)` over the current table.
    #[must_use]
    pub fn counts(&self) -> (usize, usize) {
        let seeders = self.peers.values().filter(|peer| peer.is_seeder()).count();
        let leechers = self.len() - seeders;

        (seeders, leechers)
    }

    #[must_use]
    pub fn all(&self, limit: Option<usize>) -> Vec<Arc<peer::Peer>> {
        match limit {
            Some(limit) => self.peers.values().take(limit).cloned().collect(),
            None => self.peers.values().cloned().collect(),
        }
    }

    /// Peers except the one listening on `client`, typically because the
    /// result is going back to that client.
    #[must_use]
    pub fn excluding_addr(&self, client: &SocketAddr, limit: usize) -> Vec<Arc<peer::Peer>> {
        self.peers
            .values()
            .filter(|peer| peer.peer_addr != *client)
            .take(limit)
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {

    mod it_should {
        use std::net::{IpAddr, Ipv4Addr, SocketAddr};
        use std::sync::Arc;

        use depot_tracker_primitives::peer::fixture::PeerBuilder;
        use depot_tracker_primitives::peer::{self};
        use depot_tracker_primitives::DurationSinceUnixEpoch;

        use crate::core::torrent::peer_list::PeerList;

        #[test]
        fn be_empty_when_no_peers_have_been_inserted() {
            let peer_list = PeerList::default();

            assert!(peer_list.is_empty());
            assert_eq!(peer_list.len(), 0);
        }

        #[test]
        fn allow_inserting_a_new_peer() {
            let mut peer_list = PeerList::default();

            let peer = PeerBuilder::default().build();

            assert!(peer_list.upsert(peer.into()).is_none());
            assert_eq!(peer_list.len(), 1);
        }

        #[test]
        fn replace_a_peer_that_reannounces_under_the_same_id() {
            let mut peer_list = PeerList::default();

            let peer = PeerBuilder::default().build();
            peer_list.upsert(peer.into());

            assert_eq!(peer_list.upsert(peer.into()), Some(Arc::new(peer)));
            assert_eq!(peer_list.len(), 1);
        }

        #[test]
        fn keep_peers_that_differ_only_in_their_id_as_distinct_entries() {
            let mut peer_list = PeerList::default();

            peer_list.upsert(
                PeerBuilder::default()
                    .with_peer_id(&peer::Id(*b"-qB00000000000000001"))
                    .build()
                    .into(),
            );
            peer_list.upsert(
                PeerBuilder::default()
                    .with_peer_id(&peer::Id(*b"-qB00000000000000002"))
                    .build()
                    .into(),
            );

            assert_eq!(peer_list.len(), 2);
        }

        #[test]
        fn allow_removing_an_existing_peer() {
            let mut peer_list = PeerList::default();

            let peer = PeerBuilder::default().build();
            peer_list.upsert(peer.into());
            peer_list.remove(&peer.peer_id);

            assert!(peer_list.get(&peer.peer_id).is_none());
            assert!(peer_list.is_empty());
        }

        #[test]
        fn count_seeders_and_leechers() {
            let mut peer_list = PeerList::default();

            peer_list.upsert(
                PeerBuilder::seeder()
                    .with_peer_id(&peer::Id(*b"-qB00000000000000001"))
                    .build()
                    .into(),
            );
            peer_list.upsert(
                PeerBuilder::leecher()
                    .with_peer_id(&peer::Id(*b"-qB00000000000000002"))
                    .build()
                    .into(),
            );

            assert_eq!(peer_list.counts(), (1, 1));
        }

        #[test]
        fn exclude_the_requesting_peer_from_the_returned_list() {
            let mut peer_list = PeerList::default();

            let first_addr = SocketAddr::new(IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1)), 6881);
            let second_addr = SocketAddr::new(IpAddr::V4(Ipv4Addr::new(127, 0, 0, 2)), 6881);

            let first = PeerBuilder::default()
                .with_peer_id(&peer::Id(*b"-qB00000000000000001"))
                .with_peer_addr(&first_addr)
                .build();
            let second = PeerBuilder::default()
                .with_peer_id(&peer::Id(*b"-qB00000000000000002"))
                .with_peer_addr(&second_addr)
                .build();

            peer_list.upsert(first.into());
            peer_list.upsert(second.into());

            assert_eq!(peer_list.excluding_addr(&second_addr, 50), [Arc::new(first)]);
        }

        #[test]
        fn cap_the_returned_list_at_the_given_limit() {
            let mut peer_list = PeerList::default();

            for index in 0u8..10 {
                let mut id = *b"-qB0000000000000000\0";
                id[19] = b'0' + index;
                peer_list.upsert(
                    PeerBuilder::default()
                        .with_peer_id(&peer::Id(id))
                        .with_peer_addr(&SocketAddr::new(IpAddr::V4(Ipv4Addr::new(127, 0, 0, index + 1)), 6881))
                        .build()
                        .into(),
                );
            }

            let client = SocketAddr::new(IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1)), 6881);
            assert_eq!(peer_list.excluding_addr(&client, 3).len(), 3);
        }

        #[test]
        fn prune_peers_that_have_not_announced_since_the_cutoff() {
            let mut peer_list = PeerList::default();
            let one_second = DurationSinceUnixEpoch::new(1, 0);

            let last_update_time = DurationSinceUnixEpoch::new(1_669_397_478, 0);
            let peer = PeerBuilder::default().last_updated_on(last_update_time).build();
            peer_list.upsert(peer.into());

            peer_list.prune_stale(last_update_time + one_second);

            assert!(peer_list.is_empty());
        }

        #[test]
        fn keep_peers_that_announced_after_the_cutoff() {
            let mut peer_list = PeerList::default();
            let one_second = DurationSinceUnixEpoch::new(1, 0);

            let last_update_time = DurationSinceUnixEpoch::new(1_669_397_478, 0);
            let peer = PeerBuilder::default().last_updated_on(last_update_time).build();
            peer_list.upsert(peer.into());

            peer_list.prune_stale(last_update_time - one_second);

            assert_eq!(peer_list.len(), 1);
        }
    }
}
