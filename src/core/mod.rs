//! The core tracker module: the `BitTorrent` tracker logic independent of
//! the delivery layer.
//!
//! The [`Tracker`] is the domain service used by the HTTP announce endpoint.
//! It has two groups of responsibilities:
//!
//! - **Registry**: this is a *closed* tracker. The operator admits torrents
//!   with [`Tracker::announce_torrent`]; announces for any other info-hash
//!   fail with [`Error::UnknownTorrent`].
//! - **Announce handling**: [`Tracker::announce`] applies the announcing
//!   peer to the torrent's peer table and returns the peers the client
//!   should talk to, plus the swarm statistics.
//!
//! A background reaper periodically calls [`Tracker::cleanup_torrents`] to
//! evict peers whose last announce is older than the configured peer
//! timeout.
pub mod error;
pub mod torrent;

use std::net::IpAddr;
use std::panic::Location;
use std::sync::Arc;
use std::time::Duration;

use depot_metainfo::Metainfo;
use depot_tracker_clock::clock::Time;
use depot_tracker_configuration::{AnnouncePolicy, Configuration, TORRENT_PEERS_LIMIT};
use depot_tracker_primitives::info_hash::InfoHash;
use depot_tracker_primitives::peer;
use depot_tracker_primitives::swarm_metadata::SwarmMetadata;
use derive_more::Constructor;
use tracing::debug;

use self::error::Error;
use self::torrent::Torrents;
use crate::CurrentClock;

/// The domain layer tracker service.
pub struct Tracker {
    announce_policy: AnnouncePolicy,
    peer_timeout: Duration,
    external_ip: Option<IpAddr>,
    /// The registry of torrents this tracker accepts announces for.
    pub torrents: Torrents,
}

/// Data returned to a peer by the `announce` request.
#[derive(Clone, Debug, PartialEq, Constructor, Default)]
pub struct AnnounceData {
    /// The peers downloading the same torrent, excluding the requester.
    pub peers: Vec<Arc<peer::Peer>>,
    /// Swarm statistics.
    pub stats: SwarmMetadata,
    /// The tracker announce policy.
    pub policy: AnnouncePolicy,
}

impl Tracker {
    #[must_use]
    pub fn new(config: &Configuration) -> Tracker {
        Tracker {
            announce_policy: config.announce_policy(),
            peer_timeout: Duration::from_secs(u64::from(config.max_peer_timeout)),
            external_ip: config.get_ext_ip(),
            torrents: Torrents::default(),
        }
    }

    #[must_use]
    pub fn get_announce_policy(&self) -> AnnouncePolicy {
        self.announce_policy
    }

    /// Admits a torrent to this (closed) tracker, creating an empty swarm
    /// for it. Admitting an already-tracked torrent keeps the existing
    /// swarm and returns `false`.
    pub fn announce_torrent(&self, metainfo: Metainfo) -> bool {
        let info_hash = metainfo.info_hash();
        let admitted = self.torrents.admit(Arc::new(metainfo));

        if admitted {
            debug!(%info_hash, "torrent admitted");
        }

        admitted
    }

    /// Stops tracking a torrent, dropping its swarm.
    pub fn remove_torrent(&self, info_hash: &InfoHash) -> bool {
        self.torrents.remove(info_hash).is_some()
    }

    #[must_use]
    pub fn is_tracked(&self, info_hash: &InfoHash) -> bool {
        self.torrents.contains(info_hash)
    }

    /// It handles an announce request.
    ///
    /// The peer's IP may be rewritten: when the peer announces from a
    /// loopback address and the tracker has a configured external IP, that
    /// IP is handed out to the swarm instead.
    ///
    /// `peers_wanted` is the client's `numwant`; the response is always
    /// capped at [`TORRENT_PEERS_LIMIT`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownTorrent`] when the info-hash has not been
    /// admitted by the operator.
    pub fn announce(
        &self,
        info_hash: &InfoHash,
        peer: &mut peer::Peer,
        remote_client_ip: &IpAddr,
        peers_wanted: Option<usize>,
    ) -> Result<AnnounceData, Error> {
        peer.change_ip(&assign_ip_address_to_peer(remote_client_ip, self.external_ip));

        let entry = self.torrents.get(info_hash).ok_or(Error::UnknownTorrent {
            info_hash: *info_hash,
            location: Location::caller(),
        })?;

        let limit = peers_wanted.map_or(TORRENT_PEERS_LIMIT, |wanted| wanted.min(TORRENT_PEERS_LIMIT));

        // One lock acquisition per request: the mutation and the snapshot
        // the response is built from are consistent.
        let (peers, stats) = {
            let mut entry = entry.lock().expect("a torrent entry lock should not be poisoned");

            entry.upsert_peer(peer);
            (entry.peers_for_client(&peer.peer_addr, limit), entry.swarm_metadata())
        };

        Ok(AnnounceData {
            peers,
            stats,
            policy: self.announce_policy,
        })
    }

    /// Removes every peer that has not announced within the peer timeout.
    ///
    /// Called periodically by the reaper job.
    pub fn cleanup_torrents(&self) {
        let cutoff = CurrentClock::now_sub(&self.peer_timeout).unwrap_or_default();
        self.torrents.remove_inactive_peers(cutoff);
    }
}

#[must_use]
fn assign_ip_address_to_peer(remote_client_ip: &IpAddr, tracker_external_ip: Option<IpAddr>) -> IpAddr {
    if let Some(host_ip) = tracker_external_ip.filter(|_| remote_client_ip.is_loopback()) {
        host_ip
    } else {
        *remote_client_ip
    }
}

#[cfg(test)]
mod tests {

    mod the_tracker {
        use std::net::{IpAddr, Ipv4Addr};
        use std::sync::Arc;
        use std::time::Duration;

        use depot_metainfo::Metainfo;
        use depot_tracker_clock::clock::stopped::Stopped as _;
        use depot_tracker_clock::clock::Time;
        use depot_tracker_configuration::{Configuration, Info};
        use depot_tracker_primitives::announce_event::AnnounceEvent;
        use depot_tracker_primitives::info_hash::InfoHash;
        use depot_tracker_primitives::peer::fixture::PeerBuilder;
        use depot_tracker_primitives::peer::{self};

        use crate::core::error::Error;
        use crate::core::Tracker;
        use crate::CurrentClock;

        fn test_configuration() -> Configuration {
            let toml = r#"
                announce_interval = 60
                max_peer_timeout = 120
            "#;
            Configuration::load(&Info::from_toml(toml)).unwrap()
        }

        fn test_tracker() -> Tracker {
            Tracker::new(&test_configuration())
        }

        fn sample_metainfo() -> Metainfo {
            let encoded =
                b"d4:infod6:lengthi1e4:name1:a12:piece lengthi16384e6:pieces20:aaaaaaaaaaaaaaaaaaaaee".to_vec();
            Metainfo::parse(encoded, true).unwrap()
        }

        fn peer_id(last: u8) -> peer::Id {
            let mut id = *b"-qB0000000000000000\0";
            id[19] = last;
            peer::Id(id)
        }

        fn client_ip() -> IpAddr {
            IpAddr::V4(Ipv4Addr::new(126, 0, 0, 1))
        }

        #[test]
        fn should_admit_a_torrent_once() {
            let tracker = test_tracker();

            assert!(tracker.announce_torrent(sample_metainfo()));
            assert!(!tracker.announce_torrent(sample_metainfo()));
            assert!(tracker.is_tracked(&sample_metainfo().info_hash()));
        }

        #[test]
        fn should_reject_announces_for_unknown_torrents() {
            let tracker = test_tracker();

            let mut peer = PeerBuilder::leecher().build();
            let result = tracker.announce(&InfoHash([0xABu8; 20]), &mut peer, &client_ip(), None);

            assert!(matches!(result.unwrap_err(), Error::UnknownTorrent { .. }));
        }

        #[test]
        fn should_track_seeders_and_leechers_by_their_announced_left_bytes() {
            let tracker = test_tracker();
            let metainfo = sample_metainfo();
            let info_hash = metainfo.info_hash();
            tracker.announce_torrent(metainfo);

            for index in 0..3u8 {
                let mut leecher = PeerBuilder::leecher().with_peer_id(&peer_id(b'0' + index)).build();
                tracker.announce(&info_hash, &mut leecher, &client_ip(), None).unwrap();
            }
            for index in 0..2u8 {
                let mut seeder = PeerBuilder::seeder().with_peer_id(&peer_id(b'a' + index)).build();
                tracker.announce(&info_hash, &mut seeder, &client_ip(), None).unwrap();
            }

            let mut observer = PeerBuilder::leecher().with_peer_id(&peer_id(b'z')).build();
            let data = tracker.announce(&info_hash, &mut observer, &client_ip(), None).unwrap();

            assert_eq!(data.stats.complete, 2);
            assert_eq!(data.stats.incomplete, 4);
        }

        #[test]
        fn should_free_the_slot_of_a_peer_that_stops() {
            let tracker = test_tracker();
            let metainfo = sample_metainfo();
            let info_hash = metainfo.info_hash();
            tracker.announce_torrent(metainfo);

            let mut peer = PeerBuilder::leecher().build();
            tracker.announce(&info_hash, &mut peer, &client_ip(), None).unwrap();

            let mut stopping = PeerBuilder::leecher().with_event(AnnounceEvent::Stopped).build();
            tracker.announce(&info_hash, &mut stopping, &client_ip(), None).unwrap();

            let entry = tracker.torrents.get(&info_hash).unwrap();
            assert_eq!(entry.lock().unwrap().peers_len(), 0);
        }

        #[test]
        fn should_exclude_the_requesting_peer_from_the_peer_list() {
            let tracker = test_tracker();
            let metainfo = sample_metainfo();
            let info_hash = metainfo.info_hash();
            tracker.announce_torrent(metainfo);

            let mut peer = PeerBuilder::leecher().build();
            let data = tracker.announce(&info_hash, &mut peer, &client_ip(), None).unwrap();

            assert!(data.peers.is_empty());
        }

        #[test]
        fn should_cap_the_peer_list_at_the_requested_numwant() {
            let tracker = test_tracker();
            let metainfo = sample_metainfo();
            let info_hash = metainfo.info_hash();
            tracker.announce_torrent(metainfo);

            for index in 0..5u8 {
                let mut leecher = PeerBuilder::leecher().with_peer_id(&peer_id(b'0' + index)).build();
                let ip = IpAddr::V4(Ipv4Addr::new(126, 0, 0, index + 1));
                tracker.announce(&info_hash, &mut leecher, &ip, None).unwrap();
            }

            let mut observer = PeerBuilder::leecher().with_peer_id(&peer_id(b'z')).build();
            let data = tracker
                .announce(&info_hash, &mut observer, &client_ip(), Some(2))
                .unwrap();

            assert_eq!(data.peers.len(), 2);
        }

        #[test]
        fn should_hand_out_the_external_ip_for_loopback_peers() {
            let toml = r#"
                announce_interval = 60
                max_peer_timeout = 120
                external_ip = "126.0.0.42"
            "#;
            let tracker = Tracker::new(&Configuration::load(&Info::from_toml(toml)).unwrap());
            let metainfo = sample_metainfo();
            let info_hash = metainfo.info_hash();
            tracker.announce_torrent(metainfo);

            let mut peer = PeerBuilder::leecher().build();
            let loopback = IpAddr::V4(Ipv4Addr::LOCALHOST);
            tracker.announce(&info_hash, &mut peer, &loopback, None).unwrap();

            assert_eq!(peer.peer_addr.ip(), IpAddr::V4(Ipv4Addr::new(126, 0, 0, 42)));
        }

        #[test]
        fn should_evict_peers_that_outlive_the_freshness_window() {
            use depot_tracker_clock::clock;

            let tracker = test_tracker();
            let metainfo = sample_metainfo();
            let info_hash = metainfo.info_hash();
            tracker.announce_torrent(metainfo);

            clock::Stopped::local_set(&Duration::from_secs(1_000_000));

            let peer = PeerBuilder::leecher().last_updated_on(CurrentClock::now()).build();
            let entry = tracker.torrents.get(&info_hash).unwrap();
            entry.lock().unwrap().upsert_peer(&peer);

            // Within the 120 second window: the peer survives the sweep.
            clock::Stopped::local_add(&Duration::from_secs(119)).unwrap();
            tracker.cleanup_torrents();
            assert_eq!(entry.lock().unwrap().peers_len(), 1);

            // Past the window: the peer is gone.
            clock::Stopped::local_add(&Duration::from_secs(2)).unwrap();
            tracker.cleanup_torrents();
            assert_eq!(entry.lock().unwrap().peers_len(), 0);

            clock::Stopped::local_reset();
        }
    }
}
