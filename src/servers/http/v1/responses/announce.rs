//! `Announce` response for the HTTP tracker.
//!
//! Two forms exist. The dictionary form of
//! [BEP 03](https://www.bittorrent.org/beps/bep_0003.html) lists peers as
//! dictionaries with `peer id`, `ip` and `port`; the compact form of
//! [BEP 23](https://www.bittorrent.org/beps/bep_0023.html) packs IPv4 peers
//! into 6 bytes each (and IPv6 peers into 18 bytes under `peers6`, per
//! [BEP 07](https://www.bittorrent.org/beps/bep_0007.html)).
use std::io::Write;
use std::net::IpAddr;
use std::sync::Arc;

use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use depot_bencode::{ben_bytes, ben_int, ben_list, ben_map, BencodeMut};
use depot_tracker_primitives::peer;

use crate::core::AnnounceData;

/// Dictionary form (non compact) `announce` response.
///
/// ```rust
/// use std::net::{IpAddr, Ipv4Addr};
/// use depot_tracker::servers::http::v1::responses::announce::{NonCompact, Peer};
///
/// let response = NonCompact {
///     interval: 111,
///     interval_min: 222,
///     complete: 1,
///     incomplete: 2,
///     peers: vec![Peer {
///         peer_id: *b"-qB00000000000000001",
///         ip: IpAddr::V4(Ipv4Addr::new(105, 105, 105, 105)),
///         port: 28784,
///     }],
/// };
///
/// let expected = b"d8:completei1e10:incompletei2e8:intervali111e12:min intervali222e5:peersld2:ip15:105.105.105.1057:peer id20:-qB000000000000000014:porti28784eeee";
///
/// assert_eq!(response.body(), expected.to_vec());
/// ```
#[derive(Debug, PartialEq)]
pub struct NonCompact {
    /// Recommended seconds between regular announce requests.
    pub interval: u32,
    /// Minimum announce interval; clients must not reannounce more
    /// frequently than this.
    pub interval_min: u32,
    /// Number of peers with the entire file, i.e. seeders.
    pub complete: u32,
    /// Number of non-seeder peers, aka leechers.
    pub incomplete: u32,
    /// A list of peers, one dictionary per peer.
    pub peers: Vec<Peer>,
}

/// Peer entry of the dictionary form response.
#[derive(Debug, PartialEq)]
pub struct Peer {
    pub peer_id: [u8; 20],
    pub ip: IpAddr,
    pub port: u16,
}

impl Peer {
    #[must_use]
    pub fn ben_map(&self) -> BencodeMut<'_> {
        ben_map! {
            "ip" => ben_bytes!(self.ip.to_string()),
            "peer id" => ben_bytes!(self.peer_id.to_vec()),
            "port" => ben_int!(i64::from(self.port))
        }
    }
}

impl From<&Arc<peer::Peer>> for Peer {
    fn from(peer: &Arc<peer::Peer>) -> Self {
        Peer {
            peer_id: peer.peer_id.0,
            ip: peer.peer_addr.ip(),
            port: peer.peer_addr.port(),
        }
    }
}

impl NonCompact {
    /// The bencoded body of the dictionary form response.
    ///
    /// # Panics
    ///
    /// Never panics: the peers value is constructed as a list.
    #[must_use]
    pub fn body(&self) -> Vec<u8> {
        let mut peers_list = ben_list!();
        {
            let peers_list_mut = peers_list.list_mut().unwrap();
            for peer in &self.peers {
                peers_list_mut.push(peer.ben_map());
            }
        }

        (ben_map! {
            "complete" => ben_int!(i64::from(self.complete)),
            "incomplete" => ben_int!(i64::from(self.incomplete)),
            "interval" => ben_int!(i64::from(self.interval)),
            "min interval" => ben_int!(i64::from(self.interval_min)),
            "peers" => peers_list
        })
        .encode()
    }
}

impl IntoResponse for NonCompact {
    fn into_response(self) -> Response {
        (StatusCode::OK, [(header::CONTENT_TYPE, "text/plain")], self.body()).into_response()
    }
}

impl From<AnnounceData> for NonCompact {
    fn from(data: AnnounceData) -> Self {
        let peers: Vec<Peer> = data.peers.iter().map(Peer::from).collect();

        Self {
            interval: data.policy.interval,
            interval_min: data.policy.interval_min,
            complete: data.stats.complete,
            incomplete: data.stats.incomplete,
            peers,
        }
    }
}

/// Compact `announce` response.
///
/// _"To reduce the size of tracker responses and to reduce memory and
/// computational requirements in trackers, trackers may return peers as a
/// packed string rather than as a bencoded list."_
///
/// ```rust
/// use std::net::{IpAddr, Ipv4Addr};
/// use depot_tracker::servers::http::v1::responses::announce::{Compact, CompactPeer};
///
/// let response = Compact {
///     interval: 111,
///     interval_min: 222,
///     complete: 1,
///     incomplete: 2,
///     peers: vec![CompactPeer {
///         ip: IpAddr::V4(Ipv4Addr::new(105, 105, 105, 105)),
///         port: 28784,
///     }],
/// };
///
/// let expected = b"d8:completei1e10:incompletei2e8:intervali111e12:min intervali222e5:peers6:iiiipp6:peers60:e";
///
/// assert_eq!(response.body(), expected.to_vec());
/// ```
#[derive(Debug, PartialEq)]
pub struct Compact {
    pub interval: u32,
    pub interval_min: u32,
    pub complete: u32,
    pub incomplete: u32,
    pub peers: Vec<CompactPeer>,
}

/// Peer entry of the compact response: 6 bytes for IPv4, 18 for IPv6.
#[derive(Debug, PartialEq)]
pub struct CompactPeer {
    pub ip: IpAddr,
    pub port: u16,
}

impl CompactPeer {
    /// Network byte order address followed by the network byte order port.
    #[must_use]
    pub fn bytes(&self) -> Vec<u8> {
        let mut bytes: Vec<u8> = Vec::new();
        match self.ip {
            IpAddr::V4(ip) => bytes.extend_from_slice(&u32::from(ip).to_be_bytes()),
            IpAddr::V6(ip) => bytes.extend_from_slice(&u128::from(ip).to_be_bytes()),
        }
        bytes.extend_from_slice(&self.port.to_be_bytes());
        bytes
    }
}

impl From<&Arc<peer::Peer>> for CompactPeer {
    fn from(peer: &Arc<peer::Peer>) -> Self {
        CompactPeer {
            ip: peer.peer_addr.ip(),
            port: peer.peer_addr.port(),
        }
    }
}

impl Compact {
    /// The bencoded body of the compact response.
    #[must_use]
    pub fn body(&self) -> Vec<u8> {
        let mut peers_v4: Vec<u8> = Vec::new();
        let mut peers_v6: Vec<u8> = Vec::new();

        for peer in &self.peers {
            match peer.ip {
                IpAddr::V4(_) => peers_v4.write_all(&peer.bytes()).expect("writing to a vec cannot fail"),
                IpAddr::V6(_) => peers_v6.write_all(&peer.bytes()).expect("writing to a vec cannot fail"),
            }
        }

        (ben_map! {
            "complete" => ben_int!(i64::from(self.complete)),
            "incomplete" => ben_int!(i64::from(self.incomplete)),
            "interval" => ben_int!(i64::from(self.interval)),
            "min interval" => ben_int!(i64::from(self.interval_min)),
            "peers" => ben_bytes!(peers_v4),
            "peers6" => ben_bytes!(peers_v6)
        })
        .encode()
    }
}

impl IntoResponse for Compact {
    fn into_response(self) -> Response {
        (StatusCode::OK, [(header::CONTENT_TYPE, "text/plain")], self.body()).into_response()
    }
}

impl From<AnnounceData> for Compact {
    fn from(data: AnnounceData) -> Self {
        let peers: Vec<CompactPeer> = data.peers.iter().map(CompactPeer::from).collect();

        Self {
            interval: data.policy.interval,
            interval_min: data.policy.interval_min,
            complete: data.stats.complete,
            incomplete: data.stats.incomplete,
            peers,
        }
    }
}

#[cfg(test)]
mod tests {

    use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

    use super::{Compact, CompactPeer, NonCompact, Peer};

    // The IP addresses and ports in these fixtures are chosen so that their
    // compact byte representation happens to be printable ASCII ('i' is
    // 0x69, 'p' is 0x70), which keeps the expected bodies readable.

    #[test]
    fn non_compact_announce_response_can_be_bencoded() {
        let response = NonCompact {
            interval: 111,
            interval_min: 222,
            complete: 333,
            incomplete: 444,
            peers: vec![
                // IPV4
                Peer {
                    peer_id: *b"-qB00000000000000001",
                    ip: IpAddr::V4(Ipv4Addr::new(0x69, 0x69, 0x69, 0x69)),
                    port: 0x7070,
                },
                // IPV6
                Peer {
                    peer_id: *b"-qB00000000000000002",
                    ip: IpAddr::V6(Ipv6Addr::new(0x6969, 0x6969, 0x6969, 0x6969, 0x6969, 0x6969, 0x6969, 0x6969)),
                    port: 0x7070,
                },
            ],
        };

        let expected = b"d8:completei333e10:incompletei444e8:intervali111e12:min intervali222e5:peersld2:ip15:105.105.105.1057:peer id20:-qB000000000000000014:porti28784eed2:ip39:6969:6969:6969:6969:6969:6969:6969:69697:peer id20:-qB000000000000000024:porti28784eeee";

        assert_eq!(
            String::from_utf8(response.body()).unwrap(),
            String::from_utf8(expected.to_vec()).unwrap()
        );
    }

    #[test]
    fn compact_announce_response_can_be_bencoded() {
        let response = Compact {
            interval: 111,
            interval_min: 222,
            complete: 333,
            incomplete: 444,
            peers: vec![
                // IPV4
                CompactPeer {
                    ip: IpAddr::V4(Ipv4Addr::new(0x69, 0x69, 0x69, 0x69)),
                    port: 0x7070,
                },
                // IPV6
                CompactPeer {
                    ip: IpAddr::V6(Ipv6Addr::new(0x6969, 0x6969, 0x6969, 0x6969, 0x6969, 0x6969, 0x6969, 0x6969)),
                    port: 0x7070,
                },
            ],
        };

        let expected =
            b"d8:completei333e10:incompletei444e8:intervali111e12:min intervali222e5:peers6:iiiipp6:peers618:iiiiiiiiiiiiiiiippe";

        assert_eq!(
            String::from_utf8(response.body()).unwrap(),
            String::from_utf8(expected.to_vec()).unwrap()
        );
    }
}
