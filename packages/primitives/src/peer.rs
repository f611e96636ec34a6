//! Peer struct used by the core tracker.
//!
//! A sample peer:
//!
//! ```rust
//! use std::net::{IpAddr, Ipv4Addr, SocketAddr};
//!
//! use depot_tracker_primitives::announce_event::AnnounceEvent;
//! use depot_tracker_primitives::peer;
//! use depot_tracker_primitives::{DurationSinceUnixEpoch, NumberOfBytes};
//!
//! let peer = peer::Peer {
//!     peer_id: peer::Id(*b"-qB00000000000000001"),
//!     peer_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::new(126, 0, 0, 1)), 8081),
//!     updated: DurationSinceUnixEpoch::new(1_669_397_478, 0),
//!     uploaded: NumberOfBytes(0),
//!     downloaded: NumberOfBytes(0),
//!     left: NumberOfBytes(0),
//!     event: AnnounceEvent::Completed,
//! };
//! ```
use std::net::{IpAddr, SocketAddr};
use std::panic::Location;

use serde::Serialize;
use thiserror::Error;

use crate::announce_event::AnnounceEvent;
use crate::{DurationSinceUnixEpoch, NumberOfBytes};

pub const PEER_ID_BYTES_LEN: usize = 20;

/// ID chosen by the downloader peer, unique within one swarm.
#[derive(PartialEq, Eq, Hash, Clone, Copy, Debug, PartialOrd, Ord)]
pub struct Id(pub [u8; PEER_ID_BYTES_LEN]);

/// Error returned when converting an invalid peer id from another type,
/// usually because the source does not contain exactly 20 bytes.
#[derive(Error, Debug)]
pub enum IdConversionError {
    #[error("not enough bytes for peer id: {message} {location}")]
    NotEnoughBytes {
        location: &'static Location<'static>,
        message: String,
    },
    #[error("too many bytes for peer id: {message} {location}")]
    TooManyBytes {
        location: &'static Location<'static>,
        message: String,
    },
}

impl Id {
    /// The id as hex, e.g. `-qB00000000000000001` becomes
    /// `2D71423030303030303030303030303030303031`.
    ///
    /// # Panics
    ///
    /// Never panics: a 40-byte output buffer always fits 20 input bytes.
    #[must_use]
    pub fn to_hex_string(&self) -> String {
        let mut chars = [0u8; 2 * PEER_ID_BYTES_LEN];
        binascii::bin2hex(&self.0, &mut chars).expect("output buffer fits the id");
        std::str::from_utf8(&chars).unwrap().to_ascii_uppercase()
    }
}

impl std::fmt::Display for Id {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_hex_string())
    }
}

impl From<[u8; PEER_ID_BYTES_LEN]> for Id {
    fn from(bytes: [u8; PEER_ID_BYTES_LEN]) -> Self {
        Id(bytes)
    }
}

impl TryFrom<Vec<u8>> for Id {
    type Error = IdConversionError;

    fn try_from(bytes: Vec<u8>) -> Result<Self, Self::Error> {
        if bytes.len() < PEER_ID_BYTES_LEN {
            return Err(IdConversionError::NotEnoughBytes {
                location: Location::caller(),
                message: format! {"got {} bytes, expected {}", bytes.len(), PEER_ID_BYTES_LEN},
            });
        }
        if bytes.len() > PEER_ID_BYTES_LEN {
            return Err(IdConversionError::TooManyBytes {
                location: Location::caller(),
                message: format! {"got {} bytes, expected {}", bytes.len(), PEER_ID_BYTES_LEN},
            });
        }

        let mut id = Id([0u8; PEER_ID_BYTES_LEN]);
        id.0.clone_from_slice(&bytes);
        Ok(id)
    }
}

impl std::str::FromStr for Id {
    type Err = IdConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.as_bytes().to_vec().try_into()
    }
}

impl Serialize for Id {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex_string())
    }
}

/// Peer struct used by the core tracker to keep announce data.
#[derive(Debug, Clone, Serialize, Copy, PartialEq, Eq, Hash)]
pub struct Peer {
    /// ID used by the downloader peer.
    pub peer_id: Id,
    /// The IP and port this peer is listening on.
    pub peer_addr: SocketAddr,
    /// The last time the tracker received an announce request from this peer.
    #[serde(serialize_with = "ser_unix_time_value")]
    pub updated: DurationSinceUnixEpoch,
    /// The total amount of bytes uploaded by this peer so far.
    pub uploaded: NumberOfBytes,
    /// The total amount of bytes downloaded by this peer so far.
    pub downloaded: NumberOfBytes,
    /// The number of bytes this peer still has to download.
    pub left: NumberOfBytes,
    /// The last event the peer announced: started, completed, stopped, or
    /// none for a regular interval announce.
    pub event: AnnounceEvent,
}

/// Serializes a `DurationSinceUnixEpoch` as a Unix timestamp in seconds.
///
/// # Errors
///
/// Will return `serde::Serializer::Error` if unable to serialize the value.
fn ser_unix_time_value<S: serde::Serializer>(unix_time_value: &DurationSinceUnixEpoch, ser: S) -> Result<S::Ok, S::Error> {
    ser.serialize_u64(unix_time_value.as_secs())
}

impl Peer {
    /// A seeder holds the whole torrent: nothing left to download.
    #[must_use]
    pub fn is_seeder(&self) -> bool {
        self.left.0 <= 0 && self.event != AnnounceEvent::Stopped
    }

    #[must_use]
    pub fn ip(&self) -> IpAddr {
        self.peer_addr.ip()
    }

    pub fn change_ip(&mut self, new_ip: &IpAddr) {
        self.peer_addr = SocketAddr::new(*new_ip, self.peer_addr.port());
    }
}

impl Ord for Peer {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.peer_id.cmp(&other.peer_id)
    }
}

impl PartialOrd for Peer {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

/// Test fixtures shared by the tracker crates.
pub mod fixture {
    use std::net::{IpAddr, Ipv4Addr, SocketAddr};

    use super::{Id, Peer};
    use crate::announce_event::AnnounceEvent;
    use crate::{DurationSinceUnixEpoch, NumberOfBytes};

    pub struct PeerBuilder {
        peer: Peer,
    }

    impl Default for PeerBuilder {
        fn default() -> Self {
            Self {
                peer: Peer {
                    peer_id: Id(*b"-qB00000000000000000"),
                    peer_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::new(126, 0, 0, 1)), 8080),
                    updated: DurationSinceUnixEpoch::new(1_669_397_478, 0),
                    uploaded: NumberOfBytes(0),
                    downloaded: NumberOfBytes(0),
                    left: NumberOfBytes(0),
                    event: AnnounceEvent::Started,
                },
            }
        }
    }

    impl PeerBuilder {
        /// A peer that still has every byte left to download.
        #[must_use]
        pub fn leecher() -> Self {
            Self::default().with_bytes_left(1000)
        }

        /// A peer that has completed the download.
        #[must_use]
        pub fn seeder() -> Self {
            let mut builder = Self::default().with_bytes_left(0);
            builder.peer.event = AnnounceEvent::Completed;
            builder
        }

        #[must_use]
        pub fn with_peer_id(mut self, peer_id: &Id) -> Self {
            self.peer.peer_id = *peer_id;
            self
        }

        #[must_use]
        pub fn with_peer_addr(mut self, peer_addr: &SocketAddr) -> Self {
            self.peer.peer_addr = *peer_addr;
            self
        }

        #[must_use]
        pub fn with_event(mut self, event: AnnounceEvent) -> Self {
            self.peer.event = event;
            self
        }

        #[must_use]
        pub fn with_bytes_left(mut self, left: i64) -> Self {
            self.peer.left = NumberOfBytes(left);
            self
        }

        #[must_use]
        pub fn last_updated_on(mut self, updated: DurationSinceUnixEpoch) -> Self {
            self.peer.updated = updated;
            self
        }

        #[must_use]
        pub fn build(self) -> Peer {
            self.peer
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fixture::PeerBuilder;
    use super::Id;
    use crate::announce_event::AnnounceEvent;

    #[test]
    fn it_should_convert_a_peer_id_to_hex() {
        let id = Id(*b"-qB00000000000000001");

        assert_eq!(id.to_hex_string(), "2D71423030303030303030303030303030303031");
    }

    #[test]
    fn it_should_reject_peer_ids_that_are_not_20_bytes() {
        assert!(Id::try_from(b"too short".to_vec()).is_err());
        assert!(Id::try_from(vec![0u8; 21]).is_err());
    }

    #[test]
    fn it_should_classify_peers_with_no_bytes_left_as_seeders() {
        assert!(PeerBuilder::seeder().build().is_seeder());
        assert!(!PeerBuilder::leecher().build().is_seeder());
    }

    #[test]
    fn it_should_not_classify_a_stopped_peer_as_a_seeder() {
        let peer = PeerBuilder::default()
            .with_bytes_left(0)
            .with_event(AnnounceEvent::Stopped)
            .build();

        assert!(!peer.is_seeder());
    }
}
