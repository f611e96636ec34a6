use derive_more::Display;
use serde::{Deserialize, Serialize};

/// Announce events, as described in
/// [BEP 3. The `BitTorrent` Protocol Specification](https://www.bittorrent.org/beps/bep_0003.html).
#[derive(Hash, Clone, Copy, Debug, Display, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
pub enum AnnounceEvent {
    /// The peer has started downloading the torrent.
    #[display(fmt = "started")]
    Started,
    /// The peer has ceased downloading the torrent.
    #[display(fmt = "stopped")]
    Stopped,
    /// The peer has completed downloading the torrent.
    #[display(fmt = "completed")]
    Completed,
    /// One of the announcements done at regular intervals, or a peer whose
    /// state is not yet known.
    #[display(fmt = "")]
    None,
}
