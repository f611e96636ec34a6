use derive_more::Constructor;

/// Swarm statistics for one torrent, using the wire names of the announce
/// response: `complete` are active seeders, `incomplete` are active leechers.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default, Constructor)]
pub struct SwarmMetadata {
    /// The number of active peers that have completed downloading (seeders).
    pub complete: u32,
    /// The number of active peers that have not completed downloading (leechers).
    pub incomplete: u32,
}

impl SwarmMetadata {
    #[must_use]
    pub fn zeroed() -> Self {
        Self::default()
    }
}
