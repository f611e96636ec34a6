//! Primitive types shared by the Depot tracker crates.
//!
//! These are the basic data structures used by the metainfo engine, the core
//! tracker and the HTTP delivery layer: info-hashes, peers and the values
//! peers report when they announce.
pub mod announce_event;
pub mod info_hash;
pub mod peer;
pub mod swarm_metadata;

use serde::{Deserialize, Serialize};

/// Duration since the Unix epoch (a timestamp).
pub type DurationSinceUnixEpoch = std::time::Duration;

/// A number of bytes reported by a peer: uploaded, downloaded or left.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NumberOfBytes(pub i64);
