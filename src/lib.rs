//! **Depot Tracker** is a closed [`BitTorrent`](https://www.bittorrent.org/)
//! tracker and metainfo engine used as the distribution substrate for build
//! dependencies.
//!
//! Build machines seed dependency archives; consumers discover each other
//! through the tracker and download pieces peer to peer. Only torrents the
//! operator explicitly announces to the tracker are accepted: an announce
//! for any other info-hash is rejected.
//!
//! The crate is organized like the services it runs:
//!
//! - [`core`]: the domain layer. The [`Tracker`](core::Tracker) owns the
//!   torrent registry and the per-torrent peer tables, independent of any
//!   delivery mechanism.
//! - [`servers`]: the delivery layer. An HTTP `announce` endpoint built on
//!   axum.
//! - [`bootstrap`]: process wiring. Logging, the HTTP server job and the
//!   stale-peer reaper job.
//! - [`app`]: starts and stops the whole service set.
//!
//! Metainfo parsing and creation live in the
//! [`depot-metainfo`](depot_metainfo) crate; bencode coding lives in
//! [`depot-bencode`](depot_bencode); shared value types live in
//! [`depot-tracker-primitives`](depot_tracker_primitives).
pub mod app;
pub mod bootstrap;
pub mod core;
pub mod servers;

/// This code needs to be copied into each crate.
/// Working version, for production.
#[cfg(not(test))]
pub type CurrentClock = depot_tracker_clock::clock::Working;

/// Stopped version, for testing.
#[cfg(test)]
pub type CurrentClock = depot_tracker_clock::clock::Stopped;
