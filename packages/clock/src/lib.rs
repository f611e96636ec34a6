//! Time related functions and types.
//!
//! It's usually a good idea to control where the time comes from in an
//! application so that it can be mocked for testing and controlled in
//! production. Freshness based peer eviction depends on "now", so the
//! tracker never calls `SystemTime::now()` directly; it goes through a
//! clock type instead.
//!
//! Clocks use [`DurationSinceUnixEpoch`](depot_tracker_primitives::DurationSinceUnixEpoch),
//! a `std::time::Duration` since the Unix epoch (a timestamp).
//!
//! Each consuming crate defines its own alias so production code gets the
//! working clock and tests get the stopped one:
//!
//! ```text
//! #[cfg(not(test))]
//! pub type CurrentClock = depot_tracker_clock::clock::Working;
//!
//! #[cfg(test)]
//! pub type CurrentClock = depot_tracker_clock::clock::Stopped;
//! ```
pub mod clock;
pub mod static_time;

#[macro_use]
extern crate lazy_static;

/// Working version, for production.
#[cfg(not(test))]
#[allow(dead_code)]
pub(crate) type CurrentClock = clock::Working;

/// Stopped version, for testing.
#[cfg(test)]
#[allow(dead_code)]
pub(crate) type CurrentClock = clock::Stopped;
