//! The HTTP tracker: the `announce` endpoint of the `BitTorrent` HTTP
//! tracker protocol.
//!
//! Only `GET /announce` is served; every other path is a plain `404`.
//! Protocol-level failures are reported the `BitTorrent` way: a bencoded
//! dictionary with a `failure reason` key and HTTP status `200`.
pub mod percent_encoding;
pub mod server;
pub mod v1;

/// The `Server` response header value, e.g. `BitTorrent Tracker (1.0.0)`.
pub const SERVER_BANNER: &str = concat!("BitTorrent Tracker (", env!("CARGO_PKG_VERSION"), ")");
