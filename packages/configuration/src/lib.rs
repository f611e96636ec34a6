//! Configuration data structures for the Depot tracker.
//!
//! The configuration is loaded from a [TOML](https://toml.io/en/) file
//! (`depot-tracker.toml` by default) and every value can be overridden with a
//! `DEPOT_TRACKER_`-prefixed environment variable. When neither is present
//! the defaults below apply.
//!
//! Default configuration:
//!
//! ```toml
//! log_level = "info"
//! announce_interval = 1800
//! min_announce_interval = 900
//! max_peer_timeout = 3600
//! inactive_peer_cleanup_interval = 15
//!
//! [http_tracker]
//! bind_address = "0.0.0.0:6969"
//! ```
//!
//! `max_peer_timeout` is the freshness window for peer eviction. A peer that
//! keeps re-announcing on `announce_interval` must stay fresh, so the window
//! is validated to be strictly greater than the interval (the default is
//! twice the interval).
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::str::FromStr;
use std::{env, fs};

use derive_more::Constructor;
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The maximum number of peers returned in a single announce response,
/// whatever `numwant` the client asks for.
pub const TORRENT_PEERS_LIMIT: usize = 74;

/// Prefix for environment variable overrides, e.g.
/// `DEPOT_TRACKER_ANNOUNCE_INTERVAL=60`.
const CONFIG_ENV_VAR_PREFIX: &str = "DEPOT_TRACKER_";

/// Environment variable holding the whole configuration in TOML format,
/// for containers and other environments without a config file.
const CONFIG_ENV_VAR: &str = "DEPOT_TRACKER_CONFIG";

/// Information required for loading the configuration.
#[derive(Debug, Default, Clone)]
pub struct Info {
    tracker_toml: String,
}

impl Info {
    /// Gathers the raw TOML configuration from the `DEPOT_TRACKER_CONFIG`
    /// env var or from the given file path, in that order of preference.
    ///
    /// # Errors
    ///
    /// Will return an error if the configuration file cannot be read.
    pub fn new(default_config_path: &str) -> Result<Self, Error> {
        let tracker_toml = if let Ok(tracker_toml) = env::var(CONFIG_ENV_VAR) {
            tracker_toml
        } else if fs::metadata(default_config_path).is_ok() {
            fs::read_to_string(default_config_path).map_err(|err| Error::UnableToLoadFromConfigFile {
                path: default_config_path.to_owned(),
                source: err,
            })?
        } else {
            // No file, no env var: run on defaults.
            String::new()
        };

        Ok(Self { tracker_toml })
    }

    /// Configuration info from an in-memory TOML string, for tests.
    #[must_use]
    pub fn from_toml(tracker_toml: &str) -> Self {
        Self {
            tracker_toml: tracker_toml.to_owned(),
        }
    }
}

/// Announce policy returned to clients in every announce response.
#[derive(Serialize, Deserialize, PartialEq, Eq, Debug, Clone, Copy, Constructor)]
pub struct AnnouncePolicy {
    /// Interval in seconds that the client should wait between sending
    /// regular announce requests to the tracker. A **recommended** wait time.
    pub interval: u32,

    /// Minimum announce interval in seconds. Clients must not reannounce
    /// more frequently than this.
    pub interval_min: u32,
}

impl Default for AnnouncePolicy {
    fn default() -> Self {
        Self {
            interval: 1800,
            interval_min: 900,
        }
    }
}

/// Configuration for the HTTP tracker server.
#[derive(Serialize, Deserialize, PartialEq, Eq, Debug, Clone)]
pub struct HttpTracker {
    /// The address the tracker will bind to, `ip:port`. Use `0.0.0.0` to
    /// listen on all interfaces and port `0` to let the operating system
    /// pick a random port.
    pub bind_address: String,
}

impl Default for HttpTracker {
    fn default() -> Self {
        Self {
            bind_address: String::from("0.0.0.0:6969"),
        }
    }
}

/// Core configuration for the tracker.
#[derive(Serialize, Deserialize, PartialEq, Eq, Debug, Clone)]
pub struct Configuration {
    /// Logging threshold. Possible values are: `off`, `error`, `warn`,
    /// `info`, `debug` and `trace`. Default is `info`.
    pub log_level: Option<String>,

    /// See [`AnnouncePolicy::interval`].
    pub announce_interval: u32,

    /// See [`AnnouncePolicy::interval_min`].
    pub min_announce_interval: u32,

    /// Maximum time in seconds that a peer can go without announcing before
    /// it is considered stale and removed from its torrent's peer table.
    pub max_peer_timeout: u32,

    /// Interval in seconds between reaper sweeps that remove stale peers.
    pub inactive_peer_cleanup_interval: u64,

    /// The external IP address of the tracker. When a peer announces from a
    /// loopback address (peer and tracker on the same host), this address is
    /// handed out to other peers instead.
    pub external_ip: Option<String>,

    /// Directory scanned for `*.torrent` files on startup. Every metainfo
    /// file found is admitted to the (closed) tracker.
    pub torrents_dir: Option<PathBuf>,

    /// HTTP tracker server configuration.
    pub http_tracker: HttpTracker,
}

impl Default for Configuration {
    fn default() -> Self {
        let announce_policy = AnnouncePolicy::default();

        Self {
            log_level: Some(String::from("info")),
            announce_interval: announce_policy.interval,
            min_announce_interval: announce_policy.interval_min,
            max_peer_timeout: announce_policy.interval * 2,
            inactive_peer_cleanup_interval: 15,
            external_ip: None,
            torrents_dir: None,
            http_tracker: HttpTracker::default(),
        }
    }
}

impl Configuration {
    /// Loads the configuration from the gathered [`Info`], layering TOML
    /// under `DEPOT_TRACKER_*` environment overrides on top of the defaults.
    ///
    /// # Errors
    ///
    /// Will return an error if the TOML or the env overrides cannot be
    /// deserialized, or if the resulting configuration is inconsistent.
    pub fn load(info: &Info) -> Result<Configuration, Error> {
        let figment = Figment::from(Serialized::defaults(Configuration::default()))
            .merge(Toml::string(&info.tracker_toml))
            .merge(Env::prefixed(CONFIG_ENV_VAR_PREFIX).split("__"));

        let configuration: Configuration = figment.extract()?;
        configuration.validate()?;

        Ok(configuration)
    }

    /// The announce policy handed to clients.
    #[must_use]
    pub fn announce_policy(&self) -> AnnouncePolicy {
        AnnouncePolicy::new(self.announce_interval, self.min_announce_interval)
    }

    /// Returns the tracker public IP address if defined in the
    /// configuration, and `None` otherwise.
    #[must_use]
    pub fn get_ext_ip(&self) -> Option<IpAddr> {
        self.external_ip.as_ref().and_then(|ip| IpAddr::from_str(ip).ok())
    }

    /// The socket address the HTTP tracker binds to.
    ///
    /// # Errors
    ///
    /// Will return an error if `http_tracker.bind_address` is not a valid
    /// socket address.
    pub fn bind_address(&self) -> Result<SocketAddr, Error> {
        SocketAddr::from_str(&self.http_tracker.bind_address).map_err(|_| Error::InvalidBindAddress {
            bind_address: self.http_tracker.bind_address.clone(),
        })
    }

    fn validate(&self) -> Result<(), Error> {
        if self.announce_interval == 0 {
            return Err(Error::InvalidAnnounceInterval {
                interval: self.announce_interval,
            });
        }

        // A peer re-announcing on its published interval must stay fresh.
        if u64::from(self.max_peer_timeout) <= u64::from(self.announce_interval) {
            return Err(Error::PeerTimeoutNotGreaterThanInterval {
                max_peer_timeout: self.max_peer_timeout,
                announce_interval: self.announce_interval,
            });
        }

        self.bind_address()?;

        Ok(())
    }
}

/// Errors raised while loading or validating the configuration.
#[derive(Error, Debug)]
pub enum Error {
    #[error("unable to load configuration file {path}: {source}")]
    UnableToLoadFromConfigFile {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed processing the configuration: {source}")]
    ConfigError {
        #[from]
        source: figment::Error,
    },

    #[error("announce interval must be positive, got {interval}")]
    InvalidAnnounceInterval { interval: u32 },

    #[error("max_peer_timeout ({max_peer_timeout}) must be strictly greater than announce_interval ({announce_interval})")]
    PeerTimeoutNotGreaterThanInterval {
        max_peer_timeout: u32,
        announce_interval: u32,
    },

    #[error("invalid bind address: {bind_address}")]
    InvalidBindAddress { bind_address: String },
}
