//! Torrent metainfo engine for the Depot tracker.
//!
//! This crate owns everything that happens before a torrent reaches the
//! tracker registry:
//!
//! - [`Metainfo`]: the in-memory representation of a `.torrent` file. Parsing
//!   captures the raw bytes of the `info` substructure and hashes them, so
//!   the info-hash is exact for any input the strict decoder accepts.
//! - [`MetainfoBuilder`]: builds new metainfo files from local files or
//!   directories, hashing pieces concurrently.
//! - [`pieces`]: the parallel SHA-1 piece-hashing pipeline, shared by the
//!   builder and by on-disk data verification.
//! - [`storage`]: the partial-file storage contract consumed by download
//!   clients.
pub mod builder;
pub mod bytes;
pub mod pieces;
pub mod storage;
pub mod torrent;

use thiserror::Error;

pub use crate::builder::MetainfoBuilder;
pub use crate::torrent::Metainfo;

/// The default piece length used when creating torrents: 512 KiB.
pub const DEFAULT_PIECE_LENGTH: u64 = 524_288;

/// Error raised while parsing or creating metainfo.
#[derive(Error, Debug)]
pub enum Error {
    /// The input is not structurally valid bencode.
    #[error("malformed bencode: {source}")]
    MalformedBencode {
        #[from]
        source: depot_bencode::BencodeParseError,
    },

    /// The bencode is valid but the metainfo schema is violated.
    #[error("malformed metainfo: {reason}")]
    MalformedMetainfo { reason: String },

    /// An announce URI failed strict parsing.
    #[error("unsupported announce uri {uri}: {source}")]
    UnsupportedUri {
        uri: String,
        #[source]
        source: url::ParseError,
    },

    /// I/O failure while reading metainfo or hashing input files.
    #[error("i/o error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },
}

impl Error {
    pub(crate) fn malformed(reason: &str) -> Self {
        Error::MalformedMetainfo {
            reason: reason.to_owned(),
        }
    }
}
