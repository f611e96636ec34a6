//! In-memory representation of a torrent metainfo file.
use std::collections::HashSet;
use std::path::{Path, PathBuf};

use depot_bencode::{BencodeRef, DecodeOpt, Dict};
use depot_tracker_primitives::info_hash::InfoHash;
use url::Url;

use crate::bytes::{latin1_to_string, sha1};
use crate::Error;

pub(crate) const ANNOUNCE_KEY: &str = "announce";
pub(crate) const ANNOUNCE_LIST_KEY: &str = "announce-list";
pub(crate) const COMMENT_KEY: &str = "comment";
pub(crate) const CREATED_BY_KEY: &str = "created by";
pub(crate) const CREATION_DATE_KEY: &str = "creation date";
pub(crate) const INFO_KEY: &str = "info";
pub(crate) const LENGTH_KEY: &str = "length";
pub(crate) const FILES_KEY: &str = "files";
pub(crate) const NAME_KEY: &str = "name";
pub(crate) const PATH_KEY: &str = "path";
pub(crate) const PIECE_LENGTH_KEY: &str = "piece length";
pub(crate) const PIECES_KEY: &str = "pieces";

const MAX_METAINFO_RECURSION: usize = 50;

/// One file described by the metainfo: its length and its path relative to
/// the download root, using platform separators for the storage layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TorrentFile {
    pub length: u64,
    pub path: PathBuf,
}

/// A parsed torrent metainfo file.
///
/// The info-hash is computed from the raw bytes of the `info` substructure
/// observed during decoding, so it is exact for any accepted input, and it
/// is immutable for a given value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Metainfo {
    encoded: Vec<u8>,
    info_hash: InfoHash,
    name: Vec<u8>,
    piece_length: u64,
    pieces: Vec<u8>,
    files: Vec<TorrentFile>,
    multi_file: bool,
    announce: Option<Url>,
    announce_tiers: Vec<Vec<Url>>,
    comment: Option<Vec<u8>>,
    created_by: Option<Vec<u8>>,
    creation_date: Option<i64>,
    seeder: bool,
}

impl Metainfo {
    /// Parses the bencoded contents of a `.torrent` file.
    ///
    /// `seeder` marks a torrent whose data is locally available in full;
    /// torrents created from local files are always seeder-mode.
    ///
    /// # Errors
    ///
    /// - [`Error::MalformedBencode`] when the input is not strictly valid
    ///   bencode (including unsorted or duplicated dictionary keys).
    /// - [`Error::MalformedMetainfo`] when the bencode is valid but the
    ///   metainfo schema is violated.
    /// - [`Error::UnsupportedUri`] when an announce URI fails strict parsing.
    pub fn parse(encoded: Vec<u8>, seeder: bool) -> Result<Metainfo, Error> {
        let parsed = {
            let bencode = BencodeRef::decode(&encoded, DecodeOpt::new(MAX_METAINFO_RECURSION, true, true))?;
            Parsed::from_bencode(&bencode)?
        };

        Ok(Metainfo {
            encoded,
            info_hash: parsed.info_hash,
            name: parsed.name,
            piece_length: parsed.piece_length,
            pieces: parsed.pieces,
            files: parsed.files,
            multi_file: parsed.multi_file,
            announce: parsed.announce,
            announce_tiers: parsed.announce_tiers,
            comment: parsed.comment,
            created_by: parsed.created_by,
            creation_date: parsed.creation_date,
            seeder,
        })
    }

    /// Reads a `.torrent` file from disk and parses it.
    ///
    /// # Errors
    ///
    /// Same as [`Metainfo::parse`], plus [`Error::Io`] when the file cannot
    /// be read.
    pub fn load<P: AsRef<Path>>(path: P, seeder: bool) -> Result<Metainfo, Error> {
        let encoded = std::fs::read(path)?;
        Metainfo::parse(encoded, seeder)
    }

    /// The torrent name: file name for single-file torrents, top level
    /// directory for multi-file ones. ISO-8859-1 decoded for display.
    #[must_use]
    pub fn name(&self) -> String {
        latin1_to_string(&self.name)
    }

    /// The 20-byte info-hash identifying this torrent's swarm.
    #[must_use]
    pub fn info_hash(&self) -> InfoHash {
        self.info_hash
    }

    /// The info-hash as an uppercase 40-character hex string.
    #[must_use]
    pub fn info_hash_hex(&self) -> String {
        self.info_hash.to_hex_string()
    }

    /// Total declared size: the sum of all file lengths.
    #[must_use]
    pub fn total_size(&self) -> u64 {
        self.files.iter().map(|file| file.length).sum()
    }

    /// Number of bytes in each piece (the final piece may be shorter).
    #[must_use]
    pub fn piece_length(&self) -> u64 {
        self.piece_length
    }

    /// Concatenated 20-byte SHA-1 digests of consecutive pieces.
    #[must_use]
    pub fn pieces(&self) -> &[u8] {
        &self.pieces
    }

    /// The files carried by this torrent, with platform relative paths for
    /// the storage layer. Single-file torrents have exactly one entry.
    #[must_use]
    pub fn files(&self) -> &[TorrentFile] {
        &self.files
    }

    /// The main announce URI, when present.
    #[must_use]
    pub fn announce(&self) -> Option<&Url> {
        self.announce.as_ref()
    }

    /// Announce tiers in operator-supplied order. When the metainfo only
    /// carries a plain `announce`, that URI forms a single tier. Duplicate
    /// URIs across tiers are dropped on read, keeping the first occurrence
    /// in its tier.
    #[must_use]
    pub fn announce_tiers(&self) -> Vec<Vec<Url>> {
        if self.announce_tiers.is_empty() {
            return self.announce.iter().map(|url| vec![url.clone()]).collect();
        }
        self.announce_tiers.clone()
    }

    /// True when the metainfo carries no announce URIs at all.
    #[must_use]
    pub fn is_trackerless(&self) -> bool {
        self.announce.is_none() && self.announce_tiers.is_empty()
    }

    #[must_use]
    pub fn is_multi_file(&self) -> bool {
        self.multi_file
    }

    /// True when the torrent data is locally available in full.
    #[must_use]
    pub fn is_seeder(&self) -> bool {
        self.seeder
    }

    /// The original bencoded blob this value was parsed from.
    #[must_use]
    pub fn encoded(&self) -> &[u8] {
        &self.encoded
    }

    #[must_use]
    pub fn comment(&self) -> Option<String> {
        self.comment.as_deref().map(latin1_to_string)
    }

    #[must_use]
    pub fn created_by(&self) -> Option<String> {
        self.created_by.as_deref().map(latin1_to_string)
    }

    /// Creation time in seconds since the Unix epoch, when present.
    #[must_use]
    pub fn creation_date(&self) -> Option<i64> {
        self.creation_date
    }

    /// Re-hashes the torrent's files as found under `parent` and compares
    /// the digests against the published `pieces`.
    ///
    /// Returns `true` when the local data matches the metainfo exactly.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] when any of the files cannot be read.
    pub fn verify_data<P: AsRef<Path>>(&self, parent: P) -> Result<bool, Error> {
        let paths: Vec<PathBuf> = self
            .files
            .iter()
            .map(|file| parent.as_ref().join(&file.path))
            .collect();

        let pieces = crate::pieces::hash_pieces(&paths, self.piece_length)?;

        Ok(pieces == self.pieces)
    }
}

/// Owned values extracted from the borrowed bencode tree.
struct Parsed {
    info_hash: InfoHash,
    name: Vec<u8>,
    piece_length: u64,
    pieces: Vec<u8>,
    files: Vec<TorrentFile>,
    multi_file: bool,
    announce: Option<Url>,
    announce_tiers: Vec<Vec<Url>>,
    comment: Option<Vec<u8>>,
    created_by: Option<Vec<u8>>,
    creation_date: Option<i64>,
}

impl Parsed {
    fn from_bencode(bencode: &BencodeRef<'_>) -> Result<Parsed, Error> {
        let root = as_dict(bencode, "metainfo root")?;

        let info_ref = required(root, INFO_KEY)?;
        let info = as_dict(info_ref, INFO_KEY)?;

        // The swarm identity is the hash of the exact bytes the `info`
        // value occupies in the input.
        let info_hash = InfoHash::from(sha1(info_ref.buffer()));

        let name = as_bytes(required(info, NAME_KEY)?, NAME_KEY)?.to_vec();

        let piece_length = as_int(required(info, PIECE_LENGTH_KEY)?, PIECE_LENGTH_KEY)?;
        let piece_length = u64::try_from(piece_length).map_err(|_| Error::malformed("piece length is not positive"))?;
        if piece_length == 0 {
            return Err(Error::malformed("piece length is not positive"));
        }

        let pieces = as_bytes(required(info, PIECES_KEY)?, PIECES_KEY)?.to_vec();

        let (files, multi_file) = parse_files(info, &name)?;

        let announce = match root.lookup(ANNOUNCE_KEY.as_bytes()) {
            Some(value) => Some(parse_announce_url(as_bytes(value, ANNOUNCE_KEY)?)?),
            None => None,
        };

        let announce_tiers = match root.lookup(ANNOUNCE_LIST_KEY.as_bytes()) {
            Some(value) => parse_announce_tiers(value)?,
            None => Vec::new(),
        };

        let comment = match root.lookup(COMMENT_KEY.as_bytes()) {
            Some(value) => Some(as_bytes(value, COMMENT_KEY)?.to_vec()),
            None => None,
        };

        let created_by = match root.lookup(CREATED_BY_KEY.as_bytes()) {
            Some(value) => Some(as_bytes(value, CREATED_BY_KEY)?.to_vec()),
            None => None,
        };

        let creation_date = match root.lookup(CREATION_DATE_KEY.as_bytes()) {
            Some(value) => Some(as_int(value, CREATION_DATE_KEY)?),
            None => None,
        };

        Ok(Parsed {
            info_hash,
            name,
            piece_length,
            pieces,
            files,
            multi_file,
            announce,
            announce_tiers,
            comment,
            created_by,
            creation_date,
        })
    }
}

fn parse_files(info: &Dict<'_>, name: &[u8]) -> Result<(Vec<TorrentFile>, bool), Error> {
    let length = info.lookup(LENGTH_KEY.as_bytes());
    let file_list = info.lookup(FILES_KEY.as_bytes());

    match (length, file_list) {
        (Some(_), Some(_)) => Err(Error::malformed("both length and files are present")),
        (None, None) => Err(Error::malformed("neither length nor files is present")),
        (Some(length), None) => {
            let length = as_int(length, LENGTH_KEY)?;
            let length = u64::try_from(length).map_err(|_| Error::malformed("file length is negative"))?;

            let file = TorrentFile {
                length,
                path: PathBuf::from(latin1_to_string(name)),
            };

            Ok((vec![file], false))
        }
        (None, Some(file_list)) => {
            let file_list = as_list(file_list, FILES_KEY)?;

            let mut files = Vec::with_capacity(file_list.len());
            for entry in file_list {
                let entry = as_dict(entry, FILES_KEY)?;

                let length = as_int(required(entry, LENGTH_KEY)?, LENGTH_KEY)?;
                let length = u64::try_from(length).map_err(|_| Error::malformed("file length is negative"))?;

                let components = as_list(required(entry, PATH_KEY)?, PATH_KEY)?;
                if components.is_empty() {
                    return Err(Error::malformed("file path has zero components"));
                }

                let mut path = PathBuf::new();
                for component in components {
                    let component = as_bytes(component, PATH_KEY)?;
                    path.push(latin1_to_string(component));
                }

                files.push(TorrentFile { length, path });
            }

            if files.is_empty() {
                return Err(Error::malformed("files list is empty"));
            }

            Ok((files, true))
        }
    }
}

fn parse_announce_tiers(value: &BencodeRef<'_>) -> Result<Vec<Vec<Url>>, Error> {
    let tier_list = as_list(value, ANNOUNCE_LIST_KEY)?;

    let mut seen: HashSet<String> = HashSet::new();
    let mut tiers = Vec::with_capacity(tier_list.len());

    for tier in tier_list {
        let tier = as_list(tier, ANNOUNCE_LIST_KEY)?;

        let mut urls = Vec::with_capacity(tier.len());
        for url in tier {
            let url = parse_announce_url(as_bytes(url, ANNOUNCE_LIST_KEY)?)?;

            // Keep the first occurrence of each URI in its tier.
            if seen.insert(url.as_str().to_owned()) {
                urls.push(url);
            }
        }

        if !urls.is_empty() {
            tiers.push(urls);
        }
    }

    Ok(tiers)
}

fn parse_announce_url(raw: &[u8]) -> Result<Url, Error> {
    let text = latin1_to_string(raw);
    Url::parse(&text).map_err(|source| Error::UnsupportedUri { uri: text, source })
}

// Schema extraction helpers: every mismatch between the decoded tree and
// the metainfo schema is a `MalformedMetainfo`, named after the offending
// key.

fn required<'a, 'b>(dict: &'b Dict<'a>, key: &str) -> Result<&'b BencodeRef<'a>, Error> {
    dict.lookup(key.as_bytes())
        .ok_or_else(|| Error::MalformedMetainfo {
            reason: format!("missing key {key}"),
        })
}

fn as_int(value: &BencodeRef<'_>, key: &str) -> Result<i64, Error> {
    value.int().ok_or_else(|| wrong_type(key, "an integer"))
}

fn as_bytes<'a>(value: &BencodeRef<'a>, key: &str) -> Result<&'a [u8], Error> {
    value.bytes().ok_or_else(|| wrong_type(key, "a byte string"))
}

fn as_list<'a, 'b>(value: &'b BencodeRef<'a>, key: &str) -> Result<&'b [BencodeRef<'a>], Error> {
    value.list().ok_or_else(|| wrong_type(key, "a list"))
}

fn as_dict<'a, 'b>(value: &'b BencodeRef<'a>, key: &str) -> Result<&'b Dict<'a>, Error> {
    value.dict().ok_or_else(|| wrong_type(key, "a dictionary"))
}

fn wrong_type(key: &str, expected: &str) -> Error {
    Error::MalformedMetainfo {
        reason: format!("{key} is not {expected}"),
    }
}
