//! Percent decoding for the binary query params of the announce request.
//!
//! `info_hash` and `peer_id` are percent encoded from raw 20-byte arrays
//! which are usually not valid UTF-8, so they cannot go through a string
//! based form decoder; they are decoded byte-wise instead.
use depot_tracker_primitives::info_hash::{self, InfoHash};
use depot_tracker_primitives::peer;

/// Percent decodes a percent encoded info-hash.
///
/// For example, for the info-hash `3b245504cf5f11bbdbe1201cea6a6bf45aee1bc0`
/// the percent encoded form is `%3B%24U%04%CF%5F%11%BB%DB%E1%20%1C%EAjk%F4Z%EE%1B%C0`.
///
/// # Errors
///
/// Will return an error if the decoded bytes are not exactly 20.
pub fn percent_decode_info_hash(raw_info_hash: &str) -> Result<InfoHash, info_hash::ConversionError> {
    let bytes = percent_encoding::percent_decode_str(raw_info_hash).collect::<Vec<u8>>();
    InfoHash::try_from(bytes)
}

/// Percent decodes a percent encoded peer id.
///
/// # Errors
///
/// Will return an error if the decoded bytes are not exactly 20.
pub fn percent_decode_peer_id(raw_peer_id: &str) -> Result<peer::Id, peer::IdConversionError> {
    let bytes = percent_encoding::percent_decode_str(raw_peer_id).collect::<Vec<u8>>();
    peer::Id::try_from(bytes)
}
