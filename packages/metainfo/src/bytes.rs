//! Byte utilities: SHA-1 wrapping and ISO-8859-1 byte-string conversions.
use sha1::{Digest, Sha1};

/// Length in bytes of a SHA-1 digest.
pub const SHA1_DIGEST_LEN: usize = 20;

/// SHA-1 of the given bytes.
#[must_use]
pub fn sha1(bytes: &[u8]) -> [u8; SHA1_DIGEST_LEN] {
    let mut hasher = Sha1::new();
    hasher.update(bytes);
    hasher.finalize().into()
}

/// Decodes a bencode byte string for human consumption.
///
/// Metainfo text fields are ISO-8859-1 by convention: every byte maps to the
/// code point with the same value, so this conversion never fails and never
/// loses data. Raw bytes are preserved wherever the value is re-encoded.
#[must_use]
pub fn latin1_to_string(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| char::from(b)).collect()
}

/// Encodes a string back into ISO-8859-1 bytes.
///
/// Returns `None` if the string contains a code point above U+00FF, which
/// has no ISO-8859-1 representation.
#[must_use]
pub fn string_to_latin1(text: &str) -> Option<Vec<u8>> {
    text.chars().map(|c| u8::try_from(u32::from(c)).ok()).collect()
}

#[cfg(test)]
mod tests {
    use super::{latin1_to_string, sha1, string_to_latin1};

    #[test]
    fn it_should_compute_the_sha1_of_a_known_vector() {
        // SHA1("abc"), from FIPS 180-1.
        let expected = [
            0xA9, 0x99, 0x3E, 0x36, 0x47, 0x06, 0x81, 0x6A, 0xBA, 0x3E, 0x25, 0x71, 0x78, 0x50, 0xC2, 0x6C, 0x9C, 0xD0,
            0xD8, 0x9D,
        ];

        assert_eq!(sha1(b"abc"), expected);
    }

    #[test]
    fn it_should_round_trip_latin1_text() {
        let bytes: Vec<u8> = (0u8..=255).collect();

        let text = latin1_to_string(&bytes);
        assert_eq!(string_to_latin1(&text).unwrap(), bytes);
    }

    #[test]
    fn it_should_refuse_to_encode_text_outside_latin1() {
        assert!(string_to_latin1("\u{0100}").is_none());
    }
}
