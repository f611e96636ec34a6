//! Borrowing bencode decoder.
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::str;

use crate::error::BencodeParseError;

const DEFAULT_MAX_RECURSION: usize = 50;
const DEFAULT_CHECK_KEY_SORT: bool = false;
const DEFAULT_ENFORCE_FULL_DECODE: bool = true;

/// Options controlling decoder behavior.
#[derive(Copy, Clone)]
pub struct DecodeOpt {
    max_recursion: usize,
    check_key_sort: bool,
    enforce_full_decode: bool,
}

impl DecodeOpt {
    #[must_use]
    pub fn new(max_recursion: usize, check_key_sort: bool, enforce_full_decode: bool) -> DecodeOpt {
        DecodeOpt {
            max_recursion,
            check_key_sort,
            enforce_full_decode,
        }
    }

    /// Maximum nesting depth accepted while decoding.
    #[must_use]
    pub fn max_recursion(&self) -> usize {
        self.max_recursion
    }

    /// Whether out of order dictionary keys are an error (strict decode).
    /// Duplicate keys are rejected regardless of this option.
    #[must_use]
    pub fn check_key_sort(&self) -> bool {
        self.check_key_sort
    }

    /// Whether the decoded value must consume the whole input. Disable this
    /// to decode a bencoded prefix and measure the consumed bytes through
    /// [`BencodeRef::buffer`].
    #[must_use]
    pub fn enforce_full_decode(&self) -> bool {
        self.enforce_full_decode
    }
}

impl Default for DecodeOpt {
    fn default() -> DecodeOpt {
        DecodeOpt::new(DEFAULT_MAX_RECURSION, DEFAULT_CHECK_KEY_SORT, DEFAULT_ENFORCE_FULL_DECODE)
    }
}

/// A decoded bencode value borrowing from the input buffer.
///
/// Every node remembers the byte range it was decoded from; see
/// [`buffer`](BencodeRef::buffer).
#[derive(Debug, Eq, PartialEq, Clone, Hash)]
pub struct BencodeRef<'a> {
    inner: Inner<'a>,
}

#[derive(Debug, Eq, PartialEq, Clone, Hash)]
enum Inner<'a> {
    Int(i64, &'a [u8]),
    Bytes(&'a [u8], &'a [u8]),
    List(Vec<BencodeRef<'a>>, &'a [u8]),
    Dict(Dict<'a>, &'a [u8]),
}

impl<'a> From<Inner<'a>> for BencodeRef<'a> {
    fn from(inner: Inner<'a>) -> Self {
        BencodeRef { inner }
    }
}

/// A decoded bencode dictionary: byte-string keys in ascending order,
/// each mapped to a decoded value.
#[derive(Debug, Eq, PartialEq, Clone, Hash, Default)]
pub struct Dict<'a> {
    entries: BTreeMap<&'a [u8], BencodeRef<'a>>,
}

impl<'a> Dict<'a> {
    /// The value stored under the given key, if present.
    #[must_use]
    pub fn lookup(&self, key: &[u8]) -> Option<&BencodeRef<'a>> {
        self.entries.get(key)
    }

    /// Key/value pairs in ascending key order.
    pub fn iter<'b>(&'b self) -> impl Iterator<Item = (&'a [u8], &'b BencodeRef<'a>)> + 'b {
        self.entries.iter().map(|(key, value)| (*key, value))
    }
}

impl<'a> BencodeRef<'a> {
    /// Decode the given bytes with the given options.
    ///
    /// # Errors
    ///
    /// Returns a [`BencodeParseError`] when the input is not structurally
    /// valid bencode, or leaves trailing bytes while
    /// [`DecodeOpt::enforce_full_decode`] is set.
    pub fn decode(bytes: &'a [u8], opts: DecodeOpt) -> Result<BencodeRef<'a>, BencodeParseError> {
        let (bencode, end_pos) = decode_any(bytes, 0, opts, 0)?;

        if end_pos != bytes.len() && opts.enforce_full_decode() {
            return Err(BencodeParseError::BytesEmpty { pos: end_pos });
        }

        Ok(bencode)
    }

    /// The exact input bytes this value was decoded from.
    ///
    /// For the root value of a partial decode this is the consumed prefix;
    /// for a nested value it is the canonical byte range of that
    /// substructure, suitable for hashing.
    #[must_use]
    pub fn buffer(&self) -> &'a [u8] {
        match self.inner {
            Inner::Int(_, buffer) | Inner::Bytes(_, buffer) | Inner::List(_, buffer) | Inner::Dict(_, buffer) => buffer,
        }
    }

    /// The value as an integer, if it is one.
    #[must_use]
    pub fn int(&self) -> Option<i64> {
        match self.inner {
            Inner::Int(value, _) => Some(value),
            _ => None,
        }
    }

    /// The value as a raw byte string, if it is one. The returned slice
    /// lives as long as the input buffer.
    #[must_use]
    pub fn bytes(&self) -> Option<&'a [u8]> {
        match self.inner {
            Inner::Bytes(value, _) => Some(value),
            _ => None,
        }
    }

    /// The value as a UTF-8 string, if it is a byte string holding valid
    /// UTF-8.
    #[must_use]
    pub fn str(&self) -> Option<&'a str> {
        str::from_utf8(self.bytes()?).ok()
    }

    /// The value as a list of decoded values, if it is a list.
    #[must_use]
    pub fn list(&self) -> Option<&[BencodeRef<'a>]> {
        match self.inner {
            Inner::List(ref values, _) => Some(values),
            _ => None,
        }
    }

    /// The value as a dictionary, if it is one.
    #[must_use]
    pub fn dict(&self) -> Option<&Dict<'a>> {
        match self.inner {
            Inner::Dict(ref dict, _) => Some(dict),
            _ => None,
        }
    }
}

fn decode_any(bytes: &[u8], pos: usize, opts: DecodeOpt, depth: usize) -> Result<(BencodeRef<'_>, usize), BencodeParseError> {
    if depth >= opts.max_recursion() {
        return Err(BencodeParseError::InvalidRecursionExceeded { pos, max: depth });
    }

    match peek_byte(bytes, pos)? {
        crate::TOKEN_INT => {
            let (value, next_pos) = decode_int(bytes, pos + 1, crate::TOKEN_END)?;
            Ok((Inner::Int(value, &bytes[pos..next_pos]).into(), next_pos))
        }
        crate::TOKEN_LIST => {
            let (list, next_pos) = decode_list(bytes, pos + 1, opts, depth)?;
            Ok((Inner::List(list, &bytes[pos..next_pos]).into(), next_pos))
        }
        crate::TOKEN_DICT => {
            let (dict, next_pos) = decode_dict(bytes, pos + 1, opts, depth)?;
            Ok((Inner::Dict(dict, &bytes[pos..next_pos]).into(), next_pos))
        }
        crate::DIGIT_LOW..=crate::DIGIT_HIGH => {
            // The range starts at the first length digit.
            let (string, next_pos) = decode_bytes(bytes, pos)?;
            Ok((Inner::Bytes(string, &bytes[pos..next_pos]).into(), next_pos))
        }
        _ => Err(BencodeParseError::InvalidByte { pos }),
    }
}

fn decode_int(bytes: &[u8], pos: usize, delim: u8) -> Result<(i64, usize), BencodeParseError> {
    let remaining = &bytes[pos..];

    let Some(delim_offset) = remaining.iter().position(|b| *b == delim) else {
        return Err(BencodeParseError::InvalidIntNoDelimiter { pos });
    };
    let digits = &remaining[..delim_offset];

    if digits.len() > 1 {
        // "-0" is never valid, and neither is zero padding like "042".
        if digits[0] == b'-' && digits[1] == b'0' {
            return Err(BencodeParseError::InvalidIntNegativeZero { pos });
        }
        if digits[0] == b'0' {
            return Err(BencodeParseError::InvalidIntZeroPadding { pos });
        }
    }

    let Ok(digits_str) = str::from_utf8(digits) else {
        return Err(BencodeParseError::InvalidIntParseError { pos });
    };

    // str::parse rejects embedded signs, whitespace and non digits.
    let value = digits_str
        .parse::<i64>()
        .map_err(|_| BencodeParseError::InvalidIntParseError { pos })?;

    let next_pos = pos + delim_offset + 1;
    Ok((value, next_pos))
}

fn decode_bytes(bytes: &[u8], pos: usize) -> Result<(&[u8], usize), BencodeParseError> {
    let (len, start_pos) = decode_int(bytes, pos, crate::TOKEN_LEN_SEP)?;

    if len < 0 {
        return Err(BencodeParseError::InvalidLengthNegative { pos });
    }

    let len = usize::try_from(len).map_err(|_| BencodeParseError::InvalidLengthOverflow { pos })?;

    if len > bytes[start_pos..].len() {
        return Err(BencodeParseError::InvalidLengthOverflow { pos });
    }

    let next_pos = start_pos + len;
    Ok((&bytes[start_pos..next_pos], next_pos))
}

fn decode_list(
    bytes: &[u8],
    pos: usize,
    opts: DecodeOpt,
    depth: usize,
) -> Result<(Vec<BencodeRef<'_>>, usize), BencodeParseError> {
    let mut list = Vec::new();
    let mut curr_pos = pos;

    while peek_byte(bytes, curr_pos)? != crate::TOKEN_END {
        let (item, next_pos) = decode_any(bytes, curr_pos, opts, depth + 1)?;

        list.push(item);
        curr_pos = next_pos;
    }

    Ok((list, curr_pos + 1))
}

fn decode_dict(bytes: &[u8], pos: usize, opts: DecodeOpt, depth: usize) -> Result<(Dict<'_>, usize), BencodeParseError> {
    let mut entries = BTreeMap::new();
    let mut curr_pos = pos;

    while peek_byte(bytes, curr_pos)? != crate::TOKEN_END {
        let (key, next_pos) = decode_bytes(bytes, curr_pos)?;

        // Keys must arrive in ascending raw byte order on strict decodes.
        if opts.check_key_sort() {
            if let Some(last_key) = entries.keys().next_back() {
                if key < *last_key {
                    return Err(BencodeParseError::InvalidKeyOrdering {
                        pos: curr_pos,
                        key: key.to_vec(),
                    });
                }
            }
        }
        curr_pos = next_pos;

        let (value, next_pos) = decode_any(bytes, curr_pos, opts, depth + 1)?;
        match entries.entry(key) {
            Entry::Vacant(entry) => entry.insert(value),
            Entry::Occupied(_) => {
                return Err(BencodeParseError::InvalidKeyDuplicates {
                    pos: curr_pos,
                    key: key.to_vec(),
                })
            }
        };

        curr_pos = next_pos;
    }

    Ok((Dict { entries }, curr_pos + 1))
}

fn peek_byte(bytes: &[u8], pos: usize) -> Result<u8, BencodeParseError> {
    bytes.get(pos).copied().ok_or(BencodeParseError::BytesEmpty { pos })
}
