//! Decoding and encoding for bencode, the serialization format used by the
//! `BitTorrent` metainfo and tracker protocols.
//!
//! Decoding borrows from the input buffer and keeps, for every decoded value,
//! the exact byte range it was parsed from. That range is what callers hash
//! when they need the canonical bytes of a substructure (e.g. the `info`
//! dictionary of a torrent):
//!
//! ```rust
//! use depot_bencode::{BencodeRef, DecodeOpt};
//!
//! let data = b"d8:intervali1800ee";
//! let bencode = BencodeRef::decode(data, DecodeOpt::default()).unwrap();
//!
//! assert_eq!(
//!     1800,
//!     bencode.dict().unwrap().lookup(b"interval").unwrap().int().unwrap()
//! );
//! assert_eq!(&data[..], bencode.buffer());
//! ```
//!
//! Encoding goes through the owning [`BencodeMut`] tree and is deterministic:
//! dictionary keys are always emitted in ascending raw byte order.
//!
//! ```rust
//! use depot_bencode::{ben_bytes, ben_int, ben_map};
//!
//! let response = (ben_map! {
//!     "interval" => ben_int!(1800),
//!     "peers" => ben_bytes!("")
//! })
//! .encode();
//!
//! assert_eq!(&b"d8:intervali1800e5:peers0:e"[..], &response[..]);
//! ```

mod decode;
mod encode;
mod error;

pub use crate::decode::{BencodeRef, DecodeOpt, Dict};
pub use crate::encode::{BCowConvert, BencodeMut};
pub use crate::error::BencodeParseError;

const TOKEN_END: u8 = b'e';
const TOKEN_DICT: u8 = b'd';
const TOKEN_LIST: u8 = b'l';
const TOKEN_INT: u8 = b'i';
const TOKEN_LEN_SEP: u8 = b':';

const DIGIT_LOW: u8 = b'0';
const DIGIT_HIGH: u8 = b'9';

/// Construct a [`BencodeMut`] dictionary from string-like keys and
/// [`BencodeMut`] values.
#[macro_export]
macro_rules! ben_map {
    ( $($key:expr => $val:expr),* ) => {{
        use $crate::{BCowConvert, BencodeMut};

        let mut bencode_dict = BencodeMut::new_dict();
        {
            let dict = bencode_dict.dict_mut().unwrap();
            $(
                dict.insert(BCowConvert::convert($key), $val);
            )*
        }

        bencode_dict
    }}
}

/// Construct a [`BencodeMut`] list from [`BencodeMut`] values.
#[macro_export]
macro_rules! ben_list {
    ( $($val:expr),* ) => {{
        use $crate::BencodeMut;

        let mut bencode_list = BencodeMut::new_list();
        {
            let list = bencode_list.list_mut().unwrap();
            $(
                list.push($val);
            )*
        }

        bencode_list
    }}
}

/// Construct [`BencodeMut`] bytes from anything convertible to a byte buffer.
#[macro_export]
macro_rules! ben_bytes {
    ( $val:expr ) => {{
        use $crate::{BCowConvert, BencodeMut};

        BencodeMut::new_bytes(BCowConvert::convert($val))
    }};
}

/// Construct a [`BencodeMut`] integer from an `i64`.
#[macro_export]
macro_rules! ben_int {
    ( $val:expr ) => {{
        use $crate::BencodeMut;

        BencodeMut::new_int($val)
    }};
}
