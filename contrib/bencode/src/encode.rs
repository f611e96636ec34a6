//! Owning bencode tree and the canonical encoder.
use std::borrow::Cow;
use std::collections::BTreeMap;

/// An owned bencode value that can be built up and encoded.
///
/// Dictionaries are backed by an ordered map, so the canonical sorted-key
/// form falls out of plain iteration when encoding.
#[derive(Debug, Eq, PartialEq, Clone, Hash)]
pub struct BencodeMut<'a> {
    inner: Inner<'a>,
}

#[derive(Debug, Eq, PartialEq, Clone, Hash)]
enum Inner<'a> {
    Int(i64),
    Bytes(Cow<'a, [u8]>),
    List(Vec<BencodeMut<'a>>),
    Dict(BTreeMap<Cow<'a, [u8]>, BencodeMut<'a>>),
}

impl<'a> BencodeMut<'a> {
    fn new(inner: Inner<'a>) -> BencodeMut<'a> {
        BencodeMut { inner }
    }

    /// Create a new `BencodeMut` integer.
    #[must_use]
    pub fn new_int(value: i64) -> BencodeMut<'a> {
        BencodeMut::new(Inner::Int(value))
    }

    /// Create a new `BencodeMut` byte string.
    #[must_use]
    pub fn new_bytes(value: Cow<'a, [u8]>) -> BencodeMut<'a> {
        BencodeMut::new(Inner::Bytes(value))
    }

    /// Create a new empty `BencodeMut` list.
    #[must_use]
    pub fn new_list() -> BencodeMut<'a> {
        BencodeMut::new(Inner::List(Vec::new()))
    }

    /// Create a new empty `BencodeMut` dictionary.
    #[must_use]
    pub fn new_dict() -> BencodeMut<'a> {
        BencodeMut::new(Inner::Dict(BTreeMap::new()))
    }

    /// The list items, mutable, if the value is a list.
    #[must_use]
    pub fn list_mut(&mut self) -> Option<&mut Vec<BencodeMut<'a>>> {
        match self.inner {
            Inner::List(ref mut values) => Some(values),
            _ => None,
        }
    }

    /// The dictionary entries, mutable, if the value is a dictionary.
    #[must_use]
    pub fn dict_mut(&mut self) -> Option<&mut BTreeMap<Cow<'a, [u8]>, BencodeMut<'a>>> {
        match self.inner {
            Inner::Dict(ref mut entries) => Some(entries),
            _ => None,
        }
    }

    /// Encode the value into its canonical bencoded form.
    ///
    /// Dictionary keys are emitted in ascending raw byte order no matter how
    /// they were inserted, so the same tree always encodes to the same bytes.
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let mut buffer = Vec::new();

        encode_any(self, &mut buffer);

        buffer
    }
}

fn encode_any(value: &BencodeMut<'_>, buffer: &mut Vec<u8>) {
    match value.inner {
        Inner::Int(value) => encode_int(value, buffer),
        Inner::Bytes(ref bytes) => encode_bytes(bytes, buffer),
        Inner::List(ref values) => {
            buffer.push(crate::TOKEN_LIST);
            for item in values {
                encode_any(item, buffer);
            }
            buffer.push(crate::TOKEN_END);
        }
        Inner::Dict(ref entries) => {
            // The backing map already iterates in ascending key order,
            // which is exactly the canonical form.
            buffer.push(crate::TOKEN_DICT);
            for (key, item) in entries {
                encode_bytes(key, buffer);
                encode_any(item, buffer);
            }
            buffer.push(crate::TOKEN_END);
        }
    }
}

fn encode_int(value: i64, buffer: &mut Vec<u8>) {
    buffer.push(crate::TOKEN_INT);
    buffer.extend(value.to_string().into_bytes());
    buffer.push(crate::TOKEN_END);
}

fn encode_bytes(bytes: &[u8], buffer: &mut Vec<u8>) {
    buffer.extend(bytes.len().to_string().into_bytes());
    buffer.push(crate::TOKEN_LEN_SEP);
    buffer.extend_from_slice(bytes);
}

/// Conversion of owned and borrowed buffers into `Cow` bytes for the
/// construction macros, keeping owned inputs owned.
pub trait BCowConvert<'a> {
    fn convert(self) -> Cow<'a, [u8]>;
}

impl<'a> BCowConvert<'a> for &'a [u8] {
    fn convert(self) -> Cow<'a, [u8]> {
        self.into()
    }
}

impl<'a> BCowConvert<'a> for &'a str {
    fn convert(self) -> Cow<'a, [u8]> {
        self.as_bytes().into()
    }
}

impl BCowConvert<'static> for String {
    fn convert(self) -> Cow<'static, [u8]> {
        self.into_bytes().into()
    }
}

impl BCowConvert<'static> for Vec<u8> {
    fn convert(self) -> Cow<'static, [u8]> {
        self.into()
    }
}

#[cfg(test)]
mod tests {
    use crate::decode::{BencodeRef, DecodeOpt};
    use crate::encode::BencodeMut;
    use crate::{ben_bytes, ben_int, ben_list, ben_map};

    #[test]
    fn it_should_encode_integers() {
        assert_eq!(&b"i-560e"[..], &BencodeMut::new_int(-560).encode()[..]);
        assert_eq!(&b"i0e"[..], &BencodeMut::new_int(0).encode()[..]);
    }

    #[test]
    fn it_should_encode_byte_strings() {
        assert_eq!(&b"6:depots"[..], &ben_bytes!("depots").encode()[..]);
        assert_eq!(&b"0:"[..], &ben_bytes!("").encode()[..]);
    }

    #[test]
    fn it_should_encode_lists() {
        assert_eq!(&b"le"[..], &BencodeMut::new_list().encode()[..]);
        assert_eq!(&b"li56ee"[..], &ben_list!(ben_int!(56)).encode()[..]);
    }

    #[test]
    fn it_should_encode_dictionaries() {
        assert_eq!(&b"de"[..], &BencodeMut::new_dict().encode()[..]);

        let dict = ben_map! {
            "key" => ben_bytes!("value")
        };
        assert_eq!(&b"d3:key5:valuee"[..], &dict.encode()[..]);
    }

    #[test]
    fn it_should_sort_dictionary_keys_on_encode() {
        let mut dict = BencodeMut::new_dict();
        {
            let dict_mut = dict.dict_mut().unwrap();
            dict_mut.insert((&b"zz"[..]).into(), ben_int!(2));
            dict_mut.insert((&b"aa"[..]).into(), ben_int!(1));
        }

        assert_eq!(&b"d2:aai1e2:zzi2ee"[..], &dict.encode()[..]);
    }

    #[test]
    fn it_should_round_trip_canonical_input() {
        let canonical = b"d4:infod6:lengthi1e4:name3:foo12:piece lengthi16384e6:pieces20:aaaaaaaaaaaaaaaaaaaaee";

        let decoded = BencodeRef::decode(&canonical[..], DecodeOpt::new(50, true, true)).unwrap();
        let reencoded = reencode(&decoded);

        assert_eq!(&canonical[..], &reencoded[..]);
    }

    // Rebuilds a fully owned tree from a borrowed one and encodes it, so
    // the round trip exercises both halves of the codec.
    fn reencode(decoded: &BencodeRef<'_>) -> Vec<u8> {
        rebuild(decoded).encode()
    }

    fn rebuild(value: &BencodeRef<'_>) -> BencodeMut<'static> {
        if let Some(int_value) = value.int() {
            return BencodeMut::new_int(int_value);
        }
        if let Some(bytes) = value.bytes() {
            return BencodeMut::new_bytes(bytes.to_vec().into());
        }
        if let Some(list) = value.list() {
            let mut out = BencodeMut::new_list();
            {
                let out_list = out.list_mut().unwrap();
                for item in list {
                    out_list.push(rebuild(item));
                }
            }
            return out;
        }

        let dict = value.dict().expect("a bencode value is one of the four kinds");
        let mut out = BencodeMut::new_dict();
        {
            let out_dict = out.dict_mut().unwrap();
            for (key, item) in dict.iter() {
                out_dict.insert(key.to_vec().into(), rebuild(item));
            }
        }
        out
    }
}
