use thiserror::Error;

/// Error raised while decoding structurally invalid bencode.
///
/// Every variant carries the byte offset the decoder had reached when the
/// input stopped making sense.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BencodeParseError {
    #[error("incomplete input, ran out of bytes at {pos}")]
    BytesEmpty { pos: usize },

    #[error("invalid byte found at {pos}")]
    InvalidByte { pos: usize },

    #[error("integer at {pos} has no end delimiter")]
    InvalidIntNoDelimiter { pos: usize },

    #[error("integer at {pos} is negative zero")]
    InvalidIntNegativeZero { pos: usize },

    #[error("integer at {pos} has leading zero padding")]
    InvalidIntZeroPadding { pos: usize },

    #[error("integer at {pos} failed to parse")]
    InvalidIntParseError { pos: usize },

    #[error("dictionary key {key:?} at {pos} is out of order")]
    InvalidKeyOrdering { pos: usize, key: Vec<u8> },

    #[error("dictionary key {key:?} at {pos} is a duplicate")]
    InvalidKeyDuplicates { pos: usize, key: Vec<u8> },

    #[error("byte string length at {pos} is negative")]
    InvalidLengthNegative { pos: usize },

    #[error("byte string length at {pos} overflows the remaining buffer")]
    InvalidLengthOverflow { pos: usize },

    #[error("recursion limit of {max} exceeded at {pos}")]
    InvalidRecursionExceeded { pos: usize, max: usize },
}
