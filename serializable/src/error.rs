//! Error types for serialization.

use crate::Tag;
use thiserror::Error;

/// Error type for serialization.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("codec error: {0}")]
    Codec(#[from] kiln_codec::Error),
    #[error("unknown type: {0}")]
    UnknownType(Tag),
    #[error("wrong type: expected {expected}, found {found}")]
    WrongType { expected: Tag, found: Tag },
    #[error("type already registered: {0}")]
    DuplicateType(Tag),
    #[error("registry not initialized")]
    NotInitialized,
    #[error("unsupported version: {0}")]
    UnsupportedVersion(u8),
    #[error("duplicate key: {0}")]
    DuplicateKey(u32),
    #[error("invalid entry {key}")]
    Entry {
        key: u32,
        #[source]
        source: Box<Error>,
    },
    #[error("payload too large: {0} > {1}")]
    PayloadTooLarge(usize, u32), // length, maximum
    #[error("nested deeper than {0} levels")]
    TooDeep(usize),
}
