//! Error types for codec operations

use thiserror::Error;

/// Error type for codec operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("buffer is too short to read {requested} bytes at byte {position} of {length}")]
    Underflow {
        requested: usize,
        position: usize,
        length: usize,
    },
    #[error("end of buffer: {requested} bytes requested but only {remaining} remain")]
    EndOfBuffer { requested: usize, remaining: usize },
    #[error("extra data found: {0} bytes")]
    ExtraData(usize),
    #[error("invalid bool")]
    InvalidBool,
    #[error("invalid data in {0}: {1}")]
    InvalidData(&'static str, &'static str), // context, message
    #[error("invalid character (0x{0:02X}) in buffer at {1}")]
    InvalidCharacter(u8, usize), // character, offset
    #[error("premature end of buffer reached at {0}")]
    PrematureEnd(usize),
    #[error("overlapping data found with padding")]
    OverlappingPadding,
    #[error("pending characters at end of buffer")]
    TrailingCharacters,
    #[error("unexpected value kind: found {found}, expected {expected}")]
    UnexpectedKind { found: u8, expected: u8 },
    #[error("invalid utf-8 in string")]
    InvalidUtf8,
}
