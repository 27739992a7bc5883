//! Codec helpers

use crate::Error;
use bytes::Buf;

/// Checks that `buf` holds at least `len` bytes, failing with [Error::EndOfBuffer] otherwise.
#[inline]
pub fn at_least<B: Buf>(buf: &B, len: usize) -> Result<(), Error> {
    let remaining = buf.remaining();
    if remaining < len {
        return Err(Error::EndOfBuffer {
            requested: len,
            remaining,
        });
    }
    Ok(())
}
