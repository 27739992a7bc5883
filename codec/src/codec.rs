//! Core codec traits

use crate::{Buffer, Error};
use bytes::{Buf, BufMut};

/// Trait for types that can be written (encoded) to a buffer.
pub trait Write {
    /// Encodes this value by writing to a buffer.
    fn write(&self, buf: &mut impl BufMut);
}

/// Trait for types that can be read (decoded) from a buffer.
pub trait Read: Sized {
    /// Reads a value from the buffer, consuming the necessary bytes.
    ///
    /// Returns an error if decoding fails (e.g., invalid data, not enough bytes).
    fn read(buf: &mut impl Buf) -> Result<Self, Error>;
}

/// Trait for types that know how many bytes they encode to.
pub trait EncodeSize {
    /// Returns the encoded size of this value.
    ///
    /// This method MUST return the exact number of bytes that will be written by `write()`.
    fn encode_size(&self) -> usize;
}

/// Trait for types that can be encoded to a [Buffer].
pub trait Encode: Write + EncodeSize {
    /// Encodes a value into a new [Buffer].
    ///
    /// Panics if the `write` implementation does not write the expected number of bytes.
    fn encode(&self) -> Buffer {
        let len = self.encode_size();
        let mut buffer = Buffer::with_capacity(len);
        self.write(&mut buffer);
        assert_eq!(buffer.len(), len, "write() did not write expected bytes");
        buffer
    }
}

// Automatically implement `Encode` for types that implement `Write` and `EncodeSize`.
impl<T: Write + EncodeSize> Encode for T {}

/// Trait for types that can be decoded from a buffer, ensuring the entire buffer is consumed.
pub trait Decode: Read {
    /// Decodes a value from a buffer, failing with [Error::ExtraData] if bytes are left over.
    fn decode(mut buf: impl Buf) -> Result<Self, Error> {
        let result = Self::read(&mut buf)?;

        // Check that the buffer is fully consumed.
        let remaining = buf.remaining();
        if remaining > 0 {
            return Err(Error::ExtraData(remaining));
        }

        Ok(result)
    }
}

// Automatically implement `Decode` for types that implement `Read`.
impl<T: Read> Decode for T {}

/// Trait for types that can be encoded and decoded.
pub trait Codec: Encode + Decode {}

// Automatically implement `Codec` for types that implement `Encode` and `Decode`.
impl<T: Encode + Decode> Codec for T {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insufficient_buffer() {
        let mut reader = Buffer::from_slice(&[0x01, 0x02]);
        assert!(matches!(
            u32::read(&mut reader),
            Err(Error::EndOfBuffer { requested: 4, .. })
        ));
    }

    #[test]
    fn test_extra_data() {
        let encoded = Buffer::from_slice(&[0x01, 0x02]);
        assert!(matches!(u8::decode(encoded), Err(Error::ExtraData(1))));
    }

    #[test]
    fn test_decode_from_slice() {
        let encoded = 0xCAFEu16.encode();
        assert_eq!(u16::decode(encoded.as_slice()).unwrap(), 0xCAFE);
    }
}
