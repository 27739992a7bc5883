//! Codec implementations for byte strings.
//!
//! Every byte string is written as a big-endian `u32` length followed by the raw bytes. For
//! portability between architectures, the length must fit within a [`u32`].

use crate::{util::at_least, Buffer, EncodeSize, Error, Read, Write};
use bytes::{Buf, BufMut};

/// Writes `data` with its `u32` length prefix.
#[inline]
fn write_prefixed(data: &[u8], buf: &mut impl BufMut) {
    let len = u32::try_from(data.len()).expect("byte string length exceeds u32");
    buf.put_u32(len);
    buf.put_slice(data);
}

/// Reads a `u32` length prefix and checks that the bytes it announces are present.
#[inline]
fn read_prefix(buf: &mut impl Buf) -> Result<usize, Error> {
    let len = u32::read(buf)? as usize;
    at_least(buf, len)?;
    Ok(len)
}

impl Write for Vec<u8> {
    #[inline]
    fn write(&self, buf: &mut impl BufMut) {
        write_prefixed(self, buf);
    }
}

impl Read for Vec<u8> {
    #[inline]
    fn read(buf: &mut impl Buf) -> Result<Self, Error> {
        let len = read_prefix(buf)?;
        let mut data = vec![0; len];
        buf.copy_to_slice(&mut data);
        Ok(data)
    }
}

impl EncodeSize for Vec<u8> {
    #[inline]
    fn encode_size(&self) -> usize {
        4 + self.len()
    }
}

impl Write for String {
    #[inline]
    fn write(&self, buf: &mut impl BufMut) {
        write_prefixed(self.as_bytes(), buf);
    }
}

impl Read for String {
    #[inline]
    fn read(buf: &mut impl Buf) -> Result<Self, Error> {
        let data = Vec::<u8>::read(buf)?;
        String::from_utf8(data).map_err(|_| Error::InvalidUtf8)
    }
}

impl EncodeSize for String {
    #[inline]
    fn encode_size(&self) -> usize {
        4 + self.len()
    }
}

impl Write for Buffer {
    #[inline]
    fn write(&self, buf: &mut impl BufMut) {
        write_prefixed(self.as_slice(), buf);
    }
}

impl Read for Buffer {
    #[inline]
    fn read(buf: &mut impl Buf) -> Result<Self, Error> {
        let len = read_prefix(buf)?;
        let mut out = Buffer::with_capacity(len);
        buf.copy_to_slice(out.write_nbytes(len));
        Ok(out)
    }
}

impl EncodeSize for Buffer {
    #[inline]
    fn encode_size(&self) -> usize {
        4 + self.len()
    }
}
