//! A stream of self-describing values over a [Buffer].
//!
//! Every value is preceded by a one-byte [Kind] tag so that a reader can check what comes next
//! before decoding it.

use crate::{Buffer, Error};
use std::io::SeekFrom;

/// Tag written before every value in a [TypedBuffer].
#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Kind {
    U32 = 1,
    U64 = 2,
    Str = 3,
}

impl TryFrom<u8> for Kind {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::U32),
            2 => Ok(Self::U64),
            3 => Ok(Self::Str),
            _ => Err(Error::InvalidData("Kind", "unknown value kind")),
        }
    }
}

/// Tagged values over an owned or borrowed [Buffer].
#[derive(Debug, Default)]
pub struct TypedBuffer<B = Buffer> {
    inner: B,
}

impl TypedBuffer<Buffer> {
    /// Create a typed buffer over a fresh [Buffer].
    pub fn new() -> Self {
        Self {
            inner: Buffer::new(),
        }
    }
}

impl<B: AsRef<Buffer> + AsMut<Buffer>> TypedBuffer<B> {
    /// Wrap an existing buffer (owned, or borrowed with `&mut Buffer`).
    pub fn wrap(inner: B) -> Self {
        Self { inner }
    }

    /// Release the underlying buffer.
    pub fn into_inner(self) -> B {
        self.inner
    }

    pub fn buffer(&self) -> &Buffer {
        self.inner.as_ref()
    }

    pub fn buffer_mut(&mut self) -> &mut Buffer {
        self.inner.as_mut()
    }

    pub fn write_u32(&mut self, value: u32) {
        let buf = self.inner.as_mut();
        buf.write_u8(Kind::U32 as u8);
        buf.write_u32(value);
    }

    pub fn write_u64(&mut self, value: u64) {
        let buf = self.inner.as_mut();
        buf.write_u8(Kind::U64 as u8);
        buf.write_u64(value);
    }

    /// Write a string. `None` is written as an empty string.
    pub fn write_str(&mut self, value: Option<&str>) {
        let data = value.unwrap_or_default().as_bytes();
        let len = u32::try_from(data.len()).expect("string length exceeds u32");
        let buf = self.inner.as_mut();
        buf.write_u8(Kind::Str as u8);
        buf.write_u32(len);
        buf.write_bytes(data);
    }

    /// Return the kind of the next value without consuming anything.
    pub fn peek_kind(&self) -> Result<Kind, Error> {
        let buf = self.inner.as_ref();
        buf.at_least(1)?;
        Kind::try_from(buf.unread()[0])
    }

    pub fn read_u32(&mut self) -> Result<u32, Error> {
        self.read_tagged(Kind::U32, |buf| buf.read_u32())
    }

    pub fn read_u64(&mut self) -> Result<u64, Error> {
        self.read_tagged(Kind::U64, |buf| buf.read_u64())
    }

    /// Read a string. An empty string reads back as `None`.
    pub fn read_str(&mut self) -> Result<Option<String>, Error> {
        self.read_tagged(Kind::Str, |buf| {
            let len = buf.read_u32()? as usize;
            if len == 0 {
                return Ok(None);
            }
            let data = buf.read_nbytes(len)?;
            let value = std::str::from_utf8(data).map_err(|_| Error::InvalidUtf8)?;
            Ok(Some(value.to_owned()))
        })
    }

    /// Check the tag, then decode the value. On any failure the read position is restored to
    /// the start of the tag.
    fn read_tagged<T>(
        &mut self,
        expected: Kind,
        read: impl FnOnce(&mut Buffer) -> Result<T, Error>,
    ) -> Result<T, Error> {
        let buf = self.inner.as_mut();
        buf.at_least(1)?;
        let found = buf.unread()[0];
        if found != expected as u8 {
            return Err(Error::UnexpectedKind {
                found,
                expected: expected as u8,
            });
        }

        let start = buf.position();
        buf.read_u8()?;
        let result = read(&mut *buf);
        if result.is_err() {
            buf.seek(SeekFrom::Start(start as u64));
        }
        result
    }
}
