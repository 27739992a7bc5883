//! [Buffer] as a serializable type.
//!
//! The payload is the buffer's valid data, prefixed by its `u32` length.

use crate::{tag, Context, Error, Register, Serializable, Tag};
use kiln_codec::{Buffer, Read, Write};
use std::fmt;

impl Serializable for Buffer {
    fn tag(&self) -> Tag {
        tag::BUFFER
    }

    fn serialize(&self, buf: &mut Buffer) -> Result<(), Error> {
        Write::write(self, buf);
        Ok(())
    }

    fn deserialize(&mut self, buf: &mut Buffer, _: &Context<'_>) -> Result<(), Error> {
        *self = <Buffer as Read>::read(buf)?;
        Ok(())
    }

    fn dump(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "b64 ({})", self.to_base64())
    }
}

impl Register for Buffer {
    const TAG: Tag = tag::BUFFER;
    const NAME: &'static str = "buffer";
}
