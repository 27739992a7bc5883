//! [String] as a serializable type.
//!
//! The payload is the UTF-8 bytes, prefixed by their `u32` length (no terminator).

use crate::{tag, Context, Error, Register, Serializable, Tag};
use kiln_codec::{Buffer, Read, Write};
use std::fmt;

impl Serializable for String {
    fn tag(&self) -> Tag {
        tag::STRING
    }

    fn serialize(&self, buf: &mut Buffer) -> Result<(), Error> {
        Write::write(self, buf);
        Ok(())
    }

    fn deserialize(&mut self, buf: &mut Buffer, _: &Context<'_>) -> Result<(), Error> {
        *self = String::read(buf)?;
        Ok(())
    }

    fn dump(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self)
    }
}

impl Register for String {
    const TAG: Tag = tag::STRING;
    const NAME: &'static str = "string";
}
