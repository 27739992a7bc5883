//! Read and write network-order binary data through a growable buffer.
//!
//! # Overview
//!
//! [Buffer] is a single contiguous, growable allocation with a read position. It implements
//! [bytes::Buf] and [bytes::BufMut], so anything that speaks `bytes` can read from or write to it
//! directly. On top of it sit:
//! - The [Write]/[Read] codec traits, implemented for fixed-width integers (always big-endian),
//!   `bool`, `[u8; N]`, and `u32`-length-prefixed byte strings (`Vec<u8>`, `String`, [Buffer]).
//! - [base64], an RFC 4648 codec with one-shot and streaming variants.
//! - [TypedBuffer], a stream of values each preceded by a one-byte [Kind] tag.
//!
//! # Example
//!
//! ```
//! use bytes::{Buf, BufMut};
//! use kiln_codec::{Buffer, Decode, Encode, EncodeSize, Error, Read, Write};
//!
//! #[derive(Debug, Clone, PartialEq)]
//! struct Point {
//!     x: u32,
//!     label: String,
//! }
//!
//! impl Write for Point {
//!     fn write(&self, buf: &mut impl BufMut) {
//!         self.x.write(buf);
//!         self.label.write(buf);
//!     }
//! }
//!
//! impl Read for Point {
//!     fn read(buf: &mut impl Buf) -> Result<Self, Error> {
//!         let x = u32::read(buf)?;
//!         let label = String::read(buf)?;
//!         Ok(Self { x, label })
//!     }
//! }
//!
//! impl EncodeSize for Point {
//!     fn encode_size(&self) -> usize {
//!         self.x.encode_size() + self.label.encode_size()
//!     }
//! }
//!
//! let point = Point { x: 7, label: "origin".into() };
//! let encoded: Buffer = point.encode();
//! assert_eq!(encoded.len(), 4 + 4 + 6);
//! assert_eq!(Point::decode(encoded).unwrap(), point);
//! ```

pub mod base64;
pub mod buffer;
pub mod codec;
pub mod error;
pub mod typed;
pub mod types;
pub mod util;

// Re-export main types and traits
pub use buffer::{Buffer, DEFAULT_CAPACITY};
pub use codec::{Codec, Decode, Encode, EncodeSize, Read, Write};
pub use error::Error;
pub use typed::{Kind, TypedBuffer};
