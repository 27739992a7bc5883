//! A growable byte buffer with independent read and write cursors.
//!
//! A [Buffer] owns a single contiguous allocation. Data is appended at `len` (the write cursor)
//! and consumed from `position` (the read cursor), with `position <= len <= capacity` at all
//! times. Capacity only grows (snapped to the next power of two) unless the buffer is explicitly
//! [Buffer::shrink]ed.
//!
//! [Buffer::read_limited] narrows the readable data to a prefix of what is left, so a nested
//! reader can be handed the source buffer itself instead of a copy of the bytes it may consume.
//!
//! All multi-byte integers are written and read in network byte order (big-endian).

use crate::{base64, Error};
use bytes::{buf::UninitSlice, Buf, BufMut};
use std::{fmt, io::SeekFrom, mem};

/// Capacity of a freshly created [Buffer].
pub const DEFAULT_CAPACITY: usize = 256;

/// A growable byte buffer with a read position.
#[derive(Clone)]
pub struct Buffer {
    /// Backing store. `data.len()` is the capacity, bytes past `len` are scratch space.
    data: Vec<u8>,
    len: usize,
    pos: usize,

    /// Reads stop here (or at `len`, whichever comes first).
    limit: usize,

    /// Bytes handed out by the last [Buffer::begin_write] that have not been committed.
    reserved: usize,
}

impl Buffer {
    /// Create an empty buffer with the default capacity.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Create an empty buffer able to hold `capacity` bytes before growing.
    ///
    /// As with [Buffer::grow], the capacity is rounded up to the next power of two.
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity
            .checked_next_power_of_two()
            .expect("buffer capacity overflows usize");
        Self {
            data: vec![0; capacity],
            len: 0,
            pos: 0,
            limit: usize::MAX,
            reserved: 0,
        }
    }

    /// Create a buffer holding a copy of `data`, positioned at its start.
    pub fn from_slice(data: &[u8]) -> Self {
        let mut buffer = Self::with_capacity(DEFAULT_CAPACITY.max(data.len()));
        buffer.write_bytes(data);
        buffer
    }

    /// Decode a base64 string into a new buffer.
    pub fn from_base64(encoded: &str) -> Result<Self, Error> {
        let mut input = Self::from_slice(encoded.as_bytes());
        let mut output = Self::new();
        base64::decode(&mut input, &mut output, false)?;
        Ok(output)
    }

    /// Number of valid bytes in the buffer.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns true if the buffer holds no valid bytes.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Current read position.
    #[inline]
    pub fn position(&self) -> usize {
        self.pos
    }

    /// End of the readable data.
    #[inline]
    fn end(&self) -> usize {
        self.len.min(self.limit)
    }

    /// Number of bytes between the read position and the end of the readable data.
    #[inline]
    pub fn left(&self) -> usize {
        self.end().saturating_sub(self.pos)
    }

    /// Size of the backing store.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    /// Returns true if every readable byte has been read.
    #[inline]
    pub fn is_eof(&self) -> bool {
        self.pos >= self.end()
    }

    /// The valid data, regardless of the read position.
    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        &self.data[..self.len]
    }

    /// The readable data that has not been read yet.
    #[inline]
    pub fn unread(&self) -> &[u8] {
        &self.data[self.pos..self.pos + self.left()]
    }

    /// Ensure the backing store can hold at least `size` bytes.
    ///
    /// The new capacity is `size` rounded up to the next power of two.
    pub fn grow(&mut self, size: usize) {
        if self.data.len() >= size {
            return;
        }
        let capacity = size
            .checked_next_power_of_two()
            .expect("buffer capacity overflows usize");
        self.data.resize(capacity, 0);
    }

    /// Append `data`.
    pub fn write_bytes(&mut self, data: &[u8]) {
        self.write_nbytes(data.len()).copy_from_slice(data);
    }

    /// Append the valid data of another buffer.
    pub fn write_buffer(&mut self, src: &Buffer) {
        self.write_bytes(src.as_slice());
    }

    /// Extend the valid data by `size` zeroed bytes and return them for the caller to fill.
    pub fn write_nbytes(&mut self, size: usize) -> &mut [u8] {
        let start = self.len;
        let end = start.checked_add(size).expect("buffer length overflows usize");
        self.grow(end);
        self.len = end;
        let region = &mut self.data[start..end];
        region.fill(0);
        region
    }

    /// Reserve up to `max_size` bytes past the end of the valid data and return them for direct
    /// writing. Only the bytes committed by a later [Buffer::end_write] become valid data.
    pub fn begin_write(&mut self, max_size: usize) -> &mut [u8] {
        let end = self
            .len
            .checked_add(max_size)
            .expect("buffer length overflows usize");
        self.grow(end);
        self.reserved = max_size;
        &mut self.data[self.len..end]
    }

    /// Commit `written` bytes of the region returned by the last [Buffer::begin_write].
    ///
    /// Panics if more bytes are committed than were reserved.
    pub fn end_write(&mut self, written: usize) {
        assert!(
            written <= self.reserved,
            "end_write: committed {written} bytes but only {} were reserved",
            self.reserved
        );
        self.len += written;
        self.reserved = 0;
    }

    /// Append a `u8`.
    #[inline]
    pub fn write_u8(&mut self, value: u8) {
        self.put_u8(value);
    }

    /// Append a `u16` in network byte order.
    #[inline]
    pub fn write_u16(&mut self, value: u16) {
        self.put_u16(value);
    }

    /// Append a `u32` in network byte order.
    #[inline]
    pub fn write_u32(&mut self, value: u32) {
        self.put_u32(value);
    }

    /// Append a `u64` in network byte order.
    #[inline]
    pub fn write_u64(&mut self, value: u64) {
        self.put_u64(value);
    }

    /// Fail with [Error::Underflow] unless at least `size` bytes are left to read.
    #[inline]
    pub fn at_least(&self, size: usize) -> Result<(), Error> {
        if size > self.left() {
            return Err(Error::Underflow {
                requested: size,
                position: self.pos,
                length: self.end(),
            });
        }
        Ok(())
    }

    /// Fill `out` from the read position.
    ///
    /// Fails without moving the read position if fewer than `out.len()` bytes are left.
    pub fn read(&mut self, out: &mut [u8]) -> Result<(), Error> {
        let src = self.read_nbytes(out.len())?;
        out.copy_from_slice(src);
        Ok(())
    }

    /// Consume `size` bytes from the read position and return them.
    pub fn read_nbytes(&mut self, size: usize) -> Result<&[u8], Error> {
        self.at_least(size)?;
        let start = self.pos;
        self.pos += size;
        Ok(&self.data[start..self.pos])
    }

    /// Run `f` with the readable data narrowed to the next `size` bytes, then move the read
    /// position past those bytes, however many of them `f` consumed.
    ///
    /// Fails without running `f` if fewer than `size` bytes are left. Writes made by `f` are kept
    /// and do not count towards the `size` bytes.
    pub fn read_limited<R>(
        &mut self,
        size: usize,
        f: impl FnOnce(&mut Buffer) -> R,
    ) -> Result<R, Error> {
        self.at_least(size)?;
        let end = self.pos + size;
        let outer = mem::replace(&mut self.limit, end);
        let result = f(self);
        self.limit = outer;
        self.pos = end.min(self.len);
        Ok(result)
    }

    /// Consume `size` bytes from the read position and append them to `into`.
    pub fn read_into(&mut self, into: &mut Buffer, size: usize) -> Result<(), Error> {
        let src = self.read_nbytes(size)?;
        into.write_bytes(src);
        Ok(())
    }

    /// Read a `u8`.
    #[inline]
    pub fn read_u8(&mut self) -> Result<u8, Error> {
        self.at_least(1)?;
        Ok(self.get_u8())
    }

    /// Read a `u16` in network byte order.
    #[inline]
    pub fn read_u16(&mut self) -> Result<u16, Error> {
        self.at_least(2)?;
        Ok(self.get_u16())
    }

    /// Read a `u32` in network byte order.
    #[inline]
    pub fn read_u32(&mut self) -> Result<u32, Error> {
        self.at_least(4)?;
        Ok(self.get_u32())
    }

    /// Read a `u64` in network byte order.
    #[inline]
    pub fn read_u64(&mut self) -> Result<u64, Error> {
        self.at_least(8)?;
        Ok(self.get_u64())
    }

    /// Move the read position, clamping the result into `[0, end]` where `end` is the end of the
    /// readable data. Returns the new position.
    pub fn seek(&mut self, from: SeekFrom) -> usize {
        let end = self.end();
        let target = match from {
            SeekFrom::Start(offset) => usize::try_from(offset).unwrap_or(usize::MAX),
            SeekFrom::Current(offset) => offset_from(self.pos, offset),
            SeekFrom::End(offset) => offset_from(end, offset),
        };
        self.pos = target.min(end);
        self.pos
    }

    /// Forget all data, keeping the allocation.
    pub fn reset(&mut self) {
        self.len = 0;
        self.pos = 0;
        self.reserved = 0;
    }

    /// Forget all data and, if the backing store grew past `max_size`, replace it with a fresh
    /// default-sized one.
    pub fn shrink(&mut self, max_size: usize) {
        if self.data.len() > max_size {
            self.data = vec![0; DEFAULT_CAPACITY];
        }
        self.reset();
    }

    /// Write this buffer's valid data to `out` as `u32 length` followed by the raw bytes.
    pub fn serialize_into(&self, out: &mut Buffer) {
        let len = u32::try_from(self.len).expect("buffer length exceeds u32");
        out.write_u32(len);
        out.write_bytes(self.as_slice());
    }

    /// Read data written by [Buffer::serialize_into] and append it to `into`.
    ///
    /// Fails without moving the read position if the data is truncated.
    pub fn read_serialized(&mut self, into: &mut Buffer) -> Result<(), Error> {
        let start = self.pos;
        let len = self.read_u32()? as usize;
        if let Err(err) = self.read_into(into, len) {
            self.pos = start;
            return Err(err);
        }
        Ok(())
    }

    /// Encode the valid data as base64.
    pub fn to_base64(&self) -> String {
        base64::encode_to_string(self.as_slice())
    }
}

/// Apply a signed offset to `base`, saturating at the ends of the `usize` range.
fn offset_from(base: usize, offset: i64) -> usize {
    let magnitude = usize::try_from(offset.unsigned_abs()).unwrap_or(usize::MAX);
    if offset < 0 {
        base.saturating_sub(magnitude)
    } else {
        base.saturating_add(magnitude)
    }
}

impl Default for Buffer {
    fn default() -> Self {
        Self::new()
    }
}

/// Buffers compare by their valid data only.
impl PartialEq for Buffer {
    fn eq(&self, other: &Self) -> bool {
        self.as_slice() == other.as_slice()
    }
}

impl Eq for Buffer {}

impl fmt::Debug for Buffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Buffer")
            .field("len", &self.len)
            .field("position", &self.pos)
            .field("capacity", &self.data.len())
            .field("data", &self.to_base64())
            .finish()
    }
}

impl fmt::Write for Buffer {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.write_bytes(s.as_bytes());
        Ok(())
    }
}

impl From<&[u8]> for Buffer {
    fn from(data: &[u8]) -> Self {
        Self::from_slice(data)
    }
}

impl From<Vec<u8>> for Buffer {
    fn from(data: Vec<u8>) -> Self {
        Self::from_slice(&data)
    }
}

impl AsRef<Buffer> for Buffer {
    fn as_ref(&self) -> &Buffer {
        self
    }
}

impl AsMut<Buffer> for Buffer {
    fn as_mut(&mut self) -> &mut Buffer {
        self
    }
}

impl Buf for Buffer {
    #[inline]
    fn remaining(&self) -> usize {
        self.left()
    }

    #[inline]
    fn chunk(&self) -> &[u8] {
        self.unread()
    }

    #[inline]
    fn advance(&mut self, cnt: usize) {
        assert!(
            cnt <= self.left(),
            "cannot advance past the end of the buffer: {cnt} > {}",
            self.left()
        );
        self.pos += cnt;
    }
}

// SAFETY: the backing store is always fully initialized, `chunk_mut` never returns an empty
// slice, and `advance_mut` refuses to move `len` past the backing store.
unsafe impl BufMut for Buffer {
    #[inline]
    fn remaining_mut(&self) -> usize {
        isize::MAX as usize - self.len
    }

    #[inline]
    unsafe fn advance_mut(&mut self, cnt: usize) {
        let spare = self.data.len() - self.len;
        assert!(
            cnt <= spare,
            "cannot advance past the end of the backing store: {cnt} > {spare}"
        );
        self.len += cnt;
    }

    #[inline]
    fn chunk_mut(&mut self) -> &mut UninitSlice {
        if self.len == self.data.len() {
            self.grow(self.len + 1);
        }
        UninitSlice::new(&mut self.data[self.len..])
    }

    #[inline]
    fn put_slice(&mut self, src: &[u8]) {
        self.write_bytes(src);
    }
}
