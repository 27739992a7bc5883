//! Base64 (RFC 4648) encoding and decoding over [Buffer]s.
//!
//! Encoding always pads the final quantum with `=`. Decoding runs a small state machine over the
//! input that either rejects or (when asked to) silently skips characters outside the alphabet,
//! and stops at the first padded quantum.
//!
//! # Example
//!
//! ```
//! use kiln_codec::{base64, Buffer};
//!
//! let mut encoded = Buffer::new();
//! base64::encode(b"This is my test", &mut encoded);
//! assert_eq!(encoded.as_slice(), b"VGhpcyBpcyBteSB0ZXN0");
//!
//! let mut decoded = Buffer::new();
//! base64::decode(&mut encoded, &mut decoded, false).unwrap();
//! assert_eq!(decoded.as_slice(), b"This is my test");
//! ```

use crate::{Buffer, Error};
use tracing::trace;

const ALPHABET: &[u8; 64] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";
const PAD: u8 = b'=';
const INVALID: u8 = 0xFF;

/// Maps an ASCII character to its 6-bit value, or [INVALID].
const DECODE_TABLE: [u8; 256] = {
    let mut table = [INVALID; 256];
    let mut i = 0;
    while i < ALPHABET.len() {
        table[ALPHABET[i] as usize] = i as u8;
        i += 1;
    }
    table
};

/// Number of characters needed to encode `len` bytes.
#[inline]
pub fn encoded_len(len: usize) -> usize {
    len.div_ceil(3) * 4
}

/// Encode up to three bytes into one padded quantum.
#[inline]
fn encode_quantum(chunk: &[u8], out: &mut [u8]) {
    let b0 = chunk[0];
    let b1 = chunk.get(1).copied().unwrap_or(0);
    let b2 = chunk.get(2).copied().unwrap_or(0);
    out[0] = ALPHABET[(b0 >> 2) as usize];
    out[1] = ALPHABET[(((b0 & 0x3) << 4) | (b1 >> 4)) as usize];
    out[2] = if chunk.len() > 1 {
        ALPHABET[(((b1 & 0xF) << 2) | (b2 >> 6)) as usize]
    } else {
        PAD
    };
    out[3] = if chunk.len() > 2 {
        ALPHABET[(b2 & 0x3F) as usize]
    } else {
        PAD
    };
}

/// Append the base64 encoding of `input` to `out`.
pub fn encode(input: &[u8], out: &mut Buffer) {
    let size = encoded_len(input.len());
    let region = out.begin_write(size);
    for (chunk, quantum) in input.chunks(3).zip(region.chunks_exact_mut(4)) {
        encode_quantum(chunk, quantum);
    }
    out.end_write(size);
}

/// Encode `input` into a new string.
pub fn encode_to_string(input: &[u8]) -> String {
    let mut out = Buffer::with_capacity(encoded_len(input.len()));
    encode(input, &mut out);
    out.as_slice().iter().map(|&c| c as char).collect()
}

/// Incremental encoder for data that arrives in pieces.
///
/// Bytes that do not complete a quantum are held back until the next [Encoder::update] or
/// [Encoder::finish].
#[derive(Debug, Default)]
pub struct Encoder {
    pending: [u8; 3],
    pending_len: usize,
}

impl Encoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Encode as much of `input` as forms whole quanta (together with held-back bytes).
    pub fn update(&mut self, mut input: &[u8], out: &mut Buffer) {
        if self.pending_len > 0 {
            let take = (3 - self.pending_len).min(input.len());
            self.pending[self.pending_len..self.pending_len + take]
                .copy_from_slice(&input[..take]);
            self.pending_len += take;
            input = &input[take..];
            if self.pending_len < 3 {
                return;
            }
            encode(&self.pending, out);
            self.pending_len = 0;
        }

        let whole = input.len() - input.len() % 3;
        encode(&input[..whole], out);
        let rest = &input[whole..];
        self.pending[..rest.len()].copy_from_slice(rest);
        self.pending_len = rest.len();
    }

    /// Flush held-back bytes as a final padded quantum.
    pub fn finish(self, out: &mut Buffer) {
        encode(&self.pending[..self.pending_len], out);
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum State {
    /// Expecting the first character of a quantum.
    Q0,
    /// Expecting the second character of a quantum.
    Q1,
    /// Expecting the third character (or the first `=`).
    Q2,
    /// Expecting the fourth character (or `=`).
    Q3,
    /// Seen `xx=`, expecting the second `=`.
    Pad,
    /// A padded quantum ended the data.
    Finished,
}

/// Incremental base64 decoder.
///
/// Feed input with [Decoder::update] and call [Decoder::finish] once all input has been seen.
/// Decoding ends at the first padded quantum: anything after it is rejected with
/// [Error::TrailingCharacters] unless invalid characters are being ignored.
#[derive(Debug)]
pub struct Decoder {
    state: State,
    quantum: [u8; 4],
    ignore_invalid: bool,

    /// Number of input characters seen so far.
    offset: usize,
}

impl Decoder {
    /// Create a decoder. If `ignore_invalid` is set, characters outside the alphabet (and
    /// misplaced `=`) are skipped instead of failing.
    pub fn new(ignore_invalid: bool) -> Self {
        Self {
            state: State::Q0,
            quantum: [0; 4],
            ignore_invalid,
            offset: 0,
        }
    }

    /// Returns true once a padded quantum has been decoded.
    pub fn is_finished(&self) -> bool {
        self.state == State::Finished
    }

    /// Decode `input`, appending the result to `out`.
    ///
    /// On error, bytes decoded before the offending character remain in `out`.
    pub fn update(&mut self, input: &[u8], out: &mut Buffer) -> Result<(), Error> {
        for &c in input {
            let at = self.offset;
            self.offset += 1;
            self.push(c, at, out)?;
        }
        Ok(())
    }

    /// Check that the input did not stop in the middle of a quantum.
    pub fn finish(&self) -> Result<(), Error> {
        match self.state {
            State::Q0 | State::Finished => Ok(()),
            _ => Err(Error::PrematureEnd(self.offset)),
        }
    }

    /// Handle a character that is not acceptable in the current state.
    #[inline]
    fn reject(&self, c: u8, at: usize) -> Result<(), Error> {
        if self.ignore_invalid {
            trace!(character = c, offset = at, "skipping invalid base64 character");
            return Ok(());
        }
        Err(Error::InvalidCharacter(c, at))
    }

    fn push(&mut self, c: u8, at: usize, out: &mut Buffer) -> Result<(), Error> {
        let value = DECODE_TABLE[c as usize];
        match self.state {
            State::Finished => {
                if !self.ignore_invalid {
                    return Err(Error::TrailingCharacters);
                }
            }
            State::Q0 | State::Q1 => {
                if value == INVALID {
                    return self.reject(c, at);
                }
                if self.state == State::Q0 {
                    self.quantum[0] = value;
                    self.state = State::Q1;
                } else {
                    self.quantum[1] = value;
                    self.state = State::Q2;
                }
            }
            State::Q2 => {
                if c == PAD {
                    self.state = State::Pad;
                } else if value == INVALID {
                    return self.reject(c, at);
                } else {
                    self.quantum[2] = value;
                    self.state = State::Q3;
                }
            }
            State::Q3 => {
                let [q0, q1, q2, _] = self.quantum;
                if c == PAD {
                    // The low two bits of the third character must be zero.
                    if q2 & 0x3 != 0 {
                        return Err(Error::OverlappingPadding);
                    }
                    out.write_bytes(&[(q0 << 2) | (q1 >> 4), (q1 << 4) | (q2 >> 2)]);
                    self.state = State::Finished;
                } else if value == INVALID {
                    return self.reject(c, at);
                } else {
                    out.write_bytes(&[
                        (q0 << 2) | (q1 >> 4),
                        (q1 << 4) | (q2 >> 2),
                        (q2 << 6) | value,
                    ]);
                    self.state = State::Q0;
                }
            }
            State::Pad => {
                if c != PAD {
                    return self.reject(c, at);
                }
                let [q0, q1, _, _] = self.quantum;
                // The low four bits of the second character must be zero.
                if q1 & 0xF != 0 {
                    return Err(Error::OverlappingPadding);
                }
                out.write_u8((q0 << 2) | (q1 >> 4));
                self.state = State::Finished;
            }
        }
        Ok(())
    }
}

/// Decode the unread contents of `input` and append the result to `out`.
///
/// On success, `input` is fully consumed. On error, the read position of `input` is unchanged.
pub fn decode(input: &mut Buffer, out: &mut Buffer, ignore_invalid: bool) -> Result<(), Error> {
    let mut decoder = Decoder::new(ignore_invalid);
    decoder.update(input.unread(), out)?;
    decoder.finish()?;
    let consumed = input.left();
    input.read_nbytes(consumed)?;
    Ok(())
}

/// Decode a base64 string into a new byte vector.
pub fn decode_slice(input: &[u8], ignore_invalid: bool) -> Result<Vec<u8>, Error> {
    let mut out = Buffer::with_capacity(input.len() / 4 * 3 + 3);
    let mut decoder = Decoder::new(ignore_invalid);
    decoder.update(input, &mut out)?;
    decoder.finish()?;
    Ok(out.as_slice().to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;
    use kiln_macros::test_traced;
    use rand::{rngs::StdRng, Rng, SeedableRng};
    use test_case::test_case;

    #[test]
    fn test_fixture() {
        let mut encoded = Buffer::new();
        encode(b"This is my test", &mut encoded);
        assert_eq!(encoded.as_slice(), b"VGhpcyBpcyBteSB0ZXN0");

        let mut decoded = Buffer::new();
        decode(&mut encoded, &mut decoded, false).unwrap();
        assert_eq!(decoded.as_slice(), b"This is my test");
        assert!(encoded.is_eof());
    }

    #[test_case(b"", ""; "empty")]
    #[test_case(b"f", "Zg=="; "one")]
    #[test_case(b"fo", "Zm8="; "two")]
    #[test_case(b"foo", "Zm9v"; "three")]
    #[test_case(b"foob", "Zm9vYg=="; "four")]
    #[test_case(b"fooba", "Zm9vYmE="; "five")]
    #[test_case(b"foobar", "Zm9vYmFy"; "six")]
    fn test_rfc_vectors(raw: &[u8], encoded: &str) {
        assert_eq!(encode_to_string(raw), encoded);
        assert_eq!(decode_slice(encoded.as_bytes(), false).unwrap(), raw);
    }

    #[test]
    fn test_random_round_trip() {
        let mut rng = StdRng::seed_from_u64(0);
        for len in 0..128 {
            let raw: Vec<u8> = (0..len).map(|_| rng.gen()).collect();
            let encoded = encode_to_string(&raw);
            assert_eq!(encoded.len(), encoded_len(len));
            assert_eq!(encoded.len() % 4, 0);
            assert_eq!(decode_slice(encoded.as_bytes(), false).unwrap(), raw);
        }
    }

    #[test]
    fn test_streaming_encoder() {
        let mut rng = StdRng::seed_from_u64(1);
        let raw: Vec<u8> = (0..1000).map(|_| rng.gen()).collect();

        let mut out = Buffer::new();
        let mut encoder = Encoder::new();
        let mut rest = &raw[..];
        while !rest.is_empty() {
            let take = rng.gen_range(0..=rest.len().min(7));
            encoder.update(&rest[..take], &mut out);
            rest = &rest[take..];
        }
        encoder.finish(&mut out);
        assert_eq!(out.as_slice(), encode_to_string(&raw).as_bytes());
    }

    #[test]
    fn test_streaming_decoder() {
        let encoded = encode_to_string(b"split across several updates");
        let mut out = Buffer::new();
        let mut decoder = Decoder::new(false);
        for piece in encoded.as_bytes().chunks(5) {
            decoder.update(piece, &mut out).unwrap();
        }
        decoder.finish().unwrap();
        assert!(decoder.is_finished());
        assert_eq!(out.as_slice(), b"split across several updates");
    }

    #[test]
    fn test_invalid_character() {
        assert_eq!(
            decode_slice(b"Zm9v\nYmFy", false),
            Err(Error::InvalidCharacter(b'\n', 4))
        );
        assert_eq!(
            decode_slice(b"Z=9v", false),
            Err(Error::InvalidCharacter(b'=', 1))
        );
        assert_eq!(decode_slice(b"Zg=x", false), Err(Error::InvalidCharacter(b'x', 3)));
    }

    #[test_traced(level = "TRACE")]
    fn test_ignore_invalid() {
        assert_eq!(decode_slice(b"Zm9v\nYm\r\nFy", true).unwrap(), b"foobar");
        assert_eq!(decode_slice(b"=Z*m8=", true).unwrap(), b"fo");
        assert_eq!(decode_slice(b"Zg=*=trailing", true).unwrap(), b"f");
    }

    #[test]
    fn test_premature_end() {
        assert_eq!(decode_slice(b"Zm9vY", false), Err(Error::PrematureEnd(5)));
        assert_eq!(decode_slice(b"Zm9vYm", false), Err(Error::PrematureEnd(6)));
        assert_eq!(decode_slice(b"Zg=", false), Err(Error::PrematureEnd(3)));
    }

    #[test]
    fn test_overlapping_padding() {
        // 'h' sets low bits that a single padded byte cannot carry.
        assert_eq!(decode_slice(b"Zh==", false), Err(Error::OverlappingPadding));
        assert_eq!(decode_slice(b"Zm9=", false), Err(Error::OverlappingPadding));
    }

    #[test]
    fn test_trailing_characters() {
        assert_eq!(decode_slice(b"Zg==Zg==", false), Err(Error::TrailingCharacters));
        assert_eq!(decode_slice(b"Zm8=Zg==", true).unwrap(), b"fo");
    }

    #[test]
    fn test_decode_failure_keeps_position() {
        let mut input = Buffer::from_slice(b"Zm9v!");
        let mut out = Buffer::new();
        assert!(decode(&mut input, &mut out, false).is_err());
        assert_eq!(input.position(), 0);
    }

    #[test]
    fn test_buffer_helpers() {
        let buffer = Buffer::from_slice(b"The buffer to serialize\0");
        let encoded = buffer.to_base64();
        assert_eq!(Buffer::from_base64(&encoded).unwrap(), buffer);
        assert!(Buffer::from_base64("not base64!").is_err());
    }
}
