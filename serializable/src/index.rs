//! A serializable map from `u32` keys to serializable values.

use crate::{serialize, tag, Context, Error, Register, Serializable, Tag};
use kiln_codec::Buffer;
use kiln_collections::{HashTable, Rejected};
use std::fmt;
use tracing::debug;

/// Format version written in front of every serialized [Index].
pub const VERSION: u8 = 1;

/// Owns a set of serializable values, each under a unique `u32` key.
///
/// Values may be of any registered type, and of different types within the same index.
#[derive(Debug, Default)]
pub struct Index {
    entries: HashTable<u32, Box<dyn Serializable>>,
}

impl Index {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Add `value` under `key`.
    ///
    /// If `key` is already taken the index is left untouched and `value` is handed back.
    pub fn add(
        &mut self,
        key: u32,
        value: Box<dyn Serializable>,
    ) -> Result<(), Rejected<Box<dyn Serializable>>> {
        self.entries
            .insert(key, value)
            .map_err(|rejected| Rejected::new(rejected.error, rejected.item.1))
    }

    pub fn get(&self, key: u32) -> Option<&dyn Serializable> {
        self.entries.get(&key).map(|value| &**value)
    }

    /// The value under `key`, if it is a `T`.
    pub fn get_as<T: Serializable>(&self, key: u32) -> Option<&T> {
        self.get(key)?.downcast_ref()
    }

    pub fn get_mut(&mut self, key: u32) -> Option<&mut (dyn Serializable + 'static)> {
        self.entries.get_mut(&key).map(|value| &mut **value)
    }

    pub fn contains(&self, key: u32) -> bool {
        self.entries.contains_key(&key)
    }

    /// Remove the value under `key` and hand it back.
    pub fn remove(&mut self, key: u32) -> Option<Box<dyn Serializable>> {
        self.entries.remove(&key).map(|(_, value)| value)
    }

    /// Drop every value.
    pub fn reset(&mut self) {
        self.entries.reset();
    }

    /// Iterate over all entries, in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = (u32, &dyn Serializable)> + '_ {
        self.entries.iter().map(|(key, value)| (*key, &**value))
    }

    /// Read a serialized index into `self`, stopping at the first failure.
    fn read_entries(&mut self, buf: &mut Buffer, cx: &Context<'_>) -> Result<(), Error> {
        let version = buf.read_u8()?;
        if version != VERSION {
            return Err(Error::UnsupportedVersion(version));
        }
        let count = buf.read_u32()?;
        for _ in 0..count {
            let key = buf.read_u32()?;
            let value = cx.deserialize(buf).map_err(|err| Error::Entry {
                key,
                source: Box::new(err),
            })?;
            self.add(key, value).map_err(|_| Error::DuplicateKey(key))?;
        }
        Ok(())
    }
}

impl Serializable for Index {
    fn tag(&self) -> Tag {
        tag::INDEX
    }

    fn serialize(&self, buf: &mut Buffer) -> Result<(), Error> {
        let count = u32::try_from(self.len())
            .map_err(|_| Error::PayloadTooLarge(self.len(), u32::MAX))?;
        buf.write_u8(VERSION);
        buf.write_u32(count);
        for (key, value) in self.iter() {
            buf.write_u32(key);
            serialize(value, buf)?;
        }
        Ok(())
    }

    /// Replace the contents of the index. On failure the index is left empty.
    fn deserialize(&mut self, buf: &mut Buffer, cx: &Context<'_>) -> Result<(), Error> {
        self.reset();
        if let Err(err) = self.read_entries(buf, cx) {
            debug!(entries = self.len(), depth = cx.depth(), ?err, "rolling back index");
            self.reset();
            return Err(err);
        }
        Ok(())
    }

    fn dump(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, (key, value)) in self.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, " {key} : ")?;
            value.dump(f)?;
        }
        f.write_str(" }")
    }
}

impl Register for Index {
    const TAG: Tag = tag::INDEX;
    const NAME: &'static str = "index";
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Config, Registry, DEFAULT_MAX_DEPTH};
    use kiln_collections::Error as CollectionError;
    use kiln_macros::test_traced;
    use rand::{rngs::StdRng, Rng, SeedableRng};
    use std::io::SeekFrom;

    const TEXT: &str = "The string to serialize";
    const BYTES: &[u8] = b"The buffer to serialize\0";

    fn sample() -> Index {
        let mut index = Index::new();
        index.add(12, Box::new(TEXT.to_string())).unwrap();
        let rejected = index
            .add(12, Box::new(Buffer::from_slice(BYTES)))
            .unwrap_err();
        assert_eq!(rejected.error, CollectionError::DuplicateKey);
        index.add(123487, rejected.into_inner()).unwrap();
        index
    }

    #[test]
    fn test_round_trip() {
        let registry = Registry::with_builtins(Config::default());
        let mut out = Buffer::new();
        registry.serialize(&sample(), &mut out).unwrap();

        let index = registry.deserialize(&mut out).unwrap();
        let index = index.downcast_ref::<Index>().unwrap();
        assert_eq!(index.len(), 2);
        assert!(index.contains(12));
        assert!(index.contains(123487));
        assert!(!index.contains(13));
        assert_eq!(index.get_as::<String>(12).unwrap(), TEXT);
        assert_eq!(index.get_as::<Buffer>(123487).unwrap().as_slice(), BYTES);
        assert!(index.get_as::<Buffer>(12).is_none());
        assert!(out.is_eof());
    }

    #[test]
    fn test_wire_format() {
        let mut index = Index::new();
        index.add(7, Box::new("ab".to_string())).unwrap();

        let mut payload = Buffer::new();
        index.serialize(&mut payload).unwrap();
        assert_eq!(
            payload.as_slice(),
            &[
                1, // version
                0, 0, 0, 1, // count
                0, 0, 0, 7, // key
                0, 0, 0, 2, // tag
                0, 0, 0, 6, // payload length
                0, 0, 0, 2, b'a', b'b',
            ]
        );
    }

    #[test]
    fn test_nested() {
        let registry = Registry::default();
        let mut inner = Index::new();
        inner.add(1, Box::new("inner".to_string())).unwrap();
        let mut outer = Index::new();
        outer.add(2, Box::new(inner)).unwrap();
        outer.add(3, Box::new(Buffer::new())).unwrap();

        let mut out = Buffer::new();
        registry.serialize(&outer, &mut out).unwrap();
        let decoded: Index = registry.deserialize_as(&mut out).unwrap();
        let inner = decoded.get_as::<Index>(2).unwrap();
        assert_eq!(inner.get_as::<String>(1).unwrap(), "inner");
        assert!(decoded.get_as::<Buffer>(3).unwrap().is_empty());
    }

    /// A chain of `levels` envelopes, each index holding the next one under its own depth as key.
    /// The innermost index is empty.
    fn nested(levels: usize) -> Buffer {
        let mut buf = Buffer::new();
        for level in 0..levels {
            let below = levels - 1 - level;
            buf.write_u32(tag::INDEX);
            buf.write_u32((5 + 17 * below) as u32);
            buf.write_u8(VERSION);
            if below == 0 {
                buf.write_u32(0);
            } else {
                buf.write_u32(1);
                buf.write_u32(level as u32);
            }
        }
        buf
    }

    #[test]
    fn test_nested_at_limit() {
        let registry = Registry::with_builtins(Config {
            max_depth: 4,
            ..Config::default()
        });
        let mut buf = nested(5);
        let decoded: Index = registry.deserialize_as(&mut buf).unwrap();
        assert!(buf.is_eof());

        let mut index = &decoded;
        let mut depth = 0;
        while let Some(inner) = index.get_as::<Index>(depth) {
            index = inner;
            depth += 1;
        }
        assert_eq!(depth, 4);
        assert!(index.is_empty());
    }

    #[test_traced]
    fn test_nested_past_limit() {
        let registry = Registry::with_builtins(Config {
            max_depth: 4,
            ..Config::default()
        });
        let mut buf = nested(6);
        let end = buf.len();
        serialize(&"after".to_string(), &mut buf).unwrap();

        // Every enclosing index reports the entry that failed, down to the one nested too deep.
        let expected = (0..5).rev().fold(Error::TooDeep(4), |source, key| Error::Entry {
            key,
            source: Box::new(source),
        });
        assert_eq!(registry.deserialize(&mut buf).unwrap_err(), expected);
        assert_eq!(buf.position(), end);

        let after: String = registry.deserialize_as(&mut buf).unwrap();
        assert_eq!(after, "after");
        assert!(buf.is_eof());
    }

    #[test]
    fn test_hostile_nesting() {
        let registry = Registry::default();
        let mut buf = nested(100_000);
        let err = registry.deserialize(&mut buf).unwrap_err();
        assert!(buf.is_eof());

        // The error chain stops at the deepest level that was allowed.
        let chain = std::iter::successors(Some(&err as &dyn std::error::Error), |err| {
            (*err).source()
        });
        assert_eq!(chain.count(), DEFAULT_MAX_DEPTH + 2);

        // The same stream inside an index read directly sits one level down.
        let mut payload = Buffer::new();
        payload.write_u8(VERSION);
        payload.write_u32(1);
        payload.write_u32(0);
        buf.seek(SeekFrom::Start(0));
        buf.read_into(&mut payload, buf.len()).unwrap();
        let mut index = Index::new();
        assert!(matches!(
            index.deserialize(&mut payload, &Context::new(&registry)),
            Err(Error::Entry { key: 0, .. })
        ));
        assert!(payload.is_eof());
        assert!(index.is_empty());
    }

    #[test_traced]
    fn test_unsupported_version() {
        let registry = Registry::default();
        let mut payload = Buffer::from_slice(&[2, 0, 0, 0, 0]);
        let mut index = sample();
        assert_eq!(
            index.deserialize(&mut payload, &Context::new(&registry)),
            Err(Error::UnsupportedVersion(2))
        );
        assert!(index.is_empty());
    }

    #[test_traced]
    fn test_duplicate_entry_rolls_back() {
        let registry = Registry::default();
        let mut payload = Buffer::new();
        payload.write_u8(VERSION);
        payload.write_u32(2);
        for _ in 0..2 {
            payload.write_u32(5);
            serialize(&"dup".to_string(), &mut payload).unwrap();
        }

        let mut index = Index::new();
        assert_eq!(
            index.deserialize(&mut payload, &Context::new(&registry)),
            Err(Error::DuplicateKey(5))
        );
        assert!(index.is_empty());
    }

    #[test_traced]
    fn test_bad_entry_rolls_back() {
        let registry = Registry::default();
        let mut payload = Buffer::new();
        payload.write_u8(VERSION);
        payload.write_u32(2);
        payload.write_u32(1);
        serialize(&"fine".to_string(), &mut payload).unwrap();
        payload.write_u32(9);
        payload.write_u32(tag::USER);
        payload.write_u32(0);

        let mut index = Index::new();
        let err = index.deserialize(&mut payload, &Context::new(&registry)).unwrap_err();
        assert_eq!(
            err,
            Error::Entry {
                key: 9,
                source: Box::new(Error::UnknownType(tag::USER)),
            }
        );
        assert_eq!(
            std::error::Error::source(&err).map(ToString::to_string),
            Some("unknown type: 256".to_string())
        );
        assert!(index.is_empty());
    }

    #[test]
    fn test_truncated_count() {
        let registry = Registry::default();
        let mut payload = Buffer::new();
        payload.write_u8(VERSION);
        payload.write_u32(3);
        payload.write_u32(1);
        serialize(&"only one".to_string(), &mut payload).unwrap();

        let mut index = Index::new();
        assert!(matches!(
            index.deserialize(&mut payload, &Context::new(&registry)),
            Err(Error::Codec(kiln_codec::Error::Underflow { .. }))
        ));
        assert!(index.is_empty());
    }

    #[test]
    fn test_random_round_trip() {
        let registry = Registry::default();
        let mut rng = StdRng::seed_from_u64(0);
        let mut index = Index::new();
        let mut expected = Vec::new();
        while index.len() < 200 {
            let key = rng.gen();
            let len = rng.gen_range(0..64);
            let bytes: Vec<u8> = (0..len).map(|_| rng.gen()).collect();
            if index.add(key, Box::new(Buffer::from_slice(&bytes))).is_ok() {
                expected.push((key, bytes));
            }
        }

        let mut out = Buffer::new();
        registry.serialize(&index, &mut out).unwrap();
        let decoded: Index = registry.deserialize_as(&mut out).unwrap();
        assert_eq!(decoded.len(), expected.len());
        for (key, bytes) in expected {
            assert_eq!(
                decoded.get_as::<Buffer>(key).unwrap().as_slice(),
                &bytes[..]
            );
        }
    }

    #[test]
    fn test_edit_entries() {
        let mut index = sample();
        index
            .get_mut(12)
            .and_then(|value| value.downcast_mut::<String>())
            .unwrap()
            .push('!');
        assert!(index.get_as::<String>(12).unwrap().ends_with('!'));

        let removed = index.remove(123487).unwrap();
        assert!(removed.is::<Buffer>());
        assert!(index.remove(123487).is_none());
        assert_eq!(
            index.iter().map(|(key, _)| key).collect::<Vec<_>>(),
            vec![12]
        );

        index.reset();
        assert!(index.is_empty());
    }

    #[test]
    fn test_dump() {
        let mut index = Index::new();
        assert_eq!((&index as &dyn Serializable).display().to_string(), "{ }");
        index.add(1, Box::new("one".to_string())).unwrap();
        assert_eq!(
            (&index as &dyn Serializable).display().to_string(),
            "{ 1 : one }"
        );
    }
}
