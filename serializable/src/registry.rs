//! Mapping from type tags to constructors.

use crate::{Error, Index, Register, Serializable, Tag};
use kiln_codec::Buffer;
use kiln_collections::{hash::Integer, HashTable};
use std::{fmt, io::SeekFrom};
use tracing::{debug, warn};

/// Default for [Config::max_depth].
pub const DEFAULT_MAX_DEPTH: usize = 64;

/// Configuration for a [Registry].
#[derive(Clone, Copy, Debug)]
pub struct Config {
    /// Largest payload (in bytes) accepted when reading an envelope.
    ///
    /// Larger payloads are skipped and reported as [Error::PayloadTooLarge].
    pub max_payload: u32,

    /// Number of envelopes that may enclose the one being read. A top-level envelope has depth
    /// zero.
    ///
    /// Envelopes nested deeper are skipped and reported as [Error::TooDeep].
    pub max_depth: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_payload: u32::MAX,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

/// What a payload is read with: the [Registry] resolving nested envelopes and the depth of the
/// envelope holding the payload.
#[derive(Clone, Copy, Debug)]
pub struct Context<'a> {
    registry: &'a Registry,
    depth: usize,
}

impl<'a> Context<'a> {
    /// A context for reading a top-level payload.
    pub fn new(registry: &'a Registry) -> Self {
        Self { registry, depth: 0 }
    }

    pub fn registry(&self) -> &'a Registry {
        self.registry
    }

    /// Number of envelopes enclosing the payload being read.
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Read an object nested inside the current payload.
    ///
    /// See [Registry::deserialize].
    pub fn deserialize(&self, buf: &mut Buffer) -> Result<Box<dyn Serializable>, Error> {
        self.registry.deserialize_at(buf, self.depth + 1)
    }

    /// Read an object nested inside the current payload into `object`.
    ///
    /// See [Registry::deserialize_into].
    pub fn deserialize_into(
        &self,
        object: &mut dyn Serializable,
        buf: &mut Buffer,
    ) -> Result<(), Error> {
        self.registry.deserialize_into_at(object, buf, self.depth + 1)
    }
}

/// How a [Registry] identifies and constructs a type.
#[derive(Clone, Copy)]
pub struct Ops {
    pub tag: Tag,
    pub name: &'static str,

    /// Create a blank instance to read a payload into.
    pub allocate: fn() -> Box<dyn Serializable>,
}

impl fmt::Debug for Ops {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Ops")
            .field("tag", &self.tag)
            .field("name", &self.name)
            .finish()
    }
}

/// Types known to a reader, keyed by [Tag].
pub struct Registry {
    cfg: Config,
    types: HashTable<Tag, Ops, Integer>,
}

impl Registry {
    /// Create a registry that knows no types.
    pub fn new(cfg: Config) -> Self {
        Self {
            cfg,
            types: HashTable::new(),
        }
    }

    /// Create a registry that knows the built-in types ([Buffer], [String] and [Index]).
    pub fn with_builtins(cfg: Config) -> Self {
        let mut registry = Self::new(cfg);
        for ops in [Buffer::ops(), String::ops(), Index::ops()] {
            registry
                .register_ops(ops)
                .expect("built-in tags are distinct");
        }
        registry
    }

    pub fn config(&self) -> &Config {
        &self.cfg
    }

    /// Number of known types.
    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Add `T`.
    pub fn register<T: Register>(&mut self) -> Result<(), Error> {
        self.register_ops(T::ops())
    }

    /// Add a type. Fails if its tag is already taken.
    pub fn register_ops(&mut self, ops: Ops) -> Result<(), Error> {
        self.types
            .insert(ops.tag, ops)
            .map_err(|rejected| Error::DuplicateType(rejected.item.0))?;
        debug!(tag = ops.tag, name = ops.name, "registered type");
        Ok(())
    }

    /// The entry for `tag`.
    pub fn lookup(&self, tag: Tag) -> Option<&Ops> {
        self.types.get(&tag)
    }

    pub fn contains(&self, tag: Tag) -> bool {
        self.types.contains_key(&tag)
    }

    /// Create a blank instance of the type registered under `tag`.
    pub fn allocate(&self, tag: Tag) -> Result<Box<dyn Serializable>, Error> {
        let ops = self.lookup(tag).ok_or(Error::UnknownType(tag))?;
        Ok((ops.allocate)())
    }

    /// Write `object` into `out` inside an envelope. See [crate::serialize].
    pub fn serialize(&self, object: &dyn Serializable, out: &mut Buffer) -> Result<(), Error> {
        crate::serialize(object, out)
    }

    /// Read an envelope header, making sure its whole payload is present.
    ///
    /// On failure, `buf` is left where it was.
    fn header(&self, buf: &mut Buffer) -> Result<(Tag, usize), Error> {
        let start = buf.position();
        let header = read_header(buf);
        if header.is_err() {
            buf.seek(SeekFrom::Start(start as u64));
        }
        header
    }

    /// Move past a payload that will not be read, reporting `error`.
    fn skip(buf: &mut Buffer, tag: Tag, len: usize, error: Error) -> Error {
        buf.seek(SeekFrom::Current(len as i64));
        warn!(tag, len, ?error, "skipped payload");
        error
    }

    /// Read the next `len` bytes of `buf` into `object`, consuming them whatever the outcome.
    fn read_payload(
        &self,
        object: &mut dyn Serializable,
        buf: &mut Buffer,
        len: usize,
        depth: usize,
    ) -> Result<(), Error> {
        let cx = Context {
            registry: self,
            depth,
        };
        buf.read_limited(len, |payload| object.deserialize(payload, &cx))?
    }

    /// Check an envelope against [Config::max_payload] and [Config::max_depth].
    fn check_limits(&self, len: usize, depth: usize) -> Result<(), Error> {
        if len > self.cfg.max_payload as usize {
            return Err(Error::PayloadTooLarge(len, self.cfg.max_payload));
        }
        if depth > self.cfg.max_depth {
            return Err(Error::TooDeep(self.cfg.max_depth));
        }
        Ok(())
    }

    /// Read the next object from `buf`, whatever its type.
    ///
    /// An unknown tag, an oversized payload or an envelope nested deeper than
    /// [Config::max_depth] is skipped before failing, so `buf` is positioned at the next
    /// envelope. A truncated envelope leaves `buf` untouched. If the payload itself is
    /// malformed, the envelope is consumed and the partially read object is dropped.
    pub fn deserialize(&self, buf: &mut Buffer) -> Result<Box<dyn Serializable>, Error> {
        self.deserialize_at(buf, 0)
    }

    fn deserialize_at(
        &self,
        buf: &mut Buffer,
        depth: usize,
    ) -> Result<Box<dyn Serializable>, Error> {
        let (tag, len) = self.header(buf)?;
        if let Err(err) = self.check_limits(len, depth) {
            return Err(Self::skip(buf, tag, len, err));
        }
        let mut object = match self.allocate(tag) {
            Ok(object) => object,
            Err(err) => return Err(Self::skip(buf, tag, len, err)),
        };
        self.read_payload(&mut *object, buf, len, depth)?;
        Ok(object)
    }

    /// Read the next object from `buf` into an existing `object`.
    ///
    /// Fails with [Error::WrongType] (without consuming anything) if the envelope holds a
    /// different type. On any other failure `object` may have been partially updated.
    pub fn deserialize_into(
        &self,
        object: &mut dyn Serializable,
        buf: &mut Buffer,
    ) -> Result<(), Error> {
        self.deserialize_into_at(object, buf, 0)
    }

    fn deserialize_into_at(
        &self,
        object: &mut dyn Serializable,
        buf: &mut Buffer,
        depth: usize,
    ) -> Result<(), Error> {
        let start = buf.position();
        let (tag, len) = self.header(buf)?;
        if tag != object.tag() {
            buf.seek(SeekFrom::Start(start as u64));
            return Err(Error::WrongType {
                expected: object.tag(),
                found: tag,
            });
        }
        if let Err(err) = self.check_limits(len, depth) {
            return Err(Self::skip(buf, tag, len, err));
        }
        self.read_payload(object, buf, len, depth)
    }

    /// Read the next object from `buf` as a `T`.
    pub fn deserialize_as<T: Register>(&self, buf: &mut Buffer) -> Result<T, Error> {
        let mut object = T::default();
        self.deserialize_into(&mut object, buf)?;
        Ok(object)
    }
}

fn read_header(buf: &mut Buffer) -> Result<(Tag, usize), Error> {
    let tag = buf.read_u32()?;
    let len = buf.read_u32()? as usize;
    buf.at_least(len)?;
    Ok((tag, len))
}

impl Default for Registry {
    fn default() -> Self {
        Self::with_builtins(Config::default())
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("cfg", &self.cfg)
            .field("types", &self.types)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{tag, Dump};
    use kiln_codec::{Read, Write};
    use kiln_macros::test_traced;

    /// A user type carrying a pair of integers.
    #[derive(Debug, Default, PartialEq)]
    struct Point {
        x: u32,
        y: u32,
    }

    impl Serializable for Point {
        fn tag(&self) -> Tag {
            Self::TAG
        }

        fn serialize(&self, buf: &mut Buffer) -> Result<(), Error> {
            self.x.write(buf);
            self.y.write(buf);
            Ok(())
        }

        fn deserialize(&mut self, buf: &mut Buffer, _: &Context<'_>) -> Result<(), Error> {
            self.x = u32::read(buf)?;
            self.y = u32::read(buf)?;
            Ok(())
        }

        fn dump(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "({}, {})", self.x, self.y)
        }
    }

    impl Register for Point {
        const TAG: Tag = tag::USER;
        const NAME: &'static str = "point";
    }

    fn registry() -> Registry {
        let mut registry = Registry::with_builtins(Config::default());
        registry.register::<Point>().unwrap();
        registry
    }

    #[test]
    fn test_builtins() {
        let registry = Registry::default();
        assert_eq!(registry.len(), 3);
        for tag in [tag::BUFFER, tag::STRING, tag::INDEX] {
            assert!(registry.contains(tag));
        }
        assert!(!registry.contains(tag::NONE));
        assert_eq!(registry.lookup(tag::STRING).unwrap().name, "string");
    }

    #[test]
    fn test_duplicate_type() {
        let mut registry = registry();
        assert_eq!(
            registry.register::<Point>(),
            Err(Error::DuplicateType(tag::USER))
        );
        assert!(Registry::new(Config::default()).is_empty());
    }

    #[test]
    fn test_user_type_round_trip() {
        let registry = registry();
        let mut buf = Buffer::new();
        registry.serialize(&Point { x: 1, y: 2 }, &mut buf).unwrap();
        registry.serialize(&String::from("next"), &mut buf).unwrap();

        let point = registry.deserialize(&mut buf).unwrap();
        assert_eq!(point.tag(), tag::USER);
        assert_eq!(Dump(&*point).to_string(), "(1, 2)");
        assert_eq!(
            point.downcast::<Point>().unwrap().as_ref(),
            &Point { x: 1, y: 2 }
        );

        let next: String = registry.deserialize_as(&mut buf).unwrap();
        assert_eq!(next, "next");
        assert!(buf.is_eof());
    }

    #[test_traced]
    fn test_unknown_type_skipped() {
        let registry = registry();
        let mut buf = Buffer::new();
        crate::serialize(&Point { x: 1, y: 2 }, &mut buf).unwrap();
        crate::serialize(&String::from("after"), &mut buf).unwrap();

        // Without the point type, its envelope is skipped and the string is still readable.
        let builtins = Registry::with_builtins(Config::default());
        assert_eq!(
            builtins.deserialize(&mut buf).unwrap_err(),
            Error::UnknownType(tag::USER)
        );
        assert_eq!(buf.position(), 16);
        let after = builtins.deserialize(&mut buf).unwrap();
        assert_eq!(after.downcast_ref::<String>().unwrap(), "after");

        buf.seek(SeekFrom::Start(0));
        assert!(registry.deserialize(&mut buf).is_ok());
    }

    #[test_traced]
    fn test_payload_too_large_skipped() {
        let registry = Registry::with_builtins(Config {
            max_payload: 8,
            ..Config::default()
        });
        let mut buf = Buffer::new();
        crate::serialize(&String::from("far too long"), &mut buf).unwrap();
        crate::serialize(&String::from("ok"), &mut buf).unwrap();

        assert_eq!(
            registry.deserialize(&mut buf).unwrap_err(),
            Error::PayloadTooLarge(16, 8)
        );
        assert_eq!(buf.position(), 8 + 16);
        let ok: String = registry.deserialize_as(&mut buf).unwrap();
        assert_eq!(ok, "ok");
    }

    #[test]
    fn test_truncated_envelope() {
        let registry = registry();
        let mut full = Buffer::new();
        registry.serialize(&Point { x: 1, y: 2 }, &mut full).unwrap();

        for len in 0..full.len() {
            let mut buf = Buffer::from_slice(&full.as_slice()[..len]);
            let err = registry.deserialize(&mut buf).unwrap_err();
            assert!(matches!(err, Error::Codec(_)), "{err:?}");
            assert_eq!(buf.position(), 0);
        }
    }

    #[test]
    fn test_malformed_payload_consumed() {
        let registry = registry();
        let mut buf = Buffer::new();
        buf.write_u32(tag::USER);
        buf.write_u32(3);
        buf.write_bytes(&[1, 2, 3]);
        assert!(matches!(
            registry.deserialize(&mut buf),
            Err(Error::Codec(kiln_codec::Error::EndOfBuffer { .. }))
        ));
        assert!(buf.is_eof());
    }

    /// Reads the inner point through the context and records the depth it was read at.
    #[derive(Debug, Default)]
    struct Wrapper {
        inner: Point,
        depth: usize,
    }

    impl Serializable for Wrapper {
        fn tag(&self) -> Tag {
            Self::TAG
        }

        fn serialize(&self, buf: &mut Buffer) -> Result<(), Error> {
            crate::serialize(&self.inner, buf)
        }

        fn deserialize(&mut self, buf: &mut Buffer, cx: &Context<'_>) -> Result<(), Error> {
            self.depth = cx.depth();

            // The payload ends where the envelope does, even though more data follows it.
            assert_eq!(buf.left(), 16);
            cx.deserialize_into(&mut self.inner, buf)?;
            assert!(buf.is_eof());
            Ok(())
        }

        fn dump(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            self.inner.dump(f)
        }
    }

    impl Register for Wrapper {
        const TAG: Tag = tag::USER + 1;
        const NAME: &'static str = "wrapper";
    }

    #[test_traced]
    fn test_depth_limit() {
        let mut registry = Registry::with_builtins(Config {
            max_depth: 0,
            ..Config::default()
        });
        registry.register::<Point>().unwrap();
        registry.register::<Wrapper>().unwrap();

        let mut buf = Buffer::new();
        let wrapper = Wrapper {
            inner: Point { x: 3, y: 4 },
            depth: 0,
        };
        crate::serialize(&wrapper, &mut buf).unwrap();
        crate::serialize(&Point { x: 5, y: 6 }, &mut buf).unwrap();

        // The point inside the wrapper sits one level below the limit.
        assert_eq!(
            registry.deserialize(&mut buf).unwrap_err(),
            Error::TooDeep(0)
        );
        assert_eq!(buf.position(), 8 + 16);
        let after: Point = registry.deserialize_as(&mut buf).unwrap();
        assert_eq!(after, Point { x: 5, y: 6 });

        let mut registry = Registry::new(Config {
            max_depth: 1,
            ..Config::default()
        });
        registry.register::<Point>().unwrap();
        registry.register::<Wrapper>().unwrap();
        buf.seek(SeekFrom::Start(0));
        let read: Wrapper = registry.deserialize_as(&mut buf).unwrap();
        assert_eq!(read.depth, 0);
        assert_eq!(read.inner, Point { x: 3, y: 4 });
        assert_eq!(buf.position(), 8 + 16);
    }

    #[test]
    fn test_wrong_type_not_consumed() {
        let registry = registry();
        let mut buf = Buffer::new();
        registry.serialize(&String::from("text"), &mut buf).unwrap();

        let mut point = Point::default();
        assert_eq!(
            registry.deserialize_into(&mut point, &mut buf),
            Err(Error::WrongType {
                expected: tag::USER,
                found: tag::STRING
            })
        );
        assert_eq!(buf.position(), 0);
        assert_eq!(
            registry.deserialize_as::<Buffer>(&mut buf).unwrap_err(),
            Error::WrongType {
                expected: tag::BUFFER,
                found: tag::STRING
            }
        );

        let mut text = String::from("old");
        registry.deserialize_into(&mut text, &mut buf).unwrap();
        assert_eq!(text, "text");
    }

    #[test]
    fn test_dynamic_registration() {
        fn blank() -> Box<dyn Serializable> {
            Box::new(Point { x: 7, y: 7 })
        }

        let mut registry = Registry::new(Config::default());
        registry
            .register_ops(Ops {
                tag: tag::USER,
                name: "custom point",
                allocate: blank,
            })
            .unwrap();
        let point = registry.allocate(tag::USER).unwrap();
        assert_eq!(point.display().to_string(), "(7, 7)");
        assert_eq!(
            registry.allocate(tag::STRING).unwrap_err(),
            Error::UnknownType(tag::STRING)
        );
    }
}
