//! Serialize heterogeneous objects into a self-describing binary format.
//!
//! # Overview
//!
//! Any type implementing [Serializable] can be written into a [Buffer] inside an _envelope_: a
//! big-endian `u32` type [Tag], a `u32` payload length, and the payload produced by the type
//! itself. Because the envelope names the type, a [Registry] can later read it back without the
//! caller knowing in advance what it contains.
//!
//! Types are made known to a registry either statically, by implementing [Register] and calling
//! [Registry::register], or dynamically, by building an [Ops] by hand. [Buffer], [String] and
//! [Index] are always registered.
//!
//! # Reading
//!
//! A type's own deserializer only ever sees its payload, never the bytes of the envelope that
//! follows. When a tag is unknown (or the payload exceeds [Config::max_payload]), the payload
//! is skipped before failing, so a stream of envelopes can still be scanned past objects the
//! registry does not understand.
//!
//! Payloads are read in place through a bounded view of the source buffer. Each nested envelope
//! is one level deeper than the payload holding it, and envelopes past [Config::max_depth] are
//! skipped, so hostile input cannot nest objects without bound.
//!
//! # Process-wide registry
//!
//! Besides explicit [Registry] values, a process-wide registry can be set up once with
//! [initialize] and used through the free functions of this crate ([deserialize], [register],
//! ...). It is released with [finalize] and may be initialized again afterwards.
//!
//! # Example
//!
//! ```rust
//! use kiln_codec::Buffer;
//! use kiln_serializable::{Config, Index, Registry};
//!
//! let registry = Registry::with_builtins(Config::default());
//!
//! let mut index = Index::new();
//! index.add(12, Box::new(String::from("twelve"))).unwrap();
//! index.add(13, Box::new(Buffer::from_slice(b"thirteen"))).unwrap();
//!
//! let mut out = Buffer::new();
//! registry.serialize(&index, &mut out).unwrap();
//!
//! let decoded: Index = registry.deserialize_as(&mut out).unwrap();
//! assert_eq!(decoded.get_as::<String>(12).unwrap(), "twelve");
//! assert!(!decoded.contains(14));
//! ```

use kiln_codec::Buffer;
use std::{
    any::Any,
    fmt,
    sync::{PoisonError, RwLock},
};
use tracing::{debug, warn};

mod buffer;
pub mod error;
mod index;
mod registry;
mod string;

pub use error::Error;
pub use index::{Index, VERSION as INDEX_VERSION};
pub use registry::{Config, Context, Ops, Registry, DEFAULT_MAX_DEPTH};

/// Identifies a serializable type on the wire and in a [Registry].
pub type Tag = u32;

/// Reserved type tags.
pub mod tag {
    use super::Tag;

    /// Never assigned to a type.
    pub const NONE: Tag = 0;
    pub const BUFFER: Tag = 1;
    pub const STRING: Tag = 2;
    pub const INDEX: Tag = 3;

    /// First tag available to applications.
    pub const USER: Tag = 1 << 8;
}

/// Access to the concrete type behind a `dyn` [Serializable].
pub trait AsAny: Any {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
    fn into_any(self: Box<Self>) -> Box<dyn Any>;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any> {
        self
    }
}

/// An object that can be written into (and read back from) an envelope.
pub trait Serializable: AsAny + fmt::Debug {
    /// The tag written in front of this object's payload.
    fn tag(&self) -> Tag;

    /// Append this object's payload to `buf`.
    fn serialize(&self, buf: &mut Buffer) -> Result<(), Error>;

    /// Replace this object's contents with the payload in `buf`.
    ///
    /// `buf` ends where this object's payload does. Nested objects are read back through `cx`.
    fn deserialize(&mut self, buf: &mut Buffer, cx: &Context<'_>) -> Result<(), Error>;

    /// Write a human-readable rendition of this object.
    fn dump(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result;
}

impl dyn Serializable {
    /// Whether the object is a `T`.
    pub fn is<T: Serializable>(&self) -> bool {
        AsAny::as_any(self).is::<T>()
    }

    pub fn downcast_ref<T: Serializable>(&self) -> Option<&T> {
        AsAny::as_any(self).downcast_ref()
    }

    pub fn downcast_mut<T: Serializable>(&mut self) -> Option<&mut T> {
        AsAny::as_any_mut(self).downcast_mut()
    }

    /// Recover the concrete object, or hand the box back if it is not a `T`.
    pub fn downcast<T: Serializable>(self: Box<Self>) -> Result<Box<T>, Box<Self>> {
        if !self.is::<T>() {
            return Err(self);
        }
        Ok(AsAny::into_any(self)
            .downcast()
            .expect("type was checked before downcasting"))
    }

    /// A [fmt::Display] adapter over [Serializable::dump].
    pub fn display(&self) -> Dump<'_> {
        Dump(self)
    }
}

/// Displays a [Serializable] through its [Serializable::dump] implementation.
pub struct Dump<'a>(pub &'a dyn Serializable);

impl fmt::Display for Dump<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.dump(f)
    }
}

/// A [Serializable] type with a fixed tag, constructible without any input.
///
/// Implementors can be added to a [Registry] with [Registry::register].
pub trait Register: Serializable + Default {
    const TAG: Tag;
    const NAME: &'static str;

    /// The registry entry for this type.
    fn ops() -> Ops {
        Ops {
            tag: Self::TAG,
            name: Self::NAME,
            allocate: allocate::<Self>,
        }
    }
}

fn allocate<T: Register>() -> Box<dyn Serializable> {
    Box::new(T::default())
}

/// Write `object` into `out` inside an envelope.
///
/// The payload is produced into a scratch buffer first, so nothing is appended to `out` when
/// `object` fails to serialize.
pub fn serialize(object: &dyn Serializable, out: &mut Buffer) -> Result<(), Error> {
    let mut payload = Buffer::new();
    object.serialize(&mut payload)?;
    let len = u32::try_from(payload.len())
        .map_err(|_| Error::PayloadTooLarge(payload.len(), u32::MAX))?;
    out.write_u32(object.tag());
    out.write_u32(len);
    out.write_buffer(&payload);
    Ok(())
}

/// The process-wide registry.
static REGISTRY: RwLock<Option<Registry>> = RwLock::new(None);

/// Set up the process-wide registry with the built-in types and a default [Config].
pub fn initialize() {
    initialize_with(Config::default());
}

/// Set up the process-wide registry with the built-in types.
///
/// Any registry that is already live is replaced, dropping the types registered on it.
pub fn initialize_with(cfg: Config) {
    let mut global = REGISTRY.write().unwrap_or_else(PoisonError::into_inner);
    if global.is_some() {
        warn!("replacing live registry");
    }
    let registry = Registry::with_builtins(cfg);
    debug!(types = registry.len(), "initialized registry");
    *global = Some(registry);
}

/// Release the process-wide registry.
pub fn finalize() {
    let mut global = REGISTRY.write().unwrap_or_else(PoisonError::into_inner);
    if global.take().is_some() {
        debug!("finalized registry");
    }
}

/// Whether the process-wide registry is live.
pub fn is_initialized() -> bool {
    REGISTRY
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .is_some()
}

/// Run `f` against the process-wide registry.
fn with_registry<R>(f: impl FnOnce(&Registry) -> Result<R, Error>) -> Result<R, Error> {
    let global = REGISTRY.read().unwrap_or_else(PoisonError::into_inner);
    f(global.as_ref().ok_or(Error::NotInitialized)?)
}

/// Add `T` to the process-wide registry.
pub fn register<T: Register>() -> Result<(), Error> {
    register_ops(T::ops())
}

/// Add a type to the process-wide registry.
pub fn register_ops(ops: Ops) -> Result<(), Error> {
    let mut global = REGISTRY.write().unwrap_or_else(PoisonError::into_inner);
    global
        .as_mut()
        .ok_or(Error::NotInitialized)?
        .register_ops(ops)
}

/// Read the next object from `buf` using the process-wide registry.
///
/// See [Registry::deserialize].
pub fn deserialize(buf: &mut Buffer) -> Result<Box<dyn Serializable>, Error> {
    with_registry(|registry| registry.deserialize(buf))
}

/// Read the next object from `buf` into `object` using the process-wide registry.
///
/// See [Registry::deserialize_into].
pub fn deserialize_into(object: &mut dyn Serializable, buf: &mut Buffer) -> Result<(), Error> {
    with_registry(|registry| registry.deserialize_into(object, buf))
}

/// Read the next object from `buf` as a `T` using the process-wide registry.
///
/// See [Registry::deserialize_as].
pub fn deserialize_as<T: Register>(buf: &mut Buffer) -> Result<T, Error> {
    with_registry(|registry| registry.deserialize_as(buf))
}
