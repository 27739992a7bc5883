//! An open-addressing hash table with linear probing.
//!
//! Entries live directly in a prime-sized slot array. A key is stored in the first empty slot at or
//! after its _ideal slot_ (`hash(key) mod capacity`), wrapping around the end of the array. Once
//! the table is 70% full it grows to the next size in [PRIMES] and every entry is reinserted.
//!
//! Removal uses backward-shift deletion: entries that follow the removed one in its probe chain
//! are moved back into the gap whenever leaving them in place would make them unreachable from
//! their ideal slot. No tombstones are ever left behind, so every stored key can always be found
//! by probing forward from its ideal slot without crossing an empty slot.
//!
//! # Keys
//!
//! The table does not rely on [std::hash::Hash]. Instead, each table is parameterized by a
//! [KeyHasher] that both hashes and compares keys (see [Integer], [Bytes], [Hashed], or any
//! `(fn(&K) -> u32, fn(&K, &K) -> bool)` pair).
//!
//! # Example
//!
//! ```rust
//! use kiln_collections::{hash::Bytes, HashTable};
//!
//! let mut table = HashTable::with_hasher(Bytes);
//! table.insert("alpha".to_string(), 1).unwrap();
//! assert!(table.insert("alpha".to_string(), 2).is_err());
//! assert_eq!(table.get(&"alpha".to_string()), Some(&1));
//! ```

use crate::{
    cursor::{Cursor, RawCursor},
    Error, Rejected,
};
use std::{
    fmt,
    hash::{BuildHasher, Hash},
    mem,
};
use tracing::debug;

/// Number of slots in a new (or reset) table.
pub const INITIAL_CAPACITY: usize = 11;

/// Sizes a table moves through as it grows.
pub const PRIMES: [usize; 27] = [
    53, 97, 193, 389, 769, 1543, 3079, 6151, 12289, 24593, 49157, 98317, 196613, 393241, 786433,
    1572869, 3145739, 6291469, 12582917, 25165843, 50331653, 100663319, 201326611, 402653189,
    805306457, 1610612741, 4294967291,
];

/// Maximum number of entries a table of `capacity` slots holds before growing (70%).
fn limit(capacity: usize) -> usize {
    capacity * 7 / 10
}

/// Forward distance from slot `from` to slot `to` in a table of `capacity` slots.
fn distance(from: usize, to: usize, capacity: usize) -> usize {
    if from <= to {
        to - from
    } else {
        capacity - (from - to)
    }
}

/// Hashes and compares the keys of a [HashTable].
pub trait KeyHasher<K: ?Sized> {
    /// Hash `key`. Keys that compare equal must hash equally.
    fn hash_key(&self, key: &K) -> u32;

    /// Whether `a` and `b` are the same key.
    fn eq_key(&self, a: &K, b: &K) -> bool;
}

/// Hasher for integer keys.
#[derive(Clone, Copy, Debug, Default)]
pub struct Integer;

impl KeyHasher<u32> for Integer {
    fn hash_key(&self, key: &u32) -> u32 {
        key.wrapping_mul(3)
    }

    fn eq_key(&self, a: &u32, b: &u32) -> bool {
        a == b
    }
}

impl KeyHasher<u64> for Integer {
    fn hash_key(&self, key: &u64) -> u32 {
        key.wrapping_mul(3) as u32
    }

    fn eq_key(&self, a: &u64, b: &u64) -> bool {
        a == b
    }
}

/// Hasher for byte-string keys (anything that is [AsRef<\[u8\]>](AsRef)).
///
/// The hash is the wrapping sum of the bytes, so permutations of the same bytes collide.
#[derive(Clone, Copy, Debug, Default)]
pub struct Bytes;

impl<K: AsRef<[u8]> + ?Sized> KeyHasher<K> for Bytes {
    fn hash_key(&self, key: &K) -> u32 {
        key.as_ref()
            .iter()
            .fold(0u32, |sum, &byte| sum.wrapping_add(byte as u32))
    }

    fn eq_key(&self, a: &K, b: &K) -> bool {
        a.as_ref() == b.as_ref()
    }
}

/// Hasher for any [Hash] + [Eq] key, backed by a [BuildHasher].
#[derive(Clone, Debug, Default)]
pub struct Hashed<S>(pub S);

impl<K: Hash + Eq + ?Sized, S: BuildHasher> KeyHasher<K> for Hashed<S> {
    fn hash_key(&self, key: &K) -> u32 {
        self.0.hash_one(key) as u32
    }

    fn eq_key(&self, a: &K, b: &K) -> bool {
        a == b
    }
}

impl<K: ?Sized> KeyHasher<K> for (fn(&K) -> u32, fn(&K, &K) -> bool) {
    fn hash_key(&self, key: &K) -> u32 {
        (self.0)(key)
    }

    fn eq_key(&self, a: &K, b: &K) -> bool {
        (self.1)(a, b)
    }
}

/// An unordered map from unique keys to values.
#[derive(Clone)]
pub struct HashTable<K, V, H = Integer> {
    slots: Vec<Option<(K, V)>>,
    len: usize,
    hasher: H,

    /// Inserts that could not use their ideal slot.
    collisions: u64,
}

impl<K, V, H: KeyHasher<K> + Default> HashTable<K, V, H> {
    /// Create an empty table with the default hasher.
    pub fn new() -> Self {
        Self::with_hasher(H::default())
    }
}

impl<K, V, H: KeyHasher<K> + Default> Default for HashTable<K, V, H> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V, H: KeyHasher<K>> HashTable<K, V, H> {
    /// Create an empty table that hashes and compares keys with `hasher`.
    pub fn with_hasher(hasher: H) -> Self {
        Self {
            slots: Self::empty_slots(INITIAL_CAPACITY),
            len: 0,
            hasher,
            collisions: 0,
        }
    }

    fn empty_slots(capacity: usize) -> Vec<Option<(K, V)>> {
        let mut slots = Vec::with_capacity(capacity);
        slots.resize_with(capacity, || None);
        slots
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of slots.
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Number of inserts that landed away from their ideal slot since creation (or the last
    /// [Self::reset]).
    pub fn collisions(&self) -> u64 {
        self.collisions
    }

    pub fn hasher(&self) -> &H {
        &self.hasher
    }

    /// The slot at which probing for `key` starts.
    pub fn ideal_slot(&self, key: &K) -> usize {
        self.hasher.hash_key(key) as usize % self.slots.len()
    }

    /// Probe for `key`, returning `Ok(slot)` if it is stored there or `Err(slot)` with the first
    /// empty slot where it would go.
    fn probe(&self, key: &K) -> Result<usize, usize> {
        let capacity = self.slots.len();
        let mut slot = self.ideal_slot(key);
        loop {
            match &self.slots[slot] {
                None => return Err(slot),
                Some((stored, _)) if self.hasher.eq_key(stored, key) => return Ok(slot),
                Some(_) => slot = (slot + 1) % capacity,
            }
        }
    }

    /// The slot currently holding `key`.
    pub fn locate(&self, key: &K) -> Option<usize> {
        self.probe(key).ok()
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.locate(key).is_some()
    }

    pub fn get(&self, key: &K) -> Option<&V> {
        self.get_key_value(key).map(|(_, value)| value)
    }

    pub fn get_key_value(&self, key: &K) -> Option<(&K, &V)> {
        let slot = self.locate(key)?;
        self.slots[slot].as_ref().map(|(k, v)| (k, v))
    }

    pub fn get_mut(&mut self, key: &K) -> Option<&mut V> {
        let slot = self.locate(key)?;
        self.slots[slot].as_mut().map(|(_, v)| v)
    }

    /// Insert a new entry.
    ///
    /// If `key` is already present the table is left untouched and the entry is handed back
    /// with [Error::DuplicateKey]. Remove (or [Self::replace]) the existing entry first.
    pub fn insert(&mut self, key: K, value: V) -> Result<(), Rejected<(K, V)>> {
        let mut slot = match self.probe(&key) {
            Ok(_) => return Err(Rejected::new(Error::DuplicateKey, (key, value))),
            Err(slot) => slot,
        };
        if self.len >= limit(self.slots.len()) {
            self.grow();
            slot = match self.probe(&key) {
                Ok(_) => unreachable!("key appeared during growth"),
                Err(slot) => slot,
            };
        }
        if slot != self.ideal_slot(&key) {
            self.collisions += 1;
        }
        self.slots[slot] = Some((key, value));
        self.len += 1;
        Ok(())
    }

    /// Replace the value stored under `key`, returning the previous value.
    pub fn replace(&mut self, key: &K, value: V) -> Result<V, Rejected<V>> {
        match self.get_mut(key) {
            Some(current) => Ok(mem::replace(current, value)),
            None => Err(Rejected::new(Error::KeyNotFound, value)),
        }
    }

    /// Remove `key`, returning its entry.
    pub fn remove(&mut self, key: &K) -> Option<(K, V)> {
        let mut gap = self.locate(key)?;
        let entry = self.slots[gap].take();
        self.len -= 1;

        // Shift back any later member of the chain that can no longer be reached.
        let capacity = self.slots.len();
        let mut slot = gap;
        loop {
            slot = (slot + 1) % capacity;
            let ideal = match &self.slots[slot] {
                None => break,
                Some((stored, _)) => self.ideal_slot(stored),
            };
            let wanted = distance(gap, ideal, capacity);
            let current = distance(gap, slot, capacity);
            if wanted == 0 || wanted > current {
                self.slots[gap] = self.slots[slot].take();
                gap = slot;
            }
        }
        entry
    }

    /// Move every entry into a table of the next prime size.
    fn grow(&mut self) {
        let from = self.slots.len();
        let to = PRIMES
            .iter()
            .copied()
            .find(|&prime| prime > from)
            .expect("hash table exceeds maximum capacity");
        let old = mem::replace(&mut self.slots, Self::empty_slots(to));
        for (key, value) in old.into_iter().flatten() {
            let slot = match self.probe(&key) {
                Ok(slot) | Err(slot) => slot,
            };
            self.slots[slot] = Some((key, value));
        }
        debug!(from, to, len = self.len, "grew hash table");
    }

    /// Remove every entry and shrink back to the initial capacity.
    pub fn reset(&mut self) {
        self.slots = Self::empty_slots(INITIAL_CAPACITY);
        self.len = 0;
        self.collisions = 0;
    }

    /// Iterate over all entries in storage order.
    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> + '_ {
        self.slots
            .iter()
            .filter_map(|slot| slot.as_ref().map(|(k, v)| (k, v)))
    }

    /// A read-only cursor positioned before the first entry (in storage order).
    pub fn cursor(&self) -> Cursor<HashCursor<'_, K, V, H>> {
        Cursor::new(HashCursor {
            table: self,
            pos: 0,
        })
    }
}

impl<K: fmt::Debug, V: fmt::Debug, H> fmt::Debug for HashTable<K, V, H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.slots.iter().flatten().map(|(k, v)| (k, v)))
            .finish()
    }
}

/// [RawCursor] over the entries of a [HashTable].
///
/// Entries cannot be modified, inserted or removed through the cursor.
pub struct HashCursor<'a, K, V, H> {
    table: &'a HashTable<K, V, H>,

    /// `0` before the first slot, `slot + 1` on a slot, and `capacity + 1` after the last slot.
    pos: usize,
}

impl<K, V, H> RawCursor for HashCursor<'_, K, V, H> {
    type Item = (K, V);

    fn begin(&mut self) {
        self.pos = 0;
    }

    fn end(&mut self) {
        self.pos = self.table.slots.len() + 1;
    }

    fn next(&mut self) -> bool {
        let end = self.table.slots.len() + 1;
        while self.pos < end {
            self.pos += 1;
            if self.get().is_some() {
                return true;
            }
        }
        false
    }

    fn prev(&mut self) -> bool {
        while self.pos > 0 {
            self.pos -= 1;
            if self.get().is_some() {
                return true;
            }
        }
        false
    }

    fn get(&self) -> Option<&(K, V)> {
        self.pos
            .checked_sub(1)
            .and_then(|slot| self.table.slots.get(slot))
            .and_then(Option::as_ref)
    }
}
