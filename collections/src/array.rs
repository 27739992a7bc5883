//! A dynamic array.
//!
//! Storage grows to the next power of two (and never below [MIN_CAPACITY]) so that repeated
//! pushes reallocate a logarithmic number of times. Positions passed to [Array::get] may be
//! negative and then count from the end: `-1` is the last element.

use crate::{
    cursor::{Cursor, RawCursor},
    Error, Rejected,
};
use std::{mem, slice};

/// Smallest non-zero capacity of an [Array].
pub const MIN_CAPACITY: usize = 4;

/// A growable array with stack operations, negative indexing and a [Cursor].
#[derive(Clone, Debug)]
pub struct Array<T> {
    data: Vec<T>,

    /// Snapped capacity (tracked separately since `Vec` may over-allocate).
    alloc: usize,
}

impl<T> Array<T> {
    /// Create an empty array without allocating.
    pub fn new() -> Self {
        Self {
            data: Vec::new(),
            alloc: 0,
        }
    }

    /// Create an empty array able to hold `capacity` elements before growing.
    pub fn with_capacity(capacity: usize) -> Self {
        let mut array = Self::new();
        array.grow(capacity);
        array
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns true if the array holds no elements.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Number of elements the array can hold before growing.
    pub fn capacity(&self) -> usize {
        self.alloc
    }

    /// Ensure room for at least `min_len` elements.
    pub fn grow(&mut self, min_len: usize) {
        if min_len <= self.alloc {
            return;
        }
        let alloc = min_len
            .checked_next_power_of_two()
            .expect("array capacity overflows usize")
            .max(MIN_CAPACITY);
        self.data.reserve_exact(alloc - self.data.len());
        self.alloc = alloc;
    }

    /// Append `value`.
    pub fn push(&mut self, value: T) {
        self.grow(self.data.len() + 1);
        self.data.push(value);
    }

    /// Remove and return the last element.
    pub fn pop(&mut self) -> Result<T, Error> {
        self.data.pop().ok_or(Error::Empty)
    }

    /// The last element.
    pub fn top(&self) -> Result<&T, Error> {
        self.data.last().ok_or(Error::Empty)
    }

    /// Map a possibly negative position onto an index.
    fn resolve(&self, pos: isize) -> Result<usize, Error> {
        let len = self.data.len();
        let index = if pos < 0 {
            len.checked_sub(pos.unsigned_abs())
        } else {
            Some(pos.unsigned_abs())
        };
        match index {
            Some(index) if index < len => Ok(index),
            _ => Err(Error::OutOfRange(pos, len)),
        }
    }

    /// The element at `pos`. Negative positions count from the end.
    pub fn get(&self, pos: isize) -> Result<&T, Error> {
        let index = self.resolve(pos)?;
        Ok(&self.data[index])
    }

    /// The element at `pos`. Negative positions count from the end.
    pub fn get_mut(&mut self, pos: isize) -> Result<&mut T, Error> {
        let index = self.resolve(pos)?;
        Ok(&mut self.data[index])
    }

    /// Insert `value` at `pos`, shifting later elements up.
    pub fn insert(&mut self, pos: usize, value: T) -> Result<(), Rejected<T>> {
        let len = self.data.len();
        if pos > len {
            return Err(Rejected::new(Error::OutOfRange(pos as isize, len), value));
        }
        self.grow(len + 1);
        self.data.insert(pos, value);
        Ok(())
    }

    /// Remove and return the element at `pos`, shifting later elements down.
    pub fn remove(&mut self, pos: usize) -> Result<T, Error> {
        let len = self.data.len();
        if pos >= len {
            return Err(Error::OutOfRange(pos as isize, len));
        }
        Ok(self.data.remove(pos))
    }

    /// Remove every element, keeping the allocation.
    pub fn reset(&mut self) {
        self.data.clear();
    }

    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    pub fn iter(&self) -> slice::Iter<'_, T> {
        self.data.iter()
    }

    pub fn iter_mut(&mut self) -> slice::IterMut<'_, T> {
        self.data.iter_mut()
    }

    /// A cursor positioned before the first element.
    pub fn cursor(&mut self) -> Cursor<ArrayCursor<'_, T>> {
        Cursor::new(ArrayCursor {
            array: self,
            pos: -1,
        })
    }
}

impl<T: Default> Array<T> {
    /// Store `value` at `pos`, filling any gap past the end with default values. Returns the
    /// element previously at `pos`, if there was one.
    pub fn set(&mut self, pos: usize, value: T) -> Option<T> {
        if pos < self.data.len() {
            return Some(mem::replace(&mut self.data[pos], value));
        }
        self.grow(pos + 1);
        self.data.resize_with(pos, T::default);
        self.data.push(value);
        None
    }
}

impl<T: Clone> Array<T> {
    /// Replace the contents with a copy of `other`.
    pub fn assign(&mut self, other: &Array<T>) {
        self.data.clear();
        self.append(other);
    }

    /// Append a copy of every element of `other`.
    pub fn append(&mut self, other: &Array<T>) {
        self.grow(self.data.len() + other.len());
        self.data.extend_from_slice(&other.data);
    }
}

/// Arrays compare by their elements only.
impl<T: PartialEq> PartialEq for Array<T> {
    fn eq(&self, other: &Self) -> bool {
        self.data == other.data
    }
}

impl<T: Eq> Eq for Array<T> {}

impl<T> Default for Array<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> FromIterator<T> for Array<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut array = Self::new();
        array.extend(iter);
        array
    }
}

impl<T> Extend<T> for Array<T> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        for value in iter {
            self.push(value);
        }
    }
}

impl<'a, T> IntoIterator for &'a Array<T> {
    type Item = &'a T;
    type IntoIter = slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// [RawCursor] over an [Array].
pub struct ArrayCursor<'a, T> {
    array: &'a mut Array<T>,

    /// Index of the current element; `-1` before the first and `len` after the last.
    pos: isize,
}

impl<T> ArrayCursor<'_, T> {
    fn index(&self) -> Option<usize> {
        usize::try_from(self.pos)
            .ok()
            .filter(|&index| index < self.array.len())
    }
}

impl<T> RawCursor for ArrayCursor<'_, T> {
    type Item = T;

    fn begin(&mut self) {
        self.pos = -1;
    }

    fn end(&mut self) {
        self.pos = self.array.len() as isize;
    }

    fn next(&mut self) -> bool {
        let len = self.array.len() as isize;
        if self.pos < len {
            self.pos += 1;
        }
        self.pos < len
    }

    fn prev(&mut self) -> bool {
        if self.pos >= 0 {
            self.pos -= 1;
        }
        self.pos >= 0
    }

    fn get(&self) -> Option<&T> {
        self.index().map(|index| &self.array.data[index])
    }

    fn get_mut(&mut self) -> Option<&mut T> {
        let index = self.index()?;
        Some(&mut self.array.data[index])
    }

    fn remove(&mut self) -> Result<T, Error> {
        let index = self.index().ok_or(Error::AfterEnd)?;
        // The following element slides into `index`.
        self.array.remove(index)
    }

    fn insert(&mut self, item: T) -> Result<(), Rejected<T>> {
        let Ok(index) = usize::try_from(self.pos) else {
            return Err(Rejected::new(Error::BeforeStart, item));
        };
        self.array.insert(index, item)?;
        self.pos += 1;
        Ok(())
    }

    fn insert_after(&mut self, item: T) -> Result<(), Rejected<T>> {
        if self.pos >= self.array.len() as isize {
            return Err(Rejected::new(Error::AfterEnd, item));
        }
        self.array.insert((self.pos + 1) as usize, item)
    }

    fn change(&mut self, item: T) -> Result<T, Rejected<T>> {
        match self.index() {
            Some(index) => Ok(mem::replace(&mut self.array.data[index], item)),
            None => Err(Rejected::new(Error::AfterEnd, item)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cursor::Status;
    use test_case::test_case;

    #[test]
    fn test_stack() {
        let mut array = Array::new();
        assert_eq!(array.capacity(), 0);
        assert_eq!(array.pop(), Err(Error::Empty));
        assert_eq!(array.top(), Err(Error::Empty));

        for i in 0..10 {
            array.push(i);
        }
        assert_eq!(array.len(), 10);
        assert_eq!(array.top(), Ok(&9));
        assert_eq!(array.pop(), Ok(9));
        assert_eq!(array.pop(), Ok(8));
        assert_eq!(array.len(), 8);
    }

    #[test_case(1, 4; "minimum")]
    #[test_case(4, 4; "exact minimum")]
    #[test_case(5, 8; "snapped")]
    #[test_case(100, 128; "large")]
    fn test_capacity_snapping(len: usize, expected: usize) {
        let mut array = Array::new();
        for i in 0..len {
            array.push(i);
        }
        assert_eq!(array.capacity(), expected);
    }

    #[test]
    fn test_negative_indexing() {
        let array: Array<u32> = (10..15).collect();
        assert_eq!(array.get(0), Ok(&10));
        assert_eq!(array.get(4), Ok(&14));
        assert_eq!(array.get(-1), Ok(&14));
        assert_eq!(array.get(-2), Ok(&13));
        assert_eq!(array.get(-5), Ok(&10));
        assert_eq!(array.get(5), Err(Error::OutOfRange(5, 5)));
        assert_eq!(array.get(-6), Err(Error::OutOfRange(-6, 5)));
        assert_eq!(array.get(isize::MIN), Err(Error::OutOfRange(isize::MIN, 5)));

        let empty: Array<u32> = Array::new();
        assert_eq!(empty.get(0), Err(Error::OutOfRange(0, 0)));
        assert_eq!(empty.get(-1), Err(Error::OutOfRange(-1, 0)));
    }

    #[test]
    fn test_get_mut() {
        let mut array: Array<u32> = (0..3).collect();
        *array.get_mut(-1).unwrap() = 42;
        assert_eq!(array.as_slice(), &[0, 1, 42]);
    }

    #[test]
    fn test_set_extends() {
        let mut array: Array<u32> = Array::new();
        assert_eq!(array.set(3, 7), None);
        assert_eq!(array.as_slice(), &[0, 0, 0, 7]);
        assert_eq!(array.set(1, 5), Some(0));
        assert_eq!(array.as_slice(), &[0, 5, 0, 7]);
        assert_eq!(array.set(4, 9), None);
        assert_eq!(array.len(), 5);
        assert_eq!(array.capacity(), 8);
    }

    #[test]
    fn test_insert_remove() {
        let mut array: Array<u32> = (0..3).collect();
        array.insert(1, 10).unwrap();
        array.insert(4, 20).unwrap();
        assert_eq!(array.as_slice(), &[0, 10, 1, 2, 20]);
        let rejected = array.insert(9, 30).unwrap_err();
        assert_eq!(rejected.error, Error::OutOfRange(9, 5));
        assert_eq!(rejected.into_inner(), 30);

        assert_eq!(array.remove(0), Ok(0));
        assert_eq!(array.remove(9), Err(Error::OutOfRange(9, 4)));
        assert_eq!(array.as_slice(), &[10, 1, 2, 20]);
    }

    #[test]
    fn test_assign_append() {
        let a: Array<u32> = (0..3).collect();
        let b: Array<u32> = (3..5).collect();

        let mut c = Array::new();
        c.assign(&b);
        assert_eq!(c.as_slice(), &[3, 4]);
        c.assign(&a);
        assert_eq!(c.as_slice(), &[0, 1, 2]);
        c.append(&b);
        assert_eq!(c.as_slice(), &[0, 1, 2, 3, 4]);

        c.reset();
        assert!(c.is_empty());
        assert_eq!(c.capacity(), 8);
    }

    #[test]
    fn test_cursor_remove_all() {
        let mut array: Array<u32> = (0..5).collect();
        let mut cursor = array.cursor();
        cursor.next();
        let mut removed = Vec::new();
        while cursor.status() == Status::Current {
            removed.push(cursor.remove().unwrap());
        }
        assert_eq!(removed, vec![0, 1, 2, 3, 4]);
        assert_eq!(cursor.status(), Status::End);
        assert!(array.is_empty());
    }

    #[test]
    fn test_cursor_insert() {
        let mut array: Array<u32> = vec![1, 3].into_iter().collect();
        let mut cursor = array.cursor();

        // Insert after "before the first element" prepends.
        cursor.insert_after(0).unwrap();
        assert_eq!(cursor.next(), Some(&0));
        assert_eq!(cursor.next(), Some(&1));

        // The cursor stays on the same element across inserts.
        cursor.insert_after(2).unwrap();
        assert_eq!(cursor.get(), Ok(&1));
        cursor.insert(99).unwrap();
        assert_eq!(cursor.get(), Ok(&1));
        assert_eq!(cursor.next(), Some(&2));
        assert_eq!(cursor.next(), Some(&3));

        // Insert at the end appends.
        assert!(cursor.next().is_none());
        cursor.insert(4).unwrap();
        assert_eq!(cursor.status(), Status::End);
        assert_eq!(array.as_slice(), &[0, 99, 1, 2, 3, 4]);
    }

    #[test]
    fn test_cursor_change() {
        let mut array: Array<String> = ["a", "b"].iter().map(|s| s.to_string()).collect();
        let mut cursor = array.cursor();
        cursor.next();
        cursor.next();
        assert_eq!(cursor.change("z".to_string()).unwrap(), "b");
        cursor.get_mut().unwrap().push('!');
        assert_eq!(array.as_slice(), &["a".to_string(), "z!".to_string()]);
    }
}
