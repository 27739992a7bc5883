//! A doubly-linked list stored in an arena.
//!
//! Nodes live in a `Vec` and link to each other by index. Two permanent sentinel nodes bracket
//! the data: [HEAD] sits before the first element and [TAIL] after the last, so every data node
//! always has both neighbors and no link is ever optional. Freed slots are recycled.

use crate::{
    cursor::{Cursor, RawCursor},
    Error, Rejected,
};
use std::{fmt, iter::FusedIterator, mem};

/// Index of the sentinel before the first element.
const HEAD: usize = 0;

/// Index of the sentinel after the last element.
const TAIL: usize = 1;

#[derive(Clone)]
struct Node<T> {
    prev: usize,
    next: usize,

    /// `None` for sentinels and free slots.
    data: Option<T>,
}

/// A doubly-linked list with O(1) insertion and removal at any cursor position.
#[derive(Clone)]
pub struct List<T> {
    nodes: Vec<Node<T>>,
    free: Vec<usize>,
    len: usize,
}

impl<T> List<T> {
    /// Create an empty list.
    pub fn new() -> Self {
        let sentinel = || Node {
            prev: HEAD,
            next: TAIL,
            data: None,
        };
        Self {
            nodes: vec![sentinel(), sentinel()],
            free: Vec::new(),
            len: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Store `data` in a free slot (or a new one) and return its index.
    fn alloc(&mut self, data: T) -> usize {
        let node = Node {
            prev: HEAD,
            next: TAIL,
            data: Some(data),
        };
        match self.free.pop() {
            Some(id) => {
                self.nodes[id] = node;
                id
            }
            None => {
                self.nodes.push(node);
                self.nodes.len() - 1
            }
        }
    }

    /// Link a new node holding `data` right after node `at`.
    fn link_after(&mut self, at: usize, data: T) -> usize {
        let next = self.nodes[at].next;
        let id = self.alloc(data);
        self.nodes[id].prev = at;
        self.nodes[id].next = next;
        self.nodes[at].next = id;
        self.nodes[next].prev = id;
        self.len += 1;
        id
    }

    /// Link a new node holding `data` right before node `at`.
    fn link_before(&mut self, at: usize, data: T) -> usize {
        let prev = self.nodes[at].prev;
        self.link_after(prev, data)
    }

    /// Unlink data node `id` and return its data. Sentinels are never unlinked.
    fn unlink(&mut self, id: usize) -> Option<T> {
        if id == HEAD || id == TAIL {
            return None;
        }
        let data = self.nodes[id].data.take()?;
        let (prev, next) = (self.nodes[id].prev, self.nodes[id].next);
        self.nodes[prev].next = next;
        self.nodes[next].prev = prev;
        self.free.push(id);
        self.len -= 1;
        Some(data)
    }

    /// Insert `value` as the first element.
    pub fn prepend(&mut self, value: T) {
        self.link_after(HEAD, value);
    }

    /// Insert `value` as the last element.
    pub fn append(&mut self, value: T) {
        self.link_before(TAIL, value);
    }

    /// Remove and return the first element.
    pub fn pop_front(&mut self) -> Result<T, Error> {
        let first = self.nodes[HEAD].next;
        self.unlink(first).ok_or(Error::Empty)
    }

    /// Remove and return the last element.
    pub fn pop_back(&mut self) -> Result<T, Error> {
        let last = self.nodes[TAIL].prev;
        self.unlink(last).ok_or(Error::Empty)
    }

    pub fn front(&self) -> Option<&T> {
        self.nodes[self.nodes[HEAD].next].data.as_ref()
    }

    pub fn back(&self) -> Option<&T> {
        self.nodes[self.nodes[TAIL].prev].data.as_ref()
    }

    /// The element at `pos`, walking from the front.
    pub fn get(&self, pos: usize) -> Option<&T> {
        self.iter().nth(pos)
    }

    /// Remove every element.
    pub fn reset(&mut self) {
        self.nodes.truncate(2);
        self.nodes[HEAD].next = TAIL;
        self.nodes[TAIL].prev = HEAD;
        self.free.clear();
        self.len = 0;
    }

    /// Iterate from front to back (or back to front with `rev`).
    pub fn iter(&self) -> Iter<'_, T> {
        Iter {
            list: self,
            front: self.nodes[HEAD].next,
            back: self.nodes[TAIL].prev,
            remaining: self.len,
        }
    }

    /// A cursor positioned before the first element.
    pub fn cursor(&mut self) -> Cursor<ListCursor<'_, T>> {
        Cursor::new(ListCursor {
            list: self,
            at: HEAD,
        })
    }
}

impl<T> Default for List<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: fmt::Debug> fmt::Debug for List<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

impl<T: PartialEq> PartialEq for List<T> {
    fn eq(&self, other: &Self) -> bool {
        self.len == other.len && self.iter().eq(other.iter())
    }
}

impl<T: Eq> Eq for List<T> {}

impl<T> FromIterator<T> for List<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut list = Self::new();
        list.extend(iter);
        list
    }
}

impl<T> Extend<T> for List<T> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        for value in iter {
            self.append(value);
        }
    }
}

impl<'a, T> IntoIterator for &'a List<T> {
    type Item = &'a T;
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Iterator over the elements of a [List].
pub struct Iter<'a, T> {
    list: &'a List<T>,
    front: usize,
    back: usize,
    remaining: usize,
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let node = &self.list.nodes[self.front];
        self.front = node.next;
        self.remaining -= 1;
        node.data.as_ref()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<T> DoubleEndedIterator for Iter<'_, T> {
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let node = &self.list.nodes[self.back];
        self.back = node.prev;
        self.remaining -= 1;
        node.data.as_ref()
    }
}

impl<T> ExactSizeIterator for Iter<'_, T> {}

impl<T> FusedIterator for Iter<'_, T> {}

/// [RawCursor] over a [List].
pub struct ListCursor<'a, T> {
    list: &'a mut List<T>,

    /// Current node; [HEAD] before the first element and [TAIL] after the last.
    at: usize,
}

impl<T> RawCursor for ListCursor<'_, T> {
    type Item = T;

    fn begin(&mut self) {
        self.at = HEAD;
    }

    fn end(&mut self) {
        self.at = TAIL;
    }

    fn next(&mut self) -> bool {
        if self.at != TAIL {
            self.at = self.list.nodes[self.at].next;
        }
        self.at != TAIL
    }

    fn prev(&mut self) -> bool {
        if self.at != HEAD {
            self.at = self.list.nodes[self.at].prev;
        }
        self.at != HEAD
    }

    fn get(&self) -> Option<&T> {
        self.list.nodes[self.at].data.as_ref()
    }

    fn get_mut(&mut self) -> Option<&mut T> {
        self.list.nodes[self.at].data.as_mut()
    }

    fn remove(&mut self) -> Result<T, Error> {
        let next = self.list.nodes[self.at].next;
        let item = self.list.unlink(self.at).ok_or(if self.at == HEAD {
            Error::BeforeStart
        } else {
            Error::AfterEnd
        })?;
        self.at = next;
        Ok(item)
    }

    fn insert(&mut self, item: T) -> Result<(), Rejected<T>> {
        if self.at == HEAD {
            return Err(Rejected::new(Error::BeforeStart, item));
        }
        self.list.link_before(self.at, item);
        Ok(())
    }

    fn insert_after(&mut self, item: T) -> Result<(), Rejected<T>> {
        if self.at == TAIL {
            return Err(Rejected::new(Error::AfterEnd, item));
        }
        self.list.link_after(self.at, item);
        Ok(())
    }

    fn change(&mut self, item: T) -> Result<T, Rejected<T>> {
        match self.list.nodes[self.at].data.as_mut() {
            Some(current) => Ok(mem::replace(current, item)),
            None => Err(Rejected::new(Error::AfterEnd, item)),
        }
    }
}
