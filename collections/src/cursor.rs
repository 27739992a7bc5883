//! A bidirectional cursor shared by every container.
//!
//! Each container implements [RawCursor], the minimal set of moves and edits it knows how to
//! perform on its own storage. [Cursor] wraps a [RawCursor] with a three-state [Status] so that
//! boundary behavior is identical across containers:
//!
//! - A new cursor starts at [Status::Start], before the first element.
//! - [Cursor::next] walks forward and, once it runs off the last element, parks at
//!   [Status::End]. Calling it again at the end is a no-op. [Cursor::prev] is symmetric.
//! - Reading, removing or replacing the current element fails with [Error::BeforeStart] or
//!   [Error::AfterEnd] when the cursor is not on an element.
//!
//! A cursor mutably borrows its container, so the container cannot be modified behind its back.

use crate::{Error, Rejected};

/// Where a [Cursor] currently sits.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Status {
    /// Before the first element.
    Start,
    /// On an element.
    Current,
    /// After the last element.
    End,
}

/// Container-specific cursor moves.
///
/// Implementations track their own position, including the positions before the first and
/// after the last element. The edit operations are optional: containers that cannot support
/// them keep the default, which reports [Error::Unsupported].
pub trait RawCursor {
    type Item;

    /// Move before the first element.
    fn begin(&mut self);

    /// Move after the last element.
    fn end(&mut self);

    /// Move forward one position. Returns true if the cursor is now on an element.
    fn next(&mut self) -> bool;

    /// Move backward one position. Returns true if the cursor is now on an element.
    fn prev(&mut self) -> bool;

    /// The current element, if the cursor is on one.
    fn get(&self) -> Option<&Self::Item>;

    /// The current element, if the cursor is on one and the container allows it to be
    /// modified in place.
    fn get_mut(&mut self) -> Option<&mut Self::Item> {
        None
    }

    /// Remove the current element and move onto the element that followed it (or after the
    /// last element if there is none).
    fn remove(&mut self) -> Result<Self::Item, Error> {
        Err(Error::Unsupported)
    }

    /// Insert `item` before the current position. The cursor stays on the same element.
    fn insert(&mut self, item: Self::Item) -> Result<(), Rejected<Self::Item>> {
        Err(Rejected::new(Error::Unsupported, item))
    }

    /// Insert `item` after the current position. The cursor stays on the same element.
    fn insert_after(&mut self, item: Self::Item) -> Result<(), Rejected<Self::Item>> {
        Err(Rejected::new(Error::Unsupported, item))
    }

    /// Replace the current element, returning the previous one.
    fn change(&mut self, item: Self::Item) -> Result<Self::Item, Rejected<Self::Item>> {
        Err(Rejected::new(Error::Unsupported, item))
    }
}

/// A cursor over a container. See the [module documentation](self) for its state machine.
pub struct Cursor<R: RawCursor> {
    raw: R,
    status: Status,
}

impl<R: RawCursor> Cursor<R> {
    /// Wrap a raw cursor, moving it before the first element.
    pub fn new(mut raw: R) -> Self {
        raw.begin();
        Self {
            raw,
            status: Status::Start,
        }
    }

    pub fn status(&self) -> Status {
        self.status
    }

    /// Move before the first element.
    pub fn begin(&mut self) {
        self.raw.begin();
        self.status = Status::Start;
    }

    /// Move after the last element.
    pub fn end(&mut self) {
        self.raw.end();
        self.status = Status::End;
    }

    /// Advance to the next element and return it, or park after the last element and return
    /// `None`.
    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) -> Option<&R::Item> {
        if self.status == Status::End {
            return None;
        }
        if !self.raw.next() {
            self.raw.end();
            self.status = Status::End;
            return None;
        }
        self.status = Status::Current;
        self.raw.get()
    }

    /// Retreat to the previous element and return it, or park before the first element and
    /// return `None`.
    pub fn prev(&mut self) -> Option<&R::Item> {
        if self.status == Status::Start {
            return None;
        }
        if !self.raw.prev() {
            self.raw.begin();
            self.status = Status::Start;
            return None;
        }
        self.status = Status::Current;
        self.raw.get()
    }

    /// Fail unless the cursor is on an element.
    fn on_element(&self) -> Result<(), Error> {
        match self.status {
            Status::Start => Err(Error::BeforeStart),
            Status::Current => Ok(()),
            Status::End => Err(Error::AfterEnd),
        }
    }

    /// The current element.
    pub fn get(&self) -> Result<&R::Item, Error> {
        self.on_element()?;
        self.raw.get().ok_or(Error::AfterEnd)
    }

    /// The current element, mutably. Fails with [Error::Unsupported] when the container does
    /// not allow in-place modification.
    pub fn get_mut(&mut self) -> Result<&mut R::Item, Error> {
        self.on_element()?;
        self.raw.get_mut().ok_or(Error::Unsupported)
    }

    /// Remove and return the current element. The cursor moves onto the element that followed
    /// it, or after the last element if there is none.
    pub fn remove(&mut self) -> Result<R::Item, Error> {
        self.on_element()?;
        let item = self.raw.remove()?;
        self.status = if self.raw.get().is_some() {
            Status::Current
        } else {
            self.raw.end();
            Status::End
        };
        Ok(item)
    }

    /// Insert `item` before the current element (or as the last element when after the end).
    ///
    /// Fails with [Error::BeforeStart] before the first element.
    pub fn insert(&mut self, item: R::Item) -> Result<(), Rejected<R::Item>> {
        if self.status == Status::Start {
            return Err(Rejected::new(Error::BeforeStart, item));
        }
        self.raw.insert(item)
    }

    /// Insert `item` after the current element (or as the first element when before the start).
    ///
    /// Fails with [Error::AfterEnd] after the last element.
    pub fn insert_after(&mut self, item: R::Item) -> Result<(), Rejected<R::Item>> {
        if self.status == Status::End {
            return Err(Rejected::new(Error::AfterEnd, item));
        }
        self.raw.insert_after(item)
    }

    /// Replace the current element, returning the previous one.
    pub fn change(&mut self, item: R::Item) -> Result<R::Item, Rejected<R::Item>> {
        if let Err(error) = self.on_element() {
            return Err(Rejected::new(error, item));
        }
        self.raw.change(item)
    }
}
