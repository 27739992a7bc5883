//! Containers sharing a uniform, bidirectional cursor protocol.
//!
//! # Overview
//!
//! - [Array]: a growable array with power-of-two capacity and negative (from the end) indexing.
//! - [List]: a doubly-linked list stored in an arena, bracketed by two sentinel nodes.
//! - [HashTable]: an open-addressing, linearly probed hash table with backward-shift deletion.
//!
//! Every container hands out a [Cursor] that walks its elements in both directions and parks
//! before the first or after the last element (see [cursor]). [Array] and [List] cursors can
//! insert, remove and replace elements; [HashTable] cursors are read-only.
//!
//! Operations that take ownership of an element and fail return it inside [Rejected], so
//! nothing is dropped behind the caller's back.
//!
//! # Example
//!
//! ```rust
//! use kiln_collections::{List, Status};
//!
//! let mut list: List<u32> = (1..=3).collect();
//! let mut cursor = list.cursor();
//! while let Some(value) = cursor.next().copied() {
//!     if value == 2 {
//!         cursor.remove().unwrap();
//!     }
//! }
//! assert_eq!(cursor.status(), Status::End);
//! assert_eq!(list.iter().copied().collect::<Vec<_>>(), vec![1, 3]);
//! ```

pub mod array;
pub mod cursor;
pub mod error;
pub mod hash;
pub mod list;

// Re-export main types and traits
pub use array::Array;
pub use cursor::{Cursor, RawCursor, Status};
pub use error::{Error, Rejected};
pub use hash::{HashTable, KeyHasher};
pub use list::List;
