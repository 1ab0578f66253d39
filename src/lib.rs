//! Ordered tree collections with pluggable comparators.
//!
//! This crate provides [`RbTreeMap`] and [`RbTreeSet`], red-black-tree
//! collections whose order is injected at construction rather than baked
//! into the element type, plus the positional machinery that an ordered
//! container makes cheap:
//!
//! - [`by_offset`](RbTreeMap::by_offset) / [`rank_of`](RbTreeMap::rank_of) -
//!   O(log n) access by sorted position, with negative offsets counting
//!   from the end
//! - [`slice`](RbTreeMap::slice) / [`delete_range`](RbTreeMap::delete_range) -
//!   half-open key ranges, extracted into an independent tree or removed
//!   in place
//! - [`Cursor`] - bidirectional positional iteration with mid-walk
//!   direction changes, [`goto`](Cursor::goto), and entry removal under
//!   the cursor
//! - Set algebra on [`RbTreeSet`] via methods or `|`, `&`, `-`, `^`
//! - Durable byte forms that record the comparator by *name* and resolve
//!   it on load through a process-wide [registry](register_comparator)
//!
//! A [`Comparator`] may decline to order a pair (surfacing
//! [`Error::BadComparator`] at first use) or declare that it never reports
//! equality, turning the map into an ordered multimap.
//!
//! # Example
//!
//! ```
//! use rufous_tree::RbTreeMap;
//!
//! let mut scores = RbTreeMap::new();
//! scores.insert("Alice", 100).unwrap();
//! scores.insert("Bob", 85).unwrap();
//! scores.insert("Carol", 92).unwrap();
//!
//! // Dictionary operations work as expected
//! assert_eq!(scores.get(&"Bob").unwrap(), 85);
//! assert_eq!(scores.len(), 3);
//!
//! // Positional access (O(log n))
//! assert_eq!(scores.by_offset(1).unwrap(), "Bob");
//! assert_eq!(scores.by_offset(-1).unwrap(), "Carol");
//! assert_eq!(scores.rank_of(&"Carol").unwrap(), 2);
//!
//! // Cursors walk in either direction and survive the map handle
//! let mut cur = scores.descending();
//! assert_eq!(cur.try_next().unwrap().into_key(), Some("Carol"));
//! ```
//!
//! # Implementation
//!
//! Both collections share one core: a red-black tree with parent pointers
//! and subtree-size augmentation, stored in a slot arena and addressed by
//! niche-compressed handles. Subtree sizes give every rank operation its
//! O(log n) bound; sorted bulk construction (slices, set algebra, durable
//! loads) runs in O(n).
//!
//! The collections are single-threaded: cursors share ownership of their
//! tree, and cross-cursor structural mutation is detected fail-fast through
//! a generation stamp rather than prevented by the type system.

// These forbid rules and lint groups are meant to be very restrictive.
#![forbid(unsafe_code)]
#![forbid(keyword_idents)]
#![forbid(non_ascii_idents)]
#![forbid(unreachable_pub)]
#![warn(clippy::all)]
#![warn(clippy::cargo)]
#![warn(clippy::pedantic)]

mod comparator;
mod durable;
mod error;
mod offset;
mod raw;
mod scalar;

pub mod rbtree_map;
pub mod rbtree_set;

pub use comparator::{
    Comparator, FnComparator, NaturalOrder, ReverseOrder, SharedComparator, register_comparator,
    resolve_comparator,
};
pub use error::Error;
pub use offset::Offset;
pub use rbtree_map::{Cursor, CursorItem, Direction, Projection, RbTreeMap};
pub use rbtree_set::RbTreeSet;
pub use scalar::Scalar;
