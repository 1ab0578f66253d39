use std::cell::RefCell;
use std::rc::Rc;

use crate::error::Error;
use crate::raw::{Core, Handle};

/// Which way a [`Cursor`] walks by default.
///
/// Direction is plain public state, mutable mid-iteration: flipping it makes
/// the very next [`try_next`](Cursor::try_next) step the other way from the
/// current entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Backward,
}

impl Direction {
    fn opposite(self) -> Self {
        match self {
            Self::Forward => Self::Backward,
            Self::Backward => Self::Forward,
        }
    }
}

/// What a [`Cursor`] yields per entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Projection {
    Keys,
    Values,
    Items,
    Nodes,
}

/// One projected entry yielded by a [`Cursor`].
///
/// The variant mirrors the cursor's [`Projection`]; `Node` carries the full
/// entry just as `Item` does, but marks that the cursor can be asked for any
/// projection of its current position via [`Cursor::get`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CursorItem<K, V> {
    Key(K),
    Value(V),
    Item(K, V),
    Node(K, V),
}

impl<K, V> CursorItem<K, V> {
    /// The key, if this projection carries one.
    pub fn into_key(self) -> Option<K> {
        match self {
            Self::Key(k) | Self::Item(k, _) | Self::Node(k, _) => Some(k),
            Self::Value(_) => None,
        }
    }

    /// The value, if this projection carries one.
    pub fn into_value(self) -> Option<V> {
        match self {
            Self::Value(v) | Self::Item(_, v) | Self::Node(_, v) => Some(v),
            Self::Key(_) => None,
        }
    }

    /// The full entry, if this projection carries both halves.
    pub fn into_item(self) -> Option<(K, V)> {
        match self {
            Self::Item(k, v) | Self::Node(k, v) => Some((k, v)),
            Self::Key(_) | Self::Value(_) => None,
        }
    }
}

/// Where the cursor currently stands.
///
/// `Unstarted` is distinct from the sentinels: a fresh cursor yields the
/// minimum entry when first stepped forward and the maximum when first
/// stepped backward, whereas a cursor parked on `Start` can only move
/// forward and one parked on `End` only backward.
#[derive(Clone, Copy)]
enum Position {
    Unstarted,
    Start,
    End,
    On(Handle),
}

/// A bidirectional positional cursor over an [`RbTreeMap`].
///
/// The cursor shares ownership of the tree, so it remains usable even after
/// the map handle it came from is dropped. It starts positioned on no entry;
/// stepping moves it onto one and yields that entry's projection. Stepping
/// past either end parks the cursor on a sentinel and reports
/// [`Error::Exhausted`] — reaching the end is a state, not a failure, and
/// the cursor can immediately walk back out of it.
///
/// Structural mutations made through the map (or another cursor) while this
/// cursor stands on an entry invalidate it fail-fast: the next positional
/// call reports [`Error::InvalidatedCursor`] instead of walking freed or
/// relocated nodes. Replacing a value in place is not structural and leaves
/// cursors untouched. [`goto`](Cursor::goto) re-anchors an invalidated
/// cursor.
///
/// # Examples
///
/// ```
/// use rufous_tree::{Error, RbTreeMap};
///
/// let map = RbTreeMap::from_entries((1..=3).map(|k| (k, k * 10))).unwrap();
/// let mut cur = map.cursor();
/// drop(map); // cursor keeps the tree alive
///
/// assert_eq!(cur.try_next().unwrap().into_key(), Some(1));
/// assert_eq!(cur.try_next().unwrap().into_key(), Some(2));
/// assert_eq!(cur.try_prev().unwrap().into_key(), Some(1));
/// assert!(matches!(cur.try_prev(), Err(Error::Exhausted)));
/// ```
///
/// [`RbTreeMap`]: crate::RbTreeMap
pub struct Cursor<K, V> {
    core: Rc<RefCell<Core<K, V>>>,
    position: Position,
    /// The walk direction [`try_next`](Cursor::try_next) uses; freely
    /// reassignable between steps.
    pub direction: Direction,
    projection: Projection,
    stamp: u64,
}

impl<K, V> Cursor<K, V> {
    pub(crate) fn new(
        core: Rc<RefCell<Core<K, V>>>,
        projection: Projection,
        direction: Direction,
    ) -> Self {
        let stamp = core.borrow().generation();
        Self {
            core,
            position: Position::Unstarted,
            direction,
            projection,
            stamp,
        }
    }

    /// The cursor's projection, fixed at construction.
    #[must_use]
    pub fn projection(&self) -> Projection {
        self.projection
    }

    /// The handle under the cursor, provided the tree has not structurally
    /// changed since the cursor last stood on it.
    fn current(&self) -> Result<Handle, Error> {
        match self.position {
            Position::On(h) => {
                if self.core.borrow().generation() == self.stamp {
                    Ok(h)
                } else {
                    Err(Error::InvalidatedCursor)
                }
            }
            Position::Unstarted | Position::Start | Position::End => Err(Error::InactiveCursor),
        }
    }
}

impl<K: Clone, V: Clone> Cursor<K, V> {
    fn project(&self, core: &Core<K, V>, h: Handle) -> CursorItem<K, V> {
        let (k, v) = core.key_value(h);
        match self.projection {
            Projection::Keys => CursorItem::Key(k.clone()),
            Projection::Values => CursorItem::Value(v.clone()),
            Projection::Items => CursorItem::Item(k.clone(), v.clone()),
            Projection::Nodes => CursorItem::Node(k.clone(), v.clone()),
        }
    }

    fn step(&mut self, direction: Direction) -> Result<CursorItem<K, V>, Error> {
        // Taking a reborrow here keeps the invalidation check and the walk
        // under one consistent view of the tree.
        let core = self.core.borrow();
        let next = match (self.position, direction) {
            (Position::On(h), _) => {
                if core.generation() != self.stamp {
                    return Err(Error::InvalidatedCursor);
                }
                match direction {
                    Direction::Forward => core.successor(h),
                    Direction::Backward => core.predecessor(h),
                }
            }
            (Position::Unstarted | Position::Start, Direction::Forward) => core.min_handle(),
            (Position::Unstarted | Position::End, Direction::Backward) => core.max_handle(),
            (Position::Start, Direction::Backward) | (Position::End, Direction::Forward) => None,
        };
        match next {
            Some(h) => {
                self.position = Position::On(h);
                Ok(self.project(&core, h))
            }
            None => {
                self.position = match direction {
                    Direction::Forward => Position::End,
                    Direction::Backward => Position::Start,
                };
                Err(Error::Exhausted)
            }
        }
    }

    /// Steps one entry in the cursor's [`direction`](Cursor::direction) and
    /// yields its projection, or [`Error::Exhausted`] past the end.
    pub fn try_next(&mut self) -> Result<CursorItem<K, V>, Error> {
        self.step(self.direction)
    }

    /// Steps one entry against the cursor's direction.
    pub fn try_prev(&mut self) -> Result<CursorItem<K, V>, Error> {
        self.step(self.direction.opposite())
    }

    /// Repositions the cursor onto `key`, re-anchoring it even if it had
    /// been invalidated. Fails with [`Error::KeyNotFound`] without moving.
    pub fn goto(&mut self, key: &K) -> Result<(), Error> {
        let core = self.core.borrow();
        let h = core.find(key)?.ok_or(Error::KeyNotFound)?;
        self.position = Position::On(h);
        self.stamp = core.generation();
        Ok(())
    }

    /// The key under the cursor, without moving.
    pub fn key(&self) -> Result<K, Error> {
        let h = self.current()?;
        Ok(self.core.borrow().key_value(h).0.clone())
    }

    /// The value under the cursor, without moving.
    pub fn value(&self) -> Result<V, Error> {
        let h = self.current()?;
        Ok(self.core.borrow().key_value(h).1.clone())
    }

    /// The full entry under the cursor, without moving.
    pub fn item(&self) -> Result<(K, V), Error> {
        let h = self.current()?;
        let core = self.core.borrow();
        let (k, v) = core.key_value(h);
        Ok((k.clone(), v.clone()))
    }

    /// The current entry under any requested projection, regardless of the
    /// cursor's own.
    pub fn get(&self, projection: Projection) -> Result<CursorItem<K, V>, Error> {
        let h = self.current()?;
        let core = self.core.borrow();
        let (k, v) = core.key_value(h);
        Ok(match projection {
            Projection::Keys => CursorItem::Key(k.clone()),
            Projection::Values => CursorItem::Value(v.clone()),
            Projection::Items => CursorItem::Item(k.clone(), v.clone()),
            Projection::Nodes => CursorItem::Node(k.clone(), v.clone()),
        })
    }

    /// Removes the entry under the cursor and yields its projection. The
    /// cursor slides to the neighbor in its walk direction, so iteration
    /// continues seamlessly; with no neighbor left it parks on the sentinel.
    ///
    /// Requires the cursor to stand on an entry ([`Error::InactiveCursor`]
    /// otherwise) that is still valid ([`Error::InvalidatedCursor`]).
    ///
    /// # Examples
    ///
    /// ```
    /// use rufous_tree::RbTreeMap;
    ///
    /// let map = RbTreeMap::from_entries((0..5).map(|k| (k, k))).unwrap();
    /// let mut cur = map.cursor();
    /// cur.goto(&2).unwrap();
    /// assert_eq!(cur.remove().unwrap().into_key(), Some(2));
    /// // Seamless continuation: the cursor now stands on 3.
    /// assert_eq!(cur.key().unwrap(), 3);
    /// assert_eq!(map.keys(), vec![0, 1, 3, 4]);
    /// ```
    pub fn remove(&mut self) -> Result<CursorItem<K, V>, Error> {
        let h = self.current()?;
        let mut core = self.core.borrow_mut();
        // The neighbor handle survives deletion: the splice relinks nodes
        // and frees only the removed entry's slot.
        let neighbor = match self.direction {
            Direction::Forward => core.successor(h),
            Direction::Backward => core.predecessor(h),
        };
        let (k, v) = core.delete_handle(h);
        self.stamp = core.generation();
        self.position = match neighbor {
            Some(n) => Position::On(n),
            None => match self.direction {
                Direction::Forward => Position::End,
                Direction::Backward => Position::Start,
            },
        };
        Ok(match self.projection {
            Projection::Keys => CursorItem::Key(k),
            Projection::Values => CursorItem::Value(v),
            Projection::Items => CursorItem::Item(k, v),
            Projection::Nodes => CursorItem::Node(k, v),
        })
    }
}

/// Iterator sugar over [`try_next`](Cursor::try_next): ends at exhaustion
/// or on the first error, which a caller who needs the distinction should
/// observe through `try_next` directly.
impl<K: Clone, V: Clone> Iterator for Cursor<K, V> {
    type Item = CursorItem<K, V>;

    fn next(&mut self) -> Option<Self::Item> {
        self.try_next().ok()
    }
}
