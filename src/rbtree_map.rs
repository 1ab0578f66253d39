use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::comparator::{self, NaturalOrder, SharedComparator};
use crate::durable;
use crate::error::Error;
use crate::offset::Offset;
use crate::raw::Core;

mod cursor;

pub use cursor::{Cursor, CursorItem, Direction, Projection};

/// An ordered map over a red-black tree with subtree-size augmentation.
///
/// Entries are kept in the order established by a [`Comparator`] injected at
/// construction — [`new`](RbTreeMap::new) uses the key type's natural order,
/// [`with_comparator`](RbTreeMap::with_comparator) accepts any total order,
/// including orders that never report equality and therefore admit duplicate
/// keys. On top of the dictionary operations the map offers rank access by
/// positive or negative offset, half-open range slicing with an optional
/// stride, range deletion, and positional [cursors](Cursor) that keep the
/// tree alive for as long as they exist.
///
/// Point operations are O(log n); slicing, range deletion, and serialization
/// are O(n). All comparator-driven operations are fallible because the
/// comparator itself is: a malformed comparator surfaces
/// [`Error::BadComparator`] at its first comparison, not at construction.
///
/// Lookups and traversals hand out owned clones of keys and values, so the
/// useful bounds are `K: Clone` (and usually `V: Clone`). [`Clone`] on the
/// map itself is a deep copy: the trees share nothing afterwards except the
/// comparator instance.
///
/// The map is single-threaded by construction. Cursors share ownership of
/// the tree, and a structural mutation made behind an open cursor's back is
/// detected fail-fast on the cursor's next positional call.
///
/// # Examples
///
/// ```
/// use rufous_tree::RbTreeMap;
///
/// let mut reviews = RbTreeMap::new();
/// reviews.insert("Office Space", 5).unwrap();
/// reviews.insert("Pulp Fiction", 5).unwrap();
/// reviews.insert("The Blues Brothers", 4).unwrap();
///
/// assert_eq!(reviews.len(), 3);
/// assert_eq!(reviews.min().unwrap(), "Office Space");
/// assert_eq!(reviews.by_offset(-1).unwrap(), "The Blues Brothers");
///
/// // Ascending key order, always.
/// let keys = reviews.keys();
/// assert_eq!(keys, vec!["Office Space", "Pulp Fiction", "The Blues Brothers"]);
/// ```
///
/// [`Comparator`]: crate::Comparator
/// [`Error::BadComparator`]: crate::Error::BadComparator
pub struct RbTreeMap<K, V> {
    core: Rc<RefCell<Core<K, V>>>,
}

impl<K: Ord + 'static, V> RbTreeMap<K, V> {
    /// Creates an empty map ordered by the key type's natural order.
    #[must_use]
    pub fn new() -> Self {
        Self::with_comparator(Arc::new(NaturalOrder))
    }

    /// Creates a map from a sequence of key/value pairs under the natural
    /// order. Later pairs overwrite earlier ones with an equal key.
    ///
    /// # Examples
    ///
    /// ```
    /// use rufous_tree::RbTreeMap;
    ///
    /// let map = RbTreeMap::from_entries([('a', 1), ('c', 3), ('b', 2)]).unwrap();
    /// assert_eq!(map.keys(), vec!['a', 'b', 'c']);
    /// ```
    pub fn from_entries(entries: impl IntoIterator<Item = (K, V)>) -> Result<Self, Error> {
        Self::from_entries_with(Arc::new(NaturalOrder), entries)
    }
}

impl<K: Ord + 'static> RbTreeMap<K, K> {
    /// Creates a map from variable-length rows, requiring every row to be
    /// exactly a `[key, value]` pair; anything else is
    /// [`Error::MalformedInput`].
    ///
    /// This is the typed rendition of constructing from a sequence of
    /// loosely shaped tuples, where key and value necessarily share a type.
    pub fn from_rows(rows: impl IntoIterator<Item = Vec<K>>) -> Result<Self, Error> {
        let map = Self::new();
        {
            let mut core = map.core.borrow_mut();
            for mut row in rows {
                if row.len() != 2 {
                    return Err(Error::MalformedInput);
                }
                let value = row.pop().expect("row length checked above");
                let key = row.pop().expect("row length checked above");
                core.insert(key, value)?;
            }
        }
        Ok(map)
    }
}

impl<K, V> RbTreeMap<K, V> {
    /// Creates an empty map ordered by `cmp`.
    ///
    /// The comparator is validated lazily: if it cannot produce an ordering,
    /// the first operation that actually compares two keys fails with
    /// [`Error::BadComparator`].
    #[must_use]
    pub fn with_comparator(cmp: SharedComparator<K>) -> Self {
        Self::from_core(Core::new(cmp))
    }

    /// Creates a map from key/value pairs under `cmp`.
    pub fn from_entries_with(
        cmp: SharedComparator<K>,
        entries: impl IntoIterator<Item = (K, V)>,
    ) -> Result<Self, Error> {
        let map = Self::with_comparator(cmp);
        {
            let mut core = map.core.borrow_mut();
            for (key, value) in entries {
                core.insert(key, value)?;
            }
        }
        Ok(map)
    }

    fn from_core(core: Core<K, V>) -> Self {
        Self {
            core: Rc::new(RefCell::new(core)),
        }
    }

    /// Returns the number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.core.borrow().len()
    }

    /// Returns true if the map holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.core.borrow().is_empty()
    }

    /// Inserts `key`/`value`. If the comparator reports an equal key already
    /// present (and permits no duplicates), the value is replaced in place
    /// and returned; length is unchanged and open cursors stay valid.
    ///
    /// # Examples
    ///
    /// ```
    /// use rufous_tree::RbTreeMap;
    ///
    /// let mut map = RbTreeMap::new();
    /// assert_eq!(map.insert(1, "a").unwrap(), None);
    /// assert_eq!(map.insert(1, "b").unwrap(), Some("a"));
    /// assert_eq!(map.len(), 1);
    /// ```
    pub fn insert(&mut self, key: K, value: V) -> Result<Option<V>, Error> {
        self.core.borrow_mut().insert(key, value)
    }

    /// Removes `key`, returning its value, or [`Error::KeyNotFound`].
    pub fn remove(&mut self, key: &K) -> Result<V, Error> {
        let (_, value) = self.core.borrow_mut().delete_key(key)?;
        Ok(value)
    }

    /// True if the comparator finds `key` in the map.
    pub fn contains(&self, key: &K) -> Result<bool, Error> {
        Ok(self.core.borrow().find(key)?.is_some())
    }

    /// Drops every entry; the comparator is retained.
    pub fn clear(&mut self) {
        self.core.borrow_mut().clear();
    }

    /// Removes and returns the value of the minimum-key entry.
    ///
    /// # Examples
    ///
    /// ```
    /// use rufous_tree::RbTreeMap;
    ///
    /// let mut map = RbTreeMap::from_entries((0..10).map(|k| (k, k + 1))).unwrap();
    /// assert_eq!(map.pop().unwrap(), 1);
    /// assert_eq!(map.pop().unwrap(), 2);
    /// assert_eq!(map.len(), 8);
    /// ```
    pub fn pop(&mut self) -> Result<V, Error> {
        let mut core = self.core.borrow_mut();
        let h = core.min_handle().ok_or(Error::EmptyTree)?;
        let (_, value) = core.delete_handle(h);
        Ok(value)
    }

    /// Removes the key range `[start, stop)` in place. Matching nothing is a
    /// no-op, not an error. An omitted bound extends to that end of the map.
    pub fn delete_range(&mut self, start: Option<&K>, stop: Option<&K>) -> Result<(), Error> {
        self.core.borrow_mut().delete_range(start, stop)
    }

    /// A forward cursor projecting keys, positioned before the first entry.
    #[must_use]
    pub fn cursor(&self) -> Cursor<K, V> {
        Cursor::new(Rc::clone(&self.core), Projection::Keys, Direction::Forward)
    }

    /// A forward cursor projecting values.
    #[must_use]
    pub fn cursor_values(&self) -> Cursor<K, V> {
        Cursor::new(Rc::clone(&self.core), Projection::Values, Direction::Forward)
    }

    /// A forward cursor projecting `(key, value)` items.
    #[must_use]
    pub fn cursor_items(&self) -> Cursor<K, V> {
        Cursor::new(Rc::clone(&self.core), Projection::Items, Direction::Forward)
    }

    /// A forward cursor in node projection, which also answers the other
    /// projections on demand through [`Cursor::get`].
    #[must_use]
    pub fn cursor_nodes(&self) -> Cursor<K, V> {
        Cursor::new(Rc::clone(&self.core), Projection::Nodes, Direction::Forward)
    }

    /// A descending key cursor: the reverse-traversal entry point,
    /// independent of any other cursor's direction state.
    #[must_use]
    pub fn descending(&self) -> Cursor<K, V> {
        Cursor::new(Rc::clone(&self.core), Projection::Keys, Direction::Backward)
    }
}

impl<K: Clone, V> RbTreeMap<K, V> {
    /// The minimum key, or [`Error::EmptyTree`].
    pub fn min(&self) -> Result<K, Error> {
        let core = self.core.borrow();
        let h = core.min_handle().ok_or(Error::EmptyTree)?;
        Ok(core.key_value(h).0.clone())
    }

    /// The maximum key, or [`Error::EmptyTree`].
    pub fn max(&self) -> Result<K, Error> {
        let core = self.core.borrow();
        let h = core.max_handle().ok_or(Error::EmptyTree)?;
        Ok(core.key_value(h).0.clone())
    }

    /// The keys in ascending order, eagerly materialized.
    #[must_use]
    pub fn keys(&self) -> Vec<K> {
        let core = self.core.borrow();
        let mut out = Vec::with_capacity(core.len());
        core.for_each(|k, _| out.push(k.clone()));
        out
    }

    /// The keys in descending order.
    #[must_use]
    pub fn descending_keys(&self) -> Vec<K> {
        let mut keys = self.keys();
        keys.reverse();
        keys
    }

    /// Zero-based position of `key` in ascending order.
    pub fn rank_of(&self, key: &K) -> Result<usize, Error> {
        let core = self.core.borrow();
        let h = core.find(key)?.ok_or(Error::KeyNotFound)?;
        Ok(core.rank_of_handle(h))
    }

    /// The key at the given offset in ascending order; negative offsets
    /// count from the end (`-1` is the maximum key).
    ///
    /// # Examples
    ///
    /// ```
    /// use rufous_tree::RbTreeMap;
    ///
    /// let map = RbTreeMap::from_entries((0..10).map(|k| (k, k))).unwrap();
    /// assert_eq!(map.by_offset(2).unwrap(), 2);
    /// assert_eq!(map.by_offset(-2).unwrap(), 8);
    /// ```
    pub fn by_offset(&self, offset: impl Into<Offset>) -> Result<K, Error> {
        let offset = offset.into();
        let core = self.core.borrow();
        let rank = offset.normalize(core.len()).ok_or(Error::IndexOutOfRange {
            offset: offset.0,
            len: core.len(),
        })?;
        let h = core.handle_at_rank(rank).expect("normalized rank is within the tree");
        Ok(core.key_value(h).0.clone())
    }
}

impl<K: Clone, V: Clone> RbTreeMap<K, V> {
    /// The value for `key`, or [`Error::KeyNotFound`].
    pub fn get(&self, key: &K) -> Result<V, Error> {
        let core = self.core.borrow();
        let h = core.find(key)?.ok_or(Error::KeyNotFound)?;
        Ok(core.key_value(h).1.clone())
    }

    /// The values in ascending key order.
    #[must_use]
    pub fn values(&self) -> Vec<V> {
        let core = self.core.borrow();
        let mut out = Vec::with_capacity(core.len());
        core.for_each(|_, v| out.push(v.clone()));
        out
    }

    /// The `(key, value)` items in ascending key order.
    #[must_use]
    pub fn items(&self) -> Vec<(K, V)> {
        self.core.borrow().entries()
    }

    /// Returns the existing value for `key`, or inserts `default` and
    /// returns it.
    pub fn setdefault(&mut self, key: K, default: V) -> Result<V, Error> {
        let mut core = self.core.borrow_mut();
        if let Some(h) = core.find(&key)? {
            Ok(core.key_value(h).1.clone())
        } else {
            core.insert(key, default.clone())?;
            Ok(default)
        }
    }

    /// Inserts or overwrites every entry of `other`, returning the mutated
    /// map for chaining.
    pub fn update(&mut self, other: &Self) -> Result<&mut Self, Error> {
        let entries = other.core.borrow().entries();
        {
            let mut core = self.core.borrow_mut();
            for (key, value) in entries {
                core.insert(key, value)?;
            }
        }
        Ok(self)
    }

    /// Extracts `[start, stop)` into a new, fully independent map sharing
    /// this map's comparator. With a `step`, only every `step`-th matching
    /// entry is kept (0-indexed within the match). A negative step is
    /// normalized to its absolute value and selection stays ascending —
    /// historical behavior, kept deliberately. A step of zero is
    /// [`Error::MalformedInput`]. Matching nothing yields an empty map.
    ///
    /// # Examples
    ///
    /// ```
    /// use rufous_tree::RbTreeMap;
    ///
    /// let map = RbTreeMap::from_entries((0..10).map(|k| (k, k))).unwrap();
    /// let sliced = map.slice(Some(&0), Some(&8), Some(2)).unwrap();
    /// assert_eq!(sliced.keys(), vec![0, 2, 4, 6]);
    ///
    /// let empty = RbTreeMap::<i32, i32>::new();
    /// assert!(empty.slice(Some(&0), Some(&100), None).unwrap().is_empty());
    /// ```
    pub fn slice(
        &self,
        start: Option<&K>,
        stop: Option<&K>,
        step: Option<isize>,
    ) -> Result<Self, Error> {
        let step = match step {
            None => 1,
            Some(0) => return Err(Error::MalformedInput),
            Some(n) => n.unsigned_abs(),
        };
        let core = self.core.borrow().slice(start, stop, step)?;
        Ok(Self::from_core(core))
    }
}

impl<K: Ord + 'static, V> Default for RbTreeMap<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

/// Deep copy: no shared nodes, same comparator instance. Mutating either
/// map never affects the other.
impl<K: Clone, V: Clone> Clone for RbTreeMap<K, V> {
    fn clone(&self) -> Self {
        Self::from_core(self.core.borrow().clone())
    }
}

/// Equality is sequence equality: same length, keys pairwise equal under
/// this map's comparator, values pairwise equal under `==`.
impl<K, V: PartialEq> PartialEq for RbTreeMap<K, V> {
    fn eq(&self, other: &Self) -> bool {
        self.core.borrow().entries_eq(&other.core.borrow())
    }
}

impl<K: fmt::Debug, V: fmt::Debug> fmt::Debug for RbTreeMap<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let core = self.core.borrow();
        let mut map = f.debug_map();
        core.for_each(|k, v| {
            map.entry(k, v);
        });
        map.finish()
    }
}

impl<K: Serialize + Clone, V: Serialize + Clone> RbTreeMap<K, V> {
    /// Captures the ascending entry sequence plus the comparator's name as a
    /// durable byte form.
    pub fn to_durable_form(&self) -> Result<Vec<u8>, Error> {
        durable::encode_map(&self.core.borrow())
    }
}

impl<K: DeserializeOwned + Ord + 'static, V: DeserializeOwned> RbTreeMap<K, V> {
    /// Rebuilds a map from [`to_durable_form`](RbTreeMap::to_durable_form)
    /// bytes, resolving the recorded comparator by name: the built-in orders
    /// resolve directly, anything else must have been registered in this
    /// process via [`register_comparator`](crate::register_comparator)
    /// beforehand, or the load fails with
    /// [`Error::UnresolvableComparator`].
    pub fn from_durable_form(bytes: &[u8]) -> Result<Self, Error> {
        let (name, entries) = durable::decode_map::<K, V>(bytes)?;
        let Some(cmp) = comparator::resolve_or_builtin::<K>(&name) else {
            return Err(Error::UnresolvableComparator(name));
        };
        Ok(Self::from_core(durable::rebuild(cmp, entries)?))
    }
}

impl<K: DeserializeOwned, V: DeserializeOwned> RbTreeMap<K, V> {
    /// Like [`from_durable_form`](RbTreeMap::from_durable_form), but binds
    /// the supplied comparator instead of consulting the registry. The
    /// comparator's name must match the one recorded in the bytes.
    pub fn from_durable_form_with(bytes: &[u8], cmp: SharedComparator<K>) -> Result<Self, Error> {
        let (name, entries) = durable::decode_map::<K, V>(bytes)?;
        if name != cmp.name() {
            return Err(Error::UnresolvableComparator(name));
        }
        Ok(Self::from_core(durable::rebuild(cmp, entries)?))
    }
}
