use std::cell::RefCell;
use std::cmp::Ordering;
use std::fmt;
use std::ops::{BitAnd, BitAndAssign, BitOr, BitOrAssign, BitXor, BitXorAssign, Sub, SubAssign};
use std::rc::Rc;
use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::comparator::{self, NaturalOrder, SharedComparator};
use crate::durable;
use crate::error::Error;
use crate::offset::Offset;
use crate::raw::Core;
use crate::rbtree_map::{Cursor, Direction, Projection};

/// Which elements a merge walk keeps.
#[derive(Clone, Copy)]
enum MergeOp {
    Union,
    Intersection,
    Difference,
    SymmetricDifference,
}

impl MergeOp {
    /// `(left-only, right-only, both)` retention flags.
    fn keeps(self) -> (bool, bool, bool) {
        match self {
            Self::Union => (true, true, true),
            Self::Intersection => (false, false, true),
            Self::Difference => (true, false, false),
            Self::SymmetricDifference => (true, true, false),
        }
    }
}

/// An ordered set over the same red-black core as [`RbTreeMap`], storing
/// elements as keys with unit values.
///
/// Beyond membership operations the set offers rank access by offset,
/// [cursors](Cursor) in element projection, and set algebra — union,
/// intersection, difference, and symmetric difference — computed by a
/// single linear merge walk over both ascending element sequences under the
/// left-hand set's comparator. The operator forms (`|`, `&`, `-`, `^`)
/// wrap the fallible methods and panic if the comparator fails mid-walk.
///
/// # Examples
///
/// ```
/// use rufous_tree::RbTreeSet;
///
/// let evens = RbTreeSet::from_elems([0, 2, 4, 6]).unwrap();
/// let small = RbTreeSet::from_elems([0, 1, 2, 3]).unwrap();
///
/// assert_eq!((&evens & &small).elems(), vec![0, 2]);
/// assert_eq!((&evens - &small).elems(), vec![4, 6]);
/// assert_eq!((&evens ^ &small).elems(), vec![1, 3, 4, 6]);
/// ```
///
/// [`RbTreeMap`]: crate::RbTreeMap
pub struct RbTreeSet<T> {
    core: Rc<RefCell<Core<T, ()>>>,
}

impl<T: Ord + 'static> RbTreeSet<T> {
    /// Creates an empty set under the element type's natural order.
    #[must_use]
    pub fn new() -> Self {
        Self::with_comparator(Arc::new(NaturalOrder))
    }

    /// Creates a set from elements under the natural order; repeats
    /// collapse to one occurrence.
    pub fn from_elems(elems: impl IntoIterator<Item = T>) -> Result<Self, Error> {
        Self::from_elems_with(Arc::new(NaturalOrder), elems)
    }
}

impl<T> RbTreeSet<T> {
    /// Creates an empty set ordered by `cmp`.
    #[must_use]
    pub fn with_comparator(cmp: SharedComparator<T>) -> Self {
        Self::from_core(Core::new(cmp))
    }

    /// Creates a set from elements under `cmp`.
    pub fn from_elems_with(
        cmp: SharedComparator<T>,
        elems: impl IntoIterator<Item = T>,
    ) -> Result<Self, Error> {
        let set = Self::with_comparator(cmp);
        {
            let mut core = set.core.borrow_mut();
            for elem in elems {
                core.insert(elem, ())?;
            }
        }
        Ok(set)
    }

    fn from_core(core: Core<T, ()>) -> Self {
        Self {
            core: Rc::new(RefCell::new(core)),
        }
    }

    /// Returns the number of elements.
    #[must_use]
    pub fn len(&self) -> usize {
        self.core.borrow().len()
    }

    /// Returns true if the set holds no elements.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.core.borrow().is_empty()
    }

    /// Inserts `elem`, reporting whether it was newly added. Under a
    /// duplicate-permitting comparator every insert adds.
    pub fn insert(&mut self, elem: T) -> Result<bool, Error> {
        Ok(self.core.borrow_mut().insert(elem, ())?.is_none())
    }

    /// Removes `elem`, or [`Error::KeyNotFound`] if absent.
    pub fn remove(&mut self, elem: &T) -> Result<(), Error> {
        self.core.borrow_mut().delete_key(elem)?;
        Ok(())
    }

    /// True if the comparator finds `elem` in the set.
    pub fn contains(&self, elem: &T) -> Result<bool, Error> {
        Ok(self.core.borrow().find(elem)?.is_some())
    }

    /// Drops every element; the comparator is retained.
    pub fn clear(&mut self) {
        self.core.borrow_mut().clear();
    }

    /// A forward cursor over the elements, positioned before the first.
    #[must_use]
    pub fn cursor(&self) -> Cursor<T, ()> {
        Cursor::new(Rc::clone(&self.core), Projection::Keys, Direction::Forward)
    }

    /// A descending element cursor.
    #[must_use]
    pub fn descending(&self) -> Cursor<T, ()> {
        Cursor::new(Rc::clone(&self.core), Projection::Keys, Direction::Backward)
    }
}

impl<T: Clone> RbTreeSet<T> {
    /// The elements in ascending order, eagerly materialized.
    #[must_use]
    pub fn elems(&self) -> Vec<T> {
        let core = self.core.borrow();
        let mut out = Vec::with_capacity(core.len());
        core.for_each(|elem, ()| out.push(elem.clone()));
        out
    }

    /// The minimum element, or [`Error::EmptyTree`].
    pub fn min(&self) -> Result<T, Error> {
        let core = self.core.borrow();
        let h = core.min_handle().ok_or(Error::EmptyTree)?;
        Ok(core.key_value(h).0.clone())
    }

    /// The maximum element, or [`Error::EmptyTree`].
    pub fn max(&self) -> Result<T, Error> {
        let core = self.core.borrow();
        let h = core.max_handle().ok_or(Error::EmptyTree)?;
        Ok(core.key_value(h).0.clone())
    }

    /// Removes and returns the minimum element.
    pub fn pop(&mut self) -> Result<T, Error> {
        let mut core = self.core.borrow_mut();
        let h = core.min_handle().ok_or(Error::EmptyTree)?;
        let (elem, ()) = core.delete_handle(h);
        Ok(elem)
    }

    /// Zero-based position of `elem` in ascending order.
    pub fn rank_of(&self, elem: &T) -> Result<usize, Error> {
        let core = self.core.borrow();
        let h = core.find(elem)?.ok_or(Error::KeyNotFound)?;
        Ok(core.rank_of_handle(h))
    }

    /// The element at the given offset in ascending order; negative offsets
    /// count from the end.
    pub fn by_offset(&self, offset: impl Into<Offset>) -> Result<T, Error> {
        let offset = offset.into();
        let core = self.core.borrow();
        let rank = offset.normalize(core.len()).ok_or(Error::IndexOutOfRange {
            offset: offset.0,
            len: core.len(),
        })?;
        let h = core.handle_at_rank(rank).expect("normalized rank is within the tree");
        Ok(core.key_value(h).0.clone())
    }

    // ─── Set algebra ────────────────────────────────────────────────────────

    /// One linear walk over both ascending sequences, keeping elements per
    /// `op`. Both sides are read under `self`'s comparator.
    fn merge(&self, other: &Self, op: MergeOp) -> Result<Vec<(T, ())>, Error> {
        let cmp = Arc::clone(self.core.borrow().comparator());
        let (keep_left, keep_right, keep_both) = op.keeps();

        let mut left = self.core.borrow().entries().into_iter().peekable();
        let mut right = other.core.borrow().entries().into_iter().peekable();
        let mut out = Vec::new();

        while let (Some((a, ())), Some((b, ()))) = (left.peek(), right.peek()) {
            match cmp.compare(a, b).ok_or(Error::BadComparator)? {
                Ordering::Less => {
                    let (a, ()) = left.next().expect("peeked element exists");
                    if keep_left {
                        out.push((a, ()));
                    }
                }
                Ordering::Greater => {
                    let (b, ()) = right.next().expect("peeked element exists");
                    if keep_right {
                        out.push((b, ()));
                    }
                }
                Ordering::Equal => {
                    let (a, ()) = left.next().expect("peeked element exists");
                    right.next();
                    if keep_both {
                        out.push((a, ()));
                    }
                }
            }
        }
        if keep_left {
            out.extend(left);
        }
        if keep_right {
            out.extend(right);
        }
        Ok(out)
    }

    fn combine(&self, other: &Self, op: MergeOp) -> Result<Self, Error> {
        let merged = self.merge(other, op)?;
        let cmp = Arc::clone(self.core.borrow().comparator());
        Ok(Self::from_core(Core::from_sorted_entries(cmp, merged)))
    }

    fn combine_update(&mut self, other: &Self, op: MergeOp) -> Result<&mut Self, Error> {
        let merged = self.merge(other, op)?;
        self.core.borrow_mut().rebuild_from_sorted(merged);
        Ok(self)
    }

    /// Elements in either set, as a new set under this set's comparator.
    pub fn union(&self, other: &Self) -> Result<Self, Error> {
        self.combine(other, MergeOp::Union)
    }

    /// Elements in both sets.
    pub fn intersection(&self, other: &Self) -> Result<Self, Error> {
        self.combine(other, MergeOp::Intersection)
    }

    /// Elements in this set but not in `other`.
    pub fn difference(&self, other: &Self) -> Result<Self, Error> {
        self.combine(other, MergeOp::Difference)
    }

    /// Elements in exactly one of the two sets.
    pub fn symmetric_difference(&self, other: &Self) -> Result<Self, Error> {
        self.combine(other, MergeOp::SymmetricDifference)
    }

    /// Replaces this set with its union with `other`, in place.
    pub fn union_update(&mut self, other: &Self) -> Result<&mut Self, Error> {
        self.combine_update(other, MergeOp::Union)
    }

    /// Replaces this set with its intersection with `other`, in place.
    pub fn intersection_update(&mut self, other: &Self) -> Result<&mut Self, Error> {
        self.combine_update(other, MergeOp::Intersection)
    }

    /// Removes every element of `other` from this set, in place.
    pub fn difference_update(&mut self, other: &Self) -> Result<&mut Self, Error> {
        self.combine_update(other, MergeOp::Difference)
    }

    /// Replaces this set with its symmetric difference with `other`.
    pub fn symmetric_difference_update(&mut self, other: &Self) -> Result<&mut Self, Error> {
        self.combine_update(other, MergeOp::SymmetricDifference)
    }

    /// True if every element of this set is in `other`.
    pub fn is_subset(&self, other: &Self) -> Result<bool, Error> {
        Ok(self.merge(other, MergeOp::Difference)?.is_empty())
    }

    /// True if every element of `other` is in this set.
    pub fn is_superset(&self, other: &Self) -> Result<bool, Error> {
        Ok(other.merge(self, MergeOp::Difference)?.is_empty())
    }

    /// True if the two sets share no element.
    pub fn is_disjoint(&self, other: &Self) -> Result<bool, Error> {
        Ok(self.merge(other, MergeOp::Intersection)?.is_empty())
    }
}

impl<T: Ord + 'static> Default for RbTreeSet<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Deep copy: no shared nodes, same comparator instance.
impl<T: Clone> Clone for RbTreeSet<T> {
    fn clone(&self) -> Self {
        Self::from_core(self.core.borrow().clone())
    }
}

/// Two sets are equal when their ascending sequences are pairwise equal
/// under the left set's comparator.
impl<T> PartialEq for RbTreeSet<T> {
    fn eq(&self, other: &Self) -> bool {
        self.core.borrow().entries_eq(&other.core.borrow())
    }
}

impl<T: fmt::Debug> fmt::Debug for RbTreeSet<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let core = self.core.borrow();
        let mut set = f.debug_set();
        core.for_each(|elem, ()| {
            set.entry(elem);
        });
        set.finish()
    }
}

// Operator sugar over the fallible algebra. A failing comparator panics
// here; callers who need the error use the named methods.

impl<T: Clone> BitOr for &RbTreeSet<T> {
    type Output = RbTreeSet<T>;

    fn bitor(self, other: Self) -> RbTreeSet<T> {
        self.union(other).expect("set comparator failed during `|`")
    }
}

impl<T: Clone> BitAnd for &RbTreeSet<T> {
    type Output = RbTreeSet<T>;

    fn bitand(self, other: Self) -> RbTreeSet<T> {
        self.intersection(other).expect("set comparator failed during `&`")
    }
}

impl<T: Clone> Sub for &RbTreeSet<T> {
    type Output = RbTreeSet<T>;

    fn sub(self, other: Self) -> RbTreeSet<T> {
        self.difference(other).expect("set comparator failed during `-`")
    }
}

impl<T: Clone> BitXor for &RbTreeSet<T> {
    type Output = RbTreeSet<T>;

    fn bitxor(self, other: Self) -> RbTreeSet<T> {
        self.symmetric_difference(other).expect("set comparator failed during `^`")
    }
}

impl<T: Clone> BitOrAssign<&Self> for RbTreeSet<T> {
    fn bitor_assign(&mut self, other: &Self) {
        self.union_update(other).expect("set comparator failed during `|=`");
    }
}

impl<T: Clone> BitAndAssign<&Self> for RbTreeSet<T> {
    fn bitand_assign(&mut self, other: &Self) {
        self.intersection_update(other).expect("set comparator failed during `&=`");
    }
}

impl<T: Clone> SubAssign<&Self> for RbTreeSet<T> {
    fn sub_assign(&mut self, other: &Self) {
        self.difference_update(other).expect("set comparator failed during `-=`");
    }
}

impl<T: Clone> BitXorAssign<&Self> for RbTreeSet<T> {
    fn bitxor_assign(&mut self, other: &Self) {
        self.symmetric_difference_update(other).expect("set comparator failed during `^=`");
    }
}

impl<T: Serialize + Clone> RbTreeSet<T> {
    /// Captures the ascending element sequence plus the comparator's name
    /// as a durable byte form.
    pub fn to_durable_form(&self) -> Result<Vec<u8>, Error> {
        durable::encode_set(&self.core.borrow())
    }
}

impl<T: DeserializeOwned + Ord + 'static> RbTreeSet<T> {
    /// Rebuilds a set from [`to_durable_form`](RbTreeSet::to_durable_form)
    /// bytes, resolving the recorded comparator by name exactly as
    /// [`RbTreeMap::from_durable_form`](crate::RbTreeMap::from_durable_form)
    /// does.
    pub fn from_durable_form(bytes: &[u8]) -> Result<Self, Error> {
        let (name, elems) = durable::decode_set::<T>(bytes)?;
        let Some(cmp) = comparator::resolve_or_builtin::<T>(&name) else {
            return Err(Error::UnresolvableComparator(name));
        };
        let entries = elems.into_iter().map(|elem| (elem, ())).collect();
        Ok(Self::from_core(durable::rebuild(cmp, entries)?))
    }
}

impl<T: DeserializeOwned> RbTreeSet<T> {
    /// Rebuilds a set from durable bytes with an explicitly supplied
    /// comparator, whose name must match the recorded one.
    pub fn from_durable_form_with(bytes: &[u8], cmp: SharedComparator<T>) -> Result<Self, Error> {
        let (name, elems) = durable::decode_set::<T>(bytes)?;
        if name != cmp.name() {
            return Err(Error::UnresolvableComparator(name));
        }
        let entries = elems.into_iter().map(|elem| (elem, ())).collect();
        Ok(Self::from_core(durable::rebuild(cmp, entries)?))
    }
}
