/// A position in the sorted order of a map or set.
///
/// Non-negative offsets count from the start (`Offset(0)` is the minimum
/// key); negative offsets count from the end (`Offset(-1)` is the maximum).
/// Plain integers convert via `From`, so rank accessors accept either form.
///
/// # Examples
///
/// ```
/// use rufous_tree::{Offset, RbTreeMap};
///
/// let map = RbTreeMap::from_entries([(10, "a"), (20, "b"), (30, "c")]).unwrap();
/// assert_eq!(map.by_offset(0).unwrap(), 10);
/// assert_eq!(map.by_offset(Offset(-1)).unwrap(), 30);
/// ```
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Offset(pub isize);

impl Offset {
    /// Normalizes to a non-negative rank within `len`, or `None` when out of
    /// range.
    pub(crate) fn normalize(self, len: usize) -> Option<usize> {
        let len = isize::try_from(len).ok()?;
        let rank = if self.0 < 0 { self.0 + len } else { self.0 };
        (0..len).contains(&rank).then(|| rank as usize)
    }
}

impl From<isize> for Offset {
    fn from(n: isize) -> Self {
        Offset(n)
    }
}

impl From<i32> for Offset {
    fn from(n: i32) -> Self {
        Offset(n as isize)
    }
}
