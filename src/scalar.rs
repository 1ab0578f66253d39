use serde::{Deserialize, Serialize};

/// A closed, mixed-type set element with a total order across variants.
///
/// The original container compared runtime-mixed element types through a
/// generic fallback ordering; a statically typed tree cannot. `Scalar` makes
/// that choice explicit instead: the supported shapes are a closed enum, and
/// the derived `Ord` orders by variant first (`Int` before `Text`), then by
/// value within a variant.
///
/// # Examples
///
/// ```
/// use rufous_tree::{RbTreeSet, Scalar};
///
/// let a: RbTreeSet<Scalar> = RbTreeSet::from_elems((0..10).map(Scalar::from)).unwrap();
/// let b = RbTreeSet::from_elems([
///     Scalar::from("a"),
///     Scalar::from("b"),
///     Scalar::from(3),
///     Scalar::from(4),
/// ])
/// .unwrap();
///
/// let both = a.intersection(&b).unwrap();
/// assert_eq!(both.elems(), vec![Scalar::Int(3), Scalar::Int(4)]);
/// ```
#[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
pub enum Scalar {
    Int(i64),
    Text(String),
}

impl From<i64> for Scalar {
    fn from(v: i64) -> Self {
        Scalar::Int(v)
    }
}

impl From<i32> for Scalar {
    fn from(v: i32) -> Self {
        Scalar::Int(i64::from(v))
    }
}

impl From<&str> for Scalar {
    fn from(v: &str) -> Self {
        Scalar::Text(v.to_owned())
    }
}

impl From<String> for Scalar {
    fn from(v: String) -> Self {
        Scalar::Text(v)
    }
}
