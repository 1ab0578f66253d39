//! Pluggable total-order comparators and the process-wide registry that lets
//! durable forms rebind them by name.

use std::any::{Any, TypeId};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, OnceLock};

/// A shared, dynamically dispatched comparator handle.
///
/// Trees hold their comparator through this alias so that deep copies, range
/// slices, and set-algebra results all share one comparator instance.
pub type SharedComparator<K> = Arc<dyn Comparator<K>>;

/// A total order over keys of type `K`, injected at tree construction.
///
/// `compare` returns `None` when the comparator cannot resolve the pair to an
/// ordering; the tree surfaces that as [`Error::BadComparator`] at the first
/// comparison performed, never at construction time.
///
/// A comparator that never reports [`Ordering::Equal`] turns the tree into a
/// multiset: structurally equal keys accumulate as distinct entries. Such
/// comparators should report it through [`allows_duplicates`], which the tree
/// reads once at construction to derive its duplicate-key mode.
///
/// `compare` must be a pure function of its two arguments; a comparator whose
/// answers shift mid-traversal breaks the search invariant in unspecified
/// (but memory-safe) ways.
///
/// [`Error::BadComparator`]: crate::Error::BadComparator
/// [`allows_duplicates`]: Comparator::allows_duplicates
pub trait Comparator<K: ?Sized>: Send + Sync {
    /// Orders `a` relative to `b`, or `None` if no ordering can be produced.
    fn compare(&self, a: &K, b: &K) -> Option<Ordering>;

    /// True if this comparator never reports equality, permitting duplicate
    /// keys.
    fn allows_duplicates(&self) -> bool {
        false
    }

    /// The identifier stored in durable forms. Deserialization resolves it
    /// via the built-in names or [`resolve_comparator`].
    fn name(&self) -> &str;
}

/// The natural `Ord`-derived ordering. Durable-form name: `"natural"`.
#[derive(Clone, Copy, Debug, Default)]
pub struct NaturalOrder;

impl NaturalOrder {
    pub(crate) const NAME: &'static str = "natural";
}

impl<K: Ord> Comparator<K> for NaturalOrder {
    fn compare(&self, a: &K, b: &K) -> Option<Ordering> {
        Some(a.cmp(b))
    }

    fn name(&self) -> &str {
        Self::NAME
    }
}

/// The reversed natural ordering. Durable-form name: `"reverse"`.
#[derive(Clone, Copy, Debug, Default)]
pub struct ReverseOrder;

impl ReverseOrder {
    pub(crate) const NAME: &'static str = "reverse";
}

impl<K: Ord> Comparator<K> for ReverseOrder {
    fn compare(&self, a: &K, b: &K) -> Option<Ordering> {
        Some(a.cmp(b).reverse())
    }

    fn name(&self) -> &str {
        Self::NAME
    }
}

/// A comparator built from a closure, carrying the name used in durable
/// forms.
///
/// # Examples
///
/// ```
/// use std::cmp::Ordering;
/// use rufous_tree::{FnComparator, RbTreeMap};
///
/// // Orders case-insensitively.
/// let folded = FnComparator::new("folded", |a: &String, b: &String| {
///     Some(a.to_lowercase().cmp(&b.to_lowercase()))
/// });
///
/// let mut map = RbTreeMap::with_comparator(std::sync::Arc::new(folded));
/// map.insert("Ant".to_string(), 1).unwrap();
/// assert_eq!(map.get(&"ANT".to_string()).unwrap(), 1);
/// ```
pub struct FnComparator<F> {
    name: String,
    duplicates: bool,
    f: F,
}

impl<F> FnComparator<F> {
    /// Wraps `f` under the given durable-form name.
    pub fn new(name: impl Into<String>, f: F) -> Self {
        Self {
            name: name.into(),
            duplicates: false,
            f,
        }
    }

    /// Marks this comparator as never reporting equality, enabling
    /// duplicate-key (multiset) behavior in trees constructed with it.
    #[must_use]
    pub fn allowing_duplicates(mut self) -> Self {
        self.duplicates = true;
        self
    }
}

impl<K, F> Comparator<K> for FnComparator<F>
where
    F: Fn(&K, &K) -> Option<Ordering> + Send + Sync,
{
    fn compare(&self, a: &K, b: &K) -> Option<Ordering> {
        (self.f)(a, b)
    }

    fn allows_duplicates(&self) -> bool {
        self.duplicates
    }

    fn name(&self) -> &str {
        &self.name
    }
}

// The registry stores Box<dyn Any> holding a SharedComparator<K>, keyed by
// the key type and the comparator name. One flat map serves every key type.
type Registry = Mutex<HashMap<(TypeId, String), Box<dyn Any + Send + Sync>>>;

fn registry() -> &'static Registry {
    static REGISTRY: OnceLock<Registry> = OnceLock::new();
    REGISTRY.get_or_init(|| Mutex::new(HashMap::new()))
}

/// Registers a comparator for key type `K` under its own name, making
/// durable forms that reference it loadable in this process.
///
/// Loading must come after registration; that lifecycle is the caller's
/// contract, mirroring the original requirement that a custom ordering be
/// importable where deserialization happens. Registering a second comparator
/// under the same name replaces the first.
pub fn register_comparator<K: 'static>(cmp: SharedComparator<K>) {
    let key = (TypeId::of::<K>(), cmp.name().to_owned());
    let mut map = registry().lock().expect("comparator registry poisoned");
    map.insert(key, Box::new(cmp));
}

/// Looks up a previously registered comparator for key type `K` by name.
#[must_use]
pub fn resolve_comparator<K: 'static>(name: &str) -> Option<SharedComparator<K>> {
    let key = (TypeId::of::<K>(), name.to_owned());
    let map = registry().lock().expect("comparator registry poisoned");
    map.get(&key)?.downcast_ref::<SharedComparator<K>>().cloned()
}

/// Resolution used by durable-form loading: built-in names first, then the
/// process registry.
pub(crate) fn resolve_or_builtin<K: Ord + 'static>(name: &str) -> Option<SharedComparator<K>> {
    match name {
        NaturalOrder::NAME => Some(Arc::new(NaturalOrder)),
        ReverseOrder::NAME => Some(Arc::new(ReverseOrder)),
        _ => resolve_comparator::<K>(name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn natural_and_reverse_disagree() {
        let n = NaturalOrder;
        let r = ReverseOrder;
        assert_eq!(Comparator::<i32>::compare(&n, &1, &2), Some(Ordering::Less));
        assert_eq!(Comparator::<i32>::compare(&r, &1, &2), Some(Ordering::Greater));
        assert_eq!(Comparator::<i32>::compare(&r, &2, &2), Some(Ordering::Equal));
    }

    #[test]
    fn fn_comparator_reports_duplicates_flag() {
        let even_odd = FnComparator::new("tie-right", |a: &i32, b: &i32| match a.cmp(b) {
            Ordering::Equal => Some(Ordering::Greater),
            other => Some(other),
        })
        .allowing_duplicates();
        assert!(Comparator::<i32>::allows_duplicates(&even_odd));
        assert_eq!(even_odd.compare(&3, &3), Some(Ordering::Greater));
    }

    #[test]
    fn registry_round_trip() {
        let cmp: SharedComparator<u8> =
            Arc::new(FnComparator::new("registry-round-trip", |a: &u8, b: &u8| Some(a.cmp(b))));
        register_comparator(Arc::clone(&cmp));

        let found = resolve_comparator::<u8>("registry-round-trip").expect("registered comparator resolves");
        assert_eq!(found.name(), "registry-round-trip");

        // Same name, different key type: not visible.
        assert!(resolve_comparator::<u16>("registry-round-trip").is_none());
    }

    #[test]
    fn builtins_resolve_without_registration() {
        assert!(resolve_or_builtin::<i64>("natural").is_some());
        assert!(resolve_or_builtin::<i64>("reverse").is_some());
        assert!(resolve_or_builtin::<i64>("no-such-order").is_none());
    }
}
