use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::sync::Arc;

use pretty_assertions::assert_eq;
use proptest::prelude::*;
use rand::seq::SliceRandom;
use rufous_tree::{
    Direction, Error, FnComparator, Projection, RbTreeMap, ReverseOrder, SharedComparator,
    register_comparator,
};

/// The number of operations to perform in each proptest case.
const TEST_SIZE: usize = 4_000;

/// Generates keys in a range small enough to force collisions.
fn key_strategy() -> impl Strategy<Value = i64> {
    -2_000i64..2_000i64
}

fn value_strategy() -> impl Strategy<Value = i64> {
    any::<i64>()
}

// ─── Operations enum for driving randomized tests ────────────────────────────

#[derive(Debug, Clone)]
enum MapOp {
    Insert(i64, i64),
    Remove(i64),
    Get(i64),
    Contains(i64),
    Min,
    Max,
    Pop,
    RankOf(i64),
    ByOffset(isize),
}

fn map_op_strategy() -> impl Strategy<Value = MapOp> {
    prop_oneof![
        5 => (key_strategy(), value_strategy()).prop_map(|(k, v)| MapOp::Insert(k, v)),
        3 => key_strategy().prop_map(MapOp::Remove),
        2 => key_strategy().prop_map(MapOp::Get),
        1 => key_strategy().prop_map(MapOp::Contains),
        1 => Just(MapOp::Min),
        1 => Just(MapOp::Max),
        1 => Just(MapOp::Pop),
        1 => key_strategy().prop_map(MapOp::RankOf),
        1 => (-4_200isize..4_200).prop_map(MapOp::ByOffset),
    ]
}

// ─── Randomized comparison against BTreeMap ──────────────────────────────────

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    /// Replays a random operation sequence on both RbTreeMap and BTreeMap
    /// and asserts identical observable results at every step.
    #[test]
    fn map_ops_match_btreemap(ops in proptest::collection::vec(map_op_strategy(), TEST_SIZE)) {
        let mut map: RbTreeMap<i64, i64> = RbTreeMap::new();
        let mut model: BTreeMap<i64, i64> = BTreeMap::new();

        for op in &ops {
            match op {
                MapOp::Insert(k, v) => {
                    prop_assert_eq!(map.insert(*k, *v).unwrap(), model.insert(*k, *v));
                }
                MapOp::Remove(k) => match map.remove(k) {
                    Ok(v) => prop_assert_eq!(model.remove(k), Some(v)),
                    Err(Error::KeyNotFound) => prop_assert!(!model.contains_key(k)),
                    Err(e) => prop_assert!(false, "unexpected error: {e}"),
                },
                MapOp::Get(k) => {
                    prop_assert_eq!(map.get(k).ok(), model.get(k).copied());
                }
                MapOp::Contains(k) => {
                    prop_assert_eq!(map.contains(k).unwrap(), model.contains_key(k));
                }
                MapOp::Min => {
                    prop_assert_eq!(map.min().ok(), model.keys().next().copied());
                }
                MapOp::Max => {
                    prop_assert_eq!(map.max().ok(), model.keys().next_back().copied());
                }
                MapOp::Pop => match map.pop() {
                    Ok(v) => {
                        let (_, mv) = model.pop_first().unwrap();
                        prop_assert_eq!(v, mv);
                    }
                    Err(Error::EmptyTree) => prop_assert!(model.is_empty()),
                    Err(e) => prop_assert!(false, "unexpected error: {e}"),
                },
                MapOp::RankOf(k) => match map.rank_of(k) {
                    Ok(rank) => {
                        prop_assert_eq!(Some(rank), model.keys().position(|mk| mk == k));
                    }
                    Err(Error::KeyNotFound) => prop_assert!(!model.contains_key(k)),
                    Err(e) => prop_assert!(false, "unexpected error: {e}"),
                },
                MapOp::ByOffset(off) => {
                    let keys: Vec<i64> = model.keys().copied().collect();
                    let expected = if *off < 0 {
                        keys.len().checked_sub(off.unsigned_abs()).map(|i| keys[i])
                    } else {
                        keys.get(usize::try_from(*off).unwrap()).copied()
                    };
                    prop_assert_eq!(map.by_offset(*off).ok(), expected);
                }
            }
            prop_assert_eq!(map.len(), model.len());
            prop_assert_eq!(map.is_empty(), model.is_empty());
        }
        let items: Vec<(i64, i64)> = model.into_iter().collect();
        prop_assert_eq!(map.items(), items);
    }

    /// Slicing matches filtering the model's sorted keys by the same
    /// half-open range and stride.
    #[test]
    fn slice_matches_filtered_model(
        entries in proptest::collection::vec((key_strategy(), value_strategy()), 0..500),
        start in proptest::option::of(key_strategy()),
        stop in proptest::option::of(key_strategy()),
        step in 1isize..5,
    ) {
        let map = RbTreeMap::from_entries(entries.clone()).unwrap();
        let model: BTreeMap<i64, i64> = entries.into_iter().collect();

        let expected: Vec<(i64, i64)> = model
            .iter()
            .filter(|(k, _)| start.is_none_or(|s| **k >= s))
            .filter(|(k, _)| stop.is_none_or(|s| **k < s))
            .enumerate()
            .filter(|(i, _)| i % step.unsigned_abs() == 0)
            .map(|(_, (k, v))| (*k, *v))
            .collect();

        let sliced = map.slice(start.as_ref(), stop.as_ref(), Some(step)).unwrap();
        prop_assert_eq!(sliced.items(), expected);

        // A negative step selects the same ascending entries.
        let negated = map.slice(start.as_ref(), stop.as_ref(), Some(-step)).unwrap();
        prop_assert_eq!(negated.items(), sliced.items());
    }

    /// Deleting a range leaves exactly the complement of slicing it.
    #[test]
    fn delete_range_is_slice_complement(
        entries in proptest::collection::vec((key_strategy(), value_strategy()), 0..500),
        start in proptest::option::of(key_strategy()),
        stop in proptest::option::of(key_strategy()),
    ) {
        let mut map = RbTreeMap::from_entries(entries).unwrap();
        let inside = map.slice(start.as_ref(), stop.as_ref(), None).unwrap();
        let before = map.len();

        map.delete_range(start.as_ref(), stop.as_ref()).unwrap();
        prop_assert_eq!(map.len(), before - inside.len());
        for key in inside.keys() {
            prop_assert!(!map.contains(&key).unwrap());
        }
    }
}

// ─── Construction and dictionary basics ──────────────────────────────────────

#[test]
fn empty_map_reports_empty_everywhere() {
    let map: RbTreeMap<i64, i64> = RbTreeMap::new();
    assert_eq!(map.len(), 0);
    assert!(map.is_empty());
    assert!(matches!(map.min(), Err(Error::EmptyTree)));
    assert!(matches!(map.max(), Err(Error::EmptyTree)));
    assert!(matches!(map.get(&1), Err(Error::KeyNotFound)));
    assert_eq!(map.keys(), Vec::<i64>::new());
}

#[test]
fn insert_replaces_value_in_place() {
    let mut map = RbTreeMap::new();
    assert_eq!(map.insert("k", 1).unwrap(), None);
    assert_eq!(map.insert("k", 2).unwrap(), Some(1));
    assert_eq!(map.len(), 1);
    assert_eq!(map.get(&"k").unwrap(), 2);
}

#[test]
fn shuffled_insertion_enumerates_sorted() {
    let mut keys: Vec<i64> = (0..500).collect();
    keys.shuffle(&mut rand::rng());

    let map = RbTreeMap::from_entries(keys.iter().map(|&k| (k, k * 2))).unwrap();
    assert_eq!(map.keys(), (0..500).collect::<Vec<i64>>());
    assert_eq!(map.values(), (0..500).map(|k| k * 2).collect::<Vec<i64>>());

    let mut descending: Vec<i64> = (0..500).collect();
    descending.reverse();
    assert_eq!(map.descending_keys(), descending);
}

#[test]
fn from_rows_requires_pairs() {
    let map = RbTreeMap::from_rows([vec![1, 10], vec![2, 20]]).unwrap();
    assert_eq!(map.items(), vec![(1, 10), (2, 20)]);

    assert!(matches!(
        RbTreeMap::from_rows([vec![1, 10], vec![2, 20, 30]]),
        Err(Error::MalformedInput)
    ));
    assert!(matches!(
        RbTreeMap::from_rows([vec![1]]),
        Err(Error::MalformedInput)
    ));
}

#[test]
fn setdefault_inserts_only_when_absent() {
    let mut map = RbTreeMap::from_entries([(1, "a")]).unwrap();
    assert_eq!(map.setdefault(1, "x").unwrap(), "a");
    assert_eq!(map.setdefault(2, "b").unwrap(), "b");
    assert_eq!(map.items(), vec![(1, "a"), (2, "b")]);
}

#[test]
fn update_overwrites_and_chains() {
    let mut map = RbTreeMap::from_entries([(1, "a"), (2, "b")]).unwrap();
    let other = RbTreeMap::from_entries([(2, "B"), (3, "c")]).unwrap();
    let len = map.update(&other).unwrap().len();
    assert_eq!(len, 3);
    assert_eq!(map.items(), vec![(1, "a"), (2, "B"), (3, "c")]);
}

#[test]
fn pop_returns_minimum_entry_value() {
    let mut map = RbTreeMap::from_entries((0..10).map(|k| (k, k + 100))).unwrap();
    assert_eq!(map.pop().unwrap(), 100);
    assert_eq!(map.pop().unwrap(), 101);
    assert_eq!(map.len(), 8);
    map.clear();
    assert!(matches!(map.pop(), Err(Error::EmptyTree)));
}

#[test]
fn clear_retains_comparator() {
    let mut map = RbTreeMap::with_comparator(Arc::new(ReverseOrder));
    map.insert(1, 1).unwrap();
    map.clear();
    assert!(map.is_empty());
    map.insert(1, 1).unwrap();
    map.insert(2, 2).unwrap();
    assert_eq!(map.keys(), vec![2, 1]);
}

// ─── Custom and duplicate-permitting comparators ─────────────────────────────

#[test]
fn reverse_comparator_flips_enumeration() {
    let map =
        RbTreeMap::from_entries_with(Arc::new(ReverseOrder), (0..5).map(|k| (k, k))).unwrap();
    assert_eq!(map.keys(), vec![4, 3, 2, 1, 0]);
    // Min and max follow the injected order, not the natural one.
    assert_eq!(map.min().unwrap(), 4);
    assert_eq!(map.max().unwrap(), 0);
    assert_eq!(map.by_offset(0).unwrap(), 4);
    assert_eq!(map.by_offset(-1).unwrap(), 0);
}

/// A comparator that resolves ties to the right, so equal keys accumulate.
fn tie_right() -> SharedComparator<i64> {
    Arc::new(
        FnComparator::new("tie-right", |a: &i64, b: &i64| match a.cmp(b) {
            Ordering::Equal => Some(Ordering::Greater),
            other => Some(other),
        })
        .allowing_duplicates(),
    )
}

#[test]
fn duplicate_comparator_turns_map_into_multimap() {
    let mut map = RbTreeMap::with_comparator(tie_right());
    for (i, k) in [5i64, 3, 5, 5, 3].into_iter().enumerate() {
        assert_eq!(map.insert(k, i).unwrap(), None);
    }
    assert_eq!(map.len(), 5);
    // Ties land after their equals, so insertion order is kept per key.
    assert_eq!(map.items(), vec![(3, 1), (3, 4), (5, 0), (5, 2), (5, 3)]);
}

#[test]
fn bad_comparator_surfaces_on_first_comparison() {
    let broken = Arc::new(FnComparator::new("broken", |_: &i64, _: &i64| None));
    let mut map = RbTreeMap::with_comparator(broken);
    // First insert compares nothing.
    assert!(map.insert(1, 1).is_ok());
    assert!(matches!(map.insert(2, 2), Err(Error::BadComparator)));
    assert!(matches!(map.get(&1), Err(Error::BadComparator)));
    assert_eq!(map.len(), 1);
}

// ─── Rank and offset access ──────────────────────────────────────────────────

#[test]
fn by_offset_counts_from_either_end() {
    let map = RbTreeMap::from_entries((0..10).map(|k| (k, ()))).unwrap();
    assert_eq!(map.by_offset(0).unwrap(), 0);
    assert_eq!(map.by_offset(9).unwrap(), 9);
    assert_eq!(map.by_offset(-1).unwrap(), 9);
    assert_eq!(map.by_offset(-10).unwrap(), 0);

    assert!(matches!(
        map.by_offset(10),
        Err(Error::IndexOutOfRange { offset: 10, len: 10 })
    ));
    assert!(matches!(
        map.by_offset(-11),
        Err(Error::IndexOutOfRange { offset: -11, len: 10 })
    ));
}

#[test]
fn rank_of_matches_sorted_position() {
    let map = RbTreeMap::from_entries([(10, ()), (20, ()), (30, ())]).unwrap();
    assert_eq!(map.rank_of(&10).unwrap(), 0);
    assert_eq!(map.rank_of(&30).unwrap(), 2);
    assert!(matches!(map.rank_of(&15), Err(Error::KeyNotFound)));
}

// ─── Slicing and range deletion ──────────────────────────────────────────────

#[test]
fn slice_bounds_are_half_open() {
    let map = RbTreeMap::from_entries((0..10).map(|k| (k, k))).unwrap();

    assert_eq!(map.slice(Some(&3), Some(&7), None).unwrap().keys(), vec![3, 4, 5, 6]);
    assert_eq!(map.slice(None, Some(&3), None).unwrap().keys(), vec![0, 1, 2]);
    assert_eq!(map.slice(Some(&7), None, None).unwrap().keys(), vec![7, 8, 9]);
    assert_eq!(map.slice(None, None, None).unwrap().len(), 10);

    // Bounds need not be present keys.
    let between = map.slice(Some(&-5), Some(&100), None).unwrap();
    assert_eq!(between.len(), 10);

    // An empty match is an empty map, not an error.
    assert!(map.slice(Some(&7), Some(&3), None).unwrap().is_empty());
}

#[test]
fn slice_step_strides_and_rejects_zero() {
    let map = RbTreeMap::from_entries((0..10).map(|k| (k, k))).unwrap();
    assert_eq!(map.slice(None, None, Some(3)).unwrap().keys(), vec![0, 3, 6, 9]);
    assert_eq!(map.slice(None, None, Some(-3)).unwrap().keys(), vec![0, 3, 6, 9]);
    assert!(matches!(map.slice(None, None, Some(0)), Err(Error::MalformedInput)));
}

#[test]
fn slice_is_independent_of_the_source() {
    let mut map = RbTreeMap::from_entries((0..10).map(|k| (k, k))).unwrap();
    let sliced = map.slice(Some(&2), Some(&5), None).unwrap();
    map.clear();
    assert_eq!(sliced.keys(), vec![2, 3, 4]);
}

#[test]
fn delete_range_works_without_clone_bounds() {
    #[derive(Debug, PartialEq)]
    struct Opaque(i64);

    let mut map = RbTreeMap::from_entries((0..6).map(|k| (k, Opaque(k)))).unwrap();
    map.delete_range(Some(&2), Some(&4)).unwrap();
    assert_eq!(map.len(), 4);
    assert!(!map.contains(&2).unwrap());
    assert!(map.contains(&4).unwrap());
}

#[test]
fn delete_range_removes_half_open_span() {
    let mut map = RbTreeMap::from_entries((0..10).map(|k| (k, k))).unwrap();
    map.delete_range(Some(&3), Some(&7)).unwrap();
    assert_eq!(map.keys(), vec![0, 1, 2, 7, 8, 9]);

    // Matching nothing is a no-op.
    map.delete_range(Some(&100), Some(&200)).unwrap();
    assert_eq!(map.len(), 6);

    map.delete_range(None, None).unwrap();
    assert!(map.is_empty());
}

// ─── Clone, equality, Debug ──────────────────────────────────────────────────

#[test]
fn clone_is_deep() {
    let map = RbTreeMap::from_entries((0..5).map(|k| (k, k))).unwrap();
    let mut copy = map.clone();
    assert_eq!(map, copy);

    copy.insert(99, 99).unwrap();
    copy.remove(&0).unwrap();
    assert_eq!(map.keys(), vec![0, 1, 2, 3, 4]);
    assert_ne!(map, copy);
}

#[test]
fn equality_follows_the_comparator() {
    let folded: SharedComparator<String> =
        Arc::new(FnComparator::new("folded", |a: &String, b: &String| {
            Some(a.to_lowercase().cmp(&b.to_lowercase()))
        }));

    let a =
        RbTreeMap::from_entries_with(Arc::clone(&folded), [("Ant".to_string(), 1)]).unwrap();
    let b =
        RbTreeMap::from_entries_with(Arc::clone(&folded), [("ANT".to_string(), 1)]).unwrap();
    // Keys differ under `==` but not under the comparator.
    assert_eq!(a, b);

    let c = RbTreeMap::from_entries_with(folded, [("Bee".to_string(), 1)]).unwrap();
    assert_ne!(a, c);
}

#[test]
fn debug_renders_as_map() {
    let map = RbTreeMap::from_entries([(1, "a"), (2, "b")]).unwrap();
    assert_eq!(format!("{map:?}"), r#"{1: "a", 2: "b"}"#);
}

// ─── Cursors ─────────────────────────────────────────────────────────────────

#[test]
fn fresh_cursor_enters_at_the_near_end() {
    let map = RbTreeMap::from_entries((1..=3).map(|k| (k, k * 10))).unwrap();

    let mut fwd = map.cursor();
    assert_eq!(fwd.try_next().unwrap().into_key(), Some(1));

    let mut back = map.descending();
    assert_eq!(back.try_next().unwrap().into_key(), Some(3));

    // Stepping a fresh forward cursor backwards also lands on the maximum.
    let mut fwd2 = map.cursor();
    assert_eq!(fwd2.try_prev().unwrap().into_key(), Some(3));
}

#[test]
fn cursor_direction_flips_mid_walk() {
    let map = RbTreeMap::from_entries((0..5).map(|k| (k, k))).unwrap();
    let mut cur = map.cursor();
    assert_eq!(cur.try_next().unwrap().into_key(), Some(0));
    assert_eq!(cur.try_next().unwrap().into_key(), Some(1));
    assert_eq!(cur.try_next().unwrap().into_key(), Some(2));

    cur.direction = Direction::Backward;
    assert_eq!(cur.try_next().unwrap().into_key(), Some(1));
    assert_eq!(cur.try_next().unwrap().into_key(), Some(0));
    assert!(matches!(cur.try_next(), Err(Error::Exhausted)));
}

#[test]
fn exhaustion_is_a_state_not_a_dead_end() {
    let map = RbTreeMap::from_entries((0..3).map(|k| (k, k))).unwrap();
    let mut cur = map.cursor();
    for expected in 0..3 {
        assert_eq!(cur.try_next().unwrap().into_key(), Some(expected));
    }
    assert!(matches!(cur.try_next(), Err(Error::Exhausted)));
    assert!(matches!(cur.try_next(), Err(Error::Exhausted)));
    // Walking back out of the end sentinel yields the maximum again.
    assert_eq!(cur.try_prev().unwrap().into_key(), Some(2));
}

#[test]
fn cursor_keeps_tree_alive() {
    let map = RbTreeMap::from_entries((0..3).map(|k| (k, k))).unwrap();
    let mut cur = map.cursor();
    drop(map);
    let keys: Vec<i64> = cur.by_ref().filter_map(|item| item.into_key()).collect();
    assert_eq!(keys, vec![0, 1, 2]);
}

#[test]
fn projections_shape_the_yield() {
    let map = RbTreeMap::from_entries([(1, "a"), (2, "b")]).unwrap();

    assert_eq!(map.cursor().projection(), Projection::Keys);
    assert_eq!(map.cursor_values().projection(), Projection::Values);
    assert_eq!(map.cursor_items().projection(), Projection::Items);

    assert_eq!(map.cursor().try_next().unwrap().into_key(), Some(1));
    assert_eq!(map.cursor_values().try_next().unwrap().into_value(), Some("a"));
    assert_eq!(map.cursor_items().try_next().unwrap().into_item(), Some((1, "a")));

    let mut nodes = map.cursor_nodes();
    assert_eq!(nodes.projection(), Projection::Nodes);
    nodes.try_next().unwrap();
    assert_eq!(nodes.get(Projection::Keys).unwrap().into_key(), Some(1));
    assert_eq!(nodes.get(Projection::Values).unwrap().into_value(), Some("a"));
    assert_eq!(nodes.get(Projection::Items).unwrap().into_item(), Some((1, "a")));
}

#[test]
fn goto_positions_and_accessors_read_in_place() {
    let map = RbTreeMap::from_entries((0..5).map(|k| (k, k * 10))).unwrap();
    let mut cur = map.cursor();

    assert!(matches!(cur.key(), Err(Error::InactiveCursor)));

    cur.goto(&3).unwrap();
    assert_eq!(cur.key().unwrap(), 3);
    assert_eq!(cur.value().unwrap(), 30);
    assert_eq!(cur.item().unwrap(), (3, 30));
    // Accessors do not move the cursor.
    assert_eq!(cur.try_next().unwrap().into_key(), Some(4));

    assert!(matches!(cur.goto(&99), Err(Error::KeyNotFound)));
    // A failed goto leaves the position alone.
    assert_eq!(cur.key().unwrap(), 4);
}

#[test]
fn goto_then_prev_next_weave() {
    let map = RbTreeMap::from_entries(('a'..='z').map(|k| (k, true))).unwrap();
    let mut cur = map.cursor();
    cur.goto(&'c').unwrap();

    assert_eq!(cur.try_prev().unwrap().into_key(), Some('b'));
    assert_eq!(cur.try_next().unwrap().into_key(), Some('c'));

    cur.direction = Direction::Backward;
    assert_eq!(cur.try_next().unwrap().into_key(), Some('b'));
    assert_eq!(cur.try_prev().unwrap().into_key(), Some('c'));
}

#[test]
fn cursor_remove_continues_seamlessly() {
    let map = RbTreeMap::from_entries((0..5).map(|k| (k, k))).unwrap();
    let mut cur = map.cursor();
    cur.goto(&2).unwrap();
    assert_eq!(cur.remove().unwrap().into_key(), Some(2));
    assert_eq!(cur.key().unwrap(), 3);
    assert_eq!(map.keys(), vec![0, 1, 3, 4]);

    // Removal against a backward cursor slides to the predecessor.
    let mut back = map.descending();
    back.goto(&3).unwrap();
    assert_eq!(back.remove().unwrap().into_key(), Some(3));
    assert_eq!(back.key().unwrap(), 1);
    assert_eq!(map.keys(), vec![0, 1, 4]);
}

#[test]
fn cursor_drains_the_whole_tree() {
    let map = RbTreeMap::from_entries((0..20).map(|k| (k, k))).unwrap();
    let mut cur = map.cursor();
    let mut removed = Vec::new();
    cur.try_next().unwrap();
    loop {
        removed.push(cur.remove().unwrap().into_key().unwrap());
        if cur.key().is_err() {
            break;
        }
    }
    assert_eq!(removed, (0..20).collect::<Vec<i64>>());
    assert!(map.is_empty());

    assert!(matches!(cur.remove(), Err(Error::InactiveCursor)));
}

#[test]
fn structural_mutation_invalidates_open_cursors() {
    let mut map = RbTreeMap::from_entries((0..5).map(|k| (k, k))).unwrap();
    let mut cur = map.cursor();
    cur.goto(&2).unwrap();

    map.insert(99, 99).unwrap();
    assert!(matches!(cur.try_next(), Err(Error::InvalidatedCursor)));
    assert!(matches!(cur.key(), Err(Error::InvalidatedCursor)));
    assert!(matches!(cur.remove(), Err(Error::InvalidatedCursor)));

    // goto re-anchors an invalidated cursor.
    cur.goto(&99).unwrap();
    assert_eq!(cur.key().unwrap(), 99);
}

#[test]
fn value_replacement_does_not_invalidate() {
    let mut map = RbTreeMap::from_entries((0..5).map(|k| (k, k))).unwrap();
    let mut cur = map.cursor_items();
    cur.goto(&2).unwrap();

    // Same key, new value: no structural change.
    assert_eq!(map.insert(3, 33).unwrap(), Some(3));
    assert_eq!(cur.try_next().unwrap().into_item(), Some((3, 33)));
}

#[test]
fn two_cursors_see_each_others_removals_fail_fast() {
    let map = RbTreeMap::from_entries((0..5).map(|k| (k, k))).unwrap();
    let mut a = map.cursor();
    let mut b = map.cursor();
    a.goto(&1).unwrap();
    b.goto(&3).unwrap();

    a.remove().unwrap();
    assert!(matches!(b.try_next(), Err(Error::InvalidatedCursor)));
}

// ─── Durable forms ───────────────────────────────────────────────────────────

#[test]
fn durable_round_trip_under_builtin_orders() {
    let map = RbTreeMap::from_entries((0..50).map(|k| (k, k * 3))).unwrap();
    let bytes = map.to_durable_form().unwrap();
    let loaded = RbTreeMap::<i64, i64>::from_durable_form(&bytes).unwrap();
    assert_eq!(map, loaded);

    let rev =
        RbTreeMap::from_entries_with(Arc::new(ReverseOrder), (0..50).map(|k| (k, k))).unwrap();
    let bytes = rev.to_durable_form().unwrap();
    let loaded = RbTreeMap::<i64, i64>::from_durable_form(&bytes).unwrap();
    assert_eq!(rev, loaded);
    assert_eq!(loaded.min().unwrap(), 49);
}

#[test]
fn durable_form_resolves_registered_comparators() {
    let cmp = Arc::new(FnComparator::new("registered-modulo", |a: &i64, b: &i64| {
        Some((a % 7, a).cmp(&(b % 7, b)))
    }));
    let map =
        RbTreeMap::from_entries_with(cmp.clone(), (0..30).map(|k| (k, ()))).unwrap();
    let bytes = map.to_durable_form().unwrap();

    register_comparator::<i64>(cmp);
    let loaded = RbTreeMap::<i64, ()>::from_durable_form(&bytes).unwrap();
    assert_eq!(map, loaded);
}

#[test]
fn durable_form_with_unknown_comparator_fails() {
    let cmp = Arc::new(FnComparator::new("never-registered", |a: &i64, b: &i64| {
        Some(a.cmp(b))
    }));
    let map = RbTreeMap::from_entries_with(cmp, [(1i64, 1i64)]).unwrap();
    let bytes = map.to_durable_form().unwrap();

    assert!(matches!(
        RbTreeMap::<i64, i64>::from_durable_form(&bytes),
        Err(Error::UnresolvableComparator(name)) if name == "never-registered"
    ));
}

#[test]
fn durable_form_with_checks_the_recorded_name() {
    let map = RbTreeMap::from_entries([(1i64, 1i64)]).unwrap();
    let bytes = map.to_durable_form().unwrap();

    assert!(matches!(
        RbTreeMap::<i64, i64>::from_durable_form_with(&bytes, Arc::new(ReverseOrder)),
        Err(Error::UnresolvableComparator(_))
    ));
}

#[test]
fn durable_form_rejects_unsorted_bytes() {
    let bytes = br#"{"comparator":"natural","entries":[[2,0],[1,0]]}"#;
    assert!(matches!(
        RbTreeMap::<i64, i64>::from_durable_form(bytes),
        Err(Error::MalformedInput)
    ));

    let dup = br#"{"comparator":"natural","entries":[[1,0],[1,0]]}"#;
    assert!(matches!(
        RbTreeMap::<i64, i64>::from_durable_form(dup),
        Err(Error::MalformedInput)
    ));
}

#[test]
fn durable_form_rejects_garbage_bytes() {
    assert!(matches!(
        RbTreeMap::<i64, i64>::from_durable_form(b"not json at all"),
        Err(Error::Codec(_))
    ));
}
