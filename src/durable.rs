//! Durable byte forms for the tree containers.
//!
//! A tree's durable form is its ascending entry sequence plus the *name* of
//! its comparator; comparator code never travels with the bytes. Loading
//! resolves the name against the built-in orders and the process-wide
//! [registry](crate::register_comparator), then validates that the recorded
//! sequence really is sorted under the resolved comparator before the O(n)
//! bulk build — bytes from a foreign or tampered source must not be able to
//! produce a tree that violates its own order.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::comparator::SharedComparator;
use crate::error::Error;
use crate::raw::Core;

#[derive(Serialize, Deserialize)]
struct DurableTree<K, V> {
    comparator: String,
    entries: Vec<(K, V)>,
}

#[derive(Serialize, Deserialize)]
struct DurableSet<T> {
    comparator: String,
    elems: Vec<T>,
}

pub(crate) fn encode_map<K, V>(core: &Core<K, V>) -> Result<Vec<u8>, Error>
where
    K: Serialize + Clone,
    V: Serialize + Clone,
{
    let form = DurableTree {
        comparator: core.comparator().name().to_owned(),
        entries: core.entries(),
    };
    Ok(serde_json::to_vec(&form)?)
}

pub(crate) fn decode_map<K, V>(bytes: &[u8]) -> Result<(String, Vec<(K, V)>), Error>
where
    K: DeserializeOwned,
    V: DeserializeOwned,
{
    let form: DurableTree<K, V> = serde_json::from_slice(bytes)?;
    Ok((form.comparator, form.entries))
}

pub(crate) fn encode_set<T>(core: &Core<T, ()>) -> Result<Vec<u8>, Error>
where
    T: Serialize + Clone,
{
    let form = DurableSet {
        comparator: core.comparator().name().to_owned(),
        elems: core.entries().into_iter().map(|(elem, ())| elem).collect(),
    };
    Ok(serde_json::to_vec(&form)?)
}

pub(crate) fn decode_set<T>(bytes: &[u8]) -> Result<(String, Vec<T>), Error>
where
    T: DeserializeOwned,
{
    let form: DurableSet<T> = serde_json::from_slice(bytes)?;
    Ok((form.comparator, form.elems))
}

/// Validates that `entries` is sorted under `cmp` — strictly ascending
/// unless the comparator permits duplicates — then bulk-builds a core.
/// Out-of-order bytes are [`Error::MalformedInput`].
pub(crate) fn rebuild<K, V>(
    cmp: SharedComparator<K>,
    entries: Vec<(K, V)>,
) -> Result<Core<K, V>, Error> {
    let strict = !cmp.allows_duplicates();
    for pair in entries.windows(2) {
        let order = cmp
            .compare(&pair[0].0, &pair[1].0)
            .ok_or(Error::BadComparator)?;
        match order {
            std::cmp::Ordering::Less => {}
            std::cmp::Ordering::Equal if !strict => {}
            _ => return Err(Error::MalformedInput),
        }
    }
    Ok(Core::from_sorted_entries(cmp, entries))
}
