//! Weighted random selection shared by branch randomization and loot tables.

use rand::distributions::{Distribution, WeightedIndex};
use rand::Rng;

/// Pick one entry with probability proportional to its weight.
///
/// Returns `None` when there is nothing to pick: an empty slice, or every
/// weight zero. Weights are summed as `u64`, so any number of `u32` weights
/// up to `u32::MAX` each is accepted.
pub fn select_weighted<'a, K, R>(entries: &'a [(K, u32)], rng: &mut R) -> Option<&'a K>
where
    R: Rng + ?Sized,
{
    let index =
        WeightedIndex::new(entries.iter().map(|(_, weight)| u64::from(*weight))).ok()?;
    entries.get(index.sample(rng)).map(|(key, _)| key)
}
