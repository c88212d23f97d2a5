use std::{collections::HashSet, num::NonZeroUsize};

use lru::LruCache;
use parking_lot::Mutex;

/// Aggregation-bit patterns already processed per (slot, committee index).
///
/// Entries are evicted by recency. A hit only saves re-verification work, acceptance still rests
/// on the signature check.
#[derive(Debug)]
pub struct SeenCache {
    patterns: Mutex<LruCache<(u64, u64), HashSet<Vec<u8>>>>,
}

impl SeenCache {
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self {
            patterns: Mutex::new(LruCache::new(capacity)),
        }
    }

    pub fn seen(&self, slot: u64, committee_index: u64, pattern: &[u8]) -> bool {
        self.patterns
            .lock()
            .get(&(slot, committee_index))
            .is_some_and(|patterns| patterns.contains(pattern))
    }

    pub fn mark(&self, slot: u64, committee_index: u64, pattern: Vec<u8>) {
        self.patterns
            .lock()
            .get_or_insert_mut((slot, committee_index), HashSet::new)
            .insert(pattern);
    }

    /// Whether every participant of ``pattern`` is already covered by a single seen pattern of
    /// the same length.
    pub fn is_subset_of_seen(&self, slot: u64, committee_index: u64, pattern: &[u8]) -> bool {
        self.patterns
            .lock()
            .get(&(slot, committee_index))
            .is_some_and(|patterns| {
                patterns.iter().any(|seen| {
                    seen.len() == pattern.len()
                        && pattern
                            .iter()
                            .zip(seen.iter())
                            .all(|(bits, seen_bits)| bits & !seen_bits == 0)
                })
            })
    }
}

/// Validator indices which already had a message accepted for an epoch, used for the
/// one-attestation-per-attester and one-aggregate-per-aggregator rules.
#[derive(Debug)]
pub struct ObservedIndices {
    observed: Mutex<LruCache<(u64, u64), ()>>,
}

impl ObservedIndices {
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self {
            observed: Mutex::new(LruCache::new(capacity)),
        }
    }

    pub fn is_observed(&self, epoch: u64, validator_index: u64) -> bool {
        self.observed.lock().contains(&(epoch, validator_index))
    }

    /// Returns `false` if the index was already observed for ``epoch``.
    pub fn observe(&self, epoch: u64, validator_index: u64) -> bool {
        self.observed
            .lock()
            .put((epoch, validator_index), ())
            .is_none()
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    fn seen_cache(capacity: usize) -> SeenCache {
        SeenCache::new(NonZeroUsize::new(capacity).expect("Invalid cache size"))
    }

    #[test]
    fn test_patterns_are_independent_per_key() {
        let cache = seen_cache(8);
        cache.mark(1, 0, vec![0b0000_0011]);

        assert!(cache.seen(1, 0, &[0b0000_0011]));
        assert!(!cache.seen(1, 0, &[0b0000_0101]));
        assert!(!cache.seen(1, 1, &[0b0000_0011]));
        assert!(!cache.seen(2, 0, &[0b0000_0011]));

        cache.mark(1, 0, vec![0b0000_0101]);
        assert!(cache.seen(1, 0, &[0b0000_0011]));
        assert!(cache.seen(1, 0, &[0b0000_0101]));
    }

    #[rstest]
    #[case::strict_subset(&[0b0011_0000, 0b0000_0001], true)]
    #[case::equal(&[0b1111_0000, 0b0000_0001], true)]
    #[case::extra_participant(&[0b0011_0001, 0b0000_0000], false)]
    #[case::length_mismatch(&[0b0011_0000], false)]
    fn test_subset_of_seen(#[case] pattern: &[u8], #[case] expected: bool) {
        let cache = seen_cache(8);
        cache.mark(4, 2, vec![0b1111_0000, 0b0000_0001]);

        assert_eq!(cache.is_subset_of_seen(4, 2, pattern), expected);
        assert!(!cache.is_subset_of_seen(5, 2, pattern));
    }

    #[test]
    fn test_least_recently_used_key_is_evicted() {
        let cache = seen_cache(2);
        cache.mark(1, 0, vec![1]);
        cache.mark(2, 0, vec![1]);
        assert!(cache.seen(1, 0, &[1]));

        cache.mark(3, 0, vec![1]);
        assert!(cache.seen(1, 0, &[1]));
        assert!(!cache.seen(2, 0, &[1]));
        assert!(cache.seen(3, 0, &[1]));
    }

    #[test]
    fn test_observed_indices() {
        let observed = ObservedIndices::new(NonZeroUsize::new(4).expect("Invalid cache size"));
        assert!(!observed.is_observed(3, 10));
        assert!(observed.observe(3, 10));
        assert!(!observed.observe(3, 10));
        assert!(observed.is_observed(3, 10));
        assert!(!observed.is_observed(4, 10));
    }
}
