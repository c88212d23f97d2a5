use std::{
    collections::HashMap,
    sync::atomic::{AtomicU64, AtomicUsize, Ordering},
};

use alloy_primitives::B256;
use parking_lot::Mutex;
use ream_metrics::{PENDING_ATTESTATION_ROOTS, PENDING_ATTESTATIONS, set_int_gauge_vec};
use tracing::{debug, trace};

use super::attestation::GossipAttestation;

const SHARD_COUNT: usize = 16;

/// What [PendingAttestationQueue::save] did with an attestation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    /// Stored as the first attestation under its root.
    NewRoot,
    /// Stored under a root that was already buffered.
    Appended,
    Duplicate,
    /// The root is new and the queue is at capacity.
    Full,
}

impl SaveOutcome {
    pub fn is_stored(self) -> bool {
        matches!(self, SaveOutcome::NewRoot | SaveOutcome::Appended)
    }
}

#[derive(Debug)]
struct PendingEntry {
    attestation: GossipAttestation,
    arrival: u64,
}

/// Attestations whose voted block hasn't been imported yet, keyed by that block root.
///
/// The number of distinct roots is capped at `limit`. Once the cap is hit, attestations for new
/// roots are dropped while existing roots keep accepting. Every root lives in exactly one shard
/// and all access to a root goes through that shard's lock.
#[derive(Debug)]
pub struct PendingAttestationQueue {
    shards: Vec<Mutex<HashMap<B256, Vec<PendingEntry>>>>,
    limit: usize,
    root_count: AtomicUsize,
    attestation_count: AtomicUsize,
    arrival: AtomicU64,
}

impl PendingAttestationQueue {
    pub fn new(limit: usize) -> Self {
        Self {
            shards: (0..SHARD_COUNT)
                .map(|_| Mutex::new(HashMap::new()))
                .collect(),
            limit,
            root_count: AtomicUsize::new(0),
            attestation_count: AtomicUsize::new(0),
            arrival: AtomicU64::new(0),
        }
    }

    fn shard(&self, root: &B256) -> &Mutex<HashMap<B256, Vec<PendingEntry>>> {
        &self.shards[root[0] as usize % SHARD_COUNT]
    }

    /// Buffers ``attestation`` under ``root``. A duplicate, or an insert under a new root while at
    /// capacity, is dropped.
    pub fn save(&self, root: B256, attestation: GossipAttestation) -> SaveOutcome {
        let mut shard = self.shard(&root).lock();

        let outcome = match shard.get_mut(&root) {
            Some(entries) => {
                if entries
                    .iter()
                    .any(|entry| entry.attestation.has_same_identity(&attestation))
                {
                    trace!("Dropping duplicate pending attestation for root {root}");
                    return SaveOutcome::Duplicate;
                }
                entries.push(PendingEntry {
                    attestation,
                    arrival: self.arrival.fetch_add(1, Ordering::Relaxed),
                });
                SaveOutcome::Appended
            }
            None => {
                let limit = self.limit;
                if self
                    .root_count
                    .fetch_update(Ordering::AcqRel, Ordering::Acquire, |count| {
                        (count < limit).then_some(count + 1)
                    })
                    .is_err()
                {
                    debug!("Pending attestation queue is full, dropping attestation for {root}");
                    return SaveOutcome::Full;
                }
                shard.insert(
                    root,
                    vec![PendingEntry {
                        attestation,
                        arrival: self.arrival.fetch_add(1, Ordering::Relaxed),
                    }],
                );
                SaveOutcome::NewRoot
            }
        };

        self.attestation_count.fetch_add(1, Ordering::AcqRel);
        drop(shard);
        self.update_metrics();
        outcome
    }

    /// Drops attestations older than the last ``window`` slots and removes roots left empty.
    /// Returns the number of attestations dropped.
    pub fn prune(&self, current_slot: u64, window: u64) -> usize {
        let min_slot = current_slot.saturating_sub(window.saturating_sub(1));
        let mut pruned = 0;
        let mut removed_roots = 0;

        for shard in &self.shards {
            let mut shard = shard.lock();
            let mut shard_pruned = 0;
            let mut shard_removed_roots = 0;
            shard.retain(|_, entries| {
                let before = entries.len();
                entries.retain(|entry| entry.attestation.slot() >= min_slot);
                shard_pruned += before - entries.len();
                if entries.is_empty() {
                    shard_removed_roots += 1;
                    false
                } else {
                    true
                }
            });

            // Counters move under the shard lock
            if shard_pruned > 0 {
                self.attestation_count
                    .fetch_sub(shard_pruned, Ordering::AcqRel);
                self.root_count
                    .fetch_sub(shard_removed_roots, Ordering::AcqRel);
            }
            pruned += shard_pruned;
            removed_roots += shard_removed_roots;
        }

        if pruned > 0 {
            debug!(
                "Pruned {pruned} pending attestations before slot {min_slot}, {removed_roots} roots removed"
            );
            self.update_metrics();
        }
        pruned
    }

    /// Removes everything buffered under ``root`` and returns it in arrival order.
    pub fn drain(&self, root: B256) -> Vec<GossipAttestation> {
        let mut shard = self.shard(&root).lock();
        let Some(mut entries) = shard.remove(&root) else {
            return vec![];
        };
        self.root_count.fetch_sub(1, Ordering::AcqRel);
        self.attestation_count
            .fetch_sub(entries.len(), Ordering::AcqRel);
        drop(shard);
        self.update_metrics();

        entries.sort_by_key(|entry| entry.arrival);
        entries.into_iter().map(|entry| entry.attestation).collect()
    }

    pub fn roots(&self) -> Vec<B256> {
        self.shards
            .iter()
            .flat_map(|shard| shard.lock().keys().copied().collect::<Vec<_>>())
            .collect()
    }

    pub fn contains_root(&self, root: &B256) -> bool {
        self.shard(root).lock().contains_key(root)
    }

    pub fn root_count(&self) -> usize {
        self.root_count.load(Ordering::Acquire)
    }

    pub fn len(&self) -> usize {
        self.attestation_count.load(Ordering::Acquire)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn len_for(&self, root: &B256) -> usize {
        self.shard(root).lock().get(root).map_or(0, Vec::len)
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    fn update_metrics(&self) {
        set_int_gauge_vec(&PENDING_ATTESTATION_ROOTS, self.root_count() as i64, &[]);
        set_int_gauge_vec(&PENDING_ATTESTATIONS, self.len() as i64, &[]);
    }
}
