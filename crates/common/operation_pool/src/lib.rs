use std::collections::HashMap;

use alloy_primitives::B256;
use parking_lot::RwLock;
use ream_consensus_beacon::attestation_record::AttestationRecord;
use tracing::{debug, trace};

/// Attestations which passed gossip validation, waiting to be packed into blocks or aggregated.
#[derive(Debug, Default)]
pub struct OperationPool {
    aggregated_attestations: RwLock<HashMap<B256, AttestationRecord>>,
    unaggregated_attestations: RwLock<HashMap<B256, AttestationRecord>>,
}

impl OperationPool {
    /// Returns `false` if an identical attestation is already in the pool.
    pub fn insert_attestation(&self, attestation: AttestationRecord, aggregated: bool) -> bool {
        let root = attestation.tree_hash_root();
        let pool = if aggregated {
            &self.aggregated_attestations
        } else {
            &self.unaggregated_attestations
        };

        let mut attestations = pool.write();
        if attestations.contains_key(&root) {
            return false;
        }
        trace!(
            "Inserting {} attestation {root} at slot {} (aggregated: {aggregated})",
            attestation.kind(),
            attestation.data().slot
        );
        attestations.insert(root, attestation);
        true
    }

    pub fn get_aggregated_attestations(&self) -> Vec<AttestationRecord> {
        self.aggregated_attestations
            .read()
            .values()
            .cloned()
            .collect()
    }

    pub fn get_unaggregated_attestations(&self) -> Vec<AttestationRecord> {
        self.unaggregated_attestations
            .read()
            .values()
            .cloned()
            .collect()
    }

    pub fn contains_attestation(&self, root: B256) -> bool {
        self.aggregated_attestations.read().contains_key(&root)
            || self.unaggregated_attestations.read().contains_key(&root)
    }

    /// Drops attestations whose slot is older than the last ``retention_slots`` slots. Returns the
    /// number dropped.
    pub fn prune_attestations(&self, current_slot: u64, retention_slots: u64) -> usize {
        let min_slot = current_slot.saturating_sub(retention_slots.saturating_sub(1));
        let mut pruned = 0;
        for pool in [&self.aggregated_attestations, &self.unaggregated_attestations] {
            let mut attestations = pool.write();
            let before = attestations.len();
            attestations.retain(|_, attestation| attestation.data().slot >= min_slot);
            pruned += before - attestations.len();
        }

        if pruned > 0 {
            debug!("Pruned {pruned} attestations before slot {min_slot} from the operation pool");
        }
        pruned
    }

    pub fn attestation_count(&self) -> usize {
        self.aggregated_attestations.read().len() + self.unaggregated_attestations.read().len()
    }
}
