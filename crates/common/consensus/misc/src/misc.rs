use std::cmp::max;

use alloy_primitives::{B256, aliases::B32};
use ream_bls::BLSSignature;
use sha2::{Digest, Sha256};
use ssz_types::{BitVector, typenum::U64};
use tree_hash::TreeHash;

use crate::{
    constants::beacon::{SLOTS_PER_EPOCH, TARGET_AGGREGATORS_PER_COMMITTEE},
    fork_data::ForkData,
    signing_data::SigningData,
};

pub fn compute_signing_root<SSZObject: TreeHash>(ssz_object: SSZObject, domain: B256) -> B256 {
    SigningData {
        object_root: ssz_object.tree_hash_root(),
        domain,
    }
    .tree_hash_root()
}

/// Return the epoch number at ``slot``.
pub fn compute_epoch_at_slot(slot: u64) -> u64 {
    slot / SLOTS_PER_EPOCH
}

/// Return the start slot of ``epoch``.
pub fn compute_start_slot_at_epoch(epoch: u64) -> u64 {
    epoch * SLOTS_PER_EPOCH
}

/// Return the domain for the ``domain_type`` and ``fork_version``.
pub fn compute_domain(
    domain_type: B32,
    fork_version: B32,
    genesis_validators_root: B256,
) -> B256 {
    let fork_data_root = ForkData {
        current_version: fork_version,
        genesis_validators_root,
    }
    .compute_fork_data_root();
    B256::from_slice(&[&domain_type.0, &fork_data_root.0[..28]].concat())
}

pub fn compute_fork_digest(current_version: B32, genesis_validators_root: B256) -> B32 {
    ForkData {
        current_version,
        genesis_validators_root,
    }
    .compute_fork_digest()
}

pub fn get_committee_indices(committee_bits: &BitVector<U64>) -> Vec<u64> {
    committee_bits
        .iter()
        .enumerate()
        .filter_map(|(i, bit)| bit.then_some(i as u64))
        .collect()
}

/// Compute the correct subnet for an attestation for Phase 0.
/// Note, this mimics expected future behavior where attestations will be mapped to their shard
/// subnet.
pub fn compute_subnet_for_attestation(
    committees_per_slot: u64,
    slot: u64,
    committee_index: u64,
    attestation_subnet_count: u64,
) -> u64 {
    let slots_since_epoch_start = slot % SLOTS_PER_EPOCH;
    let committee_since_epoch_start = committees_per_slot * slots_since_epoch_start;
    (committee_since_epoch_start + committee_index) % attestation_subnet_count
}

// Return the integer deserialization of ``data`` interpreted as ``ENDIANNESS``-endian.
pub fn bytes_to_int64(slice: &[u8]) -> u64 {
    let mut bytes = [0u8; 8];
    let len = slice.len().min(8);
    bytes[..len].copy_from_slice(&slice[..len]);
    u64::from_le_bytes(bytes)
}

pub fn hash_signature_prefix_to_u64(signature: &BLSSignature) -> u64 {
    bytes_to_int64(&Sha256::digest(signature.to_bytes())[..8])
}

/// Whether ``selection_proof`` selects its signer as an aggregator of a committee of
/// ``committee_len`` members.
pub fn is_aggregator(committee_len: usize, selection_proof: &BLSSignature) -> bool {
    let modulo = max(1, committee_len as u64 / TARGET_AGGREGATORS_PER_COMMITTEE);
    hash_signature_prefix_to_u64(selection_proof) % modulo == 0
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(0, 0)]
    #[case(31, 0)]
    #[case(32, 1)]
    #[case(95, 2)]
    fn test_compute_epoch_at_slot(#[case] slot: u64, #[case] epoch: u64) {
        assert_eq!(compute_epoch_at_slot(slot), epoch);
        assert!(compute_start_slot_at_epoch(epoch) <= slot);
    }

    #[rstest]
    #[case(1, 0, 0, 0)]
    #[case(4, 1, 2, 6)]
    #[case(64, 3, 10, 10)]
    fn test_compute_subnet_for_attestation(
        #[case] committees_per_slot: u64,
        #[case] slot: u64,
        #[case] committee_index: u64,
        #[case] subnet: u64,
    ) {
        assert_eq!(
            compute_subnet_for_attestation(committees_per_slot, slot, committee_index, 64),
            subnet
        );
    }

    #[test]
    fn test_get_committee_indices() {
        let mut bits = BitVector::<U64>::new();
        bits.set(3, true).unwrap();
        bits.set(17, true).unwrap();
        assert_eq!(get_committee_indices(&bits), vec![3, 17]);
    }

    #[test]
    fn test_small_committee_always_aggregates() {
        // committees below TARGET_AGGREGATORS_PER_COMMITTEE use a modulo of one
        assert!(is_aggregator(8, &BLSSignature::default()));
        assert!(is_aggregator(0, &BLSSignature::default()));
    }

    #[test]
    fn test_domain_starts_with_domain_type() {
        let domain = compute_domain(
            crate::constants::beacon::DOMAIN_BEACON_ATTESTER,
            B32::ZERO,
            B256::ZERO,
        );
        assert_eq!(&domain[..4], &[1, 0, 0, 0]);
        assert_ne!(
            compute_fork_digest(B32::ZERO, B256::ZERO),
            compute_fork_digest(B32::repeat_byte(1), B256::ZERO)
        );
    }
}
