use alloy_primitives::B256;
use ream_bls::BLSSignature;
use ream_consensus_misc::attestation_data::AttestationData;
use tree_hash::TreeHash;

use crate::{
    aggregate_and_proof::{SignedAggregateAndProof, SignedPhase0AggregateAndProof},
    attestation::Attestation,
    phase0::Phase0Attestation,
    single_attestation::SingleAttestation,
};

/// Every attestation shape seen on gossip, resolved once at decode time.
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum AttestationRecord {
    Single(SingleAttestation),
    Phase0(Phase0Attestation),
    Electra(Attestation),
}

impl AttestationRecord {
    pub fn data(&self) -> &AttestationData {
        match self {
            AttestationRecord::Single(attestation) => &attestation.data,
            AttestationRecord::Phase0(attestation) => &attestation.data,
            AttestationRecord::Electra(attestation) => &attestation.data,
        }
    }

    pub fn signature(&self) -> &BLSSignature {
        match self {
            AttestationRecord::Single(attestation) => &attestation.signature,
            AttestationRecord::Phase0(attestation) => &attestation.signature,
            AttestationRecord::Electra(attestation) => &attestation.signature,
        }
    }

    /// The committee this record votes for, `None` for a post-electra aggregate that names zero
    /// or several committees.
    pub fn committee_index(&self) -> Option<u64> {
        match self {
            AttestationRecord::Single(attestation) => Some(attestation.committee_index),
            AttestationRecord::Phase0(attestation) => Some(attestation.data.index),
            AttestationRecord::Electra(attestation) => attestation.single_committee_index(),
        }
    }

    /// Committee positions of the participants, `None` for a single attestation which names
    /// its attester by validator index instead.
    pub fn participant_positions(&self) -> Option<Vec<usize>> {
        let positions = match self {
            AttestationRecord::Single(_) => return None,
            AttestationRecord::Phase0(attestation) => attestation
                .aggregation_bits
                .iter()
                .enumerate()
                .filter_map(|(position, bit)| bit.then_some(position))
                .collect(),
            AttestationRecord::Electra(attestation) => attestation
                .aggregation_bits
                .iter()
                .enumerate()
                .filter_map(|(position, bit)| bit.then_some(position))
                .collect(),
        };
        Some(positions)
    }

    /// Length of the aggregation bitlist, `None` for a single attestation.
    pub fn aggregation_bits_len(&self) -> Option<usize> {
        match self {
            AttestationRecord::Single(_) => None,
            AttestationRecord::Phase0(attestation) => Some(attestation.aggregation_bits.len()),
            AttestationRecord::Electra(attestation) => Some(attestation.aggregation_bits.len()),
        }
    }

    /// Packed aggregation bits, `None` for a single attestation.
    pub fn aggregation_pattern(&self) -> Option<Vec<u8>> {
        match self {
            AttestationRecord::Single(_) => None,
            AttestationRecord::Phase0(attestation) => {
                Some(attestation.aggregation_bits.as_slice().to_vec())
            }
            AttestationRecord::Electra(attestation) => {
                Some(attestation.aggregation_bits.as_slice().to_vec())
            }
        }
    }

    pub fn num_participants(&self) -> usize {
        match self {
            AttestationRecord::Single(_) => 1,
            AttestationRecord::Phase0(attestation) => attestation.aggregation_bits.num_set_bits(),
            AttestationRecord::Electra(attestation) => attestation.aggregation_bits.num_set_bits(),
        }
    }

    pub fn is_aggregated(&self) -> bool {
        self.num_participants() > 1
    }

    pub fn tree_hash_root(&self) -> B256 {
        match self {
            AttestationRecord::Single(attestation) => attestation.tree_hash_root(),
            AttestationRecord::Phase0(attestation) => attestation.tree_hash_root(),
            AttestationRecord::Electra(attestation) => attestation.tree_hash_root(),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            AttestationRecord::Single(_) => "single",
            AttestationRecord::Phase0(_) => "phase0",
            AttestationRecord::Electra(_) => "electra",
        }
    }
}

/// A signed aggregate-and-proof of either fork.
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum SignedAggregate {
    Phase0(SignedPhase0AggregateAndProof),
    Electra(SignedAggregateAndProof),
}

impl SignedAggregate {
    pub fn aggregator_index(&self) -> u64 {
        match self {
            SignedAggregate::Phase0(signed) => signed.message.aggregator_index,
            SignedAggregate::Electra(signed) => signed.message.aggregator_index,
        }
    }

    pub fn selection_proof(&self) -> &BLSSignature {
        match self {
            SignedAggregate::Phase0(signed) => &signed.message.selection_proof,
            SignedAggregate::Electra(signed) => &signed.message.selection_proof,
        }
    }

    pub fn signature(&self) -> &BLSSignature {
        match self {
            SignedAggregate::Phase0(signed) => &signed.signature,
            SignedAggregate::Electra(signed) => &signed.signature,
        }
    }

    pub fn data(&self) -> &AttestationData {
        match self {
            SignedAggregate::Phase0(signed) => &signed.message.aggregate.data,
            SignedAggregate::Electra(signed) => &signed.message.aggregate.data,
        }
    }

    pub fn aggregate(&self) -> AttestationRecord {
        match self {
            SignedAggregate::Phase0(signed) => {
                AttestationRecord::Phase0(signed.message.aggregate.clone())
            }
            SignedAggregate::Electra(signed) => {
                AttestationRecord::Electra(signed.message.aggregate.clone())
            }
        }
    }

    /// Root of the `AggregateAndProof` message signed by the aggregator.
    pub fn message_root(&self) -> B256 {
        match self {
            SignedAggregate::Phase0(signed) => signed.message.tree_hash_root(),
            SignedAggregate::Electra(signed) => signed.message.tree_hash_root(),
        }
    }
}
