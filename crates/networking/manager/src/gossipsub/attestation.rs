use alloy_primitives::{B256, aliases::B32};
use ream_consensus_beacon::attestation_record::{AttestationRecord, SignedAggregate};
use ream_consensus_misc::attestation_data::AttestationData;
use ream_p2p::{
    channel::GossipMessage,
    gossipsub::{
        message::GossipsubMessage,
        topics::{GossipTopic, GossipTopicKind},
    },
};
use ssz::Encode;

/// An attestation received over gossip, kept in decoded form so it can be revalidated once its
/// block is imported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GossipAttestation {
    Unaggregated {
        attestation: AttestationRecord,
        subnet_id: u64,
    },
    Aggregate(SignedAggregate),
}

impl GossipAttestation {
    pub fn data(&self) -> &AttestationData {
        match self {
            GossipAttestation::Unaggregated { attestation, .. } => attestation.data(),
            GossipAttestation::Aggregate(aggregate) => aggregate.data(),
        }
    }

    pub fn slot(&self) -> u64 {
        self.data().slot
    }

    pub fn beacon_block_root(&self) -> B256 {
        self.data().beacon_block_root
    }

    pub fn topic_kind(&self) -> GossipTopicKind {
        match self {
            GossipAttestation::Unaggregated { subnet_id, .. } => {
                GossipTopicKind::BeaconAttestation(*subnet_id)
            }
            GossipAttestation::Aggregate(_) => GossipTopicKind::BeaconAggregateAndProof,
        }
    }

    /// Two buffered attestations are duplicates when they vote in the same slot for the same
    /// committee. Aggregates are compared by committee alone, the aggregator index is unverified
    /// until the block is known. Unaggregated attestations also compare their attester. Different
    /// kinds never match.
    pub fn has_same_identity(&self, other: &Self) -> bool {
        if self.slot() != other.slot() {
            return false;
        }

        match (self, other) {
            (GossipAttestation::Aggregate(a), GossipAttestation::Aggregate(b)) => match (a, b) {
                (SignedAggregate::Phase0(a), SignedAggregate::Phase0(b)) => {
                    a.message.aggregate.data.index == b.message.aggregate.data.index
                }
                (SignedAggregate::Electra(a), SignedAggregate::Electra(b)) => {
                    a.message.aggregate.committee_bits == b.message.aggregate.committee_bits
                }
                _ => false,
            },
            (
                GossipAttestation::Unaggregated { attestation: a, .. },
                GossipAttestation::Unaggregated { attestation: b, .. },
            ) => match (a, b) {
                (AttestationRecord::Single(a), AttestationRecord::Single(b)) => {
                    a.committee_index == b.committee_index && a.attester_index == b.attester_index
                }
                (AttestationRecord::Phase0(a), AttestationRecord::Phase0(b)) => {
                    a.data.index == b.data.index && a.aggregation_bits == b.aggregation_bits
                }
                (AttestationRecord::Electra(a), AttestationRecord::Electra(b)) => {
                    a.committee_bits == b.committee_bits && a.aggregation_bits == b.aggregation_bits
                }
                _ => false,
            },
            _ => false,
        }
    }

    /// Re-encodes the attestation for publishing under ``fork``.
    pub fn to_gossip_message(&self, fork: B32) -> GossipMessage {
        let data = match self {
            GossipAttestation::Unaggregated { attestation, .. } => match attestation {
                AttestationRecord::Single(attestation) => attestation.as_ssz_bytes(),
                AttestationRecord::Phase0(attestation) => attestation.as_ssz_bytes(),
                AttestationRecord::Electra(attestation) => attestation.as_ssz_bytes(),
            },
            GossipAttestation::Aggregate(SignedAggregate::Phase0(signed)) => signed.as_ssz_bytes(),
            GossipAttestation::Aggregate(SignedAggregate::Electra(signed)) => {
                signed.as_ssz_bytes()
            }
        };

        GossipMessage {
            topic: GossipTopic {
                fork,
                kind: self.topic_kind(),
            },
            data,
        }
    }
}

impl From<GossipsubMessage> for GossipAttestation {
    fn from(message: GossipsubMessage) -> Self {
        match message {
            GossipsubMessage::BeaconAttestation((attestation, subnet_id)) => {
                GossipAttestation::Unaggregated {
                    attestation: *attestation,
                    subnet_id,
                }
            }
            GossipsubMessage::AggregateAndProof(aggregate) => {
                GossipAttestation::Aggregate(*aggregate)
            }
        }
    }
}
