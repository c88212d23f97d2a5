use alloy_primitives::aliases::B32;
use libp2p::gossipsub::TopicHash;
use ream_consensus_beacon::{
    aggregate_and_proof::{SignedAggregateAndProof, SignedPhase0AggregateAndProof},
    attestation_record::{AttestationRecord, SignedAggregate},
    phase0::Phase0Attestation,
    single_attestation::SingleAttestation,
};
use ssz::Decode;

use super::{
    error::GossipsubError,
    topics::{GossipTopic, GossipTopicKind},
};

/// Attestation gossip decoded into the shape of the fork it was published under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GossipsubMessage {
    BeaconAttestation((Box<AttestationRecord>, u64)),
    AggregateAndProof(Box<SignedAggregate>),
}

impl GossipsubMessage {
    /// Decodes ``data`` published on ``topic``.
    ///
    /// A topic which can't be parsed, isn't an attestation topic, or carries a fork digest other
    /// than ``fork_digest`` fails with [GossipsubError::InvalidTopic]. A payload which doesn't
    /// decode fails with [GossipsubError::InvalidData].
    pub fn decode(
        topic: &TopicHash,
        data: &[u8],
        fork_digest: B32,
        electra_active: bool,
    ) -> Result<Self, GossipsubError> {
        let gossip_topic = GossipTopic::from_topic_hash(topic)?;

        if gossip_topic.fork != fork_digest {
            return Err(GossipsubError::InvalidTopic(format!(
                "Invalid topic fork: {topic:?}"
            )));
        }

        let message = match gossip_topic.kind {
            GossipTopicKind::BeaconAttestation(subnet_id) => {
                let attestation = if electra_active {
                    AttestationRecord::Single(SingleAttestation::from_ssz_bytes(data)?)
                } else {
                    AttestationRecord::Phase0(Phase0Attestation::from_ssz_bytes(data)?)
                };
                if attestation.signature().is_empty() {
                    return Err(GossipsubError::InvalidData(
                        "Attestation signature is empty".to_string(),
                    ));
                }
                Self::BeaconAttestation((Box::new(attestation), subnet_id))
            }
            GossipTopicKind::BeaconAggregateAndProof => {
                let aggregate = if electra_active {
                    SignedAggregate::Electra(SignedAggregateAndProof::from_ssz_bytes(data)?)
                } else {
                    SignedAggregate::Phase0(SignedPhase0AggregateAndProof::from_ssz_bytes(data)?)
                };
                if aggregate.signature().is_empty() || aggregate.aggregate().signature().is_empty()
                {
                    return Err(GossipsubError::InvalidData(
                        "Aggregate signature is empty".to_string(),
                    ));
                }
                Self::AggregateAndProof(Box::new(aggregate))
            }
            _ => {
                return Err(GossipsubError::InvalidTopic(format!(
                    "Topic not supported: {topic:?}"
                )));
            }
        };

        Ok(message)
    }
}

#[cfg(test)]
mod tests {
    use alloy_primitives::{B256, fixed_bytes};
    use libp2p::gossipsub::IdentTopic;
    use ream_bls::BLSSignature;
    use ream_consensus_misc::{attestation_data::AttestationData, checkpoint::Checkpoint};
    use ssz::Encode;

    use super::*;

    const FORK_DIGEST: B32 = fixed_bytes!("0x01020304");

    fn topic(fork: B32, kind: GossipTopicKind) -> TopicHash {
        IdentTopic::from(GossipTopic { fork, kind }).hash()
    }

    fn single_attestation(signature: BLSSignature) -> SingleAttestation {
        SingleAttestation {
            committee_index: 0,
            attester_index: 4,
            data: AttestationData {
                slot: 3,
                index: 0,
                beacon_block_root: B256::repeat_byte(2),
                source: Checkpoint::default(),
                target: Checkpoint::default(),
            },
            signature,
        }
    }

    #[test]
    fn test_decode_single_attestation() {
        let attestation = single_attestation(BLSSignature::from_slice(&[5; 96]).unwrap());
        let message = GossipsubMessage::decode(
            &topic(FORK_DIGEST, GossipTopicKind::BeaconAttestation(3)),
            &attestation.as_ssz_bytes(),
            FORK_DIGEST,
            true,
        )
        .unwrap();

        assert_eq!(
            message,
            GossipsubMessage::BeaconAttestation((
                Box::new(AttestationRecord::Single(attestation)),
                3
            ))
        );
    }

    #[test]
    fn test_decode_rejects_wrong_fork_and_bad_payload() {
        let attestation = single_attestation(BLSSignature::from_slice(&[5; 96]).unwrap());

        assert!(matches!(
            GossipsubMessage::decode(
                &topic(fixed_bytes!("0xffffffff"), GossipTopicKind::BeaconAttestation(3)),
                &attestation.as_ssz_bytes(),
                FORK_DIGEST,
                true,
            ),
            Err(GossipsubError::InvalidTopic(_))
        ));
        assert!(matches!(
            GossipsubMessage::decode(
                &topic(FORK_DIGEST, GossipTopicKind::BeaconAttestation(3)),
                &[1, 2, 3],
                FORK_DIGEST,
                true,
            ),
            Err(GossipsubError::InvalidData(_))
        ));
        assert!(matches!(
            GossipsubMessage::decode(
                &topic(FORK_DIGEST, GossipTopicKind::BeaconAttestation(3)),
                &single_attestation(BLSSignature::default()).as_ssz_bytes(),
                FORK_DIGEST,
                true,
            ),
            Err(GossipsubError::InvalidData(_))
        ));
        assert!(matches!(
            GossipsubMessage::decode(
                &topic(FORK_DIGEST, GossipTopicKind::BeaconBlock),
                &attestation.as_ssz_bytes(),
                FORK_DIGEST,
                true,
            ),
            Err(GossipsubError::InvalidTopic(_))
        ));
    }
}
