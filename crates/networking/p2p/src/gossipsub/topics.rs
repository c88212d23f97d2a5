use alloy_primitives::{aliases::B32, hex::ToHexExt};
use libp2p::gossipsub::{IdentTopic as Topic, TopicHash};

use crate::gossipsub::error::GossipsubError;

pub const TOPIC_PREFIX: &str = "eth2";
pub const ENCODING_POSTFIX: &str = "ssz_snappy";
pub const BEACON_BLOCK_TOPIC: &str = "beacon_block";
pub const BEACON_AGGREGATE_AND_PROOF_TOPIC: &str = "beacon_aggregate_and_proof";
pub const BEACON_ATTESTATION_PREFIX: &str = "beacon_attestation_";

#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq)]
pub struct GossipTopic {
    pub fork: B32,
    pub kind: GossipTopicKind,
}

impl GossipTopic {
    pub fn from_topic_hash(topic: &TopicHash) -> Result<Self, GossipsubError> {
        let topic_parts: Vec<&str> = topic.as_str().trim_start_matches('/').split('/').collect();

        if topic_parts.len() != 4
            || topic_parts[0] != TOPIC_PREFIX
            || topic_parts[3] != ENCODING_POSTFIX
        {
            return Err(GossipsubError::InvalidTopic(format!(
                "Invalid topic format: {topic:?}"
            )));
        }

        let fork = topic_parts[1]
            .parse::<B32>()
            .map_err(|err| GossipsubError::InvalidTopic(format!("Invalid fork digest: {err}")))?;

        let kind = match topic_parts[2] {
            BEACON_BLOCK_TOPIC => GossipTopicKind::BeaconBlock,
            BEACON_AGGREGATE_AND_PROOF_TOPIC => GossipTopicKind::BeaconAggregateAndProof,
            other => match other.strip_prefix(BEACON_ATTESTATION_PREFIX) {
                Some(subnet_id) => GossipTopicKind::BeaconAttestation(
                    subnet_id.parse::<u64>().map_err(|err| {
                        GossipsubError::InvalidTopic(format!("Invalid subnet id: {err}"))
                    })?,
                ),
                None => {
                    return Err(GossipsubError::InvalidTopic(format!(
                        "Invalid topic: {other:?}"
                    )));
                }
            },
        };

        Ok(GossipTopic { fork, kind })
    }
}

impl std::fmt::Display for GossipTopic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "/{}/{}/{}/{}",
            TOPIC_PREFIX,
            self.fork.encode_hex(),
            self.kind,
            ENCODING_POSTFIX
        )
    }
}

impl From<GossipTopic> for Topic {
    fn from(topic: GossipTopic) -> Topic {
        Topic::new(topic)
    }
}

impl From<GossipTopic> for String {
    fn from(topic: GossipTopic) -> Self {
        topic.to_string()
    }
}

#[derive(Debug, Hash, Clone, Copy, PartialEq, Eq)]
pub enum GossipTopicKind {
    BeaconBlock,
    BeaconAggregateAndProof,
    BeaconAttestation(u64),
}

impl std::fmt::Display for GossipTopicKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GossipTopicKind::BeaconBlock => write!(f, "{BEACON_BLOCK_TOPIC}"),
            GossipTopicKind::BeaconAggregateAndProof => {
                write!(f, "{BEACON_AGGREGATE_AND_PROOF_TOPIC}")
            }
            GossipTopicKind::BeaconAttestation(subnet_id) => {
                write!(f, "{BEACON_ATTESTATION_PREFIX}{subnet_id}")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use alloy_primitives::fixed_bytes;

    use super::*;

    #[test]
    fn test_topic_round_trip() {
        let topic = GossipTopic {
            fork: fixed_bytes!("0x6a95a1a9"),
            kind: GossipTopicKind::BeaconAttestation(17),
        };
        assert_eq!(
            topic.to_string(),
            "/eth2/6a95a1a9/beacon_attestation_17/ssz_snappy"
        );

        let topic_hash = Topic::from(topic).hash();
        assert_eq!(GossipTopic::from_topic_hash(&topic_hash), Ok(topic));
    }

    #[test]
    fn test_invalid_topics() {
        for topic in [
            "/eth2/6a95a1a9/beacon_attestation_x/ssz_snappy",
            "/eth2/6a95a1a9/voluntary_exit/ssz_snappy",
            "/eth2/zz/beacon_block/ssz_snappy",
            "/eth2/6a95a1a9/beacon_block/ssz",
            "",
        ] {
            assert!(matches!(
                GossipTopic::from_topic_hash(&TopicHash::from_raw(topic)),
                Err(GossipsubError::InvalidTopic(_))
            ));
        }
    }
}
