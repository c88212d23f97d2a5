use anyhow::anyhow;
use ream_bls::BLSSignature;
use ream_consensus_misc::attestation_data::AttestationData;
use serde::{Deserialize, Serialize};
use ssz_derive::{Decode, Encode};
use ssz_types::{BitList, BitVector};
use tree_hash_derive::TreeHash;

use crate::attestation::Attestation;

#[derive(Debug, PartialEq, Eq, Clone, Serialize, Deserialize, Encode, Decode, TreeHash)]
pub struct SingleAttestation {
    #[serde(with = "serde_utils::quoted_u64")]
    pub committee_index: u64,
    #[serde(with = "serde_utils::quoted_u64")]
    pub attester_index: u64,
    pub data: AttestationData,
    pub signature: BLSSignature,
}

impl SingleAttestation {
    /// Converts to the aggregate form given the ordered members of ``committee_index``.
    pub fn to_attestation(&self, committee: &[u64]) -> anyhow::Result<Attestation> {
        let position = committee
            .iter()
            .position(|index| *index == self.attester_index)
            .ok_or_else(|| {
                anyhow!(
                    "Attester {} is not in committee {}",
                    self.attester_index,
                    self.committee_index
                )
            })?;

        let mut aggregation_bits = BitList::with_capacity(committee.len())
            .map_err(|err| anyhow!("Failed to create aggregation bits: {err:?}"))?;
        aggregation_bits
            .set(position, true)
            .map_err(|err| anyhow!("Failed to set aggregation bit: {err:?}"))?;

        let mut committee_bits = BitVector::new();
        committee_bits
            .set(self.committee_index as usize, true)
            .map_err(|err| anyhow!("Failed to set committee bit: {err:?}"))?;

        Ok(Attestation {
            aggregation_bits,
            data: self.data.clone(),
            signature: self.signature.clone(),
            committee_bits,
        })
    }
}

#[cfg(test)]
mod tests {
    use alloy_primitives::B256;
    use ream_consensus_misc::checkpoint::Checkpoint;

    use super::*;

    fn single_attestation(attester_index: u64) -> SingleAttestation {
        SingleAttestation {
            committee_index: 2,
            attester_index,
            data: AttestationData {
                slot: 5,
                index: 0,
                beacon_block_root: B256::repeat_byte(1),
                source: Checkpoint::default(),
                target: Checkpoint::default(),
            },
            signature: BLSSignature::default(),
        }
    }

    #[test]
    fn test_to_attestation_sets_position_and_committee() {
        let attestation = single_attestation(40).to_attestation(&[10, 20, 40, 30]).unwrap();

        assert_eq!(attestation.aggregation_bits.len(), 4);
        assert_eq!(attestation.aggregation_bits.num_set_bits(), 1);
        assert_eq!(attestation.aggregation_bits.get(2), Ok(true));
        assert_eq!(attestation.single_committee_index(), Some(2));
    }

    #[test]
    fn test_to_attestation_outside_committee() {
        assert!(single_attestation(99).to_attestation(&[10, 20]).is_err());
    }
}
