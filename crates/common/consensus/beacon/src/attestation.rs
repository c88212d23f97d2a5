use ream_bls::BLSSignature;
use ream_consensus_misc::{attestation_data::AttestationData, misc::get_committee_indices};
use serde::{Deserialize, Serialize};
use ssz_derive::{Decode, Encode};
use ssz_types::{
    BitList, BitVector,
    typenum::{U64, U131072},
};
use tree_hash_derive::TreeHash;

/// Post-electra attestation, participants of several committees share one bitlist and the
/// committees are named by ``committee_bits``.
#[derive(Debug, PartialEq, Eq, Clone, Serialize, Deserialize, Encode, Decode, TreeHash)]
pub struct Attestation {
    pub aggregation_bits: BitList<U131072>,
    pub data: AttestationData,
    pub signature: BLSSignature,
    pub committee_bits: BitVector<U64>,
}

impl Attestation {
    /// The committee index of an attestation naming exactly one committee.
    pub fn single_committee_index(&self) -> Option<u64> {
        match get_committee_indices(&self.committee_bits).as_slice() {
            [committee_index] => Some(*committee_index),
            _ => None,
        }
    }
}
