use alloy_primitives::B256;
use async_trait::async_trait;
use ream_bls::PubKey;
use ream_consensus_misc::{checkpoint::Checkpoint, misc::compute_start_slot_at_epoch};

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ChainError {
    #[error("State for block {0} is unavailable")]
    StateUnavailable(B256),
    #[error("Unknown validator index {0}")]
    UnknownValidator(u64),
    #[error("Committee index {committee_index} out of range at slot {slot}")]
    CommitteeIndexOutOfRange { slot: u64, committee_index: u64 },
}

/// Slot and parent of an imported block, enough to walk ancestry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockSummary {
    pub slot: u64,
    pub parent_root: B256,
}

/// Read access to chain state owned by block import and fork choice.
///
/// Committee lookups are resolved against the state of the attested block, a provider which can't
/// resolve that state fails with [ChainError::StateUnavailable].
#[async_trait]
pub trait ChainProvider: Send + Sync {
    fn current_slot(&self) -> u64;

    fn genesis_validators_root(&self) -> B256;

    async fn block_summary(&self, block_root: B256) -> Option<BlockSummary>;

    async fn finalized_checkpoint(&self) -> Checkpoint;

    /// Whether ``block_root`` failed validation before.
    async fn is_invalid_block(&self, block_root: B256) -> bool;

    async fn committee_count_per_slot(
        &self,
        block_root: B256,
        epoch: u64,
    ) -> Result<u64, ChainError>;

    async fn beacon_committee(
        &self,
        block_root: B256,
        slot: u64,
        committee_index: u64,
    ) -> Result<Vec<u64>, ChainError>;

    async fn validator_public_key(&self, validator_index: u64) -> Result<PubKey, ChainError>;

    async fn is_block_known(&self, block_root: B256) -> bool {
        self.block_summary(block_root).await.is_some()
    }

    async fn is_block_below_finalized(&self, block_root: B256) -> bool {
        let finalized_slot = compute_start_slot_at_epoch(self.finalized_checkpoint().await.epoch);
        match self.block_summary(block_root).await {
            Some(summary) => summary.slot < finalized_slot,
            None => false,
        }
    }
}
