use std::collections::HashSet;

use alloy_primitives::B256;
use anyhow::{bail, ensure};
use ream_consensus_misc::misc::compute_start_slot_at_epoch;

use crate::chain::ChainProvider;

/// Returns the ancestor of ``block_root`` at or below ``slot``, `None` if the walk reaches a
/// block the chain doesn't know.
///
/// Parent links are followed iteratively and never below ``floor_slot``.
pub async fn get_ancestor(
    chain: &dyn ChainProvider,
    block_root: B256,
    slot: u64,
    floor_slot: u64,
) -> anyhow::Result<Option<B256>> {
    ensure!(
        slot >= floor_slot,
        "Ancestor slot {slot} is below the floor slot {floor_slot}"
    );

    let mut visited = HashSet::new();
    let mut root = block_root;
    loop {
        let Some(summary) = chain.block_summary(root).await else {
            return Ok(None);
        };
        if summary.slot <= slot {
            return Ok(Some(root));
        }
        if !visited.insert(root) {
            bail!("Cycle in parent links at block {root}");
        }

        let parent_slot = chain
            .block_summary(summary.parent_root)
            .await
            .map(|parent| parent.slot);
        if parent_slot.is_some_and(|parent_slot| parent_slot >= summary.slot) {
            bail!(
                "Parent {} of block {root} is not at a lower slot",
                summary.parent_root
            );
        }
        root = summary.parent_root;
    }
}

/// Returns the block root of the checkpoint of ``epoch`` on the chain of ``block_root``.
pub async fn get_checkpoint_block(
    chain: &dyn ChainProvider,
    block_root: B256,
    epoch: u64,
    floor_slot: u64,
) -> anyhow::Result<Option<B256>> {
    get_ancestor(
        chain,
        block_root,
        compute_start_slot_at_epoch(epoch),
        floor_slot,
    )
    .await
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use async_trait::async_trait;
    use ream_bls::PubKey;
    use ream_consensus_misc::checkpoint::Checkpoint;

    use super::*;
    use crate::chain::{BlockSummary, ChainError};

    #[derive(Default)]
    struct Blocks(HashMap<B256, BlockSummary>);

    impl Blocks {
        fn with(mut self, root: u8, slot: u64, parent: u8) -> Self {
            self.0.insert(
                B256::repeat_byte(root),
                BlockSummary {
                    slot,
                    parent_root: B256::repeat_byte(parent),
                },
            );
            self
        }
    }

    #[async_trait]
    impl ChainProvider for Blocks {
        fn current_slot(&self) -> u64 {
            0
        }

        fn genesis_validators_root(&self) -> B256 {
            B256::ZERO
        }

        async fn block_summary(&self, block_root: B256) -> Option<BlockSummary> {
            self.0.get(&block_root).copied()
        }

        async fn finalized_checkpoint(&self) -> Checkpoint {
            Checkpoint::default()
        }

        async fn is_invalid_block(&self, _block_root: B256) -> bool {
            false
        }

        async fn committee_count_per_slot(&self, _: B256, _: u64) -> Result<u64, ChainError> {
            Ok(1)
        }

        async fn beacon_committee(&self, _: B256, _: u64, _: u64) -> Result<Vec<u64>, ChainError> {
            Ok(vec![])
        }

        async fn validator_public_key(&self, index: u64) -> Result<PubKey, ChainError> {
            Err(ChainError::UnknownValidator(index))
        }
    }

    fn chain() -> Blocks {
        // 1 (slot 0) <- 2 (slot 31) <- 3 (slot 33) <- 4 (slot 70)
        Blocks::default()
            .with(1, 0, 0)
            .with(2, 31, 1)
            .with(3, 33, 2)
            .with(4, 70, 3)
    }

    #[tokio::test]
    async fn test_ancestor_lookup() {
        let chain = chain();
        let head = B256::repeat_byte(4);

        assert_eq!(get_ancestor(&chain, head, 70, 0).await.unwrap(), Some(head));
        assert_eq!(
            get_ancestor(&chain, head, 64, 0).await.unwrap(),
            Some(B256::repeat_byte(3))
        );
        assert_eq!(
            get_checkpoint_block(&chain, head, 1, 0).await.unwrap(),
            Some(B256::repeat_byte(2))
        );
        assert_eq!(
            get_checkpoint_block(&chain, head, 0, 0).await.unwrap(),
            Some(B256::repeat_byte(1))
        );
    }

    #[tokio::test]
    async fn test_unknown_ancestor() {
        let chain = Blocks::default().with(5, 40, 9);
        assert_eq!(
            get_ancestor(&chain, B256::repeat_byte(5), 10, 0).await.unwrap(),
            None
        );
        assert_eq!(
            get_ancestor(&chain, B256::repeat_byte(8), 10, 0).await.unwrap(),
            None
        );
    }

    #[tokio::test]
    async fn test_walk_is_bounded() {
        let chain = chain();
        assert!(
            get_ancestor(&chain, B256::repeat_byte(4), 10, 32)
                .await
                .is_err()
        );

        let cyclic = Blocks::default().with(6, 50, 7).with(7, 60, 6);
        assert!(
            get_ancestor(&cyclic, B256::repeat_byte(6), 10, 0)
                .await
                .is_err()
        );
    }
}
