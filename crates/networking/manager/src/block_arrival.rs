use std::sync::Arc;

use alloy_primitives::B256;
use tokio::sync::{Mutex, MutexGuard};
use tracing::{debug, info, trace};

use crate::{
    gossipsub::{
        pending_attestations::PendingAttestationQueue,
        validate::{GossipValidator, Origin, result::ValidationResult},
    },
    sink::NetworkSink,
};

/// Replays attestations buffered for a block once that block is imported.
///
/// Runs under the lock block import holds while mutating fork choice, so a root is never drained
/// while a second import of it is in flight.
pub struct BlockArrivalHook {
    validator: Arc<GossipValidator>,
    pending_attestations: Arc<PendingAttestationQueue>,
    network: Arc<dyn NetworkSink>,
    import_lock: Arc<Mutex<()>>,
}

impl BlockArrivalHook {
    pub fn new(
        validator: Arc<GossipValidator>,
        pending_attestations: Arc<PendingAttestationQueue>,
        network: Arc<dyn NetworkSink>,
        import_lock: Arc<Mutex<()>>,
    ) -> Self {
        Self {
            validator,
            pending_attestations,
            network,
            import_lock,
        }
    }

    /// Takes the import lock, then drains and revalidates. Returns the number accepted.
    pub async fn on_block_imported(&self, block_root: B256) -> usize {
        let guard = self.import_lock.lock().await;
        self.on_block_imported_locked(block_root, &guard).await
    }

    /// For callers already holding the import lock.
    pub async fn on_block_imported_locked(
        &self,
        block_root: B256,
        _import_guard: &MutexGuard<'_, ()>,
    ) -> usize {
        let attestations = self.pending_attestations.drain(block_root);
        if attestations.is_empty() {
            return 0;
        }

        let total = attestations.len();
        let fork_digest = self.validator.fork_digest();
        let mut accepted = 0;
        for attestation in attestations {
            match self.validator.validate(&attestation, Origin::Pending).await {
                Ok(ValidationResult::Accept) => {
                    self.network
                        .rebroadcast(attestation.to_gossip_message(fork_digest));
                    accepted += 1;
                }
                Ok(result) => {
                    trace!("Discarding pending attestation for block {block_root}: {result:?}")
                }
                Err(err) => {
                    debug!("Failed to revalidate pending attestation for block {block_root}: {err}")
                }
            }
        }

        info!(
            "Verified and saved pending attestations to pool: block_root: {block_root}, accepted: {accepted}, total: {total}"
        );
        accepted
    }
}
